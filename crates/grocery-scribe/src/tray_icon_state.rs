use grocery_scribe_core::lifecycle::RecordingState;

/// Tray icon states corresponding to the recording lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayIconState {
    /// Ready to start a new list.
    Idle,
    /// Capture session live.
    Listening,
    /// Waiting on the microphone or the extraction call.
    Processing,
    /// A grocery list is ready to share.
    ShowingList,
    /// The last cycle failed.
    Error,
}

impl From<RecordingState> for TrayIconState {
    fn from(state: RecordingState) -> Self {
        match state {
            RecordingState::Idle => TrayIconState::Idle,
            // Permission and extraction waits look the same from the tray.
            RecordingState::RequestingPermission | RecordingState::Processing => {
                TrayIconState::Processing
            }
            RecordingState::Listening => TrayIconState::Listening,
            RecordingState::ShowingList => TrayIconState::ShowingList,
            RecordingState::Error => TrayIconState::Error,
        }
    }
}
