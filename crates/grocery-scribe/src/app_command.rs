use uuid::Uuid;

/// Commands sent from the hotkey handler and tray menu to the main
/// application loop.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Start a new recording cycle.
    StartRecording {
        /// Unique session ID for this recording.
        session_id: Uuid,
    },
    /// Stop the current recording cycle and extract the list.
    StopRecording {
        /// Session ID of the recording to stop.
        session_id: Uuid,
    },
    /// Discard the current list and return to idle.
    ResetList,
    /// Hand the current list to the messaging service.
    ShareList,
    /// Request application shutdown.
    Shutdown,
}
