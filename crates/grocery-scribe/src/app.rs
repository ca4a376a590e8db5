use crate::{
    AppCommand, AppResult, Notifier, ShareHandler, TrayCommand,
    config::{Config, ContactNumber},
};

use grocery_scribe_core::lifecycle::{LifecycleController, RecordingState};
use tao::event_loop::EventLoopProxy;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument, warn};
use tray_icon::menu::{MenuEvent, MenuId};
use uuid::Uuid;

/// Main application state.
///
/// Runs on the async runtime thread. Communicates tray icon updates
/// back to the main thread via the event loop proxy because `TrayIcon`
/// is `!Send` and must remain on the UI thread.
pub struct App {
    pub(crate) controller: LifecycleController,
    pub(crate) share: ShareHandler,
    pub(crate) notifier: Notifier,
    pub(crate) contact: Option<ContactNumber>,
    pub(crate) copy_to_clipboard: bool,
    pub(crate) last_state: RecordingState,
    pub(crate) last_message: Option<String>,
    pub(crate) tray_proxy: EventLoopProxy<TrayCommand>,
    pub(crate) command_tx: mpsc::Sender<AppCommand>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) share_menu_id: MenuId,
    pub(crate) reset_menu_id: MenuId,
    pub(crate) settings_menu_id: MenuId,
    pub(crate) exit_menu_id: MenuId,
}

impl App {
    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Grocery Scribe starting");

        // Tray event forwarding via single persistent blocking task.
        //
        // MenuEvent::receiver() returns a crossbeam_channel::Receiver which
        // HAS blocking recv() -- zero polling, instant response, one thread.
        //
        // Shutdown: when tray_event_rx is dropped (main loop breaks),
        // tray_event_tx.blocking_send() fails, breaking the blocking loop.
        let (tray_event_tx, mut tray_event_rx) = mpsc::channel(32);
        let tray_handle = tokio::task::spawn_blocking(move || {
            let receiver = MenuEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if tray_event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                Some(event) = tray_event_rx.recv() => {
                    self.handle_tray_event(event).await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AppCommand::StartRecording { session_id } => {
                            self.start_recording(session_id).await;
                        }
                        AppCommand::StopRecording { session_id } => {
                            self.stop_recording(session_id).await;
                        }
                        AppCommand::ResetList => {
                            self.controller.reset();
                            self.sync_presentation().await;
                        }
                        AppCommand::ShareList => {
                            self.share_current_list().await;
                        }
                        AppCommand::Shutdown => {
                            info!("Shutdown requested");
                            break;
                        }
                    }
                }

                // Recognition events flow only while a session is live.
                event = self.controller.session_event(), if self.controller.is_listening() => {
                    match event {
                        Some(event) => self.controller.apply_event(event).await,
                        // Event stream ran dry without a terminal event;
                        // wrap up with whatever was captured.
                        None => {
                            self.controller.stop().await;
                        }
                    }
                    self.sync_presentation().await;
                }

                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        drop(tray_event_rx);

        match tokio::time::timeout(std::time::Duration::from_secs(1), tray_handle).await {
            Ok(Ok(())) => info!("Tray event forwarder stopped cleanly"),
            Ok(Err(e)) => error!(error = ?e, "Tray event forwarder task panicked"),
            Err(_) => info!(
                "Tray event forwarder did not stop within timeout, \
                     will be cleaned up on exit"
            ),
        }

        let _ = self.shutdown_tx.send(true);
        info!("Grocery Scribe shut down successfully");

        Ok(())
    }

    /// Start a recording cycle, re-reading settings first so contact edits
    /// take effect without a restart.
    #[instrument(skip(self))]
    async fn start_recording(&mut self, session_id: Uuid) {
        self.refresh_settings();

        let contact = self.contact.clone();
        let state = self
            .controller
            .start(contact.as_ref().map(ContactNumber::as_str))
            .await;

        info!(session_id = %session_id, state = ?state, "Start command handled");
        self.sync_presentation().await;
    }

    /// Stop the current cycle: drain, snapshot, extract.
    #[instrument(skip(self))]
    async fn stop_recording(&mut self, session_id: Uuid) {
        let state = self.controller.stop().await;

        info!(session_id = %session_id, state = ?state, "Stop command handled");
        self.sync_presentation().await;
    }

    /// Push controller state out to the tray and surface new messages.
    async fn sync_presentation(&mut self) {
        let state = self.controller.state();
        let message = self.controller.message().map(str::to_string);

        if state != self.last_state {
            let _ = self
                .tray_proxy
                .send_event(TrayCommand::SetState(state.into()));

            if state == RecordingState::ShowingList
                && let Err(e) = self.notifier.show_list(self.controller.items()).await
            {
                warn!(error = ?e, "Failed to show list notification");
            }

            self.last_state = state;
        }

        if message != self.last_message {
            if let Some(text) = &message {
                let shown = if state == RecordingState::Error {
                    self.notifier.error(text).await
                } else {
                    self.notifier.notice(text).await
                };
                if let Err(e) = shown {
                    warn!(error = ?e, "Failed to show message notification");
                }
            }
            self.last_message = message;
        }
    }

    /// Hand the current list to the messaging service.
    #[instrument(skip(self))]
    async fn share_current_list(&mut self) {
        if self.controller.items().is_empty() {
            let _ = self.notifier.notice("No grocery list to send yet.").await;
            return;
        }

        self.refresh_settings();
        let Some(contact) = self.contact.clone() else {
            let _ = self
                .notifier
                .notice("Please set your WhatsApp number first.")
                .await;
            return;
        };

        let items = self.controller.items().to_vec();
        if let Err(e) = self
            .share
            .share_list(&contact, &items, self.copy_to_clipboard)
        {
            warn!(error = ?e, "Share failed");
            let _ = self
                .notifier
                .error("Could not open WhatsApp. The list is in your clipboard.")
                .await;
        }
    }

    /// Re-read settings from disk. The config file is edited out-of-process,
    /// so this runs at each cycle start and before each share.
    fn refresh_settings(&mut self) {
        match Config::load() {
            Ok(config) => {
                self.copy_to_clipboard = config.behaviour.copy_to_clipboard;
                self.contact = config.contact_number();
            }
            Err(e) => {
                warn!(error = ?e, "Failed to reload settings, keeping previous values");
            }
        }
    }

    /// Open the settings file in the system editor.
    fn open_settings(&self) {
        match Config::path() {
            Ok(path) => {
                if let Err(e) = open::that(&path) {
                    warn!(error = %e, "Failed to open settings file");
                } else {
                    info!("Opened settings file");
                }
            }
            Err(e) => warn!(error = ?e, "Failed to resolve settings path"),
        }
    }

    /// Handle tray menu events by re-dispatching them as app commands, so
    /// menu and hotkey input share one code path.
    #[instrument(skip(self))]
    async fn handle_tray_event(&mut self, event: MenuEvent) {
        let event_id = &event.id;

        let command = if *event_id == self.share_menu_id {
            Some(AppCommand::ShareList)
        } else if *event_id == self.reset_menu_id {
            Some(AppCommand::ResetList)
        } else if *event_id == self.settings_menu_id {
            self.open_settings();
            None
        } else if *event_id == self.exit_menu_id {
            info!("Exit requested from tray menu");
            let _ = self.tray_proxy.send_event(TrayCommand::Shutdown);
            Some(AppCommand::Shutdown)
        } else {
            None
        };

        if let Some(command) = command
            && let Err(e) = self.command_tx.send(command).await
        {
            error!(error = ?e, "Failed to dispatch tray command");
        }
    }
}
