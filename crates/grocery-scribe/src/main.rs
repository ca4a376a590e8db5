//! Grocery Scribe: voice-captured grocery lists, shared to WhatsApp.
//!
//! A tray application that records a spoken (Hindi) kitchen conversation
//! with a global hotkey, streams it through a realtime recognition provider,
//! extracts the mentioned grocery items with a hosted language model, and
//! hands the list to WhatsApp via a prefilled compose URL.

mod app;
mod app_command;
mod config;
mod error;
mod hotkey_handler;
mod notifier;
mod share;
#[cfg(test)]
mod tests;
mod tray_command;
mod tray_icon_state;
mod tray_manager;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
    hotkey_handler::HotkeyHandler,
    notifier::Notifier,
    share::ShareHandler,
    tray_command::TrayCommand,
    tray_icon_state::TrayIconState,
    tray_manager::TrayManager,
};

use crate::config::{Config, unconfigured_extractor};

use global_hotkey::GlobalHotKeyManager;
use grocery_scribe_core::{
    lifecycle::{BackendFactory, LifecycleController, RecordingState},
    recognize::{RealtimeBackend, SpeechBackend},
};
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tokio::sync::{mpsc, watch};
use tracing::error;

/// Application entry point.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("grocery_scribe=debug")
        .init();

    let event_loop = EventLoopBuilder::<TrayCommand>::with_user_event().build();
    let tray_proxy = event_loop.create_proxy();

    // TrayManager lives on the main thread - TrayIcon is !Send on all platforms.
    let mut tray_manager = match TrayManager::new() {
        Ok(tm) => tm,
        Err(e) => {
            error!("Failed to create TrayManager: {:?}", e);
            std::process::exit(1);
        }
    };

    // Persists across event loop iterations — dropping it unregisters the hotkey.
    let mut hotkey_manager: Option<GlobalHotKeyManager> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::UserEvent(cmd) => {
                match cmd {
                    TrayCommand::SetState(state) => {
                        if let Err(e) = tray_manager.update_state(state) {
                            error!(error = ?e, "Failed to update tray icon");
                        }
                    }
                    TrayCommand::Shutdown => {
                        *control_flow = ControlFlow::ExitWithCode(0);
                    }
                }
                return;
            }
            Event::NewEvents(tao::event::StartCause::Init) => {
                let config = match Config::load() {
                    Ok(c) => c,
                    Err(e) => {
                        error!("Failed to load config: {:?}", e);
                        std::process::exit(1);
                    }
                };

                let realtime = config.recognizer.realtime();

                // Recognition availability is probed once at process start
                // and reported immediately. The process stays alive; any
                // later start attempt surfaces the same error through the
                // normal lifecycle path.
                let startup_probe = RealtimeBackend::new(realtime.clone()).probe().err();

                let (extractor, extraction_issue) = match config.extraction.build_extractor() {
                    Ok(extractor) => (extractor, None),
                    Err(e) => {
                        error!(error = ?e, "Extraction service not configured");
                        (unconfigured_extractor(), Some(e.user_message()))
                    }
                };

                // Sessions are not re-entrant; each cycle gets a fresh
                // backend from this factory.
                let factory: BackendFactory = Box::new(move || {
                    Box::new(RealtimeBackend::new(realtime.clone())) as Box<dyn SpeechBackend>
                });

                let controller = LifecycleController::new(factory, extractor);

                let share = match ShareHandler::new() {
                    Ok(share) => share,
                    Err(e) => {
                        error!("Failed to create ShareHandler: {:?}", e);
                        std::process::exit(1);
                    }
                };

                #[cfg(target_os = "macos")]
                unsafe {
                    use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};
                    CFRunLoopWakeUp(CFRunLoopGetMain());
                }

                let contact = config.contact_number();
                let copy_to_clipboard = config.behaviour.copy_to_clipboard;

                let (command_tx, command_rx) = mpsc::channel(32);
                let (shutdown_tx, shutdown_rx) = watch::channel(false);

                // Register hotkey on the main thread — tao's event loop pumps
                // the Windows messages needed for WM_HOTKEY delivery.
                // hotkey_manager is stored in the closure's captured state so it
                // lives for the entire app lifetime.
                let (manager, hotkey_id) = match HotkeyHandler::register_hotkey() {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Failed to register hotkey: {:?}", e);
                        std::process::exit(1);
                    }
                };
                hotkey_manager = Some(manager);

                let tray_proxy = tray_proxy.clone();
                let share_menu_id = tray_manager.share_item_id().clone();
                let reset_menu_id = tray_manager.reset_item_id().clone();
                let settings_menu_id = tray_manager.settings_item_id().clone();
                let exit_menu_id = tray_manager.exit_item_id().clone();

                // Spawn tokio runtime on separate thread.
                // TrayManager and hotkey_manager stay on the main thread.
                std::thread::spawn(move || {
                    let rt = match tokio::runtime::Runtime::new() {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to create tokio runtime: {:?}", e);
                            std::process::exit(1);
                        }
                    };

                    rt.block_on(async {
                        let notifier = Notifier::new();

                        if let Some(e) = &startup_probe {
                            error!(error = ?e, "Speech recognition unavailable");
                            let _ = notifier.error(&e.user_message()).await;
                        }
                        if let Some(message) = &extraction_issue {
                            let _ = notifier.error(message).await;
                        }

                        let hotkey_handler = HotkeyHandler::new(hotkey_id, command_tx.clone());

                        let app = App {
                            controller,
                            share,
                            notifier,
                            contact,
                            copy_to_clipboard,
                            last_state: RecordingState::Idle,
                            last_message: None,
                            tray_proxy,
                            command_tx,
                            command_rx,
                            shutdown_tx,
                            share_menu_id,
                            reset_menu_id,
                            settings_menu_id,
                            exit_menu_id,
                        };

                        tokio::join!(
                            async {
                                if let Err(e) = hotkey_handler.run(shutdown_rx).await {
                                    error!(error = ?e, "Hotkey handler error");
                                }
                            },
                            async {
                                if let Err(e) = app.run().await {
                                    error!(error = ?e, "App error");
                                }
                            }
                        );
                    });
                });
            }
            _ => {}
        }

        // Keep hotkey_manager alive in the closure for the app's lifetime.
        let _ = &hotkey_manager;
    });
}
