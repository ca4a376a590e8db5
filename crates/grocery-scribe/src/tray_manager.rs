//! System tray icon with state-based updates.
//!
//! Manages a system tray icon reflecting the recording lifecycle and a
//! context menu for sharing, resetting, settings, and exit. Icons are
//! rendered in-process as colored discs — no bundled image assets.

use crate::{AppError, AppResult, TrayIconState};

use std::panic::Location;

use error_location::ErrorLocation;
use tracing::{info, instrument};
use tray_icon::menu::{Menu, MenuId, MenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

/// Rendered icon edge length in pixels.
const ICON_SIZE: u32 = 32;

/// System tray icon manager.
pub struct TrayManager {
    tray_icon: TrayIcon,
    share_item_id: MenuId,
    reset_item_id: MenuId,
    settings_item_id: MenuId,
    exit_item_id: MenuId,
}

impl TrayManager {
    /// Create a new tray manager with initial state.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let menu = Menu::new();

        let share_item = MenuItem::new("Send to WhatsApp", true, None);
        let reset_item = MenuItem::new("Start New List", true, None);
        let settings_item = MenuItem::new("Settings", true, None);
        let exit_item = MenuItem::new("Exit", true, None);

        let share_id = share_item.id().clone();
        let reset_id = reset_item.id().clone();
        let settings_id = settings_item.id().clone();
        let exit_id = exit_item.id().clone();

        for item in [&share_item, &reset_item, &settings_item, &exit_item] {
            menu.append(item).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to build tray menu: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
        }

        let icon = Self::render_icon(TrayIconState::Idle)?;

        let tray_icon = TrayIconBuilder::new()
            .with_tooltip("Grocery Scribe - Ready")
            .with_menu(Box::new(menu))
            .with_icon(icon)
            .build()
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to create tray icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("System tray icon initialized");

        Ok(Self {
            tray_icon,
            share_item_id: share_id,
            reset_item_id: reset_id,
            settings_item_id: settings_id,
            exit_item_id: exit_id,
        })
    }

    /// Update the tray icon state with new icon and tooltip.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn update_state(&mut self, state: TrayIconState) -> AppResult<()> {
        let tooltip = match state {
            TrayIconState::Idle => "Grocery Scribe - Ready",
            TrayIconState::Listening => "Grocery Scribe - Listening...",
            TrayIconState::Processing => "Grocery Scribe - Processing...",
            TrayIconState::ShowingList => "Grocery Scribe - List ready",
            TrayIconState::Error => "Grocery Scribe - Error",
        };

        self.tray_icon
            .set_icon(Some(Self::render_icon(state)?))
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to update icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        self.tray_icon
            .set_tooltip(Some(tooltip))
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to update tooltip: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(())
    }

    /// Render a state-colored disc as an RGBA icon.
    #[track_caller]
    fn render_icon(state: TrayIconState) -> AppResult<Icon> {
        let (r, g, b) = match state {
            TrayIconState::Idle => (0x6b, 0x72, 0x80),        // gray
            TrayIconState::Listening => (0xef, 0x44, 0x44),   // red
            TrayIconState::Processing => (0x63, 0x66, 0xf1),  // indigo
            TrayIconState::ShowingList => (0x22, 0xc5, 0x5e), // green
            TrayIconState::Error => (0xf5, 0x9e, 0x0b),       // amber
        };

        let center = (ICON_SIZE as f32 - 1.0) / 2.0;
        let radius = ICON_SIZE as f32 / 2.0 - 1.5;

        let mut rgba = Vec::with_capacity((ICON_SIZE * ICON_SIZE * 4) as usize);
        for y in 0..ICON_SIZE {
            for x in 0..ICON_SIZE {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                let distance = (dx * dx + dy * dy).sqrt();

                // One-pixel soft edge so the disc is not jagged.
                let coverage = if distance <= radius {
                    255.0
                } else {
                    (255.0 * (radius + 1.0 - distance)).clamp(0.0, 255.0)
                };

                rgba.extend_from_slice(&[r, g, b, coverage as u8]);
            }
        }

        Icon::from_rgba(rgba, ICON_SIZE, ICON_SIZE).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create icon from RGBA: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Get the share menu item ID.
    pub fn share_item_id(&self) -> &MenuId {
        &self.share_item_id
    }

    /// Get the reset menu item ID.
    pub fn reset_item_id(&self) -> &MenuId {
        &self.reset_item_id
    }

    /// Get the settings menu item ID.
    pub fn settings_item_id(&self) -> &MenuId {
        &self.settings_item_id
    }

    /// Get the exit menu item ID.
    pub fn exit_item_id(&self) -> &MenuId {
        &self.exit_item_id
    }
}
