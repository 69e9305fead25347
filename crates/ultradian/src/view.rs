//! Render-ready view of the timer

use ultradian_core::format;

use crate::phase::state_label;
use crate::settings::Settings;
use crate::stats::Stats;
use crate::timer::{TimerState, TimerStatus};

/// Presentation state that is not part of the timer itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    /// The settings form differs from the saved settings
    pub settings_dirty: bool,
    /// Auto-start was changed during this session
    pub changed_auto_start: bool,
    /// Sound was changed during this session
    pub changed_sound: bool,
}

/// Everything a front end needs to draw the timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub state_text: String,
    pub time_text: String,
    pub hint_text: String,
    pub long_hint_text: String,
    pub today_text: String,
    pub since_long_text: String,
    pub status_text: String,
    pub cycle_text: String,
    pub dirty_text: String,
    pub session_changes_text: String,
    pub title_text: String,
}

impl ViewModel {
    pub fn build(
        timer: &TimerState,
        status: TimerStatus,
        stats: &Stats,
        settings: &Settings,
        ui: &UiState,
        volatile_storage: bool,
    ) -> Self {
        let label = state_label(timer.phase);
        let time_text = format::clock(timer.remaining_sec);
        let storage_suffix = if volatile_storage { " (Volatile Storage)" } else { "" };

        let mut changed = Vec::new();
        if ui.changed_auto_start {
            changed.push("Auto-Start");
        }
        if ui.changed_sound {
            changed.push("Sound");
        }
        let session_changes = if changed.is_empty() {
            "None".to_string()
        } else {
            changed.join(", ")
        };

        Self {
            state_text: label.to_string(),
            title_text: format!("{} - {}", time_text, label),
            time_text,
            hint_text: timer.phase.hint().to_string(),
            long_hint_text: timer.phase.long_hint().to_string(),
            today_text: format!("Focus Blocks Today: {}", stats.focus_blocks_today),
            since_long_text: format!(
                "Since Long Break: {}/{}",
                stats.focus_blocks_since_long, settings.blocks_per_ultradian
            ),
            status_text: format!("Status: {}{}", status.label(), storage_suffix),
            cycle_text: format!("Cycle {}", stats.focus_blocks_today),
            dirty_text: if ui.settings_dirty {
                "Unsaved Changes".to_string()
            } else {
                "All Settings Saved".to_string()
            },
            session_changes_text: format!("Session Changes: {}", session_changes),
        }
    }
}
