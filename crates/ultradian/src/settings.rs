//! Timer settings
//!
//! Settings arrive from storage or from the command line as loosely typed
//! JSON. [`Settings::normalize`] turns any such value into a record where
//! every field is inside its bounds, falling back per field to the default.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::phase::Phase;

/// Inclusive bounds for an integer setting
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
}

pub const PREP_BOUNDS: Bounds = Bounds { min: 0, max: 60 };
pub const FOCUS_BOUNDS: Bounds = Bounds { min: 1, max: 180 };
pub const RECALL_BOUNDS: Bounds = Bounds { min: 0, max: 30 };
pub const SHORT_BREAK_BOUNDS: Bounds = Bounds { min: 1, max: 60 };
pub const LONG_BREAK_BOUNDS: Bounds = Bounds { min: 1, max: 90 };
pub const BLOCKS_BOUNDS: Bounds = Bounds { min: 1, max: 8 };

/// Canonical timer settings. Durations are in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub prep: u32,
    pub focus: u32,
    pub recall: u32,
    pub short_break: u32,
    pub long_break: u32,
    /// Completed focus blocks before a long break replaces the short one
    pub blocks_per_ultradian: u32,
    pub prep_enabled: bool,
    pub auto_start: bool,
    pub sound_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prep: 2,
            focus: 45,
            recall: 3,
            short_break: 15,
            long_break: 25,
            blocks_per_ultradian: 2,
            prep_enabled: true,
            auto_start: true,
            sound_enabled: true,
        }
    }
}

impl Settings {
    /// Build settings from an arbitrary JSON value. Never fails.
    pub fn normalize(raw: &Value) -> Self {
        let defaults = Self::default();
        let int = |keys: &[&str], fallback: u32, bounds: Bounds| {
            clamp_int(lookup(raw, keys), fallback, bounds)
        };
        let flag = |keys: &[&str], fallback: bool| {
            lookup(raw, keys).and_then(Value::as_bool).unwrap_or(fallback)
        };

        Self {
            prep: int(&["prep", "prime"], defaults.prep, PREP_BOUNDS),
            focus: int(&["focus"], defaults.focus, FOCUS_BOUNDS),
            recall: int(&["recall"], defaults.recall, RECALL_BOUNDS),
            short_break: int(&["short_break", "break"], defaults.short_break, SHORT_BREAK_BOUNDS),
            long_break: int(&["long_break"], defaults.long_break, LONG_BREAK_BOUNDS),
            blocks_per_ultradian: int(
                &["blocks_per_ultradian"],
                defaults.blocks_per_ultradian,
                BLOCKS_BOUNDS,
            ),
            prep_enabled: flag(&["prep_enabled", "prime_enabled"], defaults.prep_enabled),
            auto_start: flag(&["auto_start"], defaults.auto_start),
            sound_enabled: flag(&["sound_enabled"], defaults.sound_enabled),
        }
    }

    /// Configured length of a phase in minutes
    pub fn minutes_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Prep => self.prep,
            Phase::Focus => self.focus,
            Phase::Recall => self.recall,
            Phase::ShortBreak => self.short_break,
            Phase::LongBreak => self.long_break,
        }
    }

    /// Serialize as the JSON shape accepted by [`Settings::normalize`]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// First present key wins; later keys are legacy aliases
fn lookup<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| raw.get(*key))
}

/// Round and clamp a loosely typed number, or return `fallback`
pub fn clamp_int(value: Option<&Value>, fallback: u32, bounds: Bounds) -> u32 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => {
            let rounded = (n + 0.5).floor();
            rounded.clamp(f64::from(bounds.min), f64::from(bounds.max)) as u32
        }
        _ => fallback,
    }
}
