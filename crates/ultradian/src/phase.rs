//! The phase graph
//!
//! A cycle runs prep -> focus -> recall -> short break, and every
//! `blocks_per_ultradian` completed focus blocks the short break is replaced
//! by a long break. Everything here is a pure function of the current phase,
//! statistics and settings.

use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::stats::Stats;

/// One stage of the work cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Settle in and name the one output of the next block
    Prep,
    /// Single-task deep work
    Focus,
    /// Write down what was done, learned and what comes next
    Recall,
    /// Short recovery between focus blocks
    ShortBreak,
    /// Deep recovery after a full ultradian cycle
    LongBreak,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Prep,
        Phase::Focus,
        Phase::Recall,
        Phase::ShortBreak,
        Phase::LongBreak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prep => "prep",
            Phase::Focus => "focus",
            Phase::Recall => "recall",
            Phase::ShortBreak => "short_break",
            Phase::LongBreak => "long_break",
        }
    }

    /// Parse a phase name, accepting the legacy `prime` and `break` names
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "prep" | "prime" => Some(Phase::Prep),
            "focus" => Some(Phase::Focus),
            "recall" => Some(Phase::Recall),
            "short_break" | "break" => Some(Phase::ShortBreak),
            "long_break" => Some(Phase::LongBreak),
            _ => None,
        }
    }

    /// Human-readable display name
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Prep => "Prep",
            Phase::Focus => "Focus",
            Phase::Recall => "Recall",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }

    /// One-line instruction shown under the countdown
    pub fn hint(&self) -> &'static str {
        match self {
            Phase::Prep => "Prepare your mind. Choose one clear goal.",
            Phase::Focus => "One task. Everything else closed.",
            Phase::Recall => "Lock it in.",
            Phase::ShortBreak => "Step away. No screens. Move. Reset.",
            Phase::LongBreak => "Deep reset: eat, move, go outside.",
        }
    }

    /// Longer explanation of what the phase is for
    pub fn long_hint(&self) -> &'static str {
        match self {
            Phase::Prep => {
                "Stand up, take a few slow breaths and say out loud the one specific thing \
                 you are about to do. Starting with intent switches you out of wandering mode."
            }
            Phase::Focus => {
                "Work on one clearly defined task with notifications off. Stay slightly \
                 challenged, do not switch windows, and keep going until the timer ends."
            }
            Phase::Recall => {
                "Stop working and write down what you finished, what you learned and the \
                 exact next step. The next block starts easier when this is on paper."
            }
            Phase::ShortBreak => {
                "Get away from the screen: walk, stretch, drink water, breathe. No scrolling, \
                 so the next focus block starts sharp."
            }
            Phase::LongBreak => {
                "Take a real reset. Eat, go outside, move or fully relax away from screens so \
                 the next cycle starts strong."
            }
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The phase a fresh or reset timer sits in
pub fn initial_phase(settings: &Settings) -> Phase {
    if settings.prep_enabled {
        Phase::Prep
    } else {
        Phase::Focus
    }
}

/// Resolve a phase by name; unknown names fall back to the initial phase
pub fn resolve_phase(name: &str, settings: &Settings) -> Phase {
    Phase::from_str(name).unwrap_or_else(|| initial_phase(settings))
}

/// The phase that follows `current`
pub fn next_phase(current: Phase, stats: &Stats, settings: &Settings) -> Phase {
    match current {
        Phase::Prep => Phase::Focus,
        Phase::Focus => Phase::Recall,
        Phase::Recall => {
            if stats.focus_blocks_since_long >= settings.blocks_per_ultradian {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            }
        }
        Phase::ShortBreak | Phase::LongBreak => Phase::Focus,
    }
}

/// Whether `to` is the phase the graph schedules after `from`
pub fn is_valid_transition(from: Phase, to: Phase, stats: &Stats, settings: &Settings) -> bool {
    next_phase(from, stats, settings) == to
}

/// Full length of a phase in seconds
pub fn phase_duration_sec(phase: Phase, settings: &Settings) -> f64 {
    (f64::from(settings.minutes_for(phase)) * 60.0).max(0.0)
}

/// Display name of a phase
pub fn state_label(phase: Phase) -> &'static str {
    phase.label()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(since_long: u32) -> Stats {
        Stats {
            date_key: "Mon Jan 01 2001".to_string(),
            focus_blocks_today: since_long,
            focus_blocks_since_long: since_long,
        }
    }

    fn settings_with_blocks(blocks: u32) -> Settings {
        Settings {
            blocks_per_ultradian: blocks,
            ..Settings::default()
        }
    }

    #[test]
    fn test_linear_transitions() {
        let settings = Settings::default();
        let s = stats(0);
        assert_eq!(next_phase(Phase::Prep, &s, &settings), Phase::Focus);
        assert_eq!(next_phase(Phase::Focus, &s, &settings), Phase::Recall);
        assert_eq!(next_phase(Phase::ShortBreak, &s, &settings), Phase::Focus);
        assert_eq!(next_phase(Phase::LongBreak, &s, &settings), Phase::Focus);
    }

    #[test]
    fn test_recall_goes_long_at_threshold() {
        let settings = settings_with_blocks(2);
        assert_eq!(next_phase(Phase::Recall, &stats(1), &settings), Phase::ShortBreak);
        assert_eq!(next_phase(Phase::Recall, &stats(2), &settings), Phase::LongBreak);
        assert_eq!(next_phase(Phase::Recall, &stats(5), &settings), Phase::LongBreak);
    }

    #[test]
    fn test_next_phase_is_always_valid() {
        for blocks in 1..=8 {
            let settings = settings_with_blocks(blocks);
            for since_long in 0..10 {
                let s = stats(since_long);
                for phase in Phase::ALL {
                    let next = next_phase(phase, &s, &settings);
                    assert!(is_valid_transition(phase, next, &s, &settings));
                }
            }
        }
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let settings = Settings::default();
        let s = stats(0);
        assert!(!is_valid_transition(Phase::Prep, Phase::Recall, &s, &settings));
        assert!(!is_valid_transition(Phase::Recall, Phase::LongBreak, &s, &settings));
    }

    #[test]
    fn test_initial_phase_follows_prep_toggle() {
        let mut settings = Settings::default();
        assert_eq!(initial_phase(&settings), Phase::Prep);
        settings.prep_enabled = false;
        assert_eq!(initial_phase(&settings), Phase::Focus);
    }

    #[test]
    fn test_unknown_phase_resolves_to_initial() {
        let mut settings = Settings::default();
        assert_eq!(resolve_phase("nap", &settings), Phase::Prep);
        settings.prep_enabled = false;
        assert_eq!(resolve_phase("", &settings), Phase::Focus);
        assert_eq!(resolve_phase("break", &settings), Phase::ShortBreak);
        assert_eq!(resolve_phase("prime", &settings), Phase::Prep);
    }

    #[test]
    fn test_phase_name_roundtrip() {
        for phase in Phase::ALL {
            assert_eq!(Phase::from_str(phase.as_str()), Some(phase));
        }
    }

    #[test]
    fn test_durations_and_labels() {
        let settings = Settings::default();
        assert_eq!(phase_duration_sec(Phase::Focus, &settings), 45.0 * 60.0);
        assert_eq!(phase_duration_sec(Phase::LongBreak, &settings), 25.0 * 60.0);
        assert_eq!(state_label(Phase::LongBreak), "Long Break");
        assert_eq!(state_label(Phase::ShortBreak), "Short Break");
        assert_eq!(state_label(Phase::Prep), "Prep");
    }
}
