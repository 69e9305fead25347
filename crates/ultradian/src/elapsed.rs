//! Fast-forwarding the timer across elapsed wall-clock time
//!
//! A backgrounded or suspended process may come back after an hour. Feeding
//! that hour through [`consume_elapsed`] gives the same phase, remaining time
//! and statistics as if small ticks had been applied the whole time.

use tracing::{debug, warn};

use crate::phase::{next_phase, phase_duration_sec, Phase};
use crate::settings::Settings;
use crate::stats::Stats;

/// Default bound on transitions handled by one call
pub const MAX_TRANSITIONS_PER_TICK: u32 = 1000;

/// The part of the timer state the consumer works on
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub remaining_sec: f64,
    pub running: bool,
}

/// Knobs for [`consume_elapsed`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumeOptions {
    /// Whether the next phase keeps running after a transition
    pub auto_start: bool,
    /// Loop iterations allowed before the timer is forcibly stopped
    pub max_transitions: u32,
}

impl ConsumeOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            auto_start: settings.auto_start,
            max_transitions: MAX_TRANSITIONS_PER_TICK,
        }
    }

    pub fn with_max_transitions(mut self, max_transitions: u32) -> Self {
        self.max_transitions = max_transitions;
        self
    }
}

/// A phase boundary crossed while consuming time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    /// True only for a completed focus block (focus -> recall)
    pub credit_focus: bool,
}

/// Result of [`consume_elapsed`]
#[derive(Debug, Clone, PartialEq)]
pub struct Consumed {
    pub timer: TimerSnapshot,
    pub stats: Stats,
    /// Transitions in the order they happened
    pub events: Vec<Transition>,
    /// Elapsed seconds left over when the loop stopped
    pub remaining_elapsed: f64,
    pub transition_limit_hit: bool,
}

/// Advance `timer` by `elapsed_sec` seconds
///
/// Statistics are clamped and rolled over to `today` before any transition
/// is applied.
/// Neither input is modified.
pub fn consume_elapsed(
    timer: &TimerSnapshot,
    elapsed_sec: f64,
    settings: &Settings,
    stats: &Stats,
    today: &str,
    options: ConsumeOptions,
) -> Consumed {
    let mut out_timer = timer.clone();
    let mut out_stats = stats.clamped().rollover(today);
    let mut remaining_elapsed = if elapsed_sec.is_finite() {
        elapsed_sec.max(0.0)
    } else {
        0.0
    };
    let mut events = Vec::new();
    let mut iterations: u32 = 0;
    let mut transition_limit_hit = false;

    while remaining_elapsed > 0.0 && out_timer.running {
        iterations += 1;
        if iterations > options.max_transitions {
            out_timer.running = false;
            transition_limit_hit = true;
            warn!(
                phase = %out_timer.phase,
                limit = options.max_transitions,
                "transition limit reached, stopping timer"
            );
            break;
        }

        if out_timer.remaining_sec > remaining_elapsed {
            out_timer.remaining_sec -= remaining_elapsed;
            remaining_elapsed = 0.0;
            break;
        }

        remaining_elapsed -= out_timer.remaining_sec.max(0.0);

        let from = out_timer.phase;
        let to = next_phase(from, &out_stats, settings);
        let credit_focus = from == Phase::Focus && to == Phase::Recall;

        if credit_focus {
            out_stats.credit_focus();
        }
        if to == Phase::LongBreak {
            out_stats.start_long_break();
        }

        out_timer.phase = to;
        out_timer.remaining_sec = phase_duration_sec(to, settings);
        out_timer.running = options.auto_start;

        debug!(%from, %to, credit_focus, "phase elapsed");
        events.push(Transition {
            from,
            to,
            credit_focus,
        });
    }

    Consumed {
        timer: out_timer,
        stats: out_stats,
        events,
        remaining_elapsed,
        transition_limit_hit,
    }
}
