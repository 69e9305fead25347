//! The timer controller
//!
//! Owns the timer state and statistics, drives the pure phase graph and
//! elapsed consumer from a [`Clock`], and reports what happened as a list of
//! [`TimerEvent`]s returned from every operation. Nothing here fails: invalid
//! transitions are ignored and runaway schedules are stopped.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::elapsed::{consume_elapsed, ConsumeOptions, TimerSnapshot, MAX_TRANSITIONS_PER_TICK};
use crate::phase::{initial_phase, is_valid_transition, next_phase, phase_duration_sec, state_label, Phase};
use crate::settings::Settings;
use crate::stats::Stats;

/// Why a phase was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// First press of start; announces the phase the timer was sitting in
    InitialStart,
    /// Explicit entry through [`TimerController::enter_phase`]
    Transition,
    Skip,
    /// A phase ran out during a tick
    Timer,
    Reset,
    Init,
}

impl ChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeReason::InitialStart => "initial_start",
            ChangeReason::Transition => "transition",
            ChangeReason::Skip => "skip",
            ChangeReason::Timer => "timer",
            ChangeReason::Reset => "reset",
            ChangeReason::Init => "init",
        }
    }

    /// Reset-like entries bypass phase graph validation
    pub fn is_reset_like(&self) -> bool {
        matches!(self, ChangeReason::Reset | ChangeReason::Init)
    }
}

/// Payload of a phase change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseChange {
    /// `None` for the initial start announcement
    pub from: Option<Phase>,
    pub to: Phase,
    pub label: &'static str,
    pub reason: ChangeReason,
}

/// Something observers of the timer should react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    PhaseChanged(PhaseChange),
    /// The timer state or statistics changed and should be re-rendered
    StateChanged,
}

/// Lifecycle as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    /// Never started
    Idle,
    Running,
    /// Started at least once, currently stopped
    Paused,
}

impl TimerStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "Idle",
            TimerStatus::Running => "Running",
            TimerStatus::Paused => "Paused",
        }
    }
}

/// Mutable timer state
#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    pub phase: Phase,
    pub remaining_sec: f64,
    pub running: bool,
    /// Wall-clock time of the last consumed tick, absent while stopped
    pub last_tick_ms: Option<i64>,
    pub has_started_once: bool,
}

impl TimerState {
    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase,
            remaining_sec: self.remaining_sec,
            running: self.running,
        }
    }
}

/// Options for [`TimerController::enter_phase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnterOptions {
    pub reason: ChangeReason,
    /// Defaults to the auto-start setting
    pub auto_start: Option<bool>,
    /// Count a completed focus block when entering recall
    pub credit_focus: bool,
}

impl Default for EnterOptions {
    fn default() -> Self {
        Self {
            reason: ChangeReason::Transition,
            auto_start: None,
            credit_focus: false,
        }
    }
}

impl EnterOptions {
    pub fn reason(reason: ChangeReason) -> Self {
        Self {
            reason,
            ..Self::default()
        }
    }
}

/// Stateful driver for one timer
pub struct TimerController<C: Clock> {
    settings: Settings,
    stats: Stats,
    state: TimerState,
    clock: C,
    max_transitions: u32,
}

impl<C: Clock> TimerController<C> {
    /// A timer sitting idle at the start of the cycle
    pub fn new(settings: Settings, stats: Stats, clock: C) -> Self {
        let phase = initial_phase(&settings);
        let state = TimerState {
            phase,
            remaining_sec: phase_duration_sec(phase, &settings),
            running: false,
            last_tick_ms: None,
            has_started_once: false,
        };
        let stats = stats.clamped().rollover(&clock.date_key());
        Self {
            settings,
            stats,
            state,
            clock,
            max_transitions: MAX_TRANSITIONS_PER_TICK,
        }
    }

    pub fn with_max_transitions(mut self, max_transitions: u32) -> Self {
        self.max_transitions = max_transitions.max(1);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn status(&self) -> TimerStatus {
        if self.state.running {
            TimerStatus::Running
        } else if self.state.has_started_once {
            TimerStatus::Paused
        } else {
            TimerStatus::Idle
        }
    }

    /// Bring statistics up to the current day
    pub fn rollover_stats(&mut self) {
        self.stats = self.stats.rollover(&self.clock.date_key());
    }

    pub fn start(&mut self) -> Vec<TimerEvent> {
        self.rollover_stats();
        let mut events = Vec::new();

        if !self.state.has_started_once {
            events.push(TimerEvent::PhaseChanged(PhaseChange {
                from: None,
                to: self.state.phase,
                label: state_label(self.state.phase),
                reason: ChangeReason::InitialStart,
            }));
            self.state.has_started_once = true;
        }

        self.state.running = true;
        self.state.last_tick_ms = Some(self.clock.now_ms());
        events.push(TimerEvent::StateChanged);
        events
    }

    pub fn pause(&mut self) -> Vec<TimerEvent> {
        self.state.running = false;
        self.state.last_tick_ms = None;
        vec![TimerEvent::StateChanged]
    }

    /// Stop and return to the start of the cycle
    pub fn reset(&mut self) -> Vec<TimerEvent> {
        let phase = initial_phase(&self.settings);
        self.reset_to_phase(phase)
    }

    /// Stop and jump straight to `phase`, bypassing the phase graph
    pub fn reset_to_phase(&mut self, phase: Phase) -> Vec<TimerEvent> {
        self.rollover_stats();
        self.state.running = false;
        self.state.last_tick_ms = None;
        self.state.phase = phase;
        self.state.remaining_sec = phase_duration_sec(phase, &self.settings);
        debug!(%phase, "timer reset");
        vec![TimerEvent::StateChanged]
    }

    /// Move to the next phase without crediting a focus block
    pub fn skip(&mut self) -> Vec<TimerEvent> {
        let from = self.state.phase;
        let to = next_phase(from, &self.stats, &self.settings);
        if !is_valid_transition(from, to, &self.stats, &self.settings) {
            return Vec::new();
        }
        self.enter_phase(
            to,
            EnterOptions {
                reason: ChangeReason::Skip,
                auto_start: Some(self.settings.auto_start),
                credit_focus: false,
            },
        )
    }

    /// Enter `phase` with its full duration
    ///
    /// Unless the reason is reset-like, `phase` must be the one the graph
    /// schedules next; anything else is ignored and produces no events.
    pub fn enter_phase(&mut self, phase: Phase, options: EnterOptions) -> Vec<TimerEvent> {
        let from = self.state.phase;
        if !options.reason.is_reset_like()
            && !is_valid_transition(from, phase, &self.stats, &self.settings)
        {
            debug!(%from, to = %phase, reason = options.reason.as_str(), "rejected transition");
            return Vec::new();
        }

        if phase == Phase::Recall && options.credit_focus {
            self.stats.credit_focus();
        }
        if phase == Phase::LongBreak {
            self.stats.start_long_break();
        }

        self.state.phase = phase;
        self.state.remaining_sec = phase_duration_sec(phase, &self.settings);
        self.state.running = options.auto_start.unwrap_or(self.settings.auto_start);
        self.state.last_tick_ms = if self.state.running {
            Some(self.clock.now_ms())
        } else {
            None
        };

        debug!(%from, to = %phase, reason = options.reason.as_str(), "entered phase");
        vec![
            TimerEvent::PhaseChanged(PhaseChange {
                from: Some(from),
                to: phase,
                label: state_label(phase),
                reason: options.reason,
            }),
            TimerEvent::StateChanged,
        ]
    }

    /// Consume the wall-clock time since the previous tick
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if !self.state.running {
            return Vec::new();
        }

        self.rollover_stats();
        let now = self.clock.now_ms();
        let last = match self.state.last_tick_ms {
            Some(last) => last,
            None => {
                self.state.last_tick_ms = Some(now);
                return Vec::new();
            }
        };

        let delta_ms = now - last;
        if delta_ms <= 0 {
            if delta_ms < 0 {
                // The clock went backwards; count from the new reading.
                self.state.last_tick_ms = Some(now);
            }
            return Vec::new();
        }
        self.state.last_tick_ms = Some(now);

        let consumed = consume_elapsed(
            &self.state.snapshot(),
            delta_ms as f64 / 1000.0,
            &self.settings,
            &self.stats,
            &self.clock.date_key(),
            ConsumeOptions::from_settings(&self.settings).with_max_transitions(self.max_transitions),
        );

        self.state.phase = consumed.timer.phase;
        self.state.remaining_sec = consumed.timer.remaining_sec;
        self.state.running = consumed.timer.running;
        if !self.state.running {
            self.state.last_tick_ms = None;
        }
        self.stats = consumed.stats;

        if consumed.transition_limit_hit {
            warn!(phase = %self.state.phase, "timer stopped after too many transitions in one tick");
            self.state.running = false;
            self.state.last_tick_ms = None;
            self.state.remaining_sec = phase_duration_sec(self.state.phase, &self.settings);
            return vec![TimerEvent::StateChanged];
        }

        let mut events: Vec<TimerEvent> = consumed
            .events
            .iter()
            .map(|t| {
                TimerEvent::PhaseChanged(PhaseChange {
                    from: Some(t.from),
                    to: t.to,
                    label: state_label(t.to),
                    reason: ChangeReason::Timer,
                })
            })
            .collect();
        events.push(TimerEvent::StateChanged);
        events
    }

    /// Swap in new settings
    ///
    /// A stopped timer keeps the time already spent in the current phase. If
    /// prep was turned off while the timer sits in prep, it jumps to focus.
    pub fn apply_settings(&mut self, settings: Settings) -> Vec<TimerEvent> {
        let old_duration = phase_duration_sec(self.state.phase, &self.settings);
        let elapsed_in_phase = (old_duration - self.state.remaining_sec).max(0.0);
        self.settings = settings;

        if !self.state.running {
            let new_duration = phase_duration_sec(self.state.phase, &self.settings);
            self.state.remaining_sec = (new_duration - elapsed_in_phase).max(0.0);
        }

        if !self.settings.prep_enabled && self.state.phase == Phase::Prep {
            return self.reset_to_phase(Phase::Focus);
        }

        vec![TimerEvent::StateChanged]
    }
}
