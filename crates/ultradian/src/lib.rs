//! ultradian - Prep, focus, recall and break cycle timer
//!
//! "Work in blocks, recover on purpose."
//!
//! The engine runs a fixed cycle:
//! - Prep: name the one output of the next block (optional)
//! - Focus: single-task deep work
//! - Recall: write down what was done, learned and what is next
//! - Short break, or a long break after every `blocks_per_ultradian` blocks
//!
//! The phase graph and the elapsed-time consumer are pure functions. The
//! [`TimerController`] owns the mutable state and drives them from a
//! [`Clock`], and [`App`] connects the controller to storage, announcements
//! and the audio cue.

pub mod app;
pub mod clock;
pub mod elapsed;
pub mod phase;
pub mod settings;
pub mod stats;
pub mod store;
pub mod timer;
pub mod view;

pub use app::{Announcer, App, Chime, Shortcut, Theme};
pub use clock::{Clock, ManualClock, SystemClock};
pub use elapsed::{consume_elapsed, ConsumeOptions, Consumed, TimerSnapshot, Transition};
pub use phase::{initial_phase, is_valid_transition, next_phase, phase_duration_sec, state_label, Phase};
pub use settings::Settings;
pub use stats::Stats;
pub use store::{FileStore, KeyValueStore, MemoryStore, Storage, StorageMode, StoreError};
pub use timer::{ChangeReason, EnterOptions, PhaseChange, TimerController, TimerEvent, TimerState, TimerStatus};
pub use view::{UiState, ViewModel};
