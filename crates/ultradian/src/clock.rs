//! Time sources
//!
//! The controller never reads the wall clock directly. It asks a [`Clock`]
//! for milliseconds and for the identity of the current day, so tests can
//! move time by hand.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{DateTime, Local, NaiveDate};

/// Format of the day identity, e.g. `Mon Jan 01 2001`
const DATE_KEY_FORMAT: &str = "%a %b %d %Y";

/// Day identity for a local timestamp
pub fn date_key(dt: DateTime<Local>) -> String {
    date_key_for(dt.date_naive())
}

/// Day identity for a calendar date
pub fn date_key_for(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// A source of wall-clock time
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> i64;

    /// Identity of the current local calendar day
    fn date_key(&self) -> String;
}

/// The real local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Local::now().timestamp_millis()
    }

    fn date_key(&self) -> String {
        date_key(Local::now())
    }
}

/// A hand-driven clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Rc<Cell<i64>>,
    day: Rc<RefCell<String>>,
}

impl ManualClock {
    pub fn new(now_ms: i64, day: &str) -> Self {
        Self {
            now_ms: Rc::new(Cell::new(now_ms)),
            day: Rc::new(RefCell::new(day.to_string())),
        }
    }

    /// Move time forward (or backward, for a negative delta)
    pub fn advance_ms(&self, delta: i64) {
        self.now_ms.set(self.now_ms.get() + delta);
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance_ms((secs * 1000.0).round() as i64);
    }

    pub fn set_day(&self, day: &str) {
        *self.day.borrow_mut() = day.to_string();
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }

    fn date_key(&self) -> String {
        self.day.borrow().clone()
    }
}
