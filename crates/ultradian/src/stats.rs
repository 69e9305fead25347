//! Daily focus statistics
//!
//! Two rolling counters: focus blocks completed today, and focus blocks
//! completed since the last long break. Only the first one rolls over at
//! the day boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::settings::{clamp_int, Bounds};

/// Ceiling for both counters
pub const MAX_COUNT: u32 = 100_000;

const COUNT_BOUNDS: Bounds = Bounds {
    min: 0,
    max: MAX_COUNT,
};

/// Focus statistics scoped to one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Identity of the day these counts belong to
    pub date_key: String,
    pub focus_blocks_today: u32,
    pub focus_blocks_since_long: u32,
}

impl Stats {
    /// Empty statistics for the given day
    pub fn new(today: &str) -> Self {
        Self {
            date_key: today.to_string(),
            focus_blocks_today: 0,
            focus_blocks_since_long: 0,
        }
    }

    /// Build statistics from an arbitrary JSON value, then roll over to `today`
    pub fn normalize(raw: &Value, today: &str) -> Self {
        // A present but non-text key belongs to no day, so it rolls over
        let date_key = match raw.get("dateKey") {
            None => today.to_string(),
            Some(Value::String(key)) => key.clone(),
            Some(_) => String::new(),
        };
        let stats = Self {
            date_key,
            focus_blocks_today: clamp_int(raw.get("focusBlocksToday"), 0, COUNT_BOUNDS),
            focus_blocks_since_long: clamp_int(raw.get("focusBlocksSinceLong"), 0, COUNT_BOUNDS),
        };
        stats.rollover(today)
    }

    /// Both counters pulled into `0..=MAX_COUNT`
    pub fn clamped(&self) -> Self {
        Self {
            date_key: self.date_key.clone(),
            focus_blocks_today: self.focus_blocks_today.min(COUNT_BOUNDS.max),
            focus_blocks_since_long: self.focus_blocks_since_long.min(COUNT_BOUNDS.max),
        }
    }

    /// Statistics as seen on `today`
    ///
    /// A different day clears the daily count and keeps the long-break count.
    pub fn rollover(&self, today: &str) -> Self {
        let mut next = self.clone();
        if next.date_key != today {
            next.date_key = today.to_string();
            next.focus_blocks_today = 0;
        }
        next
    }

    /// Count one completed focus block
    pub fn credit_focus(&mut self) {
        self.focus_blocks_today = self.focus_blocks_today.saturating_add(1).min(MAX_COUNT);
        self.focus_blocks_since_long = self.focus_blocks_since_long.saturating_add(1).min(MAX_COUNT);
    }

    /// A long break starts a new ultradian cycle
    pub fn start_long_break(&mut self) {
        self.focus_blocks_since_long = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rollover_new_day() {
        let old = Stats {
            date_key: "Mon Jan 01 2001".to_string(),
            focus_blocks_today: 7,
            focus_blocks_since_long: 3,
        };
        let rolled = old.rollover("Tue Jan 02 2001");
        assert_eq!(rolled.date_key, "Tue Jan 02 2001");
        assert_eq!(rolled.focus_blocks_today, 0);
        assert_eq!(rolled.focus_blocks_since_long, 3);
    }

    #[test]
    fn test_rollover_is_idempotent() {
        let old = Stats {
            date_key: "Mon Jan 01 2001".to_string(),
            focus_blocks_today: 4,
            focus_blocks_since_long: 1,
        };
        let once = old.rollover("Tue Jan 02 2001");
        let twice = once.rollover("Tue Jan 02 2001");
        assert_eq!(once, twice);

        let same_day = old.rollover("Mon Jan 01 2001");
        assert_eq!(same_day, old);
    }

    #[test]
    fn test_normalize_clamps_and_defaults() {
        let today = "Wed Jan 03 2001";
        let stats = Stats::normalize(
            &json!({"dateKey": today, "focusBlocksToday": -4, "focusBlocksSinceLong": 1e12}),
            today,
        );
        assert_eq!(stats.focus_blocks_today, 0);
        assert_eq!(stats.focus_blocks_since_long, MAX_COUNT);

        let empty = Stats::normalize(&Value::Null, today);
        assert_eq!(empty, Stats::new(today));

        let corrupt = Stats::normalize(&json!({"focusBlocksToday": "lots"}), today);
        assert_eq!(corrupt.focus_blocks_today, 0);
        assert_eq!(corrupt.date_key, today);
    }

    #[test]
    fn test_normalize_rolls_over_stale_day() {
        let stats = Stats::normalize(
            &json!({"dateKey": "Mon Jan 01 2001", "focusBlocksToday": 5, "focusBlocksSinceLong": 2}),
            "Tue Jan 02 2001",
        );
        assert_eq!(stats.focus_blocks_today, 0);
        assert_eq!(stats.focus_blocks_since_long, 2);
    }

    #[test]
    fn test_credit_and_long_break() {
        let mut stats = Stats::new("Mon Jan 01 2001");
        stats.credit_focus();
        stats.credit_focus();
        assert_eq!(stats.focus_blocks_today, 2);
        assert_eq!(stats.focus_blocks_since_long, 2);

        stats.start_long_break();
        assert_eq!(stats.focus_blocks_today, 2);
        assert_eq!(stats.focus_blocks_since_long, 0);
    }

    #[test]
    fn test_credit_saturates_at_ceiling() {
        let mut stats = Stats {
            date_key: "Mon Jan 01 2001".to_string(),
            focus_blocks_today: MAX_COUNT,
            focus_blocks_since_long: MAX_COUNT,
        };
        stats.credit_focus();
        assert_eq!(stats.focus_blocks_today, MAX_COUNT);
        assert_eq!(stats.focus_blocks_since_long, MAX_COUNT);
    }

    #[test]
    fn test_credit_near_integer_limit() {
        let mut stats = Stats {
            date_key: "Mon Jan 01 2001".to_string(),
            focus_blocks_today: u32::MAX,
            focus_blocks_since_long: u32::MAX - 1,
        };
        stats.credit_focus();
        assert_eq!(stats.focus_blocks_today, MAX_COUNT);
        assert_eq!(stats.focus_blocks_since_long, MAX_COUNT);

        let huge = Stats {
            date_key: "Mon Jan 01 2001".to_string(),
            focus_blocks_today: u32::MAX,
            focus_blocks_since_long: 7,
        };
        let clamped = huge.clamped();
        assert_eq!(clamped.focus_blocks_today, MAX_COUNT);
        assert_eq!(clamped.focus_blocks_since_long, 7);
        assert_eq!(clamped.date_key, huge.date_key);
    }

    #[test]
    fn test_non_text_date_key_rolls_over() {
        let today = "Tue Jan 02 2001";
        for key in [json!(null), json!(20010101), json!(["Tue Jan 02 2001"])] {
            let stats = Stats::normalize(
                &json!({"dateKey": key, "focusBlocksToday": 5, "focusBlocksSinceLong": 2}),
                today,
            );
            assert_eq!(stats.date_key, today);
            assert_eq!(stats.focus_blocks_today, 0);
            assert_eq!(stats.focus_blocks_since_long, 2);
        }

        let missing = Stats::normalize(&json!({"focusBlocksToday": 5}), today);
        assert_eq!(missing.focus_blocks_today, 5);
    }

    #[test]
    fn test_serialized_shape() {
        let stats = Stats::new("Mon Jan 01 2001");
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["dateKey"], "Mon Jan 01 2001");
        assert_eq!(value["focusBlocksToday"], 0);
        assert_eq!(value["focusBlocksSinceLong"], 0);
    }
}
