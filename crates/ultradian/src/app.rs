//! The application around the timer
//!
//! Hydrates settings, statistics and the theme from storage, forwards timer
//! events to the announcer and chime, persists statistics whenever they
//! change, and handles the settings form: dirty tracking, save, and restore
//! defaults.

use serde_json::Value;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::phase::resolve_phase;
use crate::settings::Settings;
use crate::stats::Stats;
use crate::store::{KeyValueStore, Storage, StorageMode, SETTINGS_KEY, STATS_KEY, THEME_KEY};
use crate::timer::{PhaseChange, TimerController, TimerEvent};
use crate::view::{UiState, ViewModel};

/// Receives user-facing messages
pub trait Announcer {
    /// A phase started
    fn announce(&mut self, message: &str);
    /// Short-lived confirmation, e.g. after saving settings
    fn flash(&mut self, message: &str);
}

/// Plays the phase change cue
pub trait Chime {
    fn play(&mut self);
}

/// Colour scheme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Anything other than `light` reads as dark
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("light") {
            Theme::Light
        } else {
            Theme::Dark
        }
    }

    /// A user choice: anything other than `dark` selects light
    pub fn choose(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("dark") {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

/// Keyboard shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    /// Pause when running, start otherwise
    Toggle,
    Skip,
    Reset,
}

impl Shortcut {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "" | " " | "space" | "p" | "toggle" => Some(Shortcut::Toggle),
            "s" | "skip" => Some(Shortcut::Skip),
            "r" | "reset" => Some(Shortcut::Reset),
            _ => None,
        }
    }
}

/// Text announced when a phase starts
pub fn phase_started_message(change: &PhaseChange) -> String {
    format!("{} Started", change.label)
}

pub const SETTINGS_SAVED_MESSAGE: &str = "Settings Saved.";
pub const DEFAULTS_RESTORED_MESSAGE: &str = "Defaults Restored.";

/// Timer plus its collaborators
pub struct App<C: Clock, S: KeyValueStore> {
    timer: TimerController<C>,
    storage: Storage<S>,
    announcer: Box<dyn Announcer>,
    chime: Box<dyn Chime>,
    theme: Theme,
    ui: UiState,
    last_saved_stats: Option<Stats>,
}

impl<C: Clock, S: KeyValueStore> App<C, S> {
    /// Load persisted state and build an idle timer at the start of the cycle
    pub fn hydrate(backend: S, clock: C, announcer: Box<dyn Announcer>, chime: Box<dyn Chime>) -> Self {
        let mut storage = Storage::new(backend);
        let today = clock.date_key();

        let raw_settings = storage.get_json(SETTINGS_KEY, Settings::default().to_value());
        let settings = Settings::normalize(&raw_settings);

        let default_stats = serde_json::to_value(Stats::new(&today)).unwrap_or(Value::Null);
        let raw_stats = storage.get_json(STATS_KEY, default_stats);
        let stats = Stats::normalize(&raw_stats, &today);
        // What is actually on disk, so a rolled-over or repaired record gets rewritten
        let persisted = serde_json::from_value::<Stats>(raw_stats).ok();

        let theme = Theme::parse(&storage.get_text(THEME_KEY, Theme::Dark.as_str()));

        debug!(?settings, ?stats, theme = theme.as_str(), "hydrated from storage");

        let mut app = Self {
            last_saved_stats: persisted,
            timer: TimerController::new(settings, stats, clock),
            storage,
            announcer,
            chime,
            theme,
            ui: UiState::default(),
        };
        app.on_state_change();
        app
    }

    pub fn with_max_transitions(mut self, max_transitions: u32) -> Self {
        self.timer = self.timer.with_max_transitions(max_transitions);
        self
    }

    pub fn timer(&self) -> &TimerController<C> {
        &self.timer
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage.mode()
    }

    pub fn storage(&self) -> &Storage<S> {
        &self.storage
    }

    pub fn start(&mut self) {
        let events = self.timer.start();
        self.dispatch(events);
    }

    pub fn pause(&mut self) {
        let events = self.timer.pause();
        self.dispatch(events);
    }

    pub fn skip(&mut self) {
        let events = self.timer.skip();
        self.dispatch(events);
    }

    pub fn reset(&mut self) {
        let events = self.timer.reset();
        self.dispatch(events);
    }

    /// Stop and jump to the phase called `name`; unknown names go to the start of the cycle
    pub fn reset_to_phase(&mut self, name: &str) {
        let phase = resolve_phase(name, self.timer.settings());
        let events = self.timer.reset_to_phase(phase);
        self.dispatch(events);
    }

    pub fn tick(&mut self) {
        let events = self.timer.tick();
        self.dispatch(events);
    }

    pub fn shortcut(&mut self, action: Shortcut) {
        match action {
            Shortcut::Toggle => {
                if self.timer.state().running {
                    self.pause();
                } else {
                    self.start();
                }
            }
            Shortcut::Skip => self.skip(),
            Shortcut::Reset => self.reset(),
        }
    }

    /// Track whether the settings form differs from the saved settings
    pub fn on_settings_input(&mut self, raw: &Value) {
        let normalized = Settings::normalize(raw);
        self.ui.settings_dirty = &normalized != self.timer.settings();
        self.on_state_change();
    }

    /// Normalize, persist and apply new settings
    pub fn save_settings(&mut self, raw: &Value) {
        let next = Settings::normalize(raw);
        let current = self.timer.settings();
        if next.auto_start != current.auto_start {
            self.ui.changed_auto_start = true;
        }
        if next.sound_enabled != current.sound_enabled {
            self.ui.changed_sound = true;
        }

        self.storage.set_json(SETTINGS_KEY, &next);
        info!(?next, "settings saved");
        let events = self.timer.apply_settings(next);

        self.ui.settings_dirty = false;
        self.announcer.flash(SETTINGS_SAVED_MESSAGE);
        self.dispatch(events);
    }

    /// Go back to default settings and the start of the cycle
    pub fn restore_defaults(&mut self) {
        let defaults = Settings::default();
        self.storage.set_json(SETTINGS_KEY, &defaults);

        self.ui = UiState::default();

        let mut events = self.timer.apply_settings(defaults);
        events.extend(self.timer.reset());
        self.dispatch(events);
        self.announcer.flash(DEFAULTS_RESTORED_MESSAGE);
    }

    pub fn set_theme(&mut self, text: &str) {
        self.theme = Theme::choose(text);
        self.storage.set_text(THEME_KEY, self.theme.as_str());
        self.on_state_change();
    }

    pub fn view(&self) -> ViewModel {
        ViewModel::build(
            self.timer.state(),
            self.timer.status(),
            self.timer.stats(),
            self.timer.settings(),
            &self.ui,
            self.storage.mode() == StorageMode::Memory,
        )
    }

    fn dispatch(&mut self, events: Vec<TimerEvent>) {
        for event in events {
            match event {
                TimerEvent::PhaseChanged(change) => self.on_phase_change(&change),
                TimerEvent::StateChanged => self.on_state_change(),
            }
        }
    }

    fn on_phase_change(&mut self, change: &PhaseChange) {
        info!(
            from = change.from.map(|p| p.as_str()).unwrap_or("-"),
            to = %change.to,
            reason = change.reason.as_str(),
            "phase started"
        );
        if self.timer.settings().sound_enabled {
            self.chime.play();
        }
        self.announcer.announce(&phase_started_message(change));
    }

    fn on_state_change(&mut self) {
        self.timer.rollover_stats();
        self.persist_stats_if_changed();
    }

    fn persist_stats_if_changed(&mut self) {
        let stats = self.timer.stats();
        if self.last_saved_stats.as_ref() == Some(stats) {
            return;
        }
        let stats = stats.clone();
        self.storage.set_json(STATS_KEY, &stats);
        debug!(?stats, "statistics persisted");
        self.last_saved_stats = Some(stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::phase::Phase;
    use crate::store::{MemoryStore, StoreError};
    use crate::timer::TimerStatus;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    const DAY: &str = "Mon Jan 01 2001";

    #[derive(Clone, Default)]
    struct Recorder {
        announced: Rc<RefCell<Vec<String>>>,
        flashed: Rc<RefCell<Vec<String>>>,
        chimes: Rc<RefCell<u32>>,
    }

    impl Announcer for Recorder {
        fn announce(&mut self, message: &str) {
            self.announced.borrow_mut().push(message.to_string());
        }

        fn flash(&mut self, message: &str) {
            self.flashed.borrow_mut().push(message.to_string());
        }
    }

    impl Chime for Recorder {
        fn play(&mut self) {
            *self.chimes.borrow_mut() += 1;
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get_text(&self, key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::InvalidKey(key.to_string()))
        }

        fn set_text(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::InvalidKey(key.to_string()))
        }
    }

    fn app_with<S: KeyValueStore>(store: S) -> (App<ManualClock, S>, ManualClock, Recorder) {
        let clock = ManualClock::new(0, DAY);
        let recorder = Recorder::default();
        let app = App::hydrate(
            store,
            clock.clone(),
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
        );
        (app, clock, recorder)
    }

    fn one_minute_store() -> MemoryStore {
        let mut store = MemoryStore::default();
        store
            .set_text(
                SETTINGS_KEY,
                r#"{"prep":1,"focus":1,"recall":1,"short_break":1,"long_break":1,"blocks_per_ultradian":2}"#,
            )
            .unwrap();
        store
    }

    fn stored_stats(app: &App<ManualClock, MemoryStore>) -> Value {
        let text = app.storage().backend().get_text(STATS_KEY).unwrap().unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_hydrate_with_empty_store() {
        let (app, _, _) = app_with(MemoryStore::default());
        assert_eq!(app.timer().settings(), &Settings::default());
        assert_eq!(app.timer().state().phase, Phase::Prep);
        assert_eq!(app.timer().status(), TimerStatus::Idle);
        assert_eq!(app.theme(), Theme::Dark);
        assert_eq!(app.storage_mode(), StorageMode::Local);
    }

    #[test]
    fn test_hydrate_recovers_from_corrupt_data() {
        let mut store = MemoryStore::default();
        store.set_text(SETTINGS_KEY, "{{{").unwrap();
        store.set_text(STATS_KEY, "[1, 2").unwrap();
        store.set_text(THEME_KEY, "purple").unwrap();

        let (app, _, _) = app_with(store);
        assert_eq!(app.timer().settings(), &Settings::default());
        assert_eq!(app.timer().stats(), &Stats::new(DAY));
        assert_eq!(app.theme(), Theme::Dark);
    }

    #[test]
    fn test_hydrate_rolls_over_stale_stats_and_persists() {
        let mut store = MemoryStore::default();
        store
            .set_text(
                STATS_KEY,
                r#"{"dateKey":"Sun Dec 31 2000","focusBlocksToday":6,"focusBlocksSinceLong":1}"#,
            )
            .unwrap();
        let (app, _, _) = app_with(store);
        assert_eq!(app.timer().stats().focus_blocks_today, 0);
        assert_eq!(app.timer().stats().focus_blocks_since_long, 1);

        let stored = stored_stats(&app);
        assert_eq!(stored["dateKey"], DAY);
        assert_eq!(stored["focusBlocksToday"], 0);
    }

    #[test]
    fn test_phase_changes_announce_and_chime() {
        let (mut app, clock, recorder) = app_with(one_minute_store());
        app.start();
        assert_eq!(*recorder.announced.borrow(), vec!["Prep Started".to_string()]);
        assert_eq!(*recorder.chimes.borrow(), 1);

        clock.advance_secs(121.0);
        app.tick();
        assert_eq!(
            *recorder.announced.borrow(),
            vec![
                "Prep Started".to_string(),
                "Focus Started".to_string(),
                "Recall Started".to_string()
            ]
        );
        assert_eq!(*recorder.chimes.borrow(), 3);

        let stored = stored_stats(&app);
        assert_eq!(stored["focusBlocksToday"], 1);
        assert_eq!(stored["focusBlocksSinceLong"], 1);
    }

    #[test]
    fn test_sound_disabled_skips_chime() {
        let (mut app, _, recorder) = app_with(MemoryStore::default());
        app.save_settings(&json!({"sound_enabled": false}));
        app.skip();
        assert_eq!(*recorder.chimes.borrow(), 0);
        assert_eq!(recorder.announced.borrow().len(), 1);
        assert!(app.ui().changed_sound);
        assert!(!app.ui().changed_auto_start);
    }

    #[test]
    fn test_settings_dirty_tracking() {
        let (mut app, _, _) = app_with(MemoryStore::default());
        app.on_settings_input(&json!({"focus": 50}));
        assert!(app.ui().settings_dirty);
        assert_eq!(app.view().dirty_text, "Unsaved Changes");

        app.on_settings_input(&Settings::default().to_value());
        assert!(!app.ui().settings_dirty);

        app.on_settings_input(&json!({"focus": 50}));
        app.save_settings(&json!({"focus": 50}));
        assert!(!app.ui().settings_dirty);
        assert_eq!(app.timer().settings().focus, 50);
    }

    #[test]
    fn test_save_settings_persists_and_flashes() {
        let (mut app, _, recorder) = app_with(MemoryStore::default());
        app.save_settings(&json!({"focus": 30, "prep_enabled": false}));

        let text = app.storage().backend().get_text(SETTINGS_KEY).unwrap().unwrap();
        let saved = Settings::normalize(&serde_json::from_str(&text).unwrap());
        assert_eq!(saved.focus, 30);
        assert!(!saved.prep_enabled);
        assert_eq!(*recorder.flashed.borrow(), vec![SETTINGS_SAVED_MESSAGE.to_string()]);

        // Prep was disabled while sitting in prep
        assert_eq!(app.timer().state().phase, Phase::Focus);
        assert_eq!(app.timer().state().remaining_sec, 30.0 * 60.0);
        assert!(recorder.announced.borrow().is_empty());
    }

    #[test]
    fn test_restore_defaults() {
        let (mut app, _, recorder) = app_with(one_minute_store());
        app.save_settings(&json!({"focus": 1, "auto_start": false}));
        app.start();
        app.skip();
        app.restore_defaults();

        assert_eq!(app.timer().settings(), &Settings::default());
        assert_eq!(app.timer().state().phase, Phase::Prep);
        assert_eq!(app.timer().state().remaining_sec, 120.0);
        assert!(!app.timer().state().running);
        assert_eq!(app.ui(), &UiState::default());
        assert_eq!(
            recorder.flashed.borrow().last().map(String::as_str),
            Some(DEFAULTS_RESTORED_MESSAGE)
        );
    }

    #[test]
    fn test_shortcuts() {
        let (mut app, _, _) = app_with(MemoryStore::default());
        app.shortcut(Shortcut::Toggle);
        assert_eq!(app.timer().status(), TimerStatus::Running);
        app.shortcut(Shortcut::Toggle);
        assert_eq!(app.timer().status(), TimerStatus::Paused);
        app.shortcut(Shortcut::Skip);
        assert_eq!(app.timer().state().phase, Phase::Focus);
        app.shortcut(Shortcut::Reset);
        assert_eq!(app.timer().state().phase, Phase::Prep);

        assert_eq!(Shortcut::from_key(" "), Some(Shortcut::Toggle));
        assert_eq!(Shortcut::from_key("S"), Some(Shortcut::Skip));
        assert_eq!(Shortcut::from_key("r"), Some(Shortcut::Reset));
        assert_eq!(Shortcut::from_key("x"), None);
    }

    #[test]
    fn test_theme_is_persisted() {
        let (mut app, _, _) = app_with(MemoryStore::default());
        app.set_theme("light");
        assert_eq!(app.theme(), Theme::Light);
        let stored = app.storage().backend().get_text(THEME_KEY).unwrap();
        assert_eq!(stored.as_deref(), Some("light"));

        app.set_theme("dark");
        assert_eq!(app.theme(), Theme::Dark);

        app.set_theme("neon");
        assert_eq!(app.theme(), Theme::Light);
        let stored = app.storage().backend().get_text(THEME_KEY).unwrap();
        assert_eq!(stored.as_deref(), Some("light"));
    }

    #[test]
    fn test_stored_theme_reads_dark_unless_light() {
        let mut store = MemoryStore::default();
        store.set_text(THEME_KEY, "neon").unwrap();
        let (app, _, _) = app_with(store);
        assert_eq!(app.theme(), Theme::Dark);

        let mut store = MemoryStore::default();
        store.set_text(THEME_KEY, "light").unwrap();
        let (app, _, _) = app_with(store);
        assert_eq!(app.theme(), Theme::Light);
    }

    #[test]
    fn test_reset_to_named_phase() {
        let (mut app, clock, _) = app_with(one_minute_store());
        app.start();
        clock.advance_secs(10.0);
        app.tick();

        app.reset_to_phase("recall");
        assert_eq!(app.timer().state().phase, Phase::Recall);
        assert_eq!(app.timer().status(), TimerStatus::Paused);
        assert_eq!(app.timer().state().remaining_sec, 60.0);

        app.reset_to_phase("break");
        assert_eq!(app.timer().state().phase, Phase::ShortBreak);

        app.reset_to_phase("nap");
        assert_eq!(app.timer().state().phase, Phase::Prep);
        assert_eq!(app.timer().stats().focus_blocks_today, 0);
    }

    #[test]
    fn test_broken_storage_is_volatile_but_works() {
        let (mut app, _, _) = app_with(BrokenStore);
        assert_eq!(app.storage_mode(), StorageMode::Memory);
        assert_eq!(app.view().status_text, "Status: Idle (Volatile Storage)");

        app.save_settings(&json!({"focus": 20}));
        assert_eq!(app.timer().settings().focus, 20);
        app.start();
        assert_eq!(app.view().status_text, "Status: Running (Volatile Storage)");
    }
}
