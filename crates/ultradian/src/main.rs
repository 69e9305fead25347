//! ultradian - Prep, focus, recall and break cycle timer
//!
//! Usage:
//!   ultradian run [--start]     Run the timer in this terminal
//!   ultradian status            Show the cycle, today's blocks and settings
//!   ultradian stats             Show focus statistics
//!   ultradian settings show     Show current settings
//!   ultradian settings set ...  Change settings
//!   ultradian settings reset    Restore default settings
//!   ultradian theme [NAME]      Show or set the colour theme

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;
use ultradian_core::{format, Config, Paths};

use ultradian::phase::Phase;
use ultradian::{Announcer, App, Chime, FileStore, Settings, Shortcut, StorageMode, SystemClock};

/// ultradian - Prep, focus, recall and break cycle timer
#[derive(Parser)]
#[command(name = "ultradian")]
#[command(about = "Prep, focus, recall and break cycle timer with daily statistics")]
#[command(version)]
#[command(after_help = r#"THE CYCLE:
    prep -> focus -> recall -> short break -> focus -> ...
    Every N completed focus blocks the short break becomes a long break.

KEYS (while running, press Enter after each):
    <Enter> / p   start or pause
    s             skip to the next phase (does not count the block)
    r             reset to the start of the cycle
    q             quit

EXAMPLES:
    ultradian run --start                   # Start the cycle right away
    ultradian run --phase focus --start     # Skip prep this time
    ultradian settings set --focus 50       # 50 minute focus blocks
    ultradian settings set --prep-enabled false
    ultradian stats                         # Blocks completed today

LOGGING:
    Set RUST_LOG=ultradian=debug to trace phase transitions on stderr.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the timer in this terminal
    #[command(alias = "r")]
    Run {
        /// Start counting immediately
        #[arg(long)]
        start: bool,

        /// Begin at this phase (prep, focus, recall, short_break, long_break)
        #[arg(long)]
        phase: Option<String>,
    },

    /// Show the current cycle position, statistics and status
    #[command(alias = "st")]
    Status,

    /// Show focus statistics
    #[command(alias = "statistics")]
    Stats,

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Show or set the colour theme (dark or light)
    Theme {
        /// New theme
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show current settings
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one or more settings; values are clamped to their ranges
    Set(SettingsArgs),

    /// Restore default settings
    Reset,
}

#[derive(clap::Args, Default)]
struct SettingsArgs {
    /// Prep minutes (0-60)
    #[arg(long)]
    prep: Option<i64>,
    /// Focus minutes (1-180)
    #[arg(long)]
    focus: Option<i64>,
    /// Recall minutes (0-30)
    #[arg(long)]
    recall: Option<i64>,
    /// Short break minutes (1-60)
    #[arg(long)]
    short_break: Option<i64>,
    /// Long break minutes (1-90)
    #[arg(long)]
    long_break: Option<i64>,
    /// Focus blocks before a long break (1-8)
    #[arg(long)]
    blocks: Option<i64>,
    /// Start each cycle with a prep phase
    #[arg(long)]
    prep_enabled: Option<bool>,
    /// Start the next phase automatically
    #[arg(long)]
    auto_start: Option<bool>,
    /// Play a sound on phase change
    #[arg(long)]
    sound: Option<bool>,
}

// ANSI color codes
const GREEN: &str = "\x1b[0;32m";
const CYAN: &str = "\x1b[0;36m";
const MAGENTA: &str = "\x1b[0;35m";
const YELLOW: &str = "\x1b[0;33m";
const BOLD: &str = "\x1b[1m";
const NC: &str = "\x1b[0m";

/// Check if stdout is a TTY and colors should be used
fn use_colors() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

/// Conditionally apply color
fn color(code: &str, text: &str) -> String {
    if use_colors() {
        format!("{}{}{}", code, text, NC)
    } else {
        text.to_string()
    }
}

/// Prints announcements to the terminal
struct ConsoleAnnouncer;

impl Announcer for ConsoleAnnouncer {
    fn announce(&mut self, message: &str) {
        if use_colors() {
            print!("\r\x1b[2K");
        }
        println!("{} {}", color(MAGENTA, "[phase]"), message);
    }

    fn flash(&mut self, message: &str) {
        println!("{} {}", color(GREEN, "[ok]"), message);
    }
}

/// Rings the terminal bell
struct TerminalBell {
    enabled: bool,
}

impl Chime for TerminalBell {
    fn play(&mut self) {
        if self.enabled {
            print!("\x07");
            let _ = std::io::stdout().flush();
        }
    }
}

type CliApp = App<SystemClock, FileStore>;

fn open_app(paths: &Paths, config: &Config) -> CliApp {
    App::hydrate(
        FileStore::new(&paths.store()),
        SystemClock,
        Box::new(ConsoleAnnouncer),
        Box::new(TerminalBell {
            enabled: config.terminal_bell,
        }),
    )
    .with_max_transitions(config.max_transitions)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = Paths::new();
    let config = Config::load(&paths.config_file())?;
    let mut app = open_app(&paths, &config);

    match cli.command {
        Some(Commands::Run { start, phase }) => {
            if let Some(name) = phase {
                app.reset_to_phase(&name);
            }
            let rt = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            rt.block_on(cmd_run(&mut app, &config, start))
        }
        Some(Commands::Status) | None => cmd_status(&app),
        Some(Commands::Stats) => cmd_stats(&app),
        Some(Commands::Settings { action }) => {
            match action.unwrap_or(SettingsAction::Show { json: false }) {
                SettingsAction::Show { json: true } => cmd_settings_json(&app),
                SettingsAction::Show { json: false } => cmd_settings_show(&app),
                SettingsAction::Set(args) => cmd_settings_set(&mut app, &args),
                SettingsAction::Reset => cmd_settings_reset(&mut app),
            }
        }
        Some(Commands::Theme { name }) => cmd_theme(&mut app, name),
    }
}

/// Run the timer until the user quits or stdin closes
async fn cmd_run(app: &mut CliApp, config: &Config, start: bool) -> Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_millis(config.tick_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_keys();
    warn_if_volatile(app);
    if start {
        app.start();
    }

    let mut last_line = String::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => app.tick(),
            line = lines.next_line() => {
                let Some(input) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match input.trim() {
                    "q" | "quit" | "exit" => break,
                    "h" | "?" | "help" => {
                        print_keys();
                        last_line.clear();
                    }
                    key => match Shortcut::from_key(key) {
                        Some(action) => app.shortcut(action),
                        None => println!("{} Unknown key: {}", color(YELLOW, "[warn]"), key),
                    },
                }
            }
        }
        draw(app, &mut last_line)?;
    }

    println!();
    Ok(())
}

/// Redraw the status line when it changed
fn draw(app: &CliApp, last_line: &mut String) -> Result<()> {
    let vm = app.view();
    let line = format!(
        "{}  {}   {}   {}",
        vm.state_text, vm.time_text, vm.today_text, vm.status_text
    );
    if line == *last_line {
        return Ok(());
    }

    let mut stdout = std::io::stdout();
    if use_colors() {
        write!(stdout, "\r\x1b[2K{}", color(BOLD, &line))?;
    } else {
        writeln!(stdout, "{}", line)?;
    }
    stdout.flush()?;
    *last_line = line;
    Ok(())
}

fn print_keys() {
    println!();
    println!("{}", color(&format!("{}{}", BOLD, MAGENTA), "ULTRADIAN"));
    println!("  <Enter>/p  start or pause");
    println!("  s          skip to the next phase");
    println!("  r          reset the cycle");
    println!("  q          quit");
    println!();
}

fn warn_if_volatile(app: &CliApp) {
    if app.storage_mode() == StorageMode::Memory {
        println!(
            "{} Storage unavailable; settings and statistics will not be saved",
            color(YELLOW, "[warn]")
        );
    }
}

/// Show where the cycle starts, the counters and the status
fn cmd_status(app: &CliApp) -> Result<()> {
    let vm = app.view();

    println!("{}", color(&format!("{}{}", BOLD, MAGENTA), &vm.state_text.to_uppercase()));
    println!();
    println!("  {}      {}", color(CYAN, "Time:"), vm.time_text);
    println!("  {}      {}", color(CYAN, "Hint:"), vm.hint_text);
    println!("  {}     {}", color(CYAN, "Today:"), vm.today_text);
    println!("  {}     {}", color(CYAN, "Cycle:"), vm.since_long_text);
    println!("  {}    {}", color(CYAN, "Status:"), vm.status_text);
    println!();
    println!("{}", vm.long_hint_text);
    println!();
    println!("Run 'ultradian run --start' to begin");

    Ok(())
}

/// Show focus statistics
fn cmd_stats(app: &CliApp) -> Result<()> {
    let stats = app.timer().stats();
    let settings = app.timer().settings();
    let focused = f64::from(stats.focus_blocks_today) * f64::from(settings.focus) * 60.0;

    println!("{}Focus Statistics ({}){}", BOLD, stats.date_key, NC);
    println!();
    println!("  {}   {}", color(CYAN, "Blocks Today:"), stats.focus_blocks_today);
    println!(
        "  {}    {}/{}",
        color(CYAN, "Since Long Break:"),
        stats.focus_blocks_since_long,
        settings.blocks_per_ultradian
    );
    println!("  {}     {}", color(CYAN, "Focus Time:"), format::duration(focused));

    Ok(())
}

fn cmd_settings_show(app: &CliApp) -> Result<()> {
    let settings = app.timer().settings();
    let cycle_secs: f64 = [Phase::Focus, Phase::Recall, Phase::ShortBreak]
        .iter()
        .map(|p| f64::from(settings.minutes_for(*p)) * 60.0)
        .sum();

    println!("{}Settings{}", BOLD, NC);
    println!();
    for phase in Phase::ALL {
        println!(
            "  {:<14} {:>3} min",
            color(CYAN, &format!("{}:", phase.label())),
            settings.minutes_for(phase)
        );
    }
    println!("  {:<14} {:>3}", color(CYAN, "Blocks:"), settings.blocks_per_ultradian);
    println!("  {:<14} {}", color(CYAN, "Prep:"), on_off(settings.prep_enabled));
    println!("  {:<14} {}", color(CYAN, "Auto-start:"), on_off(settings.auto_start));
    println!("  {:<14} {}", color(CYAN, "Sound:"), on_off(settings.sound_enabled));
    println!();
    println!("One focus block with recall and short break: {}", format::duration(cycle_secs));

    Ok(())
}

fn cmd_settings_json(app: &CliApp) -> Result<()> {
    let text = serde_json::to_string_pretty(app.timer().settings())
        .context("Failed to serialize settings")?;
    println!("{}", text);
    Ok(())
}

fn cmd_settings_set(app: &mut CliApp, args: &SettingsArgs) -> Result<()> {
    let raw = settings_patch(app.timer().settings(), args);
    app.on_settings_input(&raw);
    if !app.ui().settings_dirty {
        println!("{} Settings unchanged", color(CYAN, "[info]"));
        return Ok(());
    }
    app.save_settings(&raw);
    warn_if_volatile(app);
    cmd_settings_show(app)
}

fn cmd_settings_reset(app: &mut CliApp) -> Result<()> {
    app.restore_defaults();
    warn_if_volatile(app);
    Ok(())
}

fn cmd_theme(app: &mut CliApp, name: Option<String>) -> Result<()> {
    if let Some(name) = name {
        app.set_theme(&name);
        println!("{} Theme set to {}", color(GREEN, "[ok]"), app.theme().as_str());
        warn_if_volatile(app);
    } else {
        println!("{}", app.theme().as_str());
    }
    Ok(())
}

/// Current settings with the given overrides applied, as raw JSON
fn settings_patch(current: &Settings, args: &SettingsArgs) -> Value {
    let mut raw = match current.to_value() {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let ints = [
        ("prep", args.prep),
        ("focus", args.focus),
        ("recall", args.recall),
        ("short_break", args.short_break),
        ("long_break", args.long_break),
        ("blocks_per_ultradian", args.blocks),
    ];
    for (key, value) in ints {
        if let Some(value) = value {
            raw.insert(key.to_string(), Value::from(value));
        }
    }

    let flags = [
        ("prep_enabled", args.prep_enabled),
        ("auto_start", args.auto_start),
        ("sound_enabled", args.sound),
    ];
    for (key, value) in flags {
        if let Some(value) = value {
            raw.insert(key.to_string(), Value::Bool(value));
        }
    }

    Value::Object(raw)
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
