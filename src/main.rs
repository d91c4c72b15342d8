use clap::{Parser, ValueEnum};
use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use keydrill::{
    config::{ConfigStore, FileConfigStore},
    controller::{SessionConfig, SessionController, SessionOutcome},
    policy::TypingPolicy,
    runtime::{CrosstermEventSource, EngineEvent, FixedTicker, Runner},
    TICK_RATE_MS,
};
use std::{
    error::Error,
    fs, io,
    path::PathBuf,
    time::{Duration, Instant},
};

const DEFAULT_PROMPT: &str = "the quick brown fox jumps over the lazy dog";

/// typing-session trainer with live windowed wpm and weak-key analytics
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Runs a typing session in the terminal: live windowed wpm and accuracy while you type, and a final summary with a consistency figure and your weakest keys."
)]
struct Cli {
    /// custom prompt to type
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// read the prompt from a file
    #[clap(short = 'f', long, conflicts_with = "prompt")]
    file: Option<PathBuf>,

    /// number of seconds to run the session
    #[clap(short = 's', long)]
    seconds: Option<f64>,

    /// cursor-advance policy
    #[clap(long, value_enum)]
    policy: Option<PolicyArg>,

    /// trailing window width for the live wpm series, in seconds
    #[clap(long)]
    window: Option<f64>,

    /// disable exponential smoothing of the wpm series
    #[clap(long)]
    raw_series: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
enum PolicyArg {
    /// always advance; mistakes stay visible until backspaced
    Normal,
    /// advance only on a correct match
    Strict,
}

impl PolicyArg {
    fn as_policy(self) -> TypingPolicy {
        match self {
            PolicyArg::Normal => TypingPolicy::Normal,
            PolicyArg::Strict => TypingPolicy::Strict,
        }
    }
}

fn session_config(cli: &Cli) -> SessionConfig {
    let stored = FileConfigStore::new().load();
    let mut config = SessionConfig::from(&stored);
    if cli.seconds.is_some() {
        config.time_limit_secs = cli.seconds;
    }
    if let Some(policy) = cli.policy {
        config.policy = policy.as_policy();
    }
    if let Some(window) = cli.window {
        config.window_secs = window;
    }
    if cli.raw_series {
        config.smoothing_tau_secs = None;
    }
    config
}

fn resolve_prompt(cli: &Cli) -> io::Result<String> {
    if let Some(prompt) = &cli.prompt {
        return Ok(prompt.clone());
    }
    if let Some(path) = &cli.file {
        return Ok(fs::read_to_string(path)?.trim_end().to_string());
    }
    Ok(DEFAULT_PROMPT.to_string())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let text = resolve_prompt(&cli)?;
    let mut controller = SessionController::new();
    controller.configure(&text, session_config(&cli));

    println!("{text}");
    println!("start typing; esc to stop\n");

    enable_raw_mode()?;
    let result = run(&mut controller);
    disable_raw_mode()?;
    result?;

    println!();
    if let Some(outcome) = controller.outcome() {
        print_summary(outcome);
    }
    Ok(())
}

fn run(controller: &mut SessionController) -> Result<(), Box<dyn Error>> {
    let origin = Instant::now();
    let now = || origin.elapsed().as_secs_f64();

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    controller.start(now());
    while !controller.is_finished() {
        match runner.step() {
            EngineEvent::Key(key) => controller.on_keystroke(key, now()),
            EngineEvent::Tick => {
                controller.tick(now());
                draw_status(controller, now())?;
            }
            EngineEvent::Quit => controller.finish(now()),
        }
    }
    Ok(())
}

fn draw_status(controller: &SessionController, now: f64) -> Result<(), Box<dyn Error>> {
    let snap = controller.current_snapshot(now);
    let live_wpm = controller
        .latest_sample()
        .map(|s| s.wpm)
        .unwrap_or(snap.wpm);
    let session = controller.session();
    execute!(
        io::stdout(),
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(format!(
            "{:>6.1}s  {:>6.1} wpm  {:>5.1}% acc  {}/{}",
            snap.elapsed_seconds,
            live_wpm,
            snap.accuracy_percent,
            session.cursor,
            session.target.len(),
        )),
    )?;
    Ok(())
}

fn print_summary(outcome: &SessionOutcome) {
    println!("wpm          {:>6.1}", outcome.wpm);
    println!("accuracy     {:>6.1}%", outcome.accuracy_percent);
    println!("elapsed      {:>6.1}s", outcome.elapsed_seconds);
    println!("consistency  {:>6.1}", outcome.consistency);

    let worst: Vec<String> = outcome
        .weak_keys
        .iter()
        .filter(|k| k.misses > 0)
        .take(5)
        .map(|k| {
            format!(
                "{} {:.0}% ({}/{})",
                printable(k.character),
                k.miss_rate * 100.0,
                k.misses,
                k.attempts()
            )
        })
        .collect();
    if !worst.is_empty() {
        println!("weak keys    {}", worst.join("  "));
    }
}

fn printable(c: char) -> String {
    match c {
        ' ' => "space".to_string(),
        '\n' => "enter".to_string(),
        '\t' => "tab".to_string(),
        _ => c.to_string(),
    }
}
