//! Overnight CLI: pre-market scenario classification and inversion tripwires.
//!
//! Commands:
//! - `classify`: fetch one snapshot and print the scenario
//! - `watch`: run the refresh loop; operator commands are read from stdin
//! - `replay`: re-derive a session offline from a CSV tape
//! - `scenarios`: list every scenario with its policy text
//! - `config init`: print the default configuration

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use overnight_core::classifier::{Scenario, ScenarioClassifier, ScenarioResult};
use overnight_core::data::{CircuitBreaker, QuoteProvider, ReplayTape, YahooProvider};
use overnight_core::tripwire::Thesis;
use overnight_runner::{
    init_logging, replay_tape, AppConfig, Dashboard, LoopHandle, OperatorCommand, ProviderKind,
    RefreshLoop, SessionOptions, StdoutSink,
};

#[derive(Parser)]
#[command(
    name = "overnight",
    about = "Overnight flow matrix: pre-market scenario classifier and inversion tripwires"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThesisArg {
    Long,
    Short,
}

impl From<ThesisArg> for Thesis {
    fn from(arg: ThesisArg) -> Self {
        match arg {
            ThesisArg::Long => Thesis::Long,
            ThesisArg::Short => Thesis::Short,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one snapshot and print the scenario.
    Classify {
        /// Print the result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the refresh loop. Type lock, long, short, reset or quit on stdin.
    Watch {
        /// Lock on the first complete snapshot.
        #[arg(long, default_value_t = false)]
        auto_lock: bool,

        /// Thesis to arm right after the automatic lock.
        #[arg(long, value_enum, requires = "auto_lock")]
        thesis: Option<ThesisArg>,

        /// Serve snapshots from a CSV tape instead of the network.
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Print one JSON view per line instead of text blocks.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Re-derive a session from a CSV tape: lock on the first tick, then refresh.
    Replay {
        /// CSV with columns tick,symbol,price,change,change_percent[,observed_at].
        tape: PathBuf,

        #[arg(long, value_enum)]
        thesis: ThesisArg,

        /// Print one JSON view per line instead of text blocks.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List every scenario in priority order with its policy text.
    Scenarios,
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the default configuration as TOML.
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())
        .with_context(|| format!("loading config {}", display_path(cli.config.as_deref())))?;
    init_logging(&config.log_level);

    match cli.command {
        Commands::Classify { json } => run_classify(&config, json),
        Commands::Watch {
            auto_lock,
            thesis,
            replay,
            json,
        } => run_watch(&config, auto_lock, thesis.map(Thesis::from), replay, json),
        Commands::Replay { tape, thesis, json } => run_replay(&config, &tape, thesis.into(), json),
        Commands::Scenarios => {
            run_scenarios();
            Ok(())
        }
        Commands::Config {
            action: ConfigAction::Init,
        } => {
            print!("{}", config_template()?);
            Ok(())
        }
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string())
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn QuoteProvider>> {
    match config.provider.kind {
        ProviderKind::Yahoo => {
            let breaker = Arc::new(CircuitBreaker::new(
                config.provider.circuit_cooldown(),
                config.provider.failure_threshold,
            ));
            let provider = YahooProvider::new(breaker, config.yahoo_options())?;
            Ok(Arc::new(provider))
        }
    }
}

fn run_classify(config: &AppConfig, json: bool) -> Result<()> {
    let classifier = ScenarioClassifier::new(&config.universe)?;
    let provider = build_provider(config)?;
    let symbols: Vec<String> = classifier
        .required_symbols()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let fetch = match provider.fetch(&symbols) {
        Ok(f) => f,
        Err(e) => bail!("fetch from {} failed: {e}", provider.name()),
    };
    let result = classifier.classify(&fetch.snapshot);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &ScenarioResult) {
    println!("{} ({})", result.name, result.confidence);
    println!("  {}", result.policy_text);
    if !result.matched_signals.is_empty() {
        println!("  signals: {}", result.matched_signals.join(", "));
    }
    if !result.missing_symbols.is_empty() {
        println!("  missing: {}", result.missing_symbols.join(", "));
    }
}

fn run_watch(
    config: &AppConfig,
    auto_lock: bool,
    thesis: Option<Thesis>,
    replay: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let provider: Arc<dyn QuoteProvider> = match replay {
        Some(path) => {
            let tape = ReplayTape::from_path(&path)
                .with_context(|| format!("reading replay tape {}", path.display()))?;
            Arc::new(tape.into_provider())
        }
        None => build_provider(config)?,
    };

    let dashboard = Dashboard::new(&config.universe, SessionOptions { auto_lock, thesis })?;
    let mut refresh = RefreshLoop::spawn(
        dashboard,
        provider,
        config.universe.all_symbols(),
        config.refresh.interval(),
    )
    .context("starting fetch worker")?;

    spawn_stdin_reader(refresh.handle())?;
    tracing::info!(
        interval_secs = config.refresh.interval_secs,
        "watching; commands: lock, long, short, reset, quit"
    );

    let mut sink = StdoutSink { json };
    refresh.run(&mut sink);
    Ok(())
}

/// Forward operator lines from stdin to the loop until `quit` or EOF.
fn spawn_stdin_reader(handle: LoopHandle) -> Result<()> {
    std::thread::Builder::new()
        .name("overnight-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if matches!(line, "quit" | "exit" | "q") {
                    handle.shutdown();
                    break;
                }
                match line.parse::<OperatorCommand>() {
                    Ok(command) => {
                        if !handle.send(command) {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
        })
        .context("starting stdin reader")?;
    Ok(())
}

fn run_replay(config: &AppConfig, tape_path: &Path, thesis: Thesis, json: bool) -> Result<()> {
    let tape = ReplayTape::from_path(tape_path)
        .with_context(|| format!("reading replay tape {}", tape_path.display()))?;
    let views = replay_tape(&config.universe, &tape, thesis)?;

    for (tick, view) in views.iter().enumerate() {
        if json {
            println!("{}", view.to_json()?);
        } else {
            println!("── tick {tick} ──");
            println!("{view}\n");
        }
    }
    Ok(())
}

fn run_scenarios() {
    for scenario in Scenario::all() {
        let tag = if scenario.is_no_trade() { "no trade" } else { "trade" };
        println!("{} [{}] ({tag})", scenario.name(), scenario.id());
        println!("  {}", scenario.policy_text());
    }
}

fn config_template() -> Result<String> {
    Ok(AppConfig::default().to_toml()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn thesis_requires_auto_lock() {
        assert!(Cli::try_parse_from(["overnight", "watch", "--thesis", "long"]).is_err());
        assert!(
            Cli::try_parse_from(["overnight", "watch", "--auto-lock", "--thesis", "long"]).is_ok()
        );
    }

    #[test]
    fn replay_requires_thesis() {
        assert!(Cli::try_parse_from(["overnight", "replay", "tape.csv"]).is_err());
        assert!(
            Cli::try_parse_from(["overnight", "replay", "tape.csv", "--thesis", "short"]).is_ok()
        );
    }

    #[test]
    fn config_template_parses_back() {
        let text = config_template().unwrap();
        assert_eq!(AppConfig::from_toml(&text).unwrap(), AppConfig::default());
    }
}
