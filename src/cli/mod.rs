//! Command line front end.
//!
//! Stands in for the launcher window: `search` prints the ranked list,
//! `run` activates one entry, and `repl` reads one query per line the way
//! keystrokes arrive, printing fast results at once and full results when
//! they land.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::aggregator::{Aggregator, LatestResults};
use crate::config::Config;
use crate::core::Candidate;
use crate::executor::{Dispatcher, Modifier};
use crate::platform::{self, Platform};
use crate::services::{Services, UsageTracker};

/// How long exit waits for provider calls that outlived their timeout.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Clipboard sampling interval while the REPL is open.
const CLIPBOARD_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "orbit", version)]
#[command(about = "Federated search for a keyboard-driven launcher", long_about = None)]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the ranked results for a query
    Search {
        /// Query words; joined with spaces
        query: Vec<String>,

        /// Only ask the in-memory providers
        #[arg(long)]
        fast: bool,

        /// Show at most this many results
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Activate one result of a query
    Run {
        /// Query words; joined with spaces
        query: Vec<String>,

        /// Which result to activate, starting at 1
        #[arg(long, short, default_value_t = 1)]
        index: usize,

        /// Use the alternate action (reveal, copy...)
        #[arg(long)]
        alternate: bool,

        /// Only ask the in-memory providers
        #[arg(long)]
        fast: bool,
    },

    /// Read queries from stdin, one per line
    Repl,

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the config file location
    Path,
    /// Print the effective config
    Show,
    /// Write a config file with the defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Everything a command needs, built once per process.
struct Session {
    config: Config,
    platform: Arc<dyn Platform>,
    services: Services,
    aggregator: Aggregator,
    dispatcher: Dispatcher,
}

impl Session {
    fn open() -> Self {
        let config = Config::load();
        let platform = platform::current();
        let usage = Arc::new(UsageTracker::load_from_dir(&platform.data_dir()));

        let services = Services::new(&config, Arc::clone(&platform), Arc::clone(&usage));
        services.clipboard.poll(platform.as_ref());
        let aggregator = services.aggregator(&config);
        for (name, kind) in aggregator.providers() {
            debug!(provider = name, ?kind, "provider registered");
        }
        let dispatcher = Dispatcher::new(Arc::clone(&platform), usage);

        Self {
            config,
            platform,
            services,
            aggregator,
            dispatcher,
        }
    }

    fn query(&self, runtime: &Runtime, query: &str, fast: bool) -> Vec<Candidate> {
        if fast {
            self.aggregator.fast_query(query)
        } else {
            runtime.block_on(self.aggregator.full_query(query))
        }
    }

    /// Activate `candidate` and print the outcome.
    fn activate(&self, candidate: &Candidate, modifier: Modifier) -> anyhow::Result<()> {
        let outcome = self
            .dispatcher
            .activate(candidate, modifier)
            .with_context(|| format!("Could not run \"{}\"", candidate.title))?;

        self.services.activated(candidate);
        println!("{}", outcome.message());
        Ok(())
    }

    fn close(&self) {
        if let Err(e) = self.services.usage.flush() {
            tracing::warn!(error = %e, "failed to save usage data");
        }
    }
}

/// Parse arguments and run the chosen command.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Commands::Config { action } => run_config(action),
        command => {
            let runtime = build_runtime()?;
            let session = Session::open();
            info!(
                platform = session.platform.name(),
                fast_limit = session.config.search.fast_limit,
                max_results = session.config.search.max_results,
                "session ready"
            );

            let result = run_session(&session, &runtime, command);
            session.close();
            shutdown(runtime);
            result
        }
    }
}

fn build_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")
}

/// Stop the runtime without joining blocking provider calls that ignored
/// cancellation; they are abandoned after [`SHUTDOWN_GRACE`].
fn shutdown(runtime: Runtime) {
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

fn run_session(session: &Session, runtime: &Runtime, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Search {
            query,
            fast,
            limit,
            json,
        } => {
            let mut results = session.query(runtime, &join_query(&query), fast);
            if let Some(limit) = limit {
                results.truncate(limit);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print!("{}", render(&results));
            }
            Ok(())
        }
        Commands::Run {
            query,
            index,
            alternate,
            fast,
        } => {
            let query = join_query(&query);
            let results = session.query(runtime, &query, fast);
            let candidate = pick(&results, index, &query)?;
            session.activate(candidate, modifier(alternate))
        }
        Commands::Repl => repl(session, runtime),
        Commands::Config { action } => run_config(action),
    }
}

fn run_config(action: ConfigCommands) -> anyhow::Result<()> {
    let path = Config::config_path();
    match action {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Show => {
            let config = Config::load();
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Init { force } => init_config(&path, force)?,
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Config::default()
        .save_to(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// One query per line. `:open N` activates result N of the newest list,
/// `:alt N` its alternate action, `:quit` exits.
fn repl(session: &Session, runtime: &Runtime) -> anyhow::Result<()> {
    let _guard = runtime.enter();
    let latest = Arc::new(LatestResults::new());
    let poller = spawn_clipboard_poller(session);
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();

        match ReplCommand::parse(input) {
            ReplCommand::Quit => break,
            ReplCommand::Activate { index, modifier } => {
                let shown = latest.snapshot();
                match pick(&shown, index, input).and_then(|c| session.activate(c, modifier)) {
                    Ok(()) => {}
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
            ReplCommand::Query(query) => {
                let generation = session.aggregator.next_generation();
                let fast = session.aggregator.fast_query(query);
                if latest.apply(generation, fast) {
                    print!("{}", render(&latest.snapshot()));
                }

                let sink = Arc::clone(&latest);
                session
                    .aggregator
                    .spawn_full_query(query, generation, move |results| {
                        if sink.apply(generation, results) {
                            println!("-- updated --");
                            print!("{}", render(&sink.snapshot()));
                            let _ = io::stdout().flush();
                        }
                    });
            }
        }
        io::stdout().flush()?;
    }
    poller.abort();
    Ok(())
}

/// Sample the clipboard in the background so a slow clipboard helper
/// never delays a query line.
fn spawn_clipboard_poller(session: &Session) -> JoinHandle<()> {
    let clipboard = Arc::clone(&session.services.clipboard);
    let platform = Arc::clone(&session.platform);

    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(CLIPBOARD_POLL_INTERVAL);
        loop {
            ticks.tick().await;
            let clipboard = Arc::clone(&clipboard);
            let platform = Arc::clone(&platform);
            let polled = tokio::task::spawn_blocking(move || clipboard.poll(platform.as_ref())).await;
            if let Ok(true) = polled {
                debug!("clipboard entry recorded");
            }
        }
    })
}

#[derive(Debug, PartialEq)]
enum ReplCommand<'a> {
    Quit,
    Activate { index: usize, modifier: Modifier },
    Query(&'a str),
}

impl<'a> ReplCommand<'a> {
    fn parse(input: &'a str) -> Self {
        if matches!(input, ":q" | ":quit") {
            return ReplCommand::Quit;
        }

        let activation = [(":open", Modifier::Primary), (":alt", Modifier::Alternate)]
            .into_iter()
            .find_map(|(prefix, modifier)| {
                let index = input.strip_prefix(prefix)?.trim();
                let index = if index.is_empty() { Some(1) } else { index.parse().ok() };
                index.map(|index| ReplCommand::Activate { index, modifier })
            });

        activation.unwrap_or(ReplCommand::Query(input))
    }
}

fn join_query(words: &[String]) -> String {
    words.join(" ")
}

fn modifier(alternate: bool) -> Modifier {
    if alternate {
        Modifier::Alternate
    } else {
        Modifier::Primary
    }
}

/// The `index`th result, counting from 1.
fn pick<'a>(results: &'a [Candidate], index: usize, query: &str) -> anyhow::Result<&'a Candidate> {
    if results.is_empty() {
        bail!("No results for \"{query}\"");
    }
    index
        .checked_sub(1)
        .and_then(|i| results.get(i))
        .with_context(|| format!("No result #{index} (only {} shown)", results.len()))
}

/// Numbered, one entry per line with its subtitle underneath.
pub fn render(results: &[Candidate]) -> String {
    if results.is_empty() {
        return "No results\n".to_string();
    }

    let mut out = String::new();
    for (i, candidate) in results.iter().enumerate() {
        let marker = if candidate.is_active { " (on)" } else { "" };
        out.push_str(&format!(
            "{:>2}. {}{marker}  [{}]\n",
            i + 1,
            candidate.title,
            candidate.category
        ));
        if let Some(subtitle) = &candidate.subtitle {
            out.push_str(&format!("    {subtitle}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    use crate::aggregator::AggregatorOptions;
    use crate::core::{Action, Category};
    use crate::error::ProviderResult;
    use crate::search::{Provider, ProviderKind, SearchContext};

    fn candidate(title: &str) -> Candidate {
        Candidate::new(Category::Application, title, title, Action::NoOp)
    }

    /// Sleeps through cancellation, like a provider stuck in a system call.
    struct Stuck;

    impl Provider for Stuck {
        fn name(&self) -> &str {
            "stuck"
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Slow
        }

        fn search(&self, _ctx: &SearchContext) -> ProviderResult<Vec<Candidate>> {
            thread::sleep(Duration::from_secs(3));
            Ok(vec![candidate("late")])
        }
    }

    #[test]
    fn test_shutdown_does_not_wait_for_stuck_provider() {
        let runtime = build_runtime().unwrap();
        let options = AggregatorOptions {
            provider_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(Stuck)];
        let aggregator = Aggregator::new(providers, options);

        let results = runtime.block_on(aggregator.full_query("x"));
        assert!(results.is_empty());

        let started = Instant::now();
        shutdown(runtime);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from(["orbit", "-vv", "search", "google", "chrome", "--fast", "-n", "3"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Search {
                query,
                fast,
                limit,
                json,
            } => {
                assert_eq!(join_query(&query), "google chrome");
                assert!(fast);
                assert_eq!(limit, Some(3));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["orbit", "run", "firefox"]).unwrap();
        match cli.command {
            Commands::Run {
                index, alternate, ..
            } => {
                assert_eq!(index, 1);
                assert!(!alternate);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::try_parse_from(["orbit", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommands::Init { force: true }
            }
        ));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]), "No results\n");
    }

    #[test]
    fn test_render_lists() {
        let results = vec![
            candidate("Firefox").with_subtitle("Web Browser"),
            candidate("Terminal").with_active(true),
        ];
        assert_eq!(
            render(&results),
            " 1. Firefox  [Application]\n    Web Browser\n 2. Terminal (on)  [Application]\n"
        );
    }

    #[test]
    fn test_pick() {
        let results = vec![candidate("a"), candidate("b")];
        assert_eq!(pick(&results, 2, "q").unwrap().title, "b");
        assert!(pick(&results, 0, "q").is_err());
        assert!(pick(&results, 3, "q").is_err());

        let err = pick(&[], 1, "zzz").unwrap_err();
        assert_eq!(err.to_string(), "No results for \"zzz\"");
    }

    #[test]
    fn test_repl_commands() {
        assert_eq!(ReplCommand::parse(":q"), ReplCommand::Quit);
        assert_eq!(
            ReplCommand::parse(":open 3"),
            ReplCommand::Activate {
                index: 3,
                modifier: Modifier::Primary
            }
        );
        assert_eq!(
            ReplCommand::parse(":alt"),
            ReplCommand::Activate {
                index: 1,
                modifier: Modifier::Alternate
            }
        );
        assert_eq!(ReplCommand::parse("chr"), ReplCommand::Query("chr"));
        assert_eq!(ReplCommand::parse(":open x"), ReplCommand::Query(":open x"));
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        init_config(&path, false).unwrap();
        assert!(init_config(&path, false).is_err());
        init_config(&path, true).unwrap();
        assert!(Config::load_from(&path).is_ok());
    }
}
