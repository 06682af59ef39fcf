//! voxdesk — service entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build provider services
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run channels (HTTP, and the console with `-i`) until shutdown

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use voxdesk::assistant::Assistant;
use voxdesk::config;
use voxdesk::console::ConsoleChannel;
use voxdesk::error::AppError;
use voxdesk::logger;
use voxdesk::runtime::{self, Component};
use voxdesk::server::HttpChannel;
use voxdesk::services::Services;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let mut config = config::load(args.config_path.as_deref())?;

    // Without -i the console stays off (daemon-safe default).
    if !args.interactive {
        config.comms.console.enabled = false;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();

    logger::init(effective_log_level, force_cli_level)?;

    info!(
        name = %config.name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        interactive = %args.interactive,
        "config loaded"
    );

    let services = Services::build(&config)?;

    // Shared shutdown token — Ctrl-C cancels it, all channels watch it.
    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let mut components: Vec<Box<dyn Component>> = Vec::new();

    if config.comms.http.enabled {
        components.push(Box::new(HttpChannel::new(
            "http0",
            config.name.clone(),
            config.comms.http.bind.clone(),
            services.clone(),
        )));
    }

    if config.comms.console.enabled {
        let assistant = Assistant::new(
            services.briefings.clone(),
            services.social.clone(),
            services.images.clone(),
            services.max_post_chars,
        );
        components.push(Box::new(ConsoleChannel::new("console0", assistant)));
    }

    if components.is_empty() {
        warn!("no channels enabled — nothing to do");
        return Ok(());
    }

    print_startup_summary(&config, &services, args.interactive);

    runtime::spawn_components(components, shutdown.clone()).join().await?;

    // If the console exited on EOF (not Ctrl-C), still signal everything to stop.
    shutdown.cancel();

    if args.interactive {
        use std::io::Write as _;
        println!("\nBye :) ...");
        let _ = std::io::stdout().flush();
    }

    Ok(())
}

fn print_startup_summary(config: &config::Config, services: &Services, interactive: bool) {
    let status = services.status();
    let flag = |on: bool| if on { "configured" } else { "missing credentials" };

    let http = if config.comms.http.enabled {
        config.comms.http.bind.clone()
    } else {
        "disabled".to_string()
    };
    let console = if config.comms.console.enabled { "enabled" } else { "disabled" };
    let tiers = config
        .llm
        .tiers
        .iter()
        .map(|t| t.model.as_str())
        .collect::<Vec<_>>()
        .join(" → ");

    println!("┌─ {} ({}) ", config.name, if interactive { "interactive" } else { "daemon" });
    println!("│ 🌐 http:       {http}");
    println!("│ ⌨️  console:    {console}");
    println!("│ 🔎 search:     {}", flag(status.search));
    println!("│ 🧠 generation: {} [{tiers}]", flag(status.generation));
    println!("│ 🖼️  image:      {}", flag(status.image));
    println!("│ 📣 social:     {}", flag(status.social));
    println!("└─ pid {}", std::process::id());
}

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    log_level: Option<&'static str>,
    interactive: bool,
    config_path: Option<String>,
}

#[derive(Debug, PartialEq)]
enum Cli {
    Run(CliArgs),
    Help,
}

const USAGE: &str = "\
Usage: voxdesk [OPTIONS]

Options:
  -h, --help                 Print help
  -i, --interactive          Read transcripts from stdin (console channel)
  -f, --config <PATH>        Path to configuration file (default: config/default.toml)
  -v, -vv, -vvv, -vvvv       Increase logging verbosity";

fn parse_cli_args() -> CliArgs {
    match parse_args(std::env::args().skip(1)) {
        Ok(Cli::Run(args)) => args,
        Ok(Cli::Help) => {
            println!("{USAGE}");
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn parse_args(argv: impl IntoIterator<Item = String>) -> Result<Cli, String> {
    let mut args = CliArgs::default();
    let mut verbosity = 0usize;

    let mut argv = argv.into_iter();
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--" => break,
            "-h" | "--help" => return Ok(Cli::Help),
            "-i" | "--interactive" => args.interactive = true,
            "-f" | "--config" => {
                let path = argv.next().ok_or("-f/--config requires a path argument")?;
                args.config_path = Some(path);
            }
            "--verbose" => verbosity += 1,
            flag if is_verbosity_flag(flag) => verbosity += flag.len() - 1,
            _ => {}
        }
    }

    args.log_level = verbosity_level(verbosity);
    Ok(Cli::Run(args))
}

fn is_verbosity_flag(flag: &str) -> bool {
    flag.len() > 1 && flag.strip_prefix('-').is_some_and(|rest| rest.bytes().all(|b| b == b'v'))
}

/// Each `-v` raises the floor: warn, info, debug, then trace.
fn verbosity_level(count: usize) -> Option<&'static str> {
    match count {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    }
}
