//! Rewind CLI

use std::path::Path;
use std::process;

use anyhow::Context;
use rewind::config::{Config, VcrOptions};
use rewind::matcher::{group_sizes, KeyKind};
use rewind::store::{self, JsonCodec};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Rewind v{}", env!("CARGO_PKG_VERSION"));
        eprintln!();
        eprintln!("Usage: rewind <command> <path>");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  stats <cassette>      Show recorded interactions per match key");
        eprintln!("  check <config.toml>   Validate a configuration file");
        process::exit(1);
    }

    let command = &args[1];
    let path = Path::new(&args[2]);

    let result = match command.as_str() {
        "stats" => show_stats(path),
        "check" => check_config(path),
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'rewind' for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn show_stats(path: &Path) -> anyhow::Result<()> {
    if !path.is_file() {
        anyhow::bail!("cassette not found: {}", path.display());
    }

    let cassette = store::load(path, &JsonCodec)
        .with_context(|| format!("failed to load {}", path.display()))?;

    println!("Cassette: {}", path.display());
    println!("Interactions: {}", cassette.len());

    let groups = group_sizes(&KeyKind::MethodUri, &cassette);
    if !groups.is_empty() {
        println!();
        for (key, count) in groups {
            println!("{count:>6}  {key}");
        }
    }

    Ok(())
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = Config::from_file(path)
        .with_context(|| format!("invalid config {}", path.display()))?;
    let options = VcrOptions::from_config(&config);

    println!("Config OK: {}", path.display());
    println!("  recording_path: {}", options.recording_path().display());
    println!("  matcher: {:?}", config.matcher);
    println!("  not_recorded_throws_errors: {}", config.not_recorded_throws_errors);
    Ok(())
}
