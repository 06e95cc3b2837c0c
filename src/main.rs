//! seedcheck - seeded-fixture verification run
//!
//! ```text
//! ┌───────────┐    ┌───────────┐    ┌──────────┐    ┌──────────┐
//! │ Generate  │───▶│ Provision │───▶│   Load   │───▶│  Verify  │
//! │  (faker)  │    │(container)│    │ (tx/bulk)│    │ (checks) │
//! └───────────┘    └───────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Exit code 0 when every check passes, 1 when a check fails, 2 when the
//! fixture could not be set up.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use seedcheck::config::HarnessConfig;
use seedcheck::session::run_session;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn get_arg(name: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == name && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn load_config() -> anyhow::Result<HarnessConfig> {
    let mut config = if let Some(path) = get_arg("--config") {
        HarnessConfig::from_file(&path).with_context(|| format!("loading {}", path))?
    } else {
        let env = get_env();
        let default_path = format!("config/{}.yaml", env);
        if Path::new(&default_path).exists() {
            HarnessConfig::load(&env).with_context(|| format!("loading {}", default_path))?
        } else {
            HarnessConfig::default()
        }
    };

    if let Some(count) = get_arg("--count") {
        config.record_count = count
            .parse()
            .with_context(|| format!("--count expects a positive integer, got '{}'", count))?;
    }
    if let Some(seed) = get_arg("--seed") {
        config.seed = Some(
            seed.parse()
                .with_context(|| format!("--seed expects an integer, got '{}'", seed))?,
        );
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {:#}", e);
            return ExitCode::from(2);
        }
    };
    let _log_guard = seedcheck::logging::init_logging(&config.log);

    tracing::info!(
        "Starting seedcheck: {} records into {} on {} (tie-break {})",
        config.record_count,
        config.table_name,
        config.image,
        config.tie_break
    );

    let report = match run_session(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Fixture setup failed: {}", e);
            eprintln!("❌ Fixture setup failed: {}", e);
            return ExitCode::from(2);
        }
    };

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(r) => println!("✅ {}: {} == {}", outcome.check, r.expected, r.actual),
            Err(e) => println!("❌ {}: {}", outcome.check, e),
        }
    }

    if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
