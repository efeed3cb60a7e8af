//! fragconf
//!
//! Resolve, edit, merge, and watch per-service configuration fragments.

use anyhow::{Result, bail};
use clap::Parser;
use fragment_config::cli::get::GetArgs;
use fragment_config::cli::set::SetArgs;
use fragment_config::cli::{Cli, Command};
use fragment_config::config::ConfigManager;
use fragment_config::format::{format_merge_errors, format_section_reports, render_tree};
use fragment_config::settings::EngineSettings;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    // CLI flags override discovered settings
    let mut settings = EngineSettings::discover();
    if let Some(root) = cli.root {
        settings.root = root;
    }
    if let Some(catalog) = cli.catalog {
        settings.catalog_path = Some(catalog);
    }

    let manager = ConfigManager::from_settings(settings)?;

    match cli.command {
        Command::Get(args) => run_get(&manager, &args),
        Command::Set(args) => run_set(&manager, &args),
        Command::DeleteArg {
            service,
            section,
            key,
        } => {
            if !manager.delete_arg(&service, &section, &key)? {
                bail!("{service}.{section}.{key} does not exist");
            }
            Ok(())
        }
        Command::DeleteSection { service, section } => {
            if !manager.delete_section(&service, &section)? {
                bail!("section {service}.{section} does not exist");
            }
            Ok(())
        }
        Command::Refresh => run_refresh(&manager),
        Command::Validate { service } => run_validate(&manager, service),
        Command::Watch => run_watch(manager).await,
    }
}

/// Run the get command
fn run_get(manager: &ConfigManager, args: &GetArgs) -> Result<()> {
    let query = args.to_query()?;
    let tree = manager.get_config(&query)?;
    print!("{}", render_tree(&tree, args.format)?);
    Ok(())
}

/// Run the set command
fn run_set(manager: &ConfigManager, args: &SetArgs) -> Result<()> {
    let value = args.parsed_value()?;
    manager.set_arg(&args.service, &args.section, &args.key, value)?;
    Ok(())
}

/// Run the refresh command
fn run_refresh(manager: &ConfigManager) -> Result<()> {
    let report = manager.refresh()?;
    if !report.is_clean() {
        eprint!("{}", format_merge_errors(&report));
        bail!("{} fragment(s) could not be merged", report.errors.len());
    }
    Ok(())
}

/// Run the validate command
fn run_validate(manager: &ConfigManager, service: Option<String>) -> Result<()> {
    let services = match service {
        Some(service) => vec![service],
        None => manager.catalog().services(),
    };

    let mut reports = Vec::new();
    for service in &services {
        reports.extend(manager.validate_service(service)?);
    }

    if reports.is_empty() {
        println!("{} service(s) valid", services.len());
        return Ok(());
    }
    print!("{}", format_section_reports(&reports));
    bail!("validation failed")
}

/// Run the watch command: refresh on every change until interrupted.
async fn run_watch(manager: ConfigManager) -> Result<()> {
    let manager = Arc::new(manager);
    let report = manager.refresh()?;
    if !report.is_clean() {
        warn!("{} fragment(s) could not be merged", report.errors.len());
    }

    let refresher = Arc::clone(&manager);
    let mut handle = manager.watch(move || match refresher.refresh() {
        Ok(report) if !report.is_clean() => {
            warn!("{} fragment(s) could not be merged", report.errors.len());
        }
        Ok(_) => {}
        Err(e) => warn!("Snapshot refresh failed: {}", e),
    })?;

    info!(
        "Watching {} (Ctrl-C to stop)",
        manager.settings().root.display()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = handle.wait_for_change() => match event {
                Some(event) if !event.requires_reload() => {
                    warn!("Watcher reported: {:?}", event);
                }
                Some(_) => {}
                None => {
                    info!("Fragment watcher stopped");
                    break;
                }
            },
        }
    }

    Ok(())
}
