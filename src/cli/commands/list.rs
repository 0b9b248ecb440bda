//! List command - show cached entries

use crate::cache::{format_bytes, CacheStore, EntrySummary};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use console::style;
use tracing::debug;

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> CacheResult<()> {
    let store = CacheStore::from_config(&config.cache);
    debug!("Listing entries under {}", store.root().display());

    let entries = tokio::task::spawn_blocking(move || store.entries())
        .await
        .map_err(|e| CacheError::Internal(format!("cache walk panicked: {}", e)))??;

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => println!("No cache entries found."),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[EntrySummary]) {
    println!(
        "{:<60} {:<13} {:>10} {:<16}",
        style("KEY").bold(),
        style("CLASS").bold(),
        style("SIZE").bold(),
        style("MODIFIED").bold()
    );
    println!("{}", "-".repeat(102));

    for entry in entries {
        let class = match entry.class.as_str() {
            "package" => style(entry.class.as_str()).green(),
            "arch-db" | "apt-metadata" => style(entry.class.as_str()).cyan(),
            _ => style(entry.class.as_str()).dim(),
        };
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<60} {:<13} {:>10} {:<16}",
            entry.key,
            class,
            format_bytes(entry.size_bytes),
            modified
        );
    }

    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    println!();
    let noun = if entries.len() == 1 { "entry" } else { "entries" };
    println!("{} {}, {}", entries.len(), noun, format_bytes(total));
}

fn print_json(entries: &[EntrySummary]) -> CacheResult<()> {
    let json = serde_json::to_string_pretty(entries)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(entries: &[EntrySummary]) {
    for entry in entries {
        println!("{}", entry.key);
    }
}
