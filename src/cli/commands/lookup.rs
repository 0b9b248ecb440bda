//! Lookup command - show the cache entry a URL maps to

use crate::cache::{format_bytes, CacheStore, EntryInfo};
use crate::cli::args::{LookupArgs, OutputFormat};
use crate::config::Config;
use crate::error::CacheResult;
use crate::url_norm::normalize;
use console::style;

/// Execute the lookup command
pub async fn execute(args: LookupArgs, config: &Config) -> CacheResult<()> {
    let url = normalize(&args.url)?;
    let store = CacheStore::from_config(&config.cache);
    let info = store.lookup(&url);

    match args.format {
        OutputFormat::Table => print_table(url.as_str(), &info),
        OutputFormat::Json => print_json(url.as_str(), &info)?,
        OutputFormat::Plain => println!("{}", status_label(&info)),
    }

    Ok(())
}

fn status_label(info: &EntryInfo) -> &'static str {
    match (info.body_len.is_some(), info.headers.is_some()) {
        (true, true) => "cached",
        (false, false) => "absent",
        _ => "incomplete",
    }
}

fn print_table(url: &str, info: &EntryInfo) {
    let status = match status_label(info) {
        "cached" => style("cached").green(),
        "incomplete" => style("incomplete (served as miss)").yellow(),
        other => style(other).dim(),
    };

    println!("{:<10} {}", style("URL").bold(), url);
    println!("{:<10} {}", style("Rule").bold(), info.class);
    println!("{:<10} {}", style("Key").bold(), info.key);
    println!("{:<10} {}", style("Status").bold(), status);
    println!("{:<10} {}", style("Body").bold(), info.body_path.display());
    println!("{:<10} {}", style("Headers").bold(), info.headers_path.display());

    if let Some(len) = info.body_len {
        println!("{:<10} {}", style("Size").bold(), format_bytes(len));
    }

    if let Some(headers) = &info.headers {
        println!();
        println!("{}", style("Stored headers:").bold());
        for (name, value) in headers.iter() {
            println!("  {}: {}", name, value);
        }
    }
}

fn print_json(url: &str, info: &EntryInfo) -> CacheResult<()> {
    let json = serde_json::json!({
        "url": url,
        "class": info.class.to_string(),
        "key": info.key.to_string(),
        "status": status_label(info),
        "body_path": info.body_path.display().to_string(),
        "headers_path": info.headers_path.display().to_string(),
        "size_bytes": info.body_len,
        "headers": info.headers,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
