//! Key command - compute the cache key for request URLs

use crate::cache::{ArtifactClass, CacheKey, KeyStrategy};
use crate::cli::args::{KeyArgs, OutputFormat};
use crate::config::Config;
use crate::error::CacheResult;
use crate::url_norm::{normalize, NormalizedUrl};
use console::style;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct KeyReport {
    url: String,
    normalized: String,
    class: String,
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    body_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers_path: Option<String>,
}

impl KeyReport {
    fn new(
        raw: &str,
        url: &NormalizedUrl,
        class: ArtifactClass,
        key: &CacheKey,
        root: Option<&Path>,
    ) -> Self {
        Self {
            url: raw.to_string(),
            normalized: url.to_string(),
            class: class.to_string(),
            key: key.to_string(),
            body_path: root.map(|r| key.body_path(r).display().to_string()),
            headers_path: root.map(|r| key.headers_path(r).display().to_string()),
        }
    }
}

/// Execute the key command
pub async fn execute(args: KeyArgs, config: &Config) -> CacheResult<()> {
    let strategy = KeyStrategy::from_config(&config.cache);
    let root = args.paths.then_some(config.cache.root.as_path());

    let reports = args
        .urls
        .iter()
        .map(|raw| -> CacheResult<KeyReport> {
            let url = normalize(raw)?;
            let (class, key) = strategy.classify(&url);
            Ok(KeyReport::new(raw, &url, class, &key, root))
        })
        .collect::<CacheResult<Vec<_>>>()?;

    match args.format {
        OutputFormat::Plain => print_plain(&reports),
        OutputFormat::Table => print_table(&reports),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    Ok(())
}

fn print_plain(reports: &[KeyReport]) {
    for report in reports {
        println!("{}", report.key);
        if let (Some(body), Some(headers)) = (&report.body_path, &report.headers_path) {
            println!("{}", body);
            println!("{}", headers);
        }
    }
}

fn print_table(reports: &[KeyReport]) {
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{:<12} {}", style("URL").bold(), report.normalized);
        println!("{:<12} {}", style("Rule").bold(), report.class);
        println!("{:<12} {}", style("Key").bold(), style(&report.key).cyan());
        if let Some(body) = &report.body_path {
            println!("{:<12} {}", style("Body").bold(), body);
        }
        if let Some(headers) = &report.headers_path {
            println!("{:<12} {}", style("Headers").bold(), headers);
        }
    }
}
