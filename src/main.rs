use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use multireplace::cli::CliArgs;
use multireplace::columns::{ColumnScope, DelimiterScanner};
use multireplace::engine::ReplaceEngine;
use multireplace::host::RopeBuffer;
use multireplace::rules::Rule;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(true)
        .init();

    let args = CliArgs::parse();

    let rules_json = fs::read_to_string(&args.rules)
        .with_context(|| format!("reading rules file {}", args.rules.display()))?;
    let mut rules: Vec<Rule> = serde_json::from_str(&rules_json)
        .with_context(|| format!("parsing rules file {}", args.rules.display()))?;

    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let mut buf = RopeBuffer::new(&content);

    let scope = match args.column_scope() {
        Some(config) => ColumnScope::try_from_config(&config)?,
        None => ColumnScope::empty(),
    };
    let mut scanner = DelimiterScanner::new(scope);

    let mut engine = ReplaceEngine::new();
    let options = args.pass_options();
    let result = engine.replace_list(&mut buf, &mut scanner, &mut rules, &options);

    for (rule, outcome) in rules.iter().zip(&result.outcomes) {
        let status = match &outcome.error {
            Some(error) => format!("error: {error}"),
            None if !rule.enabled => "disabled".to_string(),
            None => format!("{} found, {} replaced", outcome.found, outcome.replaced),
        };
        println!("{:40} {}", rule.find, status);
    }
    println!(
        "total: {} found, {} replaced{}",
        result.total_found(),
        result.total_replaced(),
        if result.cancelled { " (cancelled)" } else { "" }
    );

    if !args.dry_run && result.total_replaced() > 0 {
        fs::write(&args.file, buf.to_string())
            .with_context(|| format!("writing {}", args.file.display()))?;
    }

    Ok(())
}
