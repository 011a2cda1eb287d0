//! `slackbud check-config`

use std::path::Path;

use anyhow::Result;

use slackbud_config::{collect_referenced_vars, load_raw, redacted_snapshot, validate, SlackBudConfig};

pub async fn run(path: &Path, config: &SlackBudConfig) -> Result<()> {
    println!("\n🔍 Checking SlackBud config: {}\n", path.display());

    let raw = load_raw(path).await?;
    let vars = collect_referenced_vars(&raw);
    if !vars.is_empty() {
        println!("Environment variables referenced:");
        for var in &vars {
            println!("  🟢 {var}");
        }
        println!();
    }

    println!("Effective settings:");
    println!("{}\n", serde_json::to_string_pretty(&redacted_snapshot(config))?);

    let report = validate(config);
    for warning in &report.warnings {
        println!("  🟡 {}: {}", warning.path, warning.message);
    }
    for err in &report.errors {
        println!("  🔴 {}: {}", err.path, err.message);
    }

    println!();
    if report.is_valid() {
        println!("✅ Config is valid.");
        Ok(())
    } else {
        println!("❌ Config has {} error(s).", report.errors.len());
        anyhow::bail!("invalid config")
    }
}
