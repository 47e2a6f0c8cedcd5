//! `panos-acc kinds`

use anyhow::Result;
use colored::Colorize;
use objects::kinds;

use crate::ui;

pub fn run(kind: Option<&str>) -> Result<()> {
    match kind {
        Some(kind) => describe(kind),
        None => {
            list();
            Ok(())
        }
    }
}

fn list() {
    ui::header("Object Kinds");
    let width = kinds::all().iter().map(|s| s.kind.len()).max().unwrap_or(0);
    for schema in kinds::all() {
        println!("  {:<width$}  {}", schema.kind.bold(), schema.description);
    }
}

fn describe(kind: &str) -> Result<()> {
    let schema = kinds::require(kind)?;
    ui::header(schema.kind);
    if !schema.description.is_empty() {
        ui::kv("description", schema.description);
    }
    ui::kv("endpoint", schema.endpoint);
    let scopes: Vec<String> = schema.scopes.iter().map(ToString::to_string).collect();
    ui::kv("locations", &scopes.join(", "));

    ui::section("Attributes");
    for line in schema.describe().lines() {
        println!("  {line}");
    }
    Ok(())
}
