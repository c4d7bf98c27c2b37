//! Check command implementation.

use crate::schema::SchemaFile;
use recordfs_core::{Config, EntityKind, Registry};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// What the schema declares for one kind.
#[derive(Debug, Serialize)]
pub struct KindReport {
    /// Kind name.
    pub name: String,
    /// Address template.
    pub template: String,
    /// Template of the parent directory.
    pub listing_template: String,
    /// Directory a full listing starts from.
    pub static_prefix: String,
    /// Walk depth needed to reach the record files.
    pub record_depth: usize,
    /// Storage layout.
    pub layout: &'static str,
    /// Record format.
    pub format: &'static str,
    /// Compiled record pattern.
    pub pattern: String,
}

impl KindReport {
    fn of(kind: &EntityKind<Value>) -> Self {
        let descriptor = kind.descriptor();
        Self {
            name: descriptor.name().to_string(),
            template: descriptor.template().to_string(),
            listing_template: descriptor.listing_template().to_string(),
            static_prefix: descriptor.plan().static_prefix().to_string(),
            record_depth: descriptor.plan().record_depth(descriptor.layout()),
            layout: descriptor.layout().name(),
            format: descriptor.format().name(),
            pattern: descriptor.matcher().as_str().to_string(),
        }
    }
}

/// Runs the check command.
///
/// Validates every kind of the schema and that no two kinds share a name.
pub fn run(schema: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let kinds = SchemaFile::load(schema)?.build(&Config::default())?;

    let mut registry = Registry::new();
    for kind in &kinds {
        registry.register(std::sync::Arc::clone(kind.descriptor()))?;
    }

    let reports: Vec<KindReport> = kinds.iter().map(KindReport::of).collect();
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&reports)?),
        _ => print_text_output(schema, &reports),
    }
    Ok(())
}

fn print_text_output(schema: &Path, reports: &[KindReport]) {
    println!("Schema: {}", schema.display());
    println!("{} kind(s)", reports.len());
    for report in reports {
        println!();
        println!("{}", report.name);
        println!("  Template:      {}", report.template);
        println!("  Listing:       {}", report.listing_template);
        println!("  Static prefix: {}", report.static_prefix);
        println!("  Record depth:  {}", report.record_depth);
        println!("  Layout:        {}", report.layout);
        println!("  Format:        {}", report.format);
        println!("  Pattern:       {}", report.pattern);
    }
    println!();
    println!("✓ Schema is valid");
}
