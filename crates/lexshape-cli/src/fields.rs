use crate::workspace::Workspace;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use lexshape_fields::DataField;
use std::path::Path;

fn print_summary(field: &DataField) {
    println!(
        "{}  {}  {}  {}",
        field.name.bold(),
        field.path.cyan(),
        field.datatype,
        field.description
    );
}

pub fn cmd_list(ws: &Workspace) -> Result<()> {
    let fields = ws.registry.fields();
    if fields.is_empty() {
        eprintln!("{} no data fields registered", "info:".yellow().bold());
        return Ok(());
    }
    for field in &fields {
        print_summary(field);
    }
    eprintln!("{} field(s)", fields.len());
    Ok(())
}

pub fn cmd_show(ws: &Workspace, name: &str) -> Result<()> {
    let field = ws
        .registry
        .get_field(name)
        .ok_or_else(|| anyhow!("Unknown field: {name}"))?;
    print!("{}", serde_yaml::to_string(&field)?);
    Ok(())
}

pub fn cmd_import(ws: &Workspace, file: &Path) -> Result<()> {
    let document = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let summary = ws
        .registry
        .import_from_shacl(&document)
        .with_context(|| format!("failed to import {}", file.display()))?;

    for failure in &summary.failures {
        eprintln!(
            "{} skipped {}: {}",
            "warn:".yellow().bold(),
            failure.subject,
            failure.reason
        );
    }
    if summary.is_noop() {
        eprintln!("{} no data fields found in {}", "info:".yellow().bold(), file.display());
        return Ok(());
    }
    for name in &summary.imported {
        println!("{}", name);
    }
    eprintln!(
        "{} imported {} field(s)",
        "ok".green().bold(),
        summary.imported.len()
    );
    Ok(())
}

pub fn cmd_set_datatype(ws: &Workspace, name: &str, datatype: &str) -> Result<()> {
    ws.registry.update_field_datatype(name, datatype)?;
    ws.registry.save()?;
    eprintln!("{} {} is now {}", "ok".green().bold(), name.bold(), datatype);
    Ok(())
}

pub fn cmd_match(ws: &Workspace, term: &str, context: &str) -> Result<()> {
    match ws.registry.find_matching_field(term, context) {
        Some(field) => print_summary(&field),
        None => eprintln!("{} no field matches {term:?}", "info:".yellow().bold()),
    }
    Ok(())
}

pub fn cmd_suggest(ws: &Workspace, term: &str, register: bool) -> Result<()> {
    let field = ws.registry.suggest_new_field(term);
    print!("{}", serde_yaml::to_string(&field)?);
    if register {
        ws.registry.add_field(field.clone())?;
        eprintln!("{} registered {}", "ok".green().bold(), field.name.bold());
    }
    Ok(())
}
