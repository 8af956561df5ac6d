//! Example mappings, guidelines and feedback history.

use crate::workspace::Workspace;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

fn first_line(text: &str, max: usize) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .chars()
        .take(max)
        .collect()
}

pub fn cmd_example_add(
    ws: &Workspace,
    name: &str,
    text_file: &Path,
    shape_file: &Path,
    annotations: Option<&Path>,
) -> Result<()> {
    let example = ws
        .examples
        .add_from_files(name, text_file, shape_file, annotations)
        .with_context(|| format!("failed to add example {name}"))?;
    eprintln!(
        "{} example {} ({} triples)",
        "ok".green().bold(),
        example.name.bold(),
        example.shape.len()
    );
    Ok(())
}

pub fn cmd_example_list(ws: &Workspace) -> Result<()> {
    let examples = ws.examples.list();
    if examples.is_empty() {
        eprintln!("{} no examples stored", "info:".yellow().bold());
        return Ok(());
    }
    for (index, example) in examples.iter().enumerate() {
        let notes = example.annotations.as_ref().map_or(0, |a| a.len());
        println!(
            "{:>3}  {}  {}  {} note(s)",
            index,
            example.name.bold(),
            first_line(&example.legal_text, 60),
            notes
        );
    }
    Ok(())
}

pub fn cmd_example_delete(ws: &Workspace, index: usize) -> Result<()> {
    let removed = ws.examples.delete(index)?;
    eprintln!("{} deleted example {}", "ok".green().bold(), removed.name.bold());
    Ok(())
}

pub fn cmd_guideline_add(ws: &Workspace, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("guideline text is empty");
    }
    ws.context.add_guideline(text)?;
    eprintln!(
        "{} guideline {} added",
        "ok".green().bold(),
        ws.context.guidelines().len() - 1
    );
    Ok(())
}

pub fn cmd_guideline_list(ws: &Workspace) -> Result<()> {
    let guidelines = ws.context.guidelines();
    if guidelines.is_empty() {
        eprintln!("{} no guidelines", "info:".yellow().bold());
    }
    for (index, guideline) in guidelines.iter().enumerate() {
        println!("{index:>3}  {guideline}");
    }
    Ok(())
}

pub fn cmd_guideline_remove(ws: &Workspace, index: usize) -> Result<()> {
    let removed = ws.context.remove_guideline(index)?;
    eprintln!("{} removed {:?}", "ok".green().bold(), removed);
    Ok(())
}

pub fn cmd_feedback_list(ws: &Workspace) -> Result<()> {
    let history = ws.context.feedback_history();
    if history.is_empty() {
        eprintln!("{} no feedback recorded", "info:".yellow().bold());
    }
    for (index, entry) in history.iter().enumerate() {
        println!(
            "{:>3}  {}  {}",
            index,
            entry.text_id.cyan(),
            first_line(&entry.feedback, 80)
        );
    }
    Ok(())
}

pub fn cmd_feedback_remove(ws: &Workspace, index: usize) -> Result<()> {
    let removed = ws.context.remove_feedback(index)?;
    eprintln!(
        "{} removed feedback for {}",
        "ok".green().bold(),
        removed.text_id.bold()
    );
    Ok(())
}
