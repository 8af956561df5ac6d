use crate::workspace::Workspace;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use lexshape_llm::{truncate_legal_text, GeneratedShape};
use lexshape_store::text_id;
use std::path::Path;

fn read_legal_text(path: &Path, max_chars: usize) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(anyhow!("{} is empty", path.display()));
    }
    let text = truncate_legal_text(raw, max_chars);
    if raw.chars().count() > max_chars {
        eprintln!(
            "{} legal text truncated to {max_chars} characters",
            "info:".yellow().bold()
        );
    }
    Ok(text)
}

fn report_new_fields(ws: &Workspace, generated: &GeneratedShape) {
    for field in &generated.new_fields {
        eprintln!(
            "  {} new field {} ({}, {})",
            "→".yellow(),
            field.name.bold(),
            field.path,
            field.datatype
        );
    }
    if generated.repair_rounds > 0 {
        eprintln!(
            "  {} Turtle repaired in {} round(s)",
            "→".yellow(),
            generated.repair_rounds
        );
    }
    tracing::debug!(fields = ws.registry.len(), "registry size after generation");
}

pub fn cmd_generate(
    ws: &Workspace,
    text_file: &Path,
    description: Option<String>,
    max_chars: usize,
    prompt_only: bool,
) -> Result<()> {
    let legal_text = read_legal_text(text_file, max_chars)?;
    let id = text_id(&legal_text);
    let generator = ws.generator()?;

    if prompt_only {
        println!("{}", generator.generation_prompt(&legal_text, &id));
        return Ok(());
    }

    eprintln!("{} {}", "Generating".green().bold(), text_file.display());
    let generated = generator.generate_shape(&legal_text, &id)?;
    generator.register_fields(&generated.new_fields)?;
    ws.shapes
        .add(&id, &legal_text, generated.graph.clone(), description)?;

    println!("{}", generated.turtle);
    report_new_fields(ws, &generated);
    eprintln!(
        "  {} {}",
        "→".cyan(),
        ws.root.join("shapes").join(&id).display()
    );
    eprintln!("{} shape {}", "ok".green().bold(), id.bold());
    Ok(())
}

pub fn cmd_improve(ws: &Workspace, shape_id: &str, feedback: &str) -> Result<()> {
    let shape = ws
        .shapes
        .get(shape_id)
        .ok_or_else(|| anyhow!("Shape not found: {shape_id}"))?;
    let generator = ws.generator()?;

    eprintln!("{} {}", "Improving".green().bold(), shape_id);
    let improved = generator.improve_shape(&shape.graph, feedback, shape_id)?;
    generator.register_fields(&improved.new_fields)?;
    ws.shapes.update(shape_id, improved.graph.clone(), None)?;
    ws.context
        .add_feedback(shape_id, feedback, &improved.turtle)?;

    println!("{}", improved.turtle);
    report_new_fields(ws, &improved);
    eprintln!("{} shape {} updated", "ok".green().bold(), shape_id.bold());
    Ok(())
}

pub fn cmd_list(ws: &Workspace) -> Result<()> {
    let shapes = ws.shapes.list();
    if shapes.is_empty() {
        eprintln!("{} no shapes stored", "info:".yellow().bold());
        return Ok(());
    }
    for shape in &shapes {
        let headline: String = shape
            .legal_text
            .lines()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("")
            .chars()
            .take(60)
            .collect();
        println!(
            "{}  {}  {}  {}",
            shape.shape_id.bold(),
            shape.updated_at.format("%Y-%m-%d %H:%M"),
            shape.description.as_deref().unwrap_or("-").cyan(),
            headline
        );
    }
    Ok(())
}

pub fn cmd_show(ws: &Workspace, shape_id: &str) -> Result<()> {
    let shape = ws
        .shapes
        .get(shape_id)
        .ok_or_else(|| anyhow!("Shape not found: {shape_id}"))?;
    println!("{}", shape.to_turtle());
    Ok(())
}

pub fn cmd_describe(ws: &Workspace, shape_id: &str, description: &str) -> Result<()> {
    ws.shapes.set_description(shape_id, description)?;
    eprintln!("{} {}", "ok".green().bold(), shape_id.bold());
    Ok(())
}

pub fn cmd_delete(ws: &Workspace, shape_id: &str) -> Result<()> {
    ws.shapes.delete(shape_id)?;
    eprintln!("{} deleted {}", "ok".green().bold(), shape_id.bold());
    Ok(())
}

pub fn cmd_extract_rules(ws: &Workspace, text_file: &Path, max_chars: usize) -> Result<()> {
    let legal_text = read_legal_text(text_file, max_chars)?;
    let rules = ws.generator()?.extract_rules(&legal_text)?;
    println!("{rules}");
    Ok(())
}
