use crate::workspace::Workspace;
use anyhow::{anyhow, Result};
use colored::Colorize;
use lexshape_validate::ShaclEngine;

pub fn cmd_create(ws: &Workspace, name: &str, properties: Vec<(String, String)>) -> Result<()> {
    let instance = ws.instances.create_instance(name, properties)?;
    print!("{}", instance.to_turtle());
    eprintln!(
        "{} instance {} ({} properties)",
        "ok".green().bold(),
        instance.instance_id.bold(),
        instance.properties.len()
    );
    Ok(())
}

pub fn cmd_list(ws: &Workspace) -> Result<()> {
    let instances = ws.instances.list();
    if instances.is_empty() {
        eprintln!("{} no instances stored", "info:".yellow().bold());
        return Ok(());
    }
    for instance in &instances {
        println!(
            "{}  {} properties",
            instance.instance_id.bold(),
            instance.properties.len()
        );
    }
    Ok(())
}

pub fn cmd_show(ws: &Workspace, instance_id: &str) -> Result<()> {
    let instance = ws
        .instances
        .get(instance_id)
        .ok_or_else(|| anyhow!("Unknown instance: {instance_id}"))?;
    for (field, value) in &instance.properties {
        println!("# {field} = {value}");
    }
    print!("{}", instance.to_turtle());
    Ok(())
}

pub fn cmd_delete(ws: &Workspace, instance_id: &str) -> Result<()> {
    ws.instances.delete(instance_id)?;
    eprintln!("{} deleted {}", "ok".green().bold(), instance_id.bold());
    Ok(())
}

pub fn cmd_validate(ws: &Workspace, instance_id: &str, shape_id: &str) -> Result<()> {
    let shape = ws
        .shapes
        .get(shape_id)
        .ok_or_else(|| anyhow!("Shape not found: {shape_id}"))?;
    let (conforms, messages) =
        ws.instances
            .validate_instance(instance_id, &shape.graph, &ShaclEngine::new())?;

    if conforms {
        println!("{} {} conforms to {}", "✓".green().bold(), instance_id.bold(), shape_id);
    } else {
        println!(
            "{} {} does not conform to {}",
            "✗".red().bold(),
            instance_id.bold(),
            shape_id
        );
        for message in &messages {
            println!("  {} {}", "→".yellow(), message);
        }
    }
    Ok(())
}
