//! lexshape CLI
//!
//! Command-line front end over the lexshape services:
//! - Field registry maintenance and SHACL field import
//! - Shape generation and feedback-driven improvement through an LLM
//! - Example corpus, guidelines and feedback history
//! - Synthetic citizen instances and their validation against stored shapes

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod corpus;
mod fields;
mod instances;
mod shapes;
mod workspace;

use workspace::Workspace;

#[derive(Parser)]
#[command(name = "lexshape")]
#[command(author, version, about = "lexshape: legal text to SHACL eligibility shapes")]
struct Cli {
    /// Workspace directory (else $LEXSHAPE_WORKSPACE, else ./workspace)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonical data fields.
    Fields {
        #[command(subcommand)]
        command: FieldsCommands,
    },
    /// Generated SHACL shapes.
    Shapes {
        #[command(subcommand)]
        command: ShapesCommands,
    },
    /// Eligibility rule extraction.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Few-shot example mappings.
    Examples {
        #[command(subcommand)]
        command: ExamplesCommands,
    },
    /// Standing guidelines added to every request.
    Guidelines {
        #[command(subcommand)]
        command: GuidelinesCommands,
    },
    /// Feedback history recorded by `shapes improve`.
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommands,
    },
    /// Synthetic citizen instances.
    Instances {
        #[command(subcommand)]
        command: InstancesCommands,
    },
}

#[derive(Subcommand)]
enum FieldsCommands {
    /// List every registered field.
    List,
    /// Show one field in full.
    Show { name: String },
    /// Import `ff:DataField` definitions from a SHACL/Turtle document.
    Import { file: PathBuf },
    /// Change a field's datatype (`xsd:…`).
    SetDatatype { name: String, datatype: String },
    /// Find the field matching a term.
    Match {
        term: String,
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Draft a field definition for a term.
    Suggest {
        term: String,
        /// Add the suggestion to the registry.
        #[arg(long)]
        register: bool,
    },
}

#[derive(Subcommand)]
enum ShapesCommands {
    /// Generate a shape from a legal text file.
    Generate {
        text_file: PathBuf,
        #[arg(long)]
        description: Option<String>,
        /// Truncate longer texts at a paragraph boundary.
        #[arg(long, default_value_t = lexshape_llm::DEFAULT_MAX_LEGAL_TEXT_CHARS)]
        max_chars: usize,
        /// Print the generation prompt and stop.
        #[arg(long)]
        prompt_only: bool,
    },
    /// Revise a stored shape to address feedback.
    Improve { shape_id: String, feedback: String },
    List,
    Show { shape_id: String },
    /// Set a stored shape's description.
    Describe { shape_id: String, description: String },
    Delete { shape_id: String },
}

#[derive(Subcommand)]
enum RulesCommands {
    /// List the eligibility rules stated in a legal text file.
    Extract {
        text_file: PathBuf,
        #[arg(long, default_value_t = lexshape_llm::DEFAULT_MAX_LEGAL_TEXT_CHARS)]
        max_chars: usize,
    },
}

#[derive(Subcommand)]
enum ExamplesCommands {
    Add {
        name: String,
        text_file: PathBuf,
        shape_file: PathBuf,
        /// YAML mapping of annotation notes.
        #[arg(long)]
        annotations: Option<PathBuf>,
    },
    List,
    Delete { index: usize },
}

#[derive(Subcommand)]
enum GuidelinesCommands {
    Add { text: String },
    List,
    Remove { index: usize },
}

#[derive(Subcommand)]
enum FeedbackCommands {
    List,
    Remove { index: usize },
}

#[derive(Subcommand)]
enum InstancesCommands {
    /// Create (or replace) an instance from `field=value` pairs.
    Create {
        name: String,
        #[arg(value_parser = parse_assignment)]
        properties: Vec<(String, String)>,
    },
    List,
    Show { instance_id: String },
    Delete { instance_id: String },
    /// Validate an instance against a stored shape.
    Validate { instance_id: String, shape_id: String },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected field=value, got {raw:?}"))
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexshape=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let ws = Workspace::open(Workspace::resolve_root(cli.workspace))?;
    match cli.command {
        Commands::Fields { command } => match command {
            FieldsCommands::List => fields::cmd_list(&ws),
            FieldsCommands::Show { name } => fields::cmd_show(&ws, &name),
            FieldsCommands::Import { file } => fields::cmd_import(&ws, &file),
            FieldsCommands::SetDatatype { name, datatype } => {
                fields::cmd_set_datatype(&ws, &name, &datatype)
            }
            FieldsCommands::Match { term, context } => fields::cmd_match(&ws, &term, &context),
            FieldsCommands::Suggest { term, register } => fields::cmd_suggest(&ws, &term, register),
        },
        Commands::Shapes { command } => match command {
            ShapesCommands::Generate {
                text_file,
                description,
                max_chars,
                prompt_only,
            } => shapes::cmd_generate(&ws, &text_file, description, max_chars, prompt_only),
            ShapesCommands::Improve { shape_id, feedback } => {
                shapes::cmd_improve(&ws, &shape_id, &feedback)
            }
            ShapesCommands::List => shapes::cmd_list(&ws),
            ShapesCommands::Show { shape_id } => shapes::cmd_show(&ws, &shape_id),
            ShapesCommands::Describe {
                shape_id,
                description,
            } => shapes::cmd_describe(&ws, &shape_id, &description),
            ShapesCommands::Delete { shape_id } => shapes::cmd_delete(&ws, &shape_id),
        },
        Commands::Rules { command } => match command {
            RulesCommands::Extract {
                text_file,
                max_chars,
            } => shapes::cmd_extract_rules(&ws, &text_file, max_chars),
        },
        Commands::Examples { command } => match command {
            ExamplesCommands::Add {
                name,
                text_file,
                shape_file,
                annotations,
            } => corpus::cmd_example_add(&ws, &name, &text_file, &shape_file, annotations.as_deref()),
            ExamplesCommands::List => corpus::cmd_example_list(&ws),
            ExamplesCommands::Delete { index } => corpus::cmd_example_delete(&ws, index),
        },
        Commands::Guidelines { command } => match command {
            GuidelinesCommands::Add { text } => corpus::cmd_guideline_add(&ws, &text),
            GuidelinesCommands::List => corpus::cmd_guideline_list(&ws),
            GuidelinesCommands::Remove { index } => corpus::cmd_guideline_remove(&ws, index),
        },
        Commands::Feedback { command } => match command {
            FeedbackCommands::List => corpus::cmd_feedback_list(&ws),
            FeedbackCommands::Remove { index } => corpus::cmd_feedback_remove(&ws, index),
        },
        Commands::Instances { command } => match command {
            InstancesCommands::Create { name, properties } => {
                instances::cmd_create(&ws, &name, properties)
            }
            InstancesCommands::List => instances::cmd_list(&ws),
            InstancesCommands::Show { instance_id } => instances::cmd_show(&ws, &instance_id),
            InstancesCommands::Delete { instance_id } => instances::cmd_delete(&ws, &instance_id),
            InstancesCommands::Validate {
                instance_id,
                shape_id,
            } => instances::cmd_validate(&ws, &instance_id, &shape_id),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignments_split_on_first_equals() {
        assert_eq!(
            parse_assignment("notiz=a=b").unwrap(),
            ("notiz".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_assignment("plz=").unwrap(), ("plz".into(), String::new()));
        assert!(parse_assignment("no-equals").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn nested_commands_parse() {
        let cli = Cli::try_parse_from([
            "lexshape",
            "--workspace",
            "/tmp/ws",
            "instances",
            "create",
            "Jane Doe",
            "alter=17",
            "wohnort=Berlin",
        ])
        .expect("parse");
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
        match cli.command {
            Commands::Instances {
                command: InstancesCommands::Create { name, properties },
            } => {
                assert_eq!(name, "Jane Doe");
                assert_eq!(properties.len(), 2);
                assert_eq!(properties[1], ("wohnort".into(), "Berlin".into()));
            }
            _ => panic!("wrong command"),
        }
    }
}
