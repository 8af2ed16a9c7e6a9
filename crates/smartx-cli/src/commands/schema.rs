//! Schema command - inspect the form schema template.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use smartx_core::extract::{CONTRACTS, PromptBuilder};
use smartx_core::{SchemaTemplate, transport_template};

use super::load_config;
use super::process::cell;

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    command: SchemaCommand,
}

#[derive(Subcommand)]
enum SchemaCommand {
    /// Print the template as JSON
    Show(TemplateArgs),

    /// List the template fields and their placeholder values
    Fields(TemplateArgs),

    /// List the fields the model is asked to return, per stage
    Contracts,

    /// Print the extraction prompt for a page of text
    Prompt {
        /// File holding the page text
        page: PathBuf,
    },
}

#[derive(Args)]
struct TemplateArgs {
    /// Template file (default: configured template, else built-in Transport)
    #[arg(short, long)]
    template: Option<PathBuf>,
}

pub async fn run(args: SchemaArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        SchemaCommand::Show(template_args) => {
            let template = resolve_template(template_args, config_path)?;
            println!("{}", serde_json::to_string_pretty(&template)?);
        }
        SchemaCommand::Fields(template_args) => {
            let template = resolve_template(template_args, config_path)?;
            print_fields(&template);
        }
        SchemaCommand::Contracts => print_contracts(),
        SchemaCommand::Prompt { page } => {
            let text = std::fs::read_to_string(&page)?;
            let max_page_chars = load_config(config_path)?.extraction.max_page_chars;
            print!("{}", PromptBuilder::new().with_max_page_chars(max_page_chars).build(&text));
        }
    }

    Ok(())
}

fn resolve_template(args: TemplateArgs, config_path: Option<&str>) -> anyhow::Result<SchemaTemplate> {
    let path = match args.template {
        Some(path) => Some(path),
        None => load_config(config_path)?.schema.template_path,
    };

    match path {
        Some(path) => Ok(SchemaTemplate::from_file(&path)?),
        None => Ok(transport_template().clone()),
    }
}

fn print_fields(template: &SchemaTemplate) {
    println!(
        "{} {} (id {}), {} fields",
        style("ℹ").blue(),
        style(&template.name).bold(),
        template.id,
        template.fields().len()
    );
    println!();

    for field in template.fields() {
        println!(
            "  {:<12} {:<34} {:<9} {}",
            field.category.as_str(),
            field.display_name,
            field.control_type.as_str(),
            style(cell(field.value())).dim()
        );
    }
}

fn print_contracts() {
    for contract in CONTRACTS {
        println!("{}", style(contract.stage).bold());
        for field in contract.fields {
            println!("  {:<34} {}", field.name, field.kind.prompt_label());
        }
        println!();
    }
}
