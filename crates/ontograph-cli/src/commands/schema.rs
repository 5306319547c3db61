//! Schema commands

use std::collections::BTreeSet;

use clap::{Args, Subcommand};
use ontograph_core::EntityType;

use crate::output::{print_json, OutputFormat, Table};
use crate::AppContext;

#[derive(Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub command: SchemaCommands,
}

#[derive(Subcommand)]
pub enum SchemaCommands {
    /// List relation types
    List,
    /// Show one relation type
    Show {
        /// Relation type name
        name: String,
    },
}

fn type_list(types: &BTreeSet<EntityType>) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn run(args: &SchemaArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match &args.command {
        SchemaCommands::List => {
            let definitions = ctx.service.relation_types();
            match ctx.format {
                OutputFormat::Json => print_json(&definitions)?,
                OutputFormat::Table => {
                    let mut table = Table::new(&["NAME", "SOURCES", "TARGETS", "CARDINALITY"]);
                    for def in &definitions {
                        table.push([
                            def.name.clone(),
                            type_list(&def.sources),
                            type_list(&def.targets),
                            def.cardinality.to_string(),
                        ]);
                    }
                    print!("{}", table);
                }
            }
        }
        SchemaCommands::Show { name } => {
            let def = ctx.service.relation_type(name)?;
            match ctx.format {
                OutputFormat::Json => print_json(&def)?,
                OutputFormat::Table => {
                    println!("{}", def.name);
                    if let Some(description) = &def.description {
                        println!("  {}", description);
                    }
                    println!("  sources:     {}", type_list(&def.sources));
                    println!("  targets:     {}", type_list(&def.targets));
                    println!("  cardinality: {}", def.cardinality);
                }
            }
        }
    }
    Ok(())
}
