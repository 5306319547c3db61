//! Relation commands

use clap::{Args, Subcommand};
use ontograph_core::{Direction, Relation};

use crate::output::{print_json, OutputFormat, Table};
use crate::AppContext;

#[derive(Args)]
pub struct RelationArgs {
    #[command(subcommand)]
    pub command: RelationCommands,
}

#[derive(Subcommand)]
pub enum RelationCommands {
    /// Add a new relation
    Add {
        /// Source entity
        from: String,
        /// Target entity
        to: String,
        /// Relation type
        #[arg(short = 't', long)]
        r#type: String,
    },
    /// Check a relation against the ontology without writing it
    Check {
        /// Source entity
        from: String,
        /// Target entity
        to: String,
        /// Relation type
        #[arg(short = 't', long)]
        r#type: String,
    },
    /// Delete a relation
    Delete {
        /// Source entity
        from: String,
        /// Target entity
        to: String,
        /// Relation type
        #[arg(short = 't', long)]
        r#type: String,
    },
    /// List relations, all of them or those of one entity
    List {
        /// Entity whose relations are listed
        entity: Option<String>,
        /// Filter by type
        #[arg(short = 't', long)]
        r#type: Option<String>,
        /// Direction relative to the entity: outgoing, incoming, both
        #[arg(long, default_value = "both")]
        direction: Direction,
    },
}

pub async fn run(args: &RelationArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match &args.command {
        RelationCommands::Add { from, to, r#type } => {
            let relation = ctx.service.create_relation(from, to, r#type).await?;
            match ctx.format {
                OutputFormat::Json => print_json(&relation)?,
                OutputFormat::Table => println!("Created relation: {}", relation),
            }
        }
        RelationCommands::Check { from, to, r#type } => {
            let result = ctx.service.validate_relation(from, to, r#type).await?;
            match ctx.format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Table if result.ok => {
                    println!("Valid: {} -[{}]-> {}", from, r#type, to)
                }
                OutputFormat::Table => {}
            }

            if !result.ok {
                anyhow::bail!(
                    "Rejected ({}): {}",
                    result
                        .reason
                        .map(|code| code.to_string())
                        .unwrap_or_default(),
                    result.detail.unwrap_or_default()
                );
            }
        }
        RelationCommands::Delete { from, to, r#type } => {
            let deleted = ctx.service.delete_relation(from, to, r#type).await?;
            match ctx.format {
                OutputFormat::Json => print_json(&deleted)?,
                OutputFormat::Table => {
                    println!("Deleted relation: {} -[{}]-> {}", from, r#type, to)
                }
            }
        }
        RelationCommands::List {
            entity,
            r#type,
            direction,
        } => {
            let relations = match entity {
                Some(entity) => {
                    ctx.service
                        .relations_of(entity, r#type.as_deref(), *direction)
                        .await?
                }
                None => ctx.service.all_relations(r#type.as_deref()).await?,
            };
            tracing::info!("Found {} relations", relations.len());
            print_relations(&relations, ctx.format)?;
        }
    }
    Ok(())
}

fn print_relations(relations: &[Relation], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(relations)?,
        OutputFormat::Table if relations.is_empty() => println!("No relations found"),
        OutputFormat::Table => {
            let mut table = Table::new(&["SOURCE", "TYPE", "TARGET", "CREATED"]);
            for relation in relations {
                table.push([
                    relation.source.to_string(),
                    relation.relation_type.clone(),
                    relation.target.to_string(),
                    relation.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ]);
            }
            print!("{}", table);
        }
    }
    Ok(())
}
