//! Entity commands

use clap::{Args, Subcommand};
use ontograph_core::{EntityId, EntityRef, EntityType};
use ontograph_storage::StorageBackend;

use crate::output::{print_json, OutputFormat, Table};
use crate::AppContext;

#[derive(Args)]
pub struct EntityArgs {
    #[command(subcommand)]
    pub command: EntityCommands,
}

#[derive(Subcommand)]
pub enum EntityCommands {
    /// Register an entity in the catalog
    Add {
        /// Entity id
        id: String,
        /// Entity type (Instrument, Family, EthnicGroup, ...)
        #[arg(short = 't', long)]
        r#type: EntityType,
    },
    /// Remove an entity and every relation touching it
    Remove {
        /// Entity id
        id: String,
    },
    /// List catalog entities
    List {
        /// Filter by entity type
        #[arg(short = 't', long)]
        r#type: Option<EntityType>,
    },
}

pub async fn run(args: &EntityArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match &args.command {
        EntityCommands::Add { id, r#type } => {
            ontograph_core::limits::validate_entity_id(id)?;
            let entity_id = EntityId::new(id.as_str());

            // Entity types are fixed once registered
            if let Some(existing) = ctx.storage.get_entity(&entity_id).await? {
                if existing.entity_type != *r#type {
                    anyhow::bail!(
                        "Entity '{}' already exists as {}",
                        id,
                        existing.entity_type
                    );
                }
                println!("Entity '{}' already exists", id);
                return Ok(());
            }

            let entity = EntityRef::new(entity_id, *r#type);
            ctx.storage.save_entity(&entity).await?;
            tracing::info!("Created entity: {} ({})", entity.id, entity.entity_type);

            match ctx.format {
                OutputFormat::Json => print_json(&entity)?,
                OutputFormat::Table => {
                    println!("Created entity: {} ({})", entity.id, entity.entity_type)
                }
            }
        }
        EntityCommands::Remove { id } => {
            let entity_id = EntityId::new(id.as_str());
            if ctx.storage.get_entity(&entity_id).await?.is_none() {
                anyhow::bail!("Entity '{}' not found", id);
            }

            let detached = ctx.service.detach_entity(id).await?;
            ctx.storage.delete_entity(&entity_id).await?;
            tracing::info!("Removed entity {} ({} relations)", id, detached);

            match ctx.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "entity": id,
                    "detached_relations": detached,
                }))?,
                OutputFormat::Table => println!(
                    "Removed entity: {} ({} relations detached)",
                    id, detached
                ),
            }
        }
        EntityCommands::List { r#type } => {
            let entities: Vec<EntityRef> = ctx
                .storage
                .get_all_entities()
                .await?
                .into_iter()
                .filter(|e| r#type.map_or(true, |t| e.entity_type == t))
                .collect();

            match ctx.format {
                OutputFormat::Json => print_json(&entities)?,
                OutputFormat::Table if entities.is_empty() => println!("No entities found"),
                OutputFormat::Table => {
                    let mut table = Table::new(&["ID", "TYPE"]);
                    for entity in &entities {
                        table.push([entity.id.as_str(), entity.entity_type.as_str()]);
                    }
                    print!("{}", table);
                }
            }
        }
    }
    Ok(())
}
