//! Graph analytics commands

use clap::{Args, Subcommand};
use ontograph_core::{CentralityWeights, Direction, Path};
use ontograph_storage::StorageBackend;

use crate::output::{print_json, OutputFormat, Table};
use crate::AppContext;

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(subcommand)]
    pub command: AnalyzeCommands,
}

#[derive(Subcommand)]
pub enum AnalyzeCommands {
    /// All shortest paths between two entities
    Paths {
        /// Starting entity
        from: String,
        /// Target entity
        to: String,
        /// Maximum path length in relations
        #[arg(long)]
        max_depth: Option<u32>,
    },
    /// Rank entities by degree centrality
    Centrality {
        /// Number of entities to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Per-type weight, e.g. `madeOf=0.5` (repeatable)
        #[arg(short, long = "weight", value_parser = parse_weight)]
        weights: Vec<(String, f64)>,
        /// Weight of relation types without an explicit weight
        #[arg(long)]
        default_weight: Option<f64>,
    },
    /// Entities sharing the most neighbors with an entity
    Similar {
        /// Query entity
        entity: String,
        /// Number of entities to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Graph size overview
    Stats,
}

fn parse_weight(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=WEIGHT, got '{}'", raw))?;
    let weight: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight '{}'", value))?;
    check_weight(weight)?;
    Ok((name.trim().to_string(), weight))
}

fn check_weight(weight: f64) -> Result<(), String> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(format!("weight must be a non-negative number, got {}", weight))
    }
}

/// `a -[t]-> b <-[u]- c`
fn render_path(path: &Path) -> String {
    let mut rendered = path.start.to_string();
    for step in &path.steps {
        let edge = match step.direction {
            Direction::Incoming => format!(" <-[{}]- ", step.relation.relation_type),
            _ => format!(" -[{}]-> ", step.relation.relation_type),
        };
        rendered.push_str(&edge);
        rendered.push_str(step.entity.as_str());
    }
    rendered
}

pub async fn run(args: &AnalyzeArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match &args.command {
        AnalyzeCommands::Paths {
            from,
            to,
            max_depth,
        } => {
            let search = ctx.service.find_paths(from, to, *max_depth).await?;
            tracing::info!(
                "Visited {} entities, {} relations",
                search.stats.nodes_visited,
                search.stats.edges_traversed
            );

            match ctx.format {
                OutputFormat::Json => print_json(&search)?,
                OutputFormat::Table if search.paths.is_empty() => println!(
                    "No path found between '{}' and '{}' within {} relations",
                    from, to, search.max_depth
                ),
                OutputFormat::Table => {
                    let length = search.paths[0].len();
                    println!(
                        "{} shortest path(s) of length {} from '{}' to '{}':",
                        search.paths.len(),
                        length,
                        from,
                        to
                    );
                    for path in &search.paths {
                        println!("  {}", render_path(path));
                    }
                    if search.stats.truncated {
                        println!("  (more paths exist; raise max_paths to see them)");
                    }
                }
            }
        }
        AnalyzeCommands::Centrality {
            limit,
            weights,
            default_weight,
        } => {
            let ranking = if weights.is_empty() && default_weight.is_none() {
                ctx.service.centrality(*limit).await?
            } else {
                let mut table = CentralityWeights::default();
                if let Some(w) = default_weight {
                    check_weight(*w).map_err(anyhow::Error::msg)?;
                    table.default_weight = *w;
                }
                for (name, weight) in weights {
                    ctx.service.relation_type(name)?;
                    table = table.with_weight(name.as_str(), *weight);
                }
                ctx.service.weighted_centrality(*limit, &table).await?
            };

            match ctx.format {
                OutputFormat::Json => print_json(&ranking)?,
                OutputFormat::Table if ranking.is_empty() => println!("No relations yet"),
                OutputFormat::Table => {
                    let mut table = Table::new(&["RANK", "ENTITY", "DEGREE", "SCORE"]);
                    for (i, score) in ranking.iter().enumerate() {
                        table.push([
                            (i + 1).to_string(),
                            score.entity.to_string(),
                            score.degree.to_string(),
                            format!("{:.2}", score.score),
                        ]);
                    }
                    print!("{}", table);
                }
            }
        }
        AnalyzeCommands::Similar { entity, limit } => {
            let similar = ctx.service.similar_to(entity, *limit).await?;
            match ctx.format {
                OutputFormat::Json => print_json(&similar)?,
                OutputFormat::Table if similar.is_empty() => {
                    println!("No entity shares a neighbor with '{}'", entity)
                }
                OutputFormat::Table => {
                    let mut table = Table::new(&["ENTITY", "JACCARD", "SHARED"]);
                    for s in &similar {
                        table.push([
                            s.entity.to_string(),
                            format!("{:.3}", s.score),
                            s.shared_neighbors.to_string(),
                        ]);
                    }
                    print!("{}", table);
                }
            }
        }
        AnalyzeCommands::Stats => {
            let summary = ctx.service.summary().await?;
            let entities = ctx.storage.get_all_entities().await?.len();

            match ctx.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "entities": entities,
                    "connected_entities": summary.connected_entities,
                    "relations": summary.relation_count,
                    "relations_by_type": summary.relations_by_type,
                }))?,
                OutputFormat::Table => {
                    println!("Entities:           {}", entities);
                    println!("Connected entities: {}", summary.connected_entities);
                    println!("Relations:          {}", summary.relation_count);
                    for (relation_type, count) in &summary.relations_by_type {
                        println!("  {:<18}{}", relation_type, count);
                    }
                }
            }
        }
    }
    Ok(())
}
