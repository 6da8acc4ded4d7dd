use clap::{Subcommand, ValueEnum};
use progression_core::{Catalog, Config};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum CatalogAction {
    /// Load and validate a catalog
    Check {
        /// Catalog file (defaults to the configured or built-in catalog)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Print one section of the catalog
    Show {
        #[arg(value_enum)]
        section: Section,
        #[arg(long)]
        path: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Section {
    Achievements,
    Nodes,
    Banks,
}

pub fn run(action: CatalogAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CatalogAction::Check { path } => {
            let catalog = match load(path.clone()) {
                Ok(catalog) => catalog,
                Err(err) => {
                    tracing::error!(path = ?path, error = %err, "catalog check failed");
                    return Err(err);
                }
            };
            tracing::info!(
                path = ?path,
                achievements = catalog.achievements().len(),
                nodes = catalog.graph().len(),
                "catalog check passed"
            );
            println!("catalog ok");
            println!("  counters:     {}", catalog.counters().len());
            println!("  achievements: {}", catalog.achievements().len());
            println!("  nodes:        {}", catalog.graph().len());
            println!("  banks:        {}", catalog.banks().len());
        }
        CatalogAction::Show {
            section,
            path,
            json,
        } => {
            let document = load(path)?.to_document();
            match (section, json) {
                (Section::Achievements, true) => {
                    println!("{}", serde_json::to_string_pretty(&document.achievements)?)
                }
                (Section::Nodes, true) => {
                    println!("{}", serde_json::to_string_pretty(&document.nodes)?)
                }
                (Section::Banks, true) => {
                    println!("{}", serde_json::to_string_pretty(&document.banks)?)
                }
                (Section::Achievements, false) => {
                    for a in &document.achievements {
                        println!(
                            "{:<16} {:<9} {:>4} pts  {} >= {}",
                            a.id,
                            format!("{:?}", a.tier).to_lowercase(),
                            a.points,
                            a.counter_key,
                            a.requirement
                        );
                    }
                }
                (Section::Nodes, false) => {
                    for node in &document.nodes {
                        let prereqs = if node.prerequisites.is_empty() {
                            "-".to_string()
                        } else {
                            node.prerequisites.join(", ")
                        };
                        println!(
                            "{:<16} {:>3}%  requires: {prereqs}",
                            node.id, node.completion_threshold
                        );
                    }
                }
                (Section::Banks, false) => {
                    for bank in &document.banks {
                        println!("{:<20} {} ({} items)", bank.id, bank.title, bank.items.len());
                    }
                }
            }
        }
    }
    Ok(())
}

fn load(path: Option<PathBuf>) -> Result<Catalog, Box<dyn std::error::Error>> {
    let catalog = match path {
        Some(path) => Catalog::load(&path)?,
        None => {
            let config = Config::current();
            tracing::debug!(configured = ?config.catalog_path, "resolving catalog");
            config.catalog()?
        }
    };
    Ok(catalog)
}
