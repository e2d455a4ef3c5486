//! assetdb CLI - inspect an asset dependency database

use std::path::{Path, PathBuf};

use assetdb::config::{default_config_path, load_config, write_config, AssetDbConfig};
use assetdb::ui::{self, Icons};
use assetdb::{AssetDatabaseConnection, DependencyResolver, JobFilter, JobStatus, LikeType, TypeOfDependency};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "assetdb")]
#[command(version)]
#[command(about = "Asset dependency tracking database")]
#[command(long_about = r#"
assetdb reads the database an asset pipeline keeps about its sources,
build jobs, products and the dependencies between them.

Example usage:
  assetdb init
  assetdb sources rock --like starts
  assetdb jobs textures/rock.png --platform pc
  assetdb deps 42 --all --format json
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty database with the current schema
    Init {
        /// Also write a config file pointing at the database
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Show row counts per table
    Stats,

    /// Find sources by name
    Sources {
        /// Text to look for in source names
        pattern: String,

        /// How the pattern matches (starts, ends, matches, raw)
        #[arg(short, long, default_value = "matches")]
        like: String,
    },

    /// List the jobs of a source
    Jobs {
        /// Source name
        source_name: String,

        #[arg(short, long)]
        platform: Option<String>,

        /// Only jobs with this status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// List the products of a source
    Products {
        /// Source name
        source_name: String,

        #[arg(short, long)]
        platform: Option<String>,
    },

    /// Show what a product depends on
    Deps {
        /// Product ID
        product_id: i64,

        /// Follow dependencies transitively
        #[arg(short, long)]
        all: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show which sources depend on a source
    Dependents {
        /// Source name
        source: String,

        /// Dependency type (source, job, source_or_job, like, any)
        #[arg(short = 't', long = "type", default_value = "any")]
        kind: String,
    },

    /// List product dependencies waiting for resolution
    Unresolved,
}

fn resolve_database(cli_database: Option<PathBuf>, config: &AssetDbConfig) -> anyhow::Result<PathBuf> {
    match cli_database {
        Some(path) => Ok(path),
        None => Ok(config.database_path(&std::env::current_dir()?)),
    }
}

fn open(path: &Path, config: &AssetDbConfig) -> anyhow::Result<AssetDatabaseConnection> {
    let mut db = AssetDatabaseConnection::new(path);
    db.open(config.open_mode())?;
    Ok(db)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_config(Some(config_path.as_path()))?.unwrap_or_default();
    let database = resolve_database(cli.database, &config)?;

    match cli.command {
        Commands::Init { write_config: write, force } => {
            AssetDatabaseConnection::create(&database)?;
            ui::success("Asset database ready");
            ui::status(Icons::DATABASE, "Path", &database.display().to_string());

            if write {
                let new_config = AssetDbConfig {
                    database: Some(database.display().to_string()),
                    read_only: config.read_only,
                };
                write_config(&config_path, &new_config, force)?;
                ui::status(Icons::INFO, "Config", &config_path.display().to_string());
            }
        }

        Commands::Stats => {
            let db = open(&database, &config)?;
            let stats = db.stats()?;

            ui::header(&format!("Asset database {}", database.display()));
            ui::status(Icons::STATS, "Schema version", &stats.version.to_string());
            println!("{}", ui::stats_table(&stats));
        }

        Commands::Sources { pattern, like } => {
            let like: LikeType = like.parse()?;
            let db = open(&database, &config)?;

            println!("{} Searching sources for '{}'...", Icons::SEARCH, pattern);
            let sources = db.query_source_like_source_name(&pattern, like)?.collect_vec()?;
            if sources.is_empty() {
                println!("{} No sources found.", Icons::EMPTY);
            } else {
                println!("{}", ui::source_table(&sources));
            }
        }

        Commands::Jobs { source_name, platform, status } => {
            let mut filter = JobFilter::new();
            if let Some(platform) = platform {
                filter = filter.platform(platform);
            }
            if let Some(status) = status {
                filter = filter.status(status.parse::<JobStatus>()?);
            }

            let db = open(&database, &config)?;
            let jobs = db.query_job_info_by_source_name(&source_name, &filter)?.collect_vec()?;
            if jobs.is_empty() {
                println!("{} No jobs found for {}.", Icons::EMPTY, source_name);
            } else {
                println!("{} Jobs for {}", Icons::JOB, source_name);
                println!("{}", ui::job_table(&jobs));
                for job in jobs.iter().filter(|j| j.status.is_failure()) {
                    println!("{}", ui::failed_job(job));
                }
            }
        }

        Commands::Products { source_name, platform } => {
            let filter = match platform {
                Some(platform) => JobFilter::new().platform(platform),
                None => JobFilter::new(),
            };

            let db = open(&database, &config)?;
            let products = db.query_product_by_source_name(&source_name, &filter)?.collect_vec()?;
            if products.is_empty() {
                println!("{} No products found for {}.", Icons::EMPTY, source_name);
            } else {
                println!("{} Products of {}", Icons::PRODUCT, source_name);
                println!("{}", ui::product_table(&products));
            }
        }

        Commands::Deps { product_id, all, format } => {
            let db = open(&database, &config)?;
            let resolver = DependencyResolver::new(&db);

            if all {
                let deps = resolver.transitive(product_id)?;
                if format == "json" {
                    println!("{}", serde_json::to_string_pretty(&deps)?);
                } else if deps.is_empty() {
                    println!("{} Product {} has no dependencies.", Icons::EMPTY, product_id);
                } else {
                    println!("{} Dependencies of product {}:", Icons::LINK, product_id);
                    for dep in deps {
                        let prefix = if dep.is_direct() { Icons::DIRECT } else { Icons::INDIRECT };
                        println!(
                            "{} {} {}",
                            prefix,
                            dep.product,
                            ui::dim(&format!("(depth {}, via {})", dep.depth, dep.via))
                        );
                    }
                }
            } else {
                let deps = resolver.direct(product_id)?;
                if format == "json" {
                    println!("{}", serde_json::to_string_pretty(&deps)?);
                } else if deps.is_empty() {
                    println!("{} Product {} has no dependencies.", Icons::EMPTY, product_id);
                } else {
                    println!("{}", ui::product_table(&deps));
                }
            }
        }

        Commands::Dependents { source, kind } => {
            let kind: TypeOfDependency = kind.parse()?;
            let db = open(&database, &config)?;

            let deps = db
                .query_source_dependency_by_depends_on_source(&source, None, kind)?
                .collect_vec()?;
            if deps.is_empty() {
                println!("{} Nothing depends on {}.", Icons::EMPTY, source);
            } else {
                println!("{} Sources depending on {}", Icons::SOURCE, source);
                println!("{}", ui::dependency_table(&deps));
            }
        }

        Commands::Unresolved => {
            let db = open(&database, &config)?;
            let pending = db.query_unresolved_product_dependencies()?.collect_vec()?;

            if pending.is_empty() {
                ui::success("All product dependencies are resolved.");
            } else {
                ui::section(&format!("{} unresolved", pending.len()));
                for dep in pending {
                    println!("{} {} {}", Icons::PENDING, dep.unresolved_path, ui::muted(&dep.to_string()));
                }
            }
        }
    }

    Ok(())
}
