use anyhow::{Context, Result};
use causal_graphical_models::{
    catalog,
    config::{Config, OutputFormat},
    graph::CausalGraphicalModel,
    inference::AdjustmentCriterion,
    reports::{formatter_for, QueryReport},
    types::{ConditioningSet, GraphSpec},
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cgm")]
#[command(about = "Reason about causal graphical models: d-separation, interventions and adjustment sets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Graph specification file (YAML or JSON)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Use a built-in model instead of a file (see `cgm models`)
    #[arg(short, long, conflicts_with = "model")]
    builtin: Option<String>,

    /// Log level (overrides the configuration file)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (overrides the configuration file)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the model, its edges and its factorized distribution
    Describe,

    /// Test whether x and y are d-separated given a conditioning set
    Dsep {
        #[arg(short)]
        x: String,

        #[arg(short)]
        y: String,

        /// Conditioning variables (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        given: Vec<String>,
    },

    /// Find or check backdoor adjustment sets for the effect of x on y
    Backdoor {
        #[arg(short)]
        x: String,

        #[arg(short)]
        y: String,

        /// Check this set instead of searching (comma separated, may be empty)
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        check: Option<Vec<String>>,
    },

    /// Find or check frontdoor adjustment sets for the effect of x on y
    Frontdoor {
        #[arg(short)]
        x: String,

        #[arg(short)]
        y: String,

        /// Check this set instead of searching (comma separated, may be empty)
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        check: Option<Vec<String>>,
    },

    /// List every conditional independence implied by the graph
    Independencies,

    /// Apply do() to one or more nodes and print the resulting model
    Do {
        /// Nodes to intervene on, applied in order
        #[arg(required = true)]
        nodes: Vec<String>,

        /// Print the intervened model as a YAML graph specification
        #[arg(long)]
        emit_spec: bool,
    },

    /// List the built-in models
    Models,

    /// Initialize configuration file
    Init {
        /// Configuration file path
        #[arg(short, long, default_value = "cgm.yml")]
        config_file: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration before tracing so the file can set the log level
    let (mut config, config_source) = load_config(cli.config.as_deref()).await?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging.level)?;
    match config_source {
        ConfigSource::File(path) => info!("Loaded configuration from: {:?}", path),
        ConfigSource::Missing(path) => warn!("Configuration file not found: {:?}. Using defaults.", path),
        ConfigSource::Defaults => {}
    }

    match cli.command {
        Commands::Describe => {
            let model = load_model(cli.model.as_deref(), cli.builtin.as_deref()).await?;
            output_report(&QueryReport::describe(&model), &config)?;
        }

        Commands::Dsep { x, y, given } => {
            let model = load_model(cli.model.as_deref(), cli.builtin.as_deref()).await?;
            let given = ConditioningSet::from(given);
            let separated = model
                .is_d_separated(&x, &y, given.clone())
                .with_context(|| format!("Failed to test d-separation of {} and {}", x, y))?;
            let report = QueryReport::DSeparation {
                x,
                y,
                given: given.into_set(),
                separated,
            };
            output_report(&report, &config)?;
        }

        Commands::Backdoor { x, y, check } => {
            let model = load_model(cli.model.as_deref(), cli.builtin.as_deref()).await?;
            let report = adjustment_report(&model, AdjustmentCriterion::Backdoor, x, y, check, &config)?;
            output_report(&report, &config)?;
        }

        Commands::Frontdoor { x, y, check } => {
            let model = load_model(cli.model.as_deref(), cli.builtin.as_deref()).await?;
            let report = adjustment_report(&model, AdjustmentCriterion::Frontdoor, x, y, check, &config)?;
            output_report(&report, &config)?;
        }

        Commands::Independencies => {
            let model = load_model(cli.model.as_deref(), cli.builtin.as_deref()).await?;
            let pool = model.observed_variables().len().saturating_sub(2);
            if pool > config.analysis.max_candidate_pool {
                warn!(
                    "Enumerating independencies over {} conditioning candidates per pair (threshold {})",
                    pool, config.analysis.max_candidate_pool
                );
            }
            let relations = model
                .all_independence_relationships()
                .context("Failed to enumerate independence relationships")?;
            output_report(&QueryReport::Independencies { relations }, &config)?;
        }

        Commands::Do { nodes, emit_spec } => {
            let mut model = load_model(cli.model.as_deref(), cli.builtin.as_deref()).await?;
            for node in &nodes {
                model = model
                    .intervene(node)
                    .with_context(|| format!("Failed to apply do({})", node))?;
            }
            if emit_spec {
                println!("{}", serde_yaml::to_string(&model.to_spec())?);
            } else {
                output_report(&QueryReport::describe(&model), &config)?;
            }
        }

        Commands::Models => {
            for name in catalog::NAMES {
                println!("{}", name);
            }
        }

        Commands::Init { config_file, force } => {
            init_config(&config_file, force).await?;
        }
    }

    Ok(())
}

enum ConfigSource {
    File(PathBuf),
    Missing(PathBuf),
    Defaults,
}

/// Initialize tracing with the specified log level
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to create env filter")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}

/// Load configuration from file (if given) with environment overrides on top
async fn load_config(config_path: Option<&Path>) -> Result<(Config, ConfigSource)> {
    let mut source = ConfigSource::Defaults;
    let mut config = Config::default();

    if let Some(path) = config_path {
        if path.exists() {
            config = Config::load_from_file(path)
                .await
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            source = ConfigSource::File(path.to_path_buf());
        } else {
            source = ConfigSource::Missing(path.to_path_buf());
        }
    }

    let env_config = Config::load_from_env().context("Invalid CGM_* environment variable")?;
    config.merge_with(env_config);

    Ok((config, source))
}

/// Load the model from a specification file or the built-in catalog
async fn load_model(path: Option<&Path>, builtin: Option<&str>) -> Result<CausalGraphicalModel> {
    let spec = match (path, builtin) {
        (Some(path), _) => {
            info!("Loading model from: {:?}", path);
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read model file: {:?}", path))?;
            parse_spec(path, &content)?
        }
        (None, Some(name)) => catalog::spec(name).with_context(|| {
            format!("Unknown built-in model '{}'. Available: {}", name, catalog::NAMES.join(", "))
        })?,
        (None, None) => anyhow::bail!("Specify a model with --model <file> or --builtin <name>"),
    };

    CausalGraphicalModel::from_spec(&spec).context("Invalid causal graph")
}

fn parse_spec(path: &Path, content: &str) -> Result<GraphSpec> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_str(content).with_context(|| format!("Failed to parse JSON model: {:?}", path))
    } else {
        serde_yaml::from_str(content).with_context(|| format!("Failed to parse YAML model: {:?}", path))
    }
}

/// Check a given set, or search for every valid one
fn adjustment_report(
    model: &CausalGraphicalModel,
    criterion: AdjustmentCriterion,
    x: String,
    y: String,
    check: Option<Vec<String>>,
    config: &Config,
) -> Result<QueryReport> {
    if let Some(names) = check {
        let adjustment = ConditioningSet::from(names);
        let valid = model
            .is_valid_adjustment_set(&x, &y, adjustment.clone(), criterion)
            .with_context(|| format!("Failed to check {} adjustment set {}", criterion, adjustment))?;
        return Ok(QueryReport::AdjustmentCheck {
            criterion,
            x,
            y,
            adjustment: adjustment.into_set(),
            valid,
        });
    }

    let candidates = model.adjustment_candidates(&x, &y, criterion)?;
    if candidates.len() > config.analysis.max_candidate_pool {
        warn!(
            "Searching {} adjustment sets over {} candidates (threshold {}): this may take a while",
            criterion,
            candidates.len(),
            config.analysis.max_candidate_pool
        );
    }

    let sets = model
        .all_adjustment_sets(&x, &y, criterion)
        .with_context(|| format!("Failed to search {} adjustment sets for {} -> {}", criterion, x, y))?;
    info!("Found {} valid {} adjustment sets", sets.len(), criterion);

    Ok(QueryReport::AdjustmentSearch { criterion, x, y, sets })
}

fn output_report(report: &QueryReport, config: &Config) -> Result<()> {
    let content = formatter_for(config.output.format).format(report)?;
    println!("{}", content);
    Ok(())
}

/// Initialize configuration file
async fn init_config(config_file: &Path, force: bool) -> Result<()> {
    info!("Initializing configuration file: {:?}", config_file);

    if config_file.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {:?}. Use --force to overwrite.",
            config_file
        );
    }

    Config::default()
        .save_to_file(config_file)
        .await
        .with_context(|| format!("Failed to write configuration file: {:?}", config_file))?;

    info!("Configuration file created successfully: {:?}", config_file);
    println!("Configuration file created: {:?}", config_file);
    println!("Edit this file to customize the analysis settings.");

    Ok(())
}
