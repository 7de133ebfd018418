use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use counsel_rank::config::{self, init::InitOptions, Config};
use counsel_rank::entity::{default_weights, load_dataset, Dataset};
use counsel_rank::output;
use counsel_rank::ranking::RankingService;
use counsel_rank::scoring::RankedEntity;
use counsel_rank::store::{ConfigError, ConfigStore, JsonFileStorage};

const EXIT_SUCCESS: i32 = 0;
const EXIT_DATA: i32 = 1;
const EXIT_INVALID_WEIGHTS: i32 = 2;
const EXIT_ENGINE: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Table,
    Tsv,
    Json,
}

#[derive(Subcommand, Debug)]
enum WeightsCommand {
    /// Print the current weight configuration
    Show,
    /// Change individual weights, keeping the rest
    Set {
        /// Assignments of the form METRIC=VALUE
        #[arg(value_name = "KEY=VALUE")]
        assignments: Vec<String>,
        /// Metric to drop from the configuration (repeatable)
        #[arg(long = "remove", value_name = "KEY")]
        remove: Vec<String>,
    },
    /// Replace the whole configuration with a JSON object
    Replace {
        /// JSON file with metric-to-weight pairs, or `-` for stdin
        source: String,
    },
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List lawyers sorted by score (default if no subcommand)
    List {
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
        /// Only show the first N entries
        #[arg(long)]
        top: Option<usize>,
        /// Re-sort the listing by a column (numeric, highest first); ranks are kept
        #[arg(long, value_name = "COLUMN")]
        sort_by: Option<String>,
        /// Sort lowest first (with --sort-by)
        #[arg(long, requires = "sort_by")]
        asc: bool,
    },
    /// Show one ranked lawyer with the score breakdown
    Show {
        /// Rank to show (1-based, as shown in list)
        rank: usize,
    },
    /// Write the full ranking to a CSV file
    Export { path: PathBuf },
    /// Inspect or change weights
    Weights {
        #[command(subcommand)]
        command: WeightsCommand,
    },
    /// Create the config file and seed default weights
    Init {
        /// Lawyer dataset to configure
        #[arg(long)]
        data: Option<PathBuf>,
        /// Column that identifies each lawyer
        #[arg(long)]
        id_field: Option<String>,
        /// Accept defaults without prompting
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "counsel-rank")]
#[command(about = "Weighted ranking of lawyers by their metrics", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/counsel-rank/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dataset to rank, overriding the configured one
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn exit_with(code: i32, message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(code);
}

fn main() {
    let cli = Cli::parse();
    counsel_rank::logging::init_tracing(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(config::get_config_path);
    let command = cli.command.unwrap_or(Commands::List {
        format: Format::Table,
        top: None,
        sort_by: None,
        asc: false,
    });

    if let Commands::Init { data, id_field, yes } = command {
        let options = InitOptions {
            data: data.or(cli.data),
            id_field,
            assume_yes: yes,
            ..InitOptions::default()
        };
        if let Err(e) = config::init::run_init_wizard(&config_path, options) {
            exit_with(EXIT_CONFIG, format!("Init failed: {:#}", e));
        }
        std::process::exit(EXIT_SUCCESS);
    }

    let config = match config::load_config(&config_path) {
        Ok(c) => c,
        Err(e) => exit_with(EXIT_CONFIG, format!("Config error: {:#}", e)),
    };

    if let Err(errors) = config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let base_dir = config::config_base_dir(&config_path);
    let data_path = cli.data.unwrap_or_else(|| config.data_path(&base_dir));
    let dataset = match load_dataset(&data_path, config.id_field.as_deref()) {
        Ok(d) => d,
        Err(e) => exit_with(EXIT_DATA, format!("Data error: {:#}", e)),
    };

    let store = match open_store(&config, &base_dir, &dataset) {
        Ok(s) => Arc::new(s),
        Err(e) => exit_with(config_error_code(&e), format!("Weights error: {}", e)),
    };

    if !store.load_issues().is_empty() {
        eprintln!("Saved weights no longer pass validation and were ignored:");
        for issue in store.load_issues() {
            eprintln!("  - {}", issue);
        }
        eprintln!("Using default weights until `weights set` or `weights replace` saves new ones.");
    }

    let columns = dataset.columns.clone();
    let service = RankingService::new(store, dataset.records);

    match command {
        Commands::List {
            format,
            top,
            sort_by,
            asc,
        } => {
            let mut ranked = ranked_or_exit(&service).to_vec();
            if let Some(column) = sort_by {
                if !output::is_sortable_column(&columns, &column) {
                    exit_with(
                        EXIT_DATA,
                        format!(
                            "Unknown column '{}'. Available: rank, score, {}",
                            column,
                            columns.join(", ")
                        ),
                    );
                }
                output::sort_by_column(&mut ranked, &column, asc);
            }
            let shown = &ranked[..top.unwrap_or(ranked.len()).min(ranked.len())];
            let text = match format {
                Format::Table => {
                    output::format_ranked_table(shown, output::should_use_colors())
                }
                Format::Tsv => output::format_tsv(shown),
                Format::Json => match output::format_json(shown) {
                    Ok(json) => json,
                    Err(e) => exit_with(EXIT_DATA, format!("Failed to encode JSON: {}", e)),
                },
            };
            println!("{}", text);
        }
        Commands::Show { rank } => {
            let ranked = ranked_or_exit(&service);
            if rank < 1 || rank > ranked.len() {
                exit_with(
                    EXIT_DATA,
                    format!(
                        "Invalid rank {}. Must be between 1 and {}.",
                        rank,
                        ranked.len()
                    ),
                );
            }
            println!(
                "{}",
                output::format_ranked_detail(
                    &ranked[rank - 1],
                    &columns,
                    output::should_use_colors()
                )
            );
        }
        Commands::Export { path } => {
            let ranked = ranked_or_exit(&service);
            if let Err(e) = output::export_csv(&path, &columns, &ranked) {
                exit_with(EXIT_DATA, format!("Export failed: {:#}", e));
            }
            println!("Wrote {} ranked lawyers to {}", ranked.len(), path.display());
        }
        Commands::Weights { command } => run_weights(command, &service),
        Commands::Init { .. } => unreachable!("handled before config load"),
    }

    std::process::exit(EXIT_SUCCESS);
}

fn open_store(
    config: &Config,
    base_dir: &Path,
    dataset: &Dataset,
) -> Result<ConfigStore, ConfigError> {
    let weights_path = config.weights_path(base_dir);
    tracing::debug!(path = %weights_path.display(), "opening weight store");
    ConfigStore::open(
        Box::new(JsonFileStorage::new(weights_path)),
        config.weight_policy(&dataset.metric_columns()),
        || default_weights(dataset, config.default_weight()),
    )
}

fn config_error_code(err: &ConfigError) -> i32 {
    match err {
        ConfigError::InvalidWeightValue(_) => EXIT_INVALID_WEIGHTS,
        ConfigError::Persist(_) | ConfigError::Load(_) => EXIT_CONFIG,
    }
}

fn ranked_or_exit(service: &RankingService) -> Arc<Vec<RankedEntity>> {
    match service.ranked() {
        Ok(r) => r,
        Err(e) => exit_with(EXIT_ENGINE, format!("Ranking failed: {}", e)),
    }
}

fn report_update_failure(err: &ConfigError) -> ! {
    if let ConfigError::InvalidWeightValue(issues) = err {
        eprintln!("Weights not saved. Invalid values:");
        for issue in issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(EXIT_INVALID_WEIGHTS);
    }
    exit_with(config_error_code(err), format!("Weights not saved: {}", err));
}

fn run_weights(command: WeightsCommand, service: &RankingService) {
    let store = service.store();
    let use_colors = output::should_use_colors();

    match command {
        WeightsCommand::Show => {
            println!("{}", output::format_weights(&store.get(), use_colors));
        }
        WeightsCommand::Set {
            assignments,
            remove,
        } => {
            let mut draft = store.draft();
            for assignment in &assignments {
                let Some((key, value)) = assignment.split_once('=') else {
                    exit_with(
                        EXIT_INVALID_WEIGHTS,
                        format!("Expected KEY=VALUE, got '{}'", assignment),
                    );
                };
                draft.set(key.trim(), Value::String(value.trim().to_string()));
            }
            for key in remove {
                draft.remove(key);
            }

            if !draft.is_dirty() {
                exit_with(
                    EXIT_INVALID_WEIGHTS,
                    "Nothing to change. Pass KEY=VALUE or --remove KEY.",
                );
            }

            match draft.commit(store) {
                Ok(saved) => println!("{}", output::format_weights(&saved, use_colors)),
                Err(e) => report_update_failure(&e),
            }
        }
        WeightsCommand::Replace { source } => {
            let candidate = match read_candidate(&source) {
                Ok(c) => c,
                Err(e) => exit_with(EXIT_INVALID_WEIGHTS, format!("{:#}", e)),
            };
            match store.update(&candidate) {
                Ok(saved) => println!("{}", output::format_weights(&saved, use_colors)),
                Err(e) => report_update_failure(&e),
            }
        }
    }
}

/// Read a JSON object of metric weights from a file, or stdin for `-`.
fn read_candidate(source: &str) -> anyhow::Result<BTreeMap<String, Value>> {
    use anyhow::Context;

    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read weights from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read weights from {}", source))?
    };

    serde_json::from_str(&text).context("Weights must be a JSON object of metric to number")
}
