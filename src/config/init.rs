use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use super::{config_base_dir, save_config, validate_config, Config, DEFAULT_WEIGHT};
use crate::entity::{default_weights, load_dataset, Dataset};
use crate::store::{JsonFileStorage, WeightStorage, DEFAULT_MAX_WEIGHT};

/// Answers supplied on the command line; anything missing is prompted for
/// unless `assume_yes` is set, in which case the default is used.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub data: Option<PathBuf>,
    pub id_field: Option<String>,
    pub max_weight: Option<f64>,
    pub default_weight: Option<f64>,
    pub assume_yes: bool,
}

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?;
    let input = input.to_lowercase();
    if input.is_empty() {
        Ok(default_yes)
    } else {
        Ok(input == "y" || input == "yes")
    }
}

/// Prompt until the answer parses as a number in `[min, max]`.
fn prompt_number(message: &str, default: f64, min: f64, max: f64) -> Result<f64> {
    loop {
        let input = prompt_with_default(message, &default.to_string())?;
        match input.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= min && v <= max => return Ok(v),
            Ok(_) => println!("  Invalid: must be between {} and {}. Try again.", min, max),
            Err(_) => println!("  Invalid: must be a number. Try again."),
        }
    }
}

/// Run the init wizard: pick a dataset, write the config file and seed the
/// weights file with one entry per numeric metric.
pub fn run_init_wizard(config_path: &Path, options: InitOptions) -> Result<()> {
    let interactive = !options.assume_yes;

    if interactive {
        println!();
        println!("Counsel Rank Configuration Wizard");
        println!("=================================");
        println!();
    }

    if config_path.exists() {
        let overwrite = !interactive
            || prompt_yes_no(
                &format!(
                    "Config already exists at {}. Overwrite?",
                    config_path.display()
                ),
                false,
            )?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    // 1. Dataset
    let (data, dataset) = match options.data {
        Some(path) => {
            let dataset = load_dataset(&path, options.id_field.as_deref())?;
            (path, dataset)
        }
        None if !interactive => anyhow::bail!("--data is required with --yes"),
        None => loop {
            let input = prompt_with_default(
                "Path to the lawyer dataset (CSV or JSON)",
                "lawyer_data.csv",
            )?;
            let path = PathBuf::from(input);
            match load_dataset(&path, options.id_field.as_deref()) {
                Ok(dataset) => break (path, dataset),
                Err(e) => println!("  Could not load dataset: {:#}. Try again.", e),
            }
        },
    };
    let data = data
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", data.display()))?;

    let metrics = dataset.metric_columns();
    if interactive {
        print_dataset_summary(&dataset, &metrics);
    }

    // 2. Weight bounds
    let max_weight = match options.max_weight {
        Some(v) => v,
        None if interactive => {
            println!();
            println!("Weights multiply each metric. The maximum caps any single weight.");
            prompt_number("Maximum weight", DEFAULT_MAX_WEIGHT, f64::MIN_POSITIVE, f64::MAX)?
        }
        None => DEFAULT_MAX_WEIGHT,
    };

    let default_weight = match options.default_weight {
        Some(v) => v,
        None if interactive => prompt_number(
            "Starting weight for every metric",
            DEFAULT_WEIGHT.min(max_weight),
            0.0,
            max_weight,
        )?,
        None => DEFAULT_WEIGHT.min(max_weight),
    };

    // 3. Write config
    let mut config = Config::new(data);
    config.id_field = Some(dataset.id_field.clone());
    config.max_weight = Some(max_weight);
    config.default_weight = Some(default_weight);

    if let Err(errors) = validate_config(&config) {
        anyhow::bail!("Invalid configuration: {}", errors.join("; "));
    }

    save_config(config_path, &config)?;

    // 4. Seed weights
    let weights_path = config.weights_path(&config_base_dir(config_path));
    let weights = default_weights(&dataset, default_weight);
    JsonFileStorage::new(&weights_path).save(&weights)?;

    println!();
    println!("Config written to {}", config_path.display());
    println!(
        "Weights for {} metrics written to {}",
        weights.len(),
        weights_path.display()
    );
    println!("Run `counsel-rank` to see the ranking, or `counsel-rank weights set` to adjust.");

    Ok(())
}

fn print_dataset_summary(dataset: &Dataset, metrics: &[String]) {
    println!();
    println!(
        "Loaded {} lawyers, identified by '{}'.",
        dataset.records.len(),
        dataset.id_field
    );
    if metrics.is_empty() {
        println!("No numeric metric columns found; weights will start empty.");
    } else {
        println!("Numeric metrics found:");
        for metric in metrics {
            println!("  {}", metric);
        }
    }
}
