use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doxa_core::{DoxaConfig, PlasticityConfig};
use doxa_memory::Storage;
use doxa_reasoning::providers::create_client;
use doxa_reasoning::{CompletionParams, DocumentOutcome, LlmOracle, PersonaEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Doxa - a persona that reads documents and slowly changes its mind
#[derive(Parser, Debug)]
#[command(name = "doxa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "doxa.toml", env = "DOXA_CONFIG")]
    config: PathBuf,

    /// Persona to operate on
    #[arg(short, long, global = true, default_value = "default", env = "DOXA_PERSONA")]
    persona: String,

    /// Override the data directory from the config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the default persona and import legacy data
    Init,

    /// Process documents (.txt / .md files or directories of them)
    Process {
        /// Files or directories; defaults to the configured materials dir
        paths: Vec<PathBuf>,
    },

    /// Ask the persona a question
    Ask { question: String },

    /// Show the current state
    Show,

    /// Show what changed between the previous and the current generation
    Diff,

    /// Show generation slots and archive size
    Status,

    /// Restore an earlier generation (1 = previous, 2 = backup)
    Rollback {
        #[arg(default_value_t = 1)]
        generations: u32,
    },

    /// Delete archived generations older than the retention period
    Cleanup {
        /// Days to keep; defaults to storage.archive_retention_days
        #[arg(long)]
        days: Option<u64>,
    },

    /// Manage personas
    #[command(subcommand)]
    Personas(PersonaCommand),

    /// Show plasticity and the creed threshold
    Plasticity {
        /// Age in days; defaults to the persona's current age
        #[arg(long)]
        age: Option<u32>,
    },

    /// Apply a plasticity preset, or list presets when no name is given
    Preset { name: Option<String> },
}

#[derive(Subcommand, Debug)]
enum PersonaCommand {
    /// List personas
    #[command(alias = "ls")]
    List,
    /// Delete a persona and all of its generations
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut config = DoxaConfig::load_or_default(&cli.config);
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    let storage = Storage::new(&config.storage.data_dir);

    match &cli.command {
        Commands::Init => init(&storage, &cli),
        Commands::Process { paths } => process(&config, &storage, &cli, paths).await,
        Commands::Ask { question } => {
            let engine = build_engine(&config, &storage, &cli.persona)?;
            let answer = engine.ask(question).await?;
            if cli.json {
                print_json(&answer)
            } else {
                println!("{}", answer.answer);
                Ok(())
            }
        }
        Commands::Show => {
            let state = storage.generations(&cli.persona)?.load_or_default()?;
            if cli.json {
                print_json(&state)
            } else {
                println!("{}", state.describe_for_context(&config.engine.language));
                Ok(())
            }
        }
        Commands::Diff => {
            let diff = storage.generations(&cli.persona)?.diff()?;
            match diff {
                Some(diff) if cli.json => print_json(&diff),
                Some(diff) => {
                    println!("{}", diff);
                    Ok(())
                }
                None => {
                    println!("No previous generation for '{}'", cli.persona);
                    Ok(())
                }
            }
        }
        Commands::Status => {
            let status = storage.generations(&cli.persona)?.status()?;
            if cli.json {
                return print_json(&status);
            }
            println!("Persona: {} (revision {})", status.persona, status.revision);
            for (label, slot) in [
                ("current", &status.current),
                ("previous", &status.previous),
                ("backup", &status.backup),
            ] {
                match slot {
                    Some(info) => println!(
                        "  {:<8} saved {}  age {} days",
                        label,
                        info.saved_at.format("%Y-%m-%d %H:%M:%S"),
                        info.age_in_days
                    ),
                    None => println!("  {:<8} -", label),
                }
            }
            println!("  archive  {} file(s)", status.archive_count);
            Ok(())
        }
        Commands::Rollback { generations } => {
            let store = storage.generations(&cli.persona)?;
            let _guard = storage.locks().acquire(&cli.persona).await;
            if store.rollback(*generations)? {
                println!("Rolled '{}' back {} generation(s)", cli.persona, generations);
            } else {
                println!("No generation {} step(s) back for '{}'", generations, cli.persona);
            }
            Ok(())
        }
        Commands::Cleanup { days } => {
            let store = storage.generations(&cli.persona)?;
            let days = days.unwrap_or(config.storage.archive_retention_days);
            let _guard = storage.locks().acquire(&cli.persona).await;
            let removed = store.cleanup_archive(days)?;
            println!("Removed {} archived generation(s) older than {} days", removed, days);
            Ok(())
        }
        Commands::Personas(PersonaCommand::List) => {
            let personas = storage.registry().list()?;
            if cli.json {
                return print_json(&personas);
            }
            for name in personas {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Personas(PersonaCommand::Delete { name }) => {
            storage.registry().delete(name)?;
            println!("Deleted persona '{}'", name);
            Ok(())
        }
        Commands::Plasticity { age } => {
            let plasticity = storage.plasticity().load_config(&cli.persona)?;
            let age = match age {
                Some(age) => *age,
                None => storage.generations(&cli.persona)?.load_or_default()?.age_in_days,
            };
            let reading = plasticity.reading(age);
            if cli.json {
                print_json(&reading)
            } else {
                println!(
                    "age {} days: plasticity {:.4}, creed threshold {:.2}",
                    reading.age_in_days, reading.plasticity, reading.threshold
                );
                Ok(())
            }
        }
        Commands::Preset { name: None } => {
            let document = storage.plasticity().load(&cli.persona)?;
            for (name, preset) in &document.plasticity_model.presets {
                println!(
                    "{:<10} youth {:>4}d  maturity {:>5}d  decay {:<7} {}",
                    name, preset.youth_period_days, preset.maturity_point_days, preset.decay_rate, preset.description
                );
            }
            Ok(())
        }
        Commands::Preset { name: Some(name) } => {
            let applied: PlasticityConfig = storage.plasticity().apply_preset(&cli.persona, name)?;
            println!(
                "Applied '{}' to '{}': youth {}d, maturity {}d, decay {}",
                name, cli.persona, applied.youth_period_days, applied.maturity_point_days, applied.decay_rate
            );
            Ok(())
        }
    }
}

fn init(storage: &Storage, cli: &Cli) -> Result<()> {
    let registry = storage.registry();
    registry.ensure_default()?;
    if storage.plasticity().ensure_default()? {
        println!("Created default plasticity config");
    }
    let migrated = registry.migrate_legacy()?;
    for name in &migrated {
        println!("Migrated legacy generations of '{}'", name);
    }
    if cli.persona != doxa_core::DEFAULT_PERSONA {
        std::fs::create_dir_all(storage.persona_dir(&cli.persona)?)
            .with_context(|| format!("failed to create persona '{}'", cli.persona))?;
    }
    println!("Data directory ready at {}", storage.root().display());
    Ok(())
}

async fn process(config: &DoxaConfig, storage: &Storage, cli: &Cli, paths: &[PathBuf]) -> Result<()> {
    let inputs = if paths.is_empty() {
        vec![config.engine.materials_dir.clone()]
    } else {
        paths.to_vec()
    };
    let documents = collect_documents(&inputs)?;
    if documents.is_empty() {
        println!("No .txt or .md documents found");
        return Ok(());
    }

    let engine = build_engine(config, storage, &cli.persona)?;
    info!("Processing {} document(s) for '{}'", documents.len(), cli.persona);
    for path in documents {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let outcome = engine
            .process_document(&text)
            .await
            .with_context(|| format!("failed to process {}", path.display()))?;
        if cli.json {
            print_json(&outcome)?;
        } else {
            print_outcome(&path, &outcome);
        }
    }
    Ok(())
}

fn print_outcome(path: &Path, outcome: &DocumentOutcome) {
    println!("== {} (revision {})", path.display(), outcome.revision);
    println!("   impression: {}", outcome.impression.impression);
    println!(
        "   arousal {:.1} (threshold {:.1}, plasticity {:.3})",
        outcome.adjusted_arousal, outcome.plasticity.threshold, outcome.plasticity.plasticity
    );
    println!(
        "   stance: economic {:+.4} -> {:.4}, social {:+.4} -> {:.4}",
        outcome.stance_delta.economic,
        outcome.state.stance.economic_axis,
        outcome.stance_delta.social,
        outcome.state.stance.social_axis
    );
    if outcome.creed.is_mutated() {
        println!("   creed changed: {}", outcome.state.creed);
    }
    if outcome.shrunk {
        println!("   creed shrunk");
    }
    println!("   age {} days", outcome.state.age_in_days);
}

/// Expand directories into their `.txt` / `.md` files, sorted by name.
fn collect_documents(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in std::fs::read_dir(input).with_context(|| format!("failed to read {}", input.display()))? {
                let path = entry?.path();
                if path.is_file() && is_document(&path) {
                    found.push(path);
                }
            }
            found.sort();
            documents.extend(found);
        } else if input.is_file() {
            documents.push(input.clone());
        } else {
            anyhow::bail!("no such file or directory: {}", input.display());
        }
    }
    Ok(documents)
}

fn is_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("txt") | Some("md")
    )
}

fn build_engine(config: &DoxaConfig, storage: &Storage, persona: &str) -> Result<PersonaEngine> {
    let client = create_client(&config.llm)?;
    let oracle = Arc::new(LlmOracle::new(
        client,
        CompletionParams::from(&config.llm),
        config.engine.language.clone(),
    ));
    Ok(PersonaEngine::new(persona, oracle, storage.clone())?
        .with_archive_retention(config.storage.archive_retention_days))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_documents_filters_and_sorts() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["b.md", "a.txt", "c.json", "notes"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.txt.d")).unwrap();

        let docs = collect_documents(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = docs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.md"]);
    }

    #[test]
    fn test_collect_documents_missing_path_errors() {
        assert!(collect_documents(&[PathBuf::from("/definitely/not/here")]).is_err());
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["doxa", "rollback", "2", "--persona", "alice", "--json"]).unwrap();
        assert_eq!(cli.persona, "alice");
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Rollback { generations: 2 }));
    }
}
