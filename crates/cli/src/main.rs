use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use skillcap_core::logging::{self, LoggingConfig};
use skillcap_core::{Settings, version};
use skillcap_store::{ConfigStore, MigrationOutcome};
use skillcap_sync::{Runtime, content_hash};
use std::path::{Path, PathBuf};

/// skillcap - skill cap and growth curve configuration tool
#[derive(Parser, Debug)]
#[command(name = "skillcap")]
#[command(about = "Inspect, seed and migrate skill cap configuration", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to skillcap.toml (default: ./skillcap.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write an example settings file and seed the skill file
    Init {
        /// Skill names to seed the skill file with
        #[arg(value_name = "SKILL")]
        skills: Vec<String>,
    },
    /// Show effective limits for one skill or every configured skill
    Show {
        /// Skill name or extension skill id
        #[arg(value_name = "SKILL")]
        skill: Option<String>,

        /// Print the configured entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print level thresholds for a skill
    Curve {
        #[arg(value_name = "SKILL")]
        skill: String,

        /// First level to print
        #[arg(long, default_value_t = 0)]
        from: u32,

        /// Number of levels to print
        #[arg(long, default_value_t = 10)]
        levels: u32,
    },
    /// Rewrite a legacy skill file in the current format
    Migrate,
    /// Print the broadcast hash of the skill file
    Hash,
    /// Reload and report whenever the skill file changes
    Watch,
    /// Show version and protocol information
    Version,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from("skillcap.toml"));
    let settings = Settings::load_or_default(&config_path);

    let mut logging_config = LoggingConfig::from(settings.logging.clone());
    if cli.verbose {
        logging_config = logging_config.with_level("debug");
    }
    let _guard = logging::init_logging(Some(logging_config)).context("Failed to initialize logging")?;

    if cli.verbose {
        println!("{} Using settings: {}", "Info:".blue().bold(), config_path.display());
        println!("{} Skill file: {}", "Info:".blue().bold(), settings.store.primary_path().display());
    }

    match cli.command {
        Commands::Init { skills } => cmd_init(&config_path, &settings, &skills)?,
        Commands::Show { skill, json } => cmd_show(settings, skill.as_deref(), json)?,
        Commands::Curve { skill, from, levels } => cmd_curve(settings, &skill, from, levels)?,
        Commands::Migrate => cmd_migrate(&settings)?,
        Commands::Hash => cmd_hash(&settings)?,
        Commands::Watch => cmd_watch(settings)?,
        Commands::Version => println!("skillcap {}", version::version_string()),
    }

    Ok(())
}

/// Create the settings file from the example when missing, then seed the skill file
fn cmd_init(config_path: &Path, settings: &Settings, skills: &[String]) -> Result<()> {
    if config_path.exists() {
        println!("{} Settings already at {}", "Info:".blue().bold(), config_path.display());
    } else {
        std::fs::write(config_path, Settings::example()).context("Failed to create settings file")?;
        println!("{} Created settings at {}", "Success:".green().bold(), config_path.display());
    }

    let store = ConfigStore::open(&settings.store);
    if store.ensure_exists(skills, &settings.fallback_entry()) {
        println!(
            "{} Seeded {} with {} skill(s)",
            "Success:".green().bold(),
            store.active_path().display(),
            skills.len()
        );
    } else if store.read_text().is_some() {
        println!("{} Skill file already at {}", "Info:".blue().bold(), store.active_path().display());
    } else {
        anyhow::bail!("Could not write skill file at {}", store.active_path().display());
    }

    Ok(())
}

/// Print effective values as resolved for this process
fn cmd_show(settings: Settings, skill: Option<&str>, json: bool) -> Result<()> {
    let runtime = Runtime::standalone(settings);

    if json {
        let entries = runtime.store().load();
        println!("{}", serde_json::to_string_pretty(&entries).context("Failed to encode entries")?);
        return Ok(());
    }

    let skills: Vec<String> = match skill {
        Some(skill) => vec![skill.to_string()],
        None => runtime.store().load().into_keys().collect(),
    };

    if skills.is_empty() {
        println!("{} No skills configured in {}", "Warning:".yellow().bold(), runtime.store().active_path().display());
        return Ok(());
    }

    for skill in &skills {
        let key = runtime.resolver().resolve_key(skill);
        let curve = if runtime.use_custom_growth_curve(skill) {
            format!(
                "custom({} * (level + {})^{})",
                runtime.get_growth_multiplier(skill),
                runtime.get_growth_constant(skill),
                runtime.get_growth_exponent(skill)
            )
        } else {
            "baseline".to_string()
        };
        let name = if key == *skill { skill.cyan().to_string() } else { format!("{} -> {}", skill.cyan(), key) };

        println!(
            "{} cap={} bonus_cap={} relative={} curve={}",
            name,
            runtime.get_cap(skill),
            runtime.get_bonus_cap(skill),
            runtime.is_relative(skill),
            curve
        );
    }

    Ok(())
}

/// Print the progress needed for each level
fn cmd_curve(settings: Settings, skill: &str, from: u32, levels: u32) -> Result<()> {
    let runtime = Runtime::standalone(settings);
    let cap = runtime.get_cap(skill);
    println!("{} cap={}", skill.cyan(), cap);

    for level in from..from.saturating_add(levels) {
        if i64::from(level) >= i64::from(cap) {
            println!("{:>6}  {}", level, "capped".yellow());
            break;
        }
        println!("{:>6}  {:.2}", level, runtime.next_level_threshold(skill, level as f32));
    }

    Ok(())
}

fn cmd_migrate(settings: &Settings) -> Result<()> {
    let store = ConfigStore::open(&settings.store);
    let path = store.active_path();
    match store.migrate() {
        MigrationOutcome::Missing => {
            println!("{} No skill file at {}", "Warning:".yellow().bold(), path.display())
        }
        MigrationOutcome::AlreadyCurrent => {
            println!("{} {} is already in the current format", "Info:".blue().bold(), path.display())
        }
        MigrationOutcome::Migrated { entries } => println!(
            "{} Migrated {} entries in {}",
            "Success:".green().bold(),
            entries,
            store.active_path().display()
        ),
        MigrationOutcome::Unrecognised => anyhow::bail!("{} is not a recognised skill file", path.display()),
        MigrationOutcome::Failed => anyhow::bail!("Failed to rewrite {}", path.display()),
    }
    Ok(())
}

fn cmd_hash(settings: &Settings) -> Result<()> {
    let store = ConfigStore::open(&settings.store);
    let text = store
        .read_text()
        .with_context(|| format!("No readable skill file at {}", store.active_path().display()))?;
    println!("{}  {}", content_hash(&text), store.active_path().display());
    Ok(())
}

/// Follow the skill file until interrupted
fn cmd_watch(settings: Settings) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    rt.block_on(async move {
        let runtime = Runtime::standalone(settings);
        let watcher = runtime.watch().context("Failed to watch skill file")?;
        println!("{} Watching {}", "Info:".blue().bold(), watcher.path().display());

        tokio::select! {
            _ = runtime.follow(watcher.subscribe()) => {}
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for interrupt")?,
        }
        Ok::<(), anyhow::Error>(())
    })
}
