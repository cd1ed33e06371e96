use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jakartify_cache::ConversionCache;
use jakartify_config::{MigrationConfig, DEFAULT_RETENTION_DAYS};
use jakartify_migrate::{Migration, MigrationReport};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "jakartify",
    version,
    about = "Migrate Java EE artifacts between the javax and jakarta namespaces",
    after_help = "A source path named `cache` is read as the cache command; pass it as `./cache`.",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[command(flatten)]
    migrate: MigrateArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect or maintain a conversion cache directory
    Cache(CacheArgs),
}

#[derive(Args)]
struct MigrateArgs {
    /// File or directory to migrate
    #[arg(required = true)]
    source: Option<PathBuf>,
    /// Output file or directory; may equal the source to convert in place
    #[arg(required = true)]
    destination: Option<PathBuf>,
    /// Built-in profile: TOMCAT, EE or JEE8
    #[arg(long, value_name = "NAME")]
    profile: Option<String>,
    /// Copy matching files without conversion (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    excludes: Vec<String>,
    /// Do not skip the built-in list of third-party libraries
    #[arg(long)]
    no_default_excludes: bool,
    /// Match excludes against the full entry path instead of the file name
    #[arg(long)]
    match_excludes_against_path_name: bool,
    /// Buffer archives entirely in memory
    #[arg(long)]
    zip_in_memory: bool,
    /// Reuse converted archives from this cache directory
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
    /// Days an unused cache entry is kept
    #[arg(long, value_name = "DAYS")]
    cache_retention_days: Option<u32>,
    /// TOML config file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log level or `tracing` filter directives
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
    /// Emit the report as JSON
    #[arg(long)]
    json: bool,
}

impl MigrateArgs {
    fn apply(&self, config: &mut MigrationConfig) {
        if let Some(profile) = &self.profile {
            config.profile = profile.clone();
        }
        config.excludes.extend(self.excludes.iter().cloned());
        if self.no_default_excludes {
            config.enable_default_excludes = false;
        }
        if self.match_excludes_against_path_name {
            config.match_excludes_against_path_name = true;
        }
        if self.zip_in_memory {
            config.zip_in_memory = true;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = Some(dir.clone());
        }
        if let Some(days) = self.cache_retention_days {
            config.cache.retention_days = days;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
    /// Conversion cache directory
    #[arg(long, value_name = "DIR", global = true)]
    cache_dir: Option<PathBuf>,
    /// Days an unused cache entry is kept
    #[arg(long, value_name = "DAYS", global = true, default_value_t = DEFAULT_RETENTION_DAYS)]
    retention_days: u32,
    /// Emit JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Number of entries and bytes on disk
    Stats,
    /// Delete every cached archive
    Clear,
    /// Delete entries unused for longer than the retention period
    Prune,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Some(Command::Cache(args)) => run_cache(args),
        None => run_migration(cli.migrate),
    }
}

fn run_migration(args: MigrateArgs) -> Result<i32> {
    let mut config = match &args.config {
        Some(path) => MigrationConfig::load_from_path(path)?,
        None => MigrationConfig::default(),
    };
    args.apply(&mut config);
    jakartify_config::init_tracing(&config.logging);
    tracing::debug!(target: "jakartify.cli", config = ?config, "effective configuration");

    let source = args.source.clone().context("missing <SOURCE>")?;
    let destination = args.destination.clone().context("missing <DESTINATION>")?;
    let migration = Migration::from_config(&config, source, destination)?;
    let report = migration.execute()?;
    print_report(&report, args.json)?;
    Ok(0)
}

fn run_cache(args: CacheArgs) -> Result<i32> {
    jakartify_config::init_tracing(&jakartify_config::LoggingConfig::default());

    let dir = args.cache_dir.context("`--cache-dir` is required")?;
    let cache = ConversionCache::open(&dir, args.retention_days)
        .with_context(|| format!("failed to open cache {}", dir.display()))?;
    match args.command {
        CacheCommand::Stats => {
            let stats = cache.stats()?;
            if args.json {
                print_json(&CacheStatsOutput {
                    dir: &dir,
                    entries: stats.entries,
                    total_bytes: stats.total_bytes,
                })?;
            } else {
                println!("cache: {}", dir.display());
                println!("  entries: {}", stats.entries);
                println!("  bytes: {}", stats.total_bytes);
            }
        }
        CacheCommand::Clear => {
            cache.clear()?;
            if args.json {
                print_json(&serde_json::json!({ "ok": true }))?;
            } else {
                println!("cache: cleared {}", dir.display());
            }
        }
        CacheCommand::Prune => {
            let report = cache.prune()?;
            if args.json {
                print_json(&serde_json::json!({
                    "removed": report.removed,
                    "freed_bytes": report.freed_bytes,
                    "retained": report.retained,
                }))?;
            } else {
                println!(
                    "cache: pruned {} entries ({} bytes), retained {}",
                    report.removed, report.freed_bytes, report.retained
                );
            }
        }
    }
    Ok(0)
}

#[derive(Serialize)]
struct CacheStatsOutput<'a> {
    dir: &'a std::path::Path,
    entries: usize,
    total_bytes: u64,
}

fn print_report(report: &MigrationReport, json: bool) -> Result<()> {
    if json {
        print_json(report)
    } else {
        println!("{report}");
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
