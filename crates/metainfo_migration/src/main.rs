use std::path::PathBuf;

use clap::{Parser, Subcommand};
use metainfo_metabase::{MetabaseDb, queries};
use metainfo_migration::config::{self, BucketConfig, MigrationConfig};
use metainfo_migration::{MigrationStats, Migrator};
use metainfo_pointerdb::{SledPointerDb, list_buckets};
use miette::{IntoDiagnostic, Result};
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "metainfo-migration")]
#[command(about = "Migrate legacy pointer metadata into the objects/segments metabase")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Pointer store directory (overrides config)
    #[arg(long, global = true)]
    pointerdb: Option<PathBuf>,

    /// Metabase database file (overrides config)
    #[arg(long, global = true)]
    metabase: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate buckets into the metabase
    Run {
        /// Migrate buckets of this project instead of the configured list
        #[arg(long)]
        project: Option<Uuid>,

        /// Only migrate the bucket with this name
        #[arg(long)]
        bucket: Option<String>,

        /// Rows per insert statement (overrides config)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Per-bucket deadline in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Create the objects and segments tables
    InitSchema,
    /// Show metabase row counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .context_lines(3)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    let cli = Cli::parse();

    let _guard = init_tracing(cli.debug);

    let mut config = if let Some(config_path) = &cli.config {
        info!("Loading config from: {:?}", config_path);
        config::load_config(config_path).await?
    } else {
        config::load_config_from_standard_locations().await?
    };

    if let Some(path) = &cli.pointerdb {
        config.pointerdb.path = path.clone();
    }
    if let Some(path) = &cli.metabase {
        config.metabase.path = path.clone();
    }

    match cli.command {
        Commands::Run {
            project,
            bucket,
            batch_size,
            timeout,
        } => {
            if let Some(batch_size) = batch_size {
                config.migration.batch_size = batch_size;
            }
            if timeout.is_some() {
                config.migration.timeout_secs = timeout;
            }
            config.validate().into_diagnostic()?;
            run(&config, project, bucket).await
        }
        Commands::InitSchema => {
            let metabase = MetabaseDb::open(&config.metabase.path).await?;
            metabase.apply_schema().await?;
            println!("Schema ready: {}", config.metabase.path.display());
            metabase.close().await;
            Ok(())
        }
        Commands::Stats => {
            let metabase = MetabaseDb::open(&config.metabase.path).await?;
            metabase.ensure_schema().await?;
            let stats = metabase.stats().await?;
            println!("Objects:  {}", stats.object_count);
            println!("Segments: {}", stats.segment_count);
            metabase.close().await;
            Ok(())
        }
    }
}

async fn run(
    config: &MigrationConfig,
    project: Option<Uuid>,
    bucket: Option<String>,
) -> Result<()> {
    let pointerdb = SledPointerDb::open(&config.pointerdb.path)?;
    let metabase = MetabaseDb::open(&config.metabase.path).await?;
    metabase.ensure_schema().await?;

    let targets = match project {
        Some(project_id) => match bucket {
            Some(name) => vec![BucketConfig { project_id, name }],
            None => list_buckets(&pointerdb, &project_id)
                .await?
                .into_iter()
                .map(|name| BucketConfig {
                    project_id,
                    name: String::from_utf8_lossy(&name).into_owned(),
                })
                .collect(),
        },
        None => config
            .buckets
            .iter()
            .filter(|target| bucket.as_ref().is_none_or(|name| &target.name == name))
            .cloned()
            .collect(),
    };

    if targets.is_empty() {
        miette::bail!("No buckets to migrate; pass --project or list [[buckets]] in the config");
    }

    info!("Migrating {} bucket(s)", targets.len());
    let mut total = MigrationStats::default();
    for target in &targets {
        let mut migrator = Migrator::new(
            &pointerdb,
            &metabase,
            target.project_id,
            target.name.as_bytes(),
        )
        .with_batch_size(config.migration.batch_size)
        .with_list_limit(config.migration.list_limit);

        let stats = migrator
            .migrate_bucket_within(config.migration.timeout())
            .await?;

        let stored =
            queries::count_objects(metabase.pool(), &target.project_id, target.name.as_bytes())
                .await?;
        println!(
            "{}/{}: {} ({} objects in metabase)",
            target.project_id, target.name, stats, stored
        );
        total += stats;
    }

    println!("Total: {}", total);
    metabase.checkpoint().await?;
    metabase.close().await;
    Ok(())
}

/// Terminal logging plus a daily-rolling debug log file.
fn init_tracing(debug: bool) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_appender::rolling;
    use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("metainfo-migration")
        .join("logs");
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = rolling::daily(&log_dir, "metainfo-migration.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = if debug {
        EnvFilter::new(concat!(
            "metainfo_migration=debug,metainfo_pointerdb=debug,",
            "metainfo_metabase=debug,sqlx=warn,info"
        ))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "metainfo_migration=info,metainfo_pointerdb=info,metainfo_metabase=info,warn",
            )
        })
    };

    let terminal_layer = if debug {
        fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_timer(fmt::time::LocalTime::rfc_3339())
            .pretty()
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .compact()
            .boxed()
    };

    let file_env_filter = EnvFilter::new(
        "metainfo_migration=debug,metainfo_pointerdb=debug,metainfo_metabase=debug,info",
    );

    let file_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_timer(fmt::time::LocalTime::rfc_3339())
        .with_ansi(false) // Disable ANSI colors in file output
        .with_writer(non_blocking)
        .pretty();

    tracing_subscriber::registry()
        .with(terminal_layer.with_filter(env_filter))
        .with(file_layer.with_filter(file_env_filter))
        .init();

    info!(
        "Logging initialized. Logs are being written to: {:?}",
        log_dir.join("metainfo-migration.log")
    );
    guard
}
