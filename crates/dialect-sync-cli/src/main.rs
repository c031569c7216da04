//! dialect-sync CLI - render dialect SQL and poll tables incrementally.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use dialect_sync::core::identifier::QuoteMethod;
use dialect_sync::core::schema::partition_columns;
use dialect_sync::{
    sanitize_url, BatchPlan, Config, Dialect, DialectImpl, DialectKind, DialectRegistry,
    DialectSettings, MaxIdentifierLength, PgConnection, PollQueue, SchemaFile, SourceOffset,
    SyncError, TableId, TableQuerier,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "dialect-sync")]
#[command(about = "Dialect-aware SQL generation and incremental table polling")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered SQL dialects
    Dialects,

    /// Print CREATE TABLE, ALTER TABLE and UPSERT statements for a column file
    Render {
        /// YAML column file (name, type, logical, scale, optional, key, default)
        #[arg(long)]
        schema: PathBuf,

        /// Target table, optionally schema-qualified
        #[arg(long)]
        table: String,

        /// Dialect name or alias
        #[arg(long, default_value = "generic")]
        dialect: String,

        /// Identifier quoting: always, never or context
        #[arg(long, default_value = "always")]
        quote: String,

        /// Columns the table already has; missing ones produce ALTER statements
        #[arg(long, value_delimiter = ',')]
        existing: Vec<String>,

        /// Truncate the table name to this many characters
        #[arg(long)]
        max_identifier_length: Option<usize>,
    },

    /// Poll the configured tables or query and print records as JSON lines
    Poll {
        /// Poll each table once and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), SyncError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(SyncError::Config)?;

    match cli.command {
        Commands::Dialects => list_dialects(cli.output_json)?,

        Commands::Render {
            schema,
            table,
            dialect,
            quote,
            existing,
            max_identifier_length,
        } => {
            let quote_identifiers = QuoteMethod::parse(&quote).ok_or_else(|| {
                SyncError::Config(format!(
                    "Unknown quoting '{}'. Use always, never or context",
                    quote
                ))
            })?;
            let settings = DialectSettings {
                quote_identifiers,
                ..DialectSettings::default()
            };
            let dialect = DialectImpl::from_name(&dialect, settings)?;
            let max = max_identifier_length.map_or(MaxIdentifierLength::Unbounded, |n| {
                MaxIdentifierLength::Limit(n)
            });
            let file = SchemaFile::load(&schema)?;
            let rendered = render(&dialect, &file, &TableId::parse(&table, max)?, &existing)?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&rendered)?);
            } else {
                println!("{};", rendered.create_table);
                for stmt in &rendered.alter_table {
                    println!("{};", stmt);
                }
                println!("{};", rendered.upsert);
            }
        }

        Commands::Poll { once } => {
            let config = Config::load(&cli.config)?;
            info!("Loaded configuration from {:?}", cli.config);
            let cancel_token = setup_signal_handler().await?;
            let total = poll(config, once, cancel_token).await?;
            if cli.output_json {
                eprintln!("{}", serde_json::json!({ "records": total }));
            } else {
                info!("Polled {} records", total);
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct DialectInfo {
    name: &'static str,
    display_name: &'static str,
    aliases: &'static [&'static str],
    upsert: String,
    placeholder: String,
}

fn list_dialects(output_json: bool) -> Result<(), SyncError> {
    let infos: Vec<DialectInfo> = DialectKind::ALL
        .iter()
        .map(|kind| {
            let d = kind.descriptor();
            DialectInfo {
                name: d.name,
                display_name: d.display_name,
                aliases: d.aliases,
                upsert: format!("{:?}", d.upsert),
                placeholder: format!("{:?}", d.placeholder),
            }
        })
        .collect();

    if output_json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
    } else {
        for info in &infos {
            let aliases = if info.aliases.is_empty() {
                String::new()
            } else {
                format!(" (aliases: {})", info.aliases.join(", "))
            };
            println!(
                "{:<10} {:<22} upsert: {}{}",
                info.name, info.display_name, info.upsert, aliases
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct Rendered {
    dialect: String,
    create_table: String,
    alter_table: Vec<String>,
    upsert: String,
    upsert_kind: String,
    params: Vec<String>,
}

fn render(
    dialect: &DialectImpl,
    file: &SchemaFile,
    table: &TableId,
    existing: &[String],
) -> Result<Rendered, SyncError> {
    let schema = file.to_record_schema()?;
    let columns = schema.column_specs(&file.key_fields())?;
    let create_table = dialect.build_create_table(table, &columns)?;

    let plan = BatchPlan::new(dialect, table.clone(), columns.clone())?;
    let alter_table = if existing.is_empty() {
        Vec::new()
    } else {
        plan.alter_for_missing(dialect, existing)?
    };

    let (keys, non_keys) = partition_columns(&columns);
    if keys.is_empty() {
        warn!("No key fields in {:?}; the upsert is a plain INSERT", file.name);
    }

    Ok(Rendered {
        dialect: dialect.name().to_string(),
        create_table,
        alter_table,
        upsert: plan.upsert().sql.clone(),
        upsert_kind: format!("{:?}", plan.upsert().kind),
        params: keys
            .iter()
            .chain(non_keys.iter())
            .map(|c| c.name.clone())
            .collect(),
    })
}

/// Poll until cancelled (or once per querier) and return the record count.
async fn poll(config: Config, once: bool, cancel: CancellationToken) -> Result<u64, SyncError> {
    let mut registry = DialectRegistry::with_builtins(config.dialect.clone());
    if let Some(name) = &config.connection.dialect {
        registry = registry.override_name(name)?;
    }
    let mode = config.source.query_mode()?;
    let interval = i64::try_from(config.source.poll_interval_ms).unwrap_or(i64::MAX);
    let max_rows = config.source.batch_max_rows;

    let mut queue = PollQueue::new();
    for source in config.source.query_sources(MaxIdentifierLength::Unbounded)? {
        let conn = PgConnection::connect(&config.connection.url).await?;
        let querier =
            TableQuerier::connect(&registry, conn, source, mode.clone(), SourceOffset::default())
                .await?;
        info!(
            "Polling {} in {} mode via {} ({})",
            querier.name(),
            mode.name(),
            querier.dialect().dialect.name(),
            sanitize_url(&config.connection.url)
        );
        queue.push(querier);
    }

    let pending = queue.len();
    let mut polled = 0usize;
    let mut total = 0u64;
    let mut failure = None;

    while !cancel.is_cancelled() && !(once && polled >= pending) {
        let wait = queue
            .wait_millis(Utc::now().timestamp_millis(), interval)
            .unwrap_or(0);
        if wait > 0 && !once {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(wait)) => continue,
            }
        }

        let Some(mut querier) = queue.pop() else {
            break;
        };
        let outcome = tokio::select! {
            r = querier.poll(Utc::now(), max_rows) => Some(r),
            _ = cancel.cancelled() => None,
        };
        polled += 1;

        match outcome {
            Some(Ok(records)) => {
                total += records.len() as u64;
                for record in &records {
                    println!("{}", record.to_json());
                }
            }
            Some(Err(e)) if e.is_database() => {
                warn!("Poll of {} failed: {}", querier.name(), e);
            }
            Some(Err(e)) => {
                failure = Some(e);
                queue.push(querier);
                break;
            }
            None => {}
        }
        queue.push(querier);
    }

    for querier in queue.drain() {
        let name = querier.name().to_string();
        if let Err(e) = querier.shutdown().await {
            warn!("Shutdown of {} failed: {}", name, e);
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(total),
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Unknown verbosity '{}'", other)),
    };

    // Logs go to stderr so stdout carries only statements and records.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Unknown log format '{}'", other)),
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
async fn setup_signal_handler() -> Result<CancellationToken, SyncError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        eprintln!("\nReceived {}. Closing queriers...", name);
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
async fn setup_signal_handler() -> Result<CancellationToken, SyncError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Closing queriers...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
