use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use modelgate::{
    application::{
        brute_force::{format_remaining, BruteForceGuard},
        ports::{Clock, CounterStore, LoginAttemptRepository, RateLimitLedger, ViolationSink},
        rate_limiting::{CountingBackend, FailurePolicy, RateLimiter},
        upload_gate::{ResizeOptions, UploadGate, UploadOptions, UploadOutcome, DEFAULT_QUALITY},
    },
    domain::{
        inspection::ModelInspector,
        sanitization::{SanitizeKind, Sanitizer},
        upload::{extension_of, UploadedFile},
        validation::{FieldValidator, ValidationOptions},
        value_objects::ClientContext,
    },
    infrastructure::{
        clock::SystemClock,
        counters::{InMemoryCounterStore, InMemoryLedger, PostgresCounterStore, PostgresLedger},
        persistence::{
            InMemoryLoginAttemptRepository, InMemoryViolationSink, PostgresLoginAttemptRepository,
            PostgresViolationSink,
        },
        storage::LocalUploadStore,
    },
    Config,
};

#[derive(Parser)]
#[command(name = "modelgate", version, about = "Input validation and abuse controls")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect an STL, OBJ or 3MF file and print the verdict
    Inspect {
        path: PathBuf,
        /// Format hint, defaults to the file extension
        #[arg(long)]
        ext: Option<String>,
    },
    /// Sanitize a string (html, html_strip, xss, plain_text, url, email, filename, css_id)
    Sanitize { kind: SanitizeKind, input: String },
    /// Validate a single value as the given field type
    Validate {
        #[arg(long = "type")]
        field_type: String,
        value: Option<String>,
        #[arg(long)]
        required: bool,
        /// Comma separated allow-list for enum fields
        #[arg(long, value_delimiter = ',')]
        allowed: Vec<String>,
        #[arg(long)]
        min: Option<f64>,
        #[arg(long)]
        max: Option<f64>,
        #[arg(long)]
        pattern: Option<String>,
        /// Skip sanitization of the accepted value
        #[arg(long)]
        raw: bool,
    },
    /// Screen a local file and store it under the upload root
    Upload {
        path: PathBuf,
        /// Directory relative to the upload root
        #[arg(long, default_value = "")]
        dest: String,
        /// Accept STL/OBJ/3MF and inspect them
        #[arg(long)]
        models: bool,
        #[arg(long)]
        preserve_name: bool,
        #[arg(long)]
        max_width: Option<u32>,
        #[arg(long)]
        max_height: Option<u32>,
        #[arg(long, default_value_t = DEFAULT_QUALITY)]
        quality: u8,
    },
    /// Count requests against a fixed-window limit
    RateCheck {
        action: String,
        #[arg(long)]
        identifier: Option<String>,
        /// Remote address used when no identifier is given
        #[arg(long)]
        ip: Option<IpAddr>,
        #[arg(long)]
        user_agent: Option<String>,
        #[arg(long, default_value_t = 60)]
        window: u64,
        #[arg(long, default_value_t = 10)]
        max: u64,
        /// Number of requests to simulate
        #[arg(long, default_value_t = 1)]
        repeat: u32,
        /// Use the per-request ledger instead of counters
        #[arg(long)]
        ledger: bool,
        /// Allow requests when storage is unavailable
        #[arg(long)]
        fail_open: bool,
    },
    /// List or purge recorded rate limit violations
    Violations {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Delete violations older than this many seconds
        #[arg(long)]
        purge_older_than: Option<u64>,
    },
    /// Record or query failed attempts for an identifier
    Attempt {
        identifier: String,
        outcome: AttemptOutcome,
        #[arg(long, default_value = "login")]
        action: String,
        #[arg(long)]
        ip: Option<IpAddr>,
    },
    /// Remove expired counters, ledger rows and attempts
    Prune,
}

#[derive(Clone, Copy, ValueEnum)]
enum AttemptOutcome {
    Failure,
    Success,
    Status,
}

struct Backends {
    counters: Arc<dyn CounterStore>,
    ledger: Arc<dyn RateLimitLedger>,
    violations: Arc<dyn ViolationSink>,
    attempts: Arc<dyn LoginAttemptRepository>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let json = std::env::var("MODELGATE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::from_env()?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    match cli.command {
        Command::Inspect { path, ext } => {
            let ext = ext.unwrap_or_else(|| extension_of(&path.to_string_lossy()));
            let inspector = ModelInspector::new(config.inspector.clone());
            let verdict = tokio::task::spawn_blocking(move || inspector.inspect_path(&path, &ext)).await?;
            print_json(&verdict)?;
            Ok(exit_code(verdict.is_valid()))
        }
        Command::Sanitize { kind, input } => {
            println!("{}", Sanitizer::sanitize(&input, kind));
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate {
            field_type,
            value,
            required,
            allowed,
            min,
            max,
            pattern,
            raw,
        } => {
            let mut options = ValidationOptions {
                required,
                sanitize: !raw,
                ..Default::default()
            }
            .with_range(min, max);
            if let Some(pattern) = pattern {
                regex::Regex::new(&pattern).context("Invalid --pattern")?;
                options = options.with_pattern(&pattern);
            }
            if !allowed.is_empty() {
                options = options.with_allowed_values(allowed);
            } else if field_type.trim().eq_ignore_ascii_case("enum") {
                bail!("Enum fields need --allowed");
            }

            let source: HashMap<String, String> =
                value.map(|v| ("value".to_string(), v)).into_iter().collect();
            let result = FieldValidator::validate_named(&source, "value", &field_type, &options);
            print_json(&result)?;
            Ok(exit_code(result.is_valid()))
        }
        Command::Upload {
            path,
            dest,
            models,
            preserve_name,
            max_width,
            max_height,
            quality,
        } => {
            upload(&config, &path, &dest, models, preserve_name, max_width, max_height, quality)
                .await
        }
        Command::RateCheck {
            action,
            identifier,
            ip,
            user_agent,
            window,
            max,
            repeat,
            ledger,
            fail_open,
        } => {
            let backends = connect(&config).await?;
            let backend = if ledger {
                CountingBackend::Ledger(backends.ledger)
            } else {
                CountingBackend::Counter(backends.counters)
            };
            let limiter = RateLimiter::new(
                backend,
                backends.violations,
                Arc::new(SystemClock),
                config.rate_limit.clone(),
            );
            let policy = if fail_open {
                FailurePolicy::FailOpen
            } else {
                FailurePolicy::FailClosed
            };
            let mut client = ClientContext::new(ip);
            if let Some(ua) = user_agent {
                client = client.with_user_agent(ua);
            }

            let mut allowed = true;
            for attempt in 1..=repeat.max(1) {
                allowed = limiter
                    .check_or(policy, &action, window, max, identifier.as_deref(), &client)
                    .await;
                println!("{} {}", attempt, if allowed { "allowed" } else { "rejected" });
            }
            Ok(exit_code(allowed))
        }
        Command::Violations {
            limit,
            purge_older_than,
        } => {
            let backends = connect(&config).await?;
            let limiter = RateLimiter::new(
                CountingBackend::Counter(backends.counters),
                backends.violations,
                Arc::new(SystemClock),
                config.rate_limit.clone(),
            );
            if let Some(retention) = purge_older_than {
                let purged = limiter.purge_violations(retention).await?;
                info!(purged, "Purged rate limit violations");
            }
            print_json(&limiter.recent_violations(limit).await?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Attempt {
            identifier,
            outcome,
            action,
            ip,
        } => {
            let backends = connect(&config).await?;
            let guard = BruteForceGuard::new(backends.attempts, Arc::new(SystemClock), config.brute_force);
            match outcome {
                AttemptOutcome::Failure => {
                    let locked = guard
                        .register_failure(&identifier, &action, &ClientContext::new(ip))
                        .await?;
                    println!("{}", if locked { "locked" } else { "recorded" });
                }
                AttemptOutcome::Success => {
                    guard.register_success(&identifier, &action).await?;
                    println!("cleared");
                }
                AttemptOutcome::Status => {
                    let attempts = guard.attempt_count(&identifier, &action).await?;
                    let remaining = guard.remaining_lockout(&identifier, &action).await?;
                    print_json(&AttemptStatus {
                        identifier: &identifier,
                        action: &action,
                        attempts,
                        blocked: remaining > 0,
                        remaining_seconds: remaining,
                        remaining: format_remaining(remaining),
                    })?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Prune => {
            let backends = connect(&config).await?;
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
            let counters = RateLimiter::new(
                CountingBackend::Counter(backends.counters),
                backends.violations.clone(),
                clock.clone(),
                config.rate_limit.clone(),
            );
            let ledger = RateLimiter::new(
                CountingBackend::Ledger(backends.ledger),
                backends.violations,
                clock.clone(),
                config.rate_limit.clone(),
            );
            let guard = BruteForceGuard::new(backends.attempts, clock, config.brute_force);

            let counters = counters.prune().await?;
            let entries = ledger.prune().await?;
            let attempts = guard.prune().await?;
            info!(counters, entries, attempts, "Pruned expired rate limit and attempt data");
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[derive(Serialize)]
struct AttemptStatus<'a> {
    identifier: &'a str,
    action: &'a str,
    attempts: u64,
    blocked: bool,
    remaining_seconds: u64,
    remaining: String,
}

#[allow(clippy::too_many_arguments)]
async fn upload(
    config: &Config,
    path: &Path,
    destination: &str,
    models: bool,
    preserve_name: bool,
    max_width: Option<u32>,
    max_height: Option<u32>,
    quality: u8,
) -> Result<ExitCode> {
    let store = LocalUploadStore::new(config.upload_root.clone());
    store.init().await?;
    let gate = UploadGate::new(
        Arc::new(store),
        ModelInspector::new(config.inspector.clone()),
        Arc::new(SystemClock),
    );

    let mut options = if models {
        UploadOptions::models().with_max_size(config.model_max_upload_bytes)
    } else {
        UploadOptions::generic().with_max_size(config.generic_max_upload_bytes)
    };
    if preserve_name {
        options = options.preserving_original_name();
    }
    if max_width.is_some() || max_height.is_some() {
        options = options.with_resize(ResizeOptions {
            max_width,
            max_height,
            quality,
        });
    }

    // The gate consumes its source, so work on a copy
    let original_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Upload path has no file name")?;
    let staged = std::env::temp_dir().join(format!("modelgate-{}", uuid::Uuid::new_v4()));
    let size = tokio::fs::copy(path, &staged)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;
    let file = UploadedFile::new(original_name, staged.clone(), size);

    let outcome = gate.process(&file, destination, &options).await;
    if tokio::fs::try_exists(&staged).await.unwrap_or(false) {
        let _ = tokio::fs::remove_file(&staged).await;
    }

    match outcome.map_err(|e| anyhow::anyhow!("{}: {}", e.public_message(), e))? {
        UploadOutcome::Stored(info) => {
            print_json(&info)?;
            Ok(ExitCode::SUCCESS)
        }
        UploadOutcome::Rejected(rejection) => {
            print_json(&rejection)?;
            Ok(ExitCode::from(1))
        }
    }
}

async fn connect(config: &Config) -> Result<Backends> {
    let Some(url) = &config.database_url else {
        info!("DATABASE_URL not set, using in-memory backends");
        return Ok(Backends {
            counters: Arc::new(InMemoryCounterStore::new(Arc::new(SystemClock))),
            ledger: Arc::new(InMemoryLedger::new()),
            violations: Arc::new(InMemoryViolationSink::new()),
            attempts: Arc::new(InMemoryLoginAttemptRepository::new()),
        });
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("Database connected and migrated");

    Ok(Backends {
        counters: Arc::new(PostgresCounterStore::new(pool.clone())),
        ledger: Arc::new(PostgresLedger::new(pool.clone())),
        violations: Arc::new(PostgresViolationSink::new(pool.clone())),
        attempts: Arc::new(PostgresLoginAttemptRepository::new(pool)),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
