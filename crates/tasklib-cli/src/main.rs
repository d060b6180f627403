use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tasklib_cli::args::parse_kwargs;
use tasklib_cli::config::{load_config_file, resolve_db_url, ConfigFile};
use tasklib_cli::modules::register_requested;
use tasklib_cli::CliError;
use tasklib_core::{Config, SubmitOptions, TaskQueue};
use tasklib_postgres::PgTaskStore;
use tasklib_worker::{Worker, WorkerConfig};

#[derive(Parser)]
#[command(name = "tasklib", version, about = "Durable, at-least-once task queue backed by PostgreSQL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the `tasks` table and its indexes if they don't already exist.
    Init {
        #[arg(long, env = "DATABASE_URL")]
        db_url: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Proceed even if the `tasks` table already exists.
        #[arg(long)]
        force: bool,
    },
    /// Run the claim-and-dispatch loop until SIGINT/SIGTERM.
    Worker {
        #[arg(long, env = "DATABASE_URL")]
        db_url: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Compiled-in task module to register handlers from. Repeatable;
        /// falls back to the config file's `tasks.modules` if omitted.
        #[arg(long = "task-module")]
        task_modules: Vec<String>,
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long = "poll-interval")]
        poll_interval: Option<f64>,
        #[arg(long = "worker-id")]
        worker_id: Option<String>,
        #[arg(long = "max-retries")]
        max_retries: Option<i32>,
        #[arg(long = "base-retry-delay")]
        base_retry_delay: Option<f64>,
        #[arg(long = "log-level", default_value = "info")]
        log_level: String,
    },
    /// Validate arguments, insert a `pending` row, and print its id.
    SubmitTask {
        name: String,
        #[arg(long, env = "DATABASE_URL")]
        db_url: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long = "task-module")]
        task_modules: Vec<String>,
        /// `key=value`, repeatable. Values coerce int -> float -> bool -> string.
        #[arg(long = "arg")]
        args: Vec<String>,
        #[arg(long, default_value_t = 0)]
        delay: i64,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Init { db_url, config, force } => run_init(db_url, config, force).await,
        Command::Worker {
            db_url,
            config,
            task_modules,
            concurrency,
            poll_interval,
            worker_id,
            max_retries,
            base_retry_delay,
            log_level,
        } => {
            init_tracing(&log_level);
            run_worker(
                db_url,
                config,
                task_modules,
                concurrency,
                poll_interval,
                worker_id,
                max_retries,
                base_retry_delay,
            )
            .await
        }
        Command::SubmitTask {
            name,
            db_url,
            config,
            task_modules,
            args,
            delay,
        } => run_submit_task(name, db_url, config, task_modules, args, delay).await,
    }
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// CLI flags win over the config file's `tasks.modules`; at least one
/// module must be named by one source or the other.
fn resolve_task_modules(cli_value: Vec<String>, config: &ConfigFile) -> Result<Vec<String>, CliError> {
    let modules = if cli_value.is_empty() {
        config.tasks.modules.clone()
    } else {
        cli_value
    };
    if modules.is_empty() {
        return Err(CliError::NoTaskModules);
    }
    Ok(modules)
}

fn load_config(path: &Option<PathBuf>) -> anyhow::Result<ConfigFile> {
    match path {
        Some(p) => Ok(load_config_file(p)?),
        None => Ok(ConfigFile::default()),
    }
}

async fn run_init(db_url: Option<String>, config_path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let config_file = load_config(&config_path)?;
    let db_url = resolve_db_url(db_url, &config_file)?;

    let store = PgTaskStore::connect(&db_url).await?;
    if !force && store.tasks_table_exists().await? {
        return Err(CliError::AlreadyInitialized.into());
    }

    store.ensure_schema().await?;
    println!("schema ready");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_worker(
    db_url: Option<String>,
    config_path: Option<PathBuf>,
    task_modules: Vec<String>,
    concurrency: Option<usize>,
    poll_interval: Option<f64>,
    worker_id: Option<String>,
    max_retries: Option<i32>,
    base_retry_delay: Option<f64>,
) -> anyhow::Result<()> {
    let config_file = load_config(&config_path)?;
    let db_url = resolve_db_url(db_url, &config_file)?;
    let task_modules = resolve_task_modules(task_modules, &config_file)?;

    let mut config = Config::new(db_url.clone());
    config.concurrency = concurrency
        .or(config_file.worker.concurrency)
        .unwrap_or(config.concurrency);
    config.poll_interval_seconds = poll_interval
        .or(config_file.worker.poll_interval_seconds)
        .unwrap_or(config.poll_interval_seconds);
    config.worker_id = worker_id.or(config_file.worker.id);
    config.max_retries = max_retries
        .or(config_file.retry.max_retries)
        .unwrap_or(config.max_retries);
    config.base_retry_delay_seconds = base_retry_delay
        .or(config_file.retry.base_delay_seconds)
        .unwrap_or(config.base_retry_delay_seconds);

    let store = PgTaskStore::connect(&db_url).await?;
    store.ensure_schema().await?;
    let store: Arc<dyn tasklib_core::TaskStore> = Arc::new(store);

    let mut queue = TaskQueue::new(config.clone(), Arc::clone(&store));
    register_requested(&mut queue, &task_modules)?;

    tracing::info!(task_modules = ?task_modules, "registered task modules");

    let worker_config = WorkerConfig::from_config(&config);
    let registry = Arc::new(queue.into_registry());
    let worker = Worker::new(store, registry, worker_config);
    worker.run().await;
    Ok(())
}

async fn run_submit_task(
    name: String,
    db_url: Option<String>,
    config_path: Option<PathBuf>,
    task_modules: Vec<String>,
    raw_args: Vec<String>,
    delay: i64,
) -> anyhow::Result<()> {
    let config_file = load_config(&config_path)?;
    let db_url = resolve_db_url(db_url, &config_file)?;
    let task_modules = resolve_task_modules(task_modules, &config_file)?;
    let config = Config::new(db_url.clone());

    let store = PgTaskStore::connect(&db_url).await?;
    store.ensure_schema().await?;
    let store: Arc<dyn tasklib_core::TaskStore> = Arc::new(store);

    let mut queue = TaskQueue::new(config, store);
    register_requested(&mut queue, &task_modules)?;

    let kwargs = parse_kwargs(&raw_args)?;
    let id = queue
        .submit(
            &name,
            kwargs,
            SubmitOptions {
                delay_seconds: delay,
                ..Default::default()
            },
        )
        .await?;

    println!("{id}");
    Ok(())
}
