use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use transfer_engine::application::driver::{DriverConfig, TransferDriver};
use transfer_engine::application::executor::TransferExecutor;
use transfer_engine::application::retry::RetryPolicy;
use transfer_engine::application::workload::RandomWorkload;
use transfer_engine::config::StoreConfig;
use transfer_engine::domain::account::Currency;
use transfer_engine::domain::ports::{LedgerStore, LedgerStoreRef};
use transfer_engine::domain::transfer::TransferRequest;
use transfer_engine::infrastructure::in_memory::InMemoryLedger;
#[cfg(feature = "storage-rocksdb")]
use transfer_engine::infrastructure::rocksdb::RocksDbLedger;
use transfer_engine::interfaces::csv::account_reader::AccountReader;
use transfer_engine::interfaces::csv::account_writer::AccountWriter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "LEDGER_DB_PATH", global = true)]
    db_path: Option<PathBuf>,

    /// Accounts CSV (`id,currency,balance`) loaded into the ledger before running.
    #[arg(long, env = "LEDGER_ACCOUNTS", global = true)]
    accounts: Option<PathBuf>,

    /// How long a transfer waits for an account row lock, in milliseconds.
    #[arg(long, env = "LEDGER_LOCK_TIMEOUT_MS", default_value_t = 2000, global = true)]
    lock_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run concurrent workers issuing random transfers, then print balances.
    Run(RunArgs),
    /// Execute a single transfer.
    Transfer(TransferArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, default_value_t = 10)]
    workers: usize,

    /// Transfers issued by each worker.
    #[arg(long, default_value_t = 50)]
    ops: usize,

    /// Lowest account id drawn. Defaults to the lowest id in the ledger.
    #[arg(long)]
    min_account: Option<i64>,

    /// Highest account id drawn. Defaults to the highest id in the ledger.
    #[arg(long)]
    max_account: Option<i64>,

    #[arg(long, value_delimiter = ',', default_value = "USD,EUR,UZS,RUB,TJS")]
    currencies: Vec<Currency>,

    #[arg(long, default_value = "10000")]
    max_amount: Decimal,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Retries per transfer on commit conflicts. 0 disables retrying.
    #[arg(long, default_value_t = 0)]
    max_retries: u32,

    #[arg(long, default_value_t = 10)]
    retry_backoff_ms: u64,

    /// Stop issuing new transfers after this many seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,
}

#[derive(Args)]
struct TransferArgs {
    #[arg(long)]
    from: i64,

    #[arg(long)]
    to: i64,

    #[arg(long)]
    amount: Decimal,

    #[arg(long)]
    currency: Currency,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = StoreConfig::with_lock_timeout(Duration::from_millis(cli.lock_timeout_ms));
    let store = open_store(cli.db_path.as_deref(), config)?;

    if let Some(path) = &cli.accounts {
        let loaded = load_accounts(&store, path).await?;
        info!("Loaded {} accounts from {}", loaded, path.display());
    }

    match cli.command {
        Command::Run(args) => run(store, args).await,
        Command::Transfer(args) => transfer(store, args).await,
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<&Path>, config: StoreConfig) -> Result<LedgerStoreRef> {
    match db_path {
        Some(path) => {
            let store = RocksDbLedger::open_with_config(path, config).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryLedger::with_config(config))),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<&Path>, config: StoreConfig) -> Result<LedgerStoreRef> {
    if db_path.is_some() {
        warn!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Arc::new(InMemoryLedger::with_config(config)))
}

async fn load_accounts(store: &LedgerStoreRef, path: &Path) -> Result<usize> {
    let file = File::open(path).into_diagnostic()?;
    let mut loaded = 0;
    for account in AccountReader::new(file).accounts() {
        match account {
            Ok(account) => {
                store.put_account(account).await.into_diagnostic()?;
                loaded += 1;
            }
            Err(e) => warn!("Error reading account: {}", e),
        }
    }
    Ok(loaded)
}

async fn run(store: LedgerStoreRef, args: RunArgs) -> Result<()> {
    let accounts = store.accounts().await.into_diagnostic()?;
    let min_account = args
        .min_account
        .or_else(|| accounts.first().map(|a| a.id))
        .ok_or_else(|| miette!("no accounts in the ledger; pass --accounts or --min-account"))?;
    let max_account = args
        .max_account
        .or_else(|| accounts.last().map(|a| a.id))
        .ok_or_else(|| miette!("no accounts in the ledger; pass --accounts or --max-account"))?;

    let config = DriverConfig {
        workers: args.workers,
        ops_per_worker: args.ops,
        workload: RandomWorkload {
            accounts: min_account..=max_account,
            currencies: args.currencies,
            max_amount: args.max_amount,
            seed: args.seed,
        },
    };
    let retry = RetryPolicy::new(
        args.max_retries,
        Duration::from_millis(args.retry_backoff_ms),
        Duration::from_secs(1),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, no new transfers will start");
            on_interrupt.cancel();
        }
    });
    if let Some(secs) = args.deadline_secs {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            info!("Deadline of {}s reached, no new transfers will start", secs);
            on_deadline.cancel();
        });
    }

    let executor = Arc::new(TransferExecutor::new(Arc::clone(&store)));
    let driver = TransferDriver::new(executor, retry);
    let report = driver.run_workers(&config, cancel).await.into_diagnostic()?;
    info!(
        "{} transfers attempted, {} completed, {} failed, {} worker(s) cancelled",
        report.total(),
        report.completed(),
        report.failed(),
        report.cancelled_workers()
    );

    let balances = store.accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(balances).into_diagnostic()?;

    Ok(())
}

async fn transfer(store: LedgerStoreRef, args: TransferArgs) -> Result<()> {
    let request =
        TransferRequest::new(args.from, args.to, args.amount, args.currency).into_diagnostic()?;
    let executor = TransferExecutor::new(store);
    let started = Instant::now();
    let order_id = executor.transfer(&request).await.into_diagnostic()?;
    info!(
        "transfer {} -> {} of {} {} finished in {:?}",
        request.sender(),
        request.beneficiary(),
        request.amount(),
        request.currency(),
        started.elapsed()
    );
    println!("order {}", order_id);
    Ok(())
}
