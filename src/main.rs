use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tpcc_kv::workload::{BenchConfig, ScaleParameters, load_dataset, run_benchmark};
use tpcc_kv::{DriverConfig, InMemoryConnector};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tpcc-kv")]
#[command(about = "TPC-C benchmark driver over a partitioned key-value store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a generated dataset, then run the transaction mix.
    Run {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long, default_value_t = 1)]
        clients: usize,
        #[arg(long, default_value_t = 60)]
        duration_secs: u64,
        /// Stop each client after this many transactions.
        #[arg(long)]
        max_transactions: Option<u64>,
    },
    /// Load a generated dataset and exit.
    Load {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    #[arg(long, default_value_t = 1)]
    warehouses: i64,
    /// JSON driver configuration; defaults to one shard per warehouse.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Clear every table before loading.
    #[arg(long)]
    reset: bool,
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Simulated round-trip latency of every store call.
    #[arg(long, default_value_t = 0)]
    store_latency_us: u64,
    /// Use full TPC-C cardinalities instead of the reduced population.
    #[arg(long)]
    full_scale: bool,
}

impl CommonArgs {
    fn driver_config(&self) -> Result<DriverConfig> {
        let config = match &self.config {
            Some(path) => DriverConfig::from_file(path)
                .with_context(|| format!("read config {}", path.display()))?,
            None => {
                let shards = u32::try_from(self.warehouses).context("--warehouses out of range")?;
                DriverConfig::default_for(1..=shards)
            }
        };
        let reset = config.reset || self.reset;
        Ok(config.reset(reset))
    }

    fn connector(&self, config: &DriverConfig) -> InMemoryConnector {
        let mut connector = InMemoryConnector::new();
        if let Some(dir) = &config.data_dir {
            connector = connector.data_dir(dir);
        }
        if self.store_latency_us > 0 {
            connector = connector.latency(Duration::from_micros(self.store_latency_us));
        }
        connector
    }

    fn scale(&self) -> ScaleParameters {
        if self.full_scale {
            ScaleParameters::standard(self.warehouses)
        } else {
            ScaleParameters::reduced(self.warehouses)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            common,
            clients,
            duration_secs,
            max_transactions,
        } => {
            let config = common.driver_config()?;
            let connector = common.connector(&config);
            let scale = common.scale();
            let (engine, loader) = tpcc_kv::connect(&config, &connector)
                .await
                .context("connect shards")?;
            let summary = load_dataset(&loader, scale, common.seed)
                .await
                .context("load dataset")?;
            println!("loaded {} rows", summary.total());

            let report = run_benchmark(
                engine,
                scale,
                BenchConfig {
                    clients,
                    duration: Duration::from_secs(duration_secs),
                    seed: common.seed,
                    max_transactions_per_client: max_transactions,
                    ..BenchConfig::default()
                },
            )
            .await
            .context("run benchmark")?;
            println!("{}", report);
        }
        Command::Load { common } => {
            let config = common.driver_config()?;
            let connector = common.connector(&config);
            let (_, loader) = tpcc_kv::connect(&config, &connector)
                .await
                .context("connect shards")?;
            let summary = load_dataset(&loader, common.scale(), common.seed)
                .await
                .context("load dataset")?;
            for (table, rows) in &summary.rows {
                println!("  {:<12} {}", table.name(), rows);
            }
            println!("loaded {} rows", summary.total());
        }
    }
    Ok(())
}
