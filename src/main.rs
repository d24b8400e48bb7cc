//! Ledger node CLI application
//!
//! A command-line interface for running and inspecting a ledger node.

use clap::{Parser, Subcommand};
use ledger_node::cli::{self, AppState, ParamOverrides};
use ledger_node::core::supply::{
    DEFAULT_BLOCK_TIME_SECS, DEFAULT_DECIMAL_PLACES, DEFAULT_SPLIT_INTERVAL,
    DEFAULT_STARTING_REWARD,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger-node")]
#[command(version)]
#[command(about = "A validating UTXO ledger node", long_about = None)]
struct Cli {
    /// Data directory for ledger storage
    #[arg(short, long, default_value = ".ledger_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ledger
    Init {
        /// Block reward in minor units
        #[arg(long)]
        reward: Option<u64>,

        /// Leading zero hex digits required of block hashes
        #[arg(long)]
        difficulty: Option<u32>,

        /// Minimum non-coinbase transactions per block
        #[arg(long)]
        tx_min: Option<usize>,

        /// Maximum non-coinbase transactions per block
        #[arg(long)]
        tx_max: Option<usize>,
    },

    /// Start the REST API server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Display ledger information
    Chain {
        /// Number of recent blocks to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// Show mempool status
    Mempool,

    /// Show unspent outputs of a public key
    Utxo {
        /// Public key (hex)
        pk: String,

        /// Include outputs of pending transactions
        #[arg(long)]
        pending: bool,
    },

    /// Show consensus parameters
    Params,

    /// Print a zero-valued record skeleton (block, tx, coinbase)
    Template { kind: String },

    /// Submit a transaction from a JSON file
    SubmitTx { file: PathBuf },

    /// Submit a solved block from a JSON file
    SubmitBlock { file: PathBuf },

    /// Generate a new key pair
    Keygen,

    /// Sign a transaction JSON file
    SignTx {
        /// Transaction file
        file: PathBuf,

        /// Private key (hex)
        #[arg(short, long)]
        key: String,

        /// Write the signed transaction here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Lay out the reward halving schedule
    Supply {
        #[arg(long, default_value_t = DEFAULT_DECIMAL_PLACES)]
        decimal_places: u32,

        /// Starting reward in whole coins
        #[arg(long, default_value_t = DEFAULT_STARTING_REWARD)]
        reward: u64,

        /// Blocks between reward splits
        #[arg(long, default_value_t = DEFAULT_SPLIT_INTERVAL)]
        split: u64,

        /// Average block time in seconds
        #[arg(long, default_value_t = DEFAULT_BLOCK_TIME_SECS)]
        block_time: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let data_dir = cli.data_dir;

    match cli.command {
        // Commands that don't need an open node
        Commands::Init {
            reward,
            difficulty,
            tx_min,
            tx_max,
        } => {
            let overrides = ParamOverrides {
                reward,
                difficulty,
                tx_minimum: tx_min,
                tx_maximum: tx_max,
            };
            cli::cmd_init(&data_dir, overrides)?;
        }
        Commands::Template { kind } => cli::cmd_template(&kind)?,
        Commands::Keygen => cli::cmd_keygen()?,
        Commands::SignTx { file, key, output } => {
            cli::cmd_sign_tx(&key, &file, output.as_deref())?
        }
        Commands::Supply {
            decimal_places,
            reward,
            split,
            block_time,
        } => cli::cmd_supply(decimal_places, reward, split, block_time)?,

        Commands::Serve { host, port } => {
            let state = AppState::new(data_dir)?;
            let mut api_config = state.config.api.clone();
            if let Some(host) = host {
                api_config.host = host;
            }
            if let Some(port) = port {
                api_config.port = port;
            }
            cli::cmd_serve(state, &api_config)?;
        }
        Commands::Chain { count } => cli::cmd_chain(&AppState::new(data_dir)?, count)?,
        Commands::Mempool => cli::cmd_mempool(&AppState::new(data_dir)?)?,
        Commands::Utxo { pk, pending } => cli::cmd_utxo(&AppState::new(data_dir)?, &pk, pending)?,
        Commands::Params => cli::cmd_params(&AppState::new(data_dir)?)?,
        Commands::SubmitTx { file } => cli::cmd_submit_tx(&AppState::new(data_dir)?, &file)?,
        Commands::SubmitBlock { file } => cli::cmd_submit_block(&AppState::new(data_dir)?, &file)?,
    }

    Ok(())
}
