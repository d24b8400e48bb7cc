//! CLI commands for the ledger node
//!
//! Implements all command handlers for the CLI interface. Every command
//! works on the local data directory through the same [`Node`] the HTTP
//! API serves.

use crate::api::{self, ApiState};
use crate::config::{ApiConfig, ConsensusParams, NodeConfig, CONFIG_FILE};
use crate::core::supply::{format_minor_units, SupplySchedule};
use crate::core::{Block, Transaction, UtxoLocation};
use crate::crypto::KeyPair;
use crate::node::Node;
use crate::storage::FileBackend;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Consensus values given on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamOverrides {
    pub reward: Option<u64>,
    pub difficulty: Option<u32>,
    pub tx_minimum: Option<usize>,
    pub tx_maximum: Option<usize>,
}

impl ParamOverrides {
    /// Apply the given values on top of `params`
    pub fn apply(&self, params: &mut ConsensusParams) {
        if let Some(reward) = self.reward {
            params.block_reward = reward;
        }
        if let Some(difficulty) = self.difficulty {
            params.difficulty = difficulty;
        }
        if let Some(min) = self.tx_minimum {
            params.tx_minimum = min;
        }
        if let Some(max) = self.tx_maximum {
            params.tx_maximum = max;
        }
    }
}

/// Application state
pub struct AppState {
    pub node: Arc<Node>,
    pub config: NodeConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the configuration from `data_dir` and open the node
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let mut config = NodeConfig::load(&data_dir.join(CONFIG_FILE))?;
        config.storage.data_dir = data_dir.clone();

        let backend = FileBackend::open(&data_dir)?;
        if !backend.exists() {
            println!("🆕 Creating new ledger in {:?}...", data_dir);
        }
        let node = Node::open(config.consensus, Arc::new(backend))?;

        Ok(Self {
            node: Arc::new(node),
            config,
            data_dir,
        })
    }
}

/// Initialize a new ledger
pub fn cmd_init(data_dir: &Path, overrides: ParamOverrides) -> CliResult<()> {
    let config_path = data_dir.join(CONFIG_FILE);
    if FileBackend::open(data_dir)?.exists() {
        println!("⚠️  Ledger already exists at {:?}", data_dir);
        return Ok(());
    }

    let mut config = NodeConfig::load(&config_path)?;
    overrides.apply(&mut config.consensus);
    config.consensus.validate()?;
    config.storage.data_dir = data_dir.to_path_buf();
    config.save(&config_path)?;

    let state = AppState::new(data_dir.to_path_buf())?;
    let params = state.node.get_parameters();
    let (_, genesis_hash) = state.node.tip();

    println!("✅ Ledger initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   💰 Block reward: {}", params.block_reward);
    println!("   🔧 Difficulty: {}", params.difficulty);
    println!(
        "   📦 Transactions per block: {}..={}",
        params.tx_minimum, params.tx_maximum
    );
    println!("   🧱 Genesis block hash: {}", genesis_hash);

    Ok(())
}

/// Run the REST API until interrupted
pub fn cmd_serve(state: AppState, api_config: &ApiConfig) -> CliResult<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let api_state = ApiState::new(state.node.clone());

    println!(
        "🚀 REST API server starting on http://{}:{}",
        api_config.host, api_config.port
    );
    rt.block_on(async {
        tokio::select! {
            result = api::serve(api_state, api_config) => result,
            _ = tokio::signal::ctrl_c() => {
                println!("\n🛑 Shutting down...");
                Ok(())
            }
        }
    })?;
    Ok(())
}

/// Display ledger information and the most recent blocks
pub fn cmd_chain(state: &AppState, count: usize) -> CliResult<()> {
    let status = state.node.status();

    println!("📊 Ledger Information");
    println!("   ├─ Height: {}", status.chain.height);
    println!("   ├─ Blocks: {}", status.chain.total_blocks);
    println!("   ├─ Transactions: {}", status.chain.total_transactions);
    println!("   ├─ Pending: {}", status.mempool.tx_count);
    println!("   └─ Latest hash: {}", status.chain.latest_hash);

    let chain = state.node.get_chain();
    if count > 0 {
        println!("\n📦 Recent Blocks");
        for block in chain.iter().rev().take(count) {
            println!(
                "   #{} | {} txs | nonce {} | {}",
                block.height,
                block.tx_count(),
                block.nonce,
                block.hash()?
            );
        }
    }

    Ok(())
}

/// Show mempool contents
pub fn cmd_mempool(state: &AppState) -> CliResult<()> {
    let pending = state.node.get_mempool();

    println!("📋 Mempool: {} pending transactions", pending.len());
    for tx in &pending {
        println!(
            "   {} | {} inputs | {} outputs | {} total",
            tx.tx_id,
            tx.inputs.len(),
            tx.outputs.len(),
            tx.total_output().unwrap_or(u64::MAX)
        );
    }

    Ok(())
}

/// Show unspent outputs of a public key
pub fn cmd_utxo(state: &AppState, pk_hex: &str, include_pending: bool) -> CliResult<()> {
    let pk = hex::decode(pk_hex)?;
    let utxos = state.node.get_utxo(&pk, include_pending);

    println!("💰 Unspent outputs of {}", pk_hex);
    for entry in &utxos.entries {
        match &entry.location {
            UtxoLocation::Confirmed(outpoint) => {
                println!("   {} | {}", outpoint, entry.value)
            }
            UtxoLocation::Pending {
                tx_id,
                output_index,
            } => println!("   pending {}:{} | {}", tx_id, output_index, entry.value),
        }
    }
    println!("   Total: {}", utxos.total);

    Ok(())
}

/// Print consensus parameters as JSON
pub fn cmd_params(state: &AppState) -> CliResult<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&state.node.get_parameters())?
    );
    Ok(())
}

/// Print a zero-valued record skeleton
pub fn cmd_template(kind: &str) -> CliResult<()> {
    let template = match kind {
        "block" => serde_json::to_string_pretty(&Block::template())?,
        "tx" => serde_json::to_string_pretty(&Transaction::template())?,
        "coinbase" => serde_json::to_string_pretty(&Transaction::coinbase_template())?,
        other => return Err(format!("unknown template {:?} (block, tx, coinbase)", other).into()),
    };
    println!("{}", template);
    Ok(())
}

/// Submit a transaction read from a JSON file
pub fn cmd_submit_tx(state: &AppState, path: &Path) -> CliResult<()> {
    let tx: Transaction = serde_json::from_slice(&fs::read(path)?)?;
    let tx_id = tx.tx_id.clone();

    match state.node.submit_transaction(tx) {
        Ok(()) => {
            println!("✅ Transaction {} accepted", tx_id);
            Ok(())
        }
        Err(e) => {
            println!("❌ Transaction {} rejected: {}", tx_id, e);
            Err(e.into())
        }
    }
}

/// Submit a solved block read from a JSON file
pub fn cmd_submit_block(state: &AppState, path: &Path) -> CliResult<()> {
    let block: Block = serde_json::from_slice(&fs::read(path)?)?;
    let height = block.height;
    let hash = block.hash()?;

    match state.node.submit_block(block) {
        Ok(()) => {
            println!("✅ Block {} committed", height);
            println!("   └─ Hash: {}", hash);
            Ok(())
        }
        Err(e) => {
            println!("❌ Block {} rejected: {}", height, e);
            Err(e.into())
        }
    }
}

/// Generate a key pair
pub fn cmd_keygen() -> CliResult<()> {
    let key_pair = KeyPair::generate();
    println!("🔑 New key pair");
    println!("   ├─ Private key: {}", key_pair.private_key_hex());
    println!("   └─ Public key:  {}", key_pair.public_key_hex());
    Ok(())
}

/// Sign a transaction file in place, or into `output`
pub fn cmd_sign_tx(private_key: &str, input: &Path, output: Option<&Path>) -> CliResult<()> {
    let key_pair = KeyPair::from_private_key_hex(private_key)?;
    let mut tx: Transaction = serde_json::from_slice(&fs::read(input)?)?;
    tx.sign(&key_pair)?;

    let target = output.unwrap_or(input);
    fs::write(target, serde_json::to_string_pretty(&tx)?)?;
    println!("✍️  Signed transaction {} written to {:?}", tx.tx_id, target);
    Ok(())
}

/// Lay out the supply schedule
pub fn cmd_supply(
    decimal_places: u32,
    starting_reward: u64,
    split_interval: u64,
    block_time_secs: u64,
) -> CliResult<()> {
    let schedule =
        SupplySchedule::simulate(decimal_places, starting_reward, split_interval, block_time_secs);

    for era in &schedule.eras {
        println!(
            "Split: {} | Reward: {} | Total Supply: {}",
            era.split,
            schedule.format_amount(era.reward),
            schedule.format_amount(era.total_supply)
        );
    }

    println!();
    println!("[Independent variables...]");
    println!(
        "Smallest denomination: {} | Starting reward: {} | Reward split every {} blocks",
        format_minor_units(1, decimal_places),
        starting_reward,
        split_interval
    );
    println!(
        "Each block takes about {} seconds, or {:.1} minutes to mine",
        block_time_secs,
        block_time_secs as f64 / 60.0
    );

    println!();
    println!("[Dependent variables...]");
    println!(
        "Total supply: {}",
        schedule.format_amount(schedule.total_supply())
    );
    println!("Splits until the reward reaches one minor unit: {}", schedule.splits());
    println!(
        "Whole supply mined in about {} seconds | {:.2} years",
        schedule.total_time_secs(),
        schedule.total_time_years()
    );
    println!("A split happens about every {:.2} days", schedule.days_per_split());

    Ok(())
}
