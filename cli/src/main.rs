mod hashing;
mod wallet;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shade_config::ShadeConfig;
use shade_privacy::{Address, Commitment, Element};

#[derive(Parser, Debug)]
#[command(name = "shade")]
#[command(about = "Shielded deposits, withdrawals and swaps")]
struct Cli {
    /// Config file (defaults to SHADE_CONFIG, ./shade.toml, ~/.shade/shade.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Compute H(amount, blinding)
    Commitment {
        #[arg(long)]
        amount: u128,
        /// Blinding factor (0x hex or decimal)
        #[arg(long)]
        blinding: Element,
    },

    /// Compute H(commitment, blinding)
    Nullifier {
        #[arg(long)]
        commitment: Element,
        #[arg(long)]
        blinding: Element,
    },

    /// Recompute a Merkle root from a leaf and its authentication path
    MerkleRoot {
        #[arg(long)]
        leaf: Element,
        /// Sibling hashes, leaf level first
        #[arg(long = "sibling", required = true)]
        siblings: Vec<Element>,
        #[arg(long)]
        index: u64,
    },

    /// Prove a deposit, record its secret and write a fresh backup
    Deposit {
        #[arg(long)]
        token: Address,
        #[arg(long)]
        amount: u128,
        #[arg(long, env = "SHADE_BACKUP_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Prove a withdrawal of a recorded commitment
    Withdraw {
        #[arg(long)]
        token: Address,
        #[arg(long)]
        amount: u128,
        #[arg(long)]
        commitment: Element,
        #[arg(long)]
        recipient: Address,
        #[arg(long = "sibling", required = true)]
        siblings: Vec<Element>,
        #[arg(long)]
        index: u64,
        /// Roots the ledger currently accepts, newest last
        #[arg(long = "trusted-root")]
        trusted_roots: Vec<Element>,
        #[arg(long, env = "SHADE_BACKUP_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Inspect the latest backup
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print a sample shade.toml
    Sample,
}

#[derive(Subcommand, Debug)]
enum SecretsAction {
    /// List recorded commitments (blinding factors are never printed)
    List {
        #[arg(long, env = "SHADE_BACKUP_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ShadeConfig::load_from(path)?,
        None => ShadeConfig::load()?,
    };

    match cli.command {
        Command::Config {
            action: ConfigAction::Sample,
        } => {
            print!("{}", ShadeConfig::generate_sample());
        }
        Command::Commitment { amount, blinding } => {
            println!("{}", hashing::commitment(&config, amount, blinding));
        }
        Command::Nullifier {
            commitment,
            blinding,
        } => {
            println!(
                "{}",
                hashing::nullifier(&config, Commitment(commitment), blinding)
            );
        }
        Command::MerkleRoot {
            leaf,
            siblings,
            index,
        } => {
            println!("{}", hashing::merkle_root(&config, leaf, siblings, index)?);
        }
        Command::Deposit {
            token,
            amount,
            password,
        } => {
            wallet::deposit(&config, token, amount, &password).await?;
        }
        Command::Withdraw {
            token,
            amount,
            commitment,
            recipient,
            siblings,
            index,
            trusted_roots,
            password,
        } => {
            let req = shade_wallet::WithdrawRequest {
                token,
                amount,
                commitment: Commitment(commitment),
                recipient,
                merkle_proof: siblings,
                leaf_index: index,
            };
            wallet::withdraw(&config, req, trusted_roots, &password).await?;
        }
        Command::Secrets {
            action: SecretsAction::List { password },
        } => {
            wallet::list_secrets(&config, &password).await?;
        }
    }

    Ok(())
}
