mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::TransferArgs;
use config::Config;
use tracing_subscriber::{fmt, EnvFilter};
use wallet_keystore::{KeyStore, SecretString};

#[derive(Parser, Debug)]
#[command(
    name = "tartarus",
    version,
    about = "EVM balance queries and transfers from an encrypted keystore"
)]
struct Cli {
    /// Path to the TOML configuration file [default: tartarus.toml if present]
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint of the node.
    #[arg(long, global = true, env = "TARTARUS_RPC_URL", value_name = "URL")]
    rpc_url: Option<String>,

    /// Keystore file to create or read.
    #[arg(long, global = true, value_name = "PATH")]
    keystore: Option<PathBuf>,

    /// Keystore password.
    #[arg(
        long,
        global = true,
        env = "TARTARUS_PASSWORD",
        hide_env_values = true,
        value_name = "PASSWORD"
    )]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encrypt a private key (or a freshly generated one) into the keystore.
    CreateWallet {
        /// Hex private key; a random key is generated when omitted.
        #[arg(long, value_name = "HEX")]
        private_key: Option<String>,

        /// Replace an existing keystore file.
        #[arg(long)]
        overwrite: bool,
    },
    /// Print the keystore address.
    Address,
    /// Print the balance of an asset.
    Balance {
        /// Token contract, or the zero address for the native coin.
        #[arg(long, value_name = "ADDR")]
        asset: String,

        /// Account to query [default: the keystore address]
        #[arg(long, value_name = "ADDR")]
        owner: Option<String>,
    },
    /// Build a transfer from the keystore account. Nothing is broadcast.
    Transfer {
        /// Token contract, or the zero address for the native coin.
        #[arg(long, value_name = "ADDR")]
        asset: String,

        #[arg(long, value_name = "ADDR")]
        to: String,

        /// Amount in display units, e.g. 1.5
        #[arg(long, value_name = "DECIMAL")]
        amount: String,

        /// Sign with the keystore key and print the raw transaction.
        #[arg(long)]
        sign: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.rpc_url, cli.keystore);
    let store = KeyStore::new(&config.keystore).with_kdf_params(config.kdf.into());
    let password = cli.password.map(SecretString::from);

    let output = match cli.command {
        Command::CreateWallet {
            private_key,
            overwrite,
        } => commands::create_wallet(
            &store,
            private_key.as_deref(),
            require_password(password.as_ref())?,
            overwrite,
        )?,
        Command::Address => commands::address(&store)?,
        Command::Balance { asset, owner } => {
            let owner = match owner {
                Some(owner) => owner.parse().context("invalid --owner")?,
                None => store
                    .address()
                    .context("no --owner given and the keystore could not be read")?,
            };
            commands::balance(commands::http_client(&config.rpc_url)?, owner, &asset)?
        }
        Command::Transfer {
            asset,
            to,
            amount,
            sign,
        } => {
            let signer = if sign {
                Some(require_password(password.as_ref())?)
            } else {
                None
            };
            let args = TransferArgs {
                asset: &asset,
                to: &to,
                amount: &amount,
            };
            commands::transfer(commands::http_client(&config.rpc_url)?, &store, args, signer)?
        }
    };

    println!("{output}");
    Ok(())
}

fn require_password(password: Option<&SecretString>) -> Result<&SecretString> {
    password.context("a password is required: pass --password or set TARTARUS_PASSWORD")
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
