//! Subcommand implementations. Each returns the text to print on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use chain_eth::units::parse_amount;
use chain_eth::{Address, AssetDescriptor, ChainClient, HttpChainClient, UnsignedTransaction};
use serde_json::{json, Value};
use tracing::info;
use wallet_keystore::{KeyStore, SecretString};

pub type CommandResult = Result<String>;

pub fn create_wallet(
    store: &KeyStore,
    private_key: Option<&str>,
    password: &SecretString,
    overwrite: bool,
) -> CommandResult {
    let address = store
        .create_wallet(private_key.unwrap_or(""), password, overwrite)
        .with_context(|| format!("failed to create wallet at {}", store.path().display()))?;
    Ok(address.to_string())
}

pub fn address(store: &KeyStore) -> CommandResult {
    let address = store
        .address()
        .with_context(|| format!("failed to read {}", store.path().display()))?;
    Ok(address.to_string())
}

pub fn balance(client: Arc<dyn ChainClient>, owner: Address, asset: &str) -> CommandResult {
    let asset: Address = asset.parse().context("invalid --asset")?;
    let descriptor = AssetDescriptor::with_client(client, owner, asset);

    let amount = descriptor.balance().context("failed to fetch balance")?;
    let symbol = descriptor.symbol().context("failed to fetch symbol")?;
    Ok(format!("{} {}", amount.normalized(), symbol))
}

pub struct TransferArgs<'a> {
    pub asset: &'a str,
    pub to: &'a str,
    pub amount: &'a str,
}

/// Builds the transfer; signs it too when `signer` is given.
pub fn transfer(
    client: Arc<dyn ChainClient>,
    store: &KeyStore,
    args: TransferArgs<'_>,
    signer: Option<&SecretString>,
) -> CommandResult {
    let owner = store
        .address()
        .with_context(|| format!("failed to read {}", store.path().display()))?;
    let asset: Address = args.asset.parse().context("invalid --asset")?;
    let receiver: Address = args.to.parse().context("invalid --to")?;
    let amount = parse_amount(args.amount).context("invalid --amount")?;

    let descriptor = AssetDescriptor::with_client(client, owner, asset);
    let tx = descriptor
        .create_transfer_transaction(&receiver, &amount)
        .context("failed to build transfer")?;

    let Some(password) = signer else {
        return to_pretty(&unsigned_json(&owner, &tx));
    };

    let signed = store
        .sign_transaction(password, &tx)
        .context("failed to sign transfer")?;
    info!(tx_hash = %signed.tx_hash, "transfer signed, not broadcast");

    to_pretty(&json!({
        "raw": format!("0x{}", hex::encode(&signed.raw_tx)),
        "hash": signed.tx_hash,
    }))
}

pub fn http_client(rpc_url: &str) -> Result<Arc<dyn ChainClient>> {
    let client = HttpChainClient::new(rpc_url).context("invalid rpc url")?;
    Ok(Arc::new(client))
}

/// JSON-RPC style rendering of an unsigned transaction.
fn unsigned_json(from: &Address, tx: &UnsignedTransaction) -> Value {
    json!({
        "from": from.to_string(),
        "to": tx.to.to_string(),
        "nonce": format!("0x{:x}", tx.nonce),
        "gasPrice": format!("0x{:x}", tx.gas_price),
        "gas": format!("0x{:x}", tx.gas_limit),
        "value": format!("0x{:x}", tx.value),
        "data": format!("0x{}", hex::encode(&tx.data)),
        "chainId": format!("0x{:x}", tx.chain_id),
    })
}

fn to_pretty(value: &Value) -> CommandResult {
    serde_json::to_string_pretty(value).context("failed to render json")
}
