use std::sync::Arc;

use bigdecimal::BigDecimal;
use tracing::debug;

use crate::address::Address;
use crate::erc20;
use crate::error::EthError;
use crate::rpc::{ChainClient, HttpChainClient};
use crate::transaction::{self, UnsignedTransaction};
use crate::units::{self, NATIVE_DECIMALS};

/// Symbol reported for the chain's native coin.
pub const NATIVE_SYMBOL: &str = "ETH";

/// What an asset address refers to. Resolved once when a descriptor is
/// built; the all-zero address stands for the native coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Native,
    Token(Address),
}

impl AssetKind {
    pub fn from_address(address: Address) -> Self {
        if address.is_zero() {
            AssetKind::Native
        } else {
            AssetKind::Token(address)
        }
    }
}

/// One asset (native coin or ERC-20 token) as seen from one owner account.
pub struct AssetDescriptor {
    owner: Address,
    kind: AssetKind,
    client: Arc<dyn ChainClient>,
}

impl AssetDescriptor {
    /// Builds a descriptor from address strings.
    ///
    /// When `client` is `None`, an [`HttpChainClient`] for `endpoint` is
    /// created; pass a shared client to reuse one connection across
    /// descriptors.
    pub fn new(
        endpoint: &str,
        owner: &str,
        asset: &str,
        client: Option<Arc<dyn ChainClient>>,
    ) -> Result<Self, EthError> {
        let owner: Address = owner.parse()?;
        let asset: Address = asset.parse()?;

        let client = match client {
            Some(client) => client,
            None => Arc::new(HttpChainClient::new(endpoint)?),
        };

        Ok(Self::with_client(client, owner, asset))
    }

    pub fn with_client(client: Arc<dyn ChainClient>, owner: Address, asset: Address) -> Self {
        Self {
            owner,
            kind: AssetKind::from_address(asset),
            client,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Owner's balance in display units.
    pub fn balance(&self) -> Result<BigDecimal, EthError> {
        match self.kind {
            AssetKind::Native => {
                let wei = self.client.balance(&self.owner)?;
                Ok(units::to_display(wei, NATIVE_DECIMALS))
            }
            AssetKind::Token(contract) => {
                let raw = self.view(&contract, "balanceOf", &erc20::encode_balance_of(&self.owner))?;
                let base = erc20::decode_balance(&raw).map_err(|e| contract_error(&contract, e))?;
                Ok(units::to_display(base, self.decimals()?))
            }
        }
    }

    pub fn symbol(&self) -> Result<String, EthError> {
        match self.kind {
            AssetKind::Native => Ok(NATIVE_SYMBOL.to_string()),
            AssetKind::Token(contract) => {
                let raw = self.view(&contract, "symbol", &erc20::encode_symbol())?;
                erc20::decode_symbol(&raw).map_err(|e| contract_error(&contract, e))
            }
        }
    }

    pub fn decimals(&self) -> Result<u8, EthError> {
        match self.kind {
            AssetKind::Native => Ok(NATIVE_DECIMALS),
            AssetKind::Token(contract) => {
                let raw = self.view(&contract, "decimals", &erc20::encode_decimals())?;
                erc20::decode_decimals(&raw).map_err(|e| contract_error(&contract, e))
            }
        }
    }

    /// Builds an unsigned transfer of `amount` (display units) from the owner
    /// to `receiver`.
    ///
    /// Token transfers are calls to the token contract whose calldata names
    /// `receiver` as the `transfer` recipient.
    pub fn create_transfer_transaction(
        &self,
        receiver: &Address,
        amount: &BigDecimal,
    ) -> Result<UnsignedTransaction, EthError> {
        match self.kind {
            AssetKind::Native => {
                let value = units::to_base_units(amount, NATIVE_DECIMALS)?;
                let nonce = self.client.transaction_count(&self.owner)?;
                let gas_price = self.client.gas_price()?;
                let chain_id = self.client.chain_id()?;

                debug!(%receiver, %value, nonce, gas_price, chain_id, "built native transfer");
                Ok(transaction::build_native_transfer(
                    chain_id, nonce, gas_price, *receiver, value,
                ))
            }
            AssetKind::Token(contract) => {
                let base_amount = units::to_base_units(amount, self.decimals()?)?;
                let nonce = self.client.transaction_count(&self.owner)?;
                let gas_price = self.client.gas_price()?;
                let chain_id = self.client.chain_id()?;

                debug!(%contract, %receiver, %base_amount, nonce, gas_price, chain_id, "built token transfer");
                Ok(transaction::build_token_transfer(
                    chain_id,
                    nonce,
                    gas_price,
                    contract,
                    receiver,
                    base_amount,
                ))
            }
        }
    }

    fn view(&self, contract: &Address, function: &str, data: &[u8]) -> Result<Vec<u8>, EthError> {
        debug!(%contract, function, "contract view call");
        self.client.call(contract, data)
    }
}

/// Undecodable return data means the contract does not speak ERC-20.
fn contract_error(contract: &Address, err: EthError) -> EthError {
    match err {
        EthError::EncodingError(msg) => EthError::ContractCall(format!("{contract}: {msg}")),
        other => other,
    }
}
