//! Cross-crate tests exercising the full pipeline:
//! create wallet -> describe asset -> build transfer -> sign -> recover.

use std::sync::Arc;

use chain_eth::erc20::{self, DECIMALS_SELECTOR, TRANSFER_SELECTOR};
use chain_eth::transaction::{recover_signer, NATIVE_TRANSFER_GAS, TOKEN_TRANSFER_GAS};
use chain_eth::units::parse_amount;
use chain_eth::{Address, AssetDescriptor, ChainClient, EthError, U256};
use wallet_keystore::{KdfParams, KeyStore, KeystoreError, SecretString};

const FAST: KdfParams = KdfParams {
    m_cost: 256,
    t_cost: 1,
    p_cost: 1,
};

const RECEIVER: &str = "0x000000000000000000000000000000000000dEaD";
const TOKEN: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
const NATIVE: &str = "0x0000000000000000000000000000000000000000";

/// A chain at nonce 3 on chain id 5 where every token has 6 decimals.
struct FixedChain;

impl ChainClient for FixedChain {
    fn balance(&self, _address: &Address) -> Result<U256, EthError> {
        Ok(U256::from(2_000_000_000_000_000_000u128))
    }

    fn transaction_count(&self, _address: &Address) -> Result<u64, EthError> {
        Ok(3)
    }

    fn gas_price(&self) -> Result<u128, EthError> {
        Ok(1_000_000_000)
    }

    fn chain_id(&self) -> Result<u64, EthError> {
        Ok(5)
    }

    fn call(&self, _contract: &Address, data: &[u8]) -> Result<Vec<u8>, EthError> {
        if data.starts_with(&DECIMALS_SELECTOR) {
            Ok(U256::from(6u8).to_be_bytes::<32>().to_vec())
        } else {
            Err(EthError::ContractCall("execution reverted".into()))
        }
    }
}

fn password(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

fn new_wallet(dir: &tempfile::TempDir) -> (KeyStore, Address) {
    let store = KeyStore::new(dir.path().join("wallet.json")).with_kdf_params(FAST);
    let address = store.create_wallet("", &password("hunter2"), false).unwrap();
    (store, address)
}

fn descriptor(owner: &Address, asset: &str) -> AssetDescriptor {
    AssetDescriptor::new(
        "http://127.0.0.1:1",
        &owner.to_string(),
        asset,
        Some(Arc::new(FixedChain)),
    )
    .unwrap()
}

#[test]
fn native_transfer_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let (store, owner) = new_wallet(&dir);
    let receiver: Address = RECEIVER.parse().unwrap();

    let asset = descriptor(&store.address().unwrap(), NATIVE);
    assert_eq!(asset.balance().unwrap(), parse_amount("2").unwrap());

    let tx = asset
        .create_transfer_transaction(&receiver, &parse_amount("0.5").unwrap())
        .unwrap();
    assert_eq!(tx.to, receiver);
    assert_eq!(tx.value, U256::from(500_000_000_000_000_000u128));
    assert_eq!(tx.gas_limit, NATIVE_TRANSFER_GAS);
    assert_eq!(tx.nonce, 3);
    assert_eq!(tx.chain_id, 5);

    let signed = store.sign_transaction(&password("hunter2"), &tx).unwrap();

    // chain id 5 -> v in {45, 46}
    assert!(signed.signature.v == 45 || signed.signature.v == 46);
    assert_eq!(recover_signer(&tx, &signed.signature).unwrap(), owner);
    assert!(signed.tx_hash.starts_with("0x"));
    assert_eq!(signed.tx_hash.len(), 66);
}

#[test]
fn token_transfer_pipeline_pays_receiver() {
    let dir = tempfile::tempdir().unwrap();
    let (store, owner) = new_wallet(&dir);
    let receiver: Address = RECEIVER.parse().unwrap();
    let token: Address = TOKEN.parse().unwrap();

    let asset = descriptor(&owner, TOKEN);
    let tx = asset
        .create_transfer_transaction(&receiver, &parse_amount("1.25").unwrap())
        .unwrap();

    assert_eq!(tx.to, token);
    assert_eq!(tx.value, U256::ZERO);
    assert_eq!(tx.gas_limit, TOKEN_TRANSFER_GAS);
    assert_eq!(&tx.data[..4], &TRANSFER_SELECTOR);
    assert_eq!(tx.data, erc20::encode_transfer(&receiver, U256::from(1_250_000u64)));

    let signed = store.sign_transaction(&password("hunter2"), &tx).unwrap();
    assert_eq!(recover_signer(&tx, &signed.signature).unwrap(), owner);
}

#[test]
fn wrong_password_stops_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let (store, owner) = new_wallet(&dir);

    let tx = descriptor(&owner, NATIVE)
        .create_transfer_transaction(&RECEIVER.parse().unwrap(), &parse_amount("1").unwrap())
        .unwrap();

    assert!(matches!(
        store.sign_transaction(&password("hunter3"), &tx),
        Err(KeystoreError::InvalidPassword)
    ));
}

#[test]
fn signing_is_deterministic_for_same_key() {
    let dir = tempfile::tempdir().unwrap();
    let (store, owner) = new_wallet(&dir);

    let tx = descriptor(&owner, NATIVE)
        .create_transfer_transaction(&RECEIVER.parse().unwrap(), &parse_amount("0.1").unwrap())
        .unwrap();

    let a = store.sign_transaction(&password("hunter2"), &tx).unwrap();
    let b = store.sign_transaction(&password("hunter2"), &tx).unwrap();
    assert_eq!(a.raw_tx, b.raw_tx);
    assert_eq!(a.tx_hash, b.tx_hash);
}
