use alloy_primitives::U256;
use alloy_rlp::{Encodable, RlpEncodable};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

use crate::address::Address;
use crate::erc20;
use crate::error::EthError;

/// Gas limit for a plain native-coin transfer.
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Gas limit for an ERC-20 `transfer` call. Fixed, not estimated.
pub const TOKEN_TRANSFER_GAS: u64 = 70_000;

/// An unsigned legacy (pre-EIP-1559) transaction, signed with EIP-155
/// replay protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: u128,
    pub gas_limit: u64,
    /// Recipient for native transfers, token contract for token transfers.
    pub to: Address,
    /// Transfer value in wei. Zero for token transfers.
    pub value: U256,
    /// Calldata. Empty for native transfers.
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// ECDSA signature components as they appear in a legacy transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSignature {
    /// `chain_id * 2 + 35 + y_parity`.
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// RLP-encoded signed transaction bytes.
    pub raw_tx: Vec<u8>,
    /// Transaction hash as a 0x-prefixed hex string.
    pub tx_hash: String,
    pub signature: TxSignature,
}

/// Builds an unsigned native-coin transfer.
pub fn build_native_transfer(
    chain_id: u64,
    nonce: u64,
    gas_price: u128,
    to: Address,
    value_wei: U256,
) -> UnsignedTransaction {
    UnsignedTransaction {
        nonce,
        gas_price,
        gas_limit: NATIVE_TRANSFER_GAS,
        to,
        value: value_wei,
        data: Vec::new(),
        chain_id,
    }
}

/// Builds an unsigned ERC-20 transfer: a call to `token_contract` carrying
/// `transfer(recipient, amount)` calldata and no value.
pub fn build_token_transfer(
    chain_id: u64,
    nonce: u64,
    gas_price: u128,
    token_contract: Address,
    recipient: &Address,
    amount: U256,
) -> UnsignedTransaction {
    UnsignedTransaction {
        nonce,
        gas_price,
        gas_limit: TOKEN_TRANSFER_GAS,
        to: token_contract,
        value: U256::ZERO,
        data: erc20::encode_transfer(recipient, amount),
        chain_id,
    }
}

/// Encodes the EIP-155 signing payload:
/// `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])`.
pub fn encode_signing_payload(tx: &UnsignedTransaction) -> Vec<u8> {
    let fields = SigningFields {
        nonce: tx.nonce,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        to: RlpAddress(*tx.to.as_bytes()),
        value: RlpU256(tx.value.to_be_bytes::<32>()),
        data: RlpBytes(tx.data.clone()),
        chain_id: tx.chain_id,
        empty_r: 0,
        empty_s: 0,
    };

    let mut out = Vec::new();
    fields.encode(&mut out);
    out
}

/// Keccak-256 of the signing payload.
pub fn signing_hash(tx: &UnsignedTransaction) -> [u8; 32] {
    Keccak256::digest(encode_signing_payload(tx)).into()
}

/// Signs `tx` with a secp256k1 private key.
///
/// The signature is deterministic (RFC 6979) and low-S. The transaction is
/// only signed; nothing is sent anywhere.
pub fn sign_transaction(
    tx: &UnsignedTransaction,
    private_key: &[u8; 32],
) -> Result<SignedTransaction, EthError> {
    let msg_hash = signing_hash(tx);

    let mut key_bytes = *private_key;
    let signing_key = SigningKey::from_bytes((&key_bytes).into())
        .map_err(|e| EthError::InvalidPrivateKey(e.to_string()));
    key_bytes.zeroize();
    let signing_key = signing_key?;

    let (signature, recovery_id): (Signature, RecoveryId) = signing_key
        .sign_prehash(&msg_hash)
        .map_err(|e| EthError::SigningError(e.to_string()))?;

    let v = tx
        .chain_id
        .checked_mul(2)
        .and_then(|n| n.checked_add(35 + u64::from(recovery_id.is_y_odd())))
        .ok_or_else(|| EthError::SigningError(format!("chain id {} too large", tx.chain_id)))?;

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&signature.r().to_bytes());
    s.copy_from_slice(&signature.s().to_bytes());

    let signed_fields = SignedFields {
        nonce: tx.nonce,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        to: RlpAddress(*tx.to.as_bytes()),
        value: RlpU256(tx.value.to_be_bytes::<32>()),
        data: RlpBytes(tx.data.clone()),
        v,
        r: RlpU256(r),
        s: RlpU256(s),
    };

    let mut raw_tx = Vec::new();
    signed_fields.encode(&mut raw_tx);

    let tx_hash = format!("0x{}", hex::encode(Keccak256::digest(&raw_tx)));

    Ok(SignedTransaction {
        raw_tx,
        tx_hash,
        signature: TxSignature { v, r, s },
    })
}

/// Recovers the address that produced `signature` over `tx`.
pub fn recover_signer(
    tx: &UnsignedTransaction,
    signature: &TxSignature,
) -> Result<Address, EthError> {
    let parity = signature
        .v
        .checked_sub(tx.chain_id.saturating_mul(2).saturating_add(35))
        .filter(|p| *p <= 1)
        .ok_or_else(|| {
            EthError::SigningError(format!(
                "v = {} does not match chain id {}",
                signature.v, tx.chain_id
            ))
        })?;

    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&signature.r);
    rs[32..].copy_from_slice(&signature.s);
    let sig = Signature::from_slice(&rs).map_err(|e| EthError::SigningError(e.to_string()))?;

    let recovery_id = RecoveryId::from_byte(parity as u8)
        .ok_or_else(|| EthError::SigningError("invalid recovery id".into()))?;

    let key = VerifyingKey::recover_from_prehash(&signing_hash(tx), &sig, recovery_id)
        .map_err(|e| EthError::SigningError(e.to_string()))?;

    let point = key.to_encoded_point(false);
    let mut uncompressed = [0u8; 65];
    uncompressed.copy_from_slice(point.as_bytes());
    Address::from_uncompressed_pubkey(&uncompressed)
}

// ---------------------------------------------------------------------------
// RLP-encodable structures
// ---------------------------------------------------------------------------

#[derive(RlpEncodable)]
struct SigningFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    chain_id: u64,
    empty_r: u8,
    empty_s: u8,
}

#[derive(RlpEncodable)]
struct SignedFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: RlpU256,
    data: RlpBytes,
    v: u64,
    r: RlpU256,
    s: RlpU256,
}

/// A 20-byte address encoded as an RLP string.
#[derive(Debug, Clone)]
struct RlpAddress([u8; 20]);

impl Encodable for RlpAddress {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

/// A 256-bit integer encoded as minimal big-endian bytes (leading zeros
/// stripped), the standard RLP integer encoding.
#[derive(Debug, Clone)]
struct RlpU256([u8; 32]);

impl RlpU256 {
    fn trimmed(&self) -> &[u8] {
        let start = self.0.iter().position(|&b| b != 0).unwrap_or(32);
        &self.0[start..]
    }
}

impl Encodable for RlpU256 {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.trimmed().encode(out);
    }

    fn length(&self) -> usize {
        self.trimmed().length()
    }
}

/// Calldata encoded as an RLP byte string rather than a list of bytes.
#[derive(Debug, Clone)]
struct RlpBytes(Vec<u8>);

impl Encodable for RlpBytes {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}
