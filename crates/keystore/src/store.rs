use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chain_eth::transaction;
use chain_eth::{Address, EthError, SignedTransaction, UnsignedTransaction};
use crypto_utils::kdf::KdfParams;
use crypto_utils::random::random_bytes_fixed;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::KeystoreError;
use crate::format::EncryptedKeystore;

/// A single password-protected account stored as one JSON file.
///
/// The file is only read when an operation needs it, so a `KeyStore` can be
/// constructed for a path that does not exist yet.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
    kdf_params: KdfParams,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kdf_params: KdfParams::default(),
        }
    }

    /// Sets the Argon2id costs used when creating a wallet. Decryption
    /// always uses the costs stored in the file.
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf_params = params;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load_encrypted(&self) -> Result<EncryptedKeystore, KeystoreError> {
        let json = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => KeystoreError::NotFound(self.path.clone()),
            _ => KeystoreError::Io(e),
        })?;
        EncryptedKeystore::from_json(&json)
    }

    /// The stored account address. Does not need the password.
    pub fn address(&self) -> Result<Address, KeystoreError> {
        self.load_encrypted()?.address()
    }

    /// Encrypts a private key under `password` and writes the keystore file.
    ///
    /// `private_key_hex` may carry a `0x` prefix. If it has fewer than 64
    /// digits (an empty string included) a fresh random key is generated
    /// instead. An existing file is only replaced when `overwrite` is set.
    pub fn create_wallet(
        &self,
        private_key_hex: &str,
        password: &SecretString,
        overwrite: bool,
    ) -> Result<Address, KeystoreError> {
        if !overwrite && self.path.exists() {
            warn!(path = %self.path.display(), "refusing to overwrite existing keystore");
            return Err(KeystoreError::AlreadyExists(self.path.clone()));
        }

        let (private_key, address) = resolve_private_key(private_key_hex)?;

        let keystore = EncryptedKeystore::encrypt(
            &private_key,
            &address,
            password.expose_secret().as_bytes(),
            &self.kdf_params,
        )?;
        drop(private_key);

        write_atomic(&self.path, keystore.to_json()?.as_bytes())?;

        info!(%address, path = %self.path.display(), "wallet created");
        Ok(address)
    }

    pub fn decrypt_key(&self, password: &SecretString) -> Result<Zeroizing<[u8; 32]>, KeystoreError> {
        let keystore = self.load_encrypted()?;
        keystore.decrypt(password.expose_secret().as_bytes())
    }

    /// Signs `tx` with the stored key. The transaction is not broadcast.
    pub fn sign_transaction(
        &self,
        password: &SecretString,
        tx: &UnsignedTransaction,
    ) -> Result<SignedTransaction, KeystoreError> {
        let keystore = self.load_encrypted()?;
        let expected = keystore.address()?;
        let private_key = keystore.decrypt(password.expose_secret().as_bytes())?;

        let actual = Address::from_private_key(&private_key)
            .map_err(|e| KeystoreError::Decryption(e.to_string()))?;
        if actual != expected {
            return Err(KeystoreError::Decryption(format!(
                "decrypted key controls {actual}, keystore names {expected}"
            )));
        }

        let signed = transaction::sign_transaction(tx, &private_key)?;
        debug!(from = %expected, tx_hash = %signed.tx_hash, "transaction signed");
        Ok(signed)
    }
}

/// Hex digits in a full private key.
const KEY_HEX_LEN: usize = 64;

/// Decodes the caller's key, or draws a random one when the input is shorter
/// than a full key. Only full-length input is decoded, so short input is never
/// an error whatever its characters.
fn resolve_private_key(hex_input: &str) -> Result<(Zeroizing<[u8; 32]>, Address), KeystoreError> {
    let digits = hex_input.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);

    if digits.len() < KEY_HEX_LEN {
        return Ok(random_private_key());
    }
    if digits.len() > KEY_HEX_LEN {
        return Err(KeystoreError::InvalidPrivateKey(format!(
            "expected {KEY_HEX_LEN} hex digits, got {}",
            digits.len()
        )));
    }

    let mut key = Zeroizing::new([0u8; 32]);
    hex::decode_to_slice(digits, key.as_mut_slice())
        .map_err(|e| KeystoreError::InvalidPrivateKey(e.to_string()))?;

    let address = Address::from_private_key(&key).map_err(|e| match e {
        EthError::InvalidPrivateKey(msg) => KeystoreError::InvalidPrivateKey(msg),
        other => other.into(),
    })?;
    Ok((key, address))
}

fn random_private_key() -> (Zeroizing<[u8; 32]>, Address) {
    debug!("no full private key supplied, generating one");
    loop {
        let key = Zeroizing::new(random_bytes_fixed::<32>());
        // Zero or above the curve order; vanishingly rare.
        if let Ok(address) = Address::from_private_key(&key) {
            return (key, address);
        }
    }
}

/// Writes `contents` to a sibling temp file, then renames it over `path`, so
/// a crash never leaves a half-written keystore behind.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), KeystoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("keystore path has no file name: {}", path.display()),
        )
    })?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let result = options.open(&tmp_path).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = result.and_then(|()| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use chain_eth::U256;

    const FAST: KdfParams = KdfParams {
        m_cost: 256,
        t_cost: 1,
        p_cost: 1,
    };

    const KEY_ONE: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
    const KEY_ONE_ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

    fn password(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn store_in(dir: &tempfile::TempDir) -> KeyStore {
        KeyStore::new(dir.path().join("wallet.json")).with_kdf_params(FAST)
    }

    #[test]
    fn test_create_with_known_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(!store.exists());
        let address = store.create_wallet(KEY_ONE, &password("pw"), false).unwrap();

        assert!(store.exists());
        assert_eq!(address.to_string(), KEY_ONE_ADDRESS);
        assert_eq!(store.address().unwrap(), address);
    }

    #[test]
    fn test_key_without_prefix_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let address = store
            .create_wallet(&KEY_ONE[2..], &password("pw"), false)
            .unwrap();
        assert_eq!(address.to_string(), KEY_ONE_ADDRESS);
    }

    #[test]
    fn test_empty_key_generates_random_wallets() {
        let dir = tempfile::tempdir().unwrap();
        let a = KeyStore::new(dir.path().join("a.json")).with_kdf_params(FAST);
        let b = KeyStore::new(dir.path().join("b.json")).with_kdf_params(FAST);

        let addr_a = a.create_wallet("", &password("pw"), false).unwrap();
        let addr_b = b.create_wallet("", &password("pw"), false).unwrap();

        assert_ne!(addr_a, addr_b);
        assert_eq!(a.address().unwrap(), addr_a);
    }

    #[test]
    fn test_random_keys_do_not_repeat() {
        let mut keys = HashSet::new();
        let mut addresses = HashSet::new();

        for _ in 0..64 {
            let (key, address) = resolve_private_key("").unwrap();
            assert!(keys.insert(*key));
            assert!(addresses.insert(address));
        }
    }

    #[test]
    fn test_short_key_generates_random_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        for short in ["0xabcd", "abc", "0x1", "short pw"] {
            let address = store.create_wallet(short, &password("pw"), true).unwrap();
            let key = store.decrypt_key(&password("pw")).unwrap();

            assert_eq!(Address::from_private_key(&key).unwrap(), address, "input {short:?}");
            assert_eq!(store.address().unwrap(), address);
        }
    }

    #[test]
    fn test_oversized_or_invalid_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let too_long = format!("{}00", &KEY_ONE[2..]);
        assert!(matches!(
            store.create_wallet(&too_long, &password("pw"), false),
            Err(KeystoreError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            store.create_wallet(&"zz".repeat(32), &password("pw"), false),
            Err(KeystoreError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            store.create_wallet(&"00".repeat(32), &password("pw"), false),
            Err(KeystoreError::InvalidPrivateKey(_))
        ));
        assert!(!store.exists());
    }

    #[test]
    fn test_decrypt_roundtrip_and_wrong_password() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.create_wallet(KEY_ONE, &password("secret"), false).unwrap();

        let key = store.decrypt_key(&password("secret")).unwrap();
        assert_eq!(hex::encode(*key), &KEY_ONE[2..]);

        assert!(matches!(
            store.decrypt_key(&password("wrong")),
            Err(KeystoreError::InvalidPassword)
        ));
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.create_wallet(KEY_ONE, &password("pw"), false).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let result = store.create_wallet("", &password("other"), false);

        assert!(matches!(result, Err(KeystoreError::AlreadyExists(_))));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_overwrite_replaces_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.create_wallet(KEY_ONE, &password("pw"), false).unwrap();

        let replaced = store.create_wallet("", &password("pw2"), true).unwrap();

        assert_ne!(replaced.to_string(), KEY_ONE_ADDRESS);
        assert_eq!(store.address().unwrap(), replaced);
        assert!(store.decrypt_key(&password("pw2")).is_ok());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(matches!(store.address(), Err(KeystoreError::NotFound(_))));
        assert!(matches!(
            store.decrypt_key(&password("pw")),
            Err(KeystoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_garbage_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ this is not a keystore").unwrap();

        assert!(store.exists());
        assert!(matches!(store.address(), Err(KeystoreError::Parse(_))));
    }

    #[test]
    fn test_creates_parent_directories_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("wallet.json");
        let store = KeyStore::new(&path).with_kdf_params(FAST);

        store.create_wallet(KEY_ONE, &password("pw"), false).unwrap();

        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("wallet.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_keystore_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.create_wallet(KEY_ONE, &password("pw"), false).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_never_contains_plain_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let key = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
        store.create_wallet(key, &password("pw"), false).unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert!(!contents.contains(key));
    }

    #[test]
    fn test_sign_transaction_recovers_to_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let address = store.create_wallet(KEY_ONE, &password("pw"), false).unwrap();

        let to: Address = "0x000000000000000000000000000000000000dEaD".parse().unwrap();
        let tx = transaction::build_native_transfer(1, 0, 20_000_000_000, to, U256::from(1u64));
        let signed = store.sign_transaction(&password("pw"), &tx).unwrap();

        assert!(signed.signature.v == 37 || signed.signature.v == 38);
        assert_eq!(transaction::recover_signer(&tx, &signed.signature).unwrap(), address);
    }

    #[test]
    fn test_sign_with_wrong_password_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.create_wallet(KEY_ONE, &password("pw"), false).unwrap();

        let tx = transaction::build_native_transfer(1, 0, 1, Address::ZERO, U256::ZERO);
        assert!(matches!(
            store.sign_transaction(&password("nope"), &tx),
            Err(KeystoreError::InvalidPassword)
        ));
    }

    #[test]
    fn test_sign_rejects_mismatched_address() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.create_wallet(KEY_ONE, &password("pw"), false).unwrap();

        let mut keystore = store.load_encrypted().unwrap();
        keystore.address = "000000000000000000000000000000000000dead".into();
        fs::write(store.path(), keystore.to_json().unwrap()).unwrap();

        let tx = transaction::build_native_transfer(1, 0, 1, Address::ZERO, U256::ZERO);
        assert!(matches!(
            store.sign_transaction(&password("pw"), &tx),
            Err(KeystoreError::Decryption(_))
        ));
    }
}
