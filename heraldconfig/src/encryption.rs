//! Chiffrement des secrets stockés dans la configuration
//!
//! Le client secret Spotify et le refresh token sont écrits dans
//! `config.yaml` sous la forme `encrypted:BASE64(nonce || ciphertext)`.
//! La clé AES-256-GCM est dérivée de l'identifiant de la machine : un fichier
//! copié sur une autre machine ne se déchiffre pas.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result, anyhow};
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

const ENCRYPTED_PREFIX: &str = "encrypted:";
const NONCE_LEN: usize = 12;

const KEY_DOMAIN: &[u8] = b"herald-config-encryption-v1";
const NONCE_DOMAIN: &[u8] = b"herald-nonce-v1";

#[cfg(target_os = "linux")]
const MACHINE_ID_FILES: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(target_os = "linux")]
fn machine_id() -> Result<String> {
    MACHINE_ID_FILES
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|id| id.trim().to_string())
        .find(|id| !id.is_empty())
        .ok_or_else(|| anyhow!("No machine-id found in {:?}", MACHINE_ID_FILES))
}

#[cfg(target_os = "macos")]
fn machine_id() -> Result<String> {
    let output = std::process::Command::new("ioreg")
        .args(["-d2", "-c", "IOPlatformExpertDevice"])
        .output()
        .context("Cannot run ioreg")?;

    // "IOPlatformUUID" = "XXXXXXXX-XXXX-..."
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find(|line| line.contains("IOPlatformUUID"))
        .and_then(|line| line.split('"').nth(3))
        .map(str::to_string)
        .ok_or_else(|| anyhow!("IOPlatformUUID missing from ioreg output"))
}

#[cfg(target_os = "windows")]
fn machine_id() -> Result<String> {
    let output = std::process::Command::new("wmic")
        .args(["csproduct", "get", "UUID"])
        .output()
        .context("Cannot run wmic")?;

    // En-tête "UUID" puis la valeur
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .skip(1)
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("UUID missing from wmic output"))
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn machine_id() -> Result<String> {
    Err(anyhow!("No machine identifier on this platform"))
}

/// Cipher keyed on one machine identity.
struct SecretBox {
    cipher: Aes256Gcm,
}

impl SecretBox {
    fn for_this_machine() -> Result<Self> {
        Self::with_identity(&machine_id()?)
    }

    fn with_identity(identity: &str) -> Result<Self> {
        let key = sha256(&[identity.as_bytes(), KEY_DOMAIN]);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| anyhow!("Invalid key: {}", e))?;
        Ok(Self { cipher })
    }

    /// Le nonce dépend du secret : chiffrer deux fois la même valeur donne
    /// le même texte, la configuration n'est pas réécrite pour rien.
    fn seal(&self, secret: &str) -> Result<String> {
        let digest = sha256(&[secret.as_bytes(), NONCE_DOMAIN]);
        let nonce = Nonce::from_slice(&digest[..NONCE_LEN]);

        let mut sealed = nonce.to_vec();
        sealed.extend(
            self.cipher
                .encrypt(nonce, secret.as_bytes())
                .map_err(|e| anyhow!("Encryption failed: {}", e))?,
        );

        Ok(format!("{}{}", ENCRYPTED_PREFIX, STANDARD.encode(sealed)))
    }

    fn open(&self, value: &str) -> Result<String> {
        let payload = value
            .strip_prefix(ENCRYPTED_PREFIX)
            .ok_or_else(|| anyhow!("Value is not marked {}", ENCRYPTED_PREFIX))?;
        let sealed = STANDARD.decode(payload).context("Encrypted value is not base64")?;

        if sealed.len() < NONCE_LEN {
            return Err(anyhow!("Encrypted value is truncated"));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow!("Cannot decrypt secret (other machine or corrupted value)"))?;
        String::from_utf8(plain).context("Decrypted secret is not UTF-8")
    }
}

/// Encrypts `secret` with the key of this machine.
pub fn encrypt_secret(secret: &str) -> Result<String> {
    SecretBox::for_this_machine()?.seal(secret)
}

/// Reverses [`encrypt_secret`]; fails on another machine.
pub fn decrypt_secret(encrypted: &str) -> Result<String> {
    SecretBox::for_this_machine()?.open(encrypted)
}

pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Clear text of a configuration value, encrypted or not.
pub fn get_secret(value: &str) -> Result<String> {
    if is_encrypted(value) {
        decrypt_secret(value)
    } else {
        Ok(value.to_string())
    }
}
