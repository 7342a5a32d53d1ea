use std::fmt;
use std::path::Path;

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '|';
const MAC_HEX_LEN: usize = 64;
const SECRET_FILE: &str = "cookie_secret";

/// Server-side key for cookie MACs. Loaded once at startup, never logged.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Use the configured secret if there is one, otherwise the secret
    /// persisted under `data_dir`, creating it on first run.
    pub fn load_or_create(configured: Option<&str>, data_dir: &Path) -> anyhow::Result<Self> {
        if let Some(secret) = configured.filter(|s| !s.is_empty()) {
            tracing::info!("Using configured cookie signing secret");
            return Ok(Self::new(secret.as_bytes()));
        }

        let path = data_dir.join(SECRET_FILE);
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let secret = content.trim();
            if secret.is_empty() {
                anyhow::bail!("Cookie secret file {} is empty", path.display());
            }
            tracing::info!("Loaded cookie signing secret from {}", path.display());
            return Ok(Self::new(secret.as_bytes()));
        }

        let bytes: [u8; 32] = rand::thread_rng().gen();
        let secret = hex::encode(bytes);
        std::fs::create_dir_all(data_dir)?;
        std::fs::write(&path, &secret)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }
        tracing::info!("Generated new cookie signing secret at {}", path.display());
        Ok(Self::new(secret.into_bytes()))
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Signs values as `value|hex(hmac_sha256(secret, value))`.
///
/// This is integrity only: the value travels in the clear.
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    pub fn new(secret: &SigningSecret) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(&secret.0).expect("HMAC can take key of any size"),
        }
    }

    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        let tag = hex::encode(mac.finalize().into_bytes());
        format!("{value}{SEPARATOR}{tag}")
    }

    /// Returns the signed value, or `None` for anything malformed or forged.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (value, tag_hex) = token.rsplit_once(SEPARATOR)?;

        // Only the exact lowercase encoding produced by `sign` is accepted.
        if tag_hex.len() != MAC_HEX_LEN
            || !tag_hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }
        let tag = hex::decode(tag_hex).ok()?;

        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&tag).ok()?;

        Some(value.to_string())
    }
}

impl fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}
