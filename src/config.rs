use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Width of every hide-encoded ephemeral key, and the offset of the first
/// entry table.
pub const DEFAULT_KEY_LEN: usize = 32;
/// Width of one encrypted entry slot: payload offset plus symmetric key.
pub const DEFAULT_DATA_LEN: usize = 24;
/// Consecutive slots probed in each entry table.
pub const DEFAULT_HASH_ATTEMPTS: usize = 5;

/// Header layout constants shared by PURB writers and readers.
///
/// Both sides must use the same values; they change header size against
/// decryption time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurbParams {
    pub key_len: usize,
    pub data_len: usize,
    pub hash_attempts: usize,
}

impl Default for PurbParams {
    fn default() -> Self {
        Self {
            key_len: DEFAULT_KEY_LEN,
            data_len: DEFAULT_DATA_LEN,
            hash_attempts: DEFAULT_HASH_ATTEMPTS,
        }
    }
}

impl PurbParams {
    /// Defaults overridden by `ZK_MIX_PURB_KEY_LEN`, `ZK_MIX_PURB_DATA_LEN`
    /// and `ZK_MIX_PURB_HASH_ATTEMPTS` when set.
    pub fn from_env() -> Result<Self> {
        let mut params = Self::default();
        if let Some(value) = env_usize("ZK_MIX_PURB_KEY_LEN")? {
            params.key_len = value;
        }
        if let Some(value) = env_usize("ZK_MIX_PURB_DATA_LEN")? {
            params.data_len = value;
        }
        if let Some(value) = env_usize("ZK_MIX_PURB_HASH_ATTEMPTS")? {
            params.hash_attempts = value;
        }
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_len == 0 || self.data_len == 0 {
            return Err(anyhow!("key_len and data_len must be positive"));
        }
        if self.hash_attempts == 0 {
            return Err(anyhow!("hash_attempts must be at least 1"));
        }
        Ok(())
    }
}

fn env_usize(var: &str) -> Result<Option<usize>> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("environment variable {var} is not a number: {raw:?}")),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(anyhow!("environment variable {var}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let params: PurbParams = serde_json::from_str(r#"{"hash_attempts": 3}"#).unwrap();
        assert_eq!(
            params,
            PurbParams {
                hash_attempts: 3,
                ..PurbParams::default()
            }
        );
        crate::test_utils::serde::assert_round_trip_json(&params);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let params = PurbParams {
            hash_attempts: 0,
            ..PurbParams::default()
        };
        assert!(params.validate().is_err());
        assert!(PurbParams::default().validate().is_ok());
    }
}
