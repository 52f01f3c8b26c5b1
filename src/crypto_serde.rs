//! Serde adapters that carry arkworks values as hex of their canonical
//! compressed encoding.

use anyhow::{anyhow, Result};
use ark_ec::CurveGroup;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::de::Error as DeError;
use serde::ser::Error as SerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonically serializes any arkworks type into a lowercase hex string with a `0x` prefix.
pub fn canonical_serialize_hex<T>(value: &T) -> Result<String>
where
    T: CanonicalSerialize,
{
    let mut buf = Vec::new();
    value
        .serialize_compressed(&mut buf)
        .map_err(|err| anyhow!("canonical serialize failed: {err}"))?;
    Ok(format!("0x{}", hex::encode(buf)))
}

/// Canonically deserializes a value from a hex string (accepts optional 0x prefix).
pub fn canonical_deserialize_hex<T>(value: &str) -> Result<T>
where
    T: CanonicalDeserialize,
{
    let bytes = decode_hex_bytes(value)?;
    T::deserialize_compressed(&mut &bytes[..])
        .map_err(|err| anyhow!("canonical deserialize failed: {err}"))
}

fn decode_hex_bytes(value: &str) -> Result<Vec<u8>> {
    let trimmed = value.trim();
    let without_prefix = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if without_prefix.is_empty() {
        return Err(anyhow!("hex string is empty"));
    }
    hex::decode(without_prefix).map_err(|err| anyhow!("invalid hex: {err}"))
}

/// Serde helpers for encoding curve points as 0x-prefixed hex strings.
pub mod curve {
    use super::*;

    pub fn serialize<C, S>(value: &C, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        C: CurveGroup + CanonicalSerialize,
        S: Serializer,
    {
        let hex = canonical_serialize_hex(value).map_err(SerError::custom)?;
        serializer.serialize_str(&hex)
    }

    pub fn deserialize<'de, C, D>(deserializer: D) -> std::result::Result<C, D::Error>
    where
        C: CurveGroup + CanonicalDeserialize,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        canonical_deserialize_hex(&s).map_err(DeError::custom)
    }
}

/// Serde helpers for scalar field elements as 0x-prefixed hex strings.
pub mod field {
    use super::*;

    pub fn serialize<F, S>(value: &F, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        F: CanonicalSerialize,
        S: Serializer,
    {
        let hex = canonical_serialize_hex(value).map_err(SerError::custom)?;
        serializer.serialize_str(&hex)
    }

    pub fn deserialize<'de, F, D>(deserializer: D) -> std::result::Result<F, D::Error>
    where
        F: CanonicalDeserialize,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        canonical_deserialize_hex(&s).map_err(DeError::custom)
    }
}
