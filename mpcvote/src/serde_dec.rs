//! Serde adapters for decimal-string-encoded integers.
//!
//! The only cross-party exchange medium is string-valued ledger storage, so
//! every numeric protocol field travels as a decimal string rather than
//! binary. Use with `#[serde(with = "crate::serde_dec::uint")]` (or `::int`
//! for signed values).

/// Decimal-string encoding for `BigUint` fields.
pub mod uint {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BigUint::from_str(&s).map_err(de::Error::custom)
    }
}

/// Decimal-string encoding for `BigInt` fields.
///
/// Proof responses are computed over the integers without modular reduction
/// and can be negative, so these carry an optional leading minus sign.
pub mod int {
    use num_bigint::BigInt;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigInt, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BigInt::from_str(&s).map_err(de::Error::custom)
    }
}
