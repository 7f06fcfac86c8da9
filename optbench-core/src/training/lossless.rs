//! JSON encoding of float sequences that keeps NaN and infinities.
//!
//! Finite values are written as plain numbers. Non-finite values become the
//! strings `"NaN"`, `"inf"` and `"-inf"`, which `serde_json` would otherwise
//! turn into `null`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(f64),
    Str(String),
}

fn encode(value: f64) -> NumOrStr {
    if value.is_nan() {
        NumOrStr::Str("NaN".to_string())
    } else if value == f64::INFINITY {
        NumOrStr::Str("inf".to_string())
    } else if value == f64::NEG_INFINITY {
        NumOrStr::Str("-inf".to_string())
    } else {
        NumOrStr::Num(value)
    }
}

fn decode(value: NumOrStr) -> Result<f64, String> {
    match value {
        NumOrStr::Num(v) => Ok(v),
        NumOrStr::Str(s) => match s.as_str() {
            "NaN" | "nan" => Ok(f64::NAN),
            "inf" | "Infinity" => Ok(f64::INFINITY),
            "-inf" | "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse::<f64>()
                .map_err(|e| format!("invalid float '{other}': {e}")),
        },
    }
}

fn encode_all(values: &[f64]) -> Vec<NumOrStr> {
    values.iter().copied().map(encode).collect()
}

fn decode_all(values: Vec<NumOrStr>) -> Result<Vec<f64>, String> {
    values.into_iter().map(decode).collect()
}

/// A single scalar.
pub fn serialize_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    encode(*value).serialize(serializer)
}

/// For `Vec<f64>` fields: `#[serde(with = "lossless::seq")]`.
pub mod seq {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        encode_all(values).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        decode_all(Vec::<NumOrStr>::deserialize(deserializer)?).map_err(D::Error::custom)
    }
}

/// For `Option<Vec<f64>>` fields: `#[serde(default, with = "lossless::opt_seq")]`.
pub mod opt_seq {
    use super::*;

    pub fn serialize<S: Serializer>(
        values: &Option<Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        values.as_deref().map(encode_all).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<f64>>, D::Error> {
        Option::<Vec<NumOrStr>>::deserialize(deserializer)?
            .map(decode_all)
            .transpose()
            .map_err(D::Error::custom)
    }
}
