use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use thiserror::Error;

use crate::services::auth::algorithm::{KeyShape, TrustedAlgorithm};

/// Provider key-set document (`{"keys": [...]}`).
///
/// Records are kept as raw JSON so one broken entry cannot fail the whole
/// document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwksDocument {
    #[serde(default)]
    pub keys: Vec<serde_json::Value>,
}

/// Why a key record was left out of the key set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyRecordError {
    #[error("record is malformed: {0}")]
    Malformed(String),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("key type '{found}' cannot verify {expected}")]
    KeyTypeMismatch { expected: &'static str, found: String },
    #[error("curve '{found}' does not match {expected}")]
    CurveMismatch { expected: &'static str, found: String },
    #[error("record is pinned to algorithm '{0}'")]
    AlgorithmMismatch(String),
    #[error("record is not a signing key (use = '{0}')")]
    NotForSigning(String),
    #[error("unusable key material: {0}")]
    InvalidMaterial(String),
}

/// One entry of the provider key set. Every field is optional on the wire and
/// checked by [`JwkRecord::verification_key`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwkRecord {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
}

impl JwkRecord {
    pub fn from_value(value: serde_json::Value) -> Result<Self, KeyRecordError> {
        serde_json::from_value(value).map_err(|e| KeyRecordError::Malformed(e.to_string()))
    }

    /// Rebuild a verification key usable with `algorithm`.
    pub fn verification_key(
        &self,
        algorithm: TrustedAlgorithm,
    ) -> Result<(String, DecodingKey), KeyRecordError> {
        let kid = required(&self.kid, "kid")?;
        let kty = required(&self.kty, "kty")?;

        if let Some(key_use) = self.key_use.as_deref() {
            if key_use != "sig" {
                return Err(KeyRecordError::NotForSigning(key_use.to_string()));
            }
        }

        if let Some(alg) = self.alg.as_deref() {
            if !algorithm.matches(alg) {
                return Err(KeyRecordError::AlgorithmMismatch(alg.to_string()));
            }
        }

        let shape = algorithm.key_shape();
        if kty != shape.kty() {
            return Err(KeyRecordError::KeyTypeMismatch {
                expected: algorithm.name(),
                found: kty.to_string(),
            });
        }

        let key = match shape {
            KeyShape::Rsa => {
                let n = required(&self.n, "n")?;
                let e = required(&self.e, "e")?;
                DecodingKey::from_rsa_components(n, e)
            }
            KeyShape::Ec { curve } => {
                self.check_curve(curve)?;
                let x = required(&self.x, "x")?;
                let y = required(&self.y, "y")?;
                DecodingKey::from_ec_components(x, y)
            }
            KeyShape::Okp { curve } => {
                self.check_curve(curve)?;
                let x = required(&self.x, "x")?;
                DecodingKey::from_ed_components(x)
            }
        }
        .map_err(|e| KeyRecordError::InvalidMaterial(e.to_string()))?;

        Ok((kid.to_string(), key))
    }

    fn check_curve(&self, expected: &'static str) -> Result<(), KeyRecordError> {
        let crv = required(&self.crv, "crv")?;
        if crv != expected {
            return Err(KeyRecordError::CurveMismatch {
                expected,
                found: crv.to_string(),
            });
        }
        Ok(())
    }
}

fn required<'a>(
    field: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, KeyRecordError> {
    match field.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(KeyRecordError::MissingField(name)),
    }
}

/// Key id -> verification key. Built in full, then published; never mutated.
#[derive(Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, DecodingKey>,
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("KeySet")
            .field("kids", &self.kids())
            .finish()
    }
}

impl KeySet {
    /// Keep every usable record; skip (and log) the rest. When two records
    /// share a kid the first one wins.
    pub fn from_document(document: JwksDocument, algorithm: TrustedAlgorithm) -> Self {
        let mut keys = HashMap::with_capacity(document.keys.len());

        for (index, value) in document.keys.into_iter().enumerate() {
            let built = JwkRecord::from_value(value).and_then(|r| r.verification_key(algorithm));

            let (kid, key) = match built {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(index, error = %err, "skipping signing key record");
                    continue;
                }
            };

            match keys.entry(kid) {
                Entry::Vacant(slot) => {
                    slot.insert(key);
                }
                Entry::Occupied(slot) => {
                    tracing::warn!(kid = %slot.key(), "duplicate signing key id; keeping the first");
                }
            }
        }

        Self { keys }
    }

    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn kids(&self) -> Vec<&str> {
        let mut kids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        kids.sort_unstable();
        kids
    }
}
