use std::fmt;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlgorithmError {
    #[error("unknown signing algorithm: {0}")]
    Unknown(String),
    #[error("symmetric signing algorithm is not accepted: {0}")]
    Symmetric(String),
}

/// The JWK key shape a trusted algorithm verifies with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    Rsa,
    Ec { curve: &'static str },
    Okp { curve: &'static str },
}

impl KeyShape {
    /// JWK `kty` value for this shape.
    pub fn kty(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Ec { .. } => "EC",
            Self::Okp { .. } => "OKP",
        }
    }
}

/// The single asymmetric algorithm this process accepts.
///
/// Construction refuses HMAC algorithms, so a token can never be verified with
/// a provider's public key used as a shared secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedAlgorithm(Algorithm);

impl TrustedAlgorithm {
    pub fn new(algorithm: Algorithm) -> Result<Self, AlgorithmError> {
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                Err(AlgorithmError::Symmetric(name(algorithm).to_string()))
            }
            _ => Ok(Self(algorithm)),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.0
    }

    pub fn name(&self) -> &'static str {
        name(self.0)
    }

    pub fn key_shape(&self) -> KeyShape {
        match self.0 {
            Algorithm::ES256 => KeyShape::Ec { curve: "P-256" },
            Algorithm::ES384 => KeyShape::Ec { curve: "P-384" },
            Algorithm::EdDSA => KeyShape::Okp { curve: "Ed25519" },
            _ => KeyShape::Rsa,
        }
    }

    /// Exact match against a token header's `alg` value.
    pub fn matches(&self, alg: &str) -> bool {
        alg == self.name()
    }
}

impl Default for TrustedAlgorithm {
    fn default() -> Self {
        Self(Algorithm::RS256)
    }
}

impl FromStr for TrustedAlgorithm {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let algorithm =
            Algorithm::from_str(s.trim()).map_err(|_| AlgorithmError::Unknown(s.to_string()))?;
        Self::new(algorithm)
    }
}

impl fmt::Display for TrustedAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn name(algorithm: Algorithm) -> &'static str {
    #[allow(unreachable_patterns)]
    match algorithm {
        Algorithm::HS256 => "HS256",
        Algorithm::HS384 => "HS384",
        Algorithm::HS512 => "HS512",
        Algorithm::ES256 => "ES256",
        Algorithm::ES384 => "ES384",
        Algorithm::RS256 => "RS256",
        Algorithm::RS384 => "RS384",
        Algorithm::RS512 => "RS512",
        Algorithm::PS256 => "PS256",
        Algorithm::PS384 => "PS384",
        Algorithm::PS512 => "PS512",
        Algorithm::EdDSA => "EdDSA",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_rs256() {
        let alg = TrustedAlgorithm::default();
        assert_eq!(alg.algorithm(), Algorithm::RS256);
        assert_eq!(alg.key_shape(), KeyShape::Rsa);
    }

    #[test]
    fn rejects_hmac() {
        assert_eq!(
            "HS256".parse::<TrustedAlgorithm>(),
            Err(AlgorithmError::Symmetric("HS256".into()))
        );
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(matches!(
            "none".parse::<TrustedAlgorithm>(),
            Err(AlgorithmError::Unknown(_))
        ));
    }

    #[test]
    fn header_match_is_exact() {
        let alg: TrustedAlgorithm = "RS256".parse().unwrap();
        assert!(alg.matches("RS256"));
        assert!(!alg.matches("rs256"));
        assert!(!alg.matches("RS512"));
        assert!(!alg.matches("none"));
    }

    #[test]
    fn key_shapes_follow_the_algorithm() {
        let es: TrustedAlgorithm = "ES384".parse().unwrap();
        assert_eq!(es.key_shape(), KeyShape::Ec { curve: "P-384" });
        assert_eq!(es.key_shape().kty(), "EC");

        let ed: TrustedAlgorithm = "EdDSA".parse().unwrap();
        assert_eq!(ed.key_shape().kty(), "OKP");
    }
}
