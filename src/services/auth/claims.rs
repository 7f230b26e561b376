use serde::{Deserialize, Serialize};

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::One(aud) => aud == audience,
            Self::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

impl Default for Audience {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// Verified access-token claims.
///
/// Produced only by the verifier, owned by the request that presented the
/// token and dropped with it.
///
/// NOTE:
/// - `permissions` is `None` when the claim is absent, which is not the same
///   as an empty grant (`Some(vec![])`).
/// - Claims we do not model are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    #[serde(default)]
    pub aud: Audience,
    pub sub: String,
    #[serde(deserialize_with = "numeric_date::required")]
    pub exp: i64,

    #[serde(
        default,
        deserialize_with = "numeric_date::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub iat: Option<i64>,
    #[serde(
        default,
        deserialize_with = "numeric_date::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    pub fn permissions(&self) -> Option<&[String]> {
        self.permissions.as_deref()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions()
            .is_some_and(|granted| granted.iter().any(|p| p == permission))
    }
}

/// Just the expiry, readable even when the rest of the payload is not.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct Expiry {
    #[serde(deserialize_with = "numeric_date::required")]
    pub exp: i64,
}

/// NumericDate: seconds since the epoch, possibly with a fraction. Fractions
/// are floored to whole seconds.
pub(crate) mod numeric_date {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Whole(i64),
        Fraction(f64),
    }

    fn seconds(raw: Raw) -> Result<i64, &'static str> {
        match raw {
            Raw::Whole(secs) => Ok(secs),
            Raw::Fraction(secs) if secs.is_finite() && secs.abs() < i64::MAX as f64 => {
                Ok(secs.floor() as i64)
            }
            Raw::Fraction(_) => Err("NumericDate out of range"),
        }
    }

    pub fn required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        seconds(Raw::deserialize(deserializer)?).map_err(D::Error::custom)
    }

    pub fn optional<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Option::<Raw>::deserialize(deserializer)?
            .map(seconds)
            .transpose()
            .map_err(D::Error::custom)
    }
}
