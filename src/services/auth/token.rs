//! Compact JWS splitting.
//!
//! `RawToken` borrows the three segments of a credential without trusting any
//! of them. The header can be decoded up front to locate the signing key; the
//! payload is only decoded by the verifier after the signature checks out.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::services::auth::error::AuthError;

/// The parts of a JOSE header the guard looks at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default)]
    pub kid: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct RawToken<'a> {
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
    signing_input: &'a str,
}

impl<'a> RawToken<'a> {
    /// Split `header.payload.signature`. Anything other than three segments,
    /// or an empty header/payload segment, is an invalid header.
    pub fn split(token: &'a str) -> Result<Self, AuthError> {
        let mut segments = token.split('.');

        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::InvalidHeader);
        };

        if header.is_empty() || payload.is_empty() {
            return Err(AuthError::InvalidHeader);
        }

        let signing_input = &token[..header.len() + 1 + payload.len()];

        Ok(Self {
            header,
            payload,
            signature,
            signing_input,
        })
    }

    pub fn header(&self) -> Result<TokenHeader, AuthError> {
        decode_segment(self.header).ok_or(AuthError::InvalidHeader)
    }

    /// Decode the payload. Callers must have verified the signature first.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, AuthError> {
        decode_segment(self.payload).ok_or(AuthError::InvalidClaims)
    }

    /// The bytes the signature was computed over (`header.payload`).
    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }

    pub fn signature(&self) -> &'a str {
        self.signature
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}
