//! Resumption token codec.
//!
//! A resumption token carries everything needed to continue a listing
//! without server-side session state: the original request parameters, the
//! index of the record type being scanned, and the cursor key of the last
//! record handed out.
//!
//! # Wire form
//!
//! ```text
//! v1.<payload>.<checksum>
//! ```
//!
//! - `payload` is the URL-safe, unpadded base64 encoding of a compact JSON
//!   object holding the token fields.
//! - `checksum` is the first 16 hex digits of SHA-256 over the version tag,
//!   the codec secret and the encoded payload.
//!
//! Every character is URL-safe, so tokens can be embedded in query strings
//! untouched. Decoding is fail-closed: any structural problem or checksum
//! mismatch yields [`OaiError::BadResumptionToken`] and nothing is salvaged.
//!
//! # Examples
//!
//! ```ignore
//! use oaipmh_engine::token::{ResumptionToken, TokenCodec, TokenPosition};
//!
//! let codec = TokenCodec::new("secret");
//! let encoded = codec.serialize(&token)?;
//! assert_eq!(codec.deserialize(&encoded)?, token);
//! # Ok::<(), oaipmh_engine::OaiError>(())
//! ```

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{OaiError, Result};
use crate::record::CursorKey;

const VERSION: &str = "v1";
const CHECKSUM_HEX_LEN: usize = 16;
const MAX_TOKEN_LEN: usize = 4096;

/// Where a listing stopped: the record type being scanned and the last key handed out.
///
/// Positions order by type index first, then cursor key, which is the order
/// in which a listing advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenPosition {
    /// Index into the format's ordered record-type list.
    pub type_index: usize,
    /// Cursor key of the last record on the previous page.
    pub last: CursorKey,
}

/// Decoded resumption token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumptionToken {
    /// Metadata prefix of the original request.
    pub metadata_prefix: String,
    /// Set spec of the original request.
    pub set: Option<String>,
    /// Lower datestamp bound of the original request.
    pub from: Option<DateTime<Utc>>,
    /// Upper datestamp bound of the original request.
    pub until: Option<DateTime<Utc>>,
    /// Resume position.
    pub position: TokenPosition,
}

impl ResumptionToken {
    /// Whether another token was issued for the same request parameters.
    #[must_use]
    pub fn same_request(&self, other: &ResumptionToken) -> bool {
        self.metadata_prefix == other.metadata_prefix
            && self.set == other.set
            && self.from == other.from
            && self.until == other.until
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Payload {
    p: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    f: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    u: Option<DateTime<Utc>>,
    t: usize,
    m: DateTime<Utc>,
    i: u64,
}

/// Encodes and decodes resumption tokens under a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec keyed with `secret`.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        TokenCodec {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Serialize a token to its URL-safe string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded as JSON.
    pub fn serialize(&self, token: &ResumptionToken) -> Result<String> {
        let payload = Payload {
            p: token.metadata_prefix.clone(),
            s: token.set.clone(),
            f: token.from,
            u: token.until,
            t: token.position.type_index,
            m: token.position.last.mtime,
            i: token.position.last.id,
        };
        let json = serde_json::to_vec(&payload)
            .map_err(|e| OaiError::BadResumptionToken(format!("failed to encode token: {e}")))?;
        let encoded = URL_SAFE_NO_PAD.encode(json);
        let checksum = self.checksum(&encoded);
        Ok(format!("{VERSION}.{encoded}.{checksum}"))
    }

    /// Deserialize a token previously produced by [`serialize`](Self::serialize).
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::BadResumptionToken`] if the string is malformed,
    /// was issued under another secret or version, or has been altered.
    pub fn deserialize(&self, raw: &str) -> Result<ResumptionToken> {
        if raw.is_empty() || raw.len() > MAX_TOKEN_LEN {
            return Err(bad("token length out of range"));
        }

        let mut parts = raw.split('.');
        let (Some(version), Some(encoded), Some(checksum), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad("expected three dot-separated parts"));
        };

        if version != VERSION {
            return Err(bad("unsupported token version"));
        }
        if checksum.len() != CHECKSUM_HEX_LEN
            || !same_bytes(&self.checksum(encoded), checksum)
        {
            return Err(bad("integrity check failed"));
        }

        let json = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| bad(&format!("payload is not base64: {e}")))?;
        let payload: Payload = serde_json::from_slice(&json)
            .map_err(|e| bad(&format!("payload is not a token: {e}")))?;

        if payload.p.is_empty() {
            return Err(bad("missing metadata prefix"));
        }

        Ok(ResumptionToken {
            metadata_prefix: payload.p,
            set: payload.s,
            from: payload.f,
            until: payload.u,
            position: TokenPosition {
                type_index: payload.t,
                last: CursorKey::new(payload.m, payload.i),
            },
        })
    }

    fn checksum(&self, encoded: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(VERSION.as_bytes());
        hasher.update([0u8]);
        hasher.update(&self.secret);
        hasher.update([0u8]);
        hasher.update(encoded.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..CHECKSUM_HEX_LEN / 2])
    }
}

/// Equality whose running time depends only on the lengths.
fn same_bytes(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |diff, (x, y)| diff | (x ^ y))
            == 0
}

fn bad(reason: &str) -> OaiError {
    OaiError::BadResumptionToken(reason.to_string())
}
