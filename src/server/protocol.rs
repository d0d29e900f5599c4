//! Peer Wire Protocol
//!
//! Inter-node fetches ride plain HTTP GETs: the request is carried
//! entirely in the path, the response body is a bincode-encoded
//! [`FetchResponse`] served as `application/octet-stream`.
//!
//! Status codes: 200 on success, 400 for a malformed path or empty key,
//! 404 for an unknown group, 500 for anything else.

use serde::{Deserialize, Serialize};

/// Path prefix of the peer endpoint. Full paths look like
/// `/_gcache/<group>/<key>` with both components URL-escaped.
pub const BASE_PATH: &str = "/_gcache/";

/// Body of a successful peer fetch.
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchResponse {
    /// The cached payload.
    pub value: Vec<u8>,
    /// Absolute expiry in nanoseconds since the epoch; 0 means no expiry.
    pub expire_unix_nanos: i64,
}
