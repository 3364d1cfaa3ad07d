//! Gateway request signing and callback verification.
//!
//! Every gateway exchange carries a flat string-keyed parameter map. The
//! message authentication code is an HMAC-SHA512 over the parameters
//! sorted by key and joined as `key=value` pairs with `&`, excluding the
//! signature field itself, hex-encoded lowercase.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha512;

/// Name of the signature parameter appended last to every request.
pub const PARAM_SIGNATURE: &str = "signature";

type HmacSha512 = Hmac<Sha512>;

/// Canonical string over which the MAC is computed.
fn canonical(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, _)| k.as_str() != PARAM_SIGNATURE)
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Computes the signature for a parameter map.
pub fn sign(params: &BTreeMap<String, String>, secret: &str) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(canonical(params).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a supplied signature against the remaining parameters.
///
/// Uses constant-time comparison; a malformed hex signature simply fails
/// verification.
pub fn verify(params: &BTreeMap<String, String>, supplied: &str, secret: &str) -> bool {
    let sig_bytes = match hex::decode(supplied) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(canonical(params).as_bytes());
    mac.verify_slice(&sig_bytes).is_ok()
}
