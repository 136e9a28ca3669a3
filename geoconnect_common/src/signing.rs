//! Signing the parameters we send to WorldMap.
//!
//! Both sides share a secret key. We sort the parameters by name, join them
//! as `key=value&key=value`, and send the hex HMAC-SHA256 of that string in a
//! `signature_key` parameter.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::prelude::*;

type HmacSha256 = Hmac<Sha256>;

/// The name of the parameter carrying the signature.
pub const SIGNATURE_PARAM: &str = "signature_key";

fn mac_for(params: &BTreeMap<String, String>, secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC should accept any key length");
    let mut first = true;
    for (key, value) in params {
        if key == SIGNATURE_PARAM {
            continue;
        }
        if !first {
            mac.update(b"&");
        }
        first = false;
        mac.update(key.as_bytes());
        mac.update(b"=");
        mac.update(value.as_bytes());
    }
    mac
}

/// Compute the signature for `params`.
pub fn sign_params(params: &BTreeMap<String, String>, secret: &str) -> String {
    hex::encode(mac_for(params, secret).finalize().into_bytes())
}

/// Return a copy of `params` with a `signature_key` added.
pub fn with_signature(
    params: &BTreeMap<String, String>,
    secret: &str,
) -> BTreeMap<String, String> {
    let mut signed = params.clone();
    signed.insert(SIGNATURE_PARAM.to_owned(), sign_params(params, secret));
    signed
}

/// Check the `signature_key` in `params`.
pub fn verify(params: &BTreeMap<String, String>, secret: &str) -> bool {
    let signature = match params.get(SIGNATURE_PARAM).map(|s| hex::decode(s)) {
        Some(Ok(signature)) => signature,
        _ => return false,
    };
    mac_for(params, secret).verify_slice(&signature).is_ok()
}

/// Compare a submitted secret against the expected one in constant time.
/// Both are hashed first so their lengths don't leak either.
pub fn secrets_match(submitted: &str, expected: &str) -> bool {
    let submitted = Sha256::digest(submitted.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    submitted.as_slice().ct_eq(expected.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("title".to_owned(), "Boston income".to_owned());
        params.insert("datafile_id".to_owned(), "42".to_owned());
        params
    }

    #[test]
    fn signatures_round_trip() {
        let signed = with_signature(&params(), "s3cret");
        assert_eq!(signed[SIGNATURE_PARAM].len(), 64);
        assert!(verify(&signed, "s3cret"));
        assert!(!verify(&signed, "other"));
    }

    #[test]
    fn tampering_is_detected() {
        let mut signed = with_signature(&params(), "s3cret");
        signed.insert("title".to_owned(), "Cambridge income".to_owned());
        assert!(!verify(&signed, "s3cret"));

        let mut garbage = params();
        garbage.insert(SIGNATURE_PARAM.to_owned(), "not hex".to_owned());
        assert!(!verify(&garbage, "s3cret"));
        assert!(!verify(&params(), "s3cret"));
    }

    #[test]
    fn order_of_insertion_does_not_matter() {
        let mut reversed = BTreeMap::new();
        reversed.insert("datafile_id".to_owned(), "42".to_owned());
        reversed.insert("title".to_owned(), "Boston income".to_owned());
        assert_eq!(sign_params(&params(), "k"), sign_params(&reversed, "k"));
    }

    #[test]
    fn secrets_must_match_exactly() {
        assert!(secrets_match("hunter2", "hunter2"));
        assert!(!secrets_match("hunter3", "hunter2"));
        assert!(!secrets_match("hunter", "hunter2"));
        assert!(!secrets_match("", "hunter2"));
    }
}
