//! Shared-secret token verification

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const TAG_KEY: &[u8] = b"microdemo-submit-token";

/// The configured submit token.
///
/// Only an HMAC tag of the secret is kept. Candidates are checked by
/// recomputing the tag and comparing in constant time, so the comparison
/// does not leak how many leading bytes matched.
pub struct SharedSecret {
    tag: Vec<u8>,
}

impl SharedSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            tag: token_mac(secret).finalize().into_bytes().to_vec(),
        }
    }

    pub fn verify(&self, candidate: &str) -> bool {
        token_mac(candidate).verify_slice(&self.tag).is_ok()
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(***)")
    }
}

fn token_mac(token: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(TAG_KEY).expect("HMAC can take key of any size");
    mac.update(token.as_bytes());
    mac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let secret = SharedSecret::new("SECRET_TOKEN");
        assert!(secret.verify("SECRET_TOKEN"));
    }

    #[test]
    fn test_mismatch() {
        let secret = SharedSecret::new("SECRET_TOKEN");
        assert!(!secret.verify("SECRET_TOKEM"));
        assert!(!secret.verify("secret_token"));
        assert!(!secret.verify("SECRET_TOKEN "));
        assert!(!secret.verify(""));
        assert!(!secret.verify("SECRET_TOKEN\0"));
    }

    #[test]
    fn test_long_tokens() {
        let long = "x".repeat(500);
        let secret = SharedSecret::new(&long);
        assert!(secret.verify(&long));
        assert!(!secret.verify(&"x".repeat(499)));
    }

    #[test]
    fn test_debug_hides_secret() {
        let secret = SharedSecret::new("SECRET_TOKEN");
        assert_eq!(format!("{secret:?}"), "SharedSecret(***)");
    }
}
