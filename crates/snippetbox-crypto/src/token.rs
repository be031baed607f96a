use sha2::{Digest, Sha256};

/// Digest under which a session id is stored, so a leaked `sessions` table
/// does not hand out live cookies.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_hex() {
        let d = token_digest("abc");
        assert_eq!(d, token_digest("abc"));
        assert_eq!(d.len(), 64);
        assert_ne!(d, token_digest("abd"));
        assert_eq!(
            d,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
