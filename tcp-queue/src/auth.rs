use sha2::{Digest, Sha256};

pub const NONCE_LEN: usize = 32;

pub fn new_nonce() -> [u8; NONCE_LEN] {
    rand::random()
}

/// Proof of knowledge of the shared secret for a given challenge
pub fn digest(nonce: &[u8], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a client's answer with the expected digest without short-circuiting
pub fn verify(nonce: &[u8], secret: &str, answer: &str) -> bool {
    let expected = digest(nonce, secret);
    expected.len() == answer.len()
        && expected
            .bytes()
            .zip(answer.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
