use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

const ITERATIONS: u32 = 4096;

/// A salted PBKDF2 SHA-256 password hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PasswordHash {
    salt: [u8; 16],
    hash: [u8; 32],
}

impl PasswordHash {
    /// Hashes `password` with a fresh random salt.
    pub(crate) fn new<P: AsRef<[u8]>>(password: P) -> Self {
        let mut salt = [0; 16];
        OsRng.fill_bytes(&mut salt);
        Self {
            salt,
            hash: derive(password.as_ref(), &salt),
        }
    }

    /// Returns whether `password` produces this hash.
    pub(crate) fn verify<P: AsRef<[u8]>>(&self, password: P) -> bool {
        let candidate = derive(password.as_ref(), &self.salt);
        candidate
            .iter()
            .zip(self.hash.iter())
            .fold(0, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

fn derive(password: &[u8], salt: &[u8]) -> [u8; 32] {
    let mut hash = [0; 32];
    pbkdf2::<Hmac<Sha256>>(password, salt, ITERATIONS, &mut hash);
    hash
}
