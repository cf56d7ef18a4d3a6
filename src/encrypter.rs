use std::fmt::Debug;

/// A symmetric cipher used by [`CookieStore`](crate::CookieStore) to protect session payloads.
///
/// Implementations should authenticate the ciphertext:
/// `decrypt` must fail on tampered or otherwise invalid input.
pub trait Encrypter: Debug + Send + Sync {
    /// Encrypt `plaintext`.
    fn encrypt(&self, plaintext: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Decrypt `ciphertext`, failing if it was not produced by [`encrypt`](Self::encrypt) with the same key.
    fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// The identity "cipher".
///
/// # ***READ THIS BEFORE USING IN A PRODUCTION DEPLOYMENT***
///
/// Payloads pass through unchanged.
/// A cookie store using this can be read **and modified** by the client,
/// so session data must neither be secret nor be trusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEncryption;

impl Encrypter for NoEncryption {
    fn encrypt(&self, plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}
