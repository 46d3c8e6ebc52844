use std::fmt;

use subtle::ConstantTimeEq;

/// A registered client's secret.
///
/// The value never appears in `Debug` or `Display` output and is compared
/// in constant time.
///
/// # Examples
///
/// ```
/// use gateway_core::ClientSecret;
///
/// let secret = ClientSecret::new("s3cr3t");
/// assert!(secret.verify("s3cr3t"));
/// assert!(!secret.verify("guess"));
/// assert_eq!(format!("{:?}", secret), "[REDACTED]");
/// ```
// Do NOT derive Debug or Display; both must stay redacted.
pub struct ClientSecret {
    inner: String,
}

impl ClientSecret {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Compares `candidate` against the secret in constant time.
    pub fn verify(&self, candidate: &str) -> bool {
        self.inner.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// Explicitly exposes the secret value.
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
