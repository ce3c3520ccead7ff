//! Webhook signature verification.

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the hex HMAC-SHA512 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Verifies gateway webhook signatures with the account's secret key.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl WebhookVerifier {
    /// Creates a verifier for `secret`.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self) -> Option<HmacSha512> {
        HmacSha512::new_from_slice(self.secret.as_bytes()).ok()
    }

    /// Hex signature of `body`.
    #[must_use]
    pub fn sign(&self, body: &[u8]) -> String {
        self.mac().map_or_else(String::new, |mut mac| {
            mac.update(body);
            hex::encode(mac.finalize().into_bytes())
        })
    }

    /// Returns true if `signature` matches `body`. Comparison is constant-time.
    #[must_use]
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        if self.secret.is_empty() {
            return false;
        }
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };
        let Some(mut mac) = self.mac() else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"event":"charge.success","data":{"reference":"RENT_1"}}"#;

    #[test]
    fn test_sign_then_verify() {
        let verifier = WebhookVerifier::new("sk_test_secret");
        let signature = verifier.sign(BODY);
        assert_eq!(signature.len(), 128);
        assert!(verifier.verify(BODY, &signature));
        assert!(verifier.verify(BODY, &signature.to_uppercase()));
    }

    #[test]
    fn test_rejects_tampering() {
        let verifier = WebhookVerifier::new("sk_test_secret");
        let signature = verifier.sign(BODY);
        assert!(!verifier.verify(b"{}", &signature));
        assert!(!WebhookVerifier::new("other").verify(BODY, &signature));
        assert!(!verifier.verify(BODY, "not-hex"));
        assert!(!verifier.verify(BODY, ""));
    }

    #[test]
    fn test_empty_secret_never_verifies() {
        let verifier = WebhookVerifier::new("");
        let signature = verifier.sign(BODY);
        assert!(!verifier.verify(BODY, &signature));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", WebhookVerifier::new("sk_live_x"));
        assert!(!rendered.contains("sk_live_x"));
    }
}
