use tracing::{self, error};

// For signature verification
use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
type HmacSha256 = Hmac<Sha256>;

/// Helper function for verifying GitHub webhook signature
///
/// The HMAC is computed over the exact bytes received on the wire, never a
/// re-serialization of the parsed payload, since re-encoding can change the
/// byte content and invalidate legitimate signatures.
pub fn verify_github_signature(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    // Expected format: "sha256=..."
    let expected_prefix = "sha256=";
    if !signature_header.starts_with(expected_prefix) {
        return false;
    }

    // signature from git
    let git_signature = &signature_header[expected_prefix.len()..];

    // Compute HMAC SHA256
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    // GitHub provides the signature as hex
    match hex_decode(git_signature) {
        Ok(git_signature_bytes) => {
            // Constant-time comparison
            mac.verify_slice(&git_signature_bytes).is_ok()
        }
        Err(_) => {
            error!("Signature header is not valid hex");
            false
        }
    }
}

/// Truncate strings so they fit Discord's per-component limits.
/// Counts characters, not bytes, so multi-byte input never splits mid-char.
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        let head: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"ref":"refs/heads/main"}"#;
        let header = sign("s3cret", body);
        assert!(verify_github_signature("s3cret", body, &header));
    }

    #[test]
    fn rejects_mutated_body() {
        let body = br#"{"ref":"refs/heads/main"}"#;
        let header = sign("s3cret", body);
        let mut tampered = body.to_vec();
        tampered[0] ^= 0x01;
        assert!(!verify_github_signature("s3cret", &tampered, &header));
    }

    #[test]
    fn rejects_mutated_signature() {
        let body = br#"{"action":"opened"}"#;
        let mut header = sign("s3cret", body);
        // Flip the last hex digit
        let last = header.pop().unwrap();
        header.push(if last == '0' { '1' } else { '0' });
        assert!(!verify_github_signature("s3cret", body, &header));
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = br#"{}"#;
        let header = sign("s3cret", body);
        assert!(!verify_github_signature("other", body, &header));
    }

    #[test]
    fn rejects_missing_prefix_and_bad_hex() {
        let body = br#"{}"#;
        let header = sign("s3cret", body);
        assert!(!verify_github_signature(
            "s3cret",
            body,
            header.strip_prefix("sha256=").unwrap()
        ));
        assert!(!verify_github_signature("s3cret", body, "sha256=zzzz"));
    }

    #[test]
    fn truncate_short_string_is_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("", 10), "");
    }

    #[test]
    fn truncate_long_string_gets_ellipsis() {
        let out = truncate("abcdefghij", 8);
        assert_eq!(out, "abcde...");
        assert_eq!(out.chars().count(), 8);
    }

    #[test]
    fn truncate_exact_length_is_unchanged() {
        assert_eq!(truncate("abcd", 4), "abcd");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let out = truncate("éééééééééé", 8);
        assert_eq!(out.chars().count(), 8);
        assert!(out.ends_with("..."));
    }
}
