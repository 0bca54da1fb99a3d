use regex::Regex;
use lazy_static::lazy_static;
use sha2::{Sha256, Digest};
use base64::{Engine as _, engine::general_purpose};

lazy_static! {
    static ref IPV4_REGEX: Regex = Regex::new(r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}$").unwrap();
}

/// Hostname redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    /// Replace hostnames with a short hash instead of masking labels
    pub hash_for_correlation: bool,
    /// Leave hostnames untouched
    pub disabled: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            hash_for_correlation: true,
            disabled: false,
        }
    }
}

/// Redacts request identity (hostnames, certificate fingerprints) before logging
///
/// Hashed output is stable, so the same hostname always produces the same
/// token and log lines for one server can still be correlated.
#[derive(Debug, Clone, Default)]
pub struct HostRedactor {
    config: RedactionConfig,
}

impl HostRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    /// A redactor that passes hostnames through unchanged
    pub fn disabled() -> Self {
        Self::new(RedactionConfig {
            disabled: true,
            ..Default::default()
        })
    }

    pub fn redact_host(&self, host: &str) -> String {
        if self.config.disabled {
            return host.to_string();
        }

        if self.config.hash_for_correlation {
            return format!("HOST[{}]", self.hash_value(host));
        }

        if IPV4_REGEX.is_match(host) {
            let parts: Vec<&str> = host.split('.').collect();
            if let (Some(first), Some(last)) = (parts.first(), parts.last()) {
                return format!("{}.***.***.{}", first, last);
            }
        }

        // Keep the registrable suffix, mask everything to the left of it
        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() <= 2 {
            return "***".to_string();
        }
        let suffix = labels[labels.len() - 2..].join(".");
        format!("***.{}", suffix)
    }

    /// Short hex form of a SHA-256 certificate fingerprint
    pub fn short_fingerprint(fingerprint: &[u8]) -> String {
        fingerprint
            .iter()
            .take(6)
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.to_ascii_lowercase().as_bytes());
        let result = hasher.finalize();
        general_purpose::STANDARD_NO_PAD.encode(&result[..8]) // first 8 bytes are enough to correlate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_case_insensitive() {
        let redactor = HostRedactor::default();
        let a = redactor.redact_host("Mail.Example.com");
        let b = redactor.redact_host("mail.example.com");
        assert_eq!(a, b);
        assert!(a.starts_with("HOST["));
        assert!(!a.contains("example"));
    }

    #[test]
    fn test_ip_literal_masking() {
        let redactor = HostRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        });

        assert_eq!(redactor.redact_host("127.0.0.1"), "127.***.***.1");
    }

    #[test]
    fn test_label_masking() {
        let redactor = HostRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        });

        assert_eq!(redactor.redact_host("intranet.corp.example.com"), "***.example.com");
        assert_eq!(redactor.redact_host("localhost"), "***");
    }

    #[test]
    fn test_disabled_passes_through() {
        assert_eq!(HostRedactor::disabled().redact_host("example.org"), "example.org");
    }

    #[test]
    fn test_short_fingerprint() {
        let fp = [0xab_u8; 32];
        assert_eq!(HostRedactor::short_fingerprint(&fp), "abababababab");
    }
}
