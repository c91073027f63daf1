use std::fmt;

use crate::error::{Result, ScanError};

const MIN_TARGET_LEN: usize = 3;
const SCHEME_PREFIXES: [&str; 3] = ["http://", "https://", "ftp://"];

/// A target string that passed [`validate_target`].
///
/// Holds the original text; scheme stripping is only used for the shape
/// check and never leaks into the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTarget(String);

impl ValidatedTarget {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The target as a URL, defaulting to `http://` when it carries no
    /// http(s) scheme.
    pub fn as_url(&self) -> String {
        if self.0.starts_with("http://") || self.0.starts_with("https://") {
            self.0.clone()
        } else {
            format!("http://{}", self.0)
        }
    }
}

impl fmt::Display for ValidatedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ValidatedTarget {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Syntactic gate for user supplied targets. No resolution is attempted.
pub fn validate_target(target: &str) -> Result<ValidatedTarget> {
    if target.is_empty() {
        return Err(ScanError::target("Target is required"));
    }

    if target.chars().count() < MIN_TARGET_LEN {
        return Err(ScanError::target("Target is too short"));
    }

    let mut host = target;
    for prefix in SCHEME_PREFIXES {
        if let Some(rest) = host.strip_prefix(prefix) {
            host = rest;
        }
    }

    if !(host.contains('.') || host.contains(':')) {
        return Err(ScanError::target(
            "Target does not appear to be a valid domain or IP address",
        ));
    }

    Ok(ValidatedTarget(target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_error(input: &str) -> String {
        match validate_target(input) {
            Err(ScanError::Target(msg)) => msg,
            other => {
                panic!("expected TargetError for {input:?}, got {other:?}")
            }
        }
    }

    #[test]
    fn empty_target_is_required() {
        assert_eq!(target_error(""), "Target is required");
    }

    #[test]
    fn short_targets_are_rejected() {
        for input in ["a", "ab", "a.", ":1"] {
            assert_eq!(target_error(input), "Target is too short");
        }
    }

    #[test]
    fn host_without_dot_or_colon_is_rejected_after_stripping_scheme() {
        for input in ["localhost", "http://intranet", "ftp://abc", "https://x"]
        {
            assert_eq!(
                target_error(input),
                "Target does not appear to be a valid domain or IP address"
            );
        }
    }

    #[test]
    fn valid_targets_are_returned_unmodified() {
        for input in [
            "example.com",
            "http://example.com",
            "https://10.0.0.1",
            "ftp://files.example.org",
            "192.168.1.1",
            "host:8080",
            "::1",
        ] {
            let validated = validate_target(input).expect("valid target");
            assert_eq!(validated.as_str(), input);
        }
    }

    #[test]
    fn scheme_alone_does_not_satisfy_the_shape_check() {
        // "http://" contains ':' but the check runs on the stripped remainder
        assert_eq!(
            target_error("http://"),
            "Target does not appear to be a valid domain or IP address"
        );
    }

    #[test]
    fn url_form_defaults_to_http() {
        let plain = validate_target("example.com").unwrap();
        assert_eq!(plain.as_url(), "http://example.com");

        let secure = validate_target("https://example.com").unwrap();
        assert_eq!(secure.as_url(), "https://example.com");

        let ftp = validate_target("ftp://example.com").unwrap();
        assert_eq!(ftp.as_url(), "http://ftp://example.com");
    }
}
