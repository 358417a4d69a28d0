// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Outbound Destination Policy
//!
//! Decides whether a webhook URL may be contacted at all. This is the SSRF
//! gate in front of every outbound request: the scheme must be `http` or
//! `https` and the host must be a member of an operator-supplied allowlist.
//!
//! Membership is a plain, case-insensitive string comparison. There is no
//! DNS resolution and no IP-literal special-casing, so evaluating a URL
//! never touches the network.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure allow/deny decision for outbound webhook targets

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Destination rejection reasons. None of these are retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestinationError {
    #[error("Webhook scheme must be http or https, got '{0}'")]
    InvalidScheme(String),

    #[error("Webhook host missing")]
    MissingHost,

    #[error("Destination host is not allow-listed: {0}")]
    HostNotAllowed(String),
}

/// Set of lower-cased hostnames that may receive webhooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedHosts(BTreeSet<String>);

impl AllowedHosts {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        )
    }

    /// Parse a comma separated list such as `"hooks.example.com, Api.Example.com"`.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, host: &str) -> bool {
        self.0.contains(&host.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for AllowedHosts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(","))
    }
}

/// A URL that passed [`validate_destination`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub url: Url,
    pub host: String,
}

/// Lower-cased host of `raw`, if it parses and has one.
pub fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw.trim())
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .filter(|host| !host.is_empty())
}

/// Validate `raw` against `allowed` and return the normalized URL and host.
///
/// Checks run in order: parse, scheme, host present, host allowlisted.
pub fn validate_destination(raw: &str, allowed: &AllowedHosts) -> Result<Destination, DestinationError> {
    let url = match Url::parse(raw.trim()) {
        Ok(url) => url,
        Err(_) => {
            let scheme = raw.split_once("://").map(|(s, _)| s.to_ascii_lowercase());
            return match scheme {
                Some(s) if s != "http" && s != "https" => Err(DestinationError::InvalidScheme(s)),
                _ => Err(DestinationError::MissingHost),
            };
        }
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(DestinationError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .map(str::to_ascii_lowercase)
        .filter(|h| !h.is_empty())
        .ok_or(DestinationError::MissingHost)?;

    if !allowed.contains(&host) {
        tracing::warn!(host = %host, "Outbound destination rejected by allowlist");
        return Err(DestinationError::HostNotAllowed(host));
    }

    Ok(Destination { url, host })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(hosts: &[&str]) -> AllowedHosts {
        AllowedHosts::new(hosts.iter().copied())
    }

    #[test]
    fn test_accepts_allowlisted_host() {
        let dest = validate_destination("https://hooks.example.com/webhook", &allow(&["hooks.example.com"])).unwrap();
        assert_eq!(dest.host, "hooks.example.com");
        assert_eq!(dest.url.path(), "/webhook");
    }

    #[test]
    fn test_host_comparison_is_case_insensitive() {
        let allowed = AllowedHosts::from_csv(" Hooks.Example.COM ,");
        let dest = validate_destination("HTTPS://HOOKS.example.com/x", &allowed).unwrap();
        assert_eq!(dest.host, "hooks.example.com");
        assert_eq!(dest.url.scheme(), "https");
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        let allowed = allow(&["hooks.example.com", "localhost"]);
        for raw in [
            "ftp://hooks.example.com/x",
            "file:///etc/passwd",
            "gopher://hooks.example.com:70/_",
            "javascript:alert(1)",
        ] {
            assert!(
                matches!(validate_destination(raw, &allowed), Err(DestinationError::InvalidScheme(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_missing_host() {
        let allowed = allow(&["hooks.example.com"]);
        assert_eq!(validate_destination("http://", &allowed), Err(DestinationError::MissingHost));
        assert_eq!(validate_destination("not a url", &allowed), Err(DestinationError::MissingHost));
        assert_eq!(validate_destination("", &allowed), Err(DestinationError::MissingHost));
    }

    #[test]
    fn test_rejects_host_outside_allowlist() {
        let allowed = allow(&["hooks.example.com"]);
        for raw in [
            "https://evil.example.com/hook",
            "https://hooks.example.com.evil.net/hook",
            "https://hooks.example.com@evil.net/hook",
            "http://169.254.169.254/latest/meta-data",
        ] {
            assert!(
                matches!(validate_destination(raw, &allowed), Err(DestinationError::HostNotAllowed(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_allowlist_allows_nothing() {
        let result = validate_destination("https://hooks.example.com/", &AllowedHosts::default());
        assert!(matches!(result, Err(DestinationError::HostNotAllowed(_))));
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://Notify.Example.com:8443/x").as_deref(), Some("notify.example.com"));
        assert_eq!(host_of("mailto:someone@example.com"), None);
    }
}
