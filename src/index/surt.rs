//! Canonical sort key derivation.
//!
//! The exact canonicalization scheme is a policy choice of the downstream
//! index consumer, so it lives behind a single-operation trait. The default
//! produces SURT-style keys (sort-friendly URI reordering transform):
//! reversed host labels, default port stripped, lowercased path, sorted
//! query, so entries sort by site then path.

use url::{Host, Url};

/// Error from a key maker; schemes report whatever failure type they have.
pub type KeyError = Box<dyn std::error::Error + Send + Sync>;

/// Pluggable `url -> sort key` transformation.
pub trait SortKeyMaker {
    /// Derive the canonical sort key, or fail on a malformed URL.
    fn make_key(&self, url: &str) -> Result<String, KeyError>;
}

/// SURT-style key maker.
///
/// `http://www.Example.org:80/A/b?x=1&a=2` becomes `org,example)/a/b?a=2&x=1`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SurtKeyMaker;

impl SortKeyMaker for SurtKeyMaker {
    fn make_key(&self, raw: &str) -> Result<String, KeyError> {
        let url = Url::parse(raw)?;
        let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;
        let host = host.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        let mut key = match url.host() {
            // Label reversal only makes sense for domain names; IP literals
            // stay as written.
            Some(Host::Domain(_)) => host.split('.').rev().collect::<Vec<_>>().join(","),
            _ => host.to_string(),
        };

        // Url::port() is None when the port is the scheme default.
        if let Some(port) = url.port() {
            key.push(':');
            key.push_str(&port.to_string());
        }

        key.push(')');
        key.push_str(&url.path().to_ascii_lowercase());

        if url.query().is_some() {
            let mut pairs: Vec<String> = url
                .query_pairs()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.to_ascii_lowercase()
                    } else {
                        format!("{}={}", k.to_ascii_lowercase(), v.to_ascii_lowercase())
                    }
                })
                .collect();
            pairs.sort();
            key.push('?');
            key.push_str(&pairs.join("&"));
        }

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(url: &str) -> String {
        SurtKeyMaker.make_key(url).unwrap()
    }

    #[test]
    fn test_host_labels_reversed() {
        assert_eq!(key("http://example.org/a?x=1"), "org,example)/a?x=1");
        assert_eq!(key("http://sub.site.example.com/"), "com,example,site,sub)/");
    }

    #[test]
    fn test_lowercased_and_www_stripped() {
        assert_eq!(key("HTTP://WWW.Example.Org/Path"), "org,example)/path");
    }

    #[test]
    fn test_default_port_removed() {
        assert_eq!(key("http://example.org:80/"), "org,example)/");
        assert_eq!(key("https://example.org:443/"), "org,example)/");
        assert_eq!(key("http://example.org:8080/"), "org,example:8080)/");
    }

    #[test]
    fn test_query_sorted() {
        assert_eq!(key("http://example.org/p?z=9&a=1"), "org,example)/p?a=1&z=9");
        assert_eq!(key("http://example.org/p?flag"), "org,example)/p?flag");
    }

    #[test]
    fn test_ip_host_not_reversed() {
        assert_eq!(key("http://127.0.0.1:8080/x"), "127.0.0.1:8080)/x");
    }

    #[test]
    fn test_malformed_url_fails() {
        assert!(SurtKeyMaker.make_key("not a url").is_err());
        assert!(SurtKeyMaker.make_key("mailto:nobody@example.org").is_err());
    }
}
