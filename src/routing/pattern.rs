//! URL pattern matching.
//!
//! # Responsibilities
//! - Validate extension-style match patterns (`<all_urls>`, `scheme://host/path`)
//! - Test a URL against a pattern
//!
//! # Design Decisions
//! - Scheme `*` covers http, https, ws and wss
//! - Host matching is case-insensitive; `*.example.com` includes `example.com`
//! - Path globs may only use `*`; the query string is part of the matched path
//! - URLs that do not parse never match, they are not an error
//! - Compiled patterns are cached, so a pattern is validated once

use std::fmt;
use std::sync::Arc;
use dashmap::DashMap;
use regex::Regex;
use url::Url;

use crate::error::{MuxError, MuxResult};

const ALL_URLS: &str = "<all_urls>";
const WEB_SCHEMES: [&str; 4] = ["http", "https", "ws", "wss"];
const KNOWN_SCHEMES: [&str; 6] = ["http", "https", "ws", "wss", "ftp", "file"];

/// Trait for testing URLs against listener patterns.
pub trait PatternMatcher: Send + Sync + fmt::Debug {
    /// Returns true if `url` matches `pattern`, or `InvalidPattern` if the
    /// pattern is malformed.
    fn matches(&self, pattern: &str, url: &str) -> MuxResult<bool>;
}

#[derive(Debug, Clone)]
enum SchemeMatch {
    Web,
    Exact(String),
}

#[derive(Debug, Clone)]
enum HostMatch {
    Any,
    Subdomains(String),
    Exact(String),
}

#[derive(Debug, Clone)]
enum Authority {
    /// `file:///...` patterns carry no host.
    None,
    Host { host: HostMatch, port: Option<u16> },
}

#[derive(Debug, Clone)]
enum Kind {
    AllUrls,
    Url {
        scheme: SchemeMatch,
        authority: Authority,
        path: Regex,
    },
}

/// A validated match pattern.
#[derive(Debug, Clone)]
pub struct MatchPattern {
    kind: Kind,
}

impl MatchPattern {
    /// Parse and validate a pattern.
    pub fn parse(pattern: &str) -> MuxResult<Self> {
        if pattern == ALL_URLS {
            return Ok(Self { kind: Kind::AllUrls });
        }

        let (scheme, rest) = pattern
            .split_once("://")
            .ok_or_else(|| MuxError::invalid_pattern(pattern, "missing `://` separator"))?;

        let scheme = match scheme {
            "*" => SchemeMatch::Web,
            s if KNOWN_SCHEMES.contains(&s) => SchemeMatch::Exact(s.to_string()),
            s => {
                return Err(MuxError::invalid_pattern(
                    pattern,
                    format!("unsupported scheme `{}`", s),
                ))
            }
        };

        let slash = rest
            .find('/')
            .ok_or_else(|| MuxError::invalid_pattern(pattern, "missing path"))?;
        let (authority, path) = rest.split_at(slash);

        let authority = if matches!(&scheme, SchemeMatch::Exact(s) if s == "file") {
            if !authority.is_empty() {
                return Err(MuxError::invalid_pattern(pattern, "file patterns cannot have a host"));
            }
            Authority::None
        } else {
            parse_authority(pattern, authority)?
        };

        Ok(Self {
            kind: Kind::Url {
                scheme,
                authority,
                path: compile_glob(pattern, path)?,
            },
        })
    }

    /// Returns true if the URL matches this pattern.
    pub fn matches(&self, url: &str) -> bool {
        let Ok(url) = Url::parse(url) else {
            return false;
        };

        match &self.kind {
            Kind::AllUrls => KNOWN_SCHEMES.contains(&url.scheme()),
            Kind::Url { scheme, authority, path } => {
                let scheme_ok = match scheme {
                    SchemeMatch::Web => WEB_SCHEMES.contains(&url.scheme()),
                    SchemeMatch::Exact(s) => url.scheme() == s,
                };
                scheme_ok && authority_matches(authority, &url) && path.is_match(&path_and_query(&url))
            }
        }
    }
}

fn parse_authority(pattern: &str, authority: &str) -> MuxResult<Authority> {
    if authority.is_empty() {
        return Err(MuxError::invalid_pattern(pattern, "empty host"));
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) if !authority.ends_with(']') => {
            let port = match port {
                "*" => None,
                digits => Some(digits.parse::<u16>().map_err(|_| {
                    MuxError::invalid_pattern(pattern, format!("invalid port `{}`", digits))
                })?),
            };
            (host, port)
        }
        _ => (authority, None),
    };

    let host = host.to_lowercase();
    let host = if host == "*" {
        HostMatch::Any
    } else if let Some(domain) = host.strip_prefix("*.") {
        if domain.is_empty() || domain.contains('*') {
            return Err(MuxError::invalid_pattern(pattern, "malformed wildcard host"));
        }
        HostMatch::Subdomains(domain.to_string())
    } else if host.contains('*') {
        return Err(MuxError::invalid_pattern(
            pattern,
            "`*` is only allowed as the leading host label",
        ));
    } else {
        HostMatch::Exact(host)
    };

    Ok(Authority::Host { host, port })
}

fn compile_glob(pattern: &str, path: &str) -> MuxResult<Regex> {
    let body = path
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    Regex::new(&format!("^{}$", body))
        .map_err(|e| MuxError::invalid_pattern(pattern, e.to_string()))
}

fn authority_matches(authority: &Authority, url: &Url) -> bool {
    match authority {
        Authority::None => true,
        Authority::Host { host, port } => {
            let Some(actual) = url.host_str() else {
                return false;
            };
            let host_ok = match host {
                HostMatch::Any => true,
                HostMatch::Exact(expected) => actual == expected,
                HostMatch::Subdomains(domain) => {
                    actual == domain
                        || actual
                            .strip_suffix(domain.as_str())
                            .is_some_and(|prefix| prefix.ends_with('.'))
                }
            };
            let port_ok = port.map_or(true, |p| url.port_or_known_default() == Some(p));
            host_ok && port_ok
        }
    }
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Extension-style matcher with a cache of compiled patterns.
///
/// Entries are never evicted: the cache holds one entry per distinct valid
/// pattern ever matched, including patterns of listeners since removed.
/// Malformed patterns are not cached.
#[derive(Debug, Default)]
pub struct ExtensionMatcher {
    compiled: DashMap<String, Arc<MatchPattern>>,
}

impl ExtensionMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(&self, pattern: &str) -> MuxResult<Arc<MatchPattern>> {
        if let Some(hit) = self.compiled.get(pattern) {
            return Ok(hit.value().clone());
        }

        let compiled = Arc::new(MatchPattern::parse(pattern)?);
        self.compiled.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Number of distinct patterns compiled so far.
    pub fn cached(&self) -> usize {
        self.compiled.len()
    }
}

impl PatternMatcher for ExtensionMatcher {
    fn matches(&self, pattern: &str, url: &str) -> MuxResult<bool> {
        Ok(self.compile(pattern)?.matches(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(pattern: &str, url: &str) -> bool {
        MatchPattern::parse(pattern).unwrap().matches(url)
    }

    #[test]
    fn test_any_scheme_exact_host() {
        assert!(check("*://test.com/", "http://test.com/"));
        assert!(check("*://test.com/", "https://test.com"));
        assert!(!check("*://test.com/", "http://other.com/"));
        assert!(!check("*://test.com/", "http://test.com/page"));
        assert!(!check("*://test.com/", "ftp://test.com/"));
    }

    #[test]
    fn test_host_wildcards() {
        assert!(check("http://*.url/", "http://nop.url/"));
        assert!(check("*://*.example.com/*", "https://example.com/a"));
        assert!(check("*://*.example.com/*", "https://cdn.EXAMPLE.com/a/b"));
        assert!(!check("*://*.example.com/*", "https://badexample.com/"));
        assert!(check("*://*/*", "wss://anything.io/socket"));
    }

    #[test]
    fn test_path_glob_and_query() {
        assert!(check("https://a.com/api/*", "https://a.com/api/v1/users"));
        assert!(check("https://a.com/*.js", "https://a.com/static/app.js"));
        assert!(check("https://a.com/search*", "https://a.com/search?q=rust"));
        assert!(!check("https://a.com/api/*", "https://a.com/images/logo.png"));
    }

    #[test]
    fn test_ports() {
        assert!(check("http://localhost:8080/*", "http://localhost:8080/x"));
        assert!(!check("http://localhost:8080/*", "http://localhost:9090/x"));
        assert!(check("http://localhost:*/*", "http://localhost:9090/x"));
        assert!(check("http://localhost/*", "http://localhost:9090/x"));
    }

    #[test]
    fn test_all_urls_and_file() {
        assert!(check("<all_urls>", "https://example.com/"));
        assert!(check("<all_urls>", "file:///etc/hosts"));
        assert!(!check("<all_urls>", "chrome://settings"));
        assert!(check("file:///home/*", "file:///home/user/notes.txt"));
        assert!(!check("<all_urls>", "not a url"));
    }

    #[test]
    fn test_invalid_patterns() {
        for bad in ["test.com", "gopher://a.com/", "http://a.com", "http://a*.com/", "http:///x", "http://a.com:port/", "file://host/x"] {
            let err = MatchPattern::parse(bad).unwrap_err();
            assert!(matches!(err, MuxError::InvalidPattern { .. }), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_matcher_caches_compiled_patterns() {
        let matcher = ExtensionMatcher::new();
        assert!(matcher.matches("*://test.com/", "http://test.com/").unwrap());
        assert!(!matcher.matches("*://test.com/", "http://other.com/").unwrap());
        assert_eq!(matcher.cached(), 1);

        assert!(matcher.matches("bogus", "http://test.com/").is_err());
        assert_eq!(matcher.cached(), 1);
    }
}
