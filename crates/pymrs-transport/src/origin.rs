//! Origin allowlists.

use url::Url;

/// Accepts messages from any origin.
pub const WILDCARD: &str = "*";

/// Which sender origins an endpoint accepts messages from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OriginPolicy {
    /// Any origin (`"*"`). Convenient for same-origin development, unsafe in production.
    #[default]
    Any,
    /// Exact `scheme://host[:port]` matches only.
    Allow(Vec<String>),
}

impl OriginPolicy {
    /// Parse an `xdomain` setting: `"*"`, one origin, or a comma-separated list.
    ///
    /// Entries that parse as URLs are reduced to their origin, so
    /// `https://example.com/page` allows `https://example.com`.
    pub fn parse(xdomain: &str) -> Self {
        let xdomain = xdomain.trim();
        if xdomain.is_empty() || xdomain == WILDCARD {
            return OriginPolicy::Any;
        }

        let mut origins: Vec<String> = Vec::new();
        for entry in xdomain.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if entry == WILDCARD {
                return OriginPolicy::Any;
            }
            let origin = origin_of(entry).unwrap_or_else(|| entry.to_string());
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }

        if origins.is_empty() {
            OriginPolicy::Any
        } else {
            OriginPolicy::Allow(origins)
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            OriginPolicy::Any => true,
            OriginPolicy::Allow(origins) => origins.iter().any(|allowed| allowed == origin),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, OriginPolicy::Any)
    }

    /// The `targetOrigin` to post with: the single allowed origin, else `"*"`.
    pub fn target_origin(&self) -> &str {
        match self {
            OriginPolicy::Allow(origins) if origins.len() == 1 => &origins[0],
            _ => WILDCARD,
        }
    }
}

/// The serialized origin of an absolute URL, or `None` for relative or opaque URLs.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(origin.ascii_serialization())
}
