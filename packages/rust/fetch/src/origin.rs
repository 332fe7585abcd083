//! Logical origins: the unit of per-host serialization.

use specindex_shared::OriginGroup;
use url::Url;

/// Maps a URL to the logical origin its fetches are serialized on.
///
/// The origin is the URL host, unless the host belongs to one of the
/// configured groups, in which case it is the group name.
#[derive(Debug, Clone, Default)]
pub struct OriginResolver {
    groups: Vec<OriginGroup>,
}

impl OriginResolver {
    pub fn new(groups: &[OriginGroup]) -> Self {
        Self {
            groups: groups.to_vec(),
        }
    }

    /// Logical origin of `url`.
    ///
    /// Inputs that do not parse as URLs with a host get a lane of their own,
    /// keyed by the raw input.
    pub fn origin_of(&self, url: &str) -> String {
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        else {
            return url.to_string();
        };

        self.groups
            .iter()
            .find(|g| g.hosts.iter().any(|pattern| host_matches(pattern, &host)))
            .map(|g| g.name.clone())
            .unwrap_or(host)
    }
}

/// `*.suffix` matches any sub-domain of `suffix`; anything else is exact.
fn host_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(suffix) => host
            .strip_suffix(suffix)
            .is_some_and(|prefix| prefix.ends_with('.')),
        None => pattern.eq_ignore_ascii_case(host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specindex_shared::FetchConfig;

    fn resolver() -> OriginResolver {
        OriginResolver::new(&FetchConfig::default().origin_groups)
    }

    #[test]
    fn plain_hosts_are_their_own_origin() {
        let r = resolver();
        assert_eq!(r.origin_of("https://www.w3.org/TR/css-color-4/"), "www.w3.org");
        assert_eq!(r.origin_of("https://fetch.spec.whatwg.org/"), "fetch.spec.whatwg.org");
        assert_eq!(r.origin_of("https://WWW.W3.ORG/TR/"), "www.w3.org");
    }

    #[test]
    fn grouped_hosts_fold() {
        let r = resolver();
        assert_eq!(r.origin_of("https://drafts.csswg.org/css-grid-3/"), "csswg");
        assert_eq!(r.origin_of("https://drafts.fxtf.org/compositing/"), "csswg");
        assert_eq!(r.origin_of("https://drafts.css-houdini.org/css-paint-api/"), "csswg");
        assert_eq!(r.origin_of("https://w3c.github.io/webauthn/"), "github.io");
        assert_eq!(r.origin_of("https://wicg.github.io/ua-client-hints/"), "github.io");
    }

    #[test]
    fn wildcard_needs_a_subdomain() {
        assert!(host_matches("*.github.io", "w3c.github.io"));
        assert!(!host_matches("*.github.io", "github.io"));
        assert!(!host_matches("*.github.io", "evilgithub.io"));
    }

    #[test]
    fn unparseable_input_is_its_own_origin() {
        assert_eq!(resolver().origin_of("css-color"), "css-color");
    }
}
