//! Locator patterns that extract an atomic name from a document URL.
//!
//! Patterns are tried in order and the first one that yields a name wins.
//! More specific patterns must come before generic ones: the known
//! multi-document repositories, for instance, would otherwise be swallowed
//! by the generic `*.github.io` pattern.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Extracts a name from the captures of a matching locator, or declines.
type Extractor = fn(&Captures<'_>) -> Option<String>;

/// One entry of the cascade: a predicate (the regex) and its extractor.
pub(crate) struct LocatorPattern {
    /// Label used in trace output.
    pub label: &'static str,
    regex: Regex,
    extract: Extractor,
}

impl LocatorPattern {
    fn new(label: &'static str, pattern: &str, extract: Extractor) -> Self {
        Self {
            label,
            // Patterns are compile-time constants covered by the tests below.
            regex: Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern {label}: {e}")),
            extract,
        }
    }

    /// Apply this pattern to `locator`.
    pub fn extract(&self, locator: &str) -> Option<String> {
        self.regex
            .captures(locator)
            .and_then(|caps| (self.extract)(&caps))
    }
}

/// GitHub repositories that host several documents side by side, one per
/// top-level directory. Keyed by (GitHub organization, repository).
const MULTI_DOCUMENT_REPOS: &[(&str, &str)] = &[
    ("gpuweb", "gpuweb"),
    ("w3c", "dxwg"),
    ("w3c", "sdw"),
    ("w3c", "wot-thing-description"),
];

fn group(n: usize) -> Extractor {
    match n {
        0 => |c| Some(c[0].to_string()),
        _ => |c| Some(c[1].to_string()),
    }
}

fn multi_document(c: &Captures<'_>) -> Option<String> {
    let (org, repo, doc) = (&c[1], &c[2], &c[3]);
    MULTI_DOCUMENT_REPOS
        .iter()
        .any(|(o, r)| *o == org && *r == repo)
        .then(|| doc.to_string())
}

fn individual_draft(c: &Captures<'_>) -> Option<String> {
    let rest = &c[1];
    Some(match rest.split_once('-') {
        Some((_, name)) => name.to_string(),
        None => rest.to_string(),
    })
}

/// The ordered cascade. Order is part of the semantics.
static PATTERNS: LazyLock<Vec<LocatorPattern>> = LazyLock::new(|| {
    vec![
        // Canonical catalog URL.
        LocatorPattern::new("tr", r"/TR/([^/]+)/$", group(1)),
        // Vendor drafting sites.
        LocatorPattern::new("whatwg", r"//([^/]+)\.spec\.whatwg\.org/", group(1)),
        LocatorPattern::new(
            "csswg",
            r"//drafts\.(?:csswg|fxtf|css-houdini)\.org/([^/]+)/",
            group(1),
        ),
        LocatorPattern::new("svgwg", r"//svgwg\.org/specs/(?:svg-)?([^/]+)/", |c| {
            Some(format!("svg-{}", &c[1]))
        }),
        LocatorPattern::new(
            "khronos",
            r"^https://registry\.khronos\.org/webgl/extensions/([^/]+)/$",
            group(1),
        ),
        LocatorPattern::new(
            "ecma",
            r"//ecma-international\.org/publications-and-standards/standards/(ecma-\d+)/?$",
            group(1),
        ),
        // Proposal site.
        LocatorPattern::new("tc39", r"//tc39\.es/proposal-([^/]+)/$", |c| {
            Some(format!("tc39-{}", &c[1]))
        }),
        // Extension documents next to the main document in the same repo.
        LocatorPattern::new(
            "extension",
            r"//[^/]+\.github\.io/([^/]+)/(extensions?)\.html$",
            |c| Some(format!("{}-{}", &c[1], &c[2])),
        ),
        LocatorPattern::new(
            "multi-document",
            r"//([^/.]+)\.github\.io/([^/]+)/([^/]+)/$",
            multi_document,
        ),
        // Generic directory-style pattern.
        LocatorPattern::new("github", r"//[^/]+\.github\.io/(?:webappsec-)?([^/]+)/", group(1)),
        // Archival documents.
        LocatorPattern::new("rfc", r"//www\.rfc-editor\.org/rfc/(rfc\d+)", group(1)),
        LocatorPattern::new(
            "ietf-group-draft",
            r"//datatracker\.ietf\.org/doc/html/draft-ietf-[^-/]+-([^/]+)",
            group(1),
        ),
        LocatorPattern::new(
            "ietf-individual-draft",
            r"//datatracker\.ietf\.org/doc/html/draft-[^-/]+-([^/]+)",
            individual_draft,
        ),
        // Findings.
        LocatorPattern::new(
            "tag-finding",
            r"^https?://(?:www\.)?w3\.org/2001/tag/doc/([^/]+)/?$",
            group(1),
        ),
        // Numeric catalog ids.
        LocatorPattern::new("iso", r"//www\.iso\.org/standard/(\d+)\.html$", |c| {
            Some(format!("iso{}", &c[1]))
        }),
        // Bare names pass through.
        LocatorPattern::new("bare", r"^[^/]+$", group(0)),
    ]
});

/// Run the cascade and return the first extracted name with its pattern label.
pub(crate) fn extract(locator: &str) -> Option<(&'static str, String)> {
    PATTERNS
        .iter()
        .find_map(|p| p.extract(locator).map(|name| (p.label, name)))
}
