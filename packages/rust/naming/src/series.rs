//! Series/version decomposition of an atomic name.

use std::sync::LazyLock;

use regex::Regex;

/// `name-X`, `name-X.Y`, `name-vX`.
static DASHED_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)-v?(\d+)(\.\d+)?$").unwrap());

/// `rdf12-concepts`, `sparql11-query`, ...: two digits before a suffix.
static FAMILY_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(rdf|sparql|shacl|owl)(\d)(\d)?-(.*)$").unwrap());

/// Khronos registry extensions keep their trailing digits.
static KHRONOS_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://registry\.khronos\.org/webgl/extensions/").unwrap());

/// Series whose trailing digits are part of the identity, not a level.
fn is_exempt(basename: &str, locator: &str) -> bool {
    basename.starts_with("ecma-")
        || basename.starts_with("tc39-")
        || is_iso(basename)
        || KHRONOS_EXTENSION.is_match(locator)
}

fn is_iso(basename: &str) -> bool {
    basename
        .strip_prefix("iso")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Split `basename` into a series shortname and an optional level.
pub(crate) fn split_level(basename: &str, locator: &str) -> (String, Option<String>) {
    if is_exempt(basename, locator) {
        return (basename.to_string(), None);
    }

    if let Some(c) = DASHED_LEVEL.captures(basename) {
        let version = match c.get(3) {
            Some(minor) => format!("{}{}", &c[2], minor.as_str()),
            None => c[2].to_string(),
        };
        return (c[1].to_string(), Some(version));
    }

    if let Some((series, version)) = appended_level(basename) {
        return (series, Some(version));
    }

    if let Some(c) = FAMILY_LEVEL.captures(basename) {
        let version = match c.get(3) {
            Some(minor) => format!("{}.{}", &c[2], minor.as_str()),
            None => c[2].to_string(),
        };
        return (format!("{}-{}", &c[1], &c[4]), Some(version));
    }

    (basename.to_string(), None)
}

/// `selectors4` → 4, `css21` → 2.1, `svg11` → 1.1. Names ending in more
/// than two digits (`rfc9110`) carry no level.
fn appended_level(basename: &str) -> Option<(String, String)> {
    let digits = basename
        .bytes()
        .rev()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 || digits > 2 || digits == basename.len() {
        return None;
    }

    let (series, level) = basename.split_at(basename.len() - digits);
    let version = match level.as_bytes() {
        [major, minor] => format!("{}.{}", *major as char, *minor as char),
        _ => level.to_string(),
    };
    Some((series.to_string(), version))
}

/// Fold legacy numbered prefixes onto the modern series name.
pub(crate) fn modernize(series: &str) -> String {
    match series {
        "css3-background" => "css-backgrounds".to_string(),
        _ => {
            if let Some(rest) = series
                .strip_prefix("css3-")
                .or_else(|| series.strip_prefix("css4-"))
            {
                format!("css-{rest}")
            } else {
                series.to_string()
            }
        }
    }
}
