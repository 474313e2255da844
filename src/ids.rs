//! Identifiers and Sort Keys
//!
//! OpenControl data has no primary keys, so URL-safe identifiers are derived
//! from names and paths, with a short content hash for disambiguation.
//! Control numbers get natural-order sort keys so that `AC-2` sorts before
//! `AC-10`.

use std::fmt;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::Standard;

/// Length of the hash suffix used in derived identifiers
pub const SHORT_HASH_LEN: usize = 6;

/// Number of leading name characters kept in derived identifiers
const ID_PREFIX_CHARS: usize = 12;

/// Truncated hex SHA-256 of `text`. Used only to tell similar names apart.
pub fn short_hash(text: &str, len: usize) -> String {
    let hash = format!("{:x}", Sha256::digest(text.as_bytes()));
    hash.chars().take(len).collect()
}

fn prefixed_id(prefix_source: &str, hash_source: &str) -> String {
    let prefix: String = prefix_source.chars().take(ID_PREFIX_CHARS).collect();
    format!("{}-{}", prefix, short_hash(hash_source, SHORT_HASH_LEN))
}

/// Project id: start of the system name plus a hash of its manifest path
pub fn project_id(name: &str, manifest_path: &Path) -> String {
    prefixed_id(name, &manifest_path.to_string_lossy())
}

/// Organization id: start of the abbreviation plus a hash of the full name
pub fn organization_id(abbreviation: &str, name: &str) -> String {
    prefixed_id(abbreviation, name)
}

/// Component id.
///
/// Prefers the declared path relative to `base`, the directory shared by
/// every declared component path. When that leaves nothing usable (a
/// project with a single component, or no common base) the id falls back
/// to the start of the name plus a hash of the declared path.
///
/// These ids shift when sibling components are added or removed.
pub fn component_id(name: &str, declared_path: &str, base: Option<&Path>) -> String {
    if let Some(base) = base {
        let declared: PathBuf = normal_components(Path::new(declared_path)).iter().collect();
        if let Ok(relative) = declared.strip_prefix(base) {
            let relative = path_to_slashes(relative);
            if !relative.chars().all(|c| c == '.' || c == '/') {
                return relative;
            }
        }
    }
    prefixed_id(name, declared_path)
}

/// Longest leading run of path components shared by all `paths`.
///
/// Returns `None` for an empty list or when absolute and relative paths are
/// mixed (which also covers paths on different drive roots).
pub fn common_base(paths: &[PathBuf]) -> Option<PathBuf> {
    let first = paths.first()?;
    let is_absolute = first.is_absolute();
    if paths.iter().any(|p| p.is_absolute() != is_absolute) {
        return None;
    }

    let mut common: Vec<PathComponent<'_>> = normal_components(first);
    for path in &paths[1..] {
        let other = normal_components(path);
        let shared = common
            .iter()
            .zip(other.iter())
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
    }

    if is_absolute && common.is_empty() {
        // Different roots.
        return None;
    }
    Some(common.iter().collect())
}

fn normal_components(path: &Path) -> Vec<PathComponent<'_>> {
    path.components()
        .filter(|c| !matches!(c, PathComponent::CurDir))
        .collect()
}

fn path_to_slashes(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-encode a value for use as one URL path segment
pub fn url_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

// =============================================================================
// Natural sort keys
// =============================================================================

/// One run of a control number: digits compare numerically, the rest as text
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum SortPart {
    Number(u64),
    Text(String),
}

/// Natural-order key for a control number or control part.
///
/// The runs always alternate text, number, text, ... starting with a
/// (possibly empty) text run, so numbers are only ever compared to numbers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NumberSortKey(pub Vec<SortPart>);

impl NumberSortKey {
    pub fn parts(&self) -> &[SortPart] {
        &self.0
    }
}

impl fmt::Display for NumberSortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.0 {
            match part {
                SortPart::Number(n) => write!(f, "{}", n)?,
                SortPart::Text(t) => write!(f, "{}", t)?,
            }
        }
        Ok(())
    }
}

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("digit-run pattern is valid"))
}

fn citation_delimiters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+|[^\w\s]+").expect("delimiter pattern is valid"))
}

/// Split `text` around every match of `re`, keeping the matches, the way a
/// capturing split does: `[before, match, between, match, ..., after]`.
fn split_keeping<'t>(re: &Regex, text: &'t str) -> Vec<&'t str> {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        parts.push(&text[last..m.start()]);
        parts.push(m.as_str());
        last = m.end();
    }
    parts.push(&text[last..]);
    parts
}

/// Build the natural sort key for a control number. `None` and `""` both
/// produce a key with a single empty text run.
pub fn make_control_number_sort_key(s: Option<&str>) -> NumberSortKey {
    let text = s.unwrap_or("");
    let parts = split_keeping(digit_runs(), text)
        .into_iter()
        .enumerate()
        .map(|(i, run)| {
            if i % 2 == 1 {
                // Runs too long for u64 still sort sensibly as text.
                run.parse::<u64>()
                    .map(SortPart::Number)
                    .unwrap_or_else(|_| SortPart::Text(run.to_string()))
            } else {
                SortPart::Text(run.to_string())
            }
        })
        .collect();
    NumberSortKey(parts)
}

/// Find the cataloged control a possibly nonstandard citation refers to.
///
/// Citations such as `AC-2 (a)` or `AC-2 (DHS 1.2.3)` are trimmed at
/// whitespace and punctuation boundaries, longest prefix first, until a
/// prefix is found in `standard`. Returns `control_id` unchanged if nothing
/// matches.
pub fn get_matched_control(control_id: &str, standard: &Standard) -> String {
    let parts = split_keeping(citation_delimiters(), control_id);
    for end in (1..=parts.len()).rev() {
        let candidate = parts[..end].concat();
        if standard.controls.contains_key(&candidate) {
            return candidate;
        }
    }
    control_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CatalogControl;

    fn key(s: &str) -> NumberSortKey {
        make_control_number_sort_key(Some(s))
    }

    fn standard_with(ids: &[&str]) -> Standard {
        let mut standard = Standard::new("NIST-800-53", "NIST SP 800-53");
        for id in ids {
            standard.controls.insert(
                id.to_string(),
                CatalogControl::new("NIST-800-53", id, "Account Management", "AC", "desc"),
            );
        }
        standard
    }

    #[test]
    fn test_numeric_runs_sort_numerically() {
        assert!(key("AC-2") < key("AC-10"));
        assert!(key("AC-10") < key("AC-10(a)"));
        assert!(key("AC-9") < key("AC-10"));
        assert!(key("AC-10") < key("AU-1"));
    }

    #[test]
    fn test_sort_key_shape() {
        assert_eq!(
            key("AC-10").parts(),
            &[
                SortPart::Text("AC-".to_string()),
                SortPart::Number(10),
                SortPart::Text(String::new()),
            ]
        );
        assert_eq!(make_control_number_sort_key(None), NumberSortKey(vec![SortPart::Text(String::new())]));
        assert_eq!(make_control_number_sort_key(None), key(""));
        assert_eq!(key("AC-10 (a)").to_string(), "AC-10 (a)");
    }

    #[test]
    fn test_part_keys_order_alphabetically() {
        assert!(key("a") < key("b"));
        assert!(make_control_number_sort_key(None) < key("a"));
    }

    #[test]
    fn test_matched_control_backs_off() {
        let standard = standard_with(&["AC-2"]);
        assert_eq!(get_matched_control("AC-2 (a)", &standard), "AC-2");
        assert_eq!(get_matched_control("AC-2 (DHS 1.2.3)", &standard), "AC-2");
        assert_eq!(get_matched_control("AC-2", &standard), "AC-2");
        assert_eq!(get_matched_control("ZZ-99", &standard), "ZZ-99");
    }

    #[test]
    fn test_matched_control_prefers_longest() {
        let standard = standard_with(&["AC-2", "AC-2 (1)"]);
        assert_eq!(get_matched_control("AC-2 (1)(a)", &standard), "AC-2 (1)");
    }

    #[test]
    fn test_short_hash() {
        let h = short_hash("abc", SHORT_HASH_LEN);
        assert_eq!(h, "ba7816");
        assert_eq!(short_hash("abc", 10).len(), 10);
    }

    #[test]
    fn test_prefixed_ids_truncate_to_twelve_chars() {
        let id = organization_id("Department of Examples", "Department of Examples");
        assert!(id.starts_with("Department o-"));
        assert_eq!(id.len(), 12 + 1 + SHORT_HASH_LEN);
    }

    #[test]
    fn test_component_ids_from_common_base() {
        let declared = ["components/Drupal", "components/AWS"];
        let paths: Vec<PathBuf> = declared.iter().map(PathBuf::from).collect();
        let base = common_base(&paths);
        assert_eq!(base.as_deref(), Some(Path::new("components")));
        assert_eq!(component_id("Drupal", declared[0], base.as_deref()), "Drupal");
        assert_eq!(component_id("Amazon Web Services", declared[1], base.as_deref()), "AWS");
    }

    #[test]
    fn test_single_component_falls_back_to_hash() {
        let paths = vec![PathBuf::from("components/Drupal")];
        let base = common_base(&paths);
        let id = component_id("Drupal", "components/Drupal", base.as_deref());
        assert_eq!(id, format!("Drupal-{}", short_hash("components/Drupal", SHORT_HASH_LEN)));
    }

    #[test]
    fn test_common_base_rejects_mixed_paths() {
        let paths = vec![PathBuf::from("/abs/a"), PathBuf::from("rel/b")];
        assert_eq!(common_base(&paths), None);
        assert_eq!(common_base(&[]), None);
        assert_eq!(component_id("Name", "rel/b", None), format!("Name-{}", short_hash("rel/b", 6)));
    }

    #[test]
    fn test_nested_component_ids_use_slashes() {
        let paths = vec![PathBuf::from("./components/infra/aws"), PathBuf::from("components/app")];
        let base = common_base(&paths);
        assert_eq!(base.as_deref(), Some(Path::new("components")));
        assert_eq!(component_id("AWS", "./components/infra/aws", base.as_deref()), "infra/aws");
    }

    #[test]
    fn test_url_segment() {
        assert_eq!(url_segment("AC-2 (a)"), "AC-2%20%28a%29");
        assert_eq!(url_segment("infra/aws"), "infra%2Faws");
    }
}
