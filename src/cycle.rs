//! Cycle detection over property paths.
//!
//! A property path is the `#`-joined chain of property names the generator
//! descended through, e.g. `owner#pets#owner`. Both checks are pure: they
//! only look at the path and at the `$ref` recorded for each path prefix.

use std::collections::HashMap;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '#';

/// True if any path token recurs more than `max_depth` times.
///
/// Segments are also split on `_` so generated branch names like
/// `Pet_Dog` count their parts. Array item markers (`.items`) are folded into
/// the property they belong to, and matching is case-insensitive.
pub fn path_exceeds_depth(path: &str, max_depth: usize) -> bool {
    let tokens: Vec<String> = path
        .split(|c: char| c == PATH_SEPARATOR || c == '_')
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.to_lowercase().replace(".items", ""))
        .collect();

    if tokens.len() < max_depth {
        return false;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in &tokens {
        *counts.entry(token.as_str()).or_default() += 1;
    }
    counts.values().any(|&n| n > max_depth)
}

/// True if one `$ref` was entered more than `max_depth` times along `path`.
///
/// `ref_map` maps each visited path prefix to the `$ref` entered there.
pub fn ref_exceeds_depth(path: &str, ref_map: &HashMap<String, String>, max_depth: usize) -> bool {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut end = 0;
    for segment in path.split(PATH_SEPARATOR) {
        end += segment.len();
        if let Some(reference) = ref_map.get(&path[..end]) {
            let n = counts.entry(reference.as_str()).or_default();
            *n += 1;
            if *n > max_depth {
                tracing::trace!(path, reference = %reference, "reference recurs past depth");
                return true;
            }
        }
        end += PATH_SEPARATOR.len_utf8();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_paths_never_exceed() {
        assert!(!path_exceeds_depth("", 2));
        assert!(!path_exceeds_depth("self", 2));
    }

    #[test]
    fn repeated_segment_exceeds() {
        assert!(!path_exceeds_depth("self#self", 2));
        assert!(path_exceeds_depth("self#self#self", 2));
    }

    #[test]
    fn distinct_segments_do_not_exceed() {
        assert!(!path_exceeds_depth("owner#pets#tags#name", 1));
    }

    #[test]
    fn items_suffix_and_case_are_folded() {
        assert!(path_exceeds_depth("Child#child.items#CHILD", 2));
    }

    #[test]
    fn underscores_split_tokens() {
        assert!(path_exceeds_depth("node_node#node", 2));
    }

    #[test]
    fn ref_counts_follow_prefixes() {
        let mut refs = HashMap::new();
        refs.insert("a".to_string(), "#/components/schemas/Node".to_string());
        refs.insert("a#b".to_string(), "#/components/schemas/Node".to_string());
        refs.insert("a#b#c".to_string(), "#/components/schemas/Node".to_string());

        assert!(!ref_exceeds_depth("a#b", &refs, 2));
        assert!(ref_exceeds_depth("a#b#c", &refs, 2));
    }

    #[test]
    fn ref_counts_ignore_other_branches() {
        let mut refs = HashMap::new();
        refs.insert("left".to_string(), "Node".to_string());
        refs.insert("left#next".to_string(), "Node".to_string());
        refs.insert("right".to_string(), "Node".to_string());

        assert!(!ref_exceeds_depth("right#value", &refs, 1));
        assert!(ref_exceeds_depth("left#next", &refs, 1));
    }
}
