//! Pure naming helpers used by filename transforms.
//!
//! All functions are side-effect free: identical input yields identical
//! output. Paths are place-relative and `/`-separated.

/// Camelize separator runs: each `_` or `-` followed by a character is
/// replaced by that character uppercased (`foo-bar` -> `fooBar`).
///
/// A trailing separator has no following character and is kept as-is.
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        if (c == '-' || c == '_') && chars.peek().is_some() {
            let next = chars.next().unwrap_or(c);
            out.extend(next.to_uppercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Flatten a nested path into a single identifier: strip the final
/// extension, collapse an `index` basename to nothing, and join the
/// remaining segments with hyphens.
///
/// `a/b/c.d.js` -> `a-b-c.d`, `a/b/index` -> `a-b`, `index` -> ``.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if let Some(basename) = segments.pop() {
        let stem = match basename.rsplit_once('.') {
            // Leading-dot names have an empty stem; keep them whole
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => basename,
        };
        if stem != "index" {
            segments.push(stem);
        }
    }

    segments.join("-")
}

/// Detect a known token in an extension-stripped relative path, as either a
/// full segment (`on-pre-start/x`) or the dot-prefixed head of a compound
/// basename (`on-pre-start.x`). Segments are camelized before comparison,
/// so candidates are given in camel case.
///
/// Returns the extracted token (camelized) and the remaining path, or
/// `(None, original)` when nothing matches.
pub fn extract_from_path(path: &str, candidates: &[&str]) -> (Option<String>, String) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    for (i, segment) in segments.iter().enumerate() {
        let is_basename = i + 1 == segments.len();

        if !is_basename {
            let camel = camelize(segment);
            if candidates.contains(&camel.as_str()) {
                let mut rest = segments.clone();
                rest.remove(i);
                return (Some(camel), rest.join("/"));
            }
            continue;
        }

        // Basename: a compound `token.rest` form, or the whole name
        let (head, tail) = match segment.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (*segment, None),
        };
        let camel = camelize(head);
        if candidates.contains(&camel.as_str()) {
            let mut rest: Vec<&str> = segments[..i].to_vec();
            if let Some(tail) = tail {
                rest.push(tail);
            }
            return (Some(camel), rest.join("/"));
        }
    }

    (None, path.to_string())
}
