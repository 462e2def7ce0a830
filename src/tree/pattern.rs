//! OSC address pattern matching: `*`, `?`, `[set]`/`[!set]`, `{alt,alt}`
//! cartesian alternation, and `//` any-depth descent.
//!
//! Implemented as a small backtracking automaton over path segments rather
//! than a single compiled regex, since `//` needs to try matching the rest
//! of the pattern at every depth of the remaining path — that's naturally
//! expressed as search over an NFA-like segment graph, not string regex.

use crate::error::Error;

#[derive(Debug, Clone)]
enum SegmentPattern {
    /// `//`: zero or more path segments, then resume matching.
    AnyDepth,
    /// A single path segment, expanded from `{a,b}` alternation into one
    /// or more glob templates; any template matching is sufficient.
    Glob(Vec<String>),
}

/// Compiles a pattern into matchable segments. Case-sensitive; rejects an
/// empty segment other than `//`, and a trailing `/`.
fn compile(pattern: &str) -> Result<Vec<SegmentPattern>, Error> {
    if !pattern.starts_with('/') {
        return Err(Error::pattern_parse(format!("pattern must start with '/': {pattern}")));
    }
    if pattern == "/" {
        return Ok(Vec::new());
    }
    let body = &pattern[1..];
    if body.ends_with('/') {
        return Err(Error::pattern_parse(format!("trailing '/' is not allowed: {pattern}")));
    }
    let mut segments = Vec::new();
    for part in body.split('/') {
        if part.is_empty() {
            segments.push(SegmentPattern::AnyDepth);
        } else {
            segments.push(SegmentPattern::Glob(expand_alternation(part)?));
        }
    }
    Ok(segments)
}

/// Expands every `{a,b,c}` group in a segment into the cartesian product
/// of literal/glob templates, e.g. `ch{1,2}` → `["ch1", "ch2"]`.
fn expand_alternation(part: &str) -> Result<Vec<String>, Error> {
    let chars: Vec<char> = part.chars().collect();
    let mut results = vec![String::new()];
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            let end = chars[i..]
                .iter()
                .position(|&c| c == '}')
                .map(|p| p + i)
                .ok_or_else(|| Error::pattern_parse(format!("unterminated '{{' in pattern: {part}")))?;
            let alts: Vec<String> = chars[i + 1..end].iter().collect::<String>().split(',').map(str::to_string).collect();
            let mut next = Vec::with_capacity(results.len() * alts.len());
            for r in &results {
                for a in &alts {
                    next.push(format!("{r}{a}"));
                }
            }
            results = next;
            i = end + 1;
        } else {
            let c = chars[i];
            for r in results.iter_mut() {
                r.push(c);
            }
            i += 1;
        }
    }
    Ok(results)
}

fn parse_char_class(p: &[char], pi: usize) -> (bool, Vec<(char, char)>, usize) {
    let mut i = pi + 1;
    let negate = i < p.len() && p[i] == '!';
    if negate {
        i += 1;
    }
    let mut set = Vec::new();
    while i < p.len() && p[i] != ']' {
        if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            set.push((p[i], p[i + 2]));
            i += 3;
        } else {
            set.push((p[i], p[i]));
            i += 1;
        }
    }
    let end = if i < p.len() { i + 1 } else { i };
    (negate, set, end)
}

fn match_from(p: &[char], pi: usize, t: &[char], ti: usize) -> bool {
    if pi == p.len() {
        return ti == t.len();
    }
    match p[pi] {
        '*' => (ti..=t.len()).any(|k| match_from(p, pi + 1, t, k)),
        '?' => ti < t.len() && match_from(p, pi + 1, t, ti + 1),
        '[' => {
            let (negate, set, next_pi) = parse_char_class(p, pi);
            if ti >= t.len() {
                return false;
            }
            let c = t[ti];
            let in_set = set.iter().any(|&(lo, hi)| c >= lo && c <= hi);
            (in_set != negate) && match_from(p, next_pi, t, ti + 1)
        }
        c => ti < t.len() && t[ti] == c && match_from(p, pi + 1, t, ti + 1),
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    match_from(&p, 0, &t, 0)
}

/// Greedy left-to-right matching; `//` backtracks over every possible
/// depth of the remaining path.
fn matches_segments(pattern: &[SegmentPattern], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((SegmentPattern::AnyDepth, rest)) => (0..=path.len()).any(|skip| matches_segments(rest, &path[skip..])),
        Some((SegmentPattern::Glob(templates), rest)) => match path.split_first() {
            None => false,
            Some((seg, path_rest)) => templates.iter().any(|t| glob_match(t, seg)) && matches_segments(rest, path_rest),
        },
    }
}

fn split_path(path: &str) -> Vec<&str> {
    if path == "/" {
        Vec::new()
    } else {
        path.trim_start_matches('/').split('/').collect()
    }
}

/// Does `path` (an absolute, slash-separated address) match `pattern`?
pub fn matches(pattern: &str, path: &str) -> Result<bool, Error> {
    let compiled = compile(pattern)?;
    Ok(matches_segments(&compiled, &split_path(path)))
}

#[cfg(test)]
mod pattern_tests {
    use super::*;

    #[test]
    fn literal_path_matches_itself() {
        assert!(matches("/a/b/c", "/a/b/c").unwrap());
        assert!(!matches("/a/b/c", "/a/b/d").unwrap());
    }

    #[test]
    fn star_matches_any_single_segment_content() {
        assert!(matches("/a/*/c", "/a/xyz/c").unwrap());
        assert!(!matches("/a/*/c", "/a/xyz/d").unwrap());
    }

    #[test]
    fn any_depth_descent_backtracks() {
        assert!(matches("/a//z", "/a/z").unwrap());
        assert!(matches("/a//z", "/a/b/c/z").unwrap());
        assert!(!matches("/a//z", "/a/b/c").unwrap());
    }

    #[test]
    fn alternation_expands_cartesian() {
        assert!(matches("/ch{1,2}", "/ch1").unwrap());
        assert!(matches("/ch{1,2}", "/ch2").unwrap());
        assert!(!matches("/ch{1,2}", "/ch3").unwrap());
    }

    #[test]
    fn char_class_range_and_negation() {
        assert!(matches("/[a-c]", "/b").unwrap());
        assert!(!matches("/[a-c]", "/d").unwrap());
        assert!(matches("/[!a-c]", "/d").unwrap());
    }

    #[test]
    fn trailing_slash_is_rejected() {
        assert!(matches("/a/b/", "/a/b").is_err());
    }
}
