//! Rewrites applied to contract patterns before generation.
//!
//! Contract authors copy patterns from many regex dialects. [`clean`] strips
//! what only makes sense in a host language (delimiters, anchors glued onto
//! alternatives, inline flags). [`flatten`] shortens verbose constructs so the
//! character-at-a-time generator does less work. [`strip_lookarounds`] is the
//! last resort for patterns the `regex` crate refuses.

/// Pattern used when a declared pattern is blank or a known wildcard.
pub const ALPHANUMERIC_PLUS: &str = "[a-zA-Z0-9]+";

const WILDCARDS: &[&str] = &[".^"];

const CASE_INSENSITIVE: &str = "(?i)";

const EMPTY_ALTERNATIVES: &[&str] = &["(^$)|", "^$)|", "(^$|)", "(|^$)", "(^$)"];

/// Full-class rewrites applied at the top level of a pattern.
///
/// `\w` is Unicode-aware in `regex`, so the ASCII word class maps to its
/// ASCII-only form. The other shorthands agree with their ASCII classes on
/// every character the generator tries.
const CLASS_SHORTHANDS: &[(&str, &str)] = &[
    ("[a-zA-Z0-9_]", r"(?-u:\w)"),
    ("[A-Za-z0-9_]", r"(?-u:\w)"),
    ("[0-9]", r"\d"),
    (r"[ \t\n\x0B\f\r]", r"\s"),
    (r"[ \t\n\r\f\v]", r"\s"),
    (r"[\s]", r"\s"),
    (r"[\d]", r"\d"),
    (r"[\w]", r"\w"),
    ("[^0-9]", r"\D"),
    ("[^a-zA-Z0-9_]", r"\W"),
    ("[^A-Za-z0-9_]", r"\W"),
    (r"[^\s]", r"\S"),
    (r"[^\d]", r"\D"),
    (r"[^\w]", r"\W"),
];

const QUANTIFIER_SHORTHANDS: &[(&str, &str)] = &[("0,1", "?"), ("1,", "+"), ("0,", "*")];

/// Normalize a contract pattern into something the generator can anchor.
pub fn clean(pattern: &str) -> String {
    if pattern.trim().is_empty() || WILDCARDS.contains(&pattern) {
        return ALPHANUMERIC_PLUS.to_string();
    }

    let mut p = pattern.to_string();
    if p.len() > 2 && p.starts_with('/') && p.ends_with("/i") {
        p = p[1..p.len() - 2].to_string();
    } else if p.len() > 1 && p.starts_with('/') && p.ends_with('/') {
        p = p[1..p.len() - 1].to_string();
    }
    for artifact in EMPTY_ALTERNATIVES {
        p = p.replace(artifact, "");
    }
    p = p.replace(CASE_INSENSITIVE, "");

    if let Some(rest) = p.strip_prefix('^') {
        p = rest.to_string();
    }
    if p.ends_with('$') && !is_escaped(&p, p.len() - 1) {
        p.pop();
    }
    p = remove_misplaced_dollars(&p);

    if let Some(rest) = p.strip_prefix('|') {
        p = rest.to_string();
    }
    p
}

/// Replace verbose top-level constructs with shorter equivalents.
pub fn flatten(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                out.push('\\');
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                }
                i += 2;
            }
            '[' => {
                let end = class_end(&chars, i).unwrap_or(chars.len() - 1);
                let class: String = chars[i..=end].iter().collect();
                match CLASS_SHORTHANDS.iter().find(|(long, _)| *long == class) {
                    Some((_, short)) => out.push_str(short),
                    None => out.push_str(&class),
                }
                i = end + 1;
            }
            '{' => {
                let close = chars[i..].iter().position(|&c| c == '}').map(|n| i + n);
                let body: Option<String> = close.map(|end| chars[i + 1..end].iter().collect());
                let short = body
                    .as_deref()
                    .and_then(|b| QUANTIFIER_SHORTHANDS.iter().find(|(long, _)| *long == b));
                match (short, close) {
                    (Some((_, short)), Some(end)) => {
                        out.push_str(short);
                        i = end + 1;
                    }
                    _ => {
                        out.push('{');
                        i += 1;
                    }
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    trim_wildcards(&out)
}

/// Remove lookahead and lookbehind groups.
pub fn strip_lookarounds(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                out.push('\\');
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                }
                i += 2;
            }
            '[' => {
                let end = class_end(&chars, i).unwrap_or(chars.len() - 1);
                out.extend(&chars[i..=end]);
                i = end + 1;
            }
            '(' if is_lookaround(&chars[i..]) => {
                i = group_end(&chars, i).map_or(chars.len(), |end| end + 1);
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

// --- Internal implementation ---

fn is_escaped(s: &str, byte_idx: usize) -> bool {
    s[..byte_idx].chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn is_lookaround(rest: &[char]) -> bool {
    let head: String = rest.iter().take(4).collect();
    head.starts_with("(?=")
        || head.starts_with("(?!")
        || head.starts_with("(?<=")
        || head.starts_with("(?<!")
}

/// Index of the `]` closing the class opened at `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if chars.get(i) == Some(&'^') {
        i += 1;
    }
    // A leading `]` is a literal.
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    let mut depth = 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the `)` closing the group opened at `start`.
fn group_end(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' => i = class_end(chars, i)?,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Keep `$` only at the very end, inside a class, or inside a group.
fn remove_misplaced_dollars(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut in_class = false;
    let mut paren_depth = 0usize;
    let mut escape = false;

    for (i, &c) in chars.iter().enumerate() {
        if escape {
            out.push(c);
            escape = false;
            continue;
        }
        match c {
            '\\' => escape = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '(' if !in_class => paren_depth += 1,
            ')' if !in_class => paren_depth = paren_depth.saturating_sub(1),
            '$' if !(i == chars.len() - 1 || in_class || paren_depth > 0) => continue,
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Trim unanchored `.*` / `*` padding and a dangling `|`.
fn trim_wildcards(pattern: &str) -> String {
    let mut p = pattern;
    loop {
        let before = p.len();
        p = p.strip_prefix(".*").unwrap_or(p);
        p = p.strip_prefix('*').unwrap_or(p);
        if p.ends_with(".*") && !is_escaped(p, p.len() - 2) {
            p = &p[..p.len() - 2];
        }
        if p.ends_with('|') && !is_escaped(p, p.len() - 1) {
            p = &p[..p.len() - 1];
        }
        if p.len() == before {
            break;
        }
    }
    p.to_string()
}
