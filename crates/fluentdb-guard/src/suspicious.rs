//! Heuristic detection of injection-like values.
//!
//! Values are bound as parameters, so a match here is not proof of an attack.
//! Callers decide what to do with a flagged value: reject it outright, or hold
//! it until the target column's declared type says whether it is plausible.

const SUSPICIOUS_CHARS: &[char] = &['\'', '"', '`', '\\', ';', '#', '\0'];

const SUSPICIOUS_SEQUENCES: &[&str] = &[
    "--",
    "/*",
    "*/",
    " or ",
    " and ",
    " xor ",
    " || ",
    " && ",
    "sleep(",
    "benchmark(",
    "waitfor ",
    "union ",
    "select ",
    "insert ",
    "update ",
    "delete ",
    "drop ",
    "truncate ",
    "alter ",
    "exec(",
    "execute(",
    "hex(",
    "unhex(",
    "char(",
    "concat(",
    "load_file(",
    "outfile",
    "dumpfile",
    "information_schema",
];

/// Lowercase and collapse every whitespace run into a single space.
pub fn normalize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_space = false;
    for c in value.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.extend(c.to_lowercase());
            in_space = false;
        }
    }
    out
}

/// Whether a scalar value looks like it is trying to break out of its slot.
pub fn is_suspicious(value: &str) -> bool {
    if value.contains(SUSPICIOUS_CHARS) {
        return true;
    }
    let normalized = normalize_value(value);
    SUSPICIOUS_SEQUENCES
        .iter()
        .any(|needle| normalized.contains(needle))
}
