//! Quote- and parenthesis-aware scanning helpers.
//!
//! MySQL accepts three quote characters (`'`, `"` and the backtick for
//! identifiers). Inside a quoted run a backslash escapes the next byte and a
//! doubled quote stands for itself. All delimiters are ASCII, so scanning works
//! on bytes and every reported index is a valid char boundary.

fn scan(text: &str, track_parens: bool) -> Option<Vec<bool>> {
    let bytes = text.as_bytes();
    let mut mask = vec![false; bytes.len()];
    let mut depth: usize = 0;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' && q != b'`' {
                    i += 2;
                    continue;
                }
                if b == q {
                    if bytes.get(i + 1) == Some(&q) {
                        i += 2;
                        continue;
                    }
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'(' if track_parens => depth += 1,
                b')' if track_parens => {
                    depth = depth.checked_sub(1)?;
                }
                _ => mask[i] = depth == 0,
            },
        }
        i += 1;
    }

    if quote.is_some() || depth != 0 {
        return None;
    }
    Some(mask)
}

/// Mark every byte that sits outside quoted literals and outside parentheses.
///
/// Delimiters themselves are never marked. Returns `None` when quotes or
/// parentheses are unbalanced.
pub fn top_level_mask(text: &str) -> Option<Vec<bool>> {
    scan(text, true)
}

/// Mark every byte that sits outside quoted literals. Parentheses are ignored.
pub fn unquoted_mask(text: &str) -> Option<Vec<bool>> {
    scan(text, false)
}

/// Split `text` on `sep` wherever the separator is at the top level.
pub fn split_top_level(text: &str, sep: u8) -> Option<Vec<&str>> {
    let mask = top_level_mask(text)?;
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b == sep && mask[i] {
            parts.push(&text[start..i]);
            start = i + 1;
        }
    }
    parts.push(&text[start..]);
    Some(parts)
}

/// Find the index of the parenthesis closing the one at `open`.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' && q != b'`' {
                    i += 2;
                    continue;
                }
                if b == q {
                    if bytes.get(i + 1) == Some(&q) {
                        i += 2;
                        continue;
                    }
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// If the whole of `text` is wrapped in one pair of parentheses, return the inside.
pub fn strip_outer_parens(text: &str) -> Option<&str> {
    let text = text.trim();
    if !text.starts_with('(') || !text.ends_with(')') {
        return None;
    }
    (matching_paren(text, 0)? == text.len() - 1).then(|| &text[1..text.len() - 1])
}

/// Whether the byte can be part of an unquoted SQL word.
pub fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Byte ranges of top-level words (runs of [`is_word_byte`]).
pub fn top_level_words(text: &str) -> Option<Vec<(usize, usize)>> {
    let mask = top_level_mask(text)?;
    let bytes = text.as_bytes();
    let mut words = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if mask[i] && is_word_byte(bytes[i]) {
            let start = i;
            while i < bytes.len() && mask[i] && is_word_byte(bytes[i]) {
                i += 1;
            }
            words.push((start, i));
        } else {
            i += 1;
        }
    }
    Some(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_respects_nesting_and_quotes() {
        let parts = split_top_level("a, CONCAT(b, ','), 'x,y'", b',').unwrap();
        assert_eq!(parts, vec!["a", " CONCAT(b, ',')", " 'x,y'"]);
    }

    #[test]
    fn unbalanced_input_is_rejected() {
        assert!(top_level_mask("COUNT(a").is_none());
        assert!(top_level_mask("'abc").is_none());
        assert!(top_level_mask("a)").is_none());
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        let mask = unquoted_mask(r"'it\'s' = ?").unwrap();
        assert!(mask[mask.len() - 1]);
        assert!(!mask[3]);
        assert!(unquoted_mask("'it''s'").is_some());
    }

    #[test]
    fn outer_parens() {
        assert_eq!(strip_outer_parens("(a = b)"), Some("a = b"));
        assert_eq!(strip_outer_parens("(a) = (b)"), None);
    }

    #[test]
    fn multibyte_text_splits_on_ascii_boundaries() {
        let parts = split_top_level("'é,ü', ö, (名, 前)", b',').unwrap();
        assert_eq!(parts, vec!["'é,ü'", " ö", " (名, 前)"]);
        assert_eq!(top_level_words("naïve x"), Some(vec![(0, 2), (4, 6), (7, 8)]));
        assert_eq!(strip_outer_parens("(€)"), Some("€"));
        assert!(unquoted_mask(r"'\é'").is_some());
    }
}
