/// Lexical context of the byte being scanned.
#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    BacktickQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

fn pair_at(bytes: &[u8], idx: usize, pair: [u8; 2]) -> bool {
    bytes.get(idx) == Some(&pair[0]) && bytes.get(idx + 1) == Some(&pair[1])
}

pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, *b"--")
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, *b"/*")
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, *b"*/")
}

/// Digits starting at `start`, returned with the index one past the last digit.
pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let len = bytes
        .get(start..)?
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if len == 0 {
        return None;
    }
    let end = start + len;
    std::str::from_utf8(&bytes[start..end])
        .ok()
        .map(|digits| (end, digits))
}

/// Recognize an opening `$tag$` (tag may be empty). Returns the tag and the index of the
/// closing `$` of the opener.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let rest = bytes.get(start + 1..)?;
    let tag_len = rest
        .iter()
        .position(|&b| !(b.is_ascii_alphanumeric() || b == b'_'))?;
    if rest[tag_len] != b'$' {
        return None;
    }
    let tag = &rest[..tag_len];
    // `$1$` is a placeholder followed by a stray dollar, not a tag.
    if tag.first().is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let tag = String::from_utf8(tag.to_vec()).ok()?;
    Some((tag, start + 1 + tag_len))
}

/// True when a closing `$tag$` starts at `idx`.
pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx) == Some(&b'$')
        && bytes.get(idx + 1..end) == Some(tag.as_bytes())
        && bytes.get(end) == Some(&b'$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_tags() {
        assert_eq!(try_start_dollar_quote(b"$$ x", 0), Some((String::new(), 1)));
        assert_eq!(try_start_dollar_quote(b"$fn$ x", 0), Some(("fn".to_string(), 3)));
        assert_eq!(try_start_dollar_quote(b"$1, $2", 0), None);
        assert_eq!(try_start_dollar_quote(b"$1$", 0), None);
        assert!(matches_tag(b"x $fn$", 2, "fn"));
        assert!(!matches_tag(b"x $f", 2, "fn"));
    }

    #[test]
    fn digits() {
        assert_eq!(scan_digits(b"$12 ", 1), Some((3, "12")));
        assert_eq!(scan_digits(b"$a", 1), None);
        assert_eq!(scan_digits(b"$", 1), None);
    }
}
