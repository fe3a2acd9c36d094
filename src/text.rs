//! UTF-16 helpers shared by the indexer, reconciler and mock engine.
//!
//! Every position in a document is measured in UTF-16 code units. Code points
//! in the Basic Multilingual Plane cost one unit, everything above U+FFFF costs
//! two (a surrogate pair).

/// Number of UTF-16 code units needed to encode `s`.
pub fn utf16_len(s: &str) -> u32 {
    s.chars().map(char_units).sum()
}

/// Number of UTF-16 code units needed to encode a single character.
pub fn char_units(c: char) -> u32 {
    c.len_utf16() as u32
}

/// Check whether `offset` (in UTF-16 units from the start of `s`) falls on a
/// character boundary, i.e. not between the two halves of a surrogate pair.
///
/// Offsets past the end of the string are reported as boundaries only when
/// they equal the total length.
pub fn is_char_boundary(s: &str, offset: u32) -> bool {
    let mut pos = 0;
    for c in s.chars() {
        if pos == offset {
            return true;
        }
        pos += char_units(c);
        if pos > offset {
            return false;
        }
    }
    pos == offset
}

/// Split `s` at a UTF-16 offset.
///
/// Returns `None` when the offset is past the end or splits a surrogate pair.
pub fn split_at_utf16(s: &str, offset: u32) -> Option<(&str, &str)> {
    let mut units = 0;
    for (byte_idx, c) in s.char_indices() {
        if units == offset {
            return Some(s.split_at(byte_idx));
        }
        units += char_units(c);
        if units > offset {
            return None;
        }
    }
    if units == offset {
        Some((s, ""))
    } else {
        None
    }
}

/// Check whether a character is stripped from inserted text by the remote
/// service (C0 controls other than tab/newline/vertical tab, and the BMP
/// private-use area).
pub fn is_stripped_char(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{0008}' | '\u{000C}'..='\u{001F}' | '\u{E000}'..='\u{F8FF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_len() {
        assert_eq!(utf16_len("Hello\n"), 6);
        assert_eq!(utf16_len(""), 0);
        assert_eq!(utf16_len("é"), 1);
        assert_eq!(utf16_len("😀"), 2);
        assert_eq!(utf16_len("a😀b"), 4);
    }

    #[test]
    fn test_is_char_boundary() {
        let s = "a😀b";
        assert!(is_char_boundary(s, 0));
        assert!(is_char_boundary(s, 1));
        assert!(!is_char_boundary(s, 2));
        assert!(is_char_boundary(s, 3));
        assert!(is_char_boundary(s, 4));
        assert!(!is_char_boundary(s, 5));
    }

    #[test]
    fn test_split_at_utf16() {
        assert_eq!(split_at_utf16("Hello", 2), Some(("He", "llo")));
        assert_eq!(split_at_utf16("Hello", 5), Some(("Hello", "")));
        assert_eq!(split_at_utf16("a😀b", 3), Some(("a😀", "b")));
        assert_eq!(split_at_utf16("a😀b", 2), None);
        assert_eq!(split_at_utf16("ab", 3), None);
    }

    #[test]
    fn test_stripped_chars() {
        assert!(is_stripped_char('\u{0001}'));
        assert!(is_stripped_char('\r'));
        assert!(!is_stripped_char('\n'));
        assert!(!is_stripped_char('\t'));
        assert!(!is_stripped_char('\u{000B}'));
        assert!(is_stripped_char('\u{E000}'));
        assert!(!is_stripped_char('a'));
    }
}
