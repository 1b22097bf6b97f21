//! Record splitting and chomping on a configurable separator.
//!
//! Captured output is turned into discrete records by splitting on the
//! input record separator (`irs`). Records keep their trailing separator;
//! chomping strips exactly one trailing separator.

/// Split text into records, each retaining its trailing separator.
///
/// A final run of text without a separator forms the last record.
/// Empty input yields no records.
pub fn split_records(text: &str, sep: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if sep.is_empty() {
        return vec![text.to_string()];
    }

    let mut records = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(sep) {
        let end = pos + sep.len();
        records.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        records.push(rest.to_string());
    }
    records
}

/// Strip exactly one trailing separator, if present.
pub fn chomp_once<'a>(text: &'a str, sep: &str) -> &'a str {
    if !sep.is_empty() {
        if let Some(stripped) = text.strip_suffix(sep) {
            return stripped;
        }
    }
    text
}

/// True if `text` is empty or consists of a single trailing separator.
///
/// Used by the `fail_on_stderr` check: one bare separator on stderr is
/// tolerated, anything beyond it is a violation.
pub fn is_blank_record(text: &str, sep: &str) -> bool {
    text.is_empty() || (!sep.is_empty() && text == sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_separator() {
        assert_eq!(split_records("A-B-C-D", "-"), vec!["A-", "B-", "C-", "D"]);
    }

    #[test]
    fn test_split_trailing_separator() {
        assert_eq!(split_records("a\nb\n", "\n"), vec!["a\n", "b\n"]);
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split_records("", "\n").is_empty());
    }

    #[test]
    fn test_split_no_separator_in_input() {
        assert_eq!(split_records("abc", "\n"), vec!["abc"]);
    }

    #[test]
    fn test_split_empty_separator_is_slurp() {
        assert_eq!(split_records("a\nb", ""), vec!["a\nb"]);
    }

    #[test]
    fn test_split_multichar_separator() {
        assert_eq!(
            split_records("a\r\nb\r\n", "\r\n"),
            vec!["a\r\n", "b\r\n"]
        );
    }

    #[test]
    fn test_chomp_once() {
        assert_eq!(chomp_once("hello\n", "\n"), "hello");
        assert_eq!(chomp_once("hello\n\n", "\n"), "hello\n");
        assert_eq!(chomp_once("hello", "\n"), "hello");
        assert_eq!(chomp_once("", "\n"), "");
    }

    #[test]
    fn test_is_blank_record() {
        assert!(is_blank_record("", "\n"));
        assert!(is_blank_record("\n", "\n"));
        assert!(!is_blank_record("x\n", "\n"));
        assert!(!is_blank_record("\n\n", "\n"));
    }
}
