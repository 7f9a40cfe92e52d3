//! Underscore-run blanks in template text.

/// Whether the text contains at least one `_`.
pub fn has_blank(text: &str) -> bool {
    text.contains('_')
}

/// Replace underscore runs left to right with `values`.
///
/// Each run of one or more `_` takes the next value. Runs left over once the
/// values are exhausted are kept as they were.
pub fn fill_blanks<S: AsRef<str>>(text: &str, values: &[S]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut values = values.iter();
    let mut rest = text;

    while let Some(start) = rest.find('_') {
        out.push_str(&rest[..start]);

        let run_len = rest[start..].bytes().take_while(|b| *b == b'_').count();
        let run = &rest[start..start + run_len];
        match values.next() {
            Some(value) => out.push_str(value.as_ref()),
            None => out.push_str(run),
        }

        rest = &rest[start + run_len..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_two_runs() {
        assert_eq!(
            fill_blanks("Name: _____, Address: ____", &["Jane Doe", "12 Main St"]),
            "Name: Jane Doe, Address: 12 Main St"
        );
    }

    #[test]
    fn test_surplus_runs_kept() {
        assert_eq!(
            fill_blanks("A: ___ B: __ C: _", &["x"]),
            "A: x B: __ C: _"
        );
    }

    #[test]
    fn test_surplus_values_ignored() {
        assert_eq!(fill_blanks("Date: ____", &["March 15, 2024", "extra"]), "Date: March 15, 2024");
    }

    #[test]
    fn test_no_blanks() {
        assert_eq!(fill_blanks("Impression:", &["x"]), "Impression:");
        assert!(!has_blank("Impression:"));
    }

    #[test]
    fn test_single_underscore_is_a_blank() {
        assert!(has_blank("a_b"));
        assert_eq!(fill_blanks("a_b", &["-"]), "a-b");
    }

    #[test]
    fn test_unicode_around_blanks() {
        assert_eq!(fill_blanks("Señor ___ año", &["Peña"]), "Señor Peña año");
    }
}
