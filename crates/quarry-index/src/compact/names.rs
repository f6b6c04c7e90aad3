//! The `names` file: every gem name, sorted, one per line.

use std::collections::BTreeSet;

use super::preamble::{body_lines, SEPARATOR};

/// Encode distinct names in sorted order
pub fn encode<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let sorted: BTreeSet<String> = names
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect();

    let mut out = String::from(SEPARATOR);
    out.push('\n');
    for name in sorted {
        out.push_str(&name);
        out.push('\n');
    }
    out
}

pub fn decode(text: &str) -> Vec<String> {
    body_lines(text).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_sorts_and_dedups() {
        let text = encode(["rake", "abbrev", "rake", "Zlib"]);
        assert_eq!(text, "---\nZlib\nabbrev\nrake\n");
        assert_eq!(decode(&text), vec!["Zlib", "abbrev", "rake"]);
    }

    #[test]
    fn test_empty() {
        assert_eq!(encode(Vec::<String>::new()), "---\n");
        assert!(decode("---\n").is_empty());
    }
}
