//! Header handling shared by all compact index files.
//!
//! Everything before the first bare `---` line is header (for `versions`,
//! a `created_at:` timestamp) and is discarded on read.

/// Line that ends the header
pub const SEPARATOR: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    InPreamble,
    InBody,
}

impl ParseState {
    /// Advance on one trimmed line; returns the line if it is body content
    pub fn feed<'a>(&mut self, line: &'a str) -> Option<&'a str> {
        match self {
            ParseState::InPreamble => {
                if line == SEPARATOR {
                    *self = ParseState::InBody;
                }
                None
            },
            ParseState::InBody if line.is_empty() => None,
            ParseState::InBody => Some(line),
        }
    }
}

/// Iterator over the non-empty body lines of a compact index document
#[derive(Debug, Clone)]
pub struct BodyLines<'a> {
    lines: std::str::Lines<'a>,
    state: ParseState,
}

impl<'a> BodyLines<'a> {
    pub fn state(&self) -> ParseState {
        self.state
    }
}

impl<'a> Iterator for BodyLines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            if let Some(body) = self.state.feed(line.trim()) {
                return Some(body);
            }
        }
        None
    }
}

pub fn body_lines(text: &str) -> BodyLines<'_> {
    BodyLines {
        lines: text.lines(),
        state: ParseState::InPreamble,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = ParseState::InPreamble;
        assert_eq!(state.feed("created_at: 2024-01-01T00:00:00Z"), None);
        assert_eq!(state, ParseState::InPreamble);
        assert_eq!(state.feed("---"), None);
        assert_eq!(state, ParseState::InBody);
        assert_eq!(state.feed("rake 13.0.6 abc"), Some("rake 13.0.6 abc"));
        // A second separator is ordinary body content
        assert_eq!(state.feed("---"), Some("---"));
    }

    #[test]
    fn test_body_lines_skip_header_and_blanks() {
        let text = "created_at: 2024-01-01T00:00:00Z\n---\nrake 1.0 abc\n\nrack 2.0\r\n";
        let lines: Vec<&str> = body_lines(text).collect();
        assert_eq!(lines, vec!["rake 1.0 abc", "rack 2.0"]);
    }

    #[test]
    fn test_missing_separator_yields_nothing() {
        let mut lines = body_lines("rake 1.0 abc\n");
        assert_eq!(lines.next(), None);
        assert_eq!(lines.state(), ParseState::InPreamble);
    }
}
