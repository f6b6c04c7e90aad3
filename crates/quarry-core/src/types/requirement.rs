//! Requirement expressions.
//!
//! A requirement is an `&`-joined conjunction of `op version` clauses, e.g.
//! `">= 1&< 3"`. Only the five plain comparison operators are recognised.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::version::{compare, is_valid_version};
use crate::error::{QuarryError, QuarryResult};

/// Comparison operator of a requirement clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Exact,     // = 1.0
    Less,      // < 1.0
    LessEq,    // <= 1.0
    Greater,   // > 1.0
    GreaterEq, // >= 1.0
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Exact => "=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
        }
    }

    /// Whether an ordering of `candidate` against the clause version passes
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Op::Exact => ordering == Ordering::Equal,
            Op::Less => ordering == Ordering::Less,
            Op::LessEq => ordering != Ordering::Greater,
            Op::Greater => ordering == Ordering::Greater,
            Op::GreaterEq => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `op version` constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause {
    pub op: Op,
    pub version: String,
}

impl Clause {
    pub fn new(op: Op, version: impl Into<String>) -> Self {
        Self {
            op,
            version: version.into(),
        }
    }

    /// Check if a version satisfies this clause
    pub fn matches(&self, version: &str) -> bool {
        self.op.accepts(compare(version, &self.version))
    }

    fn parse(input: &str) -> QuarryResult<Self> {
        let clause = input.trim();

        // Longest operators first so that `<=` is not read as `<`
        let (op, version) = if let Some(stripped) = clause.strip_prefix(">=") {
            (Op::GreaterEq, stripped)
        } else if let Some(stripped) = clause.strip_prefix("<=") {
            (Op::LessEq, stripped)
        } else if let Some(stripped) = clause.strip_prefix('>') {
            (Op::Greater, stripped)
        } else if let Some(stripped) = clause.strip_prefix('<') {
            (Op::Less, stripped)
        } else if let Some(stripped) = clause.strip_prefix('=') {
            (Op::Exact, stripped)
        } else {
            return Err(QuarryError::validation(
                "requirement",
                input,
                "expected one of the operators =, <, <=, >, >=",
            ));
        };

        let version = version.trim();
        if !is_valid_version(version) {
            return Err(QuarryError::validation(
                "requirement",
                input,
                format!("'{}' is not a valid version", version),
            ));
        }

        Ok(Self::new(op, version))
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.version)
    }
}

/// Conjunction of clauses
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Requirement {
    pub clauses: Vec<Clause>,
}

impl Requirement {
    /// Parse an `&`-joined requirement expression
    pub fn parse(input: &str) -> QuarryResult<Self> {
        if input.trim().is_empty() {
            return Err(QuarryError::validation(
                "requirement",
                input,
                "requirement must not be empty",
            ));
        }

        let clauses = input
            .split('&')
            .map(Clause::parse)
            .collect::<QuarryResult<Vec<_>>>()?;

        Ok(Self { clauses })
    }

    /// Check if a version satisfies every clause
    pub fn matches(&self, version: &str) -> bool {
        self.clauses.iter().all(|clause| clause.matches(version))
    }
}

impl FromStr for Requirement {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Requirement {
    type Error = QuarryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Requirement> for String {
    fn from(requirement: Requirement) -> Self {
        requirement.to_string()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, clause) in self.clauses.iter().enumerate() {
            if idx > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}

/// Evaluate a requirement expression against a version
pub fn satisfies(requirement: &str, version: &str) -> QuarryResult<bool> {
    Ok(Requirement::parse(requirement)?.matches(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjunction() {
        let req = ">= 1&< 3";
        assert!(satisfies(req, "1.0.0").unwrap());
        assert!(satisfies(req, "2.0.0").unwrap());
        assert!(satisfies(req, "1.5.a0").unwrap());
        assert!(satisfies(req, "3.0.0a5").unwrap());
        assert!(!satisfies(req, "3.0.0").unwrap());
        assert!(!satisfies(req, "3.0.1a5").unwrap());
        assert!(!satisfies(req, "0.9").unwrap());
    }

    #[test]
    fn test_operators() {
        assert!(satisfies("= 1.0", "1").unwrap());
        assert!(!satisfies("= 1.0", "1.0.1").unwrap());
        assert!(satisfies("<= 1.0", "1.0.0").unwrap());
        assert!(satisfies("<= 1.0", "0.9").unwrap());
        assert!(!satisfies("< 1.0", "1.0").unwrap());
        assert!(satisfies("> 1.0", "1.0.1").unwrap());
        assert!(!satisfies("> 1.0", "1.0").unwrap());
        assert!(satisfies(">= 1.0", "1.0").unwrap());
    }

    #[test]
    fn test_parse_without_space() {
        let req = Requirement::parse(">=1.2&<2").unwrap();
        assert_eq!(req.clauses.len(), 2);
        assert_eq!(req.clauses[0], Clause::new(Op::GreaterEq, "1.2"));
        assert_eq!(req.to_string(), ">= 1.2&< 2");
    }

    #[test]
    fn test_unsupported_operator() {
        assert!(Requirement::parse("~> 1.0").is_err());
        assert!(Requirement::parse("!= 1.0").is_err());
        assert!(Requirement::parse("1.0").is_err());
        assert!(Requirement::parse("=> 1.0").is_err());
        assert!(Requirement::parse("").is_err());
        assert!(Requirement::parse(">= 1&").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let req: Requirement = serde_json::from_str("\">= 1&< 3\"").unwrap();
        assert!(req.matches("2"));
        assert_eq!(serde_json::to_string(&req).unwrap(), "\">= 1&< 3\"");
        assert!(serde_json::from_str::<Requirement>("\"~> 1\"").is_err());
    }
}
