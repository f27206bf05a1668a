//! Fatal, user-facing diagnostics.
//!
//! A [`Diagnostic`] explains a failure a developer has to act on: what
//! happened, the data collected at the failure site, and the fixes worth
//! trying. It renders as a sectioned, plain-text report.

use std::fmt;

const RULE_WIDTH: usize = 50;

/// A structured report for conditions that cannot be recovered locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostic {
    what: String,
    intelligence: Vec<(String, String)>,
    solutions: Vec<String>,
    references: Vec<String>,
}

impl Diagnostic {
    /// Start a report describing what happened.
    #[must_use]
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            ..Self::default()
        }
    }

    /// Attach a piece of data relevant to the failure.
    #[must_use]
    pub fn with_intelligence(mut self, key: impl Into<String>, value: impl fmt::Debug) -> Self {
        self.intelligence.push((key.into(), format!("{value:?}")));
        self
    }

    /// Suggest a fix. Solutions are numbered in insertion order.
    #[must_use]
    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solutions.push(solution.into());
        self
    }

    /// Point at further reading.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    #[must_use]
    pub fn what(&self) -> &str {
        &self.what
    }

    #[must_use]
    pub fn intelligence(&self) -> &[(String, String)] {
        &self.intelligence
    }

    #[must_use]
    pub fn solutions(&self) -> &[String] {
        &self.solutions
    }

    #[must_use]
    pub fn references(&self) -> &[String] {
        &self.references
    }
}

fn heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    let prefix = format!("---- {title} ");
    let fill = RULE_WIDTH.saturating_sub(prefix.len());
    writeln!(f)?;
    writeln!(f, "{prefix}{}", "-".repeat(fill))?;
    writeln!(f)
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "What happened?")?;
        writeln!(f, "{}", self.what)?;

        if !self.intelligence.is_empty() {
            heading(f, "Intelligence")?;
            writeln!(f, "This is the relevant data we have:")?;
            for (key, value) in &self.intelligence {
                writeln!(f)?;
                writeln!(f, "  `{key}`:")?;
                writeln!(f, "      {value}")?;
            }
        }

        for (i, solution) in self.solutions.iter().enumerate() {
            heading(f, &format!("Possible solution (#{})", i + 1))?;
            writeln!(f, "{solution}")?;
        }

        if !self.references.is_empty() {
            heading(f, "References")?;
            for reference in &self.references {
                writeln!(f, "  {reference}")?;
            }
        }

        heading(f, "Need further assistance?")?;
        write!(
            f,
            "Run with DRAFTY_LOG=trace to capture the event sequence that led here."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_all_sections_in_order() {
        let diag = Diagnostic::new("the store vanished")
            .with_intelligence("key", "count")
            .with_solution("register a store")
            .with_solution("use MemoryStore")
            .with_reference("docs/persistence.md");

        let text = diag.to_string();
        let what = text.find("What happened?").unwrap();
        let intel = text.find("Intelligence").unwrap();
        let first = text.find("Possible solution (#1)").unwrap();
        let second = text.find("Possible solution (#2)").unwrap();
        let refs = text.find("References").unwrap();

        assert!(what < intel && intel < first && first < second && second < refs);
        assert!(text.contains("the store vanished"));
        assert!(text.contains("`key`:"));
        assert!(text.contains("\"count\""));
        assert!(text.contains("docs/persistence.md"));
    }

    #[test]
    fn optional_sections_are_omitted() {
        let text = Diagnostic::new("boom").to_string();
        assert!(!text.contains("Intelligence"));
        assert!(!text.contains("Possible solution"));
        assert!(!text.contains("References"));
        assert!(text.contains("Need further assistance?"));
    }

    #[test]
    fn accessors() {
        let diag = Diagnostic::new("x").with_solution("y");
        assert_eq!(diag.what(), "x");
        assert_eq!(diag.solutions(), ["y".to_string()]);
        assert!(diag.references().is_empty());
        assert!(diag.intelligence().is_empty());
    }
}
