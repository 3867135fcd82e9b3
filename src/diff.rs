//! Structured view of Junos CLI configuration diffs.
//!
//! Junos prints differences grouped under `[edit <path>]` headers, one
//! statement per line prefixed with `+` or `-`:
//!
//! ```text
//! [edit system]
//! -  host-name old;
//! +  host-name new;
//! [edit interfaces ge-0/0/0 unit 0 family inet]
//! +       address 10.0.0.1/24;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change on one line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
}

/// One changed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    pub change_type: ChangeType,
    /// Statement text with the marker and indentation removed
    pub line: String,
}

/// Changes under one `[edit ...]` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stanza {
    /// Hierarchy path without the `edit` keyword; empty for top-level changes
    pub path: String,
    pub changes: Vec<LineChange>,
}

/// A parsed configuration diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDiff {
    pub stanzas: Vec<Stanza>,
}

impl ConfigDiff {
    /// Parse CLI diff text. Context lines and blank lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut stanzas: Vec<Stanza> = Vec::new();

        for raw in text.lines() {
            let line = raw.trim_end();
            if let Some(path) = line
                .trim_start()
                .strip_prefix("[edit")
                .and_then(|rest| rest.strip_suffix(']'))
            {
                stanzas.push(Stanza {
                    path: path.trim().to_string(),
                    changes: Vec::new(),
                });
                continue;
            }

            let change_type = match line.chars().next() {
                Some('+') => ChangeType::Added,
                Some('-') => ChangeType::Removed,
                _ => continue,
            };
            let statement = line[1..].trim();
            if statement.is_empty() {
                continue;
            }

            if stanzas.is_empty() {
                stanzas.push(Stanza::default());
            }
            if let Some(stanza) = stanzas.last_mut() {
                stanza.changes.push(LineChange {
                    change_type,
                    line: statement.to_string(),
                });
            }
        }

        stanzas.retain(|s| !s.changes.is_empty());
        Self { stanzas }
    }

    /// Whether there is no change at all.
    pub fn is_empty(&self) -> bool {
        self.stanzas.is_empty()
    }

    /// `(path, statement)` pairs for every added line.
    pub fn added(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines(ChangeType::Added)
    }

    /// `(path, statement)` pairs for every removed line.
    pub fn removed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines(ChangeType::Removed)
    }

    /// Number of added and removed lines.
    pub fn counts(&self) -> (usize, usize) {
        (self.added().count(), self.removed().count())
    }

    fn lines(&self, kind: ChangeType) -> impl Iterator<Item = (&str, &str)> {
        self.stanzas.iter().flat_map(move |s| {
            s.changes
                .iter()
                .filter(move |c| c.change_type == kind)
                .map(move |c| (s.path.as_str(), c.line.as_str()))
        })
    }
}

impl fmt::Display for ConfigDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stanza in &self.stanzas {
            if !stanza.path.is_empty() {
                writeln!(f, "[edit {}]", stanza.path)?;
            }
            for change in &stanza.changes {
                let sign = match change.change_type {
                    ChangeType::Added => '+',
                    ChangeType::Removed => '-',
                };
                writeln!(f, "{}  {}", sign, change.line)?;
            }
        }
        Ok(())
    }
}
