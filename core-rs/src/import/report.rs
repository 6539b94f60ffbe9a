use serde::Serialize;
use std::fmt;

use crate::checker::Diagnostic;
use crate::repo::ImportOutcome;

/// Summary of one import run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    /// Nodes that failed validation
    pub rejected: usize,
    /// Anonymous nodes
    pub skipped: usize,
    pub duplicates: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
}

impl ImportReport {
    pub fn record(&mut self, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Created => self.created += 1,
            ImportOutcome::Updated => self.updated += 1,
            ImportOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Number of remote writes the run performed
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "created:    {}", self.created)?;
        writeln!(f, "updated:    {}", self.updated)?;
        writeln!(f, "unchanged:  {}", self.unchanged)?;
        writeln!(f, "deleted:    {}", self.deleted)?;
        writeln!(f, "rejected:   {}", self.rejected)?;
        writeln!(f, "skipped:    {}", self.skipped)?;
        write!(f, "duplicates: {}", self.duplicates)?;
        if let Some(binary) = &self.binary {
            write!(f, "\nowl binary: {}", binary)?;
        }
        Ok(())
    }
}
