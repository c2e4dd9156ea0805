//! Migration receipt
//!
//! The receipt is the durable artifact of a run: one record per entity
//! decision, in processing order, followed by a summary. Records are
//! write-once; the receipt only grows.
//!
//! # Text layout
//! ```text
//! == MIGRATION RECEIPT ==
//! Run: 01JAB...
//! Mode: projects (compare)
//! ...
//! MATCH: project 'infra' -> existing id 12, key=https://git.example.com/infra@main (matched reference 'infra')
//! CREATED: project 'PROD_web' -> id 90, key=https://git.example.com/web@(default) (created)
//!
//! Summary:
//!   Processed: 2
//!   ...
//! ```

use crate::error::MigrationError;
use chrono::{DateTime, Utc};
use mig_model::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Result of a create decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "id", rename_all = "snake_case")]
pub enum Creation {
    /// Created on the target
    Applied(EntityId),
    /// Would have been created (dry-run)
    DryRun,
}

/// Per-entity classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// Already represented; nothing mutated
    Matched { existing: EntityId },
    /// Created (or would be)
    Created(Creation),
    /// Not considered (name filter)
    Skipped { reason: String },
    /// Failed; the run continued
    Failed { error_kind: String, message: String },
}

impl Outcome {
    /// Failed outcome from an error
    #[must_use]
    pub fn failed(err: &MigrationError) -> Self {
        Self::Failed {
            error_kind: err.kind_label().to_string(),
            message: err.detail(),
        }
    }

    /// Whether this outcome counts as processed
    #[inline]
    #[must_use]
    pub fn is_processed(&self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }

    /// Text-receipt tag
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Matched { .. } => "MATCH",
            Self::Created(Creation::Applied(_)) => "CREATED",
            Self::Created(Creation::DryRun) => "DRYRUN-CREATE",
            Self::Skipped { .. } => "SKIP",
            Self::Failed { .. } => "ERROR",
        }
    }
}

/// One receipt line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    /// Position in the run, starting at 1
    pub seq: usize,
    pub kind: EntityKind,
    /// Name the decision was made for (prefixed when applicable)
    pub name: String,
    /// Id on the source platform
    pub source_id: Option<EntityId>,
    /// Rendered natural key used for matching
    pub natural_key: Option<String>,
    pub outcome: Outcome,
    /// Why the entity was classified this way
    pub reason: String,
}

impl ReceiptRecord {
    /// Render as one text line
    #[must_use]
    pub fn render(&self) -> String {
        let tag = self.outcome.tag();
        let key = self
            .natural_key
            .as_deref()
            .map(|k| format!(", key={k}"))
            .unwrap_or_default();
        match &self.outcome {
            Outcome::Matched { existing } => format!(
                "{tag}: {} '{}' -> existing id {existing}{key} ({})",
                self.kind, self.name, self.reason
            ),
            Outcome::Created(Creation::Applied(id)) => format!(
                "{tag}: {} '{}' -> id {id}{key} ({})",
                self.kind, self.name, self.reason
            ),
            Outcome::Created(Creation::DryRun) => {
                format!("{tag}: {} '{}'{key} ({})", self.kind, self.name, self.reason)
            }
            Outcome::Skipped { reason } => format!("{tag}: {} '{}' ({reason})", self.kind, self.name),
            Outcome::Failed {
                error_kind,
                message,
            } => format!(
                "{tag}: {} '{}'{key} ({}): [{error_kind}] {message}",
                self.kind, self.name, self.reason
            ),
        }
    }
}

/// Run parameters printed at the top of the receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptHeader {
    pub run_id: String,
    pub mode: String,
    pub source: String,
    pub reference: Option<String>,
    pub target: String,
    pub organization: EntityId,
    pub dry_run: bool,
    pub prefix: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl ReceiptHeader {
    /// Header for a run between two hosts, started now
    ///
    /// Mode, organization, dry-run and prefix are filled in by the
    /// orchestrator when the run starts.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            run_id: String::new(),
            mode: String::new(),
            source: source.into(),
            reference: None,
            target: target.into(),
            organization: EntityId(0),
            dry_run: false,
            prefix: None,
            started_at: Utc::now(),
        }
    }

    /// With reference host (compare mode)
    #[inline]
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// `matched + created + failed`
    pub processed: usize,
    pub matched: usize,
    /// Applied and dry-run creations
    pub created: usize,
    /// Dry-run share of `created`
    pub would_create: usize,
    pub filtered: usize,
    pub failed: usize,
}

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No failures
    Clean,
    /// Some failures
    Partial,
    /// Every processed entity failed
    Failed,
}

impl RunStatus {
    /// Process exit code
    #[inline]
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Clean => 0,
            Self::Partial => 2,
            Self::Failed => 1,
        }
    }
}

/// Ordered outcome log of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub header: ReceiptHeader,
    records: Vec<ReceiptRecord>,
}

impl Receipt {
    /// Create empty receipt
    #[must_use]
    pub fn new(header: ReceiptHeader) -> Self {
        Self {
            header,
            records: Vec::new(),
        }
    }

    /// Append a record, assigning its sequence number
    pub(crate) fn push(&mut self, mut record: ReceiptRecord) -> &ReceiptRecord {
        record.seq = self.records.len() + 1;
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// Records in processing order
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[ReceiptRecord] {
        &self.records
    }

    /// Count outcomes
    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for record in &self.records {
            match &record.outcome {
                Outcome::Matched { .. } => summary.matched += 1,
                Outcome::Created(creation) => {
                    summary.created += 1;
                    if *creation == Creation::DryRun {
                        summary.would_create += 1;
                    }
                }
                Outcome::Skipped { .. } => summary.filtered += 1,
                Outcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary.processed = summary.matched + summary.created + summary.failed;
        summary
    }

    /// Overall status
    #[must_use]
    pub fn status(&self) -> RunStatus {
        let summary = self.summary();
        if summary.failed == 0 {
            RunStatus::Clean
        } else if summary.failed == summary.processed {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }

    /// Human-readable rendering
    #[must_use]
    pub fn render_text(&self) -> String {
        let h = &self.header;
        let mut out = String::from("== MIGRATION RECEIPT ==\n");
        let _ = writeln!(out, "Run: {}", h.run_id);
        let _ = writeln!(out, "Started: {}", h.started_at.to_rfc3339());
        let _ = writeln!(out, "Mode: {}", h.mode);
        let _ = writeln!(out, "Source: {}", h.source);
        if let Some(reference) = &h.reference {
            let _ = writeln!(out, "Reference: {reference}");
        }
        let _ = writeln!(out, "Target: {}", h.target);
        let _ = writeln!(out, "OrgID: {}", h.organization);
        let _ = writeln!(out, "DryRun: {}", h.dry_run);
        if let Some(prefix) = &h.prefix {
            let _ = writeln!(out, "Prefix: {prefix}");
        }
        out.push('\n');

        for record in &self.records {
            out.push_str(&record.render());
            out.push('\n');
        }

        let s = self.summary();
        out.push_str("\nSummary:\n");
        let _ = writeln!(out, "  Processed: {}", s.processed);
        let _ = writeln!(out, "  Matched:   {}", s.matched);
        let _ = writeln!(out, "  Created:   {} (dry-run: {})", s.created, s.would_create);
        let _ = writeln!(out, "  Filtered:  {}", s.filtered);
        let _ = writeln!(out, "  Failed:    {}", s.failed);
        out
    }

    /// Machine-readable rendering (records plus summary)
    ///
    /// # Errors
    /// Returns a serialization error (not expected for well-formed records).
    pub fn to_json(&self) -> Result<String, MigrationError> {
        let doc = serde_json::json!({
            "header": self.header,
            "records": self.records,
            "summary": self.summary(),
            "status": self.status(),
        });
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Write to `path`: JSON when the extension is `.json`, text otherwise
    ///
    /// # Errors
    /// Returns an I/O or serialization error.
    pub fn write_to(&self, path: &Path) -> Result<(), MigrationError> {
        let body = if path.extension().is_some_and(|ext| ext == "json") {
            self.to_json()?
        } else {
            self.render_text()
        };
        std::fs::write(path, body)?;
        Ok(())
    }

    /// Write to `path`, logging instead of failing
    pub fn persist(&self, path: &Path) -> bool {
        match self.write_to(path) {
            Ok(()) => {
                tracing::info!("Receipt written to: {}", path.display());
                true
            }
            Err(e) => {
                tracing::warn!("Failed to write receipt to {}: {}", path.display(), e);
                false
            }
        }
    }
}
