//! Human-reviewable summary of a plan.
//!
//! Rendered before execution so a user can confirm what will be written.

use std::fmt;

use serde::Serialize;

use crate::plan::{Plan, WriteUnit};
use crate::types::{ContentEncoding, EncodedFile};

/// One file's share of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummaryLine {
    /// First segment of a file, inside a batch.
    Create {
        path: String,
        bytes_sent: u64,
        total_size: u64,
        original_size: u64,
        encoding: ContentEncoding,
        segment_count: usize,
        replaces_existing: bool,
    },
    /// Continuation segment.
    Append {
        path: String,
        bytes_sent: u64,
        /// 1-based.
        segment_number: usize,
        segment_count: usize,
    },
}

/// Summary of one write unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSummary {
    /// Position in the plan.
    pub unit_index: usize,
    /// Payload bytes carried by the unit.
    pub payload_bytes: u64,
    /// One line per write operation.
    pub lines: Vec<SummaryLine>,
}

/// Summary of a whole plan plus the files it leaves alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    /// Units in plan order.
    pub units: Vec<UnitSummary>,
    /// Payload bytes of the whole plan.
    pub total_bytes: u64,
    /// Distinct files written.
    pub file_count: usize,
    /// Paths skipped as identical remotely.
    pub skipped: Vec<String>,
}

impl PlanSummary {
    /// Summarize `plan`, listing `skipped` files separately.
    pub fn new(plan: &Plan, skipped: &[EncodedFile]) -> Self {
        let units: Vec<UnitSummary> = plan
            .units
            .iter()
            .enumerate()
            .map(|(unit_index, unit)| UnitSummary {
                unit_index,
                payload_bytes: unit.payload_bytes(),
                lines: unit_lines(unit),
            })
            .collect();

        let file_count: usize = units
            .iter()
            .flat_map(|u| &u.lines)
            .filter(|line| matches!(line, SummaryLine::Create { .. }))
            .count();

        Self {
            units,
            total_bytes: plan.total_bytes(),
            file_count,
            skipped: skipped.iter().map(|f| f.path.clone()).collect(),
        }
    }

    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Plan {
    /// Summary of this plan alone.
    pub fn summary(&self) -> PlanSummary {
        PlanSummary::new(self, &[])
    }
}

fn unit_lines(unit: &WriteUnit) -> Vec<SummaryLine> {
    match unit {
        WriteUnit::Batch(ops) => ops
            .iter()
            .map(|op| SummaryLine::Create {
                path: op.path.clone(),
                bytes_sent: op.segment.length,
                total_size: op.total_size,
                original_size: op.original_size,
                encoding: op.encoding,
                segment_count: op.segment_count,
                replaces_existing: op.replaces_existing,
            })
            .collect(),
        WriteUnit::Append(op) => vec![SummaryLine::Append {
            path: op.path.clone(),
            bytes_sent: op.segment.length,
            segment_number: op.segment_index + 1,
            segment_count: op.segment_count,
        }],
    }
}

fn kb(bytes: u64) -> u64 {
    (bytes + 512) / 1024
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.units.is_empty() {
            writeln!(f, "All files are already uploaded. Nothing to do.")?;
        } else {
            writeln!(
                f,
                "{} write(s) needed, uploading {} KB",
                self.units.len(),
                kb(self.total_bytes)
            )?;
        }

        for unit in &self.units {
            writeln!(f)?;
            let label: &str = match unit.lines.first() {
                Some(SummaryLine::Append { .. }) => "Add data to file",
                _ => "Uploading files",
            };
            writeln!(f, "Write {}: {}", unit.unit_index + 1, label)?;

            for line in &unit.lines {
                match line {
                    SummaryLine::Create {
                        path,
                        bytes_sent,
                        total_size,
                        original_size,
                        encoding,
                        segment_count,
                        replaces_existing,
                    } => {
                        write!(f, " - {} ", path)?;
                        if *segment_count > 1 {
                            write!(
                                f,
                                "{}/{} KB (segment 1/{})",
                                kb(*bytes_sent),
                                kb(*total_size),
                                segment_count
                            )?;
                        } else {
                            write!(f, "{} KB", kb(*total_size))?;
                        }
                        if *encoding == ContentEncoding::Gzip {
                            write!(f, " (gzipped from {} KB)", kb(*original_size))?;
                        }
                        if *replaces_existing {
                            write!(f, " [overwrite existing file]")?;
                        }
                        writeln!(f)?;
                    }
                    SummaryLine::Append {
                        path,
                        bytes_sent,
                        segment_number,
                        segment_count,
                    } => {
                        writeln!(
                            f,
                            "   {} +{} KB (segment {}/{})",
                            path,
                            kb(*bytes_sent),
                            segment_number,
                            segment_count
                        )?;
                    }
                }
            }
        }

        if !self.skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped files (identical file already uploaded)")?;
            for path in &self.skipped {
                writeln!(f, " - {}", path)?;
            }
        }

        Ok(())
    }
}
