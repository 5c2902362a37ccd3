//! Per-run accumulator: counts, duplicate identifiers, error histogram and the
//! list of invalid records. One instance per invocation, fed record outcomes in
//! input order.
use std::collections::HashMap;
use std::fmt;

use crate::diag::{Diagnostic, Issue};

/// How a record is named in reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordId {
    /// 1-based position (line number in line mode).
    Number(usize),
    /// Value extracted with the `--id` selector.
    Selected(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Selected(id) => f.write_str(id),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Valid,
    Invalid(Vec<Diagnostic>),
    /// Unparsable text; carries the parser message.
    Bad(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordOutcome {
    pub number: usize,
    pub id: RecordId,
    /// Shortened record text, filled for invalid records only.
    pub preview: String,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
pub struct RunStats {
    pub total: usize,
    pub invalid: usize,
    pub bad: usize,
    pub duplicates: usize,
    histogram: HashMap<String, usize>,
    invalid_ids: Vec<RecordId>,
    first_seen: HashMap<String, usize>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one outcome in. Returns the record number first carrying the same
    /// selected identifier, when this record repeats it.
    pub fn record(&mut self, record: &RecordOutcome) -> Option<usize> {
        self.total += 1;
        match &record.outcome {
            Outcome::Valid => {}
            Outcome::Invalid(diagnostics) => {
                self.invalid += 1;
                for d in diagnostics {
                    self.count(d);
                }
                self.invalid_ids.push(record.id.clone());
            }
            Outcome::Bad(_) => self.bad += 1,
        }
        let RecordId::Selected(id) = &record.id else { return None };
        match self.first_seen.get(id) {
            Some(&first) => {
                self.duplicates += 1;
                Some(first)
            }
            None => {
                self.first_seen.insert(id.clone(), record.number);
                None
            }
        }
    }

    /// Every reported line is counted, union branches included.
    fn count(&mut self, d: &Diagnostic) {
        *self.histogram.entry(d.kind_key()).or_default() += 1;
        if let Issue::NoAlternative(branches) = &d.issue {
            for branch in branches {
                for inner in branch {
                    self.count(inner);
                }
            }
        }
    }

    pub fn all_valid(&self) -> bool {
        self.invalid == 0 && self.bad == 0
    }

    pub fn summary(&self) -> String {
        let mut line = if self.all_valid() {
            format!("All {} objects are valid", show_count(self.total, 0))
        } else {
            format!(
                "{} objects read: {} invalid, {} bad",
                show_count(self.total, 0),
                show_count(self.invalid, 0),
                show_count(self.bad, 0)
            )
        };
        if self.duplicates > 0 {
            line.push_str(&format!(", {} duplicate ids", show_count(self.duplicates, 0)));
        }
        line
    }

    /// Histogram entries, most frequent first; equal counts by key.
    pub fn histogram(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> = self.histogram.iter().map(|(k, n)| (k.as_str(), *n)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    pub fn render_histogram(&self) -> String {
        let mut out = String::from("Error Statistics\n");
        for (key, count) in self.histogram() {
            out.push_str(&format!("{}\t{key}\n", show_count(count, 15)));
        }
        out
    }

    /// One sed command per invalid record, deleting it from the input.
    pub fn sed_commands(&self) -> Vec<String> {
        self.invalid_ids
            .iter()
            .map(|id| match id {
                RecordId::Number(n) => format!("{n}d"),
                RecordId::Selected(id) => format!("/{}/d", id.replace('\\', "\\\\").replace('/', "\\/")),
            })
            .collect()
    }

    /// Process exit status: the invalid count, saturated to what a status can hold.
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.invalid).unwrap_or(u8::MAX)
    }
}

/// `n` with space-separated thousands, right-aligned to `width`.
pub fn show_count(n: usize, width: usize) -> String {
    let digits = n.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    format!("{grouped:>width$}")
}

// ------------------------------- Tests ------------------------------------ //
