//! Validation of a stream of record texts against one compiled document.
use rayon::prelude::*;
use tracing::info;

use crate::diag::show_val;
use crate::ir::SchemaDocument;
use crate::record::{parse_record, select_id};
use crate::report::{Outcome, RecordId, RecordOutcome, RunStats};
use crate::split::split_records;
use crate::validate::Validator;

/// Progress is logged at this interval when per-record output is off.
pub const PROGRESS_EVERY: usize = 10_000;

/// Width of the record text echoed in front of its diagnostics.
pub const PREVIEW_WIDTH: usize = 100;

#[derive(Clone, Debug, Default)]
pub struct StreamOptions {
    /// `/`-separated selector naming each record, e.g. `_id/$oid`.
    pub id: Option<String>,
    pub strict_keys: bool,
    pub parallel: bool,
    pub progress: bool,
}

/// Numbered record texts: one per non-blank line, numbered by line.
pub fn line_records(input: &str) -> Vec<(usize, String)> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect()
}

/// Numbered record texts framed by nesting depth.
pub fn split_stream(input: &str) -> Vec<(usize, String)> {
    split_records(input).enumerate().map(|(i, text)| (i + 1, text)).collect()
}

pub fn check_record(validator: &mut Validator<'_>, number: usize, text: &str, options: &StreamOptions) -> RecordOutcome {
    let value = match parse_record(text, options.strict_keys) {
        Ok(value) => value,
        Err(err) => {
            let outcome = Outcome::Bad(err.to_string());
            return RecordOutcome { number, id: RecordId::Number(number), preview: String::new(), outcome };
        }
    };
    let id = options
        .id
        .as_deref()
        .and_then(|selector| select_id(&value, selector))
        .map_or(RecordId::Number(number), RecordId::Selected);
    let diagnostics = validator.validate(&value);
    if diagnostics.is_empty() {
        return RecordOutcome { number, id, preview: String::new(), outcome: Outcome::Valid };
    }
    let preview = show_val(&value, PREVIEW_WIDTH);
    RecordOutcome { number, id, preview, outcome: Outcome::Invalid(diagnostics) }
}

/// Validates every record and folds the outcomes, in input order, into `stats`.
/// `sink` sees each outcome with the first record number of its identifier when
/// that identifier was already seen.
pub fn run(
    doc: &SchemaDocument,
    records: &[(usize, String)],
    options: &StreamOptions,
    stats: &mut RunStats,
    mut sink: impl FnMut(&RecordOutcome, Option<usize>),
) {
    let outcomes: Vec<RecordOutcome> = if options.parallel {
        records
            .par_iter()
            .map_init(|| Validator::new(doc), |validator, (n, text)| check_record(validator, *n, text, options))
            .collect()
    } else {
        let mut validator = Validator::new(doc);
        records.iter().map(|(n, text)| check_record(&mut validator, *n, text, options)).collect()
    };
    for outcome in &outcomes {
        let duplicate_of = stats.record(outcome);
        sink(outcome, duplicate_of);
        if options.progress && stats.total % PROGRESS_EVERY == 0 {
            info!(records = stats.total, "processing");
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;

    const SCHEMA: &str = "start = {id: string, n: integer @(minimum=0)}";

    fn stats_of(
        doc: &SchemaDocument,
        records: &[(usize, String)],
        options: &StreamOptions,
        sink: impl FnMut(&RecordOutcome, Option<usize>),
    ) -> RunStats {
        let mut stats = RunStats::new();
        run(doc, records, options, &mut stats, sink);
        stats
    }

    #[test]
    fn malformed_record_is_bad_and_the_rest_are_checked() {
        let doc = compile(SCHEMA).unwrap();
        let input = "{\"id\":\"a\",\"n\":1}\n{\"id\":\"b\",\n\n{\"id\":\"c\",\"n\":-1}\n{\"id\":\"d\",\"n\":2}\n";
        let records = line_records(input);
        assert_eq!(records.iter().map(|r| r.0).collect::<Vec<_>>(), vec![1, 2, 4, 5]);
        let stats = stats_of(&doc, &records, &StreamOptions::default(), |_, _| {});
        assert_eq!((stats.total, stats.invalid, stats.bad), (4, 1, 1));
        assert_eq!(stats.sed_commands(), vec!["4d".to_string()]);
    }

    #[test]
    fn invalid_records_keep_a_preview() {
        let doc = compile(SCHEMA).unwrap();
        let mut validator = Validator::new(&doc);
        let outcome = check_record(&mut validator, 3, r#"{"id": "a", "n": -4}"#, &StreamOptions::default());
        assert_eq!(outcome.preview, r#"{"id":"a","n":-4}"#);
        assert!(matches!(&outcome.outcome, Outcome::Invalid(d) if d.len() == 1));
        let outcome = check_record(&mut validator, 4, r#"{"id": "a", "n": 4}"#, &StreamOptions::default());
        assert_eq!((outcome.preview.as_str(), &outcome.outcome), ("", &Outcome::Valid));
    }

    #[test]
    fn stats_accumulate_across_runs() {
        let doc = compile(SCHEMA).unwrap();
        let mut stats = RunStats::new();
        run(&doc, &line_records("{\"id\":\"a\",\"n\":1}"), &StreamOptions::default(), &mut stats, |_, _| {});
        run(&doc, &line_records("nope\n{\"id\":\"a\",\"n\":1}"), &StreamOptions::default(), &mut stats, |_, _| {});
        assert_eq!(stats.summary(), "3 objects read: 0 invalid, 1 bad");
    }

    #[test]
    fn parallel_run_matches_sequential() {
        let doc = compile(SCHEMA).unwrap();
        let input: String = (0..200)
            .map(|i| if i % 7 == 0 { format!("{{\"id\":\"{i}\",\"n\":-1}}\n") } else { format!("{{\"id\":\"{i}\",\"n\":{i}}}\n") })
            .collect();
        let records = line_records(&input);
        let options = StreamOptions { id: Some("id".into()), ..StreamOptions::default() };
        let mut seq_order = Vec::new();
        let seq = stats_of(&doc, &records, &options, |o, _| seq_order.push(o.number));
        let par_options = StreamOptions { parallel: true, ..options };
        let mut par_order = Vec::new();
        let par = stats_of(&doc, &records, &par_options, |o, _| par_order.push(o.number));
        assert_eq!(seq_order, par_order);
        assert_eq!((seq.total, seq.invalid), (par.total, par.invalid));
        assert_eq!(seq.sed_commands(), par.sed_commands());
        assert_eq!(seq.render_histogram(), par.render_histogram());
        assert_eq!(seq.invalid, 29);
    }

    #[test]
    fn split_mode_ids_and_duplicates() {
        let doc = compile(SCHEMA).unwrap();
        let input = "{\"id\": \"x\", \"n\": 1}\n{\n \"id\": \"x\",\n \"n\": 2\n}{\"n\": 3, \"id\": \"y\"}";
        let records = split_stream(input);
        assert_eq!(records.len(), 3);
        let options = StreamOptions { id: Some("id".into()), ..StreamOptions::default() };
        let mut duplicates = Vec::new();
        let stats = stats_of(&doc, &records, &options, |o, dup| {
            if let Some(first) = dup {
                duplicates.push((o.number, first));
            }
        });
        assert_eq!(duplicates, vec![(2, 1)]);
        assert_eq!(stats.summary(), "All 3 objects are valid, 1 duplicate ids");
    }

    #[test]
    fn strict_keys_turn_duplicates_into_bad_records() {
        let doc = compile(SCHEMA).unwrap();
        let records = line_records("{\"id\":\"a\",\"n\":1,\"n\":2}");
        let lenient = stats_of(&doc, &records, &StreamOptions::default(), |_, _| {});
        assert_eq!(lenient.bad, 0);
        let strict = StreamOptions { strict_keys: true, ..StreamOptions::default() };
        assert_eq!(stats_of(&doc, &records, &strict, |_, _| {}).bad, 1);
    }
}
