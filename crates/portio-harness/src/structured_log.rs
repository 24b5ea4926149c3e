//! JSONL run evidence for fixture verification.
//!
//! Every replayed case becomes one [`LogEntry`] line. Lines carry a trace id
//! of the form `<prefix>::<run>::<seq>` assigned by the [`LogEmitter`], and
//! [`validate_log_file`] checks a finished log against the same schema.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
}

/// One line of run evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ns: Option<u64>,
    /// Expected/actual diff of a failed case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl LogEntry {
    /// Free-standing event without a case. The emitter assigns the trace id.
    #[must_use]
    pub fn event(level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: String::new(),
            level,
            event: event.into(),
            campaign: None,
            family: None,
            case: None,
            outcome: None,
            latency_ns: None,
            diff: None,
        }
    }

    /// Result of one fixture case. Failures log at error level.
    #[must_use]
    pub fn case_result(campaign: &str, family: &str, case: &str, outcome: Outcome) -> Self {
        let level = match outcome {
            Outcome::Pass => LogLevel::Info,
            Outcome::Fail => LogLevel::Error,
        };
        Self {
            campaign: Some(campaign.to_string()),
            family: Some(family.to_string()),
            case: Some(case.to_string()),
            outcome: Some(outcome),
            ..Self::event(level, "fixture_case")
        }
    }

    #[must_use]
    pub fn with_latency_ns(mut self, ns: u64) -> Self {
        self.latency_ns = Some(ns);
        self
    }

    #[must_use]
    pub fn with_diff(mut self, diff: impl Into<String>) -> Self {
        self.diff = Some(diff.into());
        self
    }
}

/// Appends entries to a JSONL sink, numbering them as it goes.
pub struct LogEmitter {
    sink: Box<dyn Write>,
    prefix: String,
    run_id: String,
    emitted: u64,
}

impl LogEmitter {
    pub fn to_file(path: &Path, prefix: &str, run_id: &str) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_sink(Box::new(BufWriter::new(file)), prefix, run_id))
    }

    /// Emitter whose output is kept in memory and dropped with it.
    #[must_use]
    pub fn to_buffer(prefix: &str, run_id: &str) -> Self {
        Self::with_sink(Box::new(Vec::new()), prefix, run_id)
    }

    fn with_sink(sink: Box<dyn Write>, prefix: &str, run_id: &str) -> Self {
        Self {
            sink,
            prefix: prefix.to_string(),
            run_id: run_id.to_string(),
            emitted: 0,
        }
    }

    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Stamp `entry` with the next trace id and write it as one line.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> io::Result<()> {
        self.emitted += 1;
        entry.trace_id = format!("{}::{}::{:03}", self.prefix, self.run_id, self.emitted);
        serde_json::to_writer(&mut self.sink, &entry)?;
        self.sink.write_all(b"\n")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Why a log line was rejected.
#[derive(Debug, Error)]
pub enum LogLineError {
    #[error("line {line}: {source}")]
    Schema {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: trace_id {trace_id:?} is not <prefix>::<run>::<seq>")]
    TraceId { line: usize, trace_id: String },
    #[error("line {line}: {field} is only meaningful with a case")]
    MissingCase { line: usize, field: &'static str },
}

fn trace_id_is_well_formed(trace_id: &str) -> bool {
    let parts: Vec<_> = trace_id.split("::").collect();
    matches!(parts.as_slice(), [prefix, run, seq]
        if !prefix.is_empty() && !run.is_empty() && seq.parse::<u64>().is_ok())
}

/// Parse one line and check the cross-field rules serde cannot express.
pub fn validate_log_line(text: &str, line: usize) -> Result<LogEntry, LogLineError> {
    let entry: LogEntry =
        serde_json::from_str(text).map_err(|source| LogLineError::Schema { line, source })?;
    if !trace_id_is_well_formed(&entry.trace_id) {
        return Err(LogLineError::TraceId {
            line,
            trace_id: entry.trace_id,
        });
    }
    if entry.case.is_none() {
        let orphan = [
            ("outcome", entry.outcome.is_some()),
            ("diff", entry.diff.is_some()),
        ]
        .into_iter()
        .find_map(|(field, present)| present.then_some(field));
        if let Some(field) = orphan {
            return Err(LogLineError::MissingCase { line, field });
        }
    }
    Ok(entry)
}

/// Validate every non-blank line of a JSONL file, returning the number of
/// lines checked and the errors found.
pub fn validate_log_file(path: &Path) -> io::Result<(usize, Vec<LogLineError>)> {
    let content = std::fs::read_to_string(path)?;
    let mut checked = 0;
    let mut errors = Vec::new();
    for (index, text) in content.lines().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        checked += 1;
        if let Err(err) = validate_log_line(text, index + 1) {
            errors.push(err);
        }
    }
    Ok((checked, errors))
}

/// Seconds and milliseconds since the Unix epoch, as `<secs>.<millis>Z`.
fn now_utc() -> String {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:03}Z", elapsed.as_secs(), elapsed.subsec_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(entry: LogEntry) -> String {
        let mut entry = entry;
        entry.trace_id = "portio::unit::001".to_string();
        serde_json::to_string(&entry).unwrap()
    }

    #[test]
    fn passing_case_omits_diff() {
        let json = stamped(LogEntry::case_result("ci", "chars", "euro", Outcome::Pass));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["level"], "info");
        assert_eq!(value["outcome"], "pass");
        assert!(value.get("diff").is_none());
        assert!(validate_log_line(&json, 1).is_ok());
    }

    #[test]
    fn failing_case_logs_at_error_level() {
        let entry = LogEntry::case_result("ci", "seek", "tell", Outcome::Fail)
            .with_latency_ns(900)
            .with_diff("-pos:1\n+pos:2\n");
        assert_eq!(entry.level, LogLevel::Error);
        let restored = validate_log_line(&stamped(entry), 4).unwrap();
        assert_eq!(restored.latency_ns, Some(900));
        assert_eq!(restored.diff.as_deref(), Some("-pos:1\n+pos:2\n"));
    }

    #[test]
    fn outcome_needs_a_case() {
        let json = r#"{"timestamp":"1.000Z","trace_id":"a::b::1","level":"info","event":"x","outcome":"pass"}"#;
        assert!(matches!(
            validate_log_line(json, 3),
            Err(LogLineError::MissingCase { line: 3, field: "outcome" })
        ));
    }

    #[test]
    fn malformed_trace_ids_are_rejected() {
        for trace_id in ["nope", "a::b", "a::b::seq", "::b::1"] {
            let json = format!(
                r#"{{"timestamp":"1.000Z","trace_id":"{trace_id}","level":"info","event":"x"}}"#
            );
            assert!(
                matches!(validate_log_line(&json, 1), Err(LogLineError::TraceId { .. })),
                "{trace_id}"
            );
        }
    }

    #[test]
    fn schema_violations_are_rejected() {
        let cases = [
            "not json",
            r#"{"level":"info"}"#,
            r#"{"timestamp":"1.000Z","trace_id":"a::b::1","level":"loud","event":"x"}"#,
            r#"{"timestamp":"1.000Z","trace_id":"a::b::1","level":"info","event":"x","extra":1}"#,
        ];
        for json in cases {
            assert!(
                matches!(validate_log_line(json, 1), Err(LogLineError::Schema { .. })),
                "{json}"
            );
        }
    }

    #[test]
    fn emitter_numbers_entries() {
        let mut emitter = LogEmitter::to_buffer("portio", "run-7");
        emitter.emit_entry(LogEntry::event(LogLevel::Info, "start")).unwrap();
        emitter.emit_entry(LogEntry::event(LogLevel::Info, "end")).unwrap();
        assert_eq!(emitter.emitted(), 2);
    }

    #[test]
    fn emitted_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let mut emitter = LogEmitter::to_file(&path, "portio", "file").unwrap();
        emitter.emit_entry(LogEntry::event(LogLevel::Info, "start")).unwrap();
        emitter
            .emit_entry(LogEntry::case_result("ci", "lines", "crlf", Outcome::Pass))
            .unwrap();
        emitter.flush().unwrap();

        let (lines, errors) = validate_log_file(&path).unwrap();
        assert_eq!(lines, 2);
        assert!(errors.is_empty(), "{errors:?}");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().nth(1).unwrap().contains("\"portio::file::002\""));
    }
}
