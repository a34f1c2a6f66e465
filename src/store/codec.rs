//! Saved-query CSV codec
//!
//! Layout of the store blob:
//!
//! ```text
//! QueryName,Keywords,RawKeywords,DateFilter,CreatedDate,LastUsed
//! "name","rendered text","[{""groupIndex"":0,...}]","{""enabled"":false}","2024-01-01T00:00:00.000Z","..."
//! ```
//!
//! Every data cell is quoted with embedded quotes doubled. `RawKeywords` and
//! `DateFilter` hold JSON. Decoding is tolerant: bad rows and cells become
//! [`ParseDiagnostic`]s instead of failing the whole load.

use crate::query::{DateFilter, KeywordGroup, Query};
use crate::types::{AppError, AppResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub const HEADER: [&str; 6] = [
    "QueryName",
    "Keywords",
    "RawKeywords",
    "DateFilter",
    "CreatedDate",
    "LastUsed",
];

/// Prepended to exported files so spreadsheet tools detect UTF-8
pub const BOM: char = '\u{feff}';

/// What went wrong with one row or cell during decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    HeaderMismatch,
    MalformedRow,
    MissingFields,
    InvalidKeywords,
    InvalidDateFilter,
    InvalidTimestamp,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::HeaderMismatch => write!(f, "header mismatch"),
            DiagnosticKind::MalformedRow => write!(f, "malformed row"),
            DiagnosticKind::MissingFields => write!(f, "missing fields"),
            DiagnosticKind::InvalidKeywords => write!(f, "invalid keyword groups"),
            DiagnosticKind::InvalidDateFilter => write!(f, "invalid date filter"),
            DiagnosticKind::InvalidTimestamp => write!(f, "invalid timestamp"),
        }
    }
}

/// Non-fatal problem found while decoding the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    /// 1-based line in the blob where the record starts
    pub line: u64,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl std::fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.kind, self.message)
    }
}

/// Queries decoded from a blob, plus everything that had to be skipped or defaulted
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub queries: Vec<Query>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub fn header_line() -> String {
    HEADER.join(",")
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize the whole collection, header first.
pub fn encode(queries: &[Query]) -> AppResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for query in queries {
        let groups = serde_json::to_string(&query.groups)?;
        let date_filter = serde_json::to_string(&query.date_filter)?;
        writer.write_record([
            query.name.as_str(),
            query.rendered_text.as_str(),
            groups.as_str(),
            date_filter.as_str(),
            format_timestamp(&query.created_at).as_str(),
            format_timestamp(&query.last_used_at).as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    let body = String::from_utf8(bytes).map_err(|e| AppError::Serialization(e.to_string()))?;

    let mut blob = header_line();
    if !body.is_empty() {
        blob.push('\n');
        blob.push_str(body.strip_suffix('\n').unwrap_or(&body));
    }
    Ok(blob)
}

/// Decode a store blob.
///
/// Records are framed line by line. A quoted cell may continue onto the
/// following lines only when the joined text reads as one complete row;
/// otherwise the starting line is reported as malformed and decoding resumes
/// on the next line, so one broken row never takes its neighbours with it.
///
/// `now` fills in timestamps that are missing or unreadable.
pub fn decode(blob: &str, now: DateTime<Utc>) -> LoadReport {
    let mut report = LoadReport::default();
    let text = blob.strip_prefix(BOM).unwrap_or(blob);
    let lines: Vec<&str> = text.lines().collect();

    let mut seen_header = false;
    let mut row = 0usize;
    let mut index = 0;
    while index < lines.len() {
        let start = index;
        let line = (start + 1) as u64;
        index += 1;

        if lines[start].trim().is_empty() {
            continue;
        }

        let Some((end, record)) = read_record(&lines, start) else {
            seen_header = true;
            push(
                &mut report,
                line,
                DiagnosticKind::MalformedRow,
                "unterminated or stray quote".to_string(),
            );
            continue;
        };
        index = end + 1;

        if !seen_header {
            seen_header = true;
            let matches = HEADER
                .iter()
                .all(|expected| record.iter().any(|h| h.trim().eq_ignore_ascii_case(expected)));
            if !matches {
                push(
                    &mut report,
                    line,
                    DiagnosticKind::HeaderMismatch,
                    format!("expected {}", header_line()),
                );
            }
            continue;
        }

        row += 1;
        if record.len() < HEADER.len() {
            push(
                &mut report,
                line,
                DiagnosticKind::MissingFields,
                format!("expected {} fields, found {}", HEADER.len(), record.len()),
            );
            continue;
        }

        let name = match record[0].trim() {
            "" => format!("Query {}", row),
            _ => record[0].to_string(),
        };

        let groups: Vec<KeywordGroup> = json_cell(
            &mut report,
            line,
            &record[2],
            DiagnosticKind::InvalidKeywords,
            Vec::new,
        );
        let date_filter: DateFilter = json_cell(
            &mut report,
            line,
            &record[3],
            DiagnosticKind::InvalidDateFilter,
            DateFilter::disabled,
        );
        let created_at = timestamp_cell(&mut report, line, &record[4], now);
        let last_used_at = timestamp_cell(&mut report, line, &record[5], now);

        report.queries.push(Query {
            name,
            rendered_text: record[1].to_string(),
            groups,
            date_filter,
            created_at,
            last_used_at,
        });
    }

    debug!(
        queries = report.queries.len(),
        diagnostics = report.diagnostics.len(),
        "Decoded query store"
    );
    report
}

/// Read the record starting at `lines[start]`, returning the index of its last line.
///
/// An odd number of quote characters means a quoted cell is still open, so
/// following lines are pulled in until the count is even again.
fn read_record(lines: &[&str], start: usize) -> Option<(usize, csv::StringRecord)> {
    let mut candidate = lines[start].to_string();
    let mut quotes = lines[start].matches('"').count();
    let mut end = start;
    while quotes % 2 == 1 {
        end += 1;
        let next = lines.get(end)?;
        candidate.push('\n');
        candidate.push_str(next);
        quotes += next.matches('"').count();
    }

    let mut records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(candidate.as_bytes())
        .records()
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    if records.len() != 1 {
        return None;
    }
    let record = records.pop()?;

    if end > start && !is_complete_row(&record) {
        return None;
    }
    Some((end, record))
}

/// A continued record must look like a full data row to be trusted
fn is_complete_row(record: &csv::StringRecord) -> bool {
    record.len() == HEADER.len()
        && serde_json::from_str::<Vec<KeywordGroup>>(&record[2]).is_ok()
        && serde_json::from_str::<DateFilter>(&record[3]).is_ok()
}

fn push(report: &mut LoadReport, line: u64, kind: DiagnosticKind, message: String) {
    let diagnostic = ParseDiagnostic { line, kind, message };
    warn!("Skipping part of query store: {}", diagnostic);
    report.diagnostics.push(diagnostic);
}

fn json_cell<T, F>(
    report: &mut LoadReport,
    line: u64,
    cell: &str,
    kind: DiagnosticKind,
    default: F,
) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    if cell.trim().is_empty() {
        return default();
    }
    match serde_json::from_str(cell) {
        Ok(value) => value,
        Err(e) => {
            push(report, line, kind, e.to_string());
            default()
        }
    }
}

fn timestamp_cell(report: &mut LoadReport, line: u64, cell: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let cell = cell.trim();
    if cell.is_empty() {
        return now;
    }
    match DateTime::parse_from_rfc3339(cell) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(e) => {
            push(
                report,
                line,
                DiagnosticKind::InvalidTimestamp,
                format!("{:?}: {}", cell, e),
            );
            now
        }
    }
}
