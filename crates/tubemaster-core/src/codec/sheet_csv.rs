//! Planner CSV import / export.
//!
//! Import: the first line is always the header. The topic column is the first
//! header containing one of `TOPIC_HEADER_HINTS` (case-insensitive), else
//! column 0. Every other non-blank record with a non-blank topic becomes one
//! topic, in file order.
//!
//! A line break inside a topic means an unbalanced quote ran past its line,
//! which is rejected rather than merged into the following lines.
//!
//! Export: fixed column order. Topic, title, description and keywords are
//! always quoted. ID, status, score and video id are written bare.

use chrono::NaiveDate;
use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};
use thiserror::Error;

use crate::domain::SheetRow;

pub const TOPIC_HEADER_HINTS: [&str; 4] = ["topic", "chủ đề", "content", "tên"];

pub const EXPORT_HEADER: [&str; 8] = [
    "ID",
    "Original Topic",
    "Status",
    "Optimized Title",
    "Optimized Description",
    "Keywords",
    "SEO Score",
    "Video ID",
];

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("malformed CSV: {0}")]
    Parse(#[from] csv::Error),

    #[error("unbalanced quote in record starting at line {line}")]
    UnbalancedQuote { line: u64 },

    #[error("file is empty or has no usable topics")]
    NoRows,

    #[error("failed to finish CSV output: {0}")]
    Write(String),
}

/// Index of the topic column for the given header cells.
pub fn topic_column<'a>(headers: impl IntoIterator<Item = &'a str>) -> usize {
    headers
        .into_iter()
        .position(|h| {
            let h = h.trim().to_lowercase();
            TOPIC_HEADER_HINTS.iter().any(|hint| h.contains(hint))
        })
        .unwrap_or(0)
}

/// Topics from CSV text, in file order.
pub fn parse_topics(text: &str) -> Result<Vec<String>, CsvError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let column = topic_column(reader.headers()?.iter());

    let mut topics = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(topic) = record.get(column).map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        if topic.contains(['\n', '\r']) {
            let line = record.position().map_or(0, |p| p.line());
            return Err(CsvError::UnbalancedQuote { line });
        }
        topics.push(topic.to_string());
    }

    if topics.is_empty() {
        return Err(CsvError::NoRows);
    }
    Ok(topics)
}

/// CSV text for the given rows. Caller rejects an empty list beforehand.
pub fn render_rows(rows: &[SheetRow]) -> Result<String, CsvError> {
    // fields are pre-quoted below, so the writer must not quote again
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;

    for row in rows {
        let id = row.id.to_string();
        let score = row.seo_score.unwrap_or(0).to_string();
        writer.write_record([
            id,
            quoted(&row.topic),
            row.status.as_str().to_string(),
            quoted(row.optimized_title.as_deref().unwrap_or_default()),
            quoted(row.optimized_desc.as_deref().unwrap_or_default()),
            quoted(row.keywords.as_deref().unwrap_or_default()),
            score,
            row.video_id.clone().unwrap_or_default(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::Write(e.to_string()))
}

/// Always quoted, embedded quotes doubled.
fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// `tube_master_export_<YYYY-MM-DD>.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("tube_master_export_{}.csv", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RowId, RowStatus};
    use rstest::rstest;
    use ulid::Ulid;

    fn row(topic: &str) -> SheetRow {
        SheetRow::pending(RowId::from_ulid(Ulid::new()), topic)
    }

    #[test]
    fn quoted_topic_with_topic_header() {
        let topics = parse_topics("topic,status\n\"Intro to sourdough\",x\n").unwrap();
        assert_eq!(topics, vec!["Intro to sourdough"]);
    }

    #[rstest]
    #[case("id,Chủ đề video,note", 1)]
    #[case("Tên,Ghi chú", 0)]
    #[case("id,Content idea", 1)]
    #[case("id,title", 0)]
    #[case("a,b,TOPIC", 2)]
    fn header_detection(#[case] header: &str, #[case] expected: usize) {
        assert_eq!(topic_column(header.split(',')), expected);
    }

    #[test]
    fn commas_inside_quotes_and_blank_lines() {
        let text = "id,topic\r\n1,\"Bread, butter and jam\"\r\n\r\n2,   \r\n3,Coffee\n";
        let topics = parse_topics(text).unwrap();
        assert_eq!(topics, vec!["Bread, butter and jam", "Coffee"]);
    }

    #[test]
    fn short_records_are_skipped() {
        let text = "id,topic\n1\n2,Tea\n";
        assert_eq!(parse_topics(text).unwrap(), vec!["Tea"]);
    }

    #[test]
    fn header_only_file_has_no_rows() {
        assert!(matches!(parse_topics("topic\n"), Err(CsvError::NoRows)));
        assert!(matches!(parse_topics(""), Err(CsvError::NoRows)));
    }

    #[test]
    fn export_layout() {
        let mut r = row("Say \"hi\"");
        r.status = RowStatus::Optimized;
        r.seo_score = Some(87);
        r.keywords = Some("a, b".into());

        let text = render_rows(std::slice::from_ref(&r)).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("ID,Original Topic,Status,Optimized Title,Optimized Description,Keywords,SEO Score,Video ID")
        );
        let line = lines.next().unwrap();
        assert!(line.contains("\"Say \"\"hi\"\"\""), "{line}");
        assert!(line.contains(",OPTIMIZED,"));
        assert!(line.contains(",87,"));
        assert!(line.contains("\"a, b\""));
    }

    #[test]
    fn numeric_looking_text_is_still_quoted() {
        let r = row("2024");
        let text = render_rows(std::slice::from_ref(&r)).unwrap();
        let line = text.lines().nth(1).unwrap();
        assert_eq!(line, format!("{},\"2024\",PENDING,\"\",\"\",\"\",0,", r.id));
    }

    #[test]
    fn unbalanced_quote_is_rejected() {
        let err = parse_topics("topic\n\"Bread, butter\nCoffee\n").unwrap_err();
        assert!(matches!(err, CsvError::UnbalancedQuote { line: 2 }), "{err:?}");
    }

    #[test]
    fn multiline_field_outside_topic_column_is_kept() {
        let text = "topic,note\nTea,\"two\nlines\"\nCoffee,x\n";
        assert_eq!(parse_topics(text).unwrap(), vec!["Tea", "Coffee"]);
    }

    #[test]
    fn missing_score_exports_as_zero() {
        let text = render_rows(&[row("x")]).unwrap();
        assert!(text.lines().nth(1).unwrap().contains(",0,"));
    }

    #[test]
    fn export_then_import_preserves_topics() {
        let rows: Vec<_> = ["Đánh giá iPhone 15", "Commas, quotes \"and\" more", "Plain"]
            .into_iter()
            .map(row)
            .collect();
        let text = render_rows(&rows).unwrap();
        let topics = parse_topics(&text).unwrap();
        let original: Vec<_> = rows.iter().map(|r| r.topic.clone()).collect();
        assert_eq!(topics, original);
    }

    #[test]
    fn file_name_has_date() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        assert_eq!(export_file_name(date), "tube_master_export_2025-02-03.csv");
    }
}
