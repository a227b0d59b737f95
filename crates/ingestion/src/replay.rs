//! ReplaySource - NDJSON capture files
//!
//! One wire-schema transaction per line. Blank lines are ignored; lines that
//! do not parse are counted, logged and skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use contracts::CapturedTransaction;
use tracing::warn;

use crate::error::{IngestionError, Result};

/// `metloSource` tag stamped on records that carry none
pub const REPLAY_SOURCE: &str = "replay";

/// Iterator over the transactions of an NDJSON stream
pub struct ReplaySource<R> {
    reader: R,
    line: usize,
    malformed: u64,
    buf: String,
}

impl ReplaySource<BufReader<File>> {
    /// Open an NDJSON file
    ///
    /// # Errors
    /// Returns `IngestionError::Io` if the file cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| IngestionError::io(path, e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            malformed: 0,
            buf: String::new(),
        }
    }

    /// Lines skipped so far
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    /// Lines read so far, including blank and malformed ones
    pub fn lines_read(&self) -> usize {
        self.line
    }

    /// Next record, distinguishing parse failures from end of input
    ///
    /// # Errors
    /// `MalformedRecord` for a line that is not a transaction,
    /// `Io` if the underlying reader fails
    pub fn next_record(&mut self) -> Option<Result<CapturedTransaction>> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(e) => return Some(Err(IngestionError::io("<replay>", e))),
            }

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            let record = CapturedTransaction::from_wire_json(text.as_bytes())
                .map(|mut tx| {
                    if tx.meta.ingest_source.is_empty() {
                        tx.meta.ingest_source = REPLAY_SOURCE.to_string();
                    }
                    tx
                })
                .map_err(|e| IngestionError::MalformedRecord {
                    line: self.line,
                    message: e.to_string(),
                });
            return Some(record);
        }
    }
}

impl<R: BufRead> Iterator for ReplaySource<R> {
    type Item = CapturedTransaction;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.next_record()? {
                Ok(tx) => return Some(tx),
                Err(e @ IngestionError::MalformedRecord { .. }) => {
                    self.malformed += 1;
                    warn!(error = %e, "Skipping malformed replay record");
                }
                Err(e) => {
                    warn!(error = %e, "Replay input unreadable, stopping");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn line(method: &str, source: &str) -> String {
        let tx = CapturedTransaction::builder()
            .method(method)
            .host("example.com")
            .path("/x")
            .ingest_source(source)
            .build();
        String::from_utf8(tx.to_wire_json().unwrap()).unwrap()
    }

    #[test]
    fn test_reads_records_and_skips_malformed() {
        let input = format!(
            "{}\n\n{{not json}}\n{}\n[1,2]\n",
            line("GET", "burp_suite"),
            line("POST", "")
        );
        let mut source = ReplaySource::new(Cursor::new(input));

        let methods: Vec<String> = source.by_ref().map(|tx| tx.request.method).collect();
        assert_eq!(methods, vec!["GET", "POST"]);
        assert_eq!(source.malformed(), 2);
        assert_eq!(source.lines_read(), 5);
    }

    #[test]
    fn test_missing_source_tag_stamped() {
        let mut source = ReplaySource::new(Cursor::new(line("GET", "")));
        let tx = source.next().unwrap();
        assert_eq!(tx.meta.ingest_source, REPLAY_SOURCE);
    }

    #[test]
    fn test_next_record_reports_line() {
        let input = format!("{}\noops\n", line("GET", "x"));
        let mut source = ReplaySource::new(Cursor::new(input));
        assert!(source.next_record().unwrap().is_ok());
        match source.next_record().unwrap() {
            Err(IngestionError::MalformedRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(source.next_record().is_none());
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", line("PUT", "x")).unwrap();
        writeln!(file, "{}", line("DELETE", "x")).unwrap();

        let source = ReplaySource::open(file.path()).unwrap();
        assert_eq!(source.count(), 2);

        assert!(matches!(
            ReplaySource::open("/nonexistent/capture.ndjson"),
            Err(IngestionError::Io { .. })
        ));
    }
}
