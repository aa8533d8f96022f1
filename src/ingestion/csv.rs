//! CSV reading into raw-text tables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::PackageResult;
use crate::types::{Cell, Table};

/// Delimiters tried when none is configured, in order of preference on ties.
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Lines looked at when detecting the delimiter.
const SNIFF_LINES: usize = 20;

/// Options for reading CSV input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter. `None` detects it with [`sniff_delimiter`].
    pub delimiter: Option<u8>,
    /// Stop after this many data rows.
    pub max_rows: Option<usize>,
}

/// Guess the delimiter of a CSV sample.
///
/// A candidate that appears the same number of times on every sampled line wins over one that
/// does not; within each group the candidate with the most occurrences on the header line wins.
/// Falls back to `,`.
pub fn sniff_delimiter(sample: &str) -> u8 {
    let lines: Vec<&str> = sample
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    let Some(header) = lines.first() else {
        return b',';
    };

    let mut best: Option<(bool, usize, u8)> = None;
    for delimiter in CANDIDATE_DELIMITERS {
        let count = count_unquoted(header, delimiter);
        if count == 0 {
            continue;
        }
        let consistent = lines.iter().all(|l| count_unquoted(l, delimiter) == count);
        let score = (consistent, count);
        if best.is_none_or(|(c, n, _)| score > (c, n)) {
            best = Some((consistent, count, delimiter));
        }
    }
    best.map(|(_, _, d)| d).unwrap_or(b',')
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut quoted = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            quoted = !quoted;
        } else if b == delimiter && !quoted {
            count += 1;
        }
    }
    count
}

/// Read CSV text (with a header row) into a [`Table`]. Every cell keeps its raw text.
pub fn read_csv_table<R: Read>(mut reader: R, options: &CsvOptions) -> PackageResult<Table> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let delimiter = match options.delimiter {
        Some(d) => d,
        None => sniff_delimiter(&String::from_utf8_lossy(&bytes)),
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(bytes.as_slice());

    let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let limit = options.max_rows.unwrap_or(usize::MAX);
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for result in rdr.records().take(limit) {
        let record = result?;
        rows.push(record.iter().map(|v| Some(v.to_string())).collect());
    }

    tracing::debug!(
        delimiter = %char::from(delimiter).escape_default(),
        columns = columns.len(),
        rows = rows.len(),
        "read csv"
    );
    Ok(Table::new(columns, rows))
}

/// Read a CSV file into a [`Table`].
pub fn read_csv_table_from_path(path: impl AsRef<Path>, options: &CsvOptions) -> PackageResult<Table> {
    let file = File::open(path)?;
    read_csv_table(file, options)
}
