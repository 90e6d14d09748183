use crate::error::ImportError;
use crate::fingerprint::{fingerprint, FingerprintInput};
use crate::headers::ColumnMap;
use crate::parse::{parse_decimal, parse_executed_at, sentinel_timestamp, ExecutedAt};
use core_types::NewExecution;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// What one CSV import produced, for the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub source_file: String,
    pub rows_read: usize,
    pub executions_parsed: usize,
    pub warnings: Vec<String>,
}

/// Parsed executions plus the summary of how the file read.
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub executions: Vec<NewExecution>,
    pub summary: ImportSummary,
}

/// Reader for the Schwab "Transactions" CSV export.
#[derive(Debug, Clone)]
pub struct SchwabCsvImporter {
    broker: String,
}

impl Default for SchwabCsvImporter {
    fn default() -> Self {
        Self::new("Schwab")
    }
}

impl SchwabCsvImporter {
    pub fn new(broker: impl Into<String>) -> Self {
        Self { broker: broker.into() }
    }

    pub fn broker(&self) -> &str {
        &self.broker
    }

    pub fn import_path(&self, account: &str, path: &Path) -> Result<ImportBatch, ImportError> {
        if !path.is_file() {
            return Err(ImportError::FileNotFound(path.to_path_buf()));
        }
        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let batch = self.import_reader(account, &source_file, File::open(path)?)?;
        info!(
            file = %source_file,
            rows = batch.summary.rows_read,
            executions = batch.summary.executions_parsed,
            "Imported Schwab CSV"
        );
        Ok(batch)
    }

    /// Parses a whole export. The delimiter is taken from the header line.
    pub fn import_reader<R: Read>(
        &self,
        account: &str,
        source_file: &str,
        mut input: R,
    ) -> Result<ImportBatch, ImportError> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(sniff_delimiter(&text))
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeader);
        }

        let columns = ColumnMap::resolve(&headers);
        let mut summary = ImportSummary {
            source_file: source_file.to_string(),
            ..Default::default()
        };
        column_warnings(&columns, &mut summary.warnings);

        let mut executions = Vec::new();
        for (offset, record) in reader.records().enumerate() {
            let record = record?;
            // Header is row 1.
            let row = offset + 2;
            summary.rows_read += 1;
            executions.push(self.execution_from(account, source_file, row, &headers, &columns, &record, &mut summary.warnings));
        }
        summary.executions_parsed = executions.len();

        for warning in &summary.warnings {
            warn!(file = %source_file, "{warning}");
        }
        Ok(ImportBatch { executions, summary })
    }

    #[allow(clippy::too_many_arguments)]
    fn execution_from(
        &self,
        account: &str,
        source_file: &str,
        row: usize,
        headers: &[String],
        columns: &ColumnMap,
        record: &StringRecord,
        warnings: &mut Vec<String>,
    ) -> NewExecution {
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i));
        let text = |idx: Option<usize>| cell(idx).unwrap_or_default().to_string();
        let number = |idx: Option<usize>| cell(idx).and_then(parse_decimal);

        let date = cell(columns.date);
        let time = cell(columns.time);
        let executed_at = match parse_executed_at(date, time) {
            ExecutedAt::Parsed(at) => at,
            ExecutedAt::Blank => sentinel_timestamp(),
            ExecutedAt::Unparsed => {
                warnings.push(format!(
                    "Row {row}: could not parse date/time (date='{}', time='{}').",
                    date.unwrap_or_default(),
                    time.unwrap_or_default()
                ));
                sentinel_timestamp()
            }
        };

        let action = text(columns.action);
        let symbol = text(columns.symbol);
        let description = text(columns.description);
        let quantity = number(columns.quantity);
        let price = number(columns.price);
        let fees = number(columns.fees).unwrap_or(Decimal::ZERO);
        let net_amount = number(columns.amount).unwrap_or(Decimal::ZERO);

        let fingerprint = fingerprint(&FingerprintInput {
            broker: &self.broker,
            account,
            executed_at,
            action: &action,
            symbol: &symbol,
            quantity,
            price,
            net_amount,
            description: &description,
        });

        NewExecution {
            fingerprint,
            broker: self.broker.clone(),
            account: account.to_string(),
            executed_at,
            symbol,
            description,
            action,
            quantity,
            price,
            fees,
            net_amount,
            currency: "USD".to_string(),
            source_file: source_file.to_string(),
            source_row: i32::try_from(row).unwrap_or(i32::MAX),
            raw_row: raw_row(headers, record),
        }
    }
}

fn column_warnings(columns: &ColumnMap, warnings: &mut Vec<String>) {
    if columns.fees.is_none() {
        warnings.push(
            "Could not find a Fees column (expected something like 'Fees & Comm'). Fees will be 0."
                .to_string(),
        );
    }
    if columns.date.is_none() && columns.time.is_none() {
        warnings.push(
            "Could not find a Date/Time column. Executions are stamped 1970-01-01.".to_string(),
        );
    }
    if columns.symbol.is_none() {
        warnings.push("Could not find a Symbol column. Symbols will be blank.".to_string());
    }
}

/// Header-to-cell JSON object; short rows record missing cells as null.
fn raw_row(headers: &[String], record: &StringRecord) -> serde_json::Value {
    let map = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let value = record
                .get(i)
                .map_or(serde_json::Value::Null, |v| serde_json::Value::String(v.to_string()));
            (h.clone(), value)
        })
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(map)
}

/// Most frequent candidate delimiter on the first line, comma on a tie.
fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or_default();
    let mut best = (b',', first_line.matches(',').count());
    for &candidate in &DELIMITERS[1..] {
        let count = first_line.bytes().filter(|b| *b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}
