//! # Spreadsheet Uploads
//!
//! Decodes the `file` field of a multipart upload into [`RawRow`]s for the
//! importers in stockroom-db.
//!
//! ## Supported Formats
//! ```text
//! .csv          → csv crate, first record is the header
//! .xlsx / .xls  → calamine, first worksheet, first row is the header
//! ```
//!
//! Row numbers follow the spreadsheet: the header is row 1, so the first data
//! row is row 2. Import errors quote these numbers.

use std::io::Cursor;

use axum::body::Bytes;
use axum::extract::Multipart;
use calamine::{open_workbook_auto_from_rs, Reader};
use stockroom_core::import::RawRow;
use tracing::debug;

use crate::error::ApiError;

/// Multipart field carrying the spreadsheet.
const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Excel,
}

impl Format {
    fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Format::Csv),
            "xlsx" | "xls" => Some(Format::Excel),
            _ => None,
        }
    }
}

/// Reads the uploaded file and decodes its rows.
///
/// ## Errors
/// - 400 `No file uploaded` when there is no `file` field
/// - 400 `File is empty` for a zero-byte upload or a sheet without data rows
/// - 400 for an extension other than csv, xlsx or xls
/// - 413 when the body exceeds the configured limit
pub async fn read_upload(mut multipart: Multipart) -> Result<Vec<RawRow>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let format = Format::from_file_name(&file_name).ok_or_else(|| {
            ApiError::bad_request("Unsupported file type. Upload a .csv, .xlsx or .xls file")
        })?;

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("File is empty"));
        }

        let rows = decode(format, bytes)?;
        if rows.is_empty() {
            return Err(ApiError::bad_request("File is empty"));
        }

        debug!(file = %file_name, rows = rows.len(), "Upload decoded");
        return Ok(rows);
    }

    Err(ApiError::bad_request("No file uploaded"))
}

fn decode(format: Format, bytes: Bytes) -> Result<Vec<RawRow>, ApiError> {
    match format {
        Format::Csv => decode_csv(&bytes),
        Format::Excel => decode_excel(bytes),
    }
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<RawRow>, ApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ApiError::bad_request(format!("Invalid CSV header: {}", e)))?
        .clone();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let number = index + 2;
        let record = record
            .map_err(|e| ApiError::bad_request(format!("Invalid CSV at row {}: {}", number, e)))?;
        rows.push(RawRow::from_pairs(number, headers.iter().zip(record.iter())));
    }
    Ok(rows)
}

fn decode_excel(bytes: Bytes) -> Result<Vec<RawRow>, ApiError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ApiError::bad_request(format!("Invalid spreadsheet: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ApiError::bad_request("File is empty"))?
        .map_err(|e| ApiError::bad_request(format!("Invalid spreadsheet: {}", e)))?;

    let mut sheet = range.rows();
    let Some(header_row) = sheet.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(|cell| cell.to_string()).collect();

    let rows = sheet
        .enumerate()
        .map(|(index, cells)| {
            let values: Vec<String> = cells.iter().map(|cell| cell.to_string()).collect();
            RawRow::from_pairs(
                index + 2,
                headers.iter().map(String::as_str).zip(values.iter().map(String::as_str)),
            )
        })
        .collect();
    Ok(rows)
}
