//! CSV extraction for bulk lead import.
//!
//! The importer is deliberately forgiving about header spelling
//! (`FirstName`, `first_name`, and plain `name` all work) and deliberately
//! strict about the minimal-field check: a row without both a name and a
//! phone value is silently dropped, not an error. Callers decide what to
//! do when *all* rows are dropped.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::ImportRow;

/// Header spellings accepted for the lead name column, in priority order.
const NAME_HEADERS: &[&str] = &["first_name", "firstname", "name"];
const PHONE_HEADERS: &[&str] = &["phone"];
const NOTES_HEADERS: &[&str] = &["notes"];

/// Parse CSV bytes into valid import rows.
///
/// Returns the surviving rows in file order plus the count of rows dropped
/// by the minimal-field check. A file that cannot be read as CSV at all is
/// a validation failure.
pub fn parse_csv(bytes: &[u8]) -> Result<(Vec<ImportRow>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| Error::validation(format!("invalid file: {e}")))?
        .clone();

    // Map normalized header names to column indices.
    let mut header_map: HashMap<String, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let normalized = header.trim().to_lowercase().replace(' ', "_");
        header_map.entry(normalized).or_insert(idx);
    }

    let name_col = find_column(&header_map, NAME_HEADERS);
    let phone_col = find_column(&header_map, PHONE_HEADERS);
    let notes_col = find_column(&header_map, NOTES_HEADERS);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| Error::validation(format!("invalid file: {e}")))?;

        let first_name = get_field(&record, name_col);
        let phone = get_field(&record, phone_col);

        match (first_name, phone) {
            (Some(first_name), Some(phone)) => rows.push(ImportRow {
                first_name,
                phone,
                notes: get_field(&record, notes_col),
            }),
            _ => skipped += 1,
        }
    }

    Ok((rows, skipped))
}

fn find_column(header_map: &HashMap<String, usize>, candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|name| header_map.get(*name).copied())
}

fn get_field(record: &csv::StringRecord, col: Option<usize>) -> Option<String> {
    col.and_then(|idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_name_header_spelling() {
        let csv = "FirstName,Phone,Notes\nAlice,555-0100,warm\nBob,555-0101,\n";
        let (rows, skipped) = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(skipped, 0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].first_name, "Alice");
        assert_eq!(rows[0].phone, "555-0100");
        assert_eq!(rows[0].notes, Some("warm".to_string()));
        assert_eq!(rows[1].notes, None);
    }

    #[test]
    fn accepts_snake_case_and_spaced_headers() {
        let csv = "first name,phone\nCarol,555-0102\n";
        let (rows, _) = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].first_name, "Carol");
    }

    #[test]
    fn drops_rows_missing_name_or_phone() {
        let csv = "FirstName,Phone\nAlice,555-0100\n,555-0101\nBob,\n  ,  \n";
        let (rows, skipped) = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(skipped, 3);
    }

    #[test]
    fn all_rows_dropped_is_not_an_error() {
        let csv = "FirstName,Phone\n,\n,\n";
        let (rows, skipped) = parse_csv(csv.as_bytes()).unwrap();

        assert!(rows.is_empty());
        assert_eq!(skipped, 2);
    }

    #[test]
    fn preserves_file_order() {
        let csv = "FirstName,Phone\nA,1\nB,2\nC,3\n";
        let (rows, _) = parse_csv(csv.as_bytes()).unwrap();

        let names: Vec<&str> = rows.iter().map(|r| r.first_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn missing_name_column_drops_everything() {
        let csv = "Email,Phone\na@b.c,555-0100\n";
        let (rows, skipped) = parse_csv(csv.as_bytes()).unwrap();

        assert!(rows.is_empty());
        assert_eq!(skipped, 1);
    }
}
