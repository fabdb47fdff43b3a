use super::{FieldImportError, RawField};
use crate::workflows::report::{IgnoredReason, IgnoredRow};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One CSV record after decoding; rejected records keep their slot so row
/// indexes stay aligned with the source.
pub(crate) type ParsedRow<T> = Result<T, IgnoredRow>;

#[derive(Debug, Deserialize)]
struct FieldRow {
    #[serde(rename = "key", alias = "field", alias = "name")]
    key: String,
    #[serde(
        rename = "value",
        alias = "quantity",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    value: Option<String>,
    #[serde(
        rename = "section",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    section: Option<String>,
}

pub(crate) fn parse_fields<R: Read>(
    reader: R,
) -> Result<Vec<ParsedRow<RawField>>, FieldImportError> {
    let mut csv_reader = reader_with_lowercase_headers(reader)?;
    if !["key", "field", "name"]
        .iter()
        .any(|name| has_column(&mut csv_reader, name))
    {
        return Err(FieldImportError::MissingColumn("Key"));
    }

    let mut rows = Vec::new();

    for (row_index, record) in csv_reader.deserialize::<FieldRow>().enumerate() {
        let row = match record {
            Ok(row) => row,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                rows.push(Err(malformed(row_index, &err)));
                continue;
            }
        };

        let value = match row.value.as_deref().map(parse_numeric_cell).transpose() {
            Ok(value) => value,
            Err(raw) => {
                rows.push(Err(IgnoredRow {
                    row_index,
                    raw_key: row.key,
                    reason: IgnoredReason::NonNumericValue,
                    detail: format!("value '{raw}' is not a number"),
                }));
                continue;
            }
        };

        rows.push(Ok(RawField {
            raw_key: row.key,
            value_numeric: value,
            section_hint: row.section,
        }));
    }

    Ok(rows)
}

/// Builds a trimming, ragged-row tolerant reader whose headers are matched
/// case-insensitively.
pub(crate) fn reader_with_lowercase_headers<R: Read>(
    reader: R,
) -> Result<csv::Reader<R>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: csv::StringRecord = csv_reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();
    csv_reader.set_headers(headers);

    Ok(csv_reader)
}

pub(crate) fn has_column<R: Read>(csv_reader: &mut csv::Reader<R>, name: &str) -> bool {
    csv_reader
        .headers()
        .map(|headers| headers.iter().any(|header| header == name))
        .unwrap_or(false)
}

pub(crate) fn malformed(row_index: usize, err: &csv::Error) -> IgnoredRow {
    IgnoredRow {
        row_index,
        raw_key: String::new(),
        reason: IgnoredReason::MalformedRecord,
        detail: err.to_string(),
    }
}

/// Parses a spreadsheet number, tolerating thousands separators. Returns the
/// offending text when it is not a finite number.
pub(crate) fn parse_numeric_cell(raw: &str) -> Result<f64, String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| raw.trim().to_string())
}

pub(crate) fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn numeric_cells_accept_thousands_separators() {
        assert_eq!(parse_numeric_cell("12,400"), Ok(12400.0));
        assert_eq!(parse_numeric_cell(" 1 250.5 "), Ok(1250.5));
        assert_eq!(parse_numeric_cell("-3"), Ok(-3.0));
        assert_eq!(parse_numeric_cell("n/a"), Err("n/a".to_string()));
        assert_eq!(parse_numeric_cell("inf"), Err("inf".to_string()));
    }

    #[test]
    fn parses_rows_with_case_insensitive_headers() {
        let csv =
            "\u{feff}KEY,Value,SECTION\nCor. Wall SF,\"12,000\",Corridors\nTotal Units,180,\n";
        let rows = parse_fields(Cursor::new(csv)).expect("parse");

        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().expect("first row parses");
        assert_eq!(first.raw_key, "Cor. Wall SF");
        assert_eq!(first.value_numeric, Some(12000.0));
        assert_eq!(first.section_hint.as_deref(), Some("Corridors"));

        let second = rows[1].as_ref().expect("second row parses");
        assert_eq!(second.section_hint, None);
    }

    #[test]
    fn bad_values_and_ragged_rows_do_not_stop_the_batch() {
        let csv = "Key,Value,Section\nUnit Wall SF,lots,Units\nShort Row\nUnit Count,24,Units\n";
        let rows = parse_fields(Cursor::new(csv)).expect("parse");

        assert_eq!(rows.len(), 3);
        let rejected = rows[0].as_ref().expect_err("non-numeric value");
        assert_eq!(rejected.reason, IgnoredReason::NonNumericValue);
        assert_eq!(rejected.row_index, 0);

        let short = rows[1].as_ref().expect("missing cells default to empty");
        assert_eq!(short.raw_key, "Short Row");
        assert_eq!(short.value_numeric, None);

        assert!(rows[2].is_ok());
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let csv = "Label,Value\nUnit Wall SF,10\n";
        match parse_fields(Cursor::new(csv)) {
            Err(FieldImportError::MissingColumn("Key")) => {}
            other => panic!("expected missing column, got {other:?}"),
        }
    }
}
