use super::{ClassificationImportError, ClassificationRow};
use crate::workflows::fields::parser::{
    empty_string_as_none, has_column, malformed, parse_numeric_cell,
    reader_with_lowercase_headers, ParsedRow,
};
use crate::workflows::report::{IgnoredReason, IgnoredRow};
use serde::Deserialize;
use std::io::Read;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RecordRow {
    #[serde(rename = "classification", alias = "description")]
    classification: String,
    #[serde(
        rename = "quantity",
        alias = "qty",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    quantity: Option<String>,
    #[serde(
        rename = "unit",
        alias = "uom",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    unit: Option<String>,
    #[serde(
        rename = "quantity 2",
        alias = "quantity2",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    quantity2: Option<String>,
    #[serde(
        rename = "unit 2",
        alias = "unit2",
        alias = "uom 2",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    unit2: Option<String>,
}

pub(crate) fn parse_classifications<R: Read>(
    reader: R,
) -> Result<Vec<ParsedRow<ClassificationRow>>, ClassificationImportError> {
    let mut csv_reader = reader_with_lowercase_headers(reader)?;
    if !["classification", "description"]
        .iter()
        .any(|name| has_column(&mut csv_reader, name))
    {
        return Err(ClassificationImportError::MissingColumn("Classification"));
    }

    let mut rows = Vec::new();
    for (row_index, record) in csv_reader.deserialize::<RecordRow>().enumerate() {
        let row = match record {
            Ok(row) => row,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                rows.push(Err(malformed(row_index, &err)));
                continue;
            }
        };

        let quantity = match row.quantity.as_deref().map(parse_numeric_cell).transpose() {
            Ok(quantity) => quantity,
            Err(raw) => {
                rows.push(Err(IgnoredRow {
                    row_index,
                    raw_key: row.classification,
                    reason: IgnoredReason::NonNumericValue,
                    detail: format!("quantity '{raw}' is not a number"),
                }));
                continue;
            }
        };
        // The second pair is optional; an unreadable quantity only drops that pair.
        let quantity2 = match row.quantity2.as_deref().map(parse_numeric_cell).transpose() {
            Ok(quantity2) => quantity2,
            Err(raw) => {
                debug!(row_index, quantity2 = %raw, "ignored non-numeric secondary quantity");
                None
            }
        };

        rows.push(Ok(ClassificationRow {
            classification_text: row.classification,
            quantity,
            unit_code: row.unit.unwrap_or_default(),
            quantity2,
            unit_code2: row.unit2,
        }));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_primary_and_secondary_pairs() {
        let csv = "Classification,Quantity,Unit,Quantity 2,Unit 2\n\
Chain Link Fence,\"1,240\",FT,,\n\
Balcony Soffit,310,SQM,310,SF\n";
        let rows = parse_classifications(Cursor::new(csv)).expect("parse");

        let fence = rows[0].as_ref().expect("fence row");
        assert_eq!(fence.quantity, Some(1240.0));
        assert_eq!(fence.unit_code, "FT");
        assert_eq!(fence.unit_code2, None);

        let soffit = rows[1].as_ref().expect("soffit row");
        assert_eq!(soffit.quantity2, Some(310.0));
        assert_eq!(soffit.unit_code2.as_deref(), Some("SF"));
    }

    #[test]
    fn non_numeric_secondary_quantity_keeps_the_primary_pair() {
        let csv = "Classification,Quantity,Unit,Quantity 2,Unit 2\nSiding,100,SF,n/a,\n";
        let rows = parse_classifications(Cursor::new(csv)).expect("parse");
        let siding = rows[0].as_ref().expect("row kept");
        assert_eq!(siding.quantity, Some(100.0));
        assert_eq!(siding.unit_code, "SF");
        assert_eq!(siding.quantity2, None);
    }

    #[test]
    fn non_numeric_primary_quantity_rejects_the_row() {
        let csv = "Classification,Quantity,Unit\nSiding,lots,SF\n";
        let rows = parse_classifications(Cursor::new(csv)).expect("parse");
        let rejected = rows[0].as_ref().expect_err("rejected");
        assert_eq!(rejected.reason, IgnoredReason::NonNumericValue);
        assert_eq!(rejected.raw_key, "Siding");
    }

    #[test]
    fn classification_column_is_required() {
        let csv = "Item,Quantity,Unit\nSiding,100,SF\n";
        assert!(matches!(
            parse_classifications(Cursor::new(csv)),
            Err(ClassificationImportError::MissingColumn("Classification"))
        ));
    }
}
