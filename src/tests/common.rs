use crate::{ParseOptions, Table};

/// Helper function to escape a CSV field with quotes.
#[allow(dead_code)]
pub(crate) fn escape_csv_field(field: &str) -> String {
    if field.is_empty()
        || field.contains(',')
        || field.contains('"')
        || field.contains('\n')
        || field.contains('\r')
    {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Helper function to create a CSV string from headers and rows.
#[allow(dead_code)]
pub(crate) fn create_csv(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut csv = String::new();

    csv.push_str(
        &headers
            .iter()
            .map(|h| escape_csv_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    csv.push('\n');

    for row in rows {
        csv.push_str(
            &row.iter()
                .map(|f| escape_csv_field(f))
                .collect::<Vec<_>>()
                .join(","),
        );
        csv.push('\n');
    }

    csv
}

/// Default options with the first row treated as a header.
pub(crate) fn header_options() -> ParseOptions {
    let mut options = ParseOptions::default();
    options.dialect.treat_first_row_as_header = true;
    options
}

/// Snapshot of a table's observable contents: header names, then every
/// data row's fields.
pub(crate) fn snapshot(table: &Table<'_>) -> (Vec<Vec<u8>>, Vec<Vec<Vec<u8>>>) {
    let headers = (0..table.column_count())
        .map(|col| table.header_name(col).unwrap_or_default().to_vec())
        .collect();
    let rows = (0..table.row_count())
        .map(|row| {
            table
                .row(row)
                .expect("row in range")
                .map(<[u8]>::to_vec)
                .collect()
        })
        .collect();
    (headers, rows)
}
