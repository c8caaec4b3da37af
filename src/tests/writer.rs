//! Table writing scenarios and round trips.

use crate::tests::common::{header_options, snapshot};
use crate::{parse_table, write_table, ParseOptions, Table, WriteOptions};

#[test]
fn test_trim_trailing_empty_fields_on_rows() {
    let mut table = Table::new();
    table.row_append(&[b"Bob", b"25", b"", b""]).unwrap();

    let mut options = WriteOptions::default();
    options.trim_trailing_empty_fields = true;
    let mut out = Vec::new();
    write_table(&table, &mut out, &options).unwrap();
    assert_eq!(out, b"Bob,25\n");

    let mut untrimmed = Vec::new();
    write_table(&table, &mut untrimmed, &WriteOptions::default()).unwrap();
    assert_eq!(untrimmed, b"Bob,25,,\n");
}

#[test]
fn test_header_row_written_first() {
    let mut table = Table::with_headers(&[b"name", b"age"]).unwrap();
    table.row_append(&[b"Alice", b"30"]).unwrap();

    let mut out = Vec::new();
    write_table(&table, &mut out, &WriteOptions::default()).unwrap();
    assert_eq!(out, b"name,age\nAlice,30\n");
}

#[test]
fn test_no_trailing_newline_option() {
    let mut table = Table::new();
    table.row_append(&[b"a", b"b"]).unwrap();
    table.row_append(&[b"c", b"d"]).unwrap();

    let mut options = WriteOptions::default();
    options.trailing_newline = false;
    let mut out = Vec::new();
    write_table(&table, &mut out, &options).unwrap();
    assert_eq!(out, b"a,b\nc,d");
}

fn round_trip(input: &[u8], parse_options: &ParseOptions) {
    let table = parse_table(input, parse_options).unwrap();
    let mut write_options = WriteOptions::default();
    write_options.dialect = parse_options.dialect.clone();
    let mut out = Vec::new();
    write_table(&table, &mut out, &write_options).unwrap();

    let reparsed = parse_table(&out, parse_options).unwrap();
    assert_eq!(snapshot(&reparsed), snapshot(&table), "round trip changed contents");
    assert_eq!(reparsed.has_header(), table.has_header());
    assert_eq!(reparsed.column_count(), table.column_count());
}

#[test]
fn test_round_trip_simple() {
    round_trip(
        b"Name,Age,City\nAlice,30,New York\nBob,25,San Francisco\n",
        &header_options(),
    );
}

#[test]
fn test_round_trip_quotes_and_newlines() {
    round_trip(
        b"a,b\n\"He said \"\"hi\"\"\",\"line1\nline2\"\nplain,\"x,y\"\n",
        &header_options(),
    );
}

#[test]
fn test_round_trip_empty_fields() {
    round_trip(b"a,b,c\n,,\nx,,z\n", &header_options());
}

#[test]
fn test_round_trip_semicolon_dialect() {
    let mut options = header_options();
    options.dialect.delimiter = b';';
    round_trip(b"k;v\n\"a;1\";2\n", &options);
}

#[test]
fn test_round_trip_after_mutations() {
    let mut table = parse_table(b"k,v\na,1\nb,2\n", &header_options()).unwrap();
    table.column_append_with_values(Some(b"w"), &[b"x", b"y"]).unwrap();
    table.row_remove(0).unwrap();
    table.compact().unwrap();

    let mut out = Vec::new();
    write_table(&table, &mut out, &WriteOptions::default()).unwrap();
    assert_eq!(out, b"k,v,w\nb,2,y\n");
}

#[test]
fn test_json_export_matches_writer_view() {
    let table = parse_table(b"name,age\nAlice,30\n", &header_options()).unwrap();
    let json: Vec<serde_json::Value> =
        serde_json::from_str(&table.to_json().unwrap()).unwrap();
    assert_eq!(json[0]["name"], "Alice");

    let mut out = Vec::new();
    write_table(&table, &mut out, &WriteOptions::default()).unwrap();
    assert_eq!(out, b"name,age\nAlice,30\n");
}
