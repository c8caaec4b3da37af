use crate::tests::common::header_options;
use crate::{parse_table, Escape, ParseOptions, StreamParser};

#[test]
fn test_parse_simple_csv_with_header() {
    let input = b"Name,Age,City\nAlice,30,New York\nBob,25,San Francisco\n";
    let table = parse_table(input, &header_options()).unwrap();

    assert_eq!(table.row_count(), 2);
    assert_eq!(table.column_count(), 3);
    assert_eq!(table.header_index(b"City"), Some(2));
    assert_eq!(table.field(0, 0), Some(&b"Alice"[..]));
    assert_eq!(table.field(1, 2), Some(&b"San Francisco"[..]));
    table.validate().unwrap();
}

#[test]
fn test_parse_doubled_quote_escape() {
    let input = b"a,b\n\"He said \"\"hi\"\"\",\"x\"\n";
    let table = parse_table(input, &header_options()).unwrap();

    assert_eq!(table.field(0, 0), Some(&b"He said \"hi\""[..]));
    assert_eq!(table.field(0, 1), Some(&b"x"[..]));
}

#[test]
fn test_parse_backslash_escape_dialect() {
    let mut options = header_options();
    options.dialect.escape = Escape::Backslash;
    let input = b"name,desc\nAlice,\"She said \\\"Hi\\\"\"\n";
    let table = parse_table(input, &options).unwrap();

    assert_eq!(table.field(0, 1), Some(&b"She said \"Hi\""[..]));
}

#[test]
fn test_parse_crlf_with_bom() {
    let input = b"\xEF\xBB\xBFa,b\r\n1,2\r\n";
    let table = parse_table(input, &ParseOptions::default()).unwrap();

    assert_eq!(table.row_count(), 2);
    assert_eq!(table.field(0, 0), Some(&b"a"[..]));
    assert_eq!(table.field(1, 1), Some(&b"2"[..]));

    // The position after both terminators lands on line 3.
    let mut parser = StreamParser::new(ParseOptions::default());
    parser.feed(input, &mut |_| Ok(())).unwrap();
    parser.finish(&mut |_| Ok(())).unwrap();
    assert_eq!(parser.position().line, 3);
}

#[test]
fn test_parse_empty_input() {
    let table = parse_table(b"", &ParseOptions::default()).unwrap();
    assert_eq!(table.row_count(), 0);
    assert_eq!(table.column_count(), 0);
}

#[test]
fn test_parse_headers_only() {
    let table = parse_table(b"name,age,email\n", &header_options()).unwrap();
    assert_eq!(table.row_count(), 0);
    assert_eq!(table.column_count(), 3);
    assert_eq!(table.header_index(b"email"), Some(2));
}

#[test]
fn test_parse_custom_delimiter() {
    let mut options = header_options();
    options.dialect.delimiter = b'\t';
    let table = parse_table(b"name\tage\nAlice\t30\n", &options).unwrap();
    assert_eq!(table.field(0, 1), Some(&b"30"[..]));
}

#[test]
fn test_parse_unicode_fields() {
    let input = "名前,年齢\n太郎,30\n花子,25\n".as_bytes();
    let table = parse_table(input, &header_options()).unwrap();

    assert_eq!(table.header_index("名前".as_bytes()), Some(0));
    assert_eq!(table.field(0, 0), Some("太郎".as_bytes()));
    assert_eq!(table.field(1, 0), Some("花子".as_bytes()));
}

#[test]
fn test_parse_comments_and_blank_lines() {
    let mut options = header_options();
    options.dialect.allow_comments = true;
    let input = b"# generated file\nname,age\n\nAlice,30\n# trailing note\n";
    let table = parse_table(input, &options).unwrap();

    assert_eq!(table.row_count(), 1);
    assert_eq!(table.field(0, 0), Some(&b"Alice"[..]));
}

#[test]
fn test_error_positions_and_snippet() {
    let err = parse_table(b"ok,line\nbad\"field\n", &ParseOptions::default()).unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.column, 4);
    assert_eq!(err.offset, 11);
    let snippet = err.snippet.expect("snippet enabled by default");
    assert_eq!(snippet.text[snippet.caret], b'"');
}

#[test]
fn test_snippet_disabled() {
    let mut options = ParseOptions::default();
    options.enable_context_snippet = false;
    let err = parse_table(b"a\"b\n", &options).unwrap_err();
    assert!(err.snippet.is_none());
}
