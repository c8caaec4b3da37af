use proptest::prelude::*;

use crate::tests::common::{create_csv, header_options, snapshot};
use crate::{parse_table, write_table, Event, ParseOptions, StreamParser, WriteOptions};

/// Strategy for field content: printable ASCII plus BMP text, including
/// delimiters, quotes, and newline characters so escaping paths get hit.
fn csv_field_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[\\x20-\\x7E\\u{80}-\\u{D7FF}\\u{E000}-\\u{FFFF}]{0,16}").unwrap()
}

/// Headers made unique by suffixing the column index.
fn csv_header_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(csv_field_strategy(), 1..6).prop_map(|fields| {
        fields
            .into_iter()
            .enumerate()
            .map(|(i, f)| format!("{f}_{i}"))
            .collect()
    })
}

fn csv_rows_strategy(num_columns: usize) -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(
        prop::collection::vec(csv_field_strategy(), num_columns..=num_columns),
        0..8,
    )
}

/// Owned mirror of one event for cross-run comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OwnedEvent {
    Begin,
    Field(Vec<u8>, bool),
    EndRecord,
    End,
}

fn events_chunked(input: &[u8], options: &ParseOptions, chunk_size: usize) -> Vec<OwnedEvent> {
    let mut events = Vec::new();
    let mut on_event = |ev: Event<'_>| {
        events.push(match ev {
            Event::RecordBegin => OwnedEvent::Begin,
            Event::Field(f) => OwnedEvent::Field(f.data.to_vec(), f.quoted),
            Event::RecordEnd => OwnedEvent::EndRecord,
            Event::End => OwnedEvent::End,
        });
        Ok(())
    };
    let mut parser = StreamParser::new(options.clone());
    for chunk in input.chunks(chunk_size.max(1)) {
        parser.feed(chunk, &mut on_event).unwrap();
    }
    parser.finish(&mut on_event).unwrap();
    events
}

proptest! {
    // Feeding any chunking of the input produces the event sequence of a
    // single-shot parse.
    #[test]
    fn prop_chunk_independence(
        (headers, rows) in csv_header_strategy().prop_flat_map(|h| {
            let n = h.len();
            (Just(h), csv_rows_strategy(n))
        }),
        chunk_size in 1usize..24,
    ) {
        let csv = create_csv(&headers, &rows);
        let options = header_options();
        let whole = events_chunked(csv.as_bytes(), &options, csv.len().max(1));
        let chunked = events_chunked(csv.as_bytes(), &options, chunk_size);
        prop_assert_eq!(whole, chunked);
    }

    // Parse, write with the same dialect, and reparse: contents, row
    // order, and column order survive.
    #[test]
    fn prop_round_trip(
        (headers, rows) in csv_header_strategy().prop_flat_map(|h| {
            let n = h.len();
            (Just(h), csv_rows_strategy(n))
        }),
    ) {
        let csv = create_csv(&headers, &rows);
        let options = header_options();
        let table = parse_table(csv.as_bytes(), &options).unwrap();

        let mut out = Vec::new();
        write_table(&table, &mut out, &WriteOptions::default()).unwrap();
        let reparsed = parse_table(&out, &options).unwrap();

        prop_assert_eq!(snapshot(&reparsed), snapshot(&table));
        prop_assert_eq!(reparsed.column_count(), table.column_count());
    }

    // With minimal quoting, a field is quoted exactly when it contains the
    // delimiter, the quote character, or a newline byte.
    #[test]
    fn prop_quoting_minimality(field in csv_field_strategy()) {
        let mut out = Vec::new();
        crate::write_record(
            &mut out,
            &[field.as_bytes(), b"tail"],
            &WriteOptions::default(),
        )
        .unwrap();

        let must_quote = field.contains(',')
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r');
        if must_quote {
            prop_assert_eq!(out[0], b'"');
        } else {
            prop_assert!(out.starts_with(field.as_bytes()));
            prop_assert_eq!(out[field.len()], b',');
        }
    }

    // The parser returns a result, never panics, on arbitrary bytes.
    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = parse_table(&bytes, &ParseOptions::default());

        let mut lenient = ParseOptions::default();
        lenient.validate_utf8 = false;
        lenient.allow_irregular_rows = true;
        lenient.dialect.allow_unquoted_quotes = true;
        lenient.dialect.allow_unquoted_newlines = true;
        lenient.dialect.accept_cr = true;
        let _ = parse_table(&bytes, &lenient);
    }

    // Chunked parsing of arbitrary bytes agrees with single-shot parsing
    // even when every construct straddles a boundary.
    #[test]
    fn prop_arbitrary_bytes_chunk_agreement(
        bytes in prop::collection::vec(any::<u8>(), 0..128),
        chunk_size in 1usize..9,
    ) {
        let mut options = ParseOptions::default();
        options.validate_utf8 = false;
        options.allow_irregular_rows = true;
        options.dialect.allow_unquoted_quotes = true;
        options.dialect.allow_unquoted_newlines = true;

        let run = |size: usize| -> Result<Vec<OwnedEvent>, crate::Error> {
            let mut events = Vec::new();
            let mut on_event = |ev: Event<'_>| {
                events.push(match ev {
                    Event::RecordBegin => OwnedEvent::Begin,
                    Event::Field(f) => OwnedEvent::Field(f.data.to_vec(), f.quoted),
                    Event::RecordEnd => OwnedEvent::EndRecord,
                    Event::End => OwnedEvent::End,
                });
                Ok(())
            };
            let mut parser = StreamParser::new(options.clone());
            for chunk in bytes.chunks(size) {
                parser.feed(chunk, &mut on_event)?;
            }
            parser.finish(&mut on_event)?;
            Ok(events)
        };

        match (run(bytes.len().max(1)), run(chunk_size)) {
            (Ok(whole), Ok(chunked)) => prop_assert_eq!(whole, chunked),
            (Err(whole), Err(chunked)) => prop_assert_eq!(whole.code, chunked.code),
            (whole, chunked) => prop_assert!(
                false,
                "one-shot {whole:?} disagrees with chunked {chunked:?}"
            ),
        }
    }
}
