//! Sink-based CSV writer.
//!
//! A [`Sink`] is a single-capability byte destination; the writer applies
//! the dialect's quoting and escaping policy field by field and never
//! buffers a record itself. Three sinks are provided: a growable buffer, a
//! fixed buffer that reports truncation instead of writing out of bounds,
//! and a callback adapter for arbitrary destinations.

use memchr::{memchr, memchr2};

use crate::dialect::{Escape, WriteOptions};
use crate::error::{Error, ErrorCode};
use crate::table::{Row, Table};

/// Byte destination capability.
pub trait Sink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        (**self).write(bytes)
    }
}

impl Sink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Growable buffer owned by the sink.
#[derive(Debug, Default)]
pub struct BufferSink {
    buf: Vec<u8>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Sink for BufferSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}

/// Fixed-capacity sink. Output past the end sets the truncated flag and
/// fails the write; bytes up to the capacity are kept.
#[derive(Debug)]
pub struct FixedSink<'a> {
    buf: &'a mut [u8],
    written: usize,
    truncated: bool,
}

impl<'a> FixedSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            written: 0,
            truncated: false,
        }
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl Sink for FixedSink<'_> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let room = self.buf.len() - self.written;
        let take = bytes.len().min(room);
        self.buf[self.written..self.written + take].copy_from_slice(&bytes[..take]);
        self.written += take;
        if take < bytes.len() {
            self.truncated = true;
            return Err(Error::new(
                ErrorCode::State,
                "fixed buffer sink out of capacity",
            ));
        }
        Ok(())
    }
}

/// Adapter funneling writes into a closure.
pub struct CallbackSink<F> {
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: FnMut(&[u8]) -> Result<(), Error>,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> Sink for CallbackSink<F>
where
    F: FnMut(&[u8]) -> Result<(), Error>,
{
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        (self.callback)(bytes)
    }
}

fn needs_quotes(data: &[u8], options: &WriteOptions) -> bool {
    if options.quote_all_fields {
        return true;
    }
    if data.is_empty() {
        return options.quote_empty_fields;
    }
    if !options.quote_if_needed {
        return false;
    }
    let d = &options.dialect;
    if memchr2(d.delimiter, d.quote, data).is_some() {
        return true;
    }
    let lf = d.accept_lf || d.accept_crlf;
    let cr = d.accept_cr || d.accept_crlf;
    match (lf, cr) {
        (true, true) => memchr2(b'\n', b'\r', data).is_some(),
        (true, false) => memchr(b'\n', data).is_some(),
        (false, true) => memchr(b'\r', data).is_some(),
        (false, false) => false,
    }
}

/// Emit one field under the quoting policy.
pub fn write_field<S: Sink + ?Sized>(
    sink: &mut S,
    data: &[u8],
    options: &WriteOptions,
) -> Result<(), Error> {
    if needs_quotes(data, options) {
        write_quoted(sink, data, options)
    } else if options.always_escape_quotes && memchr(options.dialect.quote, data).is_some() {
        write_bare_escaped(sink, data, options)
    } else {
        sink.write(data)
    }
}

fn write_quoted<S: Sink + ?Sized>(
    sink: &mut S,
    data: &[u8],
    options: &WriteOptions,
) -> Result<(), Error> {
    let d = &options.dialect;
    let quote = [d.quote];
    sink.write(&quote)?;
    match d.escape {
        Escape::DoubledQuote => {
            let mut rest = data;
            while let Some(pos) = memchr(d.quote, rest) {
                sink.write(&rest[..=pos])?;
                sink.write(&quote)?;
                rest = &rest[pos + 1..];
            }
            sink.write(rest)?;
        }
        Escape::Backslash => {
            let mut rest = data;
            while let Some(pos) = memchr2(d.quote, b'\\', rest) {
                sink.write(&rest[..pos])?;
                sink.write(b"\\")?;
                sink.write(&rest[pos..=pos])?;
                rest = &rest[pos + 1..];
            }
            sink.write(rest)?;
        }
        Escape::None => {
            if memchr(d.quote, data).is_some() {
                return Err(Error::new(
                    ErrorCode::Invalid,
                    "dialect cannot represent a field containing its quote character",
                ));
            }
            sink.write(data)?;
        }
    }
    sink.write(&quote)
}

/// Escape quote bytes in a field emitted without surrounding quotes.
fn write_bare_escaped<S: Sink + ?Sized>(
    sink: &mut S,
    data: &[u8],
    options: &WriteOptions,
) -> Result<(), Error> {
    let d = &options.dialect;
    match d.escape {
        Escape::DoubledQuote => {
            let mut rest = data;
            while let Some(pos) = memchr(d.quote, rest) {
                sink.write(&rest[..=pos])?;
                sink.write(&[d.quote])?;
                rest = &rest[pos + 1..];
            }
            sink.write(rest)
        }
        Escape::Backslash => {
            let mut rest = data;
            while let Some(pos) = memchr(d.quote, rest) {
                sink.write(&rest[..pos])?;
                sink.write(b"\\")?;
                sink.write(&rest[pos..=pos])?;
                rest = &rest[pos + 1..];
            }
            sink.write(rest)
        }
        Escape::None => Err(Error::new(
            ErrorCode::Invalid,
            "dialect cannot represent a field containing its quote character",
        )),
    }
}

/// Emit one record (no trailing newline).
///
/// A record whose only field is empty is written as a quoted empty field
/// even under minimal quoting: a fully bare rendering would be a blank
/// line, and blank lines do not survive a reparse.
pub fn write_record<S: Sink + ?Sized>(
    sink: &mut S,
    fields: &[&[u8]],
    options: &WriteOptions,
) -> Result<(), Error> {
    let count = if options.trim_trailing_empty_fields {
        fields
            .iter()
            .rposition(|f| !f.is_empty())
            .map_or(0, |i| i + 1)
    } else {
        fields.len()
    };
    for (i, field) in fields[..count].iter().enumerate() {
        if i > 0 {
            sink.write(&[options.dialect.delimiter])?;
        }
        if count == 1 && field.is_empty() {
            write_quoted(sink, field, options)?;
        } else {
            write_field(sink, field, options)?;
        }
    }
    Ok(())
}

fn write_row_fields<S: Sink + ?Sized>(
    table: &Table<'_>,
    row: &Row,
    sink: &mut S,
    options: &WriteOptions,
) -> Result<(), Error> {
    let count = if options.trim_trailing_empty_fields {
        row.fields
            .iter()
            .rposition(|&f| !table.ctx.resolve(f).is_empty())
            .map_or(0, |i| i + 1)
    } else {
        row.width()
    };
    for i in 0..count {
        if i > 0 {
            sink.write(&[options.dialect.delimiter])?;
        }
        let data = table.ctx.resolve(row.fields[i]);
        if count == 1 && data.is_empty() {
            write_quoted(sink, data, options)?;
        } else {
            write_field(sink, data, options)?;
        }
    }
    Ok(())
}

/// Emit a whole table, header row first when one is present.
pub fn write_table<S: Sink + ?Sized>(
    table: &Table<'_>,
    sink: &mut S,
    options: &WriteOptions,
) -> Result<(), Error> {
    write_rows_from(table, 0, sink, options)
}

/// Emit only the data rows, leaving the header out.
pub fn write_data_rows<S: Sink + ?Sized>(
    table: &Table<'_>,
    sink: &mut S,
    options: &WriteOptions,
) -> Result<(), Error> {
    write_rows_from(table, table.header_offset(), sink, options)
}

fn write_rows_from<S: Sink + ?Sized>(
    table: &Table<'_>,
    first_row: usize,
    sink: &mut S,
    options: &WriteOptions,
) -> Result<(), Error> {
    let mut any = false;
    for row in &table.rows[first_row.min(table.rows.len())..] {
        if any {
            sink.write(options.newline.as_bytes())?;
        }
        write_row_fields(table, row, sink, options)?;
        any = true;
    }
    if any && options.trailing_newline {
        sink.write(options.newline.as_bytes())?;
    }
    Ok(())
}

impl Table<'_> {
    /// Write the table to a sink; see [`write_table`].
    pub fn write_to<S: Sink + ?Sized>(
        &self,
        sink: &mut S,
        options: &WriteOptions,
    ) -> Result<(), Error> {
        write_table(self, sink, options)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    BetweenRecords,
    InRecord,
}

/// Incremental writer enforcing balanced record boundaries.
pub struct StreamWriter<S: Sink> {
    sink: S,
    options: WriteOptions,
    state: WriterState,
    field_index: usize,
    records: usize,
}

impl<S: Sink> StreamWriter<S> {
    pub fn new(sink: S, options: WriteOptions) -> Self {
        Self {
            sink,
            options,
            state: WriterState::BetweenRecords,
            field_index: 0,
            records: 0,
        }
    }

    pub fn begin_record(&mut self) -> Result<(), Error> {
        if self.state == WriterState::InRecord {
            return Err(Error::new(ErrorCode::State, "record already open"));
        }
        if self.records > 0 {
            self.sink.write(self.options.newline.as_bytes())?;
        }
        self.state = WriterState::InRecord;
        self.field_index = 0;
        Ok(())
    }

    pub fn write_field(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.state != WriterState::InRecord {
            return Err(Error::new(
                ErrorCode::State,
                "field written outside a record",
            ));
        }
        if self.field_index > 0 {
            self.sink.write(&[self.options.dialect.delimiter])?;
        }
        write_field(&mut self.sink, data, &self.options)?;
        self.field_index += 1;
        Ok(())
    }

    pub fn end_record(&mut self) -> Result<(), Error> {
        if self.state != WriterState::InRecord {
            return Err(Error::new(ErrorCode::State, "no record open"));
        }
        self.state = WriterState::BetweenRecords;
        self.records += 1;
        Ok(())
    }

    /// Close the stream and hand the sink back. Fails if a record is still
    /// open.
    pub fn finish(mut self) -> Result<S, Error> {
        if self.state == WriterState::InRecord {
            return Err(Error::new(ErrorCode::State, "record still open"));
        }
        if self.records > 0 && self.options.trailing_newline {
            self.sink.write(self.options.newline.as_bytes())?;
        }
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Newline;

    fn emit(fields: &[&[u8]], options: &WriteOptions) -> Vec<u8> {
        let mut out = Vec::new();
        write_record(&mut out, fields, options).unwrap();
        out
    }

    #[test]
    fn test_minimal_quoting() {
        let options = WriteOptions::default();
        assert_eq!(emit(&[b"a", b"b"], &options), b"a,b");
        assert_eq!(emit(&[b"a,b", b"c"], &options), b"\"a,b\",c");
        assert_eq!(emit(&[b"x\ny"], &options), b"\"x\ny\"");
        assert_eq!(emit(&[b"say \"hi\""], &options), b"\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_quote_all_and_empty() {
        let mut options = WriteOptions::default();
        options.quote_all_fields = true;
        assert_eq!(emit(&[b"a", b""], &options), b"\"a\",\"\"");

        let mut options = WriteOptions::default();
        options.quote_empty_fields = true;
        assert_eq!(emit(&[b"a", b""], &options), b"a,\"\"");
    }

    #[test]
    fn test_backslash_escape_writing() {
        let mut options = WriteOptions::default();
        options.dialect.escape = Escape::Backslash;
        assert_eq!(emit(&[b"say \"hi\""], &options), b"\"say \\\"hi\\\"\"");
        assert_eq!(emit(&[b"a\\b,c"], &options), b"\"a\\\\b,c\"");
    }

    #[test]
    fn test_escape_none_rejects_quote() {
        let mut options = WriteOptions::default();
        options.dialect.escape = Escape::None;
        let mut out = Vec::new();
        let err = write_record(&mut out, &[b"has\"quote,"], &options).unwrap_err();
        assert_eq!(err.code, ErrorCode::Invalid);
    }

    #[test]
    fn test_bare_quote_escaping() {
        let mut options = WriteOptions::default();
        options.always_escape_quotes = true;
        options.quote_if_needed = false;
        options.dialect.allow_unquoted_quotes = true;
        // Minimal quoting is off, so the field stays bare, but the quote
        // is still doubled.
        assert_eq!(emit(&[b"it\"s"], &options), b"it\"\"s");
    }

    #[test]
    fn test_trim_trailing_empty_fields() {
        let mut options = WriteOptions::default();
        options.trim_trailing_empty_fields = true;
        assert_eq!(emit(&[b"Bob", b"25", b"", b""], &options), b"Bob,25");
        assert_eq!(emit(&[b"", b"x", b""], &options), b",x");
    }

    #[test]
    fn test_single_empty_field_record_is_quoted() {
        let options = WriteOptions::default();
        assert_eq!(emit(&[b""], &options), b"\"\"");
    }

    #[test]
    fn test_fixed_sink_truncation() {
        let mut buf = [0u8; 4];
        let mut sink = FixedSink::new(&mut buf);
        sink.write(b"ab").unwrap();
        let err = sink.write(b"cde").unwrap_err();
        assert_eq!(err.code, ErrorCode::State);
        assert!(sink.truncated());
        assert_eq!(sink.written(), 4);
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn test_callback_sink() {
        let mut collected = Vec::new();
        {
            let mut sink = CallbackSink::new(|bytes: &[u8]| {
                collected.extend_from_slice(bytes);
                Ok(())
            });
            write_record(&mut sink, &[b"a", b"b"], &WriteOptions::default()).unwrap();
        }
        assert_eq!(collected, b"a,b");
    }

    #[test]
    fn test_write_table_with_crlf() {
        let mut table = crate::Table::with_headers(&[b"a", b"b"]).unwrap();
        table.row_append(&[b"1", b"2"]).unwrap();
        let mut options = WriteOptions::default();
        options.newline = Newline::CrLf;
        let mut out = Vec::new();
        write_table(&table, &mut out, &options).unwrap();
        assert_eq!(out, b"a,b\r\n1,2\r\n");

        let mut body = Vec::new();
        write_data_rows(&table, &mut body, &options).unwrap();
        assert_eq!(body, b"1,2\r\n");
    }

    #[test]
    fn test_stream_writer_balanced_records() {
        let mut writer = StreamWriter::new(Vec::new(), WriteOptions::default());
        writer.begin_record().unwrap();
        writer.write_field(b"a").unwrap();
        writer.write_field(b"b").unwrap();
        writer.end_record().unwrap();
        writer.begin_record().unwrap();
        writer.write_field(b"c").unwrap();
        writer.end_record().unwrap();
        let out = writer.finish().unwrap();
        assert_eq!(out, b"a,b\nc\n");
    }

    #[test]
    fn test_stream_writer_state_errors() {
        let mut writer = StreamWriter::new(Vec::new(), WriteOptions::default());
        assert_eq!(
            writer.write_field(b"x").unwrap_err().code,
            ErrorCode::State
        );
        writer.begin_record().unwrap();
        assert_eq!(writer.begin_record().unwrap_err().code, ErrorCode::State);
        writer.write_field(b"x").unwrap();
        let err = writer.finish().unwrap_err();
        assert_eq!(err.code, ErrorCode::State);
    }
}
