//! Streaming CSV parser.
//!
//! A byte-driven state machine that turns chunks of input into record and
//! field events. The parser is the only resumable component in the crate:
//! `feed` consumes as much of a chunk as it can, holding partial constructs
//! (a CR that may open CRLF, an unfinished UTF-8 sequence, a half-matched
//! comment prefix) in a small tail buffer, and `finish` flushes whatever
//! remains. Feeding the same bytes in any chunking produces the same event
//! sequence.
//!
//! Field bytes are not copied while the field needs no rewriting: the event
//! hands out a slice of the current chunk together with its absolute input
//! range, which lets the table builder keep zero-copy views into the
//! caller's buffer. The first construct that changes the content (doubled
//! quote, backslash escape) switches the field into a parser-owned buffer.
//!
//! Delimiter, quote, and comment-prefix bytes must be ASCII; validation
//! treats them as sequence boundaries.

use std::ops::Range;

use memchr::{memchr, memchr2, memchr3};

use crate::dialect::{Dialect, Escape, Limits, Newline, ParseOptions};
use crate::error::{context_snippet, Error, ErrorCode};
use crate::scan::{check_bom, check_utf8, detect_newline, BomCheck, NewlineCheck, Position, Utf8Check};

/// Parser state between two bytes of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the first byte of a record.
    StartOfRecord,
    /// Before the first byte of a field.
    StartOfField,
    /// Inside an unquoted field.
    UnquotedField,
    /// Inside a quoted field.
    QuotedField,
    /// After a quote inside a quoted field (closing quote or escape pair).
    QuoteInQuoted,
    /// After a backslash inside a quoted field.
    EscapeInQuoted,
    /// Inside a comment line.
    Comment,
    /// Input fully consumed or parsing aborted.
    End,
}

/// One field handed to the event callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEvent<'a> {
    /// Field content with quotes stripped and escapes resolved.
    pub data: &'a [u8],
    /// Absolute byte range of the content in the original input, present
    /// only when `data` is byte-for-byte identical to that range.
    pub source: Option<Range<usize>>,
    /// The field was written in quotes.
    pub quoted: bool,
}

/// Events emitted in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<'a> {
    RecordBegin,
    Field(FieldEvent<'a>),
    RecordEnd,
    End,
}

enum RunStatus {
    /// The whole run was consumed as field content.
    Full,
    /// A UTF-8 sequence was cut by the chunk end after `consumed` bytes.
    NeedMore { consumed: usize },
}

/// Incremental parser over a fixed dialect and option set.
pub struct StreamParser {
    options: ParseOptions,
    limits: Limits,
    state: State,
    pos: Position,

    // Current field. While `buffered` is false the content is the input
    // range `field_start .. field_start + field_len`; afterwards it lives
    // in `field_buffer`. `transformed` marks content that no longer equals
    // the raw input bytes.
    field_buffer: Vec<u8>,
    buffered: bool,
    transformed: bool,
    field_start: usize,
    field_len: usize,
    quoted: bool,

    record_open: bool,
    after_delimiter: bool,
    field_count: usize,
    record_bytes: usize,
    records_committed: usize,
    total_bytes: usize,

    /// Unconsumed bytes of a construct that straddles a chunk boundary.
    tail: Vec<u8>,
    bom_checked: bool,
    done: bool,
}

impl StreamParser {
    pub fn new(options: ParseOptions) -> Self {
        let limits = options.limits.resolved();
        Self {
            options,
            limits,
            state: State::StartOfRecord,
            pos: Position::new(),
            field_buffer: Vec::new(),
            buffered: false,
            transformed: false,
            field_start: 0,
            field_len: 0,
            quoted: false,
            record_open: false,
            after_delimiter: false,
            field_count: 0,
            record_bytes: 0,
            records_committed: 0,
            total_bytes: 0,
            tail: Vec::new(),
            bom_checked: false,
            done: false,
        }
    }

    /// Current input position (next unconsumed byte).
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Records committed so far.
    pub fn records(&self) -> usize {
        self.records_committed
    }

    /// Consume as much of `chunk` as possible, invoking `on_event` for each
    /// record boundary and field. An error from the callback aborts the
    /// parse and is returned unchanged.
    pub fn feed<F>(&mut self, chunk: &[u8], on_event: &mut F) -> Result<(), Error>
    where
        F: for<'a> FnMut(Event<'a>) -> Result<(), Error>,
    {
        if self.done {
            return Err(Error::new(ErrorCode::State, "parser already finished"));
        }
        let result = if self.tail.is_empty() {
            let base = self.pos.offset;
            self.feed_inner(chunk, base, false, on_event)
                .map_err(|e| self.attach_snippet(e, chunk, base))
        } else {
            let mut combined = std::mem::take(&mut self.tail);
            combined.extend_from_slice(chunk);
            let base = self.pos.offset;
            self.feed_inner(&combined, base, false, on_event)
                .map_err(|e| self.attach_snippet(e, &combined, base))
        };
        if result.is_err() {
            self.state = State::End;
            self.done = true;
        }
        result
    }

    /// Flush buffered constructs, close an unterminated record, and emit
    /// the final `End` event. The parser cannot be fed afterwards.
    pub fn finish<F>(&mut self, on_event: &mut F) -> Result<(), Error>
    where
        F: for<'a> FnMut(Event<'a>) -> Result<(), Error>,
    {
        if self.done {
            return Err(Error::new(ErrorCode::State, "parser already finished"));
        }
        let tail = std::mem::take(&mut self.tail);
        let base = self.pos.offset;
        let result = self
            .feed_inner(&tail, base, true, on_event)
            .map_err(|e| self.attach_snippet(e, &tail, base));
        self.state = State::End;
        self.done = true;
        result
    }

    fn feed_inner<F>(
        &mut self,
        chunk: &[u8],
        base: usize,
        at_eof: bool,
        on_event: &mut F,
    ) -> Result<(), Error>
    where
        F: for<'a> FnMut(Event<'a>) -> Result<(), Error>,
    {
        let d = self.options.dialect.clone();
        let len = chunk.len();
        let mut i = 0usize;

        if !self.bom_checked && (!chunk.is_empty() || at_eof) {
            match check_bom(&chunk[..len.min(3)]) {
                BomCheck::Incomplete if !at_eof => return self.stash(chunk, 0, base),
                BomCheck::Present if !self.options.keep_bom => {
                    self.count_raw(3)?;
                    self.pos.advance(3)?;
                    i = 3;
                }
                // Kept BOM bytes (or a short prefix at end of input) are
                // ordinary field content.
                _ => {}
            }
            self.bom_checked = true;
        }

        while i < len {
            match self.state {
                State::End => {
                    return Err(Error::new(ErrorCode::State, "parser already finished"));
                }

                State::StartOfRecord => {
                    if d.allow_comments && !d.comment_prefix.is_empty() {
                        let rem = &chunk[i..];
                        if rem.len() < d.comment_prefix.len() {
                            if d.comment_prefix.starts_with(rem) && !at_eof {
                                return self.stash(chunk, i, base);
                            }
                        } else if rem.starts_with(&d.comment_prefix) {
                            self.count_raw(d.comment_prefix.len())?;
                            self.pos.advance(d.comment_prefix.len())?;
                            i += d.comment_prefix.len();
                            self.state = State::Comment;
                            continue;
                        }
                    }
                    // Blank records never materialize.
                    match detect_newline(&chunk[i..], &d, at_eof) {
                        NewlineCheck::Match(kind) => {
                            self.count_raw(kind.as_bytes().len())?;
                            self.pos.advance_newline(kind)?;
                            i += kind.as_bytes().len();
                            continue;
                        }
                        NewlineCheck::Incomplete => return self.stash(chunk, i, base),
                        NewlineCheck::None => {}
                    }
                    if self.records_committed >= self.limits.max_rows {
                        return Err(Error::new(
                            ErrorCode::Limit,
                            format!("row count exceeds maximum of {}", self.limits.max_rows),
                        )
                        .at(self.pos));
                    }
                    on_event(Event::RecordBegin)?;
                    self.record_open = true;
                    self.after_delimiter = false;
                    self.field_count = 0;
                    self.record_bytes = 0;
                    self.state = State::StartOfField;
                    // The byte is reprocessed in StartOfField.
                }

                State::StartOfField => {
                    if self.field_count >= self.limits.max_cols {
                        return Err(Error::new(
                            ErrorCode::TooManyColumns,
                            format!("field count exceeds maximum of {}", self.limits.max_cols),
                        )
                        .at(self.pos)
                        .with_row(self.records_committed));
                    }
                    let b = chunk[i];
                    if b == b' ' && d.allow_space_after_delimiter && self.after_delimiter {
                        self.after_delimiter = false;
                        self.count_raw(1)?;
                        self.pos.advance(1)?;
                        i += 1;
                        continue;
                    }
                    if (b == b' ' || b == b'\t') && d.trim_unquoted_fields {
                        self.count_raw(1)?;
                        self.pos.advance(1)?;
                        i += 1;
                        continue;
                    }
                    if b == d.quote {
                        self.count_raw(1)?;
                        self.pos.advance(1)?;
                        i += 1;
                        self.begin_field(base + i, true);
                        self.state = State::QuotedField;
                        continue;
                    }
                    if b == d.delimiter {
                        self.begin_field(base + i, false);
                        self.emit_field(chunk, base, on_event)?;
                        self.count_raw(1)?;
                        self.pos.advance(1)?;
                        i += 1;
                        self.after_delimiter = true;
                        continue;
                    }
                    match detect_newline(&chunk[i..], &d, at_eof) {
                        NewlineCheck::Match(kind) => {
                            self.begin_field(base + i, false);
                            self.emit_field(chunk, base, on_event)?;
                            self.end_record(on_event)?;
                            self.count_raw(kind.as_bytes().len())?;
                            self.pos.advance_newline(kind)?;
                            i += kind.as_bytes().len();
                            self.state = State::StartOfRecord;
                            continue;
                        }
                        NewlineCheck::Incomplete => return self.stash(chunk, i, base),
                        NewlineCheck::None => {}
                    }
                    self.begin_field(base + i, false);
                    self.state = State::UnquotedField;
                    // The byte is reprocessed as field content.
                }

                State::UnquotedField => {
                    let rem = &chunk[i..];
                    let stop = memchr3(d.delimiter, b'\n', b'\r', rem).unwrap_or(rem.len());
                    if !d.allow_unquoted_quotes {
                        if let Some(q) = memchr(d.quote, &rem[..stop]) {
                            self.consume_content_run(chunk, i, q)?;
                            return Err(Error::new(
                                ErrorCode::UnexpectedQuote,
                                "quote character in unquoted field",
                            )
                            .at(self.pos)
                            .with_row(self.records_committed)
                            .with_column(self.field_count));
                        }
                    }
                    match self.consume_validated_run(chunk, i, stop, at_eof)? {
                        RunStatus::NeedMore { consumed } => {
                            return self.stash(chunk, i + consumed, base)
                        }
                        RunStatus::Full => i += stop,
                    }
                    if i >= len {
                        break;
                    }
                    let b = chunk[i];
                    if b == d.delimiter {
                        self.emit_field(chunk, base, on_event)?;
                        self.count_raw(1)?;
                        self.pos.advance(1)?;
                        i += 1;
                        self.after_delimiter = true;
                        self.state = State::StartOfField;
                        continue;
                    }
                    match detect_newline(&chunk[i..], &d, at_eof) {
                        NewlineCheck::Match(kind) => {
                            self.emit_field(chunk, base, on_event)?;
                            self.end_record(on_event)?;
                            self.count_raw(kind.as_bytes().len())?;
                            self.pos.advance_newline(kind)?;
                            i += kind.as_bytes().len();
                            self.state = State::StartOfRecord;
                        }
                        NewlineCheck::Incomplete => return self.stash(chunk, i, base),
                        NewlineCheck::None => {
                            // A newline byte the dialect does not terminate
                            // on: content when permitted, an error otherwise.
                            if d.allow_unquoted_newlines {
                                self.consume_content_run(chunk, i, 1)?;
                                i += 1;
                            } else {
                                return Err(Error::new(
                                    ErrorCode::Invalid,
                                    "newline byte in unquoted field",
                                )
                                .at(self.pos)
                                .with_row(self.records_committed)
                                .with_column(self.field_count));
                            }
                        }
                    }
                }

                State::QuotedField => {
                    let rem = &chunk[i..];
                    let mut stop = memchr3(d.quote, b'\n', b'\r', rem).unwrap_or(rem.len());
                    if d.escape == Escape::Backslash {
                        if let Some(bs) = memchr(b'\\', &rem[..stop]) {
                            stop = bs;
                        }
                    }
                    match self.consume_validated_run(chunk, i, stop, at_eof)? {
                        RunStatus::NeedMore { consumed } => {
                            return self.stash(chunk, i + consumed, base)
                        }
                        RunStatus::Full => i += stop,
                    }
                    if i >= len {
                        break;
                    }
                    let b = chunk[i];
                    if b == d.quote {
                        self.count_raw(1)?;
                        self.pos.advance(1)?;
                        i += 1;
                        self.state = State::QuoteInQuoted;
                        continue;
                    }
                    if b == b'\\' && d.escape == Escape::Backslash {
                        self.ensure_buffered(chunk, base);
                        self.transformed = true;
                        self.count_raw(1)?;
                        self.pos.advance(1)?;
                        i += 1;
                        self.state = State::EscapeInQuoted;
                        continue;
                    }
                    // b is \r or \n.
                    if !d.newline_in_quotes {
                        return Err(Error::new(
                            ErrorCode::Invalid,
                            "newline in quoted field",
                        )
                        .at(self.pos)
                        .with_row(self.records_committed)
                        .with_column(self.field_count));
                    }
                    let kind = if b == b'\n' {
                        Newline::Lf
                    } else if chunk.get(i + 1) == Some(&b'\n') {
                        Newline::CrLf
                    } else if i + 1 >= len && !at_eof {
                        // CR at the chunk edge: the next byte decides CRLF.
                        return self.stash(chunk, i, base);
                    } else {
                        Newline::Cr
                    };
                    let n = kind.as_bytes().len();
                    self.check_field_budget(n)?;
                    self.count_raw(n)?;
                    if self.buffered {
                        self.field_buffer.extend_from_slice(kind.as_bytes());
                    }
                    self.field_len += n;
                    self.pos.advance_newline(kind)?;
                    i += n;
                }

                State::QuoteInQuoted => {
                    let b = chunk[i];
                    if b == d.quote && d.escape == Escape::DoubledQuote {
                        self.ensure_buffered(chunk, base);
                        self.transformed = true;
                        self.check_field_budget(1)?;
                        self.count_raw(1)?;
                        self.field_buffer.push(d.quote);
                        self.field_len += 1;
                        self.pos.advance(1)?;
                        i += 1;
                        self.state = State::QuotedField;
                        continue;
                    }
                    if b == d.delimiter {
                        self.emit_field(chunk, base, on_event)?;
                        self.count_raw(1)?;
                        self.pos.advance(1)?;
                        i += 1;
                        self.after_delimiter = true;
                        self.state = State::StartOfField;
                        continue;
                    }
                    match detect_newline(&chunk[i..], &d, at_eof) {
                        NewlineCheck::Match(kind) => {
                            self.emit_field(chunk, base, on_event)?;
                            self.end_record(on_event)?;
                            self.count_raw(kind.as_bytes().len())?;
                            self.pos.advance_newline(kind)?;
                            i += kind.as_bytes().len();
                            self.state = State::StartOfRecord;
                            continue;
                        }
                        NewlineCheck::Incomplete => return self.stash(chunk, i, base),
                        NewlineCheck::None => {}
                    }
                    return Err(Error::new(
                        ErrorCode::Invalid,
                        "unexpected byte after closing quote",
                    )
                    .at(self.pos)
                    .with_row(self.records_committed)
                    .with_column(self.field_count));
                }

                State::EscapeInQuoted => {
                    let b = chunk[i];
                    let decoded = match b {
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'\\' => b'\\',
                        q if q == d.quote => d.quote,
                        _ => {
                            return Err(Error::new(
                                ErrorCode::BadEscape,
                                format!("unknown escape sequence \\{}", b as char),
                            )
                            .at(self.pos)
                            .with_row(self.records_committed)
                            .with_column(self.field_count));
                        }
                    };
                    self.check_field_budget(1)?;
                    self.count_raw(1)?;
                    self.field_buffer.push(decoded);
                    self.field_len += 1;
                    self.pos.advance(1)?;
                    i += 1;
                    self.state = State::QuotedField;
                }

                State::Comment => {
                    let rem = &chunk[i..];
                    let stop = memchr2(b'\r', b'\n', rem).unwrap_or(rem.len());
                    self.count_raw(stop)?;
                    self.pos.advance(stop)?;
                    i += stop;
                    if i >= len {
                        break;
                    }
                    match detect_newline(&chunk[i..], &d, at_eof) {
                        NewlineCheck::Match(kind) => {
                            self.count_raw(kind.as_bytes().len())?;
                            self.pos.advance_newline(kind)?;
                            i += kind.as_bytes().len();
                            self.state = State::StartOfRecord;
                        }
                        NewlineCheck::Incomplete => return self.stash(chunk, i, base),
                        NewlineCheck::None => {
                            // Unaccepted newline byte inside the comment.
                            self.count_raw(1)?;
                            self.pos.advance(1)?;
                            i += 1;
                        }
                    }
                }
            }
        }

        if at_eof {
            match self.state {
                State::UnquotedField | State::QuoteInQuoted => {
                    self.emit_field(chunk, base, on_event)?;
                    self.end_record(on_event)?;
                }
                State::StartOfField => {
                    // Open record ending after a delimiter: a final empty
                    // field belongs to it.
                    self.begin_field(self.pos.offset, false);
                    self.emit_field(chunk, base, on_event)?;
                    self.end_record(on_event)?;
                }
                State::QuotedField => {
                    return Err(Error::new(ErrorCode::Invalid, "unterminated quoted field")
                        .at(self.pos)
                        .with_row(self.records_committed)
                        .with_column(self.field_count));
                }
                State::EscapeInQuoted => {
                    return Err(Error::new(
                        ErrorCode::BadEscape,
                        "escape sequence cut off by end of input",
                    )
                    .at(self.pos)
                    .with_row(self.records_committed)
                    .with_column(self.field_count));
                }
                State::StartOfRecord | State::Comment | State::End => {}
            }
            self.state = State::End;
            on_event(Event::End)?;
        } else if !self.buffered
            && matches!(
                self.state,
                State::UnquotedField | State::QuotedField | State::QuoteInQuoted
            )
        {
            // The chunk is gone after this call; keep the pending view.
            // Zero-length fields switch to the (empty) buffer too, so no
            // stale chunk range survives the boundary.
            self.buffer_pending(chunk, base);
        }
        Ok(())
    }

    fn buffer_pending(&mut self, chunk: &[u8], base: usize) {
        if self.field_len > 0 {
            let start = self.field_start - base;
            self.field_buffer
                .extend_from_slice(&chunk[start..start + self.field_len]);
        }
        self.buffered = true;
    }

    /// Move the current field view into the owned buffer ahead of a
    /// content rewrite.
    fn ensure_buffered(&mut self, chunk: &[u8], base: usize) {
        if !self.buffered {
            self.buffer_pending(chunk, base);
        }
    }

    fn begin_field(&mut self, abs_start: usize, quoted: bool) {
        self.field_buffer.clear();
        self.buffered = false;
        self.transformed = false;
        self.field_start = abs_start;
        self.field_len = 0;
        self.quoted = quoted;
        self.after_delimiter = false;
    }

    fn emit_field<F>(&mut self, chunk: &[u8], base: usize, on_event: &mut F) -> Result<(), Error>
    where
        F: for<'a> FnMut(Event<'a>) -> Result<(), Error>,
    {
        if self.options.dialect.trim_unquoted_fields && !self.quoted {
            let content: &[u8] = if self.buffered {
                &self.field_buffer
            } else {
                let start = self.field_start - base;
                &chunk[start..start + self.field_len]
            };
            let trimmed = content.len()
                - content
                    .iter()
                    .rev()
                    .take_while(|&&b| b == b' ' || b == b'\t')
                    .count();
            if trimmed < content.len() {
                let cut = content.len() - trimmed;
                if self.buffered {
                    let keep = self.field_buffer.len() - cut;
                    self.field_buffer.truncate(keep);
                }
                self.field_len -= cut;
            }
        }

        let source = if self.transformed {
            None
        } else {
            Some(self.field_start..self.field_start + self.field_len)
        };
        let data: &[u8] = if self.buffered {
            &self.field_buffer
        } else {
            let start = self.field_start - base;
            &chunk[start..start + self.field_len]
        };
        on_event(Event::Field(FieldEvent {
            data,
            source,
            quoted: self.quoted,
        }))?;

        self.field_count += 1;
        self.field_buffer.clear();
        self.buffered = false;
        self.transformed = false;
        self.field_len = 0;
        self.quoted = false;
        Ok(())
    }

    fn end_record<F>(&mut self, on_event: &mut F) -> Result<(), Error>
    where
        F: for<'a> FnMut(Event<'a>) -> Result<(), Error>,
    {
        on_event(Event::RecordEnd)?;
        self.record_open = false;
        self.records_committed += 1;
        Ok(())
    }

    /// Validate (when enabled) and consume a run of field content bytes.
    fn consume_validated_run(
        &mut self,
        chunk: &[u8],
        i: usize,
        run_len: usize,
        at_eof: bool,
    ) -> Result<RunStatus, Error> {
        if self.options.validate_utf8 {
            let rem = &chunk[i..];
            let mut j = 0;
            while j < run_len {
                match check_utf8(&rem[j..]) {
                    Utf8Check::Valid(n) => j += n,
                    Utf8Check::Incomplete => {
                        self.consume_content_run(chunk, i, j)?;
                        if at_eof {
                            return Err(Error::new(
                                ErrorCode::Invalid,
                                "incomplete UTF-8 sequence at end of input",
                            )
                            .at(self.pos));
                        }
                        return Ok(RunStatus::NeedMore { consumed: j });
                    }
                    Utf8Check::Invalid => {
                        self.consume_content_run(chunk, i, j)?;
                        return Err(
                            Error::new(ErrorCode::Invalid, "invalid UTF-8 byte sequence")
                                .at(self.pos),
                        );
                    }
                }
            }
        }
        self.consume_content_run(chunk, i, run_len)?;
        Ok(RunStatus::Full)
    }

    /// Consume `n` bytes of field content starting at `chunk[i]`.
    fn consume_content_run(&mut self, chunk: &[u8], i: usize, n: usize) -> Result<(), Error> {
        if n == 0 {
            return Ok(());
        }
        self.check_field_budget(n)?;
        self.count_raw(n)?;
        if self.buffered {
            self.field_buffer.extend_from_slice(&chunk[i..i + n]);
        }
        self.field_len += n;
        self.pos.advance(n)
    }

    fn check_field_budget(&self, extra: usize) -> Result<(), Error> {
        if self
            .field_len
            .checked_add(extra)
            .map_or(true, |total| total > self.limits.max_field_bytes)
        {
            return Err(Error::new(
                ErrorCode::Limit,
                format!(
                    "field exceeds maximum of {} bytes",
                    self.limits.max_field_bytes
                ),
            )
            .at(self.pos)
            .with_row(self.records_committed)
            .with_column(self.field_count));
        }
        Ok(())
    }

    /// Account `n` consumed bytes against the total and record budgets.
    fn count_raw(&mut self, n: usize) -> Result<(), Error> {
        if self
            .total_bytes
            .checked_add(n)
            .map_or(true, |total| total > self.limits.max_total_bytes)
        {
            return Err(Error::new(
                ErrorCode::Limit,
                format!(
                    "input exceeds maximum of {} bytes",
                    self.limits.max_total_bytes
                ),
            )
            .at(self.pos));
        }
        if self.record_open
            && self
                .record_bytes
                .checked_add(n)
                .map_or(true, |total| total > self.limits.max_record_bytes)
        {
            return Err(Error::new(
                ErrorCode::Limit,
                format!(
                    "record exceeds maximum of {} bytes",
                    self.limits.max_record_bytes
                ),
            )
            .at(self.pos)
            .with_row(self.records_committed));
        }
        self.total_bytes += n;
        if self.record_open {
            self.record_bytes += n;
        }
        Ok(())
    }

    /// Keep everything from `chunk[from..]` for the next feed, preserving a
    /// pending field view first. The stashed bytes are not yet consumed.
    fn stash(&mut self, chunk: &[u8], from: usize, base: usize) -> Result<(), Error> {
        if !self.buffered
            && matches!(
                self.state,
                State::UnquotedField | State::QuotedField | State::QuoteInQuoted
            )
        {
            self.buffer_pending(chunk, base);
        }
        self.tail = chunk[from..].to_vec();
        Ok(())
    }

    fn attach_snippet(&self, mut err: Error, chunk: &[u8], base: usize) -> Error {
        if self.options.enable_context_snippet && err.snippet.is_none() && err.line > 0 {
            let local = err.offset.saturating_sub(base).min(chunk.len());
            err.snippet = Some(context_snippet(
                chunk,
                local,
                self.options.context_radius_bytes,
            ));
        }
        err
    }
}

/// Parse `input` in one shot, driving `on_event` for every event.
pub fn parse<F>(input: &[u8], options: &ParseOptions, mut on_event: F) -> Result<(), Error>
where
    F: for<'a> FnMut(Event<'a>) -> Result<(), Error>,
{
    let mut parser = StreamParser::new(options.clone());
    parser.feed(input, &mut on_event)?;
    parser.finish(&mut on_event)
}

/// Convenience for dialect-only callers.
pub fn parse_with_dialect<F>(input: &[u8], dialect: &Dialect, on_event: F) -> Result<(), Error>
where
    F: for<'a> FnMut(Event<'a>) -> Result<(), Error>,
{
    let options = ParseOptions {
        dialect: dialect.clone(),
        ..ParseOptions::default()
    };
    parse(input, &options, on_event)
}
