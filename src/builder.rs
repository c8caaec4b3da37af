//! Event stream to table construction.
//!
//! The builder sits behind the parser callback and turns record and field
//! events into rows, deciding per field whether to keep a zero-copy view
//! into the caller's buffer or copy the bytes into the table arena. Header
//! capture and width bookkeeping happen when the final event arrives.

use crate::dialect::ParseOptions;
use crate::error::{Error, ErrorCode};
use crate::parser::{Event, FieldEvent};
use crate::table::{Field, Row, Table};

pub struct TableBuilder<'buf> {
    table: Table<'buf>,
    options: ParseOptions,
    current: Row,
    /// Width every later record must match in strict mode; fixed by the
    /// first committed record.
    expected_width: Option<usize>,
    finalized: bool,
}

impl<'buf> TableBuilder<'buf> {
    /// Builder for a parse over `input`. Passing `None` disables in-situ
    /// storage regardless of the options.
    pub fn new(input: Option<&'buf [u8]>, options: &ParseOptions) -> Self {
        Self {
            table: Table::with_parts(input, options),
            options: options.clone(),
            current: Row::default(),
            expected_width: None,
            finalized: false,
        }
    }

    /// Feed one parser event.
    pub fn on_event(&mut self, event: Event<'_>) -> Result<(), Error> {
        match event {
            Event::RecordBegin => {
                self.current.fields.clear();
                if self.current.fields.capacity() == 0 {
                    self.current.fields.reserve(16);
                }
            }
            Event::Field(field) => {
                let stored = self.store(&field)?;
                self.current.fields.push(stored);
            }
            Event::RecordEnd => self.commit_record()?,
            Event::End => self.finalize()?,
        }
        Ok(())
    }

    /// Hand back the finished table. Finalizes header and width state if
    /// the end event never arrived.
    pub fn finish(mut self) -> Result<Table<'buf>, Error> {
        if !self.finalized {
            self.finalize()?;
        }
        Ok(self.table)
    }

    /// Pick the storage class for one field: the empty sentinel, an
    /// in-situ view of the input, or a copy into the arena.
    fn store(&mut self, field: &FieldEvent<'_>) -> Result<Field, Error> {
        if field.data.is_empty() {
            return Ok(Field::Empty);
        }
        if self.options.in_situ_mode && !self.options.validate_utf8 {
            if let (Some(source), Some(input)) = (&field.source, self.table.ctx.input) {
                if source.end <= input.len() {
                    return Ok(Field::InSitu {
                        start: source.start,
                        len: source.end - source.start,
                    });
                }
            }
        }
        self.table.intern(field.data)
    }

    fn commit_record(&mut self) -> Result<(), Error> {
        // Fieldless records cannot occur mid-stream, but guard anyway so a
        // hand-driven event sequence cannot commit one.
        if self.current.fields.is_empty() {
            return Ok(());
        }
        let width = self.current.width();
        if !self.options.allow_irregular_rows {
            match self.expected_width {
                None => self.expected_width = Some(width),
                Some(expected) if expected != width => {
                    return Err(Error::new(
                        ErrorCode::Invalid,
                        format!("expected {expected} fields, got {width}"),
                    )
                    .with_row(self.table.rows.len()));
                }
                Some(_) => {}
            }
        }
        let row = std::mem::take(&mut self.current);
        self.table.rows.push(row);
        Ok(())
    }

    /// Build the header map and fix `column_count` once the stream ends.
    fn finalize(&mut self) -> Result<(), Error> {
        self.finalized = true;
        if self.options.dialect.treat_first_row_as_header && !self.table.rows.is_empty() {
            self.table
                .build_header_from_first_row(self.options.dialect.header_dup_mode)?;
        }
        self.table.fix_column_count();
        Ok(())
    }
}
