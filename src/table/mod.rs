//! In-memory table of parsed CSV records.
//!
//! Rows hold [`Field`] handles; the bytes behind them live either in the
//! table's arena, in the caller's input buffer (zero-copy views from an
//! in-situ parse), or in the process-wide empty sentinel. The arena owns
//! all copied storage, the table owns the arena, and the borrow on `'buf`
//! keeps the input buffer alive for as long as any view may reference it.
//!
//! Overwritten fields leave their old bytes in the arena until
//! [`Table::compact`] rebuilds it.

mod compact;
mod header;
mod mutate;

pub use mutate::NormalizeTarget;

use crate::arena::{Arena, Span};
use crate::dialect::{HeaderDupMode, Limits, ParseOptions};
use crate::error::{Error, ErrorCode};

use header::HeaderMap;

/// Process-wide sentinel all empty fields resolve to.
pub(crate) const EMPTY_FIELD: &[u8] = b"";

/// Storage handle for one field's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    /// Zero-length content; resolves to [`EMPTY_FIELD`].
    Empty,
    /// Range into the caller's input buffer.
    InSitu { start: usize, len: usize },
    /// Range into the table's arena.
    Arena(Span),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Row {
    pub fields: Vec<Field>,
}

impl Row {
    #[inline]
    pub fn width(&self) -> usize {
        self.fields.len()
    }
}

/// Byte resolution context: the arena plus the optional input buffer.
pub(crate) struct Ctx<'buf> {
    pub arena: Arena,
    pub input: Option<&'buf [u8]>,
}

impl<'buf> Ctx<'buf> {
    pub fn resolve(&self, field: Field) -> &[u8] {
        match field {
            Field::Empty => EMPTY_FIELD,
            // In-situ handles are only created while an input buffer is
            // attached to the table.
            Field::InSitu { start, len } => match self.input {
                Some(input) => &input[start..start + len],
                None => EMPTY_FIELD,
            },
            Field::Arena(span) => self.arena.get(span),
        }
    }
}

/// A parsed or hand-built CSV document.
///
/// When the first row is a header it occupies slot 0 internally and is
/// addressed through the header API; every public row index counts data
/// rows only.
pub struct Table<'buf> {
    pub(crate) ctx: Ctx<'buf>,
    pub(crate) rows: Vec<Row>,
    /// Expected row width; zero until the first row fixes it.
    pub(crate) column_count: usize,
    pub(crate) header: HeaderMap,
    pub(crate) has_header: bool,
    pub(crate) require_unique_headers: bool,
    pub(crate) allow_irregular_rows: bool,
    pub(crate) limits: Limits,
}

impl Table<'static> {
    /// Empty table with default limits and strict row widths.
    pub fn new() -> Self {
        Self::with_parts(None, &ParseOptions::default())
    }

    /// Empty table whose header row, header map, and reverse index are
    /// built from `names`. Duplicate names are rejected.
    pub fn with_headers(names: &[&[u8]]) -> Result<Self, Error> {
        let mut table = Self::new();
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            fields.push(table.intern(name)?);
        }
        let labeled: Vec<(Field, usize)> = fields
            .iter()
            .enumerate()
            .map(|(i, &f)| (f, i))
            .collect();
        table.header = HeaderMap::build(&table.ctx, &labeled, HeaderDupMode::Error, names.len())?;
        table.rows.push(Row { fields });
        table.has_header = true;
        table.require_unique_headers = true;
        table.column_count = names.len();
        Ok(table)
    }
}

impl Default for Table<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'buf> Table<'buf> {
    pub(crate) fn with_parts(input: Option<&'buf [u8]>, options: &ParseOptions) -> Table<'buf> {
        Table {
            ctx: Ctx {
                arena: Arena::new(),
                input,
            },
            rows: Vec::new(),
            column_count: 0,
            header: HeaderMap::new(),
            has_header: false,
            require_unique_headers: options.dialect.header_dup_mode == HeaderDupMode::Error,
            allow_irregular_rows: options.allow_irregular_rows,
            limits: options.limits.resolved(),
        }
    }

    /// Copy `bytes` into the arena, returning the sentinel for empty input.
    pub(crate) fn intern(&mut self, bytes: &[u8]) -> Result<Field, Error> {
        if bytes.is_empty() {
            Ok(Field::Empty)
        } else {
            Ok(Field::Arena(self.ctx.arena.push(bytes)?))
        }
    }

    /// Turn row 0 into the header row, building the name map and reverse
    /// index under the given duplicate policy.
    pub(crate) fn build_header_from_first_row(
        &mut self,
        dup_mode: HeaderDupMode,
    ) -> Result<(), Error> {
        let labeled: Vec<(Field, usize)> = self.rows[0]
            .fields
            .iter()
            .enumerate()
            .map(|(i, &f)| (f, i))
            .collect();
        self.header = HeaderMap::build(&self.ctx, &labeled, dup_mode, self.rows[0].width())?;
        self.has_header = true;
        Ok(())
    }

    /// Fix the expected width after a parse: the first row's width, or the
    /// widest row when irregular widths are allowed.
    pub(crate) fn fix_column_count(&mut self) {
        self.column_count = if self.allow_irregular_rows {
            self.widest_row()
        } else {
            self.rows.first().map(Row::width).unwrap_or(0)
        };
    }

    #[inline]
    pub(crate) fn header_offset(&self) -> usize {
        usize::from(self.has_header)
    }

    #[inline]
    pub(crate) fn data_rows(&self) -> &[Row] {
        &self.rows[self.header_offset()..]
    }

    /// Number of data rows, excluding any header row.
    pub fn row_count(&self) -> usize {
        self.rows.len() - self.header_offset()
    }

    /// Expected row width. Zero for an empty table with no headers.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    pub fn allow_irregular_rows(&self) -> bool {
        self.allow_irregular_rows
    }

    /// Width of one data row; differs from `column_count` only in
    /// irregular mode.
    pub fn row_width(&self, row: usize) -> Option<usize> {
        self.data_rows().get(row).map(Row::width)
    }

    /// Field content at (data row, column).
    pub fn field(&self, row: usize, col: usize) -> Option<&[u8]> {
        let field = *self.data_rows().get(row)?.fields.get(col)?;
        Some(self.ctx.resolve(field))
    }

    /// Whether the field references the caller's input buffer.
    pub fn field_is_in_situ(&self, row: usize, col: usize) -> Option<bool> {
        let field = *self.data_rows().get(row)?.fields.get(col)?;
        Some(matches!(field, Field::InSitu { .. }))
    }

    /// Iterate a data row's field contents.
    pub fn row(&self, row: usize) -> Option<impl Iterator<Item = &[u8]> + '_> {
        let row = self.data_rows().get(row)?;
        Some(row.fields.iter().map(move |&f| self.ctx.resolve(f)))
    }

    /// Header name for a column, through the reverse index.
    pub fn header_name(&self, col: usize) -> Option<&[u8]> {
        let entry = self.header.entry_for_column(col)?;
        Some(self.ctx.resolve(entry.name))
    }

    /// Smallest column index carrying this header name.
    pub fn header_index(&self, name: &[u8]) -> Option<usize> {
        self.header.find_min_index(&self.ctx, name)
    }

    /// Next-greater column index carrying this header name; drives
    /// iteration over duplicates collected at parse time.
    pub fn header_index_after(&self, name: &[u8], current: usize) -> Option<usize> {
        self.header.find_next_index(&self.ctx, name, current)
    }

    /// Check the table's structural invariants: strict rectangularity,
    /// irregular max-width bookkeeping, reverse-index coherence, and view
    /// ranges staying inside their backing storage.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.allow_irregular_rows {
            for (i, row) in self.data_rows().iter().enumerate() {
                if self.column_count != 0 && row.width() != self.column_count {
                    return Err(Error::new(
                        ErrorCode::Invalid,
                        format!(
                            "expected {} fields, got {}",
                            self.column_count,
                            row.width()
                        ),
                    )
                    .with_row(i));
                }
            }
        } else {
            let widest = self.rows.iter().map(Row::width).max().unwrap_or(0);
            if widest != self.column_count {
                return Err(Error::new(
                    ErrorCode::Invalid,
                    format!(
                        "column count {} does not match widest row {}",
                        self.column_count, widest
                    ),
                ));
            }
        }
        self.header.check_coherence(&self.ctx)?;
        let input_len = self.ctx.input.map_or(0, <[u8]>::len);
        for (i, row) in self.rows.iter().enumerate() {
            for (j, field) in row.fields.iter().enumerate() {
                if let Field::InSitu { start, len } = *field {
                    let end = start.checked_add(len);
                    if self.ctx.input.is_none() || end.map_or(true, |e| e > input_len) {
                        return Err(Error::new(
                            ErrorCode::Invalid,
                            "in-situ field outside the input buffer",
                        )
                        .with_row(i)
                        .with_column(j));
                    }
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Table<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("rows", &self.row_count())
            .field("columns", &self.column_count)
            .field("has_header", &self.has_header)
            .field("irregular", &self.allow_irregular_rows)
            .finish()
    }
}
