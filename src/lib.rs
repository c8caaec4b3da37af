//! Bounded-memory CSV parsing, table manipulation and writing.
//!
//! # Architecture
//!
//! The crate is built from small, separately testable layers:
//!
//! - [`parser`]: an incremental, dialect-driven state machine emitting
//!   record and field events with chunk-boundary buffering and hard input
//!   bounds
//! - [`builder`]: turns the event stream into a [`Table`], keeping
//!   zero-copy views of the input where no rewriting was needed
//! - [`table`]: an arena-backed document with header indexing, atomic
//!   mutations, normalization, compaction and cloning
//! - [`writer`]: sink-based emission under a configurable quoting policy
//!
//! # Examples
//!
//! ```
//! use csv_table::{parse_table, ParseOptions};
//!
//! let mut options = ParseOptions::default();
//! options.dialect.treat_first_row_as_header = true;
//!
//! let input = b"name,age\nAlice,30\nBob,25\n";
//! let table = parse_table(input, &options)?;
//!
//! assert_eq!(table.row_count(), 2);
//! assert_eq!(table.header_index(b"age"), Some(1));
//! assert_eq!(table.field(0, 0), Some(&b"Alice"[..]));
//! # Ok::<(), csv_table::Error>(())
//! ```
//!
//! Streaming input arrives through [`StreamParser::feed`]; output goes
//! through any [`writer::Sink`], including fixed buffers and callbacks.

pub mod arena;
pub mod builder;
pub mod dialect;
pub mod error;
mod json;
pub mod parser;
pub mod scan;
pub mod table;
pub mod writer;

use log::debug;

pub use builder::TableBuilder;
pub use dialect::{
    Dialect, Escape, HeaderDupMode, Limits, Newline, ParseOptions, WriteOptions,
};
pub use error::{Error, ErrorCode, Snippet};
pub use parser::{Event, FieldEvent, StreamParser};
pub use table::{NormalizeTarget, Table};
pub use writer::{
    write_data_rows, write_field, write_record, write_table, BufferSink, CallbackSink, FixedSink,
    Sink, StreamWriter,
};

#[cfg(test)]
mod tests;

/// Parse a complete input buffer into a [`Table`].
///
/// The returned table may hold zero-copy views into `input` when in-situ
/// mode applies; the borrow keeps the buffer alive for the table's
/// lifetime. Use [`Table::clone_table`] to sever the tie.
pub fn parse_table<'a>(input: &'a [u8], options: &ParseOptions) -> Result<Table<'a>, Error> {
    let mut builder = TableBuilder::new(Some(input), options);
    parser::parse(input, options, |event| builder.on_event(event))?;
    let table = builder.finish()?;
    debug!(
        "parsed {} rows x {} columns from {} bytes",
        table.row_count(),
        table.column_count(),
        input.len()
    );
    Ok(table)
}

/// Parse with default options (strict rows, UTF-8 validation, no headers).
pub fn parse_table_default(input: &[u8]) -> Result<Table<'_>, Error> {
    parse_table(input, &ParseOptions::default())
}
