//! Arena rebuilds: compaction, deep cloning, and clearing.
//!
//! All three walk the live rows into a freshly sized arena and swap the
//! result in at the end, so a failure partway through leaves the original
//! table untouched.

use log::debug;

use crate::arena::Arena;
use crate::error::Error;

use super::header::{HeaderEntry, HeaderMap};
use super::{Ctx, Field, Row, Table};

/// Compacted arenas get a tenth of slack on top of the live payload, with
/// a floor small enough for near-empty tables.
fn sized_arena(payload: usize) -> Arena {
    Arena::with_block_size((payload + payload / 10).max(1024))
}

impl<'buf> Table<'buf> {
    /// Rebuild the arena to hold only live bytes, dropping storage orphaned
    /// by overwrites. In-situ fields keep referencing the input buffer.
    pub fn compact(&mut self) -> Result<(), Error> {
        let before = self.ctx.arena.allocated_bytes();
        let (ctx, rows, header) = self.rebuild(self.rows.len(), false)?;
        debug!(
            "compacted arena: {} -> {} bytes over {} rows",
            before,
            ctx.arena.allocated_bytes(),
            rows.len()
        );
        self.ctx = ctx;
        self.rows = rows;
        self.header = header;
        Ok(())
    }

    /// Deep copy into an independent table. Every field, including in-situ
    /// views, is copied into the new table's arena, so the clone does not
    /// borrow the source input buffer.
    pub fn clone_table(&self) -> Result<Table<'static>, Error> {
        let payload = self.payload_bytes(true);
        let mut arena = sized_arena(payload);
        let rows = copy_rows(&self.ctx, &self.rows, self.rows.len(), true, &mut arena)?;
        let entries = copy_entries(&self.ctx, self.header.entries(), true, &mut arena)?;
        let ctx = Ctx { arena, input: None };
        let header = HeaderMap::from_entries(&ctx, entries, self.column_count);
        Ok(Table {
            ctx,
            rows,
            column_count: self.column_count,
            header,
            has_header: self.has_header,
            require_unique_headers: self.require_unique_headers,
            allow_irregular_rows: self.allow_irregular_rows,
            limits: self.limits,
        })
    }

    /// Drop every data row, keep the header row if present, and compact
    /// the arena down to what the header needs.
    pub fn clear(&mut self) -> Result<(), Error> {
        let keep = self.header_offset();
        let (ctx, rows, header) = self.rebuild(keep, false)?;
        self.ctx = ctx;
        self.rows = rows;
        self.header = header;
        if !self.has_header {
            self.column_count = 0;
        }
        Ok(())
    }

    /// Copy the first `keep` rows and the header entries into a new arena.
    fn rebuild(
        &self,
        keep: usize,
        deep: bool,
    ) -> Result<(Ctx<'buf>, Vec<Row>, HeaderMap), Error> {
        let payload = self.payload_bytes(deep);
        let mut arena = sized_arena(payload);
        let rows = copy_rows(&self.ctx, &self.rows, keep, deep, &mut arena)?;
        let entries = copy_entries(&self.ctx, self.header.entries(), deep, &mut arena)?;
        let ctx = Ctx {
            arena,
            input: self.ctx.input,
        };
        let header = HeaderMap::from_entries(&ctx, entries, self.column_count);
        Ok((ctx, rows, header))
    }

    /// Bytes the rebuilt arena must hold. Deep copies also count in-situ
    /// view lengths.
    fn payload_bytes(&self, deep: bool) -> usize {
        let field_bytes = |field: &Field| match *field {
            Field::Arena(span) => span.len(),
            Field::InSitu { len, .. } if deep => len,
            _ => 0,
        };
        let row_total: usize = self
            .rows
            .iter()
            .flat_map(|row| row.fields.iter())
            .map(field_bytes)
            .sum();
        let header_total: usize = self
            .header
            .entries()
            .iter()
            .map(|entry| field_bytes(&entry.name))
            .sum();
        row_total + header_total
    }
}

fn copy_field(
    ctx: &Ctx<'_>,
    field: Field,
    deep: bool,
    arena: &mut Arena,
) -> Result<Field, Error> {
    match field {
        Field::Empty => Ok(Field::Empty),
        Field::InSitu { .. } if !deep => Ok(field),
        Field::InSitu { .. } | Field::Arena(_) => {
            Ok(Field::Arena(arena.push(ctx.resolve(field))?))
        }
    }
}

fn copy_rows(
    ctx: &Ctx<'_>,
    rows: &[Row],
    keep: usize,
    deep: bool,
    arena: &mut Arena,
) -> Result<Vec<Row>, Error> {
    let mut out = Vec::with_capacity(keep);
    for row in &rows[..keep] {
        let mut fields = Vec::with_capacity(row.width());
        for &field in &row.fields {
            fields.push(copy_field(ctx, field, deep, arena)?);
        }
        out.push(Row { fields });
    }
    Ok(out)
}

fn copy_entries(
    ctx: &Ctx<'_>,
    entries: &[HeaderEntry],
    deep: bool,
    arena: &mut Arena,
) -> Result<Vec<HeaderEntry>, Error> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        out.push(HeaderEntry {
            name: copy_field(ctx, entry.name, deep, arena)?,
            column_index: entry.column_index,
            next: None,
        });
    }
    Ok(out)
}
