//! Row, column, and field mutations.
//!
//! Every operation follows the same protocol: validate, allocate every new
//! structure, and only then write. A failed operation returns with the
//! table observably unchanged; bytes already bump-allocated for it become
//! orphans that the next [`Table::compact`] reclaims.

use crate::error::{Error, ErrorCode};

use super::header::{HeaderEntry, HeaderMap};
use super::{Field, Row, Table};

/// Width selector for [`Table::normalize_rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeTarget {
    /// Widest data row.
    Max,
    /// Narrowest data row.
    Min,
    /// An explicit width.
    Width(usize),
}

impl<'buf> Table<'buf> {
    /// Append a data row. In strict mode the width must match
    /// `column_count` (or fixes it, for the first row of an untyped
    /// table); in irregular mode any width is accepted and `column_count`
    /// tracks the maximum.
    pub fn row_append(&mut self, fields: &[&[u8]]) -> Result<(), Error> {
        self.check_row_budget()?;
        self.check_new_row_width(fields.len(), self.row_count())?;
        let row = Row {
            fields: self.intern_all(fields)?,
        };
        self.rows.push(row);
        self.note_committed_width(fields.len());
        Ok(())
    }

    /// Insert a data row before `row_idx` (`row_idx == row_count` appends).
    pub fn row_insert(&mut self, row_idx: usize, fields: &[&[u8]]) -> Result<(), Error> {
        if row_idx > self.row_count() {
            return Err(row_bounds_error(row_idx, self.row_count()));
        }
        self.check_row_budget()?;
        self.check_new_row_width(fields.len(), row_idx)?;
        let row = Row {
            fields: self.intern_all(fields)?,
        };
        let at = self.header_offset() + row_idx;
        self.rows.insert(at, row);
        self.note_committed_width(fields.len());
        Ok(())
    }

    /// Remove a data row. In irregular mode removing the widest row
    /// recomputes `column_count` over what remains.
    pub fn row_remove(&mut self, row_idx: usize) -> Result<(), Error> {
        if row_idx >= self.row_count() {
            return Err(row_bounds_error(row_idx, self.row_count()));
        }
        let at = self.header_offset() + row_idx;
        let removed = self.rows.remove(at);
        if self.allow_irregular_rows && removed.width() == self.column_count {
            self.column_count = self.widest_row();
        }
        Ok(())
    }

    /// Replace a data row's fields. Strict mode keeps the width;
    /// irregular mode may change it.
    pub fn row_set(&mut self, row_idx: usize, fields: &[&[u8]]) -> Result<(), Error> {
        if row_idx >= self.row_count() {
            return Err(row_bounds_error(row_idx, self.row_count()));
        }
        self.check_new_row_width(fields.len(), row_idx)?;
        let interned = self.intern_all(fields)?;
        let at = self.header_offset() + row_idx;
        self.rows[at].fields = interned;
        if self.allow_irregular_rows {
            self.column_count = self.widest_row();
        }
        Ok(())
    }

    /// Overwrite one field. The new content is always copied into the
    /// arena; a mutated field never aliases the input buffer.
    pub fn field_set(&mut self, row_idx: usize, col_idx: usize, data: &[u8]) -> Result<(), Error> {
        if row_idx >= self.row_count() {
            return Err(row_bounds_error(row_idx, self.row_count()));
        }
        let at = self.header_offset() + row_idx;
        if col_idx >= self.rows[at].width() {
            return Err(Error::new(
                ErrorCode::Invalid,
                format!(
                    "column index {} out of bounds for row of width {}",
                    col_idx,
                    self.rows[at].width()
                ),
            )
            .with_row(row_idx)
            .with_column(col_idx));
        }
        self.check_field_size(data)?;
        let field = self.intern(data)?;
        self.rows[at].fields[col_idx] = field;
        Ok(())
    }

    /// Append a column of empty fields. `name` is required exactly when
    /// the table has a header row.
    pub fn column_append(&mut self, name: Option<&[u8]>) -> Result<(), Error> {
        self.column_insert_impl(self.column_count, name, None)
    }

    /// Append a column populated from `values`, one per data row.
    pub fn column_append_with_values(
        &mut self,
        name: Option<&[u8]>,
        values: &[&[u8]],
    ) -> Result<(), Error> {
        self.column_insert_impl(self.column_count, name, Some(values))
    }

    /// Insert a column of empty fields before `col_idx`.
    pub fn column_insert(&mut self, col_idx: usize, name: Option<&[u8]>) -> Result<(), Error> {
        self.column_insert_impl(col_idx, name, None)
    }

    /// Insert a column populated from `values`, one per data row.
    pub fn column_insert_with_values(
        &mut self,
        col_idx: usize,
        name: Option<&[u8]>,
        values: &[&[u8]],
    ) -> Result<(), Error> {
        self.column_insert_impl(col_idx, name, Some(values))
    }

    fn column_insert_impl(
        &mut self,
        col_idx: usize,
        name: Option<&[u8]>,
        values: Option<&[&[u8]]>,
    ) -> Result<(), Error> {
        // Validate.
        if col_idx > self.column_count {
            return Err(Error::new(
                ErrorCode::Invalid,
                format!(
                    "column index {} out of bounds for width {}",
                    col_idx, self.column_count
                ),
            )
            .with_column(col_idx));
        }
        if self.column_count >= self.limits.max_cols {
            return Err(Error::new(
                ErrorCode::TooManyColumns,
                format!("column count exceeds maximum of {}", self.limits.max_cols),
            ));
        }
        match (self.has_header, name) {
            (true, None) => {
                return Err(Error::new(
                    ErrorCode::Invalid,
                    "table has a header row; new columns need a name",
                ));
            }
            (false, Some(_)) => {
                return Err(Error::new(
                    ErrorCode::Invalid,
                    "table has no header row to hold a column name",
                ));
            }
            _ => {}
        }
        if let Some(name) = name {
            if self.require_unique_headers && self.header.contains(&self.ctx, name) {
                return Err(Error::new(
                    ErrorCode::Invalid,
                    format!(
                        "duplicate header name \"{}\"",
                        String::from_utf8_lossy(name)
                    ),
                )
                .with_column(col_idx));
            }
        }
        if let Some(values) = values {
            if values.len() != self.row_count() {
                return Err(Error::new(
                    ErrorCode::Invalid,
                    format!(
                        "expected {} column values, got {}",
                        self.row_count(),
                        values.len()
                    ),
                ));
            }
        }

        // Allocate.
        let name_field = match name {
            Some(name) => Some(self.intern(name)?),
            None => None,
        };
        let value_fields = match values {
            Some(values) => self.intern_all(values)?,
            None => vec![Field::Empty; self.row_count()],
        };
        let new_header = match name_field {
            Some(field) => {
                let mut entries: Vec<HeaderEntry> = self.header.entries().to_vec();
                for entry in &mut entries {
                    if entry.column_index >= col_idx {
                        entry.column_index += 1;
                    }
                }
                entries.push(HeaderEntry {
                    name: field,
                    column_index: col_idx,
                    next: None,
                });
                Some(HeaderMap::from_entries(
                    &self.ctx,
                    entries,
                    self.column_count + 1,
                ))
            }
            None => None,
        };
        let offset = self.header_offset();
        for row in &mut self.rows[offset..] {
            let pad = col_idx.saturating_sub(row.width());
            row.fields
                .try_reserve(pad + 1)
                .map_err(|_| Error::new(ErrorCode::Oom, "row growth allocation failed"))?;
        }
        if self.has_header {
            self.rows[0]
                .fields
                .try_reserve(1)
                .map_err(|_| Error::new(ErrorCode::Oom, "header growth allocation failed"))?;
        }

        // Commit.
        if let Some(field) = name_field {
            let at = col_idx.min(self.rows[0].width());
            self.rows[0].fields.insert(at, field);
        }
        for (i, row) in self.rows[offset..].iter_mut().enumerate() {
            if row.width() < col_idx {
                row.fields.resize(col_idx, Field::Empty);
            }
            row.fields.insert(col_idx, value_fields[i]);
        }
        if let Some(map) = new_header {
            self.header = map;
        }
        self.column_count += 1;
        Ok(())
    }

    /// Remove a column; header entries shift down with the fields.
    pub fn column_remove(&mut self, col_idx: usize) -> Result<(), Error> {
        if col_idx >= self.column_count {
            return Err(Error::new(
                ErrorCode::Invalid,
                format!(
                    "column index {} out of bounds for width {}",
                    col_idx, self.column_count
                ),
            )
            .with_column(col_idx));
        }

        let new_header = if self.has_header {
            let mut entries: Vec<HeaderEntry> = self
                .header
                .entries()
                .iter()
                .filter(|e| e.column_index != col_idx)
                .cloned()
                .collect();
            for entry in &mut entries {
                if entry.column_index > col_idx {
                    entry.column_index -= 1;
                }
            }
            Some(HeaderMap::from_entries(
                &self.ctx,
                entries,
                self.column_count - 1,
            ))
        } else {
            None
        };

        for row in &mut self.rows {
            if col_idx < row.width() {
                row.fields.remove(col_idx);
            }
        }
        if let Some(map) = new_header {
            self.header = map;
        }
        self.column_count = if self.allow_irregular_rows {
            self.widest_row()
        } else {
            self.column_count - 1
        };
        Ok(())
    }

    /// Rename a header column in place. The old name's bytes stay in the
    /// arena until the next compaction.
    pub fn column_rename(&mut self, col_idx: usize, new_name: &[u8]) -> Result<(), Error> {
        if !self.has_header {
            return Err(Error::new(
                ErrorCode::Invalid,
                "table has no header row to rename",
            ));
        }
        if self.header.entry_for_column(col_idx).is_none() {
            return Err(Error::new(
                ErrorCode::Invalid,
                format!("no header entry for column {col_idx}"),
            )
            .with_column(col_idx));
        }
        if self.require_unique_headers {
            if let Some(existing) = self.header.find_min_index(&self.ctx, new_name) {
                if existing != col_idx {
                    return Err(Error::new(
                        ErrorCode::Invalid,
                        format!(
                            "duplicate header name \"{}\"",
                            String::from_utf8_lossy(new_name)
                        ),
                    )
                    .with_column(col_idx));
                }
            }
        }

        let name_field = self.intern(new_name)?;
        let mut entries: Vec<HeaderEntry> = self.header.entries().to_vec();
        for entry in &mut entries {
            if entry.column_index == col_idx {
                entry.name = name_field;
            }
        }
        let map = HeaderMap::from_entries(&self.ctx, entries, self.column_count);

        self.header = map;
        self.rows[0].fields[col_idx] = name_field;
        Ok(())
    }

    /// Bring every data row to a common width, padding short rows with
    /// empty fields. Long rows are truncated only when `truncate_long` is
    /// set; otherwise their presence fails the operation.
    pub fn normalize_rows(
        &mut self,
        target: NormalizeTarget,
        truncate_long: bool,
    ) -> Result<(), Error> {
        if self.row_count() == 0 {
            return Ok(());
        }
        let widths = self.data_rows().iter().map(Row::width);
        let target = match target {
            NormalizeTarget::Max => widths.max().unwrap_or(0),
            NormalizeTarget::Min => widths.min().unwrap_or(0),
            NormalizeTarget::Width(n) => n,
        };
        if target > self.limits.max_cols {
            return Err(Error::new(
                ErrorCode::TooManyColumns,
                format!("column count exceeds maximum of {}", self.limits.max_cols),
            ));
        }
        if !self.allow_irregular_rows && self.column_count != 0 && target != self.column_count {
            return Err(Error::new(
                ErrorCode::Invalid,
                format!(
                    "cannot normalize a strict table of width {} to {}",
                    self.column_count, target
                ),
            ));
        }
        if !truncate_long {
            if let Some(row_idx) = self
                .data_rows()
                .iter()
                .position(|row| row.width() > target)
            {
                return Err(Error::new(
                    ErrorCode::Invalid,
                    format!(
                        "row is {} fields wide, target is {}",
                        self.data_rows()[row_idx].width(),
                        target
                    ),
                )
                .with_row(row_idx));
            }
        }

        let offset = self.header_offset();
        for row in &mut self.rows[offset..] {
            if row.width() < target {
                row.fields
                    .try_reserve(target - row.width())
                    .map_err(|_| Error::new(ErrorCode::Oom, "row growth allocation failed"))?;
            }
        }

        for row in &mut self.rows[offset..] {
            if row.width() > target {
                row.fields.truncate(target);
            } else {
                row.fields.resize(target, Field::Empty);
            }
        }
        self.column_count = if self.has_header {
            self.rows[0].width().max(target)
        } else {
            target
        };
        Ok(())
    }

    pub(crate) fn widest_row(&self) -> usize {
        self.rows.iter().map(Row::width).max().unwrap_or(0)
    }

    fn intern_all(&mut self, values: &[&[u8]]) -> Result<Vec<Field>, Error> {
        let mut fields = Vec::new();
        fields
            .try_reserve_exact(values.len())
            .map_err(|_| Error::new(ErrorCode::Oom, "row allocation failed"))?;
        for value in values {
            self.check_field_size(value)?;
            fields.push(self.intern(value)?);
        }
        Ok(fields)
    }

    fn check_field_size(&self, data: &[u8]) -> Result<(), Error> {
        if data.len() > self.limits.max_field_bytes {
            return Err(Error::new(
                ErrorCode::Limit,
                format!(
                    "field exceeds maximum of {} bytes",
                    self.limits.max_field_bytes
                ),
            ));
        }
        Ok(())
    }

    fn check_row_budget(&self) -> Result<(), Error> {
        if self.row_count() >= self.limits.max_rows {
            return Err(Error::new(
                ErrorCode::Limit,
                format!("row count exceeds maximum of {}", self.limits.max_rows),
            ));
        }
        Ok(())
    }

    fn check_new_row_width(&self, width: usize, row_idx: usize) -> Result<(), Error> {
        if width > self.limits.max_cols {
            return Err(Error::new(
                ErrorCode::TooManyColumns,
                format!("field count exceeds maximum of {}", self.limits.max_cols),
            )
            .with_row(row_idx));
        }
        if !self.allow_irregular_rows && self.column_count != 0 && width != self.column_count {
            return Err(Error::new(
                ErrorCode::Invalid,
                format!("expected {} fields, got {}", self.column_count, width),
            )
            .with_row(row_idx));
        }
        Ok(())
    }

    fn note_committed_width(&mut self, width: usize) {
        if self.allow_irregular_rows {
            self.column_count = self.column_count.max(width);
        } else if self.column_count == 0 {
            self.column_count = width;
        }
    }
}

fn row_bounds_error(row_idx: usize, count: usize) -> Error {
    Error::new(
        ErrorCode::Invalid,
        format!("row index {row_idx} out of bounds for {count} rows"),
    )
    .with_row(row_idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict_table() -> Table<'static> {
        let mut table = Table::with_headers(&[b"a", b"b", b"c"]).unwrap();
        table.row_append(&[b"1", b"2", b"3"]).unwrap();
        table
    }

    #[test]
    fn test_row_append_strict_width_mismatch() {
        let mut table = strict_table();
        let err = table.row_append(&[b"x", b"y"]).unwrap_err();
        assert_eq!(err.code, ErrorCode::Invalid);
        assert!(err.message.contains("expected 3 fields, got 2"));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_row_insert_and_remove() {
        let mut table = strict_table();
        table.row_insert(0, &[b"x", b"y", b"z"]).unwrap();
        assert_eq!(table.field(0, 0), Some(&b"x"[..]));
        assert_eq!(table.field(1, 0), Some(&b"1"[..]));

        assert!(table.row_insert(5, &[b"p", b"q", b"r"]).is_err());

        table.row_remove(0).unwrap();
        assert_eq!(table.field(0, 0), Some(&b"1"[..]));
        assert!(table.row_remove(3).is_err());
    }

    #[test]
    fn test_row_remove_recomputes_irregular_width() {
        let mut table = Table::with_parts(None, &crate::ParseOptions {
            allow_irregular_rows: true,
            ..Default::default()
        });
        table.row_append(&[b"1"]).unwrap();
        table.row_append(&[b"1", b"2", b"3"]).unwrap();
        assert_eq!(table.column_count(), 3);
        table.row_remove(1).unwrap();
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_field_set_bounds_and_copy() {
        let mut table = strict_table();
        table.field_set(0, 1, b"two").unwrap();
        assert_eq!(table.field(0, 1), Some(&b"two"[..]));
        assert_eq!(table.field_is_in_situ(0, 1), Some(false));
        assert!(table.field_set(0, 3, b"x").is_err());
        assert!(table.field_set(1, 0, b"x").is_err());
    }

    #[test]
    fn test_column_append_and_insert() {
        let mut table = strict_table();
        table.column_append(Some(b"d")).unwrap();
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.header_index(b"d"), Some(3));
        assert_eq!(table.field(0, 3), Some(&b""[..]));

        table
            .column_insert_with_values(0, Some(b"id"), &[b"7"])
            .unwrap();
        assert_eq!(table.column_count(), 5);
        assert_eq!(table.header_index(b"id"), Some(0));
        assert_eq!(table.header_index(b"a"), Some(1));
        assert_eq!(table.field(0, 0), Some(&b"7"[..]));
        assert_eq!(table.field(0, 1), Some(&b"1"[..]));
        table.validate().unwrap();
    }

    #[test]
    fn test_column_insert_value_count_checked() {
        let mut table = strict_table();
        let err = table
            .column_append_with_values(Some(b"d"), &[b"1", b"2"])
            .unwrap_err();
        assert!(err.message.contains("expected 1 column values"));
        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn test_column_remove() {
        let mut table = strict_table();
        table.column_remove(1).unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.header_index(b"a"), Some(0));
        assert_eq!(table.header_index(b"b"), None);
        assert_eq!(table.header_index(b"c"), Some(1));
        assert_eq!(table.field(0, 1), Some(&b"3"[..]));
        table.validate().unwrap();
    }

    #[test]
    fn test_column_rename() {
        let mut table = strict_table();
        table.column_rename(1, b"renamed").unwrap();
        assert_eq!(table.header_index(b"renamed"), Some(1));
        assert_eq!(table.header_index(b"b"), None);
        assert_eq!(table.header_name(1), Some(&b"renamed"[..]));

        let err = table.column_rename(0, b"renamed").unwrap_err();
        assert!(err.message.contains("duplicate"));
        // Renaming a column to its own name is a no-op, not a duplicate.
        table.column_rename(1, b"renamed").unwrap();
        table.validate().unwrap();
    }

    #[test]
    fn test_normalize_rows() {
        let mut table = Table::with_parts(None, &crate::ParseOptions {
            allow_irregular_rows: true,
            ..Default::default()
        });
        table.row_append(&[b"1", b"2"]).unwrap();
        table.row_append(&[b"3", b"4", b"5", b"6"]).unwrap();

        table.normalize_rows(NormalizeTarget::Max, false).unwrap();
        assert_eq!(table.row_width(0), Some(4));
        assert_eq!(table.field(0, 3), Some(&b""[..]));
        assert_eq!(table.column_count(), 4);

        let err = table.normalize_rows(NormalizeTarget::Width(2), false).unwrap_err();
        assert_eq!(err.code, ErrorCode::Invalid);
        assert_eq!(table.row_width(1), Some(4));

        table.normalize_rows(NormalizeTarget::Width(2), true).unwrap();
        assert_eq!(table.row_width(1), Some(2));
        assert_eq!(table.column_count(), 2);
        table.validate().unwrap();
    }
}
