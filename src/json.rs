//! JSON export of parsed tables.
//!
//! Tables with headers serialize as an array of objects keyed by header
//! name; tables without headers serialize as an array of string arrays.
//! Every value is a string, and rows shorter than the header are padded
//! with empty strings so each object carries every key.

use serde_json::{json, Map, Value};

use crate::error::{Error, ErrorCode};
use crate::table::Table;

impl Table<'_> {
    /// Serialize the data rows to a JSON string.
    ///
    /// Field bytes outside UTF-8 are replaced rather than rejected, which
    /// keeps the export usable on tables parsed with validation off.
    pub fn to_json(&self) -> Result<String, Error> {
        fn lossy(bytes: &[u8]) -> String {
            String::from_utf8_lossy(bytes).into_owned()
        }

        let value = if self.has_header() {
            let headers: Vec<String> = self.rows[0]
                .fields
                .iter()
                .map(|&f| lossy(self.ctx.resolve(f)))
                .collect();
            let mut records = Vec::with_capacity(self.row_count());
            for row in self.data_rows() {
                let mut object = Map::new();
                for (i, header) in headers.iter().enumerate() {
                    let field = row
                        .fields
                        .get(i)
                        .map_or_else(String::new, |&f| lossy(self.ctx.resolve(f)));
                    object.insert(header.clone(), json!(field));
                }
                records.push(Value::Object(object));
            }
            Value::Array(records)
        } else {
            let records: Vec<Value> = self
                .data_rows()
                .iter()
                .map(|row| {
                    Value::Array(
                        row.fields
                            .iter()
                            .map(|&f| json!(lossy(self.ctx.resolve(f))))
                            .collect(),
                    )
                })
                .collect();
            Value::Array(records)
        };
        serde_json::to_string(&value).map_err(|e| {
            Error::new(ErrorCode::Invalid, format!("failed to serialize JSON: {e}"))
        })
    }
}
