//! Dialect and option value types.
//!
//! A [`Dialect`] describes how one CSV flavor is tokenized and emitted;
//! [`ParseOptions`] and [`WriteOptions`] wrap it with the knobs specific to
//! each direction. All of these are plain values copied into the parser or
//! writer, and all of them deserialize from config files with every field
//! optional.

use serde::{Deserialize, Serialize};

/// How a quote character inside a quoted field is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Escape {
    /// `""` collapses to a single quote (RFC 4180).
    DoubledQuote,
    /// `\"` plus the C-style set `\n \r \t \\`.
    Backslash,
    /// No escape mechanism; quoted fields cannot contain the quote byte.
    None,
}

/// Policy for duplicate names in the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderDupMode {
    /// Reject the document.
    Error,
    /// Keep the first occurrence, ignore later ones.
    FirstWins,
    /// Later occurrences replace earlier ones.
    LastWins,
    /// Keep every occurrence; lookups iterate in column order.
    Collect,
}

/// Newline sequence emitted between records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Newline {
    Lf,
    CrLf,
    Cr,
}

impl Newline {
    #[inline]
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Newline::Lf => b"\n",
            Newline::CrLf => b"\r\n",
            Newline::Cr => b"\r",
        }
    }
}

/// Value-type description of one CSV flavor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
    pub escape: Escape,

    /// Accept `\n` as a record terminator.
    pub accept_lf: bool,
    /// Accept `\r\n` as a record terminator.
    pub accept_crlf: bool,
    /// Accept a lone `\r` as a record terminator.
    pub accept_cr: bool,
    /// Allow newline sequences inside quoted fields.
    pub newline_in_quotes: bool,

    /// Strip blanks around unquoted field content.
    pub trim_unquoted_fields: bool,
    /// Skip a space immediately following a delimiter.
    pub allow_space_after_delimiter: bool,
    /// Treat a quote inside an unquoted field as literal content.
    pub allow_unquoted_quotes: bool,
    /// Treat an unaccepted newline byte in an unquoted field as content.
    pub allow_unquoted_newlines: bool,
    /// Skip lines starting with `comment_prefix`.
    pub allow_comments: bool,
    pub comment_prefix: Vec<u8>,

    pub treat_first_row_as_header: bool,
    pub header_dup_mode: HeaderDupMode,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: Escape::DoubledQuote,
            accept_lf: true,
            accept_crlf: true,
            accept_cr: false,
            newline_in_quotes: true,
            trim_unquoted_fields: false,
            allow_space_after_delimiter: false,
            allow_unquoted_quotes: false,
            allow_unquoted_newlines: false,
            allow_comments: false,
            comment_prefix: b"#".to_vec(),
            treat_first_row_as_header: false,
            header_dup_mode: HeaderDupMode::Error,
        }
    }
}

/// Input bounds enforced while parsing. A zero means "use the default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_rows: usize,
    pub max_cols: usize,
    pub max_field_bytes: usize,
    pub max_record_bytes: usize,
    pub max_total_bytes: usize,
}

impl Limits {
    pub const DEFAULT_MAX_ROWS: usize = 10_000_000;
    pub const DEFAULT_MAX_COLS: usize = 100_000;
    pub const DEFAULT_MAX_FIELD_BYTES: usize = 16 * 1024 * 1024;
    pub const DEFAULT_MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;
    pub const DEFAULT_MAX_TOTAL_BYTES: usize = 1024 * 1024 * 1024;

    /// Replace zeroed bounds with their defaults.
    pub fn resolved(&self) -> Limits {
        fn pick(value: usize, default: usize) -> usize {
            if value == 0 {
                default
            } else {
                value
            }
        }
        Limits {
            max_rows: pick(self.max_rows, Self::DEFAULT_MAX_ROWS),
            max_cols: pick(self.max_cols, Self::DEFAULT_MAX_COLS),
            max_field_bytes: pick(self.max_field_bytes, Self::DEFAULT_MAX_FIELD_BYTES),
            max_record_bytes: pick(self.max_record_bytes, Self::DEFAULT_MAX_RECORD_BYTES),
            max_total_bytes: pick(self.max_total_bytes, Self::DEFAULT_MAX_TOTAL_BYTES),
        }
    }
}

/// Options for parsing bytes into a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub dialect: Dialect,
    /// Reject input that is not valid UTF-8.
    pub validate_utf8: bool,
    /// Let untransformed fields reference the caller's input buffer instead
    /// of copying into the arena. Only effective together with
    /// `validate_utf8 = false`.
    pub in_situ_mode: bool,
    /// Keep a leading UTF-8 byte-order mark as field content.
    pub keep_bom: bool,
    /// Accept records whose widths differ; the table tracks the maximum.
    pub allow_irregular_rows: bool,
    pub limits: Limits,
    /// Attach an input excerpt with a caret to parse errors.
    pub enable_context_snippet: bool,
    pub context_radius_bytes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            validate_utf8: true,
            in_situ_mode: true,
            keep_bom: false,
            allow_irregular_rows: false,
            limits: Limits::default(),
            enable_context_snippet: true,
            context_radius_bytes: 40,
        }
    }
}

/// Options for emitting a table to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    pub dialect: Dialect,
    pub newline: Newline,
    /// Quote every field unconditionally.
    pub quote_all_fields: bool,
    /// Quote fields with zero length.
    pub quote_empty_fields: bool,
    /// Quote fields containing the delimiter, the quote byte, or an
    /// accepted newline byte.
    pub quote_if_needed: bool,
    /// Escape quote bytes even in fields emitted without surrounding
    /// quotes.
    pub always_escape_quotes: bool,
    /// Emit the newline sequence after the final record.
    pub trailing_newline: bool,
    /// Stop each record after its last non-empty field.
    pub trim_trailing_empty_fields: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            newline: Newline::Lf,
            quote_all_fields: false,
            quote_empty_fields: false,
            quote_if_needed: true,
            always_escape_quotes: false,
            trailing_newline: true,
            trim_trailing_empty_fields: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_defaults() {
        let dialect = Dialect::default();
        assert_eq!(dialect.delimiter, b',');
        assert_eq!(dialect.quote, b'"');
        assert_eq!(dialect.escape, Escape::DoubledQuote);
        assert!(dialect.accept_lf && dialect.accept_crlf);
        assert!(!dialect.accept_cr);
        assert!(!dialect.treat_first_row_as_header);
    }

    #[test]
    fn test_limits_resolution() {
        let limits = Limits {
            max_rows: 5,
            ..Limits::default()
        }
        .resolved();
        assert_eq!(limits.max_rows, 5);
        assert_eq!(limits.max_cols, Limits::DEFAULT_MAX_COLS);
        assert_eq!(limits.max_total_bytes, Limits::DEFAULT_MAX_TOTAL_BYTES);
    }

    #[test]
    fn test_options_from_json_config() {
        let options: ParseOptions = serde_json::from_str(
            r#"{
                "dialect": { "delimiter": 59, "treat_first_row_as_header": true },
                "validate_utf8": false,
                "limits": { "max_rows": 100 }
            }"#,
        )
        .unwrap();
        assert_eq!(options.dialect.delimiter, b';');
        assert!(options.dialect.treat_first_row_as_header);
        assert!(!options.validate_utf8);
        assert_eq!(options.limits.max_rows, 100);
        // Unset fields keep their defaults.
        assert_eq!(options.dialect.quote, b'"');
        assert_eq!(options.context_radius_bytes, 40);
    }

    #[test]
    fn test_newline_bytes() {
        assert_eq!(Newline::Lf.as_bytes(), b"\n");
        assert_eq!(Newline::CrLf.as_bytes(), b"\r\n");
        assert_eq!(Newline::Cr.as_bytes(), b"\r");
    }
}
