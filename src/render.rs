//! CSV rendering of cross-tabulated tables.
//!
//! Output is RFC-4180-style: one header record of dimension labels followed
//! by the literal `count` column, then one record per observation in
//! row-major order. Quoting of labels containing commas, quotes or newlines
//! is handled by the [csv] writer.

use std::io::{Cursor, Write};

use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::error::CrosstabError;
use crate::iterator::TableIterator;
use crate::models::{Dimension, Table};

/// Title of the trailing observation count column.
pub const COUNT_COLUMN: &str = "count";

/// Write `table` as CSV to `sink`.
///
/// The table is validated before any output is produced; a shape mismatch
/// or a populated `error` field fails the whole operation. Returns the
/// number of CSV records written, header included.
///
/// # Arguments
///
/// * `table`: The table to render
/// * `sink`: Destination for CSV output
pub fn write_table<W: Write>(table: &Table, sink: W) -> Result<u64, CrosstabError> {
    write_records(table, sink, None)
}

/// Write `table` as CSV to `sink`, polling `cancel` before each record.
///
/// An observed cancellation aborts the render with a
/// [Canceled](CrosstabError::Canceled) error reporting how many records were
/// already written. A failed render is wholly invalid and its partial output
/// must be discarded by the caller.
///
/// # Arguments
///
/// * `table`: The table to render
/// * `sink`: Destination for CSV output
/// * `cancel`: Cancellation signal polled once per record
pub fn write_table_cancellable<W: Write>(
    table: &Table,
    sink: W,
    cancel: &CancellationToken,
) -> Result<u64, CrosstabError> {
    write_records(table, sink, Some(cancel))
}

/// Render `table` as CSV into memory, returning a reader over the bytes.
///
/// # Arguments
///
/// * `table`: The table to render
pub fn render_table(table: &Table) -> Result<Cursor<Vec<u8>>, CrosstabError> {
    let mut buffer = Vec::new();
    write_table(table, &mut buffer)?;
    Ok(Cursor::new(buffer))
}

/// Write the header record: dimension labels then the count column.
pub(crate) fn write_header<W: Write>(
    dimensions: &[Dimension],
    writer: &mut csv::Writer<W>,
) -> Result<(), CrosstabError> {
    let mut header: Vec<&str> = dimensions
        .iter()
        .map(|dimension| dimension.variable.label.as_str())
        .collect();
    header.push(COUNT_COLUMN);
    writer.write_record(&header).map_err(CrosstabError::HeaderWrite)
}

/// Write one data record: the current coordinate's labels then the count.
pub(crate) fn write_row<W: Write>(
    iterator: &TableIterator,
    value: i64,
    row: usize,
    writer: &mut csv::Writer<W>,
) -> Result<(), CrosstabError> {
    let count = value.to_string();
    let mut record: Vec<&str> = Vec::with_capacity(iterator.columns() + 1);
    for column in 0..iterator.columns() {
        record.push(&iterator.category_at_column(column)?.label);
    }
    record.push(&count);
    writer
        .write_record(&record)
        .map_err(|source| CrosstabError::RowWrite { row, source })
}

fn write_records<W: Write>(
    table: &Table,
    sink: W,
    cancel: Option<&CancellationToken>,
) -> Result<u64, CrosstabError> {
    table.validate()?;
    if let Some(message) = &table.error {
        return Err(CrosstabError::TableError {
            message: message.clone(),
        });
    }
    if let Some(cancel) = cancel {
        if cancel.is_cancelled() {
            return Err(CrosstabError::Canceled { rows: 0 });
        }
    }
    let mut writer = csv::Writer::from_writer(sink);
    let mut records = 0_u64;
    write_header(&table.dimensions, &mut writer)?;
    records += 1;
    let mut iterator = TableIterator::new(&table.dimensions)?;
    for (row, value) in table.values.iter().enumerate() {
        if let Some(cancel) = cancel {
            if cancel.is_cancelled() {
                return Err(CrosstabError::Canceled { rows: records });
            }
        }
        write_row(&iterator, *value, row, &mut writer)?;
        records += 1;
        iterator.advance()?;
    }
    writer.flush().map_err(CrosstabError::Flush)?;
    Ok(records)
}
