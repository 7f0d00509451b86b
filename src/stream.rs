//! Streaming transform of a GraphQL query response body into CSV.
//!
//! The batch path in [render](crate::render) needs the whole table in
//! memory. For large tables the values sequence dominates the response
//! body, so this module drives [serde_json] with [DeserializeSeed]
//! visitors instead: dimensions are decoded up front (they are small),
//! then each value is written out as a CSV record the moment it is parsed
//! and never collected into a `Vec`.

use std::fmt;
use std::io::{Read, Write};

use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::error::CrosstabError;
use crate::iterator::TableIterator;
use crate::models::{Dimension, GraphQLError};
use crate::render::{write_header, write_row};

/// Transform a JSON query response read from `body` into CSV on `sink`.
///
/// Returns the number of CSV records written, header included. Any failure
/// makes the output wholly invalid; the caller must discard it.
///
/// # Arguments
///
/// * `body`: JSON response body to decode incrementally
/// * `sink`: Destination for CSV output
pub fn response_to_csv<R: Read, W: Write>(body: R, sink: W) -> Result<u64, CrosstabError> {
    transform(body, sink, None)
}

/// Transform a JSON query response into CSV, polling `cancel` per record.
///
/// An observed cancellation aborts the transform after flushing whatever
/// was already written; the resulting
/// [Canceled](CrosstabError::Canceled) error reports exactly how many CSV
/// records were produced before the abort.
///
/// # Arguments
///
/// * `body`: JSON response body to decode incrementally
/// * `sink`: Destination for CSV output
/// * `cancel`: Cancellation signal polled before each record
pub fn response_to_csv_cancellable<R: Read, W: Write>(
    body: R,
    sink: W,
    cancel: &CancellationToken,
) -> Result<u64, CrosstabError> {
    transform(body, sink, Some(cancel))
}

fn transform<R: Read, W: Write>(
    body: R,
    sink: W,
    cancel: Option<&CancellationToken>,
) -> Result<u64, CrosstabError> {
    if let Some(cancel) = cancel {
        if cancel.is_cancelled() {
            return Err(CrosstabError::Canceled { rows: 0 });
        }
    }
    let mut emitter = Emitter {
        writer: csv::Writer::from_writer(sink),
        records: 0,
        cancel,
        failure: None,
        saw_table: false,
    };
    let mut deserializer = serde_json::Deserializer::from_reader(body);
    let result = ResponseSeed {
        emitter: &mut emitter,
    }
    .deserialize(&mut deserializer);
    let result = result.and_then(|()| deserializer.end());
    match result {
        Ok(()) => {
            if !emitter.saw_table {
                return Err(CrosstabError::MissingTable);
            }
            emitter.writer.flush().map_err(CrosstabError::Flush)?;
            Ok(emitter.records)
        }
        Err(error) => {
            // Flush whatever was already written so the partial output is
            // observable for diagnostics, then surface the typed failure.
            let _ = emitter.writer.flush();
            Err(emitter
                .failure
                .take()
                .unwrap_or(CrosstabError::ResponseJson(error)))
        }
    }
}

/// Output state threaded through the deserialize seeds.
struct Emitter<'c, W: Write> {
    /// CSV writer over the caller's sink
    writer: csv::Writer<W>,
    /// Number of CSV records written, header included
    records: u64,
    /// Optional cancellation signal, polled before each record
    cancel: Option<&'c CancellationToken>,
    /// Typed failure recorded before bailing out of serde with a generic error
    failure: Option<CrosstabError>,
    /// Whether a table object was seen anywhere in the response
    saw_table: bool,
}

impl<W: Write> Emitter<'_, W> {
    /// Record a typed failure and return a serde error carrying its message.
    ///
    /// Serde's error type erases our own, so the typed error is stashed here
    /// and recovered by [transform] once deserialisation bails out.
    fn fail<E: de::Error>(&mut self, error: CrosstabError) -> E {
        let message = error.to_string();
        self.failure = Some(error);
        E::custom(message)
    }
}

/// Seed for the top-level response envelope.
struct ResponseSeed<'e, 'c, W: Write> {
    emitter: &'e mut Emitter<'c, W>,
}

impl<'de, W: Write> DeserializeSeed<'de> for ResponseSeed<'_, '_, W> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de, W: Write> Visitor<'de> for ResponseSeed<'_, '_, W> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a GraphQL response object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "data" => map.next_value_seed(DataSeed {
                    emitter: &mut *self.emitter,
                })?,
                "errors" => {
                    let errors: Option<Vec<GraphQLError>> = map.next_value()?;
                    let errors = errors.unwrap_or_default();
                    if !errors.is_empty() {
                        let message = errors
                            .iter()
                            .map(|error| error.message.as_str())
                            .collect::<Vec<_>>()
                            .join("; ");
                        return Err(self.emitter.fail(CrosstabError::ResponseError { message }));
                    }
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(())
    }
}

/// Seed for the nullable `data` payload.
struct DataSeed<'e, 'c, W: Write> {
    emitter: &'e mut Emitter<'c, W>,
}

impl<'de, W: Write> DeserializeSeed<'de> for DataSeed<'_, '_, W> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de, W: Write> Visitor<'de> for DataSeed<'_, '_, W> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a data object or null")
    }

    fn visit_unit<E>(self) -> Result<(), E>
    where
        E: de::Error,
    {
        Ok(())
    }

    fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "dataset" => map.next_value_seed(DatasetSeed {
                    emitter: &mut *self.emitter,
                })?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(())
    }
}

/// Seed for the nullable `dataset` wrapper.
struct DatasetSeed<'e, 'c, W: Write> {
    emitter: &'e mut Emitter<'c, W>,
}

impl<'de, W: Write> DeserializeSeed<'de> for DatasetSeed<'_, '_, W> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de, W: Write> Visitor<'de> for DatasetSeed<'_, '_, W> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a dataset object or null")
    }

    fn visit_unit<E>(self) -> Result<(), E>
    where
        E: de::Error,
    {
        Ok(())
    }

    fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "table" => map.next_value_seed(TableSeed {
                    emitter: &mut *self.emitter,
                })?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(())
    }
}

/// Seed for the nullable table object.
///
/// Dimensions must precede values in the document: the header and the
/// coordinate walk both depend on them, and streaming forbids buffering the
/// values to wait for dimensions arriving later.
struct TableSeed<'e, 'c, W: Write> {
    emitter: &'e mut Emitter<'c, W>,
}

impl<'de, W: Write> DeserializeSeed<'de> for TableSeed<'_, '_, W> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de, W: Write> Visitor<'de> for TableSeed<'_, '_, W> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a table object or null")
    }

    fn visit_unit<E>(self) -> Result<(), E>
    where
        E: de::Error,
    {
        Ok(())
    }

    fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        self.emitter.saw_table = true;
        let mut dimensions: Option<Vec<Dimension>> = None;
        let mut table_error: Option<String> = None;
        let mut streamed = false;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "dimensions" => {
                    dimensions = Some(map.next_value()?);
                }
                "values" => {
                    if let Some(message) = table_error.take() {
                        return Err(self.emitter.fail(CrosstabError::TableError { message }));
                    }
                    let dimensions = match dimensions.take() {
                        Some(dimensions) => dimensions,
                        None => {
                            return Err(self
                                .emitter
                                .fail(CrosstabError::ValuesBeforeDimensions));
                        }
                    };
                    map.next_value_seed(ValuesSeed {
                        dimensions,
                        emitter: &mut *self.emitter,
                    })?;
                    streamed = true;
                }
                "error" => {
                    table_error = map.next_value()?;
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        if let Some(message) = table_error {
            return Err(self.emitter.fail(CrosstabError::TableError { message }));
        }
        if !streamed {
            return Err(self.emitter.fail(CrosstabError::MissingValues));
        }
        Ok(())
    }
}

/// Seed for the values sequence; writes one CSV record per element.
struct ValuesSeed<'e, 'c, W: Write> {
    dimensions: Vec<Dimension>,
    emitter: &'e mut Emitter<'c, W>,
}

impl<'de, W: Write> DeserializeSeed<'de> for ValuesSeed<'_, '_, W> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, W: Write> Visitor<'de> for ValuesSeed<'_, '_, W> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence of observation counts")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        let ValuesSeed {
            dimensions,
            emitter,
        } = self;
        if dimensions.is_empty() {
            return Err(emitter.fail(CrosstabError::EmptyDimensions));
        }
        for dimension in &dimensions {
            if let Err(error) = dimension.validate() {
                return Err(emitter.fail(CrosstabError::TableValidation(error)));
            }
        }
        let expected = dimensions.iter().map(Dimension::len).product::<usize>();
        if let Err(error) = write_header(&dimensions, &mut emitter.writer) {
            return Err(emitter.fail(error));
        }
        emitter.records += 1;
        let mut iterator = match TableIterator::new(&dimensions) {
            Ok(iterator) => iterator,
            Err(error) => return Err(emitter.fail(error)),
        };
        let mut row = 0_usize;
        while let Some(value) = seq.next_element::<i64>()? {
            if let Some(cancel) = emitter.cancel {
                if cancel.is_cancelled() {
                    let rows = emitter.records;
                    return Err(emitter.fail(CrosstabError::Canceled { rows }));
                }
            }
            if row == expected {
                return Err(emitter.fail(CrosstabError::ShapeMismatch {
                    expected,
                    actual: row + 1,
                }));
            }
            if let Err(error) = write_row(&iterator, value, row, &mut emitter.writer) {
                return Err(emitter.fail(error));
            }
            emitter.records += 1;
            if let Err(error) = iterator.advance() {
                return Err(emitter.fail(error));
            }
            row += 1;
        }
        if row != expected {
            return Err(emitter.fail(CrosstabError::ShapeMismatch {
                expected,
                actual: row,
            }));
        }
        Ok(())
    }
}
