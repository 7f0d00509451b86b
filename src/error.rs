//! Error handling.

use std::error::Error;

use thiserror::Error;

/// Crosstab error type
///
/// This type encapsulates the various errors that may occur while iterating a
/// table or rendering it as CSV. Variants are grouped by where they arise:
/// malformed input data, iterator misuse, cancellation, and sink failures.
#[derive(Debug, Error)]
pub enum CrosstabError {
    /// Iterator or category lookup used once every coordinate is consumed
    #[error("table iterator used after end of table")]
    AfterEnd,

    /// Cancellation observed before the current step
    #[error("canceled after {rows} rows of output")]
    Canceled { rows: u64 },

    /// Category lookup for a dimension that does not exist
    #[error("no dimension at column {column}")]
    ColumnOutOfRange { column: usize },

    /// Attempt to iterate a table with no dimensions
    #[error("cannot iterate a table with no dimensions")]
    EmptyDimensions,

    /// Error flushing buffered CSV output to the sink
    #[error("failed to flush CSV output")]
    Flush(#[source] std::io::Error),

    /// Error writing the CSV header record
    #[error("failed to write CSV header")]
    HeaderWrite(#[source] csv::Error),

    /// Error opening an input or output file
    #[error("failed to open input or output file")]
    Io(#[from] std::io::Error),

    /// The response contains no table
    #[error("response contains no table")]
    MissingTable,

    /// The table contains no values sequence
    #[error("table has no values")]
    MissingValues,

    /// GraphQL-level errors returned in place of data
    #[error("query returned errors: {message}")]
    ResponseError { message: String },

    /// Error decoding a JSON document
    #[error("response body is not valid JSON")]
    ResponseJson(#[from] serde_json::Error),

    /// Error writing a CSV data row
    #[error("failed to write CSV row {row}")]
    RowWrite {
        row: usize,
        #[source]
        source: csv::Error,
    },

    /// The values sequence does not match the size of the coordinate space
    #[error("table shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Error reported by the tabulation engine in the table body
    #[error("table contains an error: {message}")]
    TableError { message: String },

    /// Error validating a table or dimension
    #[error("table data is not valid")]
    TableValidation(#[from] validator::ValidationErrors),

    /// The values sequence arrived before the dimensions describing it
    #[error("table values arrived before dimensions")]
    ValuesBeforeDimensions,
}

/// Collect the messages of an error and its sources, outermost first.
///
/// Used when reporting a failure to the user, so that wrapped causes such as
/// sink I/O errors are not lost.
///
/// # Arguments
///
/// * `error`: The error that occurred
pub fn cause_chain(error: &dyn Error) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(source) = current {
        messages.push(source.to_string());
        current = source.source();
    }
    // Remove duplicate entries.
    messages.dedup();
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn after_end_message() {
        let error = CrosstabError::AfterEnd;
        assert_eq!("table iterator used after end of table", error.to_string());
    }

    #[test]
    fn canceled_message() {
        let error = CrosstabError::Canceled { rows: 42 };
        assert_eq!("canceled after 42 rows of output", error.to_string());
    }

    #[test]
    fn column_out_of_range_message() {
        let error = CrosstabError::ColumnOutOfRange { column: 3 };
        assert_eq!("no dimension at column 3", error.to_string());
    }

    #[test]
    fn shape_mismatch_message() {
        let error = CrosstabError::ShapeMismatch {
            expected: 21,
            actual: 20,
        };
        assert_eq!(
            "table shape mismatch: expected 21 values, got 20",
            error.to_string()
        );
    }

    #[test]
    fn table_error_message() {
        let error = CrosstabError::TableError {
            message: "withinMaxCells".to_string(),
        };
        assert_eq!("table contains an error: withinMaxCells", error.to_string());
    }

    #[test]
    fn cause_chain_without_source() {
        let error = CrosstabError::MissingTable;
        assert_eq!(vec!["response contains no table"], cause_chain(&error));
    }

    #[test]
    fn cause_chain_with_source() {
        let io_error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        let error = CrosstabError::RowWrite {
            row: 7,
            source: csv::Error::from(io_error),
        };
        // csv::Error displays I/O errors transparently, so the duplicate
        // entry is removed from the chain.
        let chain = cause_chain(&error);
        assert_eq!(vec!["failed to write CSV row 7", "broken pipe"], chain);
    }

    #[test]
    fn cause_chain_flush() {
        let io_error = std::io::Error::new(std::io::ErrorKind::WriteZero, "sink full");
        let error = CrosstabError::Flush(io_error);
        let chain = cause_chain(&error);
        assert_eq!(vec!["failed to flush CSV output", "sink full"], chain);
    }

    #[test]
    fn validation_error_conversion() {
        let mut validation_errors = validator::ValidationErrors::new();
        validation_errors.add("values", validator::ValidationError::new("foo"));
        let error = CrosstabError::from(validation_errors);
        assert_eq!("table data is not valid", error.to_string());
        assert!(error.source().is_some());
    }
}
