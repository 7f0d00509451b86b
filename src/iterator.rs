//! Row-major iteration over the coordinates of a dimensional table.

use tokio_util::sync::CancellationToken;

use crate::error::CrosstabError;
use crate::models::{Category, Dimension};

/// Walks every coordinate of an N-dimensional table exactly once, in
/// row-major order, without materialising the cross-product.
///
/// The iterator borrows its dimensions and mutates a per-dimension index
/// vector in place. Advancing is fallible so that misuse and cancellation
/// surface as errors rather than panics, which keeps the type embeddable in
/// request paths; it is therefore not a std [Iterator].
///
/// The iterator assumes exclusive ownership by a single logical caller and
/// performs no synchronisation.
#[derive(Debug)]
pub struct TableIterator<'a> {
    /// The axes being walked
    dimensions: &'a [Dimension],
    /// Current coordinate, one index per dimension
    indices: Vec<usize>,
    /// Number of successful advances so far
    rows_visited: u64,
    /// Optional cancellation signal, polled at the start of each advance
    cancel: Option<CancellationToken>,
}

impl<'a> TableIterator<'a> {
    /// Return a new TableIterator positioned at the first coordinate.
    ///
    /// Fails if `dimensions` is empty, since the coordinate space would be
    /// undefined. A dimension with zero categories is permitted and yields
    /// an immediately-ended iterator.
    ///
    /// # Arguments
    ///
    /// * `dimensions`: The ordered axes to walk
    pub fn new(dimensions: &'a [Dimension]) -> Result<Self, CrosstabError> {
        if dimensions.is_empty() {
            return Err(CrosstabError::EmptyDimensions);
        }
        let mut indices = vec![0; dimensions.len()];
        // A zero-category axis means the table has no cells at all.
        if dimensions.iter().any(Dimension::is_empty) {
            indices[0] = dimensions[0].len();
        }
        Ok(TableIterator {
            dimensions,
            indices,
            rows_visited: 0,
            cancel: None,
        })
    }

    /// Return a new TableIterator that polls `cancel` before each advance.
    ///
    /// # Arguments
    ///
    /// * `dimensions`: The ordered axes to walk
    /// * `cancel`: Cancellation signal checked at the start of each advance
    pub fn with_cancellation(
        dimensions: &'a [Dimension],
        cancel: CancellationToken,
    ) -> Result<Self, CrosstabError> {
        let mut iterator = Self::new(dimensions)?;
        iterator.cancel = Some(cancel);
        Ok(iterator)
    }

    /// Returns true once every coordinate has been consumed.
    ///
    /// The sole terminal condition is the first dimension's index reaching
    /// its category count.
    pub fn end(&self) -> bool {
        self.indices[0] >= self.dimensions[0].len()
    }

    /// Advance to the next coordinate in row-major order.
    ///
    /// Increments the last dimension's index; on overflow the index resets
    /// to zero and the increment carries into the next-more-significant
    /// dimension. The first dimension is allowed to reach its category
    /// count, which signals [end](Self::end).
    ///
    /// Fails if a supplied cancellation token is cancelled (checked before
    /// any index work) or if called once [end](Self::end) is true.
    pub fn advance(&mut self) -> Result<(), CrosstabError> {
        if let Some(cancel) = &self.cancel {
            if cancel.is_cancelled() {
                return Err(CrosstabError::Canceled {
                    rows: self.rows_visited,
                });
            }
        }
        if self.end() {
            return Err(CrosstabError::AfterEnd);
        }
        for column in (0..self.indices.len()).rev() {
            self.indices[column] += 1;
            if column == 0 || self.indices[column] < self.dimensions[column].len() {
                break;
            }
            self.indices[column] = 0;
        }
        self.rows_visited += 1;
        Ok(())
    }

    /// Return the category of dimension `column` at the current coordinate.
    ///
    /// Fails if `column` does not name a dimension or if the iterator has
    /// ended. Repeated calls between advances return the same category.
    ///
    /// # Arguments
    ///
    /// * `column`: Zero-based dimension index
    pub fn category_at_column(&self, column: usize) -> Result<&'a Category, CrosstabError> {
        if self.end() {
            return Err(CrosstabError::AfterEnd);
        }
        let dimension = self
            .dimensions
            .get(column)
            .ok_or(CrosstabError::ColumnOutOfRange { column })?;
        dimension
            .categories
            .get(self.indices[column])
            .ok_or(CrosstabError::ColumnOutOfRange { column })
    }

    /// Returns the number of dimensions being walked.
    pub fn columns(&self) -> usize {
        self.dimensions.len()
    }

    /// Returns the number of coordinates visited so far.
    pub fn rows_visited(&self) -> u64 {
        self.rows_visited
    }
}
