//! Data types and associated functions and methods

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CrosstabError;

/// One discrete value of a dimension
///
/// Identifies a single category with a machine-readable code and a
/// human-readable label. The label is what appears in CSV output.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Machine-readable category code
    pub code: String,
    /// Human-readable category label
    pub label: String,
}

impl Category {
    /// Return a new Category object.
    pub fn new(code: &str, label: &str) -> Self {
        Category {
            code: code.to_string(),
            label: label.to_string(),
        }
    }
}

/// Identifying names of a dimension
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Variable {
    /// Machine-readable variable name
    pub name: String,
    /// Human-readable variable label, used as the CSV column title
    pub label: String,
}

/// One categorical axis of a tabulated dataset
///
/// The ordered category list defines both the axis length and the order in
/// which coordinates are visited. `count` is reported by some query variants
/// and omitted by others; the category list is the canonical source of truth
/// and a populated `count` that disagrees with it fails validation.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize, Validate)]
#[validate(schema(function = "validate_dimension"))]
pub struct Dimension {
    /// Identifying names of this axis
    pub variable: Variable,
    /// Category count as reported by the source, if populated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Ordered categories of this axis
    pub categories: Vec<Category>,
}

impl Dimension {
    /// Returns the number of categories on this axis.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Returns true if this axis has no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Validate a dimension
fn validate_dimension(dimension: &Dimension) -> Result<(), ValidationError> {
    if let Some(count) = dimension.count {
        if count != dimension.categories.len() {
            let mut error =
                ValidationError::new("dimension count must equal the number of categories");
            error.add_param("count".into(), &count);
            error.add_param("categories".into(), &dimension.categories.len());
            return Err(error);
        }
    }
    Ok(())
}

/// A cross-tabulated dataset
///
/// Observation counts are stored as a single flat sequence in row-major
/// order: the last dimension varies fastest, the first slowest.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize, Validate)]
#[validate(schema(function = "validate_table"))]
pub struct Table {
    /// Ordered axes of the table
    #[validate]
    #[validate(length(min = 1, message = "dimensions must not be empty"))]
    pub dimensions: Vec<Dimension>,
    /// Flattened observation counts, one per coordinate
    #[serde(default)]
    pub values: Vec<i64>,
    /// Error reported by the tabulation engine in place of data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Validate that a table's values match the size of its coordinate space
fn validate_table(table: &Table) -> Result<(), ValidationError> {
    let expected = table.dimensions.iter().map(Dimension::len).product::<usize>();
    if table.values.len() != expected {
        let mut error = ValidationError::new(
            "values length must equal the product of dimension category counts",
        );
        error.add_param("values".into(), &table.values.len());
        error.add_param("expected".into(), &expected);
        return Err(error);
    }
    Ok(())
}

/// A single error from the GraphQL errors array
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct GraphQLError {
    /// Main error message
    pub message: String,
}

/// Dataset wrapper within a query response
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Dataset {
    /// The tabulated result, absent if the query failed
    pub table: Option<Table>,
}

/// Data payload of a query response
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Data {
    /// The queried dataset, absent if the query failed
    pub dataset: Option<Dataset>,
}

/// Top-level query response envelope
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Response {
    /// Data payload, null when the query failed outright
    #[serde(default)]
    pub data: Option<Data>,
    /// GraphQL-level errors returned in place of, or alongside, data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl Response {
    /// Extract the validated table from a decoded query response.
    ///
    /// Fails if the response carries GraphQL errors, contains no table, or
    /// the table fails validation.
    pub fn into_table(self) -> Result<Table, CrosstabError> {
        if !self.errors.is_empty() {
            let message = self
                .errors
                .iter()
                .map(|error| error.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CrosstabError::ResponseError { message });
        }
        let table = self
            .data
            .and_then(|data| data.dataset)
            .and_then(|dataset| dataset.table)
            .ok_or(CrosstabError::MissingTable)?;
        table.validate()?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use serde_test::{assert_de_tokens, assert_de_tokens_error, Token};

    // The following tests use serde_test to validate the correct function of the deserialiser.
    // The validations are also tested.

    #[test]
    fn test_category() {
        let category = Category::new("0", "London");
        assert_de_tokens(
            &category,
            &[
                Token::Struct {
                    name: "Category",
                    len: 2,
                },
                Token::Str("code"),
                Token::Str("0"),
                Token::Str("label"),
                Token::Str("London"),
                Token::StructEnd,
            ],
        );
    }

    #[test]
    fn test_missing_code() {
        assert_de_tokens_error::<Category>(
            &[
                Token::Struct {
                    name: "Category",
                    len: 2,
                },
                Token::Str("label"),
                Token::Str("London"),
                Token::StructEnd,
            ],
            "missing field `code`",
        )
    }

    #[test]
    fn test_valid_table() {
        let table = test_utils::get_test_table();
        table.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "dimensions must not be empty")]
    fn test_empty_dimensions() {
        let mut table = test_utils::get_test_table();
        table.dimensions = vec![];
        table.values = vec![];
        table.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "values length must equal the product of dimension category counts")]
    fn test_values_shape_mismatch() {
        let mut table = test_utils::get_test_table();
        table.values.pop();
        table.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "dimension count must equal the number of categories")]
    fn test_dimension_count_mismatch() {
        let mut table = test_utils::get_test_table();
        table.dimensions[0].count = Some(99);
        table.validate().unwrap()
    }

    #[test]
    fn test_dimension_count_absent() {
        let mut table = test_utils::get_test_table();
        table.dimensions[0].count = None;
        table.validate().unwrap()
    }

    #[test]
    fn test_zero_category_dimension() {
        // A zero-length axis is well formed provided the values are empty.
        let table = Table {
            dimensions: vec![test_utils::get_test_dimension("empty", "Empty", &[])],
            values: vec![],
            error: None,
        };
        table.validate().unwrap()
    }

    // The following tests use JSON data, to check that the fields map as expected.

    #[test]
    fn test_json_table() {
        let json = r#"{
            "dimensions": [
                {
                    "variable": {"name": "city", "label": "City"},
                    "count": 2,
                    "categories": [
                        {"code": "0", "label": "London"},
                        {"code": "1", "label": "Belfast"}
                    ]
                }
            ],
            "values": [3, 4]
        }"#;
        let table = serde_json::from_str::<Table>(json).unwrap();
        assert_eq!(Some(2), table.dimensions[0].count);
        assert_eq!("City", table.dimensions[0].variable.label);
        assert_eq!(vec![3, 4], table.values);
        assert_eq!(None, table.error);
        table.validate().unwrap()
    }

    #[test]
    fn test_json_table_error() {
        let json = r#"{"dimensions": [], "error": "withinMaxCells"}"#;
        let table = serde_json::from_str::<Table>(json).unwrap();
        assert_eq!(Some("withinMaxCells".to_string()), table.error);
    }

    #[test]
    fn test_into_table() {
        let response = Response {
            data: Some(Data {
                dataset: Some(Dataset {
                    table: Some(test_utils::get_test_table()),
                }),
            }),
            errors: vec![],
        };
        let table = response.into_table().unwrap();
        assert_eq!(21, table.values.len());
    }

    #[test]
    fn test_into_table_graphql_errors() {
        let response = Response {
            data: None,
            errors: vec![
                GraphQLError {
                    message: "dataset not loaded".to_string(),
                },
                GraphQLError {
                    message: "variable not found".to_string(),
                },
            ],
        };
        match response.into_table().unwrap_err() {
            CrosstabError::ResponseError { message } => {
                assert_eq!("dataset not loaded; variable not found", message)
            }
            error => panic!("unexpected error {error}"),
        }
    }

    #[test]
    fn test_into_table_missing() {
        let response = Response {
            data: Some(Data { dataset: None }),
            errors: vec![],
        };
        match response.into_table().unwrap_err() {
            CrosstabError::MissingTable => (),
            error => panic!("unexpected error {error}"),
        }
    }

    #[test]
    fn test_into_table_invalid() {
        let mut table = test_utils::get_test_table();
        table.values.push(0);
        let response = Response {
            data: Some(Data {
                dataset: Some(Dataset { table: Some(table) }),
            }),
            errors: vec![],
        };
        match response.into_table().unwrap_err() {
            CrosstabError::TableValidation(_) => (),
            error => panic!("unexpected error {error}"),
        }
    }

    #[test]
    fn test_json_response() {
        let json = r#"{
            "data": {"dataset": {"table": {"dimensions": [], "values": [], "error": null}}},
            "errors": [{"message": "boom", "locations": [{"line": 1, "column": 2}]}]
        }"#;
        let response = serde_json::from_str::<Response>(json).unwrap();
        assert_eq!(1, response.errors.len());
        assert_eq!("boom", response.errors[0].message);
    }
}
