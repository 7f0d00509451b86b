use crate::models::{Category, Dimension, Table, Variable};

/// Create a dimension with the given labels, codes assigned by position.
pub(crate) fn get_test_dimension(name: &str, label: &str, labels: &[&str]) -> Dimension {
    Dimension {
        variable: Variable {
            name: name.to_string(),
            label: label.to_string(),
        },
        count: Some(labels.len()),
        categories: labels
            .iter()
            .enumerate()
            .map(|(code, label)| Category::new(&code.to_string(), label))
            .collect(),
    }
}

/// Create the city-by-siblings table exercised throughout the tests: 3 cities
/// by 7 sibling counts, with values 0..21 so each cell holds its own flat
/// index.
pub(crate) fn get_test_table() -> Table {
    Table {
        dimensions: vec![
            get_test_dimension("city", "City", &["London", "Liverpool", "Belfast"]),
            get_test_dimension(
                "siblings",
                "Number of siblings",
                &["0", "1", "2", "3", "4", "5", "6"],
            ),
        ],
        values: (0..21).collect(),
        error: None,
    }
}
