//! Command Line Interface (CLI) arguments.

use clap::{Parser, ValueEnum};

/// Layout of the input JSON document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// A GraphQL query response envelope
    #[default]
    Response,
    /// A bare table document
    Table,
}

/// Crosstab command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// Path of the JSON document to convert, or `-` for stdin
    #[arg(long, default_value = "-", env = "CROSSTAB_INPUT")]
    pub input: String,
    /// Path to write CSV output to, or `-` for stdout
    #[arg(long, default_value = "-", env = "CROSSTAB_OUTPUT")]
    pub output: String,
    /// Layout of the input document
    #[arg(long, value_enum, default_value_t = Format::Response, env = "CROSSTAB_FORMAT")]
    pub format: Format,
    /// Fully decode the response in memory before rendering, rather than
    /// streaming it straight to CSV. Bare tables are always decoded fully.
    #[arg(long, default_value_t = false, env = "CROSSTAB_BUFFERED")]
    pub buffered: bool,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
