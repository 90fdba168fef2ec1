//! Error types for the scrape-and-normalize path.
//!
//! The fetch and parse stages fail with their own enums so callers can tell a
//! network problem from a page whose layout no longer matches. Everything above
//! them propagates through `anyhow`.

use thiserror::Error;

/// Failure while retrieving a page.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure reported by the HTTP client.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body could not be read as text.
    #[error("reading body of {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failure while turning page markup or text records into typed values.
#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    /// Fewer `<table>` elements on the page than the configured index needs.
    #[error("table #{index} not found (page has {found} tables)")]
    TableNotFound { index: usize, found: usize },

    /// The flattened cell list does not split into whole rows.
    #[error("{len} cells is not a multiple of the row stride {stride}")]
    RaggedCells { len: usize, stride: usize },

    /// Columns handed back for interleaving hold different numbers of rows.
    #[error("column has {found} rows, expected {expected}")]
    UnevenColumns { expected: usize, found: usize },

    /// A retained row carried a value that could not be coerced.
    #[error("row {row}: cannot parse {field} from {value:?}")]
    Coerce {
        row: usize,
        field: &'static str,
        value: String,
    },

    /// The cell following a spot index label is not a number.
    #[error("spot metric {name}: cannot parse value from {value:?}")]
    BadMetric { name: String, value: String },

    /// A spot index label was not present in the scraped table.
    #[error("spot metric {0} not found")]
    MissingMetric(String),

    /// A spot-history record was malformed.
    #[error("history line {line}: {reason}")]
    History { line: usize, reason: String },
}
