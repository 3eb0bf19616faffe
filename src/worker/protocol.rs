//! Worker Data-Plane Protocol
//!
//! Endpoints, query parameters and URL helpers shared by the worker's HTTP handlers
//! and by peers calling them (replication pushes, join-time recovery).

use serde::Deserialize;

// --- API Endpoints ---

/// Cell, row and table access: `/data/{table}[/{row}[/{column}]]`.
pub const ENDPOINT_DATA: &str = "/data";
/// JSON list of table names, used by joining workers.
pub const ENDPOINT_LIST: &str = "/list";
/// JSON list of `{key, hash}` for a table, used to find missing rows.
pub const ENDPOINT_METAS: &str = "/metas";

/// Response header carrying the version of a versioned-table row.
pub const VERSION_HEADER: &str = "version";

pub const BODY_OK: &str = "OK";
pub const BODY_FAIL: &str = "FAIL";

// --- Query Parameters ---

/// Query of `PUT /data/{table}/{row}/{column}`.
#[derive(Debug, Default, Deserialize)]
pub struct PutParams {
    /// Conditional write: column to compare before writing.
    pub ifcolumn: Option<String>,
    /// Conditional write: expected value of `ifcolumn`.
    pub equals: Option<String>,
    /// Present on writes forwarded by a peer; such writes are not forwarded again.
    pub end: Option<String>,
}

/// Query of `GET /data/{table}/{row}/{column}`.
#[derive(Debug, Default, Deserialize)]
pub struct GetParams {
    pub version: Option<String>,
}

/// Query of `GET /data/{table}`: inclusive start, exclusive end.
#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    #[serde(rename = "startRow")]
    pub start_row: Option<String>,
    #[serde(rename = "endRowExclusive")]
    pub end_row_exclusive: Option<String>,
}

// --- URL helpers ---

pub fn replicate_url(addr: &str, table: &str, row: &str, column: &str) -> String {
    format!(
        "http://{}{}/{}/{}/{}?end=1",
        addr,
        ENDPOINT_DATA,
        urlencoding::encode(table),
        urlencoding::encode(row),
        urlencoding::encode(column)
    )
}

pub fn table_url(addr: &str, table: &str) -> String {
    format!("http://{}{}/{}", addr, ENDPOINT_DATA, urlencoding::encode(table))
}

pub fn metas_url(addr: &str, table: &str) -> String {
    format!("http://{}{}/{}", addr, ENDPOINT_METAS, urlencoding::encode(table))
}

pub fn list_url(addr: &str) -> String {
    format!("http://{}{}", addr, ENDPOINT_LIST)
}
