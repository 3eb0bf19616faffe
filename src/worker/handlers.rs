use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Extension, Path, Query},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{StreamExt, future, stream};
use std::sync::Arc;

use super::context::WorkerContext;
use super::protocol::{BODY_FAIL, BODY_OK, GetParams, PutParams, RangeParams, VERSION_HEADER};
use super::replication;
use crate::storage::catalog::SharedTable;
use crate::storage::error::CatalogError;
use crate::storage::row::Row;
use crate::storage::table::TableKind;

fn catalog_error_response(err: CatalogError) -> Response {
    let status = match &err {
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::InvalidName(_) | CatalogError::KindMismatch { .. } => {
            StatusCode::BAD_REQUEST
        }
        CatalogError::AlreadyExists(_) => StatusCode::CONFLICT,
        CatalogError::Storage(_) => {
            tracing::error!("Storage failure: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string()).into_response()
}

fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("{} not found", what)).into_response()
}

fn version_headers(version: Option<u64>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(v) = version {
        headers.insert(HeaderName::from_static(VERSION_HEADER), HeaderValue::from(v));
    }
    headers
}

/// `PUT /data/{table}/{row}/{column}`: stores the body as the cell value.
///
/// With `ifcolumn` and `equals` the write only happens when the current value
/// of `ifcolumn` matches; otherwise the body is `FAIL`. Writes without the
/// `end` marker are forwarded to the ring successors after the local commit.
pub async fn handle_put_cell(
    Extension(ctx): Extension<Arc<WorkerContext>>,
    Path((table, row, column)): Path<(String, String, String)>,
    Query(params): Query<PutParams>,
    body: Bytes,
) -> Response {
    if let (Some(if_column), Some(expected)) = (&params.ifcolumn, &params.equals)
        && !column_equals(&ctx, &table, &row, if_column, expected.as_bytes()).await
    {
        tracing::debug!(
            "Conditional put on {}/{} rejected: {} != {:?}",
            table,
            row,
            if_column,
            expected
        );
        return (StatusCode::OK, BODY_FAIL).into_response();
    }

    let version = match ctx.catalog.put_column(&table, &row, &column, &body).await {
        Ok(version) => version,
        Err(e) => return catalog_error_response(e),
    };

    if params.end.is_none() {
        replication::replicate_write(&ctx, &table, &row, &column, body);
    }

    (StatusCode::OK, version_headers(version), BODY_OK).into_response()
}

async fn column_equals(
    ctx: &WorkerContext,
    table: &str,
    row: &str,
    column: &str,
    expected: &[u8],
) -> bool {
    let Some(table) = ctx.catalog.get(table) else {
        return false;
    };
    let guard = table.read().await;
    guard
        .get(row, None)
        .is_some_and(|r| r.get(column) == Some(expected))
}

/// `GET /data/{table}/{row}/{column}`: the raw cell value.
///
/// On versioned tables `?version=N` selects a historical version and the
/// response carries the version it was read from.
pub async fn handle_get_cell(
    Extension(ctx): Extension<Arc<WorkerContext>>,
    Path((table, row, column)): Path<(String, String, String)>,
    Query(params): Query<GetParams>,
) -> Response {
    let version = match params.version.as_deref().map(str::parse::<u64>) {
        None => None,
        Some(Ok(v)) => Some(v),
        Some(Err(_)) => {
            return (StatusCode::BAD_REQUEST, "Invalid version number").into_response();
        }
    };

    let Some(shared) = ctx.catalog.get(&table) else {
        return not_found("Table");
    };
    let guard = shared.read().await;

    let Some(found) = guard.get(&row, version) else {
        return not_found("Row");
    };
    let Some(value) = found.get(&column) else {
        return not_found("Column");
    };

    let served_version = match guard.kind() {
        TableKind::Memory => version.or_else(|| guard.newest_version(&row)),
        TableKind::Persistent => None,
    };

    (StatusCode::OK, version_headers(served_version), value.to_vec()).into_response()
}

/// `GET /data/{table}/{row}`: the whole row in its binary encoding.
pub async fn handle_get_row(
    Extension(ctx): Extension<Arc<WorkerContext>>,
    Path((table, row)): Path<(String, String)>,
) -> Response {
    let Some(shared) = ctx.catalog.get(&table) else {
        return not_found("Table");
    };
    let guard = shared.read().await;
    match guard.get(&row, None) {
        Some(found) => (StatusCode::OK, found.to_bytes()).into_response(),
        None => not_found("Row"),
    }
}

/// `GET /data/{table}`: streams rows in key order, each followed by a line
/// feed, then one final line feed.
///
/// Rows are read one at a time while the body is written, so the table is
/// never held in memory as a whole. The first readable row decides between
/// 200 and 404.
pub async fn handle_get_table(
    Extension(ctx): Extension<Arc<WorkerContext>>,
    Path(table): Path<String>,
    Query(range): Query<RangeParams>,
) -> Response {
    let Some(shared) = ctx.catalog.get(&table) else {
        return not_found("Table");
    };
    let mut keys = shared
        .read()
        .await
        .keys_in_range(range.start_row.as_deref(), range.end_row_exclusive.as_deref())
        .into_iter();

    let mut first = None;
    for key in keys.by_ref() {
        // A key listed a moment ago may have no readable row anymore.
        if let Some(row) = read_row(&shared, &key).await {
            first = Some(row);
            break;
        }
    }
    let Some(first) = first else {
        return not_found("Rows");
    };

    tracing::debug!("Streaming rows of {}", table);
    let rest = stream::iter(keys).filter_map(move |key| {
        let shared = shared.clone();
        async move { read_row(&shared, &key).await }
    });
    let chunks = stream::once(future::ready(first))
        .chain(rest)
        .map(|row| {
            let mut chunk = row.to_bytes();
            chunk.push(b'\n');
            chunk
        })
        .chain(stream::once(future::ready(vec![b'\n'])))
        .map(Ok::<_, std::io::Error>);

    (StatusCode::OK, Body::from_stream(chunks)).into_response()
}

async fn read_row(shared: &SharedTable, key: &str) -> Option<Row> {
    shared.read().await.get(key, None)
}

pub async fn handle_count(
    Extension(ctx): Extension<Arc<WorkerContext>>,
    Path(table): Path<String>,
) -> Response {
    let Some(shared) = ctx.catalog.get(&table) else {
        return not_found("Table");
    };
    let count = shared.read().await.count();
    (StatusCode::OK, count.to_string()).into_response()
}

/// `PUT /rename/{table}`: the new name is the request body.
pub async fn handle_rename(
    Extension(ctx): Extension<Arc<WorkerContext>>,
    Path(table): Path<String>,
    new_name: String,
) -> Response {
    match ctx.catalog.rename(&table, new_name.trim()).await {
        Ok(()) => (StatusCode::OK, BODY_OK).into_response(),
        Err(e) => catalog_error_response(e),
    }
}

pub async fn handle_delete(
    Extension(ctx): Extension<Arc<WorkerContext>>,
    Path(table): Path<String>,
) -> Response {
    match ctx.catalog.delete(&table).await {
        Ok(()) => (StatusCode::OK, BODY_OK).into_response(),
        Err(e) => catalog_error_response(e),
    }
}

pub async fn handle_list(Extension(ctx): Extension<Arc<WorkerContext>>) -> Json<Vec<String>> {
    Json(ctx.catalog.names())
}

/// `GET /metas/{table}`: key and content hash of every row.
pub async fn handle_metas(
    Extension(ctx): Extension<Arc<WorkerContext>>,
    Path(table): Path<String>,
) -> Response {
    let Some(shared) = ctx.catalog.get(&table) else {
        return not_found("Table");
    };
    let metas = shared.read().await.row_metas();
    Json(metas).into_response()
}
