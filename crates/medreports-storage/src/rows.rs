//! Row operations against PostgREST tables.
//!
//! Filters are equality only (`column=eq.value`), which is all the report
//! store needs.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::PostgrestClient;
use crate::error::StorageError;

const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_COUNT: &str = "count=exact";

/// PostgREST code for "no rows returned" on a single-object read.
const NO_ROWS: &str = "PGRST116";

/// A filtered, ordered, paginated read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Option<(String, bool)>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Query-string pairs in PostgREST syntax.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![(
            "select".to_string(),
            self.select.clone().unwrap_or_else(|| "*".to_string()),
        )];
        for (column, value) in &self.filters {
            pairs.push((column.clone(), format!("eq.{value}")));
        }
        if let Some((column, ascending)) = &self.order {
            let dir = if *ascending { "asc" } else { "desc" };
            pairs.push(("order".to_string(), format!("{column}.{dir}")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }

    fn filter_pairs(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{value}")))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Map a non-success response body to a [`StorageError`].
pub fn response_error(status: reqwest::StatusCode, table: &str, body: &str) -> StorageError {
    let parsed = serde_json::from_str::<PostgrestErrorBody>(body).ok();

    if parsed.as_ref().and_then(|b| b.code.as_deref()) == Some(NO_ROWS) {
        return StorageError::not_found(table);
    }

    let (code, message) = match parsed {
        Some(b) => {
            let mut message = b.message.unwrap_or_default();
            if let Some(details) = b.details.filter(|d| !d.is_empty()) {
                message = format!("{message} ({details})");
            }
            (b.code, message)
        }
        None => (None, body.to_string()),
    };

    StorageError::Postgrest {
        status: status.as_u16(),
        code,
        message,
    }
}

async fn read_rows<R: DeserializeOwned>(
    response: reqwest::Response,
    table: &str,
) -> Result<Vec<R>, StorageError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(response_error(status, table, &body));
    }
    serde_json::from_str(&body).map_err(|e| StorageError::Decode(format!("{table}: {e}")))
}

/// Insert rows and return them as stored.
pub async fn insert_rows<T, R>(
    client: &PostgrestClient,
    table: &str,
    rows: &[T],
) -> Result<Vec<R>, StorageError>
where
    T: Serialize + Sync,
    R: DeserializeOwned,
{
    let response = client
        .request(Method::POST, table)
        .header("Prefer", PREFER_REPRESENTATION)
        .json(rows)
        .send()
        .await?;

    read_rows(response, table).await
}

/// Apply `patch` to every row matching the query's filters. Returns the
/// updated rows.
pub async fn update_rows<T, R>(
    client: &PostgrestClient,
    table: &str,
    query: &Query,
    patch: &T,
) -> Result<Vec<R>, StorageError>
where
    T: Serialize + Sync,
    R: DeserializeOwned,
{
    let response = client
        .request(Method::PATCH, table)
        .header("Prefer", PREFER_REPRESENTATION)
        .query(&query.filter_pairs())
        .json(patch)
        .send()
        .await?;

    read_rows(response, table).await
}

pub async fn select_rows<R: DeserializeOwned>(
    client: &PostgrestClient,
    table: &str,
    query: &Query,
) -> Result<Vec<R>, StorageError> {
    let response = client
        .request(Method::GET, table)
        .query(&query.to_pairs())
        .send()
        .await?;

    read_rows(response, table).await
}

/// Delete matching rows. Returns how many were deleted.
pub async fn delete_rows(
    client: &PostgrestClient,
    table: &str,
    query: &Query,
) -> Result<usize, StorageError> {
    let response = client
        .request(Method::DELETE, table)
        .header("Prefer", PREFER_REPRESENTATION)
        .query(&query.filter_pairs())
        .send()
        .await?;

    let deleted: Vec<serde_json::Value> = read_rows(response, table).await?;
    Ok(deleted.len())
}

/// Exact count of matching rows, read from the `Content-Range` header.
pub async fn count_rows(
    client: &PostgrestClient,
    table: &str,
    query: &Query,
) -> Result<u64, StorageError> {
    let response = client
        .request(Method::HEAD, table)
        .header("Prefer", PREFER_COUNT)
        .query(&query.to_pairs())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(StorageError::Postgrest {
            status: status.as_u16(),
            code: None,
            message: format!("count on {table} failed"),
        });
    }

    response
        .headers()
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range)
        .ok_or_else(|| StorageError::Decode(format!("{table}: missing Content-Range count")))
}

/// Total from a `Content-Range` value such as `0-24/3573` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn query_pairs_follow_postgrest_syntax() {
        let query = Query::new()
            .eq("user_id", "abc")
            .order("created_at", false)
            .limit(10)
            .offset(20);

        assert_eq!(
            query.to_pairs(),
            pairs(&[
                ("select", "*"),
                ("user_id", "eq.abc"),
                ("order", "created_at.desc"),
                ("limit", "10"),
                ("offset", "20"),
            ])
        );
    }

    #[test]
    fn custom_select_columns() {
        let query = Query::new().select("health_score").eq("id", 7);
        assert_eq!(
            query.to_pairs(),
            pairs(&[("select", "health_score"), ("id", "eq.7")])
        );
    }

    #[test]
    fn content_range_totals() {
        assert_eq!(parse_content_range("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-24/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn no_rows_code_maps_to_not_found() {
        let body = r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#;
        let err = response_error(StatusCode::NOT_ACCEPTABLE, "medical_reports", body);
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn postgrest_error_keeps_code_and_details() {
        let body = r#"{"code":"23503","details":"Key is not present in table \"medical_reports\".","hint":null,"message":"insert or update on table \"test_results\" violates foreign key constraint"}"#;
        match response_error(StatusCode::CONFLICT, "test_results", body) {
            StorageError::Postgrest {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 409);
                assert_eq!(code.as_deref(), Some("23503"));
                assert!(message.contains("violates foreign key constraint"));
                assert!(message.contains("Key is not present"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_is_kept_verbatim() {
        let err = response_error(StatusCode::BAD_GATEWAY, "test_results", "upstream timeout");
        assert_eq!(err.to_string(), "database error (502): upstream timeout");
    }
}
