use base64::Engine as _;
use duckdb::types::ValueRef;
use duckdb::Connection;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

pub type Row = Map<String, Value>;

/// Uniform outcome of running one approved query.
///
/// `success` implies `data` and `row_count` are present and consistent;
/// failure implies only `error` is present. The constructors are the only way
/// these are built, which keeps the invariant in one place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn completed(rows: Vec<Row>) -> Self {
        Self {
            success: true,
            row_count: Some(rows.len()),
            data: Some(rows),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            row_count: None,
            error: Some(error.into()),
        }
    }
}

/// Runs an already-gated query against the database.
///
/// Opens a fresh connection, runs the text verbatim as a single statement,
/// reads the full result set into memory, and maps any driver fault to a
/// failure result instead of propagating it. The caller is expected to have
/// obtained an `Execute` decision from the gate first; no re-validation
/// happens here. Never retries.
pub async fn execute(connection_string: &str, sql: &str) -> ExecutionResult {
    let connection_string = connection_string.to_string();
    let sql_text = sql.to_string();

    let task =
        tokio::task::spawn_blocking(move || run_statement(&connection_string, &sql_text));

    match task.await {
        Ok(Ok(rows)) => {
            debug!("query returned {} rows", rows.len());
            ExecutionResult::completed(rows)
        }
        Ok(Err(e)) => {
            error!("query execution failed: {}", e);
            ExecutionResult::failure(e.to_string())
        }
        Err(e) => {
            error!("query task join error: {}", e);
            ExecutionResult::failure(format!("Query task failed: {}", e))
        }
    }
}

// The connection is scoped to this function, so it is released on drop for
// both the success and the failure path.
fn run_statement(connection_string: &str, sql: &str) -> Result<Vec<Row>, duckdb::Error> {
    let conn = Connection::open(connection_string)?;
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;

    let mut out = Vec::new();
    let mut columns: Option<Vec<String>> = None;

    while let Some(row) = rows.next()? {
        let stmt_ref: &duckdb::Statement = row.as_ref();
        let names = columns.get_or_insert_with(|| {
            (0..stmt_ref.column_count())
                .map(|i| {
                    stmt_ref
                        .column_name(i)
                        .map(|n| n.to_string())
                        .unwrap_or_else(|_| format!("column{}", i))
                })
                .collect()
        });

        let mut record = Row::new();
        for (i, name) in names.iter().enumerate() {
            record.insert(name.clone(), column_value(row, i));
        }
        out.push(record);
    }

    Ok(out)
}

fn column_value(row: &duckdb::Row, idx: usize) -> Value {
    match row.get_ref(idx) {
        Ok(ValueRef::Null) => Value::Null,
        Ok(ValueRef::Boolean(v)) => Value::Bool(v),
        Ok(ValueRef::TinyInt(v)) => Value::from(v),
        Ok(ValueRef::SmallInt(v)) => Value::from(v),
        Ok(ValueRef::Int(v)) => Value::from(v),
        Ok(ValueRef::BigInt(v)) => Value::from(v),
        Ok(ValueRef::HugeInt(v)) => Value::String(v.to_string()),
        Ok(ValueRef::UTinyInt(v)) => Value::from(v),
        Ok(ValueRef::USmallInt(v)) => Value::from(v),
        Ok(ValueRef::UInt(v)) => Value::from(v),
        Ok(ValueRef::UBigInt(v)) => Value::from(v),
        Ok(ValueRef::Float(v)) => Value::from(v),
        Ok(ValueRef::Double(v)) => Value::from(v),
        Ok(ValueRef::Decimal(v)) => Value::String(v.to_string()),
        Ok(ValueRef::Text(v)) => Value::String(String::from_utf8_lossy(v).into_owned()),
        Ok(ValueRef::Blob(v)) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(v))
        }
        // Temporal and nested types fall back to their textual form.
        Ok(_) => match row.get::<_, String>(idx) {
            Ok(text) => Value::String(text),
            Err(_) => row
                .get::<_, duckdb::types::Value>(idx)
                .map(|v| Value::String(format!("{:?}", v)))
                .unwrap_or(Value::Null),
        },
        Err(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn select_returns_rows_and_matching_count() {
        let result = execute(":memory:", "SELECT 42 AS answer, 'hello' AS greeting").await;

        assert!(result.success);
        assert_eq!(result.row_count, Some(1));
        let rows = result.data.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["answer"], Value::from(42));
        assert_eq!(rows[0]["greeting"], Value::from("hello"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn empty_result_set_is_a_success_with_zero_rows() {
        let result = execute(":memory:", "SELECT 1 AS one WHERE 1 = 0").await;

        assert!(result.success);
        assert_eq!(result.row_count, Some(0));
        assert_eq!(result.data.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn driver_errors_map_to_failure_results() {
        let result = execute(":memory:", "SELECT * FROM missing_table").await;

        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(result.data.is_none());
        assert!(result.row_count.is_none());
    }

    #[tokio::test]
    async fn null_values_survive_the_json_mapping() {
        let result = execute(":memory:", "SELECT NULL AS nothing").await;

        assert!(result.success);
        let rows = result.data.unwrap();
        assert_eq!(rows[0]["nothing"], Value::Null);
    }

    #[test]
    fn result_serializes_camel_case_without_absent_fields() {
        let failure = ExecutionResult::failure("boom");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["success"], Value::Bool(false));
        assert_eq!(json["error"], Value::from("boom"));
        assert!(json.get("data").is_none());
        assert!(json.get("rowCount").is_none());

        let success = ExecutionResult::completed(vec![]);
        let json = serde_json::to_value(&success).unwrap();
        assert_eq!(json["rowCount"], Value::from(0));
        assert!(json.get("error").is_none());
    }
}
