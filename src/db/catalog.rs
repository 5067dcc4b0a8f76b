use duckdb::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use tracing::debug;

/// Tables eligible for introspection and querying. Anything outside this
/// list is invisible to the model at the schema-disclosure stage, even when
/// it exists in the underlying database.
pub const ALLOWED_TABLES: [&str; 9] = [
    "Buildings",
    "Categories",
    "Items",
    "Residents",
    "Transactions",
    "TransactionItems",
    "TransactionTypes",
    "Units",
    "Users",
];

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
}

/// Table name to ordered column descriptors, column order following the
/// catalog's ordinal position.
pub type SchemaDescriptor = BTreeMap<String, Vec<ColumnInfo>>;

#[derive(Debug)]
pub enum CatalogError {
    DatabaseUnavailable(String),
    Introspection(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::DatabaseUnavailable(msg) => {
                write!(f, "database unavailable: {}", msg)
            }
            CatalogError::Introspection(msg) => write!(f, "schema introspection failed: {}", msg),
        }
    }
}

impl Error for CatalogError {}

/// Builds the schema descriptor for the allow-listed tables.
///
/// Opens one fresh connection per call and releases it before returning;
/// callers that need pooling can layer it on top.
pub async fn describe_schema(connection_string: &str) -> Result<SchemaDescriptor, CatalogError> {
    let connection_string = connection_string.to_string();

    tokio::task::spawn_blocking(move || {
        let conn = Connection::open(&connection_string)
            .map_err(|e| CatalogError::DatabaseUnavailable(e.to_string()))?;
        introspect(&conn).map_err(|e| CatalogError::Introspection(e.to_string()))
    })
    .await
    .map_err(|e| CatalogError::Introspection(format!("schema task failed: {}", e)))?
}

pub(crate) fn introspect(conn: &Connection) -> Result<SchemaDescriptor, duckdb::Error> {
    // The allow-list entries are compile-time literals, so interpolating
    // them into the IN clause introduces no untrusted input.
    let table_list = ALLOWED_TABLES
        .iter()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "SELECT t.table_name, c.column_name, c.data_type, c.is_nullable \
         FROM information_schema.tables t \
         INNER JOIN information_schema.columns c ON t.table_name = c.table_name \
         WHERE t.table_type = 'BASE TABLE' \
           AND t.table_name IN ({}) \
         ORDER BY t.table_name, c.ordinal_position",
        table_list
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,            // table_name
            row.get::<_, String>(1)?,            // column_name
            row.get::<_, String>(2)?,            // data_type
            row.get::<_, String>(3)? == "YES",   // is_nullable
        ))
    })?;

    let mut schema = SchemaDescriptor::new();
    for row in rows {
        let (table, column, data_type, nullable) = row?;
        schema.entry(table).or_default().push(ColumnInfo {
            name: column,
            data_type,
            nullable,
        });
    }

    debug!("described {} allow-listed tables", schema.len());
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_connection() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn allow_listed_tables_are_described_in_ordinal_order() {
        let conn = test_connection();
        conn.execute_batch(
            "CREATE TABLE \"Items\" (\"Id\" INTEGER NOT NULL, \"Name\" VARCHAR, \"Price\" DOUBLE);",
        )
        .unwrap();

        let schema = introspect(&conn).unwrap();
        let columns = schema.get("Items").expect("Items should be visible");

        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Id", "Name", "Price"]);
        assert!(!columns[0].nullable);
        assert!(columns[1].nullable);
    }

    #[test]
    fn tables_outside_the_allow_list_are_invisible() {
        let conn = test_connection();
        conn.execute_batch(
            "CREATE TABLE \"Items\" (\"Id\" INTEGER); \
             CREATE TABLE \"Secrets\" (\"Token\" VARCHAR);",
        )
        .unwrap();

        let schema = introspect(&conn).unwrap();
        assert!(schema.contains_key("Items"));
        assert!(!schema.contains_key("Secrets"));
    }

    #[test]
    fn empty_database_yields_an_empty_descriptor() {
        let conn = test_connection();
        let schema = introspect(&conn).unwrap();
        assert!(schema.is_empty());
    }

    #[tokio::test]
    async fn describe_schema_opens_its_own_connection() {
        // A fresh in-memory database has no allow-listed tables, which is a
        // valid (empty) descriptor rather than an error.
        let schema = describe_schema(":memory:").await.unwrap();
        assert!(schema.is_empty());
    }
}
