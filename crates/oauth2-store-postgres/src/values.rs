//! Conversion between store values and PostgreSQL parameters/columns.

use serde_json::value::RawValue;
use sqlx_core::column::Column;
use sqlx_core::query::Query;
use sqlx_core::row::Row as _;
use sqlx_core::type_info::TypeInfo;
use sqlx_core::types::Json;
use sqlx_postgres::{PgArguments, PgRow, Postgres};
use time::OffsetDateTime;

use oauth2_store::{Row, StorageError, StorageResult, Value};

pub(crate) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Map a sqlx error into the store taxonomy. An empty result set becomes
/// the shared [`StorageError::NoRows`] sentinel.
pub(crate) fn storage_error(err: sqlx_core::Error) -> StorageError {
    match err {
        sqlx_core::Error::RowNotFound => StorageError::NoRows,
        other => StorageError::database(other.to_string()),
    }
}

/// Bind one value. Blobs are bound as JSONB, which is what the default
/// schemas declare for the `data` column.
pub(crate) fn bind<'q>(query: PgQuery<'q>, value: &Value) -> StorageResult<PgQuery<'q>> {
    Ok(match value {
        Value::BigInt(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Timestamp(v) => query.bind(*v),
        Value::Blob(v) => query.bind(Json(serde_json::from_slice::<Box<RawValue>>(v)?)),
    })
}

/// Decode every column of a row by its PostgreSQL type.
pub(crate) fn decode_row(row: &PgRow) -> StorageResult<Row> {
    let mut decoded = Row::new();

    for (idx, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let value = match column.type_info().name() {
            "INT8" => Value::BigInt(row.try_get::<i64, _>(idx).map_err(storage_error)?),
            "INT4" => Value::BigInt(i64::from(
                row.try_get::<i32, _>(idx).map_err(storage_error)?,
            )),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                Value::Text(row.try_get::<String, _>(idx).map_err(storage_error)?)
            }
            "TIMESTAMPTZ" => Value::Timestamp(
                row.try_get::<OffsetDateTime, _>(idx)
                    .map_err(storage_error)?,
            ),
            "JSONB" | "JSON" => {
                let Json(raw): Json<Box<RawValue>> = row.try_get(idx).map_err(storage_error)?;
                Value::Blob(raw.get().as_bytes().to_vec())
            }
            "BYTEA" => Value::Blob(row.try_get::<Vec<u8>, _>(idx).map_err(storage_error)?),
            other => {
                return Err(StorageError::invalid_row(format!(
                    "column '{name}' has unsupported type {other}"
                )));
            }
        };
        decoded.push(name, value);
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_is_sentinel() {
        assert!(storage_error(sqlx_core::Error::RowNotFound).is_no_rows());
    }

    #[test]
    fn test_other_errors_are_database_errors() {
        let err = storage_error(sqlx_core::Error::PoolTimedOut);
        assert!(err.is_database_error());
        assert!(!err.is_no_rows());
    }

    #[test]
    fn test_bind_rejects_non_json_blob() {
        let query = sqlx_core::query::query::<Postgres>("SELECT $1");
        let Err(err) = bind(query, &Value::Blob(b"not json".to_vec())) else {
            panic!("binding should fail");
        };
        assert!(err.is_serialization_error());
    }

    #[test]
    fn test_bind_accepts_all_kinds() {
        let query = sqlx_core::query::query::<Postgres>("SELECT $1, $2, $3, $4");
        let query = bind(query, &Value::BigInt(1)).unwrap();
        let query = bind(query, &Value::from("text")).unwrap();
        let query = bind(query, &Value::Timestamp(OffsetDateTime::UNIX_EPOCH)).unwrap();
        assert!(bind(query, &Value::Blob(br#"{"a":1}"#.to_vec())).is_ok());
    }
}
