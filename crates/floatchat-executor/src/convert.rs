use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as SqlxRow, TypeInfo};

use floatchat_core::types::{CellValue, Row};

/// Convert a whole `PgRow` into our ordered column-name -> cell mapping,
/// preserving the column order the executor returned.
pub fn row_to_mapping(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), convert_value(row, i, col.type_info().name())))
        .collect()
}

/// Decode a single cell by its Postgres type name. Any decode failure
/// (including a genuine NULL) maps to `CellValue::Null` rather than
/// failing the whole row — the executor never crashes on an unexpected
/// column type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> CellValue {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(CellValue::from)
            .unwrap_or(CellValue::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| CellValue::from(v as i64))
            .unwrap_or(CellValue::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| CellValue::from(v as i64))
            .unwrap_or(CellValue::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(CellValue::from)
            .unwrap_or(CellValue::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| CellValue::from(v as f64))
            .unwrap_or(CellValue::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(CellValue::from)
            .unwrap_or(CellValue::Null),

        // sqlx only decodes NUMERIC through `bigdecimal`/`rust_decimal` —
        // an `f64` try_get here always errors since `f64` only matches
        // FLOAT8. AVG/SUM over float columns return NUMERIC, so this path
        // matters for ordinary aggregate queries, not just edge cases.
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(index)
            .ok()
            .flatten()
            .and_then(|v| v.to_f64())
            .map(CellValue::from)
            .unwrap_or(CellValue::Null),

        "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| CellValue::String(v.to_rfc3339()))
            .unwrap_or(CellValue::Null),

        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)
            .ok()
            .flatten()
            .unwrap_or(CellValue::Null),

        // Includes VARCHAR/TEXT/DATE/UUID/GEOGRAPHY-as-text and every
        // other type: fall back to a string decode.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(CellValue::String)
            .unwrap_or(CellValue::Null),
    }
}
