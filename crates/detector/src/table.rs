//! Conversion between the tabular market-data shape and `MarketSnapshot` rows.
//!
//! The table is validated in full before any row is produced: an empty table, a missing
//! required column or a repeated (id, timestamp) key is a hard error, never silently skipped.

use crate::error::DetectorError;
use chrono::DateTime;
use core_types::{MarketSnapshot, Tier};
use polars::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

pub const ID_COLUMN: &str = "id";
pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const MARKET_CAP_COLUMN: &str = "market_cap";
pub const VOLUME_COLUMN: &str = "total_volume";
pub const PRICE_COLUMN: &str = "current_price";
/// Accepted in place of `current_price`.
pub const CLOSE_COLUMN: &str = "close";
pub const CHANGE_COLUMN: &str = "price_change_percentage_24h";
pub const TIER_COLUMN: &str = "tier";

/// Reads a CSV or Parquet file, chosen by extension.
pub fn read_table(path: &Path) -> Result<DataFrame, DetectorError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let df = match extension.as_deref() {
        Some("parquet") => ParquetReader::new(File::open(path)?).finish()?,
        Some("csv") => CsvReader::from_path(path)?.has_header(true).finish()?,
        _ => {
            return Err(DetectorError::Validation(format!(
                "unsupported market data file {}; expected .csv or .parquet",
                path.display()
            )));
        }
    };

    tracing::info!(path = %path.display(), rows = df.height(), "loaded market data table");
    Ok(df)
}

/// Validates `df` and converts it into snapshot rows.
///
/// `timestamp` holds integer epoch seconds. A `tier` column, when present, is carried
/// through as a pre-computed classification. Each (id, timestamp) pair may appear once.
pub fn snapshots_from_frame(df: &DataFrame) -> Result<Vec<MarketSnapshot>, DetectorError> {
    if df.height() == 0 {
        return Err(DetectorError::Validation("market data table is empty".to_string()));
    }

    let has = |name: &str| df.column(name).is_ok();
    let price_column = if !has(PRICE_COLUMN) && has(CLOSE_COLUMN) { CLOSE_COLUMN } else { PRICE_COLUMN };
    let missing: Vec<&str> = [
        ID_COLUMN,
        TIMESTAMP_COLUMN,
        MARKET_CAP_COLUMN,
        VOLUME_COLUMN,
        price_column,
        CHANGE_COLUMN,
    ]
    .into_iter()
    .filter(|name| !has(*name))
    .collect();
    if !missing.is_empty() {
        return Err(DetectorError::Validation(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    let ids = df.column(ID_COLUMN)?.cast(&DataType::String)?;
    let ids = ids.str()?;
    let timestamps = df.column(TIMESTAMP_COLUMN)?.cast(&DataType::Int64)?;
    let timestamps = timestamps.i64()?;
    let market_caps = float_column(df, MARKET_CAP_COLUMN)?;
    let volumes = float_column(df, VOLUME_COLUMN)?;
    let prices = float_column(df, price_column)?;
    let changes = float_column(df, CHANGE_COLUMN)?;
    let tiers = if has(TIER_COLUMN) {
        Some(df.column(TIER_COLUMN)?.cast(&DataType::Int64)?)
    } else {
        None
    };
    let tiers = tiers.as_ref().map(|s| s.i64()).transpose()?;

    let mut rows = Vec::with_capacity(df.height());
    let mut seen: HashMap<(&str, i64), usize> = HashMap::with_capacity(df.height());
    for i in 0..df.height() {
        let asset_id = ids.get(i).ok_or_else(|| null_cell(ID_COLUMN, i))?;
        let seconds = timestamps.get(i).ok_or_else(|| null_cell(TIMESTAMP_COLUMN, i))?;
        if let Some(first) = seen.insert((asset_id, seconds), i) {
            return Err(DetectorError::Validation(format!(
                "row {i}: asset '{asset_id}' at timestamp {seconds} duplicates row {first}"
            )));
        }
        let timestamp = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            DetectorError::Validation(format!("row {i}: timestamp {seconds} is out of range"))
        })?;

        let tier = match tiers {
            Some(column) => {
                let raw = column.get(i).ok_or_else(|| null_cell(TIER_COLUMN, i))?;
                let tier = u8::try_from(raw)
                    .map_err(|_| DetectorError::Validation(format!("row {i}: tier {raw} is out of range")))
                    .and_then(|t| Tier::try_from(t).map_err(DetectorError::from))?;
                Some(tier)
            }
            None => None,
        };

        rows.push(MarketSnapshot {
            asset_id: asset_id.to_string(),
            timestamp,
            market_cap: decimal_cell(&market_caps, MARKET_CAP_COLUMN, i)?,
            total_volume: decimal_cell(&volumes, VOLUME_COLUMN, i)?,
            price: decimal_cell(&prices, price_column, i)?,
            price_change_pct_24h: decimal_cell(&changes, CHANGE_COLUMN, i)?,
            tier,
        });
    }
    Ok(rows)
}

fn float_column(df: &DataFrame, name: &str) -> Result<Float64Chunked, DetectorError> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

fn decimal_cell(column: &Float64Chunked, name: &str, row: usize) -> Result<Decimal, DetectorError> {
    let value = column.get(row).ok_or_else(|| null_cell(name, row))?;
    Decimal::from_f64(value).ok_or_else(|| {
        DetectorError::Validation(format!("row {row}: {name} value {value} is not a finite number"))
    })
}

fn null_cell(column: &str, row: usize) -> DetectorError {
    DetectorError::Validation(format!("row {row}: required column '{column}' is null"))
}
