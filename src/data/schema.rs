//! Dataset Schema Module
//! Single typed declaration of the spreadsheet layout, checked once at load time.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Area identifier column.
pub const SMALL_AREA: &str = "small_area";
/// Co-benefit category column.
pub const CO_BENEFIT_TYPE: &str = "co-benefit_type";

/// First projection year.
pub const YEAR_START: i32 = 2025;
/// Last projection year (inclusive).
pub const YEAR_END: i32 = 2050;

/// Default analysis year shown in the sidebar (the 11th in the range).
pub const DEFAULT_YEAR: i32 = 2035;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Recognized co-benefit categories. Rows with any other value are dropped
/// during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoBenefit {
    AirQuality,
    Noise,
}

impl CoBenefit {
    pub const ALL: [CoBenefit; 2] = [CoBenefit::AirQuality, CoBenefit::Noise];

    /// Value as it appears in the `co-benefit_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoBenefit::AirQuality => "air_quality",
            CoBenefit::Noise => "noise",
        }
    }

    /// Human-readable chart label.
    pub fn label(&self) -> &'static str {
        match self {
            CoBenefit::AirQuality => "Air Quality Improvement",
            CoBenefit::Noise => "Noise Reduction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == value)
    }
}

/// All projection years in ascending order.
pub fn years() -> Vec<i32> {
    (YEAR_START..=YEAR_END).collect()
}

/// Year column names, ascending. One numeric column per projection year.
pub fn year_columns() -> Vec<String> {
    years().iter().map(|y| y.to_string()).collect()
}

/// Every column the pipeline references.
pub fn required_columns() -> Vec<String> {
    let mut cols = vec![SMALL_AREA.to_string(), CO_BENEFIT_TYPE.to_string()];
    cols.extend(year_columns());
    cols
}

/// Check that the loaded frame carries every required column.
/// Aggregation never touches a column this check has not verified.
pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let missing: Vec<String> = required_columns()
        .into_iter()
        .filter(|c| !present.contains(c))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_columns_cover_full_range() {
        let cols = year_columns();
        assert_eq!(cols.len(), 26);
        assert_eq!(cols.first().map(String::as_str), Some("2025"));
        assert_eq!(cols.last().map(String::as_str), Some("2050"));
    }

    #[test]
    fn validate_accepts_complete_frame() {
        let mut cols = vec![
            Column::new(SMALL_AREA.into(), vec!["A"]),
            Column::new(CO_BENEFIT_TYPE.into(), vec!["air_quality"]),
        ];
        for year in year_columns() {
            cols.push(Column::new(year.into(), vec![1.0f64]));
        }
        let df = DataFrame::new(cols).unwrap();
        assert!(validate(&df).is_ok());
    }

    #[test]
    fn validate_lists_every_missing_column() {
        let df = DataFrame::new(vec![Column::new(SMALL_AREA.into(), vec!["A"])]).unwrap();
        let err = validate(&df).unwrap_err();
        let SchemaError::MissingColumns(missing) = err;
        assert!(missing.contains(&CO_BENEFIT_TYPE.to_string()));
        assert!(missing.contains(&"2025".to_string()));
        assert!(missing.contains(&"2050".to_string()));
        assert_eq!(missing.len(), 27);
    }

    #[test]
    fn parse_rejects_unknown_categories() {
        assert_eq!(CoBenefit::parse("air_quality"), Some(CoBenefit::AirQuality));
        assert_eq!(CoBenefit::parse("noise"), Some(CoBenefit::Noise));
        assert_eq!(CoBenefit::parse("traffic"), None);
    }
}
