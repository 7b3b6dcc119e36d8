//! Data Cleaner Module
//! Category filtering, exact-duplicate removal, and median imputation.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::schema::{self, CoBenefit};

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Which rows feed the column medians used to fill missing cells.
///
/// `Global` matches the source data pipeline: one median per year column over
/// both categories together, even though the two indicators live on different
/// scales. `PerCategory` keeps the scales apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImputationScope {
    Global,
    PerCategory,
}

impl Default for ImputationScope {
    fn default() -> Self {
        ImputationScope::Global
    }
}

/// Turns a raw loaded frame into the cleaned table every aggregation reads.
pub struct DataCleaner;

impl DataCleaner {
    /// Clean the raw table. Order matters: filter, dedup, then impute, so
    /// medians are computed over the filtered, deduplicated rows only.
    pub fn clean(df: &DataFrame, scope: ImputationScope) -> Result<DataFrame, CleanerError> {
        let filtered = Self::filter_recognized(df)?;
        let deduped = filtered
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?;
        Self::impute_medians(deduped, scope)
    }

    /// Keep only rows whose category is one of the recognized co-benefit
    /// values. Anything else is dropped without reporting.
    fn filter_recognized(df: &DataFrame) -> Result<DataFrame, CleanerError> {
        let recognized = col(schema::CO_BENEFIT_TYPE)
            .eq(lit(CoBenefit::AirQuality.as_str()))
            .or(col(schema::CO_BENEFIT_TYPE).eq(lit(CoBenefit::Noise.as_str())));
        Ok(df.clone().lazy().filter(recognized).collect()?)
    }

    /// Replace every missing numeric cell with its column median. All year
    /// columns come back as Float64 regardless of the inferred input dtype.
    fn impute_medians(
        mut df: DataFrame,
        scope: ImputationScope,
    ) -> Result<DataFrame, CleanerError> {
        let categories: Vec<Option<CoBenefit>> = match scope {
            ImputationScope::Global => Vec::new(),
            ImputationScope::PerCategory => Self::row_categories(&df)?,
        };

        for name in schema::year_columns() {
            let values: Vec<Option<f64>> = {
                let ca = df.column(&name)?.cast(&DataType::Float64)?;
                let ca = ca.f64()?;
                ca.into_iter().collect()
            };

            let filled: Vec<f64> = match scope {
                ImputationScope::Global => {
                    let median = Self::median(values.iter().filter_map(|v| *v));
                    values.iter().map(|v| v.unwrap_or(median)).collect()
                }
                ImputationScope::PerCategory => {
                    let global = Self::median(values.iter().filter_map(|v| *v));
                    let per_cat: Vec<f64> = CoBenefit::ALL
                        .iter()
                        .map(|cat| {
                            let m = Self::median(
                                values
                                    .iter()
                                    .zip(categories.iter())
                                    .filter(|(_, c)| **c == Some(*cat))
                                    .filter_map(|(v, _)| *v),
                            );
                            if m.is_nan() {
                                global
                            } else {
                                m
                            }
                        })
                        .collect();

                    values
                        .iter()
                        .zip(categories.iter())
                        .map(|(v, cat)| {
                            v.unwrap_or_else(|| match cat {
                                Some(CoBenefit::AirQuality) => per_cat[0],
                                Some(CoBenefit::Noise) => per_cat[1],
                                None => global,
                            })
                        })
                        .collect()
                }
            };

            df.with_column(Column::new(name.as_str().into(), filled))?;
        }

        Ok(df)
    }

    /// Parsed category per row, in row order.
    fn row_categories(df: &DataFrame) -> Result<Vec<Option<CoBenefit>>, CleanerError> {
        let cat_col = df.column(schema::CO_BENEFIT_TYPE)?;
        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let cat = cat_col
                .get(i)
                .ok()
                .filter(|v| !v.is_null())
                .and_then(|v| CoBenefit::parse(v.to_string().trim_matches('"')));
            out.push(cat);
        }
        Ok(out)
    }

    /// Median of the given values; NaN when empty.
    fn median(values: impl Iterator<Item = f64>) -> f64 {
        let mut sorted: Vec<f64> = values.collect();
        let n = sorted.len();
        if n == 0 {
            return f64::NAN;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        }
    }
}
