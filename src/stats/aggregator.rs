//! Aggregation Pipeline Module
//! Pure functions over the cleaned co-benefit table. Every chart on the
//! dashboard is fed from exactly one of these operations; all of them are
//! deterministic given identical input and recomputed in full on each
//! interaction.

use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use statrs::statistics::Statistics;
use std::collections::HashMap;

use crate::data::schema::{self, CoBenefit};

/// One (year, total) point of a yearly series.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub year: i32,
    pub total: f64,
}

/// Total co-benefit for one area, summed over all years.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaTotal {
    pub area: String,
    pub total: f64,
}

/// One (area, category) entry of the combined ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedArea {
    pub area: String,
    pub category: CoBenefit,
    pub total: f64,
}

/// Per-year comfort-zone label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComfortZone {
    MostComfortable,
    Other,
}

/// One year of the comfort-zone scatter: both category totals plus the label.
#[derive(Debug, Clone, PartialEq)]
pub struct ComfortPoint {
    pub year: i32,
    pub air: f64,
    pub noise: f64,
    pub zone: ComfortZone,
}

/// Category totals at the two boundary years.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeforeAfter {
    pub air_before: f64,
    pub air_after: f64,
    pub noise_before: f64,
    pub noise_after: f64,
}

/// One simulated map marker. Coordinates are random within a fixed bounding
/// box, seeded by the caller; only `area` and `value` carry data.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub area: String,
    pub value: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Symmetric Pearson correlation matrix over the year columns, both
/// categories mixed, indexed the same way on both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub years: Vec<i32>,
    pub cells: Vec<Vec<f64>>,
}

/// The aggregation pipeline. No state, no side effects.
pub struct Aggregator;

impl Aggregator {
    /// Grand total for one category over all areas and years (KPI header).
    pub fn category_total(df: &DataFrame, category: CoBenefit) -> PolarsResult<f64> {
        let filtered = Self::filter_category(df, category)?;
        Ok(Self::row_totals(&filtered)?.iter().sum())
    }

    /// Per-year totals for one category, years ascending. A category with no
    /// rows still yields every year with a zero total, the same shape the
    /// other category gets; only a fully empty table collapses to an empty
    /// series.
    pub fn yearly_series(df: &DataFrame, category: CoBenefit) -> PolarsResult<Vec<TrendPoint>> {
        if df.height() == 0 {
            return Ok(Vec::new());
        }
        let filtered = Self::filter_category(df, category)?;

        let mut series = Vec::with_capacity(schema::years().len());
        for year in schema::years() {
            let total = Self::column_sum(&filtered, &year.to_string())?;
            series.push(TrendPoint { year, total });
        }
        Ok(series)
    }

    /// Total per area for one category, in first-appearance order. That order
    /// is what makes downstream ranking ties stable.
    pub fn area_totals(df: &DataFrame, category: CoBenefit) -> PolarsResult<Vec<AreaTotal>> {
        let filtered = Self::filter_category(df, category)?;
        let row_totals = Self::row_totals(&filtered)?;
        let area_col = filtered.column(schema::SMALL_AREA)?;

        let mut order: Vec<String> = Vec::new();
        let mut sums: HashMap<String, f64> = HashMap::new();
        for (i, row_total) in row_totals.iter().enumerate() {
            let Some(area) = Self::cell_str(area_col, i) else {
                continue;
            };
            if !sums.contains_key(&area) {
                order.push(area.clone());
            }
            *sums.entry(area).or_insert(0.0) += row_total;
        }

        Ok(order
            .into_iter()
            .map(|area| AreaTotal {
                total: sums[&area],
                area,
            })
            .collect())
    }

    /// Top `n` area totals, descending. Stable sort, so ties keep the input
    /// (first-appearance) order. Returns everything when `n` exceeds the
    /// number of areas.
    pub fn top_n(totals: &[AreaTotal], n: usize) -> Vec<AreaTotal> {
        let mut ranked = totals.to_vec();
        ranked.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n);
        ranked
    }

    /// Label each year by comparing it against the mean of each series.
    /// MostComfortable requires air strictly above its mean AND noise
    /// strictly below its mean; a year sitting exactly on a mean is Other.
    pub fn comfort_classification(
        air: &[TrendPoint],
        noise: &[TrendPoint],
    ) -> Vec<ComfortPoint> {
        let air_mean = air.iter().map(|p| p.total).mean();
        let noise_mean = noise.iter().map(|p| p.total).mean();

        air.iter()
            .zip(noise.iter())
            .map(|(a, n)| {
                let zone = if a.total > air_mean && n.total < noise_mean {
                    ComfortZone::MostComfortable
                } else {
                    ComfortZone::Other
                };
                ComfortPoint {
                    year: a.year,
                    air: a.total,
                    noise: n.total,
                    zone,
                }
            })
            .collect()
    }

    /// Category totals at two boundary years.
    pub fn before_after(
        df: &DataFrame,
        year_before: i32,
        year_after: i32,
    ) -> PolarsResult<BeforeAfter> {
        let air = Self::filter_category(df, CoBenefit::AirQuality)?;
        let noise = Self::filter_category(df, CoBenefit::Noise)?;
        Ok(BeforeAfter {
            air_before: Self::column_sum(&air, &year_before.to_string())?,
            air_after: Self::column_sum(&air, &year_after.to_string())?,
            noise_before: Self::column_sum(&noise, &year_before.to_string())?,
            noise_after: Self::column_sum(&noise, &year_after.to_string())?,
        })
    }

    /// Top 10 (area, category) pairs by total over all years, descending.
    pub fn combined_area_ranking(df: &DataFrame) -> PolarsResult<Vec<RankedArea>> {
        let row_totals = Self::row_totals(df)?;
        let area_col = df.column(schema::SMALL_AREA)?;
        let cat_col = df.column(schema::CO_BENEFIT_TYPE)?;

        let mut order: Vec<(String, CoBenefit)> = Vec::new();
        let mut sums: HashMap<(String, CoBenefit), f64> = HashMap::new();
        for (i, row_total) in row_totals.iter().enumerate() {
            let Some(area) = Self::cell_str(area_col, i) else {
                continue;
            };
            let Some(category) = Self::cell_str(cat_col, i)
                .as_deref()
                .and_then(CoBenefit::parse)
            else {
                continue;
            };
            let key = (area, category);
            if !sums.contains_key(&key) {
                order.push(key.clone());
            }
            *sums.entry(key).or_insert(0.0) += row_total;
        }

        let mut ranked: Vec<RankedArea> = order
            .into_iter()
            .map(|key| RankedArea {
                total: sums[&key],
                area: key.0,
                category: key.1,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(10);
        Ok(ranked)
    }

    /// Pairwise Pearson correlation between every pair of year columns,
    /// computed over all rows with both categories mixed. Cells are NaN when
    /// fewer than two rows exist or a column has zero variance.
    pub fn correlation_matrix(df: &DataFrame) -> PolarsResult<CorrelationMatrix> {
        let years = schema::years();
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(years.len());
        for year in &years {
            let ca = df.column(&year.to_string())?.cast(&DataType::Float64)?;
            let ca = ca.f64()?;
            columns.push(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect());
        }

        let cells: Vec<Vec<f64>> = columns
            .par_iter()
            .map(|x| columns.iter().map(|y| Self::pearson(x, y)).collect())
            .collect();

        Ok(CorrelationMatrix { years, cells })
    }

    /// Per-area totals for one category and year, with simulated coordinates
    /// inside the demo bounding box. The generator is seeded by the caller,
    /// so identical seeds reproduce identical maps.
    pub fn map_points(
        df: &DataFrame,
        category: CoBenefit,
        year: i32,
        seed: u64,
    ) -> PolarsResult<Vec<MapPoint>> {
        let filtered = Self::filter_category(df, category)?;
        let area_col = filtered.column(schema::SMALL_AREA)?;
        let ca = filtered.column(&year.to_string())?.cast(&DataType::Float64)?;
        let ca = ca.f64()?;

        let mut order: Vec<String> = Vec::new();
        let mut sums: HashMap<String, f64> = HashMap::new();
        for i in 0..filtered.height() {
            let Some(area) = Self::cell_str(area_col, i) else {
                continue;
            };
            if !sums.contains_key(&area) {
                order.push(area.clone());
            }
            *sums.entry(area).or_insert(0.0) += ca.get(i).unwrap_or(0.0);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Ok(order
            .into_iter()
            .map(|area| MapPoint {
                value: sums[&area],
                area,
                lat: rng.gen_range(-6.3..-6.1),
                lon: rng.gen_range(106.7..106.9),
            })
            .collect())
    }

    // ----- helpers -----

    fn filter_category(df: &DataFrame, category: CoBenefit) -> PolarsResult<DataFrame> {
        df.clone()
            .lazy()
            .filter(col(schema::CO_BENEFIT_TYPE).eq(lit(category.as_str())))
            .collect()
    }

    /// Sum across all year columns, per row.
    fn row_totals(df: &DataFrame) -> PolarsResult<Vec<f64>> {
        let mut totals = vec![0.0; df.height()];
        for name in schema::year_columns() {
            let ca = df.column(&name)?.cast(&DataType::Float64)?;
            let ca = ca.f64()?;
            for (i, v) in ca.into_iter().enumerate() {
                totals[i] += v.unwrap_or(0.0);
            }
        }
        Ok(totals)
    }

    fn column_sum(df: &DataFrame, name: &str) -> PolarsResult<f64> {
        let ca = df.column(name)?.cast(&DataType::Float64)?;
        Ok(ca.f64()?.sum().unwrap_or(0.0))
    }

    fn cell_str(col: &Column, i: usize) -> Option<String> {
        let v = col.get(i).ok()?;
        if v.is_null() {
            None
        } else {
            Some(v.to_string().trim_matches('"').to_string())
        }
    }

    /// Sample Pearson correlation; NaN pairs are skipped, matching how the
    /// source pipeline correlates already-imputed columns.
    fn pearson(x: &[f64], y: &[f64]) -> f64 {
        let (xs, ys): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y.iter())
            .filter(|(a, b)| a.is_finite() && b.is_finite())
            .map(|(a, b)| (*a, *b))
            .unzip();

        let n = xs.len();
        if n < 2 {
            return f64::NAN;
        }

        let mx = (&xs).mean();
        let my = (&ys).mean();
        let sx = (&xs).std_dev();
        let sy = (&ys).std_dev();
        if !(sx > 0.0) || !(sy > 0.0) {
            return f64::NAN;
        }

        let cov = xs
            .iter()
            .zip(ys.iter())
            .map(|(a, b)| (a - mx) * (b - my))
            .sum::<f64>()
            / (n as f64 - 1.0);
        cov / (sx * sy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{CO_BENEFIT_TYPE, SMALL_AREA};
    use std::collections::HashMap as Map;

    /// Frame with every year column present; unspecified years are zero.
    fn frame(areas: &[&str], cats: &[&str], overrides: &[(i32, &[f64])]) -> DataFrame {
        let n = areas.len();
        let overrides: Map<i32, &[f64]> = overrides.iter().copied().collect();

        let mut cols = vec![
            Column::new(
                SMALL_AREA.into(),
                areas.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            ),
            Column::new(
                CO_BENEFIT_TYPE.into(),
                cats.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            ),
        ];
        for year in schema::years() {
            let data: Vec<f64> = match overrides.get(&year) {
                Some(vals) => vals.to_vec(),
                None => vec![0.0; n],
            };
            cols.push(Column::new(year.to_string().into(), data));
        }
        DataFrame::new(cols).unwrap()
    }

    fn empty_frame() -> DataFrame {
        frame(&[], &[], &[])
    }

    #[test]
    fn yearly_series_covers_all_years_ascending() {
        let df = frame(
            &["A", "B"],
            &["air_quality", "air_quality"],
            &[(2025, &[1.0, 2.0]), (2040, &[3.0, 4.0])],
        );
        let series = Aggregator::yearly_series(&df, CoBenefit::AirQuality).unwrap();
        assert_eq!(series.len(), 26);
        for pair in series.windows(2) {
            assert!(pair[0].year < pair[1].year);
        }
        assert_eq!(series[0], TrendPoint { year: 2025, total: 3.0 });
        assert_eq!(series[15], TrendPoint { year: 2040, total: 7.0 });
    }

    #[test]
    fn yearly_series_is_all_zeros_for_row_less_category() {
        let df = frame(&["A"], &["noise"], &[(2025, &[3.0])]);

        let air = Aggregator::yearly_series(&df, CoBenefit::AirQuality).unwrap();
        assert_eq!(air.len(), 26);
        assert!(air.iter().all(|p| p.total == 0.0));

        // The flat series still pairs up year-by-year downstream.
        let noise = Aggregator::yearly_series(&df, CoBenefit::Noise).unwrap();
        let comfort = Aggregator::comfort_classification(&air, &noise);
        assert_eq!(comfort.len(), 26);
        assert!(comfort.iter().all(|p| p.zone == ComfortZone::Other));
    }

    #[test]
    fn area_totals_invariant_under_row_permutation() {
        let df1 = frame(
            &["A", "B", "A"],
            &["air_quality", "air_quality", "air_quality"],
            &[(2025, &[1.0, 2.0, 3.0])],
        );
        let df2 = frame(
            &["A", "A", "B"],
            &["air_quality", "air_quality", "air_quality"],
            &[(2025, &[3.0, 1.0, 2.0])],
        );

        let as_map = |totals: Vec<AreaTotal>| -> Map<String, f64> {
            totals.into_iter().map(|t| (t.area, t.total)).collect()
        };
        let t1 = as_map(Aggregator::area_totals(&df1, CoBenefit::AirQuality).unwrap());
        let t2 = as_map(Aggregator::area_totals(&df2, CoBenefit::AirQuality).unwrap());
        assert_eq!(t1, t2);
        assert_eq!(t1["A"], 4.0);
        assert_eq!(t1["B"], 2.0);
    }

    #[test]
    fn top_n_is_non_increasing_and_dominates_excluded() {
        let totals: Vec<AreaTotal> = [("A", 5.0), ("B", 9.0), ("C", 1.0), ("D", 9.0), ("E", 3.0)]
            .iter()
            .map(|(a, t)| AreaTotal {
                area: a.to_string(),
                total: *t,
            })
            .collect();

        let top = Aggregator::top_n(&totals, 3);
        assert_eq!(top.len(), 3);
        for pair in top.windows(2) {
            assert!(pair[0].total >= pair[1].total);
        }
        // Stable: B precedes D on the tie.
        assert_eq!(top[0].area, "B");
        assert_eq!(top[1].area, "D");

        let cutoff = top.last().unwrap().total;
        for t in &totals {
            if !top.iter().any(|r| r.area == t.area) {
                assert!(cutoff >= t.total);
            }
        }
    }

    #[test]
    fn top_n_larger_than_available_returns_all() {
        let totals = vec![AreaTotal {
            area: "A".to_string(),
            total: 1.0,
        }];
        assert_eq!(Aggregator::top_n(&totals, 10).len(), 1);
        assert!(Aggregator::top_n(&totals, 0).is_empty());
    }

    #[test]
    fn comfort_requires_strict_inequality_on_both_sides() {
        // Air values 1,2,3 (mean 2); noise values 3,2,1 (mean 2).
        let air: Vec<TrendPoint> = [(2025, 1.0), (2026, 2.0), (2027, 3.0)]
            .iter()
            .map(|&(year, total)| TrendPoint { year, total })
            .collect();
        let noise: Vec<TrendPoint> = [(2025, 3.0), (2026, 2.0), (2027, 1.0)]
            .iter()
            .map(|&(year, total)| TrendPoint { year, total })
            .collect();

        let points = Aggregator::comfort_classification(&air, &noise);
        assert_eq!(points.len(), 3);
        // 2026 sits exactly on both means and must not qualify.
        assert_eq!(points[0].zone, ComfortZone::Other);
        assert_eq!(points[1].zone, ComfortZone::Other);
        assert_eq!(points[2].zone, ComfortZone::MostComfortable);
    }

    #[test]
    fn before_after_round_trips_single_rows() {
        let df = frame(
            &["A", "B"],
            &["air_quality", "noise"],
            &[(2025, &[10.0, 7.0]), (2050, &[20.0, 4.0])],
        );
        let ba = Aggregator::before_after(&df, 2025, 2050).unwrap();
        assert_eq!(ba.air_before, 10.0);
        assert_eq!(ba.air_after, 20.0);
        assert_eq!(ba.noise_before, 7.0);
        assert_eq!(ba.noise_after, 4.0);
    }

    #[test]
    fn worked_example_totals_and_top_one() {
        let df = frame(
            &["A", "B"],
            &["air_quality", "air_quality"],
            &[(2025, &[10.0, 5.0]), (2050, &[20.0, 5.0])],
        );
        let totals = Aggregator::area_totals(&df, CoBenefit::AirQuality).unwrap();
        let as_map: Map<&str, f64> = totals.iter().map(|t| (t.area.as_str(), t.total)).collect();
        assert_eq!(as_map["A"], 30.0);
        assert_eq!(as_map["B"], 10.0);

        let top = Aggregator::top_n(&totals, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].area, "A");
        assert_eq!(top[0].total, 30.0);
    }

    #[test]
    fn unrecognized_category_rows_never_surface() {
        // The cleaner drops these before aggregation, but the aggregator must
        // not resurrect them either.
        let df = frame(
            &["A", "X"],
            &["air_quality", "traffic"],
            &[(2025, &[1.0, 99.0])],
        );
        let totals = Aggregator::area_totals(&df, CoBenefit::AirQuality).unwrap();
        assert!(totals.iter().all(|t| t.area != "X"));

        let ranking = Aggregator::combined_area_ranking(&df).unwrap();
        assert!(ranking.iter().all(|r| r.area != "X"));
    }

    #[test]
    fn combined_ranking_descends_and_caps_at_ten() {
        let areas: Vec<String> = (0..12).map(|i| format!("A{i}")).collect();
        let area_refs: Vec<&str> = areas.iter().map(String::as_str).collect();
        let cats = vec!["air_quality"; 12];
        let values: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let df = frame(&area_refs, &cats, &[(2030, &values)]);

        let ranking = Aggregator::combined_area_ranking(&df).unwrap();
        assert_eq!(ranking.len(), 10);
        assert_eq!(ranking[0].area, "A11");
        for pair in ranking.windows(2) {
            assert!(pair[0].total >= pair[1].total);
        }
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let df = frame(
            &["A", "B", "C"],
            &["air_quality", "noise", "air_quality"],
            &[
                (2025, &[1.0, 2.0, 3.0]),
                (2026, &[2.0, 4.0, 6.0]),
                (2027, &[3.0, 1.0, 2.0]),
            ],
        );
        let m = Aggregator::correlation_matrix(&df).unwrap();
        assert_eq!(m.years.len(), 26);
        assert_eq!(m.cells.len(), 26);

        // 2025 and 2026 are perfectly correlated.
        assert!((m.cells[0][1] - 1.0).abs() < 1e-12);
        assert!((m.cells[0][0] - 1.0).abs() < 1e-12);
        assert!((m.cells[0][2] - m.cells[2][0]).abs() < 1e-12);
        // Constant columns (all zeros) have no defined correlation.
        assert!(m.cells[3][3].is_nan());
    }

    #[test]
    fn empty_table_yields_empty_outputs() {
        let df = empty_frame();
        assert!(Aggregator::yearly_series(&df, CoBenefit::AirQuality)
            .unwrap()
            .is_empty());
        assert!(Aggregator::area_totals(&df, CoBenefit::Noise)
            .unwrap()
            .is_empty());
        assert!(Aggregator::combined_area_ranking(&df).unwrap().is_empty());
        assert!(Aggregator::map_points(&df, CoBenefit::Noise, 2035, 42)
            .unwrap()
            .is_empty());
        assert_eq!(
            Aggregator::category_total(&df, CoBenefit::AirQuality).unwrap(),
            0.0
        );
        assert_eq!(
            Aggregator::before_after(&df, 2025, 2050).unwrap(),
            BeforeAfter::default()
        );
    }

    #[test]
    fn recomputation_is_deterministic() {
        let df = frame(
            &["A", "B"],
            &["air_quality", "noise"],
            &[(2025, &[1.5, 2.5]), (2049, &[4.0, 0.5])],
        );
        assert_eq!(
            Aggregator::yearly_series(&df, CoBenefit::AirQuality).unwrap(),
            Aggregator::yearly_series(&df, CoBenefit::AirQuality).unwrap()
        );
        assert_eq!(
            Aggregator::combined_area_ranking(&df).unwrap(),
            Aggregator::combined_area_ranking(&df).unwrap()
        );
        assert_eq!(
            Aggregator::correlation_matrix(&df).unwrap().cells[0],
            Aggregator::correlation_matrix(&df).unwrap().cells[0]
        );
    }

    #[test]
    fn map_points_reproduce_for_equal_seeds() {
        let df = frame(
            &["A", "B"],
            &["air_quality", "air_quality"],
            &[(2035, &[5.0, 6.0])],
        );
        let p1 = Aggregator::map_points(&df, CoBenefit::AirQuality, 2035, 7).unwrap();
        let p2 = Aggregator::map_points(&df, CoBenefit::AirQuality, 2035, 7).unwrap();
        let p3 = Aggregator::map_points(&df, CoBenefit::AirQuality, 2035, 8).unwrap();

        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
        for p in &p1 {
            assert!((-6.3..=-6.1).contains(&p.lat));
            assert!((106.7..=106.9).contains(&p.lon));
        }
        assert_eq!(p1[0].value, 5.0);
        assert_eq!(p1[1].value, 6.0);
    }
}
