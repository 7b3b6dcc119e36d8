//! Stats module - the aggregation pipeline feeding every chart

mod aggregator;

pub use aggregator::{
    Aggregator, AreaTotal, BeforeAfter, ComfortPoint, ComfortZone, CorrelationMatrix, MapPoint,
    RankedArea, TrendPoint,
};
