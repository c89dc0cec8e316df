//! Data module - CSV loading, cleaning, enrichment and aggregation

mod aggregator;
mod enricher;
mod loader;
mod pipeline;
mod processor;

pub use aggregator::{AggregatedGroup, Aggregator};
pub use enricher::{parse_timestamp, weekday_name, FeatureEnricher, TimeOfDay};
pub use loader::{DataLoader, LoaderError, SourceTables};
pub use pipeline::{
    available_years, enrich_tables, filter_by_year, location_options, prepare_exploration,
    prepare_training_groups, Location, PipelineError,
};
pub use processor::{CleanOptions, DataProcessor, ProcessorError, SENTINEL_LATITUDE};

/// Column names of the source tables and of the derived fields.
pub mod columns {
    pub const OFFENSE_CODE: &str = "OFFENSE_CODE";
    pub const OCCURRED_ON_DATE: &str = "OCCURRED_ON_DATE";
    pub const LAT: &str = "Lat";
    pub const LONG: &str = "Long";
    pub const DISTRICT: &str = "DISTRICT";

    pub const CODE: &str = "CODE";

    pub const YEAR: &str = "YEAR";
    pub const MONTH: &str = "MONTH";
    pub const DAY: &str = "DAY";
    pub const HOUR: &str = "HOUR";
    pub const DAY_OF_WEEK: &str = "DAY_OF_WEEK";
    pub const TIME_OF_DAY: &str = "TIME_OF_DAY";
    pub const CRIME_DENSITY: &str = "CRIME_DENSITY";

    pub const CRIME_COUNT: &str = "CRIME_COUNT";
}
