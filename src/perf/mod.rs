pub mod store;

pub use store::{PerfComparison, PerfError, PerfMeasurement, PerfStore};
