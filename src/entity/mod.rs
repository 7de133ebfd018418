pub mod loader;
pub mod numeric;
pub mod record;

pub use loader::{default_weights, load_dataset, Dataset};
pub use numeric::tolerant_number;
pub use record::{EntityRecord, MetricValue, RecordError};
