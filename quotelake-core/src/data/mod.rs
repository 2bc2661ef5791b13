//! Market data: the source trait, the Yahoo client, record schemas and partition keys.

pub mod frame;
pub mod partition;
pub mod provider;
pub mod schema;
pub mod yahoo;

pub use frame::{partition_key_of, raw_frame};
pub use partition::{PartitionKey, PARTITION_COLUMNS};
pub use provider::{FetchResult, MarketDataSource, RawBar, SourceError};
pub use schema::{RawSchema, RefinedSchema, SchemaError};
pub use yahoo::YahooSource;
