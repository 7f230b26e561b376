pub mod record;
pub mod resolver;
pub mod source;

pub use record::{JwkRecord, JwksDocument, KeyRecordError, KeySet};
pub use resolver::{FetchPolicy, KeyResolver};
pub use source::{HttpJwksSource, JwksSource, KeyFetchError};
