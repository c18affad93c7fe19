//! Client and normalization for the remote availability records API.

pub mod client;
pub mod error;
pub mod normalize;
pub mod types;

pub use client::{RecordsClient, DEFAULT_PAGE_SIZE};
pub use error::{ErrorKind, RecordsError};
pub use normalize::{
    normalize_batch, normalize_batch_in, normalize_record, normalize_record_in, MalformedField,
};
pub use types::{RawRecord, RecordsEnvelope, RecordsPage, RecordsQuery};
