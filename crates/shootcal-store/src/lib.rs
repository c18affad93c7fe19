//! Month-by-month availability cache shared with the presentation layer.

pub mod source;
pub mod store;

pub use source::RecordSource;
pub use store::{
    AvailabilityStore, LoadOutcome, LoadPhase, SkipReason, StoreMode, StoreSnapshot,
};
