//! The seam between the store and wherever records come from.

use async_trait::async_trait;
use shootcal_records::{RawRecord, RecordsClient, RecordsError};

/// A forward-ordered feed of availability records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Returns up to `page_size` records dated on or after `from_date_ms`.
    async fn fetch_from(
        &self,
        from_date_ms: i64,
        page_size: u32,
    ) -> Result<Vec<RawRecord>, RecordsError>;
}

#[async_trait]
impl RecordSource for RecordsClient {
    async fn fetch_from(
        &self,
        from_date_ms: i64,
        page_size: u32,
    ) -> Result<Vec<RawRecord>, RecordsError> {
        self.fetch_page(from_date_ms, page_size).await
    }
}
