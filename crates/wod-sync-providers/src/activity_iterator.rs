// ABOUTME: Streaming iterator over the watermark-paginated source activity feed
// ABOUTME: Guarantees termination on empty pages and on watermarks that fail to advance
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! # Streaming activity iterator
//!
//! Fetches raw activity records page by page, yielding each record
//! individually. The source hands back a "load after" watermark with every
//! page; the stream stops as soon as:
//!
//! - a page has no items,
//! - the returned watermark is zero, or
//! - the returned watermark equals the one just requested.
//!
//! The last rule bounds the loop even when the source keeps answering with
//! the same cursor.
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use wod_sync_providers::activity_iterator::{ActivityStreamExt, StreamConfig};
//! use wod_sync_providers::SourceClient;
//!
//! async fn count(source: &dyn SourceClient) -> usize {
//!     let mut stream = source.activities_stream(StreamConfig::default());
//!     let mut count = 0;
//!     while let Some(record) = stream.next().await {
//!         if record.is_ok() {
//!             count += 1;
//!         }
//!     }
//!     count
//! }
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use futures_util::{Stream, TryStreamExt};
use serde_json::Value;
use tokio::time::sleep;
use tracing::debug;

use crate::constants::timing::SOURCE_PAGE_DELAY_MS;
use crate::core::SourceClient;
use crate::errors::provider::{ProviderError, ProviderResult};
use crate::pagination::Watermark;

/// Configuration for activity streaming behavior
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Pause between consecutive page requests
    pub page_delay: Duration,
    /// Maximum number of pages to request (None for unlimited)
    pub max_pages: Option<usize>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_millis(SOURCE_PAGE_DELAY_MS),
            max_pages: None,
        }
    }
}

impl StreamConfig {
    /// Configuration with a custom page delay
    #[must_use]
    pub const fn with_page_delay(page_delay: Duration) -> Self {
        Self {
            page_delay,
            max_pages: None,
        }
    }

    /// Cap the number of pages requested
    #[must_use]
    pub const fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = Some(max);
        self
    }
}

/// Stream of raw activity records
pub type RawActivityStream<'a> = Pin<Box<dyn Stream<Item = Result<Value, ProviderError>> + Send + 'a>>;

/// Create a stream that lazily walks the source feed
pub fn create_activity_stream<S>(source: &S, config: StreamConfig) -> RawActivityStream<'_>
where
    S: SourceClient + ?Sized,
{
    Box::pin(try_stream! {
        let mut buffer: VecDeque<Value> = VecDeque::new();
        let mut cursor: Option<Watermark> = None;
        let mut pages_fetched: usize = 0;
        let mut exhausted = false;

        loop {
            if let Some(record) = buffer.pop_front() {
                yield record;
                continue;
            }

            if exhausted || config.max_pages.is_some_and(|max| pages_fetched >= max) {
                break;
            }

            if pages_fetched > 0 && !config.page_delay.is_zero() {
                sleep(config.page_delay).await;
            }

            let page = source.fetch_activities_page(cursor).await?;
            pages_fetched += 1;

            let requested = cursor.unwrap_or_default();
            let next = page.next_cursor;
            debug!(
                source = source.name(),
                page = pages_fetched,
                items = page.items.len(),
                watermark = %next,
                "Fetched activity page"
            );

            if page.items.is_empty() {
                exhausted = true;
                continue;
            }
            buffer.extend(page.items);

            if requested.advances_to(next) {
                cursor = Some(next);
            } else {
                exhausted = true;
            }
        }
    })
}

/// Drain the whole feed into memory
///
/// # Errors
///
/// Returns the first `ProviderError` raised while fetching a page.
pub async fn collect_activities<S>(source: &S, config: StreamConfig) -> ProviderResult<Vec<Value>>
where
    S: SourceClient + ?Sized,
{
    create_activity_stream(source, config).try_collect().await
}

/// Extension trait for creating activity streams from sources
pub trait ActivityStreamExt {
    /// Stream every raw record in the source feed
    fn activities_stream(&self, config: StreamConfig) -> RawActivityStream<'_>;
}

impl<T: SourceClient + ?Sized> ActivityStreamExt for T {
    fn activities_stream(&self, config: StreamConfig) -> RawActivityStream<'_> {
        create_activity_stream(self, config)
    }
}
