// ABOUTME: Watermark pagination types for the gym platform activity feed
// ABOUTME: A page carries raw records plus the "load after" watermark for the next request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque "load after" position returned by the source feed
///
/// A zero watermark means the source has nothing further to offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Watermark(i64);

impl Watermark {
    /// Wrap a raw watermark value
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw value for the query string
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Whether this watermark marks the end of the feed
    #[must_use]
    pub const fn is_exhausted(self) -> bool {
        self.0 == 0
    }

    /// Whether fetching after `next` would make progress relative to `self`
    #[must_use]
    pub const fn advances_to(self, next: Self) -> bool {
        !next.is_exhausted() && next.0 != self.0
    }
}

impl Display for Watermark {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page of raw activity records
#[derive(Debug, Clone, Default)]
pub struct ActivityPage {
    /// Raw, loosely-typed records as returned by the source
    pub items: Vec<Value>,
    /// Watermark to pass on the next request
    pub next_cursor: Watermark,
}

impl ActivityPage {
    /// Page with items and a follow-up watermark
    #[must_use]
    pub const fn new(items: Vec<Value>, next_cursor: Watermark) -> Self {
        Self { items, next_cursor }
    }

    /// Terminal empty page
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark_progress() {
        let start = Watermark::default();
        assert!(start.advances_to(Watermark::new(42)));
        assert!(!start.advances_to(Watermark::new(0)));
        assert!(!Watermark::new(42).advances_to(Watermark::new(42)));
        assert!(Watermark::new(42).advances_to(Watermark::new(17)));
    }
}
