//! Paginated collection envelope used by every list endpoint.

use serde::{Deserialize, Serialize};

/// `{count, next, previous, results}` page of `T`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}
