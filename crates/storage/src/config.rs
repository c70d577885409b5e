#![forbid(unsafe_code)]

use crate::store::MAX_IN_QUERY_IDS;

pub const DEFAULT_GENERIC_TTL_MINUTES: i64 = 30;
pub const DEFAULT_WORKSPACE_TTL_MINUTES: i64 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Ttl of the generic cache, which also backs per-document entries.
    pub generic_ttl_minutes: i64,
    /// Ttl of the cached workspace document.
    pub workspace_ttl_minutes: i64,
    /// Ids per batched lookup; clamped to `1..=MAX_IN_QUERY_IDS`.
    pub batch_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            generic_ttl_minutes: DEFAULT_GENERIC_TTL_MINUTES,
            workspace_ttl_minutes: DEFAULT_WORKSPACE_TTL_MINUTES,
            batch_limit: MAX_IN_QUERY_IDS,
        }
    }
}
