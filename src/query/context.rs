//! Query execution context (spec §6, §9): an explicit value threaded
//! through planning and execution instead of values pulled from an
//! ambient injector. Replaces the teacher's `Parameter`/widget-typed
//! configuration surface (`core/parameter.rs`) — there is no UI to
//! describe parameters for, so this is a plain typed struct instead.

use std::time::Duration;
use uuid::Uuid;

/// Process-wide tunables (spec §5 "Concurrency & resource model").
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_parallelism: usize,
    pub max_queue_depth: usize,
    pub default_timeout: Duration,
    pub max_rows_in_memory: usize,
    pub max_bytes_in_memory: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallelism: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            max_queue_depth: 2048,
            default_timeout: Duration::from_secs(300),
            max_rows_in_memory: 1_000_000,
            max_bytes_in_memory: 256 * 1024 * 1024,
        }
    }
}

/// Per-query context: identity, deadline, and override knobs (spec §6
/// "context"). Passed explicitly to every stage of execution rather than
/// looked up from thread-local or global state.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub query_id: String,
    pub timeout: Duration,
    pub priority: i32,
    pub bypass_cache: bool,
}

impl QueryContext {
    pub fn new() -> Self {
        Self { query_id: Uuid::new_v4().to_string(), timeout: Duration::from_secs(300), priority: 0, bypass_cache: false }
    }

    pub fn with_id(query_id: impl Into<String>) -> Self {
        Self { query_id: query_id.into(), ..Self::new() }
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_contexts_get_distinct_ids() {
        let a = QueryContext::new();
        let b = QueryContext::new();
        assert_ne!(a.query_id, b.query_id);
    }
}
