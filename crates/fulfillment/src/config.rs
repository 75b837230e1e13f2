use std::time::Duration;

/// Default deadline of one unit of work.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by the shop services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on one operation, including waits for row locks.
    pub transaction_timeout: Duration,
}

impl EngineConfig {
    pub fn with_transaction_timeout(transaction_timeout: Duration) -> Self {
        Self {
            transaction_timeout,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }
}
