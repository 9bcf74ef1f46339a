/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Total number of attempts, including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Backoff before the second attempt, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Growth factor applied to the backoff after each failed attempt. Values below 1.0 act as 1.0.
    pub backoff_multiplier: f64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 3_000,
            max_attempts: 4,
            retry_backoff_ms: 300,
            backoff_multiplier: 2.0,
        }
    }
}
