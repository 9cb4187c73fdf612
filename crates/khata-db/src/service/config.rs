//! Engine behaviour switches.

use std::time::Duration;

/// Engine configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = EngineConfig::default()
///     .operation_timeout(Duration::from_secs(2))
///     .reconcile_ledger_on_delete(false);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound for one operation, including the wait for the writer gate.
    /// Default: 5 seconds
    pub operation_timeout: Duration,

    /// Whether deleting an invoice removes its ledger charge and replays the
    /// customer's balance.
    /// Default: true
    pub reconcile_ledger_on_delete: bool,

    /// Printed at the top of receipts.
    /// Default: "Khata"
    pub store_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            operation_timeout: Duration::from_secs(5),
            reconcile_ledger_on_delete: true,
            store_name: "Khata".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn reconcile_ledger_on_delete(mut self, enabled: bool) -> Self {
        self.reconcile_ledger_on_delete = enabled;
        self
    }

    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }
}
