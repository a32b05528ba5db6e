//! Session token ledger
//!
//! Tracks token usage per model role across a session and warns once usage
//! crosses 80% of the configured limit. The limit is advisory: runs are not
//! stopped when it is exceeded.

use lidco_llm::TokenUsage;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::warn;

/// Fraction of the limit at which the first warning is logged
const WARN_RATIO: f64 = 0.8;

/// Usage totals for reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    /// Tokens across all roles
    pub total: TokenUsage,
    /// Tokens per role
    pub by_role: BTreeMap<String, TokenUsage>,
    /// Configured limit (0 = unlimited)
    pub limit: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    snapshot: LedgerSnapshot,
    warned: bool,
    exceeded: bool,
}

/// Per-session token accounting
#[derive(Debug, Default)]
pub struct TokenLedger {
    state: Mutex<LedgerState>,
}

impl TokenLedger {
    /// Create a ledger; `limit == 0` disables warnings
    #[must_use]
    pub fn new(limit: u64) -> Self {
        let mut state = LedgerState::default();
        state.snapshot.limit = limit;
        Self {
            state: Mutex::new(state),
        }
    }

    /// Add usage for a role
    pub fn record(&self, role: &str, usage: &TokenUsage) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.snapshot.total.accumulate(usage);
        state
            .snapshot
            .by_role
            .entry(role.to_string())
            .or_default()
            .accumulate(usage);

        let limit = state.snapshot.limit;
        if limit == 0 {
            return;
        }
        let used = u64::from(state.snapshot.total.total_tokens);
        if used > limit && !state.exceeded {
            state.exceeded = true;
            warn!(used, limit, "Session token limit exceeded");
        } else if used as f64 >= limit as f64 * WARN_RATIO && !state.warned {
            state.warned = true;
            warn!(used, limit, "Session token usage above 80% of limit");
        }
    }

    /// Current totals
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_by_role() {
        let ledger = TokenLedger::new(0);
        ledger.record("coder", &TokenUsage::new(10, 5));
        ledger.record("coder", &TokenUsage::new(1, 1));
        ledger.record("routing", &TokenUsage::new(3, 1));

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.total.total_tokens, 21);
        assert_eq!(snapshot.by_role["coder"].total_tokens, 17);
        assert_eq!(snapshot.by_role["routing"].prompt_tokens, 3);
    }

    #[test]
    fn test_warning_flags() {
        let ledger = TokenLedger::new(100);
        ledger.record("coder", &TokenUsage::new(50, 0));
        assert!(!ledger.state.lock().unwrap().warned);
        ledger.record("coder", &TokenUsage::new(35, 0));
        assert!(ledger.state.lock().unwrap().warned);
        ledger.record("coder", &TokenUsage::new(20, 0));
        assert!(ledger.state.lock().unwrap().exceeded);
    }
}
