//! Contract Tests - Reconciliation Invariant Protection
//!
//! This file aggregates all contract test modules.
//! Contract tests verify invariants that MUST NEVER BREAK.

// Contract test modules
mod contracts {
    // Idempotence and obsolete-object removal
    mod reconciliation {
        include!("reconciliation_contracts.rs");
    }

    // Synthetic restriction identifiers
    mod restriction_ids {
        include!("restriction_id_contracts.rs");
    }

    // Property and restriction rules
    mod validation_rules {
        include!("validation_rule_contracts.rs");
    }
}
