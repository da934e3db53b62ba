//! # atomkit testkit
//!
//! Testing utilities for atomkit.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic parties and a ledger harness with
//!   sequential nonces and a fixed clock
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use atomkit_testkit::fixtures::{multi_party_fixtures, TestLedger};
//!
//! let ledger = TestLedger::new();
//! let parties = multi_party_fixtures(2);
//! let gold = ledger.issue_fixed(&parties[0], "GOLD", 100).unwrap();
//! ledger.transfer(&parties[0].address, &parties[1].address, &gold, 40).unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use atomkit_testkit::generators::TransferPlan;
//!
//! proptest! {
//!     #[test]
//!     fn plan_is_replayable(plan: TransferPlan) {
//!         prop_assert!(plan.total_deposited() > 0);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{amount, multi_party_fixtures, signed, tokens, TestFixture, TestLedger, TEST_UNIVERSE};
pub use generators::TransferPlan;
