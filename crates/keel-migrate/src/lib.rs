//! keel-migrate - Migration engine for Keel
//!
//! Plans and executes migration units against a `keel_db::Database`,
//! recording every applied version in the `migration_history` ledger.
//! Each unit runs in its own transaction and concurrent runs are
//! serialized through the `migration_lock` table.

pub mod engine;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod plan;

pub use engine::{MigrationStatus, Migrator, MigratorOptions, RunPhase, RunResult, UnitState};
pub use error::{MigrateError, MigrateResult};
pub use ledger::{Ledger, LedgerEntry};
pub use lock::{RunLock, LOCK_TABLE};
pub use plan::{build_plan, Direction, Plan, PlanOptions, PlanStep};
