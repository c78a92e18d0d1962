//! The migration engine.
//!
//! `Migrator` ties a migration source, a connection, and the ledger
//! together. A run moves through `Idle -> Planning -> Applying` and ends in
//! `Completed` or `Failed`. Each unit runs in its own transaction together
//! with its ledger row, so a failing unit leaves no trace while earlier units
//! stay committed.

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::Ledger;
use crate::lock::{self, RunLock};
use crate::plan::{build_plan, Direction, Plan, PlanOptions, PlanStep};
use chrono::NaiveDateTime;
use keel_core::{is_blank_script, Config, MigrationSource, VersionIdentifier};
use keel_db::Database;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Engine settings.
#[derive(Debug, Clone, Copy)]
pub struct MigratorOptions {
    /// Reject plans when the ledger holds versions no unit provides.
    pub check_orphans: bool,
}

impl Default for MigratorOptions {
    fn default() -> Self {
        Self {
            check_orphans: true,
        }
    }
}

impl MigratorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            check_orphans: config.check_orphans,
        }
    }
}

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Planning,
    Applying,
    Completed,
    Failed,
}

impl RunPhase {
    /// Whether the run has reached a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }
}

/// Outcome of `run` or `apply`.
///
/// `applied` lists units that committed, in execution order (reverted units
/// for a down run). `failed_at` names the unit whose script or ledger write
/// failed; it is `None` when the run failed before touching any unit or was
/// cancelled between units.
#[derive(Debug)]
pub struct RunResult {
    pub direction: Direction,
    pub phase: RunPhase,
    pub applied: Vec<VersionIdentifier>,
    pub failed_at: Option<VersionIdentifier>,
    pub error: Option<MigrateError>,
    pub elapsed: Duration,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Tracks one run's phase and progress.
struct RunProgress {
    direction: Direction,
    phase: RunPhase,
    applied: Vec<VersionIdentifier>,
    started: Instant,
}

impl RunProgress {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            phase: RunPhase::Idle,
            applied: Vec::new(),
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: RunPhase) {
        debug_assert!(!self.phase.is_terminal(), "run already finished");
        log::debug!("Migration run {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    fn finish(
        mut self,
        failed_at: Option<VersionIdentifier>,
        error: Option<MigrateError>,
    ) -> RunResult {
        let phase = if error.is_some() {
            RunPhase::Failed
        } else {
            RunPhase::Completed
        };
        self.advance(phase);
        RunResult {
            direction: self.direction,
            phase,
            applied: self.applied,
            failed_at,
            error,
            elapsed: self.started.elapsed(),
        }
    }

    fn complete(self) -> RunResult {
        self.finish(None, None)
    }

    fn abort(self, error: MigrateError) -> RunResult {
        self.finish(None, Some(error))
    }

    fn fail_at(self, version: VersionIdentifier, error: MigrateError) -> RunResult {
        self.finish(Some(version), Some(error))
    }
}

/// Ledger state of one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum UnitState {
    Applied { applied_at: NaiveDateTime },
    Pending,
    /// Recorded in the ledger but provided by no unit.
    Orphaned { applied_at: NaiveDateTime },
}

/// One row of `Migrator::status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub version: VersionIdentifier,
    pub name: String,
    pub reversible: bool,
    #[serde(flatten)]
    pub state: UnitState,
}

/// Applies and reverts migrations against one database.
pub struct Migrator {
    db: Arc<dyn Database>,
    source: Box<dyn MigrationSource>,
    ledger: Ledger,
    options: MigratorOptions,
    cancel: Arc<AtomicBool>,
}

impl Migrator {
    /// Create a migrator. The source must target the connection's engine.
    pub fn new(db: Arc<dyn Database>, source: Box<dyn MigrationSource>) -> MigrateResult<Self> {
        if source.engine() != db.engine() {
            return Err(MigrateError::EngineMismatch {
                source_engine: source.engine(),
                database_engine: db.engine(),
            });
        }
        Ok(Self {
            ledger: Ledger::new(db.clone()),
            db,
            source,
            options: MigratorOptions::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_options(mut self, options: MigratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Share an externally owned cancellation flag (e.g. set by a signal handler).
    ///
    /// The migrator clears the flag whenever a run ends, so one request
    /// cancels at most one run.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// The flag checked between units. Setting it stops the run before the next unit.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Request cancellation of the current run.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Clear any pending cancellation once a run is terminal.
    fn end_run(&self, result: RunResult) -> RunResult {
        self.cancel.store(false, Ordering::SeqCst);
        result
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Compute the steps a run would execute. Does not modify the database.
    pub async fn plan(
        &self,
        direction: Direction,
        target: Option<&VersionIdentifier>,
    ) -> MigrateResult<Plan> {
        let units = self.source.discover()?;
        let applied = self.ledger.applied_versions().await?;
        build_plan(
            direction,
            &units,
            &applied,
            PlanOptions {
                target,
                check_orphans: self.options.check_orphans,
            },
        )
    }

    /// Plan and execute under the run lock.
    pub async fn run(&self, direction: Direction, target: Option<&VersionIdentifier>) -> RunResult {
        let result = self.run_locked(direction, target).await;
        self.end_run(result)
    }

    async fn run_locked(
        &self,
        direction: Direction,
        target: Option<&VersionIdentifier>,
    ) -> RunResult {
        let mut progress = RunProgress::new(direction);
        let run_lock = match RunLock::acquire(self.db.clone()).await {
            Ok(l) => l,
            Err(e) => return progress.abort(e),
        };

        progress.advance(RunPhase::Planning);
        let result = match self.plan(direction, target).await {
            Ok(plan) => self.execute(&plan, progress).await,
            Err(e) => progress.abort(e),
        };

        run_lock.release().await;
        result
    }

    /// Execute a previously computed plan under the run lock.
    ///
    /// The plan is checked against the current ledger first; if another run
    /// changed it in between, nothing executes and the result carries
    /// `StalePlan`.
    pub async fn apply(&self, plan: &Plan) -> RunResult {
        let result = self.apply_locked(plan).await;
        self.end_run(result)
    }

    async fn apply_locked(&self, plan: &Plan) -> RunResult {
        let mut progress = RunProgress::new(plan.direction);
        let run_lock = match RunLock::acquire(self.db.clone()).await {
            Ok(l) => l,
            Err(e) => return progress.abort(e),
        };

        progress.advance(RunPhase::Planning);
        let result = match self.verify_plan(plan).await {
            Ok(()) => self.execute(plan, progress).await,
            Err(e) => progress.abort(e),
        };

        run_lock.release().await;
        result
    }

    /// Every discovered or recorded version with its ledger state, ascending.
    pub async fn status(&self) -> MigrateResult<Vec<MigrationStatus>> {
        let units = self.source.discover()?;
        let entries = self.ledger.entries().await?;

        let mut applied_at: BTreeMap<VersionIdentifier, NaiveDateTime> = entries
            .into_iter()
            .map(|e| (e.version, e.applied_at))
            .collect();

        let mut rows: Vec<MigrationStatus> = units
            .iter()
            .map(|unit| {
                let state = match applied_at.remove(unit.id()) {
                    Some(at) => UnitState::Applied { applied_at: at },
                    None => UnitState::Pending,
                };
                MigrationStatus {
                    version: unit.id().clone(),
                    name: unit.name().to_string(),
                    reversible: unit.is_reversible(),
                    state,
                }
            })
            .collect();

        rows.extend(applied_at.into_iter().map(|(version, at)| MigrationStatus {
            version,
            name: String::new(),
            reversible: false,
            state: UnitState::Orphaned { applied_at: at },
        }));
        rows.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(rows)
    }

    /// Clear a lock left behind by a crashed run.
    pub async fn force_unlock(&self) -> MigrateResult<bool> {
        lock::force_unlock(self.db.as_ref()).await
    }

    async fn verify_plan(&self, plan: &Plan) -> MigrateResult<()> {
        let applied = self.ledger.applied_versions().await?;
        for version in plan.versions() {
            let recorded = applied.contains(version);
            let reason = match (plan.direction, recorded) {
                (Direction::Up, true) => "already applied",
                (Direction::Down, false) => "no longer applied",
                _ => continue,
            };
            return Err(MigrateError::StalePlan {
                version: version.clone(),
                reason: reason.to_string(),
            });
        }
        Ok(())
    }

    async fn execute(&self, plan: &Plan, mut progress: RunProgress) -> RunResult {
        progress.advance(RunPhase::Applying);
        if plan.is_empty() {
            log::info!("No migrations to {}", plan.direction);
            return progress.complete();
        }

        let mut ledger_ready = match self.ledger.is_initialized().await {
            Ok(ready) => ready,
            Err(e) => return progress.abort(e),
        };

        for step in &plan.steps {
            if self.cancel.load(Ordering::SeqCst) {
                log::warn!("Cancellation requested, stopping before {}", step.version);
                return progress.abort(MigrateError::Cancelled {
                    next: step.version.clone(),
                });
            }

            let started = Instant::now();
            if let Err(e) = self.execute_step(plan.direction, step, !ledger_ready).await {
                log::error!("Migration {} failed: {}", step.version, e);
                return progress.fail_at(step.version.clone(), e);
            }
            ledger_ready = true;

            log::info!(
                "{} {} ({:.2}s)",
                match plan.direction {
                    Direction::Up => "Applied",
                    Direction::Down => "Reverted",
                },
                step.version,
                started.elapsed().as_secs_f64()
            );
            progress.applied.push(step.version.clone());
        }

        progress.complete()
    }

    /// Run one step inside its own transaction.
    async fn execute_step(
        &self,
        direction: Direction,
        step: &PlanStep,
        bootstrap: bool,
    ) -> MigrateResult<()> {
        self.db
            .begin()
            .await
            .map_err(|source| MigrateError::Transaction {
                version: step.version.clone(),
                source,
            })?;

        if let Err(e) = self.execute_step_body(direction, step, bootstrap).await {
            if let Err(rollback_err) = self.db.rollback().await {
                log::warn!("Rollback of {} failed: {}", step.version, rollback_err);
            }
            return Err(e);
        }

        if let Err(source) = self.db.commit().await {
            if let Err(rollback_err) = self.db.rollback().await {
                log::warn!("Rollback of {} failed: {}", step.version, rollback_err);
            }
            return Err(MigrateError::Transaction {
                version: step.version.clone(),
                source,
            });
        }
        Ok(())
    }

    async fn execute_step_body(
        &self,
        direction: Direction,
        step: &PlanStep,
        bootstrap: bool,
    ) -> MigrateResult<()> {
        if bootstrap {
            self.ledger.ensure_initialized().await?;
        }

        if is_blank_script(&step.sql) {
            log::warn!("Migration {} has an empty {} script", step.version, direction);
        } else {
            log::debug!("Executing {} script of {}", direction, step.version);
            self.db
                .execute_batch(&step.sql)
                .await
                .map_err(|source| MigrateError::ScriptExecution {
                    version: step.version.clone(),
                    source,
                })?;
        }

        match direction {
            Direction::Up => self.ledger.record(&step.version).await,
            Direction::Down => self.ledger.forget(&step.version).await,
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
