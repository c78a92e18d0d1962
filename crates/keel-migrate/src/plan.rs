//! Execution planning.
//!
//! A plan is computed from discovered units and the applied set alone; it
//! never touches the database. Every precondition that can fail (orphans,
//! missing down-scripts) is checked here so a rejected plan leaves the
//! database untouched.

use crate::error::{MigrateError, MigrateResult};
use keel_core::{MigrationUnit, VersionIdentifier};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Which script of each unit a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// One unit scheduled for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub version: VersionIdentifier,
    pub name: String,
    /// The up- or down-script, whichever `direction` selects.
    #[serde(skip)]
    pub sql: String,
}

/// An ordered list of steps. Up plans ascend by version, down plans descend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub direction: Direction,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn versions(&self) -> impl Iterator<Item = &VersionIdentifier> {
        self.steps.iter().map(|s| &s.version)
    }
}

/// Planning inputs besides units and the applied set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions<'a> {
    /// Up: apply pending units up to and including this version.
    /// Down: revert every applied unit at or above this version.
    /// Down without a target reverts only the most recent applied unit.
    pub target: Option<&'a VersionIdentifier>,
    /// Fail when the ledger holds versions no unit provides.
    pub check_orphans: bool,
}

/// Build a plan for `direction`.
pub fn build_plan(
    direction: Direction,
    units: &[MigrationUnit],
    applied: &BTreeSet<VersionIdentifier>,
    options: PlanOptions<'_>,
) -> MigrateResult<Plan> {
    let by_version: BTreeMap<&VersionIdentifier, &MigrationUnit> =
        units.iter().map(|u| (u.id(), u)).collect();

    let orphans = find_orphans(&by_version, applied);
    if !orphans.is_empty() {
        if options.check_orphans {
            return Err(MigrateError::OrphanedVersion { versions: orphans });
        }
        log::warn!(
            "Ledger holds {} version(s) with no matching migration",
            orphans.len()
        );
    }

    let steps = match direction {
        Direction::Up => plan_up(&by_version, applied, options.target),
        Direction::Down => plan_down(&by_version, applied, options.target)?,
    };

    log::debug!("Planned {} {} step(s)", steps.len(), direction);
    Ok(Plan { direction, steps })
}

/// Applied versions with no discovered unit, ascending.
pub fn find_orphans(
    by_version: &BTreeMap<&VersionIdentifier, &MigrationUnit>,
    applied: &BTreeSet<VersionIdentifier>,
) -> Vec<VersionIdentifier> {
    applied
        .iter()
        .filter(|v| !by_version.contains_key(v))
        .cloned()
        .collect()
}

fn plan_up(
    by_version: &BTreeMap<&VersionIdentifier, &MigrationUnit>,
    applied: &BTreeSet<VersionIdentifier>,
    target: Option<&VersionIdentifier>,
) -> Vec<PlanStep> {
    by_version
        .iter()
        .filter(|(v, _)| !applied.contains(**v))
        .filter(|(v, _)| target.map_or(true, |t| **v <= t))
        .map(|(v, unit)| PlanStep {
            version: (*v).clone(),
            name: unit.name().to_string(),
            sql: unit.up_script().to_string(),
        })
        .collect()
}

fn plan_down(
    by_version: &BTreeMap<&VersionIdentifier, &MigrationUnit>,
    applied: &BTreeSet<VersionIdentifier>,
    target: Option<&VersionIdentifier>,
) -> MigrateResult<Vec<PlanStep>> {
    let to_revert: Vec<&VersionIdentifier> = match target {
        Some(t) => applied.iter().rev().take_while(|v| *v >= t).collect(),
        None => applied.last().into_iter().collect(),
    };

    to_revert
        .into_iter()
        .map(|v| {
            let unit = by_version
                .get(v)
                .ok_or_else(|| MigrateError::OrphanedVersion {
                    versions: vec![v.clone()],
                })?;
            let down = unit
                .down_script()
                .ok_or_else(|| MigrateError::IrreversibleMigration { version: v.clone() })?;
            Ok(PlanStep {
                version: v.clone(),
                name: unit.name().to_string(),
                sql: down.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
