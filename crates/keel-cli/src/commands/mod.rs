//! CLI command implementations

pub(crate) mod common;
pub(crate) mod migration;
pub(crate) mod setup;
