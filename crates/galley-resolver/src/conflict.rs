//! Version convergence reporting.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use galley_core::location::{Fpid, ProducerSpec};
use galley_util::errors::GalleyError;

/// Every missing version and conflicting build set found in one resolution pass.
#[derive(Debug, Default)]
pub struct ConvergenceReport {
    conflicts: BTreeMap<ProducerSpec, BTreeSet<Fpid>>,
    missing: BTreeSet<ProducerSpec>,
}

impl ConvergenceReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record two builds of one producer that cannot both be installed.
    pub fn conflict(&mut self, kept: Fpid, rejected: Fpid) {
        let builds = self.conflicts.entry(kept.producer_spec()).or_default();
        builds.insert(kept);
        builds.insert(rejected);
    }

    pub fn missing(&mut self, producer: ProducerSpec) {
        self.missing.insert(producer);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty() && self.missing.is_empty()
    }

    /// Conflicting producers with the builds that clashed.
    pub fn conflicts(&self) -> impl Iterator<Item = (&ProducerSpec, &BTreeSet<Fpid>)> {
        self.conflicts.iter()
    }

    pub fn missing_versions(&self) -> impl Iterator<Item = &ProducerSpec> {
        self.missing.iter()
    }

    pub fn into_error(self) -> GalleyError {
        GalleyError::VersionConvergence {
            missing: self.missing.iter().map(ToString::to_string).collect(),
            conflicts: self
                .conflicts()
                .map(|(_, fpids)| fpids.iter().map(ToString::to_string).collect())
                .collect(),
        }
    }
}

impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No version conflicts.");
        }
        for producer in &self.missing {
            writeln!(f, "  {producer}: no build given")?;
        }
        for (producer, fpids) in self.conflicts() {
            let builds: Vec<String> = fpids.iter().map(ToString::to_string).collect();
            writeln!(f, "  {producer}: {}", builds.join(", "))?;
        }
        Ok(())
    }
}
