//! The callback contract for consumers of arranged configs.

use std::collections::BTreeMap;
use std::fmt;

use galley_core::config_id::ConfigId;
use galley_core::feature_spec::FeatureSpec;
use galley_core::location::Fpid;
use galley_util::errors::GalleyResult;

use crate::arrange::ArrangedFeature;
use crate::feature_id::ResolvedFeatureId;

/// Receives one config's events in delivery order.
///
/// Everything between `start_batch` and `end_batch` belongs to one batch and
/// must be applied as a unit. A returned error aborts the delivery.
pub trait ProvisionedConfigHandler {
    fn prepare(&mut self, _config: &ConfigId, _props: &BTreeMap<String, String>) -> GalleyResult<()> {
        Ok(())
    }

    fn next_feature_pack(&mut self, _fpid: &Fpid) -> GalleyResult<()> {
        Ok(())
    }

    fn next_spec(&mut self, _spec: &FeatureSpec) -> GalleyResult<()> {
        Ok(())
    }

    fn next_feature(&mut self, _feature: &ArrangedFeature) -> GalleyResult<()> {
        Ok(())
    }

    fn start_branch(&mut self) -> GalleyResult<()> {
        Ok(())
    }

    fn end_branch(&mut self) -> GalleyResult<()> {
        Ok(())
    }

    fn start_batch(&mut self) -> GalleyResult<()> {
        Ok(())
    }

    fn end_batch(&mut self) -> GalleyResult<()> {
        Ok(())
    }

    fn done(&mut self) -> GalleyResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrangeEvent {
    Prepare(ConfigId),
    FeaturePack(Fpid),
    Spec(String),
    Feature(ResolvedFeatureId),
    BranchStart,
    BranchEnd,
    BatchStart,
    BatchEnd,
    Done,
}

impl fmt::Display for ArrangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepare(config) => write!(f, "config {config}"),
            Self::FeaturePack(fpid) => write!(f, "feature-pack {fpid}"),
            Self::Spec(name) => write!(f, "spec {name}"),
            Self::Feature(id) => write!(f, "feature {id}"),
            Self::BranchStart => f.write_str("branch"),
            Self::BranchEnd => f.write_str("end branch"),
            Self::BatchStart => f.write_str("batch"),
            Self::BatchEnd => f.write_str("end batch"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// A handler that keeps every event it receives.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Vec<ArrangeEvent>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ArrangeEvent] {
        &self.events
    }

    /// Recorded features, in delivery order.
    pub fn feature_ids(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ArrangeEvent::Feature(id) => Some(id.to_string()),
                _ => None,
            })
            .collect()
    }

    /// One event per line, indented by branch and batch depth.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut depth = 0usize;
        for event in &self.events {
            if matches!(event, ArrangeEvent::BranchEnd | ArrangeEvent::BatchEnd) {
                depth = depth.saturating_sub(1);
            }
            out.push_str(&format!("{}{event}\n", "  ".repeat(depth)));
            if matches!(event, ArrangeEvent::BranchStart | ArrangeEvent::BatchStart) {
                depth += 1;
            }
        }
        out
    }
}

impl ProvisionedConfigHandler for EventRecorder {
    fn prepare(&mut self, config: &ConfigId, _props: &BTreeMap<String, String>) -> GalleyResult<()> {
        self.events.push(ArrangeEvent::Prepare(config.clone()));
        Ok(())
    }

    fn next_feature_pack(&mut self, fpid: &Fpid) -> GalleyResult<()> {
        self.events.push(ArrangeEvent::FeaturePack(fpid.clone()));
        Ok(())
    }

    fn next_spec(&mut self, spec: &FeatureSpec) -> GalleyResult<()> {
        self.events.push(ArrangeEvent::Spec(spec.name.clone()));
        Ok(())
    }

    fn next_feature(&mut self, feature: &ArrangedFeature) -> GalleyResult<()> {
        self.events.push(ArrangeEvent::Feature(feature.id.clone()));
        Ok(())
    }

    fn start_branch(&mut self) -> GalleyResult<()> {
        self.events.push(ArrangeEvent::BranchStart);
        Ok(())
    }

    fn end_branch(&mut self) -> GalleyResult<()> {
        self.events.push(ArrangeEvent::BranchEnd);
        Ok(())
    }

    fn start_batch(&mut self) -> GalleyResult<()> {
        self.events.push(ArrangeEvent::BatchStart);
        Ok(())
    }

    fn end_batch(&mut self) -> GalleyResult<()> {
        self.events.push(ArrangeEvent::BatchEnd);
        Ok(())
    }

    fn done(&mut self) -> GalleyResult<()> {
        self.events.push(ArrangeEvent::Done);
        Ok(())
    }
}
