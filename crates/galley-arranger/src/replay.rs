//! Delivery of an arrangement through a checked event state machine.

use galley_core::config_id::ConfigId;
use galley_core::feature_spec::FeatureSpec;
use galley_core::location::Fpid;
use galley_util::errors::{GalleyError, GalleyResult};

use crate::arrange::{ArrangedFeature, ConfigArrangement, Segment};
use crate::handler::ProvisionedConfigHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    NotStarted,
    BranchOpen,
    BatchOpen,
    BranchClosed,
    Done,
}

/// Forwards events to a handler, refusing any that are out of place.
///
/// Feature-pack and spec events are sent only when they change within a
/// branch.
pub struct Replay<'h> {
    config: ConfigId,
    handler: &'h mut dyn ProvisionedConfigHandler,
    state: ReplayState,
    feature_pack: Option<Fpid>,
    spec: Option<String>,
}

impl<'h> Replay<'h> {
    pub fn new(config: &ConfigId, handler: &'h mut dyn ProvisionedConfigHandler) -> Self {
        Self {
            config: config.clone(),
            handler,
            state: ReplayState::NotStarted,
            feature_pack: None,
            spec: None,
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    fn advance(&mut self, event: &str, from: &[ReplayState], to: ReplayState) -> GalleyResult<()> {
        if !from.contains(&self.state) {
            return Err(GalleyError::Arrangement {
                config: self.config.to_string(),
                message: format!("{event} is not allowed in state {:?}", self.state),
            });
        }
        self.state = to;
        Ok(())
    }

    fn require_open(&self, event: &str) -> GalleyResult<()> {
        match self.state {
            ReplayState::BranchOpen | ReplayState::BatchOpen => Ok(()),
            state => Err(GalleyError::Arrangement {
                config: self.config.to_string(),
                message: format!("{event} outside an open branch (state {state:?})"),
            }),
        }
    }

    pub fn start_branch(&mut self) -> GalleyResult<()> {
        self.advance(
            "branch start",
            &[ReplayState::NotStarted, ReplayState::BranchClosed],
            ReplayState::BranchOpen,
        )?;
        self.feature_pack = None;
        self.spec = None;
        self.handler.start_branch()
    }

    pub fn end_branch(&mut self) -> GalleyResult<()> {
        self.advance("branch end", &[ReplayState::BranchOpen], ReplayState::BranchClosed)?;
        self.handler.end_branch()
    }

    pub fn start_batch(&mut self) -> GalleyResult<()> {
        self.advance("batch start", &[ReplayState::BranchOpen], ReplayState::BatchOpen)?;
        self.handler.start_batch()
    }

    pub fn end_batch(&mut self) -> GalleyResult<()> {
        self.advance("batch end", &[ReplayState::BatchOpen], ReplayState::BranchOpen)?;
        self.handler.end_batch()
    }

    pub fn feature_pack(&mut self, fpid: &Fpid) -> GalleyResult<()> {
        self.require_open("feature-pack event")?;
        if self.feature_pack.as_ref() != Some(fpid) {
            self.feature_pack = Some(fpid.clone());
            self.spec = None;
            self.handler.next_feature_pack(fpid)?;
        }
        Ok(())
    }

    pub fn spec(&mut self, spec: &FeatureSpec) -> GalleyResult<()> {
        self.require_open("spec event")?;
        if self.spec.as_deref() != Some(spec.name.as_str()) {
            self.spec = Some(spec.name.clone());
            self.handler.next_spec(spec)?;
        }
        Ok(())
    }

    pub fn feature(&mut self, feature: &ArrangedFeature) -> GalleyResult<()> {
        self.require_open("feature event")?;
        self.feature_pack(&feature.fpid)?;
        self.spec(&feature.spec)?;
        self.handler.next_feature(feature)
    }

    pub fn done(&mut self) -> GalleyResult<()> {
        self.advance(
            "done",
            &[ReplayState::NotStarted, ReplayState::BranchClosed],
            ReplayState::Done,
        )?;
        self.handler.done()
    }
}

/// Deliver a whole arrangement, framed by `prepare` and `done`.
pub fn replay(
    arrangement: &ConfigArrangement,
    handler: &mut dyn ProvisionedConfigHandler,
) -> GalleyResult<()> {
    handler.prepare(&arrangement.config, &arrangement.props)?;
    let mut replay = Replay::new(&arrangement.config, handler);
    for branch in &arrangement.branches {
        replay.start_branch()?;
        if branch.batch {
            replay.start_batch()?;
        }
        for segment in &branch.segments {
            match segment {
                Segment::Feature(idx) => replay.feature(arrangement.feature(*idx))?,
                Segment::Batch(members) => {
                    replay.start_batch()?;
                    for &idx in members {
                        replay.feature(arrangement.feature(idx))?;
                    }
                    replay.end_batch()?;
                }
            }
        }
        if branch.batch {
            replay.end_batch()?;
        }
        replay.end_branch()?;
    }
    replay.done()
}

/// Deliver several arrangements to one handler, one after the other.
pub fn replay_all(
    arrangements: &[ConfigArrangement],
    handler: &mut dyn ProvisionedConfigHandler,
) -> GalleyResult<()> {
    for arrangement in arrangements {
        replay(arrangement, handler)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ArrangeEvent, EventRecorder};

    fn id() -> ConfigId {
        ConfigId::parse("standalone/main").unwrap()
    }

    #[test]
    fn events_need_an_open_branch() {
        let mut recorder = EventRecorder::new();
        let mut replay = Replay::new(&id(), &mut recorder);
        let err = replay.spec(&FeatureSpec::new("socket")).unwrap_err();
        assert!(err.to_string().contains("outside an open branch"));
        assert_eq!(replay.state(), ReplayState::NotStarted);
    }

    #[test]
    fn batches_only_inside_branches() {
        let mut recorder = EventRecorder::new();
        let mut replay = Replay::new(&id(), &mut recorder);
        assert!(replay.start_batch().is_err());
        replay.start_branch().unwrap();
        assert!(replay.start_branch().is_err());
        replay.start_batch().unwrap();
        assert!(replay.end_branch().is_err());
        replay.end_batch().unwrap();
        replay.end_branch().unwrap();
        replay.done().unwrap();
        assert!(replay.start_branch().is_err());
        assert_eq!(replay.state(), ReplayState::Done);
    }

    #[test]
    fn spec_events_only_on_change() {
        let mut recorder = EventRecorder::new();
        {
            let mut replay = Replay::new(&id(), &mut recorder);
            replay.start_branch().unwrap();
            replay.spec(&FeatureSpec::new("socket")).unwrap();
            replay.spec(&FeatureSpec::new("socket")).unwrap();
            replay.end_branch().unwrap();
        }
        assert_eq!(
            recorder.events(),
            &[
                ArrangeEvent::BranchStart,
                ArrangeEvent::Spec("socket".to_string()),
                ArrangeEvent::BranchEnd,
            ]
        );
    }
}
