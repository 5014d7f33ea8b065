//! Reference runtime backed by JSON scene documents.
//!
//! A scene document declares artboards, their timed animations, and their state
//! machines:
//!
//! ```json
//! {
//!   "artboards": [
//!     {
//!       "name": "MyArtboard",
//!       "width": 500, "height": 500,
//!       "animations": [{ "name": "spin", "duration": 1000, "loop": "loop" }],
//!       "stateMachines": [{ "name": "sm", "inputs": [{ "name": "go", "type": 58 }] }]
//!     }
//!   ],
//!   "defaultArtboard": "MyArtboard"
//! }
//! ```
//!
//! Durations are milliseconds. Input `type` carries the raw runtime tag and is
//! validated by the contents model, not here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::runtime::{
    AdvanceReport, ArtboardInstance, LoopEvent, LoopType, RawArtboard, RawInput,
    RawStateMachine, Runtime, RuntimeFile,
};
use crate::{Result, RiveError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    pub artboards: Vec<SceneArtboard>,
    #[serde(default)]
    pub default_artboard: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneArtboard {
    pub name: String,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub animations: Vec<SceneAnimation>,
    #[serde(default)]
    pub state_machines: Vec<SceneStateMachine>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneAnimation {
    pub name: String,
    /// Milliseconds
    pub duration: u32,
    #[serde(rename = "loop", default)]
    pub loop_type: LoopType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneStateMachine {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<SceneInput>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneInput {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: u16,
}

impl SceneDocument {
    /// Validate basic invariants (non-zero durations, unique artboard names, a
    /// default artboard that exists).
    pub fn validate_basic(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for artboard in &self.artboards {
            if !seen.insert(artboard.name.as_str()) {
                return Err(format!("duplicate artboard '{}'", artboard.name));
            }
            for anim in &artboard.animations {
                if anim.duration == 0 {
                    return Err(format!(
                        "animation '{}' in artboard '{}' must have duration > 0 ms",
                        anim.name, artboard.name
                    ));
                }
            }
        }
        if let Some(default) = &self.default_artboard {
            if !seen.contains(default.as_str()) {
                return Err(format!("default artboard '{default}' is not declared"));
            }
        }
        Ok(())
    }

    fn artboard(&self, name: &str) -> Option<&SceneArtboard> {
        self.artboards.iter().find(|a| a.name == name)
    }
}

/// Runtime that understands [`SceneDocument`] JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct SceneRuntime;

impl SceneRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl Runtime for SceneRuntime {
    fn name(&self) -> &str {
        "scene"
    }

    fn parse(&self, bytes: &[u8]) -> Result<Box<dyn RuntimeFile>> {
        let doc: SceneDocument = serde_json::from_slice(bytes)?;
        doc.validate_basic()
            .map_err(|reason| RiveError::Parse { reason })?;
        Ok(Box::new(SceneFile { doc }))
    }
}

struct SceneFile {
    doc: SceneDocument,
}

impl RuntimeFile for SceneFile {
    fn artboards(&self) -> Vec<RawArtboard> {
        self.doc
            .artboards
            .iter()
            .map(|ab| RawArtboard {
                name: ab.name.clone(),
                animations: ab.animations.iter().map(|a| a.name.clone()).collect(),
                state_machines: ab
                    .state_machines
                    .iter()
                    .map(|sm| RawStateMachine {
                        name: sm.name.clone(),
                        inputs: sm
                            .inputs
                            .iter()
                            .map(|i| RawInput {
                                name: i.name.clone(),
                                type_tag: i.type_tag,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn default_artboard(&self) -> Option<String> {
        self.doc.default_artboard.clone()
    }

    fn instantiate(
        &self,
        artboard: &str,
        animations: &[String],
    ) -> Result<Box<dyn ArtboardInstance>> {
        let descriptor = self
            .doc
            .artboard(artboard)
            .ok_or_else(|| RiveError::ArtboardNotFound {
                name: artboard.to_string(),
            })?;

        let selected: Vec<&SceneAnimation> = if animations.is_empty() {
            descriptor.animations.iter().take(1).collect()
        } else {
            animations
                .iter()
                .map(|name| {
                    descriptor
                        .animations
                        .iter()
                        .find(|a| &a.name == name)
                        .ok_or_else(|| RiveError::AnimationNotFound {
                            artboard: artboard.to_string(),
                            name: name.clone(),
                        })
                })
                .collect::<Result<_>>()?
        };

        Ok(Box::new(SceneInstance {
            artboard: descriptor.name.clone(),
            clocks: selected.into_iter().map(Clock::new).collect(),
        }))
    }
}

/// Per-animation time keeping. `time` is unwrapped elapsed seconds since the start.
#[derive(Debug)]
struct Clock {
    name: String,
    duration: f64,
    loop_type: LoopType,
    time: f64,
}

impl Clock {
    fn new(anim: &SceneAnimation) -> Self {
        Self {
            name: anim.name.clone(),
            duration: anim.duration as f64 / 1000.0,
            loop_type: anim.loop_type,
            time: 0.0,
        }
    }

    fn is_finished(&self) -> bool {
        self.loop_type == LoopType::OneShot && self.time >= self.duration
    }

    /// Step forward, returning the offsets (relative to the old time) of every loop
    /// boundary crossed.
    fn step(&mut self, dt: f64) -> Vec<f64> {
        let old = self.time;
        if self.loop_type == LoopType::OneShot {
            self.time = (old + dt).min(self.duration);
            return Vec::new();
        }
        if self.duration <= 0.0 {
            return Vec::new();
        }
        let new = old + dt;
        self.time = new;
        let first = (old / self.duration).floor() as i64;
        let last = (new / self.duration).floor() as i64;
        (first + 1..=last)
            .map(|k| k as f64 * self.duration - old)
            .collect()
    }

    /// Position within the timeline, in seconds.
    fn position(&self) -> f64 {
        match self.loop_type {
            LoopType::OneShot => self.time.clamp(0.0, self.duration),
            LoopType::Loop => fmod(self.time, self.duration),
            LoopType::PingPong => ping_pong(self.time, self.duration),
        }
    }
}

fn fmod(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return 0.0;
    }
    let m = a % b;
    if (m < 0.0 && b > 0.0) || (m > 0.0 && b < 0.0) {
        m + b
    } else {
        m
    }
}

/// Reflect t into [0, span]: forward on even passes, backward on odd ones.
fn ping_pong(t: f64, span: f64) -> f64 {
    if span <= 0.0 {
        return 0.0;
    }
    let m = fmod(t, 2.0 * span);
    if m <= span {
        m
    } else {
        2.0 * span - m
    }
}

/// Live artboard from a scene document.
#[derive(Debug)]
pub struct SceneInstance {
    artboard: String,
    clocks: Vec<Clock>,
}

impl SceneInstance {
    /// Timeline position of `animation` in seconds. Ping-pong animations report the
    /// reflected position, so the value falls while running backward.
    pub fn position(&self, animation: &str) -> Option<f32> {
        self.clocks
            .iter()
            .find(|c| c.name == animation)
            .map(|c| c.position() as f32)
    }
}

impl ArtboardInstance for SceneInstance {
    fn artboard(&self) -> &str {
        &self.artboard
    }

    fn animations(&self) -> Vec<String> {
        self.clocks.iter().map(|c| c.name.clone()).collect()
    }

    fn advance(&mut self, elapsed_seconds: f32) -> AdvanceReport {
        if !elapsed_seconds.is_finite() || elapsed_seconds <= 0.0 {
            return AdvanceReport {
                loops: Vec::new(),
                finished: self.all_finished(),
            };
        }
        let dt = elapsed_seconds as f64;

        let mut crossings: Vec<(f64, usize)> = Vec::new();
        for (idx, clock) in self.clocks.iter_mut().enumerate() {
            crossings.extend(clock.step(dt).into_iter().map(|offset| (offset, idx)));
        }
        // Stable sort keeps declaration order for simultaneous boundaries.
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let loops = crossings
            .into_iter()
            .map(|(_, idx)| LoopEvent {
                animation: self.clocks[idx].name.clone(),
                loop_type: self.clocks[idx].loop_type,
            })
            .collect();

        AdvanceReport {
            loops,
            finished: self.all_finished(),
        }
    }

    fn reset(&mut self) {
        for clock in &mut self.clocks {
            clock.time = 0.0;
        }
    }
}

impl SceneInstance {
    fn all_finished(&self) -> bool {
        !self.clocks.is_empty() && self.clocks.iter().all(Clock::is_finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "artboards": [
            {
                "name": "Main",
                "width": 200, "height": 100,
                "animations": [
                    { "name": "spin", "duration": 1000, "loop": "loop" },
                    { "name": "bounce", "duration": 400, "loop": "pingPong" },
                    { "name": "intro", "duration": 500, "loop": "oneShot" }
                ],
                "stateMachines": [
                    { "name": "sm", "inputs": [{ "name": "go", "type": 58 }] }
                ]
            },
            { "name": "Empty" }
        ]
    }"#;

    fn instance(animations: &[&str]) -> Box<dyn ArtboardInstance> {
        let file = SceneRuntime::new().parse(DOC.as_bytes()).unwrap();
        let names: Vec<String> = animations.iter().map(|s| s.to_string()).collect();
        file.instantiate("Main", &names).unwrap()
    }

    #[test]
    fn descriptors_preserve_declaration_order() {
        let file = SceneRuntime::new().parse(DOC.as_bytes()).unwrap();
        let artboards = file.artboards();
        assert_eq!(artboards.len(), 2);
        assert_eq!(artboards[0].animations, vec!["spin", "bounce", "intro"]);
        assert_eq!(artboards[0].state_machines[0].inputs[0].type_tag, 58);
        assert!(artboards[1].animations.is_empty());
        assert_eq!(file.default_artboard(), None);
    }

    #[test]
    fn empty_selection_runs_first_animation() {
        let inst = instance(&[]);
        assert_eq!(inst.animations(), vec!["spin".to_string()]);
        assert_eq!(inst.artboard(), "Main");
    }

    #[test]
    fn large_step_reports_every_boundary_once() {
        let mut inst = instance(&["spin"]);
        assert!(inst.advance(0.5).loops.is_empty());
        let report = inst.advance(2.6);
        assert_eq!(report.loops.len(), 3);
        assert!(report.loops.iter().all(|l| l.loop_type == LoopType::Loop));
        assert!(!report.finished);
    }

    #[test]
    fn boundaries_are_ordered_by_crossing_time() {
        let mut inst = instance(&["spin", "bounce"]);
        let report = inst.advance(1.0);
        let names: Vec<&str> = report.loops.iter().map(|l| l.animation.as_str()).collect();
        assert_eq!(names, vec!["bounce", "bounce", "spin"]);
    }

    #[test]
    fn ping_pong_reflects_position() {
        let mut direct = SceneInstance {
            artboard: "Main".into(),
            clocks: vec![Clock {
                name: "bounce".into(),
                duration: 0.4,
                loop_type: LoopType::PingPong,
                time: 0.0,
            }],
        };
        direct.advance(0.5);
        let pos = direct.position("bounce").unwrap();
        assert!((pos - 0.3).abs() < 1e-5, "pos={pos}");
        direct.advance(0.2);
        let later = direct.position("bounce").unwrap();
        assert!(later < pos, "ping-pong should run backward: {later} >= {pos}");
    }

    #[test]
    fn one_shot_finishes_without_loop_events() {
        let mut inst = instance(&["intro"]);
        let report = inst.advance(0.3);
        assert!(!report.finished);
        let report = inst.advance(0.3);
        assert!(report.loops.is_empty());
        assert!(report.finished);

        inst.reset();
        assert!(!inst.advance(0.1).finished);
    }

    #[test]
    fn non_positive_steps_are_ignored() {
        let mut inst = instance(&["spin"]);
        assert!(inst.advance(0.0).loops.is_empty());
        assert!(inst.advance(-3.0).loops.is_empty());
        assert!(inst.advance(f32::NAN).loops.is_empty());
        assert_eq!(inst.advance(1.0).loops.len(), 1);
    }

    #[test]
    fn validation_rejects_bad_documents() {
        let zero = r#"{"artboards":[{"name":"A","animations":[{"name":"x","duration":0}]}]}"#;
        let dup = r#"{"artboards":[{"name":"A"},{"name":"A"}]}"#;
        let default = r#"{"artboards":[{"name":"A"}],"defaultArtboard":"B"}"#;
        for doc in [zero, dup, default, "not json"] {
            let err = SceneRuntime::new().parse(doc.as_bytes()).err().unwrap();
            assert!(err.is_parse_error(), "{doc}: {err}");
        }
    }

    #[test]
    fn unknown_selection_is_rejected() {
        let file = SceneRuntime::new().parse(DOC.as_bytes()).unwrap();
        assert!(matches!(
            file.instantiate("Main", &["nope".into()]).err(),
            Some(RiveError::AnimationNotFound { .. })
        ));
        assert!(matches!(
            file.instantiate("Ghost", &[]).err(),
            Some(RiveError::ArtboardNotFound { .. })
        ));
    }
}
