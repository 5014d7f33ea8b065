//! Collaborator contracts for the animation runtime.
//!
//! The runtime owns parsing, artboard instantiation, and frame evaluation. This crate only
//! drives it: parse bytes into a file, instantiate an artboard, advance it by elapsed time,
//! and read back which loop boundaries were crossed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Shared handle to the process-wide runtime.
pub type RuntimeHandle = Arc<dyn Runtime>;

/// Runtime module capability. Read-only after acquisition; shared by every player.
pub trait Runtime: Send + Sync + 'static {
    /// Human readable identifier, used in logs.
    fn name(&self) -> &str;

    /// Parse a byte buffer into a runtime file.
    fn parse(&self, bytes: &[u8]) -> Result<Box<dyn RuntimeFile>>;
}

/// A parsed file as seen by the runtime.
pub trait RuntimeFile: Send + Sync {
    /// Artboard descriptors in file order.
    fn artboards(&self) -> Vec<RawArtboard>;

    /// Artboard the file designates as default, if any.
    fn default_artboard(&self) -> Option<String> {
        None
    }

    /// Create a runtime-side instance of `artboard` running `animations`.
    /// An empty selection runs the artboard's first animation.
    fn instantiate(&self, artboard: &str, animations: &[String])
        -> Result<Box<dyn ArtboardInstance>>;
}

/// A live artboard instance owned by one player.
pub trait ArtboardInstance: Send {
    /// Name of the instantiated artboard.
    fn artboard(&self) -> &str;

    /// Names of the animations this instance runs.
    fn animations(&self) -> Vec<String>;

    /// Advance every running animation by `elapsed_seconds`.
    fn advance(&mut self, elapsed_seconds: f32) -> AdvanceReport;

    /// Rewind to the starting frame.
    fn reset(&mut self);
}

/// Artboard as reported by the runtime, before input tags are validated.
#[derive(Clone, Debug, PartialEq)]
pub struct RawArtboard {
    pub name: String,
    pub animations: Vec<String>,
    pub state_machines: Vec<RawStateMachine>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawStateMachine {
    pub name: String,
    pub inputs: Vec<RawInput>,
}

/// State machine input with the runtime's numeric type tag.
#[derive(Clone, Debug, PartialEq)]
pub struct RawInput {
    pub name: String,
    pub type_tag: u16,
}

/// How an animation behaves at the end of its timeline.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopType {
    #[default]
    OneShot,
    Loop,
    PingPong,
}

/// One loop boundary crossed by one animation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopEvent {
    pub animation: String,
    pub loop_type: LoopType,
}

/// Result of a single advance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdvanceReport {
    /// Boundaries crossed during this advance, in the order they were crossed.
    pub loops: Vec<LoopEvent>,
    /// True once every running animation has completed (one-shot only).
    pub finished: bool,
}
