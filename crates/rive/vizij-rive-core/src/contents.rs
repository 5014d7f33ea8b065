//! Read-only view of a parsed file: artboards, animations, state machines, inputs.
//!
//! Ordering is taken verbatim from the runtime and never re-sorted. Input type tags
//! are validated while parsing so an unknown tag fails the load instead of surfacing
//! on first access.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::runtime::{ArtboardInstance, RawArtboard, Runtime, RuntimeFile};
use crate::{Result, RiveError};

/// Runtime tag for numeric inputs.
pub const INPUT_TAG_NUMBER: u16 = 56;
/// Runtime tag for trigger inputs.
pub const INPUT_TAG_TRIGGER: u16 = 58;
/// Runtime tag for boolean inputs.
pub const INPUT_TAG_BOOLEAN: u16 = 59;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    Number,
    Boolean,
    Trigger,
}

impl InputKind {
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            INPUT_TAG_NUMBER => Some(Self::Number),
            INPUT_TAG_BOOLEAN => Some(Self::Boolean),
            INPUT_TAG_TRIGGER => Some(Self::Trigger),
            _ => None,
        }
    }

    pub fn tag(self) -> u16 {
        match self {
            Self::Number => INPUT_TAG_NUMBER,
            Self::Boolean => INPUT_TAG_BOOLEAN,
            Self::Trigger => INPUT_TAG_TRIGGER,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachineInput {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InputKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachine {
    pub name: String,
    pub inputs: Vec<StateMachineInput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artboard {
    pub name: String,
    pub animations: Vec<String>,
    #[serde(rename = "stateMachines")]
    pub state_machines: Vec<StateMachine>,
}

/// Everything a file declares, in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contents {
    pub artboards: Vec<Artboard>,
}

impl Contents {
    pub fn artboard(&self, name: &str) -> Option<&Artboard> {
        self.artboards.iter().find(|a| a.name == name)
    }

    pub fn artboard_names(&self) -> Vec<&str> {
        self.artboards.iter().map(|a| a.name.as_str()).collect()
    }

    fn from_raw(raw: Vec<RawArtboard>) -> Result<Self> {
        let mut artboards = Vec::with_capacity(raw.len());
        for ab in raw {
            let mut state_machines = Vec::with_capacity(ab.state_machines.len());
            for sm in ab.state_machines {
                let mut inputs = Vec::with_capacity(sm.inputs.len());
                for input in sm.inputs {
                    let kind = InputKind::from_tag(input.type_tag).ok_or_else(|| {
                        RiveError::UnknownInputType {
                            state_machine: sm.name.clone(),
                            input: input.name.clone(),
                            tag: input.type_tag,
                        }
                    })?;
                    inputs.push(StateMachineInput {
                        name: input.name,
                        kind,
                    });
                }
                state_machines.push(StateMachine {
                    name: sm.name,
                    inputs,
                });
            }
            artboards.push(Artboard {
                name: ab.name,
                animations: ab.animations,
                state_machines,
            });
        }
        Ok(Self { artboards })
    }
}

/// A parsed file. Owned by exactly one player; dropping it releases the runtime file.
pub struct FileHandle {
    file: Box<dyn RuntimeFile>,
    contents: Contents,
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("artboards", &self.contents.artboard_names())
            .finish()
    }
}

impl FileHandle {
    /// Parse `bytes` with `runtime` and shape the result. Failures are returned
    /// unlogged; the player reports them for loads that are still current.
    pub fn parse(runtime: &dyn Runtime, bytes: &[u8]) -> Result<Self> {
        let file = runtime.parse(bytes)?;
        let contents = Contents::from_raw(file.artboards())?;
        Ok(Self { file, contents })
    }

    pub fn contents(&self) -> &Contents {
        &self.contents
    }

    /// The runtime's designated default artboard, else the first one declared.
    pub fn default_artboard(&self) -> Option<String> {
        self.file
            .default_artboard()
            .or_else(|| self.contents.artboards.first().map(|a| a.name.clone()))
    }

    /// Instantiate `artboard` (or the default) running `animations`.
    pub fn instantiate(
        &self,
        artboard: Option<&str>,
        animations: &[String],
    ) -> Result<Box<dyn ArtboardInstance>> {
        let name = match artboard {
            Some(name) => name.to_string(),
            None => self.default_artboard().ok_or(RiveError::NoDefaultArtboard)?,
        };
        let descriptor = self
            .contents
            .artboard(&name)
            .ok_or_else(|| RiveError::ArtboardNotFound { name: name.clone() })?;
        if let Some(missing) = animations
            .iter()
            .find(|a| !descriptor.animations.contains(*a))
        {
            return Err(RiveError::AnimationNotFound {
                artboard: name,
                name: missing.clone(),
            });
        }
        self.file.instantiate(&name, animations)
    }
}
