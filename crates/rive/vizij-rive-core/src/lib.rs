//! Vizij Rive Core (engine-agnostic)
//!
//! Control plane around an animation runtime: init-once runtime acquisition, a
//! read-only model of file contents, the play/pause/stop lifecycle of a playback
//! instance, and ordered event delivery to registered handlers. The runtime itself is
//! a collaborator behind the traits in [`runtime`]; [`scene::SceneRuntime`] is a
//! complete reference runtime reading JSON scene documents.

pub mod config;
pub mod contents;
pub mod error;
pub mod events;
pub mod fetch;
pub mod layout;
pub mod loader;
pub mod playback;
pub mod player;
pub mod runtime;
pub mod scene;
pub mod surface;

// Re-exports for consumers (adapters)
pub use config::{ConstructOptions, LoadOptions, ResetOptions, Source};
pub use contents::{Artboard, Contents, FileHandle, InputKind, StateMachine, StateMachineInput};
pub use error::{RiveError, CORRUPT_FILE_MESSAGE};
pub use events::{Event, EventDispatcher, EventKind, EventPayload, Handler};
pub use fetch::{Fetch, FileFetcher};
pub use layout::{Alignment, Bounds, Fit, Layout};
pub use loader::RuntimeLoader;
pub use playback::PlaybackState;
pub use player::{FrameLoop, Player};
pub use runtime::{
    AdvanceReport, ArtboardInstance, LoopEvent, LoopType, Runtime, RuntimeFile, RuntimeHandle,
};
pub use scene::{SceneDocument, SceneRuntime};
pub use surface::{Canvas, Surface};

/// Result type for this crate.
pub type Result<T> = core::result::Result<T, RiveError>;
