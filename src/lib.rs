//! # small-screen
//!
//! Retained-mode scene graph for TV-style screens driven by a remote or
//! arrow keys.
//!
//! Views form an arena-backed tree mirrored one-to-one onto a
//! [taffy](https://docs.rs/taffy) flexbox tree. Styles are immutable; numeric
//! properties may be [`AnimatedValue`]s that push changes straight into the
//! layout node they are bound to. Images, fonts and audio are reference
//! counted resources whose loads run as futures polled by a time-boxed work
//! queue. Directional focus is resolved through delegates carried by views.
//!
//! ## Architecture
//!
//! ```text
//! Window events -> FocusManager
//!               -> AnimationManager -> AnimatedValue -> LayoutTree
//!               -> ResourceManager  -> GraphicsDevice / AudioDevice
//!               -> LayoutManager    -> onLayout listeners
//!               -> ViewTree::draw   -> RenderingContext -> present
//! ```
//!
//! ## Modules
//!
//! - [`style`] - Immutable styles, animated values and layout bindings
//! - [`animation`] - Timing, sequence and parallel animations with easings
//! - [`resource`] - Image, font and audio lifecycle over platform devices
//! - [`layout`] - Taffy tree wrapper and text layout
//! - [`view`] - Box, text and image views in a generational arena
//! - [`focus`] - Focus manager and focus delegates
//! - [`reconciler`] - Host config for tree-diffing drivers and [`Element`] mounting
//! - [`app`] - The frame loop
//! - [`platform`] - Traits a backend implements

pub mod animation;
pub mod app;
pub mod error;
pub mod event;
pub mod focus;
pub mod input;
pub mod layout;
pub mod platform;
pub mod reconciler;
pub mod resource;
pub mod style;
pub mod types;
pub mod view;

#[cfg(test)]
mod testing;

pub use types::*;

pub use animation::{Animation, AnimationHandle, AnimationManager, AnimationScheduler, Parallel, Sequence, Timing, TimingConfig};

pub use app::{AppConfig, AppEvent, Application, LayoutManager, StopHandle};

pub use error::{
    AppError, FocusError, LayoutError, LoadError, ReconcileError, ResourceError, SourceError, StateTransitionError,
    StyleError, ViewError,
};

pub use event::{EventEmitter, ListenerId};

pub use focus::{Command, FocusDelegate, FocusManager, LinearFocusDelegate, Navigate, Orientation};

pub use input::{Direction, KeyEvent, KeyState, Modifiers, drain_terminal_events, platform_event};

pub use layout::{BoxGeometry, FontSample, LayoutTree};

pub use platform::{
    AudioDevice, DecodedAudio, DecodedImage, GraphicsDevice, ImageInput, MediaLoader, PlatformEvent, RenderingContext,
    Window,
};

pub use reconciler::{Element, HostConfig, mount};

pub use resource::{Devices, FontSpec, ResourceEvent, ResourceManager, ResourceState, SourceSpec};

pub use style::{AnimatedValue, Style, StyleFragment};

pub use view::{Props, ViewId, ViewTree, ViewType};
