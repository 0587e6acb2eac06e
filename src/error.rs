//! Error types, one enum per concern.

use thiserror::Error;

use crate::resource::ResourceState;

/// A style property was given a value it cannot hold.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    #[error("invalid value for style property `{property}`: {value}")]
    Validation { property: String, value: String },
}

impl StyleError {
    pub fn invalid(property: &str, value: impl std::fmt::Display) -> Self {
        Self::Validation {
            property: property.to_string(),
            value: value.to_string(),
        }
    }
}

/// A resource attempted an edge that is not in its transition table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid state transition for `{id}`: {from} -> {to}")]
pub struct StateTransitionError {
    pub id: String,
    pub from: ResourceState,
    pub to: ResourceState,
}

/// Failure fetching, decoding or uploading media.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("i/o error: {0}")]
    Io(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("device error: {0}")]
    Device(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("no {0} device available")]
    NoDevice(&'static str),
}

/// A source descriptor could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source uri is empty")]
    MissingUri,
    #[error("malformed data uri: {0}")]
    MalformedDataUri(String),
    #[error("unsupported data uri charset: {0}")]
    InvalidCharset(String),
    #[error("data uri has no data section")]
    EmptyData,
    #[error("{kind} sources are not allowed here: {uri}")]
    NotAllowed { kind: &'static str, uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("resource `{0}` already exists")]
    Duplicate(String),
    #[error("unknown resource `{0}`")]
    Unknown(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Transition(#[from] StateTransitionError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout engine: {0}")]
    Taffy(#[from] taffy::TaffyError),
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("view is already a child of another parent")]
    AlreadyParented,
    #[error("view is not a child of this parent")]
    NotAChild,
    #[error("unknown view")]
    UnknownView,
    #[error("appending would create a cycle")]
    Cycle,
    #[error("image views cannot have children")]
    ImageChildren,
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Style(#[from] StyleError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl From<taffy::TaffyError> for ViewError {
    fn from(err: taffy::TaffyError) -> Self {
        Self::Layout(LayoutError::Taffy(err))
    }
}

/// Focus protocol faults. These indicate delegate authoring defects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FocusError {
    #[error("focus delegate did not answer a {0} request")]
    NoAnswer(&'static str),
    #[error("view cannot receive focus")]
    NotFocusable,
    #[error("focus delegate resolved to itself")]
    ResolvedToSelf,
    #[error("focus group has no focusable children")]
    EmptyGroup,
    #[error("unknown view")]
    UnknownView,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("unknown element tag `{0}`")]
    UnknownTag(String),
    #[error("unsupported parent for child insertion")]
    UnsupportedParent,
    #[error(transparent)]
    View(#[from] ViewError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("application is already attached")]
    AlreadyAttached,
    #[error("application is not attached")]
    NotAttached,
    #[error("window attach failed: {0}")]
    Attach(String),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Focus(#[from] FocusError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Style(#[from] StyleError),
}
