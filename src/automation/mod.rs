//! Capability boundary of the presentation application.
//!
//! The bridge logic talks to the office only through these traits, so it is
//! independent of the wire protocol and can be driven by an in-memory office
//! in tests.

mod libreoffice;

pub use libreoffice::{LibreOffice, LibreOfficeSession};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::uno::{Oid, UrpError};

/// Opaque handle of a remote object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef(Arc<str>);

impl ObjectRef {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        ObjectRef(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Oid> for ObjectRef {
    fn from(oid: Oid) -> Self {
        ObjectRef::new(oid.as_str())
    }
}

impl From<&ObjectRef> for Oid {
    fn from(object: &ObjectRef) -> Self {
        Oid::new(object.as_str())
    }
}

/// Result of the "supports the presentation document service" check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Presentation,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    TextCapable(ObjectRef),
    Other,
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Automation endpoint {endpoint} is unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Urp(#[from] UrpError),

    #[error("{0}")]
    Fault(String),
}

impl BridgeError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, BridgeError::Unreachable { .. })
    }
}

/// Resolves the automation endpoint into a fresh session
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human readable locator, for diagnostics
    fn endpoint(&self) -> String;

    /// Connect and resolve the remote context and its service manager
    async fn connect(&self) -> Result<Box<dyn OfficeSession>, BridgeError>;
}

/// One live bridge into the office's object model
#[async_trait]
pub trait OfficeSession: Send {
    async fn desktop(&mut self) -> Result<ObjectRef, BridgeError>;

    /// `None` while no document is loaded
    async fn current_component(
        &mut self,
        desktop: &ObjectRef,
    ) -> Result<Option<ObjectRef>, BridgeError>;

    async fn document_kind(&mut self, document: &ObjectRef) -> Result<DocumentKind, BridgeError>;

    async fn title(&mut self, document: &ObjectRef) -> Result<Option<String>, BridgeError>;

    async fn presentation(&mut self, document: &ObjectRef) -> Result<ObjectRef, BridgeError>;

    async fn start_presentation(&mut self, presentation: &ObjectRef) -> Result<(), BridgeError>;

    /// `None` while no show is running
    async fn controller(
        &mut self,
        presentation: &ObjectRef,
    ) -> Result<Option<ObjectRef>, BridgeError>;

    async fn goto_next_effect(&mut self, controller: &ObjectRef) -> Result<(), BridgeError>;

    async fn goto_previous_effect(&mut self, controller: &ObjectRef) -> Result<(), BridgeError>;

    async fn current_slide_index(&mut self, controller: &ObjectRef) -> Result<i32, BridgeError>;

    /// Slides in document order
    async fn slides(&mut self, document: &ObjectRef) -> Result<Vec<ObjectRef>, BridgeError>;

    async fn notes_page(&mut self, slide: &ObjectRef) -> Result<ObjectRef, BridgeError>;

    /// Shapes in on-page order
    async fn shapes(&mut self, page: &ObjectRef) -> Result<Vec<ShapeKind>, BridgeError>;

    async fn text(&mut self, shape: &ObjectRef) -> Result<String, BridgeError>;
}
