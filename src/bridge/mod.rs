//! Presentation control bridge: session negotiation, show control and the
//! speaker-notes cache, written against the automation boundary only.

pub mod controller;
pub mod negotiator;
pub mod notes;

pub use controller::{CommandOutcome, ControlCommand, ControlError};
pub use negotiator::{Negotiated, SessionError};
pub use notes::SlideNotesCache;
