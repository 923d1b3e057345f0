use std::sync::Arc;

use serde::Serialize;

use super::negotiator::{Negotiated, SessionError};
use crate::automation::{BridgeError, ObjectRef, OfficeSession, ShapeKind};

/// Speaker notes, one trimmed entry per slide in slide order.
///
/// Built once before the server accepts requests and never refreshed; clones
/// share the same slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SlideNotesCache(Arc<[String]>);

impl SlideNotesCache {
    pub fn new(notes: Vec<String>) -> Self {
        SlideNotesCache(notes.into())
    }

    /// Walk every slide's notes page of the negotiated document.
    pub async fn build(negotiated: &mut Negotiated) -> Result<Self, SessionError> {
        let session = negotiated.session.as_mut();
        let slides = session
            .slides(&negotiated.document)
            .await
            .map_err(|err| fault("draw_pages", err))?;

        let mut notes = Vec::with_capacity(slides.len());
        for (index, slide) in slides.iter().enumerate() {
            let text = slide_notes(session, slide).await.map_err(|err| {
                tracing::warn!(slide = index, error = %err, "could not read slide notes");
                SessionError::UnexpectedFault(format!("notes of slide {index}: {err}"))
            })?;
            notes.push(text);
        }

        tracing::info!(slides = notes.len(), "speaker notes cached");
        Ok(Self::new(notes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, slide: usize) -> Option<&str> {
        self.0.get(slide).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

async fn slide_notes(
    session: &mut dyn OfficeSession,
    slide: &ObjectRef,
) -> Result<String, BridgeError> {
    let page = session.notes_page(slide).await?;
    let mut text = String::new();
    for shape in session.shapes(&page).await? {
        if let ShapeKind::TextCapable(shape) = shape {
            text.push_str(&session.text(&shape).await?);
        }
    }
    Ok(text.trim().to_string())
}

fn fault(step: &'static str, err: BridgeError) -> SessionError {
    tracing::warn!(step, error = %err, "automation call failed");
    SessionError::UnexpectedFault(format!("{step}: {err}"))
}
