#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cuecard::automation::{
    BridgeError, Connector, DocumentKind, ObjectRef, OfficeSession, ShapeKind,
};
use cuecard::bridge::SlideNotesCache;
use cuecard::launcher::OfficeProcess;
use cuecard::server::{routes, AppState};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const ENDPOINT: &str = "uno:socket,host=127.0.0.1,port=2002;urp;StarOffice.ComponentContext";

#[derive(Debug, Clone)]
pub enum FakeShape {
    Text(String),
    Picture,
}

#[derive(Debug, Clone)]
pub struct FakeDocument {
    pub presentation: bool,
    pub title: Option<String>,
    /// notes-page shapes of each slide
    pub slides: Vec<Vec<FakeShape>>,
    pub show_running: bool,
    pub slide_index: i32,
}

impl FakeDocument {
    pub fn presentation(slides: Vec<Vec<FakeShape>>) -> Self {
        Self {
            presentation: true,
            title: Some("deck.odp".to_string()),
            slides,
            show_running: false,
            slide_index: 0,
        }
    }

    /// One text shape per slide
    pub fn with_notes(notes: &[&str]) -> Self {
        Self::presentation(
            notes
                .iter()
                .map(|text| vec![FakeShape::Text(text.to_string())])
                .collect(),
        )
    }

    pub fn running(mut self) -> Self {
        self.show_running = true;
        self
    }

    pub fn spreadsheet() -> Self {
        Self {
            presentation: false,
            title: Some("budget.ods".to_string()),
            slides: Vec::new(),
            show_running: false,
            slide_index: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct OfficeState {
    pub unreachable: bool,
    /// connects that fail before the endpoint comes up
    pub refused_connects: usize,
    pub connects: usize,
    /// `current_component` calls answered with nothing before the document shows up
    pub loading_polls: usize,
    pub document: Option<FakeDocument>,
    pub commands: Vec<&'static str>,
    /// connects never complete
    pub hang: bool,
}

/// In-memory office behind the automation traits
#[derive(Clone, Default)]
pub struct FakeOffice {
    state: Arc<Mutex<OfficeState>>,
}

impl FakeOffice {
    pub fn with_document(document: FakeDocument) -> Self {
        let office = FakeOffice::default();
        office.state().document = Some(document);
        office
    }

    pub fn unreachable() -> Self {
        let office = FakeOffice::default();
        office.state().unreachable = true;
        office
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, OfficeState> {
        self.state.lock().unwrap()
    }

    pub fn document(&self) -> FakeDocument {
        self.state().document.clone().unwrap()
    }
}

#[async_trait]
impl Connector for FakeOffice {
    fn endpoint(&self) -> String {
        ENDPOINT.to_string()
    }

    async fn connect(&self) -> Result<Box<dyn OfficeSession>, BridgeError> {
        let hang = {
            let mut state = self.state();
            state.connects += 1;
            if state.unreachable || state.refused_connects > 0 {
                state.refused_connects = state.refused_connects.saturating_sub(1);
                return Err(BridgeError::Unreachable {
                    endpoint: "127.0.0.1:2002".to_string(),
                    source: io::Error::from(io::ErrorKind::ConnectionRefused),
                });
            }
            state.hang
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<OfficeState>>,
}

impl FakeSession {
    fn with_document<T>(
        &self,
        f: impl FnOnce(&mut FakeDocument) -> Result<T, BridgeError>,
    ) -> Result<T, BridgeError> {
        let mut state = self.state.lock().unwrap();
        match state.document.as_mut() {
            Some(document) => f(document),
            None => Err(BridgeError::Fault("document was closed".to_string())),
        }
    }

    fn record(&self, command: &'static str) {
        self.state.lock().unwrap().commands.push(command);
    }
}

fn index_of(object: &ObjectRef, prefix: &str) -> usize {
    object
        .as_str()
        .strip_prefix(prefix)
        .and_then(|rest| rest.split(':').next())
        .and_then(|index| index.parse().ok())
        .unwrap()
}

#[async_trait]
impl OfficeSession for FakeSession {
    async fn desktop(&mut self) -> Result<ObjectRef, BridgeError> {
        Ok(ObjectRef::new("desktop"))
    }

    async fn current_component(
        &mut self,
        _desktop: &ObjectRef,
    ) -> Result<Option<ObjectRef>, BridgeError> {
        let mut state = self.state.lock().unwrap();
        if state.loading_polls > 0 {
            state.loading_polls -= 1;
            return Ok(None);
        }
        Ok(state.document.as_ref().map(|_| ObjectRef::new("document")))
    }

    async fn document_kind(&mut self, _document: &ObjectRef) -> Result<DocumentKind, BridgeError> {
        self.with_document(|document| {
            Ok(if document.presentation {
                DocumentKind::Presentation
            } else {
                DocumentKind::Other
            })
        })
    }

    async fn title(&mut self, _document: &ObjectRef) -> Result<Option<String>, BridgeError> {
        self.with_document(|document| Ok(document.title.clone()))
    }

    async fn presentation(&mut self, _document: &ObjectRef) -> Result<ObjectRef, BridgeError> {
        Ok(ObjectRef::new("presentation"))
    }

    async fn start_presentation(&mut self, _presentation: &ObjectRef) -> Result<(), BridgeError> {
        self.record("start");
        self.with_document(|document| {
            document.show_running = true;
            document.slide_index = 0;
            Ok(())
        })
    }

    async fn controller(
        &mut self,
        _presentation: &ObjectRef,
    ) -> Result<Option<ObjectRef>, BridgeError> {
        self.with_document(|document| {
            Ok(document
                .show_running
                .then(|| ObjectRef::new("controller")))
        })
    }

    async fn goto_next_effect(&mut self, _controller: &ObjectRef) -> Result<(), BridgeError> {
        self.record("next");
        self.with_document(|document| {
            let last = document.slides.len().saturating_sub(1) as i32;
            document.slide_index = (document.slide_index + 1).min(last);
            Ok(())
        })
    }

    async fn goto_previous_effect(&mut self, _controller: &ObjectRef) -> Result<(), BridgeError> {
        self.record("previous");
        self.with_document(|document| {
            document.slide_index = (document.slide_index - 1).max(0);
            Ok(())
        })
    }

    async fn current_slide_index(&mut self, _controller: &ObjectRef) -> Result<i32, BridgeError> {
        self.record("index");
        self.with_document(|document| Ok(document.slide_index))
    }

    async fn slides(&mut self, _document: &ObjectRef) -> Result<Vec<ObjectRef>, BridgeError> {
        self.with_document(|document| {
            Ok((0..document.slides.len())
                .map(|index| ObjectRef::new(format!("slide:{index}")))
                .collect())
        })
    }

    async fn notes_page(&mut self, slide: &ObjectRef) -> Result<ObjectRef, BridgeError> {
        let index = index_of(slide, "slide:");
        Ok(ObjectRef::new(format!("notes:{index}")))
    }

    async fn shapes(&mut self, page: &ObjectRef) -> Result<Vec<ShapeKind>, BridgeError> {
        let slide = index_of(page, "notes:");
        self.with_document(|document| {
            Ok(document.slides[slide]
                .iter()
                .enumerate()
                .map(|(index, shape)| match shape {
                    FakeShape::Text(_) => {
                        ShapeKind::TextCapable(ObjectRef::new(format!("shape:{slide}:{index}")))
                    }
                    FakeShape::Picture => ShapeKind::Other,
                })
                .collect())
        })
    }

    async fn text(&mut self, shape: &ObjectRef) -> Result<String, BridgeError> {
        let mut parts = shape.as_str().split(':').skip(1);
        let slide: usize = parts.next().unwrap().parse().unwrap();
        let index: usize = parts.next().unwrap().parse().unwrap();
        self.with_document(|document| match &document.slides[slide][index] {
            FakeShape::Text(text) => Ok(text.clone()),
            FakeShape::Picture => Err(BridgeError::Fault("shape has no text".to_string())),
        })
    }
}

/// Records spawn requests instead of starting anything
#[derive(Default)]
pub struct FakeProcess {
    pub spawned: Mutex<Vec<(String, PathBuf)>>,
    pub fail_spawn: bool,
    /// Document the office "opens" once spawned
    pub opens: Option<(FakeOffice, FakeDocument)>,
}

impl OfficeProcess for FakeProcess {
    fn program(&self) -> &str {
        "libreoffice"
    }

    fn terminate_stale(&self) -> usize {
        0
    }

    fn spawn(&self, accept: &str, document: &Path) -> io::Result<()> {
        if self.fail_spawn {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        self.spawned
            .lock()
            .unwrap()
            .push((accept.to_string(), document.to_path_buf()));
        if let Some((office, opened)) = &self.opens {
            office.state().document = Some(opened.clone());
        }
        Ok(())
    }
}

pub fn app(office: &FakeOffice, notes: SlideNotesCache) -> Router {
    app_with_timeout(office, notes, Duration::from_secs(5))
}

pub fn app_with_timeout(
    office: &FakeOffice,
    notes: SlideNotesCache,
    request_timeout: Duration,
) -> Router {
    let state = AppState::new(notes, Arc::new(office.clone()), request_timeout);
    routes::create_router(state)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}
