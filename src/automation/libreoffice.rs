use std::time::Duration;

use async_trait::async_trait;

use super::{BridgeError, Connector, DocumentKind, ObjectRef, OfficeSession, ShapeKind};
use crate::uno::{Oid, TypeRegistry, UnoSession, UnoType, UnoUrl, UrpConnection, UrpError, Value};

const DESKTOP_SERVICE: &str = "com.sun.star.frame.Desktop";
const PRESENTATION_DOCUMENT: &str = "com.sun.star.presentation.PresentationDocument";

const XDESKTOP: &str = "com.sun.star.frame.XDesktop";
const XCOMPONENT: &str = "com.sun.star.lang.XComponent";
const XSERVICE_INFO: &str = "com.sun.star.lang.XServiceInfo";
const XTITLE: &str = "com.sun.star.frame.XTitle";
const XPRESENTATION_SUPPLIER: &str = "com.sun.star.presentation.XPresentationSupplier";
const XPRESENTATION: &str = "com.sun.star.presentation.XPresentation";
const XPRESENTATION2: &str = "com.sun.star.presentation.XPresentation2";
const XSLIDE_SHOW_CONTROLLER: &str = "com.sun.star.presentation.XSlideShowController";
const XDRAW_PAGES_SUPPLIER: &str = "com.sun.star.drawing.XDrawPagesSupplier";
const XDRAW_PAGES: &str = "com.sun.star.drawing.XDrawPages";
const XDRAW_PAGE: &str = "com.sun.star.drawing.XDrawPage";
const XINDEX_ACCESS: &str = "com.sun.star.container.XIndexAccess";
const XPRESENTATION_PAGE: &str = "com.sun.star.presentation.XPresentationPage";
const XTEXT: &str = "com.sun.star.text.XText";
const XTEXT_RANGE: &str = "com.sun.star.text.XTextRange";

/// LibreOffice reached through its URP socket
pub struct LibreOffice {
    url: UnoUrl,
    connect_timeout: Duration,
    call_timeout: Duration,
    registry: TypeRegistry,
}

impl LibreOffice {
    pub fn new(url: UnoUrl, connect_timeout: Duration, call_timeout: Duration) -> Self {
        Self {
            url,
            connect_timeout,
            call_timeout,
            registry: TypeRegistry::new(),
        }
    }

    pub fn url(&self) -> &UnoUrl {
        &self.url
    }
}

#[async_trait]
impl Connector for LibreOffice {
    fn endpoint(&self) -> String {
        self.url.to_string()
    }

    async fn connect(&self) -> Result<Box<dyn OfficeSession>, BridgeError> {
        let conn = UrpConnection::open(
            &self.url.host,
            self.url.port,
            self.connect_timeout,
            self.call_timeout,
        )
        .await
        .map_err(|source| BridgeError::Unreachable {
            endpoint: self.url.endpoint(),
            source,
        })?;

        let mut uno = UnoSession::establish(conn, &self.url.object, self.registry.clone()).await?;
        let service_manager = uno.service_manager().await?;
        tracing::debug!(
            context = %uno.context(),
            service_manager = %service_manager,
            "resolved remote component context"
        );

        Ok(Box::new(LibreOfficeSession {
            uno,
            service_manager,
        }))
    }
}

pub struct LibreOfficeSession {
    uno: UnoSession,
    service_manager: Oid,
}

impl LibreOfficeSession {
    async fn call(
        &mut self,
        object: &ObjectRef,
        interface: &str,
        member: &str,
        args: &[Value],
        ret: UnoType,
    ) -> Result<Value, BridgeError> {
        let oid = Oid::from(object);
        Ok(self.uno.invoke(&oid, interface, member, args, &ret).await?)
    }

    async fn call_object(
        &mut self,
        object: &ObjectRef,
        interface: &str,
        member: &str,
        args: &[Value],
        ret: &str,
    ) -> Result<Option<ObjectRef>, BridgeError> {
        let value = self
            .call(object, interface, member, args, UnoType::interface(ret))
            .await?;
        Ok(value.into_object().map(ObjectRef::from))
    }

    async fn supports(&mut self, object: &ObjectRef, interface: &str) -> Result<bool, BridgeError> {
        let oid = Oid::from(object);
        Ok(self.uno.query(&oid, interface).await?.is_some())
    }

    /// Elements of an `XIndexAccess` container, in index order
    async fn elements(&mut self, container: &ObjectRef) -> Result<Vec<ObjectRef>, BridgeError> {
        let count = self
            .call(container, XINDEX_ACCESS, "getCount", &[], UnoType::Long)
            .await?
            .as_long()
            .ok_or_else(|| unexpected("getCount"))?;

        let mut elements = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            let element = self
                .call(
                    container,
                    XINDEX_ACCESS,
                    "getByIndex",
                    &[Value::Long(index)],
                    UnoType::Any,
                )
                .await?
                .into_object()
                .ok_or_else(|| unexpected("getByIndex"))?;
            elements.push(ObjectRef::from(element));
        }
        Ok(elements)
    }
}

fn unexpected(call: &str) -> BridgeError {
    BridgeError::Urp(UrpError::UnexpectedValue(call.to_string()))
}

#[async_trait]
impl OfficeSession for LibreOfficeSession {
    async fn desktop(&mut self) -> Result<ObjectRef, BridgeError> {
        let service_manager = self.service_manager.clone();
        self.uno
            .create_instance(&service_manager, DESKTOP_SERVICE)
            .await?
            .map(ObjectRef::from)
            .ok_or_else(|| BridgeError::Fault(format!("could not create {DESKTOP_SERVICE}")))
    }

    async fn current_component(
        &mut self,
        desktop: &ObjectRef,
    ) -> Result<Option<ObjectRef>, BridgeError> {
        self.call_object(desktop, XDESKTOP, "getCurrentComponent", &[], XCOMPONENT)
            .await
    }

    async fn document_kind(&mut self, document: &ObjectRef) -> Result<DocumentKind, BridgeError> {
        let supported = self
            .call(
                document,
                XSERVICE_INFO,
                "supportsService",
                &[Value::String(PRESENTATION_DOCUMENT.to_string())],
                UnoType::Boolean,
            )
            .await?
            .as_bool()
            .ok_or_else(|| unexpected("supportsService"))?;

        Ok(if supported {
            DocumentKind::Presentation
        } else {
            DocumentKind::Other
        })
    }

    async fn title(&mut self, document: &ObjectRef) -> Result<Option<String>, BridgeError> {
        if !self.supports(document, XTITLE).await? {
            return Ok(None);
        }
        let title = self
            .call(document, XTITLE, "getTitle", &[], UnoType::String)
            .await?
            .into_string();
        Ok(title)
    }

    async fn presentation(&mut self, document: &ObjectRef) -> Result<ObjectRef, BridgeError> {
        self.call_object(
            document,
            XPRESENTATION_SUPPLIER,
            "getPresentation",
            &[],
            XPRESENTATION,
        )
        .await?
        .ok_or_else(|| BridgeError::Fault("document has no presentation object".to_string()))
    }

    async fn start_presentation(&mut self, presentation: &ObjectRef) -> Result<(), BridgeError> {
        self.call(presentation, XPRESENTATION, "start", &[], UnoType::Void)
            .await?;
        Ok(())
    }

    async fn controller(
        &mut self,
        presentation: &ObjectRef,
    ) -> Result<Option<ObjectRef>, BridgeError> {
        self.call_object(
            presentation,
            XPRESENTATION2,
            "getController",
            &[],
            XSLIDE_SHOW_CONTROLLER,
        )
        .await
    }

    async fn goto_next_effect(&mut self, controller: &ObjectRef) -> Result<(), BridgeError> {
        self.call(
            controller,
            XSLIDE_SHOW_CONTROLLER,
            "gotoNextEffect",
            &[],
            UnoType::Void,
        )
        .await?;
        Ok(())
    }

    async fn goto_previous_effect(&mut self, controller: &ObjectRef) -> Result<(), BridgeError> {
        self.call(
            controller,
            XSLIDE_SHOW_CONTROLLER,
            "gotoPreviousEffect",
            &[],
            UnoType::Void,
        )
        .await?;
        Ok(())
    }

    async fn current_slide_index(&mut self, controller: &ObjectRef) -> Result<i32, BridgeError> {
        self.call(
            controller,
            XSLIDE_SHOW_CONTROLLER,
            "getCurrentSlideIndex",
            &[],
            UnoType::Long,
        )
        .await?
        .as_long()
        .ok_or_else(|| unexpected("getCurrentSlideIndex"))
    }

    async fn slides(&mut self, document: &ObjectRef) -> Result<Vec<ObjectRef>, BridgeError> {
        let pages = self
            .call_object(document, XDRAW_PAGES_SUPPLIER, "getDrawPages", &[], XDRAW_PAGES)
            .await?
            .ok_or_else(|| unexpected("getDrawPages"))?;
        self.elements(&pages).await
    }

    async fn notes_page(&mut self, slide: &ObjectRef) -> Result<ObjectRef, BridgeError> {
        self.call_object(slide, XPRESENTATION_PAGE, "getNotesPage", &[], XDRAW_PAGE)
            .await?
            .ok_or_else(|| unexpected("getNotesPage"))
    }

    async fn shapes(&mut self, page: &ObjectRef) -> Result<Vec<ShapeKind>, BridgeError> {
        let mut shapes = Vec::new();
        for shape in self.elements(page).await? {
            if self.supports(&shape, XTEXT).await? {
                shapes.push(ShapeKind::TextCapable(shape));
            } else {
                shapes.push(ShapeKind::Other);
            }
        }
        Ok(shapes)
    }

    async fn text(&mut self, shape: &ObjectRef) -> Result<String, BridgeError> {
        self.call(shape, XTEXT_RANGE, "getString", &[], UnoType::String)
            .await?
            .into_string()
            .ok_or_else(|| unexpected("getString"))
    }
}
