use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::connection::{UrpConnection, QUERY_INTERFACE};
use super::error::UrpError;
use super::reflection::{FunctionTable, InterfaceLayout, Member, TypeRegistry};
use super::types::{Oid, TypeClass, UnoType, Value, XINTERFACE};

const XCOMPONENT_CONTEXT: &str = "com.sun.star.uno.XComponentContext";
const GET_VALUE_BY_NAME: u16 = 3;
const GET_SERVICE_MANAGER: u16 = 4;

const XMULTI_COMPONENT_FACTORY: &str = "com.sun.star.lang.XMultiComponentFactory";

const TYPE_MANAGER_SINGLETON: &str = "/singletons/com.sun.star.reflection.theTypeDescriptionManager";
const XHIERARCHICAL_NAME_ACCESS: &str = "com.sun.star.container.XHierarchicalNameAccess";
const GET_BY_HIERARCHICAL_NAME: u16 = 3;

// reflection interfaces are addressed with fixed slots, they are needed to
// resolve everything else
const XTYPE_DESCRIPTION: &str = "com.sun.star.reflection.XTypeDescription";
const GET_TYPE_CLASS: u16 = 3;
const GET_NAME: u16 = 4;
const XINTERFACE_TYPE_DESCRIPTION2: &str = "com.sun.star.reflection.XInterfaceTypeDescription2";
const GET_MEMBERS: u16 = 7;
const GET_BASE_TYPES: u16 = 8;
const XINTERFACE_MEMBER_TYPE_DESCRIPTION: &str =
    "com.sun.star.reflection.XInterfaceMemberTypeDescription";
const GET_MEMBER_NAME: u16 = 5;
const GET_POSITION: u16 = 6;
const XINTERFACE_ATTRIBUTE_TYPE_DESCRIPTION: &str =
    "com.sun.star.reflection.XInterfaceAttributeTypeDescription";
const IS_READ_ONLY: u16 = 7;

/// A bootstrapped bridge: the remote component context plus what is needed to
/// call any interface on any object reachable from it.
pub struct UnoSession {
    conn: UrpConnection,
    registry: TypeRegistry,
    // (object, interface) pairs the peer has a stub for
    known: HashSet<(Oid, String)>,
    context: Oid,
    type_manager: Option<Oid>,
}

impl UnoSession {
    /// Fetch the named initial object (usually `StarOffice.ComponentContext`)
    pub(crate) async fn establish(
        conn: UrpConnection,
        initial_object: &str,
        registry: TypeRegistry,
    ) -> Result<Self, UrpError> {
        let mut session = Self {
            conn,
            registry,
            known: HashSet::new(),
            context: Oid::new(initial_object),
            type_manager: None,
        };

        let initial = session.context.clone();
        session.context = session
            .query(&initial, XCOMPONENT_CONTEXT)
            .await?
            .ok_or_else(|| UrpError::MissingInterface(XCOMPONENT_CONTEXT.to_string()))?;
        Ok(session)
    }

    pub fn context(&self) -> &Oid {
        &self.context
    }

    pub async fn service_manager(&mut self) -> Result<Oid, UrpError> {
        let context = self.context.clone();
        let value = self
            .invoke_fixed(
                &context,
                XCOMPONENT_CONTEXT,
                GET_SERVICE_MANAGER,
                &[],
                &UnoType::interface(XMULTI_COMPONENT_FACTORY),
            )
            .await?;
        value
            .into_object()
            .ok_or_else(|| UrpError::UnexpectedValue("getServiceManager".to_string()))
    }

    /// `None` when the service cannot be instantiated
    pub async fn create_instance(
        &mut self,
        service_manager: &Oid,
        service: &str,
    ) -> Result<Option<Oid>, UrpError> {
        let context = self.context.clone();
        let value = self
            .invoke(
                service_manager,
                XMULTI_COMPONENT_FACTORY,
                "createInstanceWithContext",
                &[Value::String(service.to_string()), Value::Object(Some(context))],
                &UnoType::interface(XINTERFACE),
            )
            .await?;
        Ok(value.into_object())
    }

    /// `queryInterface`; `None` when the object does not implement `interface`.
    ///
    /// The peer only holds a stub for the type the reference travelled as,
    /// which is not always the requested one: the initial object comes back as
    /// a plain `XInterface`.
    pub async fn query(&mut self, object: &Oid, interface: &str) -> Result<Option<Oid>, UrpError> {
        let (ty, value) = self
            .conn
            .call_any(
                object,
                XINTERFACE,
                QUERY_INTERFACE,
                &[Value::Type(UnoType::interface(interface))],
            )
            .await?;
        self.remember(&ty, &value);

        match value {
            Value::Void | Value::Object(None) => Ok(None),
            Value::Object(Some(oid)) => Ok(Some(oid)),
            _ => Err(UrpError::UnexpectedValue(format!(
                "queryInterface({interface})"
            ))),
        }
    }

    /// Call `member` of `interface`, resolving its slot from the peer's type
    /// descriptions on first use.
    pub async fn invoke(
        &mut self,
        object: &Oid,
        interface: &str,
        member: &str,
        args: &[Value],
        ret: &UnoType,
    ) -> Result<Value, UrpError> {
        let table = self.function_table(interface).await?;
        let function_id = table.method(member).ok_or_else(|| UrpError::UnknownMember {
            interface: interface.to_string(),
            member: member.to_string(),
        })?;
        self.invoke_fixed(object, interface, function_id, args, ret)
            .await
    }

    async fn invoke_fixed(
        &mut self,
        object: &Oid,
        interface: &str,
        function_id: u16,
        args: &[Value],
        ret: &UnoType,
    ) -> Result<Value, UrpError> {
        self.ensure(object, interface).await?;
        self.call_known(object, interface, function_id, args, ret)
            .await
    }

    /// Caller guarantees the peer already has a stub assignable to `interface`
    async fn call_known(
        &mut self,
        object: &Oid,
        interface: &str,
        function_id: u16,
        args: &[Value],
        ret: &UnoType,
    ) -> Result<Value, UrpError> {
        if *ret == UnoType::Any {
            let (ty, value) = self
                .conn
                .call_any(object, interface, function_id, args)
                .await?;
            self.remember(&ty, &value);
            return Ok(value);
        }
        let value = self
            .conn
            .call(object, interface, function_id, args, ret)
            .await?;
        self.remember(ret, &value);
        Ok(value)
    }

    async fn ensure(&mut self, object: &Oid, interface: &str) -> Result<(), UrpError> {
        if self.is_known(object, interface) {
            return Ok(());
        }
        self.query(object, interface).await?;
        if self.is_known(object, interface) {
            Ok(())
        } else {
            Err(UrpError::MissingInterface(interface.to_string()))
        }
    }

    fn is_known(&self, object: &Oid, interface: &str) -> bool {
        interface == XINTERFACE || self.known.contains(&(object.clone(), interface.to_string()))
    }

    // a returned reference gets a stub for the interface type it travelled as
    fn remember(&mut self, ty: &UnoType, value: &Value) {
        match (ty, value) {
            (UnoType::Interface(name), Value::Object(Some(oid))) => {
                self.known.insert((oid.clone(), name.to_string()));
            }
            (UnoType::Sequence(element), Value::Sequence(items)) => {
                for item in items {
                    self.remember(element, item);
                }
            }
            _ => {}
        }
    }

    async fn function_table(&mut self, interface: &str) -> Result<Arc<FunctionTable>, UrpError> {
        if let Some(table) = self.registry.table(interface) {
            return Ok(table);
        }

        let mut layouts = HashMap::new();
        let mut pending = vec![interface.to_string()];
        while let Some(name) = pending.pop() {
            if layouts.contains_key(&name) {
                continue;
            }
            let layout = match self.registry.layout(&name) {
                Some(layout) => layout,
                None => {
                    let layout = Arc::new(self.fetch_layout(&name).await?);
                    self.registry.insert_layout(&name, layout.clone());
                    layout
                }
            };
            pending.extend(layout.bases.iter().cloned());
            layouts.insert(name, layout);
        }

        let table = Arc::new(FunctionTable::build(interface, &layouts)?);
        self.registry.insert_table(interface, table.clone());
        tracing::debug!(interface, "resolved function table");
        Ok(table)
    }

    async fn type_manager(&mut self) -> Result<Oid, UrpError> {
        if let Some(tdm) = &self.type_manager {
            return Ok(tdm.clone());
        }
        let context = self.context.clone();
        let tdm = self
            .invoke_fixed(
                &context,
                XCOMPONENT_CONTEXT,
                GET_VALUE_BY_NAME,
                &[Value::String(TYPE_MANAGER_SINGLETON.to_string())],
                &UnoType::Any,
            )
            .await?
            .into_object()
            .ok_or_else(|| UrpError::UnexpectedValue(TYPE_MANAGER_SINGLETON.to_string()))?;
        self.type_manager = Some(tdm.clone());
        Ok(tdm)
    }

    async fn fetch_layout(&mut self, interface: &str) -> Result<InterfaceLayout, UrpError> {
        let tdm = self.type_manager().await?;
        let description = self
            .invoke_fixed(
                &tdm,
                XHIERARCHICAL_NAME_ACCESS,
                GET_BY_HIERARCHICAL_NAME,
                &[Value::String(interface.to_string())],
                &UnoType::Any,
            )
            .await?
            .into_object()
            .ok_or_else(|| UrpError::UnexpectedValue(format!("type description of {interface}")))?;

        let base_objects = self
            .invoke_fixed(
                &description,
                XINTERFACE_TYPE_DESCRIPTION2,
                GET_BASE_TYPES,
                &[],
                &UnoType::sequence_of(UnoType::interface(XTYPE_DESCRIPTION)),
            )
            .await?;
        let mut bases = Vec::new();
        for base in objects(base_objects, "getBaseTypes")? {
            let name = self
                .call_known(&base, XTYPE_DESCRIPTION, GET_NAME, &[], &UnoType::String)
                .await?
                .into_string()
                .ok_or_else(|| UrpError::UnexpectedValue("getName".to_string()))?;
            bases.push(name);
        }

        let member_objects = self
            .invoke_fixed(
                &description,
                XINTERFACE_TYPE_DESCRIPTION2,
                GET_MEMBERS,
                &[],
                &UnoType::sequence_of(UnoType::interface(XINTERFACE_MEMBER_TYPE_DESCRIPTION)),
            )
            .await?;
        let mut members = Vec::new();
        for member in objects(member_objects, "getMembers")? {
            let (position, entry) = self.fetch_member(&member).await?;
            members.push((position, entry));
        }
        members.sort_by_key(|(position, _)| *position);

        Ok(InterfaceLayout {
            bases,
            members: members.into_iter().map(|(_, member)| member).collect(),
        })
    }

    async fn fetch_member(&mut self, member: &Oid) -> Result<(i32, Member), UrpError> {
        let position = self
            .call_known(
                member,
                XINTERFACE_MEMBER_TYPE_DESCRIPTION,
                GET_POSITION,
                &[],
                &UnoType::Long,
            )
            .await?
            .as_long()
            .ok_or_else(|| UrpError::UnexpectedValue("getPosition".to_string()))?;
        let name = self
            .call_known(
                member,
                XINTERFACE_MEMBER_TYPE_DESCRIPTION,
                GET_MEMBER_NAME,
                &[],
                &UnoType::String,
            )
            .await?
            .into_string()
            .ok_or_else(|| UrpError::UnexpectedValue("getMemberName".to_string()))?;
        let class = self
            .call_known(
                member,
                XTYPE_DESCRIPTION,
                GET_TYPE_CLASS,
                &[],
                &UnoType::Enum("com.sun.star.uno.TypeClass".into()),
            )
            .await?
            .as_long()
            .ok_or_else(|| UrpError::UnexpectedValue("getTypeClass".to_string()))?;

        if class == TypeClass::InterfaceAttribute as i32 {
            let read_only = self
                .invoke_fixed(
                    member,
                    XINTERFACE_ATTRIBUTE_TYPE_DESCRIPTION,
                    IS_READ_ONLY,
                    &[],
                    &UnoType::Boolean,
                )
                .await?
                .as_bool()
                .ok_or_else(|| UrpError::UnexpectedValue("isReadOnly".to_string()))?;
            return Ok((position, Member::attribute(&name, read_only)));
        }
        Ok((position, Member::method(&name)))
    }
}

fn objects(value: Value, call: &str) -> Result<Vec<Oid>, UrpError> {
    value
        .into_sequence()
        .ok_or_else(|| UrpError::UnexpectedValue(call.to_string()))?
        .into_iter()
        .map(|item| {
            item.into_object()
                .ok_or_else(|| UrpError::UnexpectedValue(format!("null element from {call}")))
        })
        .collect()
}
