//! Function ids of remote interfaces.
//!
//! URP addresses methods by their slot in the flattened interface: bases in
//! post-order without duplicates, then the interface's own members in
//! declaration order. Attributes take a getter slot and, unless read-only, a
//! setter slot. Layouts are fetched from the peer's type description manager
//! once per process and shared between sessions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;

use super::error::UrpError;
use super::types::XINTERFACE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Attribute { read_only: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
}

impl Member {
    pub fn method(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: MemberKind::Method,
        }
    }

    pub fn attribute(name: &str, read_only: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: MemberKind::Attribute { read_only },
        }
    }
}

/// Direct bases and own members of one interface
#[derive(Debug, Clone, Default)]
pub struct InterfaceLayout {
    pub bases: Vec<String>,
    pub members: Vec<Member>,
}

impl InterfaceLayout {
    fn root() -> Self {
        Self {
            bases: Vec::new(),
            members: vec![
                Member::method("queryInterface"),
                Member::method("acquire"),
                Member::method("release"),
            ],
        }
    }
}

#[derive(Debug, Default)]
pub struct FunctionTable {
    methods: HashMap<String, u16>,
}

impl FunctionTable {
    pub fn build(
        interface: &str,
        layouts: &HashMap<String, Arc<InterfaceLayout>>,
    ) -> Result<Self, UrpError> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        collect_bases(interface, layouts, &mut order, &mut seen)?;
        order.push(interface.to_string());

        let mut table = FunctionTable::default();
        let mut slot: u16 = 0;
        for name in &order {
            let layout = lookup(name, layouts)?;
            for member in &layout.members {
                match member.kind {
                    MemberKind::Method => {
                        table.methods.insert(member.name.clone(), slot);
                        slot += 1;
                    }
                    // getter, then setter unless read-only
                    MemberKind::Attribute { read_only } => {
                        slot += if read_only { 1 } else { 2 };
                    }
                }
            }
        }
        Ok(table)
    }

    pub fn method(&self, name: &str) -> Option<u16> {
        self.methods.get(name).copied()
    }
}

fn lookup<'a>(
    name: &str,
    layouts: &'a HashMap<String, Arc<InterfaceLayout>>,
) -> Result<&'a InterfaceLayout, UrpError> {
    layouts
        .get(name)
        .map(Arc::as_ref)
        .ok_or_else(|| UrpError::protocol(format!("no layout for {name}")))
}

fn collect_bases(
    name: &str,
    layouts: &HashMap<String, Arc<InterfaceLayout>>,
    order: &mut Vec<String>,
    seen: &mut HashSet<String>,
) -> Result<(), UrpError> {
    for base in &lookup(name, layouts)?.bases {
        collect_bases(base, layouts, order, seen)?;
        if seen.insert(base.clone()) {
            order.push(base.clone());
        }
    }
    Ok(())
}

/// Process-wide cache of interface layouts and function tables
#[derive(Clone)]
pub struct TypeRegistry {
    layouts: Arc<DashMap<String, Arc<InterfaceLayout>>>,
    tables: Arc<DashMap<String, Arc<FunctionTable>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let layouts = DashMap::new();
        layouts.insert(XINTERFACE.to_string(), Arc::new(InterfaceLayout::root()));
        Self {
            layouts: Arc::new(layouts),
            tables: Arc::new(DashMap::new()),
        }
    }

    pub fn layout(&self, interface: &str) -> Option<Arc<InterfaceLayout>> {
        self.layouts.get(interface).map(|entry| entry.value().clone())
    }

    pub fn insert_layout(&self, interface: &str, layout: Arc<InterfaceLayout>) {
        self.layouts.insert(interface.to_string(), layout);
    }

    pub fn table(&self, interface: &str) -> Option<Arc<FunctionTable>> {
        self.tables.get(interface).map(|entry| entry.value().clone())
    }

    pub fn insert_table(&self, interface: &str, table: Arc<FunctionTable>) {
        self.tables.insert(interface.to_string(), table);
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
