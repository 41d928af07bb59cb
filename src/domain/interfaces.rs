// Interface registry: every trait declaration in the program, minus the
// universal zero-method case.

use crate::domain::program::{TypeInfo, TypeKind};
use std::collections::BTreeMap;

/// A named interface (trait) and its declared method set.
#[derive(Debug, Clone)]
pub struct InterfaceDescriptor {
    pub name: String,
    /// Method name -> canonical signature. Immutable after registry build.
    pub methods: BTreeMap<String, String>,
}

/// All resolvable interfaces, keyed and iterated in name order.
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    interfaces: BTreeMap<String, InterfaceDescriptor>,
}

impl InterfaceRegistry {
    /// Scan the type-declaration table for trait-kind entries. Traits with
    /// an empty method set are structurally satisfied by every type and
    /// would absorb every method qualifier, so they stay out of the
    /// registry.
    pub fn from_type_info(info: &TypeInfo) -> Self {
        let mut interfaces = BTreeMap::new();
        for entry in info.type_decls.iter() {
            let decl = entry.value();
            if decl.kind != TypeKind::Trait || decl.methods.is_empty() {
                continue;
            }
            interfaces.insert(
                decl.name.clone(),
                InterfaceDescriptor { name: decl.name.clone(), methods: decl.methods.clone() },
            );
        }
        Self { interfaces }
    }

    pub fn get(&self, name: &str) -> Option<&InterfaceDescriptor> {
        self.interfaces.get(name)
    }

    /// Interface names in ascending lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.interfaces.keys()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
