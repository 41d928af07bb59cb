// Declaration indexing: every function/method declaration in the program
// recorded under its canonical identity set.

use crate::domain::identity::FunctionIdentity;
use crate::domain::program::{render_signature, type_name_of, Program};
use crate::domain::resolver::IdentityResolver;
use std::collections::BTreeSet;
use syn::visit::{self, Visit};

/// The set of declared identities. A call is only graph-relevant if its
/// resolved callee identity is a member.
#[derive(Debug, Default)]
pub struct DeclarationSet {
    entries: BTreeSet<FunctionIdentity>,
}

impl DeclarationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identity: FunctionIdentity) {
        self.entries.insert(identity);
    }

    pub fn contains(&self, identity: &FunctionIdentity) -> bool {
        self.entries.contains(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionIdentity> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Walk every declaration in each (filtered) unit and record its identity
/// set: the concrete identity always, the interface-qualified identity
/// when the receiver satisfies one. Insertion is idempotent.
pub fn index_program(
    program: &Program,
    resolver: &mut IdentityResolver,
    path_filter: Option<&str>,
) -> DeclarationSet {
    let mut set = DeclarationSet::new();
    for unit in &program.units {
        if let Some(pattern) = path_filter {
            if !unit.path.contains(pattern) {
                continue;
            }
        }
        let mut visitor = DeclVisitor {
            scope: &unit.scope,
            resolver: &mut *resolver,
            set: &mut set,
            impl_type: None,
            trait_name: None,
        };
        visitor.visit_file(&unit.ast);
    }
    set
}

struct DeclVisitor<'a, 'i> {
    scope: &'a str,
    resolver: &'a mut IdentityResolver<'i>,
    set: &'a mut DeclarationSet,
    impl_type: Option<String>,
    trait_name: Option<String>,
}

impl<'a, 'i, 'ast> Visit<'ast> for DeclVisitor<'a, 'i> {
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        let signature = render_signature(&node.sig);
        let (concrete, _) = self.resolver.declaration_identities(
            self.scope,
            None,
            &node.sig.ident.to_string(),
            &signature,
        );
        self.set.insert(concrete);
        visit::visit_item_fn(self, node);
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        let previous = self.impl_type.take();
        self.impl_type = type_name_of(&node.self_ty);
        visit::visit_item_impl(self, node);
        self.impl_type = previous;
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        if let Some(receiver) = self.impl_type.clone() {
            let signature = render_signature(&node.sig);
            let (concrete, interface) = self.resolver.declaration_identities(
                self.scope,
                Some(&receiver),
                &node.sig.ident.to_string(),
                &signature,
            );
            self.set.insert(concrete);
            if let Some(interface) = interface {
                self.set.insert(interface);
            }
        }
        visit::visit_impl_item_fn(self, node);
    }

    fn visit_item_trait(&mut self, node: &'ast syn::ItemTrait) {
        let previous = self.trait_name.take();
        self.trait_name = Some(node.ident.to_string());
        visit::visit_item_trait(self, node);
        self.trait_name = previous;
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        // Only defaulted trait methods are declarations with a body; they
        // register directly under the trait qualifier.
        if node.default.is_some() {
            if let Some(trait_name) = self.trait_name.clone() {
                let signature = render_signature(&node.sig);
                self.set.insert(FunctionIdentity::method(
                    self.scope,
                    &trait_name,
                    &node.sig.ident.to_string(),
                    &signature,
                ));
            }
        }
        visit::visit_trait_item_fn(self, node);
    }
}
