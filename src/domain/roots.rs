// Root function location: every call site targeting the marker label,
// recorded as the identity of its lexically enclosing declaration.

use crate::domain::identity::FunctionIdentity;
use crate::domain::program::{render_signature, type_name_of, Program};
use crate::domain::resolver::{callee_path, IdentityResolver};
use syn::visit::{self, Visit};

/// Default marker call name that flags a root function.
pub const DEFAULT_MARKER_LABEL: &str = "trace_entry_point";

/// Walk call expressions in each (filtered) unit, tracking the innermost
/// enclosing declaration identity. Every call whose target name equals the
/// marker label appends the current enclosing identity. The result is a
/// sequence, not a set: a function calling the marker twice appears twice.
pub fn locate_roots(
    program: &Program,
    resolver: &mut IdentityResolver,
    marker_label: &str,
    path_filter: Option<&str>,
) -> Vec<FunctionIdentity> {
    let mut roots = Vec::new();
    for unit in &program.units {
        if let Some(pattern) = path_filter {
            if !unit.path.contains(pattern) {
                continue;
            }
        }
        let mut visitor = RootVisitor {
            scope: &unit.scope,
            resolver: &mut *resolver,
            marker_label,
            current: FunctionIdentity::default(),
            impl_type: None,
            trait_name: None,
            roots: &mut roots,
        };
        visitor.visit_file(&unit.ast);
    }
    roots
}

struct RootVisitor<'a, 'i> {
    scope: &'a str,
    resolver: &'a mut IdentityResolver<'i>,
    marker_label: &'a str,
    // Zero identity until the first declaration is entered; a marker call
    // at unit scope records the zero identity.
    current: FunctionIdentity,
    impl_type: Option<String>,
    trait_name: Option<String>,
    roots: &'a mut Vec<FunctionIdentity>,
}

impl<'a, 'i> RootVisitor<'a, 'i> {
    fn record_hit(&mut self) {
        println!("[retrograph] root hit: {} calls {}", self.current, self.marker_label);
        self.roots.push(self.current.clone());
    }
}

impl<'a, 'i, 'ast> Visit<'ast> for RootVisitor<'a, 'i> {
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        let signature = render_signature(&node.sig);
        self.current = self.resolver.enclosing_identity(
            self.scope,
            None,
            &node.sig.ident.to_string(),
            &signature,
        );
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
            self.current = self.resolver.enclosing_identity(
                self.scope,
                Some(&receiver),
                &node.sig.ident.to_string(),
                &signature,
            );
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
        if node.default.is_some() {
            if let Some(trait_name) = self.trait_name.clone() {
                let signature = render_signature(&node.sig);
                self.current = FunctionIdentity::method(
                    self.scope,
                    &trait_name,
                    &node.sig.ident.to_string(),
                    &signature,
                );
            }
        }
        visit::visit_trait_item_fn(self, node);
    }

    fn visit_expr_call(&mut self, node: &'ast syn::ExprCall) {
        if let Some(path) = callee_path(&node.func) {
            if let Some(segment) = path.segments.last() {
                if segment.ident == self.marker_label {
                    self.record_hit();
                }
            }
        }
        visit::visit_expr_call(self, node);
    }

    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        if node.method == self.marker_label {
            self.record_hit();
        }
        visit::visit_expr_method_call(self, node);
    }
}
