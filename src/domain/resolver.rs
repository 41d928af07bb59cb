// Identity resolution: canonical identities for declarations and call
// sites, interface-qualifier resolution, and callee expression unwrapping.

use crate::domain::identity::FunctionIdentity;
use crate::domain::interfaces::InterfaceRegistry;
use crate::domain::program::TypeInfo;
use std::collections::HashMap;

/// Resolves declarations and call sites into canonical identities.
///
/// Interface resolution walks candidates in ascending name order and keeps
/// the last match, so a receiver satisfying several interfaces always
/// resolves to the lexicographically greatest name.
pub struct IdentityResolver<'a> {
    info: &'a TypeInfo,
    registry: &'a InterfaceRegistry,
    // satisfies() is re-evaluated for every declaration and call site, so
    // results are cached per (type, interface) pair.
    satisfies_cache: HashMap<(String, String), bool>,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(info: &'a TypeInfo, registry: &'a InterfaceRegistry) -> Self {
        Self { info, registry, satisfies_cache: HashMap::new() }
    }

    pub fn info(&self) -> &'a TypeInfo {
        self.info
    }

    /// Does `type_name` satisfy the named interface? True when the type
    /// explicitly implements the trait, or when its method set structurally
    /// contains every interface method with an equal signature.
    pub fn satisfies(&mut self, type_name: &str, interface: &str) -> bool {
        let key = (type_name.to_string(), interface.to_string());
        if let Some(&hit) = self.satisfies_cache.get(&key) {
            return hit;
        }
        let result = self.check_satisfies(type_name, interface);
        self.satisfies_cache.insert(key, result);
        result
    }

    fn check_satisfies(&self, type_name: &str, interface: &str) -> bool {
        let Some(descriptor) = self.registry.get(interface) else {
            return false;
        };
        if let Some(impls) = self.info.trait_impls.get(type_name) {
            if impls.contains(interface) {
                return true;
            }
        }
        let Some(method_set) = self.info.method_sets.get(type_name) else {
            return false;
        };
        descriptor
            .methods
            .iter()
            .all(|(name, sig)| method_set.get(name) == Some(sig))
    }

    /// The interface qualifier for a receiver type, if any: last match in
    /// name order.
    pub fn interface_for_receiver(&mut self, type_name: &str) -> Option<String> {
        let candidates: Vec<String> = self.registry.names().cloned().collect();
        let mut winner = None;
        for candidate in candidates {
            if self.satisfies(type_name, &candidate) {
                winner = Some(candidate);
            }
        }
        winner
    }

    /// The identities a declaration registers under: its concrete identity,
    /// plus an interface-qualified twin when the receiver type satisfies
    /// some interface.
    pub fn declaration_identities(
        &mut self,
        scope: &str,
        receiver: Option<&str>,
        name: &str,
        signature: &str,
    ) -> (FunctionIdentity, Option<FunctionIdentity>) {
        match receiver {
            None => (FunctionIdentity::free(scope, name, signature), None),
            Some(receiver_type) => {
                let concrete = FunctionIdentity::method(scope, receiver_type, name, signature);
                let interface = self
                    .interface_for_receiver(receiver_type)
                    .map(|i| FunctionIdentity::method(scope, &i, name, signature));
                (concrete, interface)
            }
        }
    }

    /// The single identity recorded for an enclosing declaration while
    /// walking call sites: interface-qualified when resolvable, concrete
    /// otherwise.
    pub fn enclosing_identity(
        &mut self,
        scope: &str,
        receiver: Option<&str>,
        name: &str,
        signature: &str,
    ) -> FunctionIdentity {
        let (concrete, interface) = self.declaration_identities(scope, receiver, name, signature);
        interface.unwrap_or(concrete)
    }
}

/// Unwrap a call's callee expression down to its path, through the closed
/// set of shapes the resolver understands. Any other shape is an explicit
/// "unresolvable" outcome and the call is dropped from graph consideration.
pub fn callee_path(expr: &syn::Expr) -> Option<&syn::Path> {
    match expr {
        syn::Expr::Path(p) if p.qself.is_none() => Some(&p.path),
        syn::Expr::Paren(e) => callee_path(&e.expr),
        syn::Expr::Group(e) => callee_path(&e.expr),
        syn::Expr::Reference(e) => callee_path(&e.expr),
        _ => None,
    }
}
