// Backward call graph construction: callee identity -> callers.

use crate::domain::declarations::DeclarationSet;
use crate::domain::identity::FunctionIdentity;
use crate::domain::program::{render_signature, type_name_of, Program, TypeInfo, TypeKind};
use crate::domain::resolver::{callee_path, IdentityResolver};
use std::collections::BTreeMap;
use syn::visit::{self, Visit};

/// Mapping from callee identity to the identities that call it. Edges are
/// append-only with set semantics per callee; self-calls are valid edges.
#[derive(Debug, Default)]
pub struct CallGraph {
    edges: BTreeMap<FunctionIdentity, Vec<FunctionIdentity>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, callee: FunctionIdentity, caller: FunctionIdentity) {
        let callers = self.edges.entry(callee).or_default();
        // Linear dedup scan; fan-in per callee is small in practice.
        if !callers.contains(&caller) {
            callers.push(caller);
        }
    }

    pub fn callers(&self, callee: &FunctionIdentity) -> Option<&[FunctionIdentity]> {
        self.edges.get(callee).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FunctionIdentity, &Vec<FunctionIdentity>)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Walk call expressions in each (filtered) unit and append backward
/// edges. Calls whose resolved identity is not in the declaration set are
/// dropped: they reference external or unresolved functions.
pub fn build_graph(
    program: &Program,
    resolver: &mut IdentityResolver,
    declarations: &DeclarationSet,
    path_filter: Option<&str>,
) -> CallGraph {
    let mut graph = CallGraph::new();
    let info = resolver.info();
    for unit in &program.units {
        if let Some(pattern) = path_filter {
            if !unit.path.contains(pattern) {
                continue;
            }
        }
        let mut visitor = GraphVisitor {
            scope: &unit.scope,
            path: &unit.path,
            info,
            resolver: &mut *resolver,
            declarations,
            graph: &mut graph,
            current: FunctionIdentity::default(),
            impl_type: None,
            trait_name: None,
        };
        visitor.visit_file(&unit.ast);
    }
    graph
}

struct GraphVisitor<'a, 'i> {
    scope: &'a str,
    path: &'a str,
    info: &'i TypeInfo,
    resolver: &'a mut IdentityResolver<'i>,
    declarations: &'a DeclarationSet,
    graph: &'a mut CallGraph,
    current: FunctionIdentity,
    impl_type: Option<String>,
    trait_name: Option<String>,
}

impl<'a, 'i> GraphVisitor<'a, 'i> {
    fn add_if_declared(&mut self, callee: FunctionIdentity) {
        if self.declarations.contains(&callee) {
            self.graph.add_edge(callee, self.current.clone());
        }
    }

    fn resolve_path_call(&mut self, path: &syn::Path) {
        let segments: Vec<String> =
            path.segments.iter().map(|s| s.ident.to_string()).collect();
        match segments.as_slice() {
            [] => {}
            [name] => {
                if let Some(def) = self.info.lookup_function(self.scope, name) {
                    self.add_if_declared(FunctionIdentity::free(&def.scope, name, &def.signature));
                }
            }
            [first, .., last] => {
                if first == "crate" || first == "self" {
                    let key = (self.scope.to_string(), last.clone());
                    if let Some(def) = self.info.functions.get(&key).map(|d| d.clone()) {
                        self.add_if_declared(FunctionIdentity::free(
                            self.scope,
                            last,
                            &def.signature,
                        ));
                    }
                    return;
                }
                let type_target = if first == "Self" {
                    self.impl_type.clone()
                } else {
                    Some(first.clone())
                };
                if let Some(type_name) = type_target {
                    if let Some(decl) = self.info.type_decls.get(&type_name).map(|d| d.clone()) {
                        match decl.kind {
                            TypeKind::Trait => {
                                if let Some(sig) = decl.methods.get(last) {
                                    self.add_if_declared(FunctionIdentity::method(
                                        &decl.scope,
                                        &decl.name,
                                        last,
                                        sig,
                                    ));
                                }
                            }
                            TypeKind::Struct | TypeKind::Enum => {
                                self.resolve_method(&decl.name, last);
                            }
                        }
                        return;
                    }
                }
                // First segment may name another crate's free function.
                let key = (first.clone(), last.clone());
                if let Some(def) = self.info.functions.get(&key).map(|d| d.clone()) {
                    self.add_if_declared(FunctionIdentity::free(first, last, &def.signature));
                }
            }
        }
    }

    /// Method resolution honoring interface-qualifier preference: probe the
    /// interface identity first, fall back to whichever of the two did
    /// register, drop the call if neither is declared.
    fn resolve_method(&mut self, type_name: &str, method: &str) {
        let key = (type_name.to_string(), method.to_string());
        let Some(def) = self.info.methods.get(&key).map(|d| d.clone()) else {
            return;
        };
        let (concrete, interface) = self.resolver.declaration_identities(
            &def.scope,
            Some(type_name),
            method,
            &def.signature,
        );
        if let Some(interface) = interface {
            if self.declarations.contains(&interface) {
                self.graph.add_edge(interface, self.current.clone());
                return;
            }
        }
        self.add_if_declared(concrete);
    }
}

impl<'a, 'i, 'ast> Visit<'ast> for GraphVisitor<'a, 'i> {
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
            self.resolve_path_call(path);
        }
        visit::visit_expr_call(self, node);
    }

    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        let position = node.method.span().start();
        let key = (self.path.to_string(), position.line, position.column);
        if let Some(selection) = self.info.selections.get(&key).map(|s| s.clone()) {
            self.resolve_method(&selection.receiver_type, &selection.method);
        }
        visit::visit_expr_method_call(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::declarations::index_program;
    use crate::domain::interfaces::InterfaceRegistry;
    use crate::infrastructure::frontend::Frontend;

    fn analyze(sources: Vec<(&str, &str, &str)>) -> (DeclarationSet, CallGraph) {
        let program = Frontend::load(
            sources
                .into_iter()
                .map(|(s, p, c)| (s.to_string(), p.to_string(), c.to_string()))
                .collect(),
        )
        .unwrap();
        let registry = InterfaceRegistry::from_type_info(&program.info);
        let mut resolver = IdentityResolver::new(&program.info, &registry);
        let declarations = index_program(&program, &mut resolver, None);
        let graph = build_graph(&program, &mut resolver, &declarations, None);
        (declarations, graph)
    }

    #[test]
    fn test_simple_backward_edge() {
        let src = "fn a() { b(); }\nfn b() {}\nfn c() {}";
        let (decls, graph) = analyze(vec![("app", "src/lib.rs", src)]);

        assert_eq!(decls.len(), 3);
        let b = FunctionIdentity::free("app", "b", "fn()");
        let a = FunctionIdentity::free("app", "a", "fn()");
        assert_eq!(graph.callers(&b), Some(&[a][..]));
        // c calls nothing and nothing calls c.
        let c = FunctionIdentity::free("app", "c", "fn()");
        assert!(graph.callers(&c).is_none());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_undeclared_callee_is_dropped() {
        let src = "fn a() { external_helper(); }";
        let (_, graph) = analyze(vec![("app", "src/lib.rs", src)]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_duplicate_calls_produce_one_edge() {
        let src = "fn a() { b(); b(); }\nfn b() {}";
        let (_, graph) = analyze(vec![("app", "src/lib.rs", src)]);
        let b = FunctionIdentity::free("app", "b", "fn()");
        assert_eq!(graph.callers(&b).unwrap().len(), 1);
    }

    #[test]
    fn test_self_call_is_preserved() {
        let src = "fn looper() { looper(); }";
        let (_, graph) = analyze(vec![("app", "src/lib.rs", src)]);
        let looper = FunctionIdentity::free("app", "looper", "fn()");
        assert_eq!(graph.callers(&looper), Some(&[looper.clone()][..]));
    }

    #[test]
    fn test_two_callers_both_recorded() {
        let src = "fn a() { shared(); }\nfn b() { shared(); }\nfn shared() {}";
        let (_, graph) = analyze(vec![("app", "src/lib.rs", src)]);
        let shared = FunctionIdentity::free("app", "shared", "fn()");
        let callers = graph.callers(&shared).unwrap();
        assert_eq!(callers.len(), 2);
    }

    #[test]
    fn test_method_call_resolves_through_binding() {
        let src = r#"
            struct Engine;
            impl Engine {
                fn start(&self) {}
            }
            fn boot() {
                let engine = Engine;
                engine.start();
            }
        "#;
        let (_, graph) = analyze(vec![("app", "src/lib.rs", src)]);
        let start = FunctionIdentity::method("app", "Engine", "start", "fn()");
        let boot = FunctionIdentity::free("app", "boot", "fn()");
        assert_eq!(graph.callers(&start), Some(&[boot][..]));
    }

    #[test]
    fn test_interface_qualifier_preferred_for_caller_and_callee() {
        let src = r#"
            trait Runner { fn run(&self); }
            struct Job;
            impl Runner for Job {
                fn run(&self) { tick(); }
            }
            fn tick() {}
        "#;
        let (decls, graph) = analyze(vec![("app", "src/lib.rs", src)]);

        // Dual registration on the declaration side.
        assert!(decls.contains(&FunctionIdentity::method("app", "Job", "run", "fn()")));
        assert!(decls.contains(&FunctionIdentity::method("app", "Runner", "run", "fn()")));

        // The enclosing identity recorded for the caller side prefers the
        // interface qualifier.
        let tick = FunctionIdentity::free("app", "tick", "fn()");
        let callers = graph.callers(&tick).unwrap();
        assert_eq!(callers, &[FunctionIdentity::method("app", "Runner", "run", "fn()")]);
    }

    #[test]
    fn test_method_callee_resolves_to_interface_identity() {
        let src = r#"
            trait Runner { fn run(&self); }
            struct Job;
            impl Runner for Job {
                fn run(&self) {}
            }
            fn launch(job: Job) {
                job.run();
            }
        "#;
        let (_, graph) = analyze(vec![("app", "src/lib.rs", src)]);
        let interface = FunctionIdentity::method("app", "Runner", "run", "fn()");
        let launch = FunctionIdentity::free("app", "launch", "fn(Job)");
        assert_eq!(graph.callers(&interface), Some(&[launch][..]));
    }

    #[test]
    fn test_assoc_fn_call_through_type_path() {
        let src = r#"
            struct Pool;
            impl Pool {
                fn create() -> Pool { Pool }
            }
            fn setup() {
                let _pool = Pool::create();
            }
        "#;
        let (_, graph) = analyze(vec![("app", "src/lib.rs", src)]);
        let create = FunctionIdentity::method("app", "Pool", "create", "fn() -> Pool");
        let setup = FunctionIdentity::free("app", "setup", "fn()");
        assert_eq!(graph.callers(&create), Some(&[setup][..]));
    }

    #[test]
    fn test_cross_crate_call_via_path() {
        let lib = "pub fn shared_helper() {}";
        let bin = "fn main() { util::shared_helper(); }";
        let (_, graph) = analyze(vec![
            ("util", "util/src/lib.rs", lib),
            ("app", "app/src/main.rs", bin),
        ]);
        let helper = FunctionIdentity::free("util", "shared_helper", "fn()");
        let main_id = FunctionIdentity::free("app", "main", "fn()");
        assert_eq!(graph.callers(&helper), Some(&[main_id][..]));
    }

    #[test]
    fn test_unqualified_cross_crate_call_falls_back() {
        let lib = "pub fn imported() {}";
        let bin = "fn main() { imported(); }";
        let (_, graph) = analyze(vec![
            ("util", "util/src/lib.rs", lib),
            ("app", "app/src/main.rs", bin),
        ]);
        let imported = FunctionIdentity::free("util", "imported", "fn()");
        assert!(graph.callers(&imported).is_some());
    }

    #[test]
    fn test_self_type_call_inside_impl() {
        let src = r#"
            struct Cache;
            impl Cache {
                fn evict(&self) { Self::log(); }
                fn log() {}
            }
        "#;
        let (_, graph) = analyze(vec![("app", "src/lib.rs", src)]);
        let log = FunctionIdentity::method("app", "Cache", "log", "fn()");
        let evict = FunctionIdentity::method("app", "Cache", "evict", "fn()");
        assert_eq!(graph.callers(&log), Some(&[evict][..]));
    }

    #[test]
    fn test_trait_default_method_call_edge() {
        let src = r#"
            trait Logger {
                fn log(&self);
                fn log_all(&self) { self.log(); }
            }
            struct Console;
            impl Logger for Console {
                fn log(&self) {}
            }
            fn report(c: Console) {
                c.log_all();
            }
        "#;
        let (_, graph) = analyze(vec![("app", "src/lib.rs", src)]);
        // log_all is only declared on the trait; the call resolves to the
        // interface-qualified identity.
        let log_all = FunctionIdentity::method("app", "Logger", "log_all", "fn()");
        let report = FunctionIdentity::free("app", "report", "fn(Console)");
        assert_eq!(graph.callers(&log_all), Some(&[report][..]));
    }
}
