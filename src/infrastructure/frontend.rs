// The language frontend: parses compilation units with syn and builds the
// merged symbol-resolution table the analysis phases consume.
//
// Units are processed in parallel; every worker merges its partial results
// into the shared sharded maps one entry at a time. Two passes with a
// barrier between them: declarations first, then call-site resolution
// against the completed tables.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use syn::visit::{self, Visit};

use crate::domain::program::{
    render_signature, type_name_of, CompilationUnit, FnDef, Program, Selection, TypeDecl,
    TypeInfo, TypeKind,
};
use crate::domain::resolver::callee_path;

pub struct Frontend;

impl Frontend {
    /// Build a `Program` from `(scope, path, source)` triples. A file that
    /// fails to parse aborts the whole load; no partial table is produced.
    pub fn load(sources: Vec<(String, String, String)>) -> Result<Program> {
        let units: Vec<CompilationUnit> = sources
            .into_par_iter()
            .map(|(scope, path, code)| {
                let ast = syn::parse_file(&code)
                    .with_context(|| format!("Failed to parse {}", path))?;
                Ok(CompilationUnit { scope, path, ast })
            })
            .collect::<Result<Vec<_>>>()?;

        let info = TypeInfo::default();

        units
            .par_iter()
            .for_each(|unit| index_items(&unit.scope, &unit.ast.items, &info));

        // All workers joined: the declaration tables are complete. Fold
        // trait-provided default methods into implementing types before
        // call sites are resolved against the method sets.
        merge_trait_defaults(&info);

        units
            .par_iter()
            .for_each(|unit| resolve_items(&unit.path, &unit.ast.items, &info));

        Ok(Program { units, info })
    }
}

fn index_items(scope: &str, items: &[syn::Item], info: &TypeInfo) {
    for item in items {
        match item {
            syn::Item::Fn(func) => {
                let name = func.sig.ident.to_string();
                let def = FnDef {
                    name: name.clone(),
                    signature: render_signature(&func.sig),
                    scope: scope.to_string(),
                };
                info.functions.insert((scope.to_string(), name.clone()), def);
                let mut scopes = info.fn_scopes.entry(name).or_default();
                if !scopes.iter().any(|s| s == scope) {
                    scopes.push(scope.to_string());
                }
            }
            syn::Item::Impl(imp) => {
                let Some(type_name) = type_name_of(&imp.self_ty) else {
                    continue;
                };
                if let Some((_, trait_path, _)) = &imp.trait_ {
                    if let Some(segment) = trait_path.segments.last() {
                        info.trait_impls
                            .entry(type_name.clone())
                            .or_default()
                            .insert(segment.ident.to_string());
                    }
                }
                for impl_item in &imp.items {
                    if let syn::ImplItem::Fn(method) = impl_item {
                        let method_name = method.sig.ident.to_string();
                        let signature = render_signature(&method.sig);
                        info.methods.insert(
                            (type_name.clone(), method_name.clone()),
                            FnDef {
                                name: method_name.clone(),
                                signature: signature.clone(),
                                scope: scope.to_string(),
                            },
                        );
                        info.method_sets
                            .entry(type_name.clone())
                            .or_default()
                            .insert(method_name, signature);
                    }
                }
            }
            syn::Item::Trait(tr) => {
                let name = tr.ident.to_string();
                let mut methods = BTreeMap::new();
                for trait_item in &tr.items {
                    if let syn::TraitItem::Fn(f) = trait_item {
                        methods.insert(f.sig.ident.to_string(), render_signature(&f.sig));
                    }
                }
                info.type_decls.insert(
                    name.clone(),
                    TypeDecl {
                        name,
                        kind: TypeKind::Trait,
                        scope: scope.to_string(),
                        methods,
                        fields: BTreeMap::new(),
                    },
                );
            }
            syn::Item::Struct(st) => {
                let name = st.ident.to_string();
                let mut fields = BTreeMap::new();
                if let syn::Fields::Named(named) = &st.fields {
                    for field in &named.named {
                        if let (Some(ident), Some(ty)) = (&field.ident, type_name_of(&field.ty)) {
                            fields.insert(ident.to_string(), ty);
                        }
                    }
                }
                info.type_decls.insert(
                    name.clone(),
                    TypeDecl {
                        name,
                        kind: TypeKind::Struct,
                        scope: scope.to_string(),
                        methods: BTreeMap::new(),
                        fields,
                    },
                );
            }
            syn::Item::Enum(en) => {
                let name = en.ident.to_string();
                info.type_decls.insert(
                    name.clone(),
                    TypeDecl {
                        name,
                        kind: TypeKind::Enum,
                        scope: scope.to_string(),
                        methods: BTreeMap::new(),
                        fields: BTreeMap::new(),
                    },
                );
            }
            syn::Item::Mod(module) => {
                if let Some((_, content)) = &module.content {
                    index_items(scope, content, info);
                }
            }
            _ => {}
        }
    }
}

/// A type implementing a trait also carries the trait's defaulted methods
/// it does not override; calls to those resolve through the trait's
/// declaration.
fn merge_trait_defaults(info: &TypeInfo) {
    for entry in info.trait_impls.iter() {
        let type_name = entry.key();
        for trait_name in entry.value().iter() {
            let Some(decl) = info.type_decls.get(trait_name).map(|d| d.clone()) else {
                continue;
            };
            for (method, signature) in &decl.methods {
                info.method_sets
                    .entry(type_name.clone())
                    .or_default()
                    .entry(method.clone())
                    .or_insert_with(|| signature.clone());
                let key = (type_name.clone(), method.clone());
                if !info.methods.contains_key(&key) {
                    info.methods.insert(
                        key,
                        FnDef {
                            name: method.clone(),
                            signature: signature.clone(),
                            scope: decl.scope.clone(),
                        },
                    );
                }
            }
        }
    }
}

fn resolve_items(path: &str, items: &[syn::Item], info: &TypeInfo) {
    for item in items {
        match item {
            syn::Item::Fn(func) => resolve_body(path, info, None, &func.sig, &func.block),
            syn::Item::Impl(imp) => {
                let self_type = type_name_of(&imp.self_ty);
                for impl_item in &imp.items {
                    if let syn::ImplItem::Fn(method) = impl_item {
                        resolve_body(path, info, self_type.as_deref(), &method.sig, &method.block);
                    }
                }
            }
            syn::Item::Trait(tr) => {
                for trait_item in &tr.items {
                    if let syn::TraitItem::Fn(f) = trait_item {
                        if let Some(block) = &f.default {
                            // No concrete self type inside a trait body;
                            // only non-self receivers can resolve here.
                            resolve_body(path, info, None, &f.sig, block);
                        }
                    }
                }
            }
            syn::Item::Mod(module) => {
                if let Some((_, content)) = &module.content {
                    resolve_items(path, content, info);
                }
            }
            _ => {}
        }
    }
}

fn resolve_body(
    path: &str,
    info: &TypeInfo,
    self_type: Option<&str>,
    sig: &syn::Signature,
    block: &syn::Block,
) {
    let mut resolver = BodyResolver { path, info, bindings: HashMap::new() };
    if let Some(ty) = self_type {
        resolver.bindings.insert("self".to_string(), ty.to_string());
    }
    for input in &sig.inputs {
        if let syn::FnArg::Typed(pt) = input {
            if let syn::Pat::Ident(pi) = &*pt.pat {
                if let Some(ty) = type_name_of(&pt.ty) {
                    resolver.bindings.insert(pi.ident.to_string(), ty);
                }
            }
        }
    }
    resolver.visit_block(block);
}

/// Per-body local type propagation: enough inference to name the receiver
/// type of method calls, never full type checking. Anything it cannot
/// unwrap stays unresolved and the call site simply records no selection.
struct BodyResolver<'a> {
    path: &'a str,
    info: &'a TypeInfo,
    bindings: HashMap<String, String>,
}

impl BodyResolver<'_> {
    fn infer_expr_type(&self, expr: &syn::Expr) -> Option<String> {
        match expr {
            syn::Expr::Path(p) if p.qself.is_none() && p.path.segments.len() == 1 => {
                let ident = p.path.segments[0].ident.to_string();
                if let Some(bound) = self.bindings.get(&ident) {
                    return Some(bound.clone());
                }
                // A bare unit-struct literal such as `Engine`.
                let decl = self.info.type_decls.get(&ident)?;
                if decl.kind == TypeKind::Trait {
                    return None;
                }
                Some(ident)
            }
            syn::Expr::Struct(s) => s.path.segments.last().map(|seg| seg.ident.to_string()),
            syn::Expr::Call(c) => {
                // `Server::new(...)`-style constructors are assumed to
                // yield the named type.
                let callee = callee_path(&c.func)?;
                if callee.segments.len() < 2 {
                    return None;
                }
                let first = callee.segments[0].ident.to_string();
                let decl = self.info.type_decls.get(&first)?;
                if decl.kind == TypeKind::Trait {
                    return None;
                }
                Some(first)
            }
            syn::Expr::Field(f) => {
                let base = self.infer_expr_type(&f.base)?;
                let syn::Member::Named(name) = &f.member else {
                    return None;
                };
                let decl = self.info.type_decls.get(&base)?;
                decl.fields.get(&name.to_string()).cloned()
            }
            syn::Expr::Reference(r) => self.infer_expr_type(&r.expr),
            syn::Expr::Paren(p) => self.infer_expr_type(&p.expr),
            syn::Expr::Group(g) => self.infer_expr_type(&g.expr),
            _ => None,
        }
    }
}

impl<'ast> Visit<'ast> for BodyResolver<'_> {
    fn visit_local(&mut self, node: &'ast syn::Local) {
        let (name, annotated) = match &node.pat {
            syn::Pat::Ident(pi) => (Some(pi.ident.to_string()), None),
            syn::Pat::Type(pt) => {
                let name = match &*pt.pat {
                    syn::Pat::Ident(pi) => Some(pi.ident.to_string()),
                    _ => None,
                };
                (name, type_name_of(&pt.ty))
            }
            _ => (None, None),
        };
        if let Some(name) = name {
            let inferred = annotated
                .or_else(|| node.init.as_ref().and_then(|init| self.infer_expr_type(&init.expr)));
            if let Some(ty) = inferred {
                self.bindings.insert(name, ty);
            }
        }
        visit::visit_local(self, node);
    }

    fn visit_expr_closure(&mut self, node: &'ast syn::ExprClosure) {
        for input in &node.inputs {
            if let syn::Pat::Type(pt) = input {
                if let (syn::Pat::Ident(pi), Some(ty)) = (&*pt.pat, type_name_of(&pt.ty)) {
                    self.bindings.insert(pi.ident.to_string(), ty);
                }
            }
        }
        visit::visit_expr_closure(self, node);
    }

    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        if let Some(receiver_type) = self.infer_expr_type(&node.receiver) {
            let method = node.method.to_string();
            if self.info.method_signature(&receiver_type, &method).is_some() {
                let position = node.method.span().start();
                self.info.selections.insert(
                    (self.path.to_string(), position.line, position.column),
                    Selection { receiver_type, method },
                );
            }
        }
        visit::visit_expr_method_call(self, node);
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        // A fn nested in a body gets its own binding scope.
        resolve_body(self.path, self.info, None, &node.sig, &node.block);
    }
}
