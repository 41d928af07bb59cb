// Frontend data contract: parsed compilation units plus the merged
// symbol-resolution table the analysis phases consume.

use dashmap::DashMap;
use quote::ToTokens;
use std::collections::{BTreeMap, BTreeSet};

/// One source file as seen by the frontend.
#[derive(Debug)]
pub struct CompilationUnit {
    /// Crate name, or the file stem for loose files.
    pub scope: String,
    /// Resolved source path; the CLI path filter matches against this.
    pub path: String,
    pub ast: syn::File,
}

/// A declared function or method as recorded by the frontend.
#[derive(Debug, Clone)]
pub struct FnDef {
    pub name: String,
    pub signature: String,
    /// Crate the declaration lives in.
    pub scope: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Struct,
    Enum,
    Trait,
}

/// A named type declaration. Traits carry their declared method set,
/// structs their named field types.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub scope: String,
    /// Trait kind only: method name -> canonical signature.
    pub methods: BTreeMap<String, String>,
    /// Struct kind only: field name -> type name.
    pub fields: BTreeMap<String, String>,
}

/// A resolved method-call selection: receiver type plus target method.
#[derive(Debug, Clone)]
pub struct Selection {
    pub receiver_type: String,
    pub method: String,
}

/// Call sites are keyed by source position: (unit path, line, column).
pub type SelectionKey = (String, usize, usize);

/// The merged symbol-resolution table. All maps are sharded concurrent
/// maps so parallel frontend workers can merge partial results one entry
/// at a time without a global critical section.
#[derive(Debug, Default)]
pub struct TypeInfo {
    /// (scope, name) -> free function definition.
    pub functions: DashMap<(String, String), FnDef>,
    /// name -> scopes declaring a free function of that name.
    pub fn_scopes: DashMap<String, Vec<String>>,
    /// (type name, method name) -> method definition.
    pub methods: DashMap<(String, String), FnDef>,
    /// Concrete type -> its full method set (method name -> signature).
    pub method_sets: DashMap<String, BTreeMap<String, String>>,
    /// Type name -> declaration (structs, enums, traits).
    pub type_decls: DashMap<String, TypeDecl>,
    /// Concrete type -> trait names it explicitly implements.
    pub trait_impls: DashMap<String, BTreeSet<String>>,
    /// Method call site -> resolved selection.
    pub selections: DashMap<SelectionKey, Selection>,
}

impl TypeInfo {
    /// Resolve an unqualified function name: the calling unit's own scope
    /// wins; otherwise fall back to the (sorted, so deterministic) first
    /// scope that declares the name.
    pub fn lookup_function(&self, scope: &str, name: &str) -> Option<FnDef> {
        let key = (scope.to_string(), name.to_string());
        if let Some(def) = self.functions.get(&key) {
            return Some(def.clone());
        }
        let mut scopes = self.fn_scopes.get(name).map(|s| s.clone())?;
        scopes.sort();
        let fallback = scopes.first()?;
        self.functions
            .get(&(fallback.clone(), name.to_string()))
            .map(|d| d.clone())
    }

    /// Signature of a method on a concrete type, trait-provided defaults
    /// included.
    pub fn method_signature(&self, type_name: &str, method: &str) -> Option<String> {
        self.method_sets
            .get(type_name)
            .and_then(|set| set.get(method).cloned())
    }
}

/// The frontend's whole output: every parsed unit plus the merged table.
#[derive(Debug)]
pub struct Program {
    pub units: Vec<CompilationUnit>,
    pub info: TypeInfo,
}

/// Canonical signature text for a declaration: receiver dropped,
/// parameter and result types token-rendered with normalized spacing.
pub fn render_signature(sig: &syn::Signature) -> String {
    let mut params = Vec::new();
    for input in &sig.inputs {
        if let syn::FnArg::Typed(pt) = input {
            params.push(render_type(&pt.ty));
        }
    }
    match &sig.output {
        syn::ReturnType::Default => format!("fn({})", params.join(", ")),
        syn::ReturnType::Type(_, ty) => {
            format!("fn({}) -> {}", params.join(", "), render_type(ty))
        }
    }
}

/// Token-render a type with whitespace kept only between word tokens, so
/// `Vec < String >` prints as `Vec<String>` but `dyn Fmt` keeps its space.
pub fn render_type(ty: &syn::Type) -> String {
    normalize_tokens(&ty.to_token_stream().to_string())
}

fn normalize_tokens(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    for (i, &c) in chars.iter().enumerate() {
        if c != ' ' {
            out.push(c);
            continue;
        }
        let prev_word = out
            .chars()
            .last()
            .map_or(false, |p| p.is_alphanumeric() || p == '_');
        let next_word = chars
            .get(i + 1)
            .map_or(false, |n| n.is_alphanumeric() || *n == '_');
        if prev_word && next_word {
            out.push(' ');
        }
    }
    out
}

/// The simple name of a type, looking through references, parens and the
/// common smart pointers. Returns None for shapes that have no single
/// nominal type (tuples, slices, trait objects, ...).
pub fn type_name_of(ty: &syn::Type) -> Option<String> {
    match ty {
        syn::Type::Path(tp) => {
            let segment = tp.path.segments.last()?;
            let ident = segment.ident.to_string();
            if matches!(ident.as_str(), "Box" | "Rc" | "Arc") {
                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    for arg in &args.args {
                        if let syn::GenericArgument::Type(inner) = arg {
                            return type_name_of(inner);
                        }
                    }
                }
            }
            Some(ident)
        }
        syn::Type::Reference(r) => type_name_of(&r.elem),
        syn::Type::Paren(p) => type_name_of(&p.elem),
        syn::Type::Group(g) => type_name_of(&g.elem),
        _ => None,
    }
}
