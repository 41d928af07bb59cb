// Canonical function/method identities used as call graph node keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical identity of a declared or called function.
///
/// Two identities are equal iff all four fields are equal. The rendered
/// form `scope.qualifier.name.signature` (qualifier omitted for free
/// functions) is stable and usable as a plain-text map key.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FunctionIdentity {
    /// Crate (or loose-file) name the declaration lives in.
    pub scope: String,
    /// Receiver type name, interface name, or empty for free functions.
    pub qualifier: String,
    /// Simple declared name.
    pub name: String,
    /// Canonical signature text, e.g. `fn(i32) -> String`.
    pub signature: String,
}

impl FunctionIdentity {
    pub fn free(scope: &str, name: &str, signature: &str) -> Self {
        Self {
            scope: scope.to_string(),
            qualifier: String::new(),
            name: name.to_string(),
            signature: signature.to_string(),
        }
    }

    pub fn method(scope: &str, qualifier: &str, name: &str, signature: &str) -> Self {
        Self {
            scope: scope.to_string(),
            qualifier: qualifier.to_string(),
            name: name.to_string(),
            signature: signature.to_string(),
        }
    }

    /// Stable textual key.
    pub fn id(&self) -> String {
        if self.qualifier.is_empty() {
            format!("{}.{}.{}", self.scope, self.name, self.signature)
        } else {
            format!("{}.{}.{}.{}", self.scope, self.qualifier, self.name, self.signature)
        }
    }

    /// The zero identity stands in for "no enclosing declaration", e.g. a
    /// marker call in a const initializer at unit scope.
    pub fn is_zero(&self) -> bool {
        self.scope.is_empty() && self.qualifier.is_empty() && self.name.is_empty()
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}
