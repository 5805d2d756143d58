use alloc::{borrow::Cow, vec::Vec};
use core::fmt::{self, Display, Formatter};

use crate::{
    key::{KeyPath, MapKey},
    scope::ScopeData,
    Key,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    #[error("Missing binding for {key} required by {} in component {component}", Requester(.required_by))]
    MissingBinding {
        key: Key,
        required_by: Option<Key>,
        component: Cow<'static, str>,
    },
    #[error("Cyclic dependency detected: {}", KeyPath(.path))]
    Cycle { path: Vec<Key> },
    #[error(
        "\
        Binding for {key} with scope {declared_scope} in component {installed_at} \
        doesn't match the component installing or consuming it\
        "
    )]
    ScopeMismatch {
        key: Key,
        declared_scope: ScopeData,
        installed_at: Cow<'static, str>,
    },
    #[error("Map key {map_key} is contributed more than once to {key}")]
    DuplicateMapKey { key: Key, map_key: MapKey },
    #[error("Component with index {index} not found in registry")]
    UnknownComponent { index: usize },
}

struct Requester<'a>(&'a Option<Key>);

impl Display for Requester<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(key) => write!(f, "{key}"),
            None => f.write_str("entry point"),
        }
    }
}
