use alloc::{borrow::Cow, boxed::Box, vec::Vec};

use super::InstantiateErrorKind;
use crate::{
    key::{KeyPath, MapKey, TypeInfo},
    scope::ScopeData,
    Key,
};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Binding for {key} not found from component {component}")]
    NoBinding { key: Key, component: Cow<'static, str> },
    #[error(
        "\
        Binding for {key} is not accessible. \
        Owning scope: {expected_scope_data}, requesting scope: {actual_scope_data}\
        "
    )]
    NoAccessible {
        key: Key,
        expected_scope_data: ScopeData,
        actual_scope_data: ScopeData,
    },
    #[error("Instance for {key} wasn't supplied to the builder")]
    MissingInstance { key: Key },
    #[error("Incorrect provided type for {key}. Expected: {}", .expected.name)]
    IncorrectType { key: Key, expected: TypeInfo },
    #[error("Dependency of type {} wasn't declared by the factory", .expected.name)]
    NotDeclared { expected: TypeInfo },
    #[error("Cyclic dependency detected at runtime: {}", KeyPath(.path))]
    Cycle { path: Vec<Key> },
    #[error("Resolution depth {depth} exceeded")]
    DepthExceeded { depth: usize },
    #[error("Map key {map_key} is contributed more than once to {key}")]
    DuplicateMapKey { key: Key, map_key: MapKey },
    #[error("Factory for {key} failed: {source}")]
    Factory {
        key: Key,
        #[source]
        source: Box<InstantiateErrorKind>,
    },
}

impl ResolveErrorKind {
    /// Returns the factory error if the resolution failed inside a factory body.
    #[inline]
    #[must_use]
    pub fn factory_error(&self) -> Option<&InstantiateErrorKind> {
        match self {
            ResolveErrorKind::Factory { source, .. } => Some(source),
            _ => None,
        }
    }
}
