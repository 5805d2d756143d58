use alloc::borrow::Cow;

use crate::{key::TypeInfo, scope::ScopeData, Key};

#[derive(thiserror::Error, Debug, Clone)]
pub enum RegistryErrorKind {
    #[error("Binding for {key} is already registered in component {component}")]
    DuplicateBinding { key: Key, component: Cow<'static, str> },
    #[error("Multibinding {key} is already declared in component {component}")]
    DuplicateMultibindingDeclaration { key: Key, component: Cow<'static, str> },
    #[error("Component {name} is already declared")]
    DuplicateComponent { name: Cow<'static, str> },
    #[error("Component with index {index} not found in registry")]
    UnknownComponent { index: usize },
    #[error("Scope {scope} of component {component} is already owned by component {owner}")]
    ScopeAlreadyOwned {
        scope: ScopeData,
        component: Cow<'static, str>,
        owner: Cow<'static, str>,
    },
    #[error("Scope {scope} of component {component} must be narrower than scope {parent_scope} of its parent {parent}")]
    ScopeOrder {
        scope: ScopeData,
        component: Cow<'static, str>,
        parent_scope: ScopeData,
        parent: Cow<'static, str>,
    },
    #[error("Binding kind doesn't match multibinding marker of key {key}")]
    MultibindingMismatch { key: Key },
    #[error("Binding for {key} provides another type: {}", .provides.name)]
    TypeMismatch { key: Key, provides: TypeInfo },
}
