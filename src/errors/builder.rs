use alloc::{borrow::Cow, vec::Vec};

use super::ValidationErrorKind;
use crate::{key::KeyPath, Key};

#[derive(thiserror::Error, Debug, Clone)]
pub enum BuildErrorKind {
    #[error("Builder of component {component} is incomplete, missing: {}", KeyPath(.missing))]
    IncompleteBuilder {
        component: Cow<'static, str>,
        missing: Vec<Key>,
    },
    #[error("Instance for {key} isn't declared by component {component}")]
    UnexpectedInstance { key: Key, component: Cow<'static, str> },
    #[error("Component {name} not found in registry")]
    UnknownComponent { name: Cow<'static, str> },
    #[error("Component {component} isn't a child of component {parent}")]
    NotAChild {
        component: Cow<'static, str>,
        parent: Cow<'static, str>,
    },
    #[error("Component {component} isn't a root, build it from its parent")]
    NotARoot { component: Cow<'static, str> },
    #[error(transparent)]
    Validation(#[from] ValidationErrorKind),
}
