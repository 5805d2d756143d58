#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod builder;
pub(crate) mod cache;
pub(crate) mod component;
pub(crate) mod config;
pub(crate) mod definition;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod key;
pub(crate) mod multibinding;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod scope;
pub(crate) mod validator;

pub use any::{Provided, RcAny};
pub use builder::{BuilderState, ComponentBuilder};
pub use component::Component;
pub use config::Config;
pub use definition::{ComponentDef, Module};
pub use dependency_resolver::{Dependencies, DependencyResolver};
pub use errors::{
    BuildErrorKind, InstantiateErrorKind, InstantiatorErrorKind, RegistryErrorKind, ResolveErrorKind, ValidationErrorKind,
};
pub use inject::{Inject, InjectMap, InjectSet, Named};
pub use instantiator::{instance, Instantiator};
pub use key::{Key, MapKey, MultibindingKind, Qualifier, TypeInfo};
pub use multibinding::{MultibindingDecl, ProvidedMap, ProvidedSet, SetPolicy};
pub use registry::{Binding, ComponentId, Registry, RegistryBuilder, SlotKind};
pub use scope::{DefaultScope, Scope, ScopeData};
