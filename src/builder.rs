use alloc::{borrow::Cow, collections::BTreeMap, sync::Arc, vec::Vec};
use core::fmt::{self, Debug, Formatter};
use tracing::{error, info};

use crate::{
    any::RcAny,
    component::Component,
    errors::BuildErrorKind,
    registry::{ComponentId, Registry},
    Key,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderState {
    /// Some required instances or module parameters aren't supplied yet.
    Collecting,
    Ready,
}

/// Staged construction of a [`Component`].
///
/// Collects the values the component declares as instance slots and module parameters,
/// [`Self::build`] consumes the builder.
pub struct ComponentBuilder {
    registry: Arc<Registry>,
    id: ComponentId,
    parent: Option<Component>,
    values: BTreeMap<Key, RcAny>,
}

impl ComponentBuilder {
    /// Creates a builder of an instance of the root component `name`.
    ///
    /// # Errors
    /// - Returns [`BuildErrorKind::UnknownComponent`] if there's no such component
    /// - Returns [`BuildErrorKind::NotARoot`] if the component has a parent
    pub fn new(registry: Arc<Registry>, name: &str) -> Result<Self, BuildErrorKind> {
        let id = component_id(&registry, name)?;
        if registry.parent_of(id).is_some() {
            let err = BuildErrorKind::NotARoot {
                component: Cow::Owned(name.into()),
            };
            error!("{}", err);
            return Err(err);
        }

        Ok(Self {
            registry,
            id,
            parent: None,
            values: BTreeMap::new(),
        })
    }

    pub(crate) fn child(parent: Component, name: &str) -> Result<Self, BuildErrorKind> {
        let registry = parent.registry().clone();
        let id = component_id(&registry, name)?;
        if registry.parent_of(id) != Some(parent.id()) {
            let err = BuildErrorKind::NotAChild {
                component: Cow::Owned(name.into()),
                parent: Cow::Owned(parent.name().into()),
            };
            error!("{}", err);
            return Err(err);
        }

        Ok(Self {
            registry,
            id,
            parent: Some(parent),
            values: BTreeMap::new(),
        })
    }

    #[inline]
    #[must_use]
    pub fn instance<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.instance_rc(Arc::new(value))
    }

    /// Supplies an already shared instance, the component returns this exact `Arc`.
    #[inline]
    #[must_use]
    pub fn instance_rc<T: Send + Sync + 'static>(mut self, value: Arc<T>) -> Self {
        self.values.insert(Key::of::<T>(), value);
        self
    }

    #[inline]
    #[must_use]
    pub fn named_instance<T: Send + Sync + 'static>(mut self, qualifier: impl Into<Cow<'static, str>>, value: T) -> Self {
        self.values.insert(Key::named::<T>(qualifier), Arc::new(value));
        self
    }

    /// Supplies a module parameter, e.g. configuration a module of the component depends on.
    #[inline]
    #[must_use]
    pub fn module<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.insert(Key::of::<T>(), Arc::new(value));
        self
    }

    /// Keys of the slots still waiting for a value.
    #[must_use]
    pub fn missing(&self) -> Vec<Key> {
        self.registry
            .slots_of(self.id)
            .into_iter()
            .filter(|(key, _)| !self.values.contains_key(*key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> BuilderState {
        if self.missing().is_empty() {
            BuilderState::Ready
        } else {
            BuilderState::Collecting
        }
    }

    /// Validates the component graph once per component and creates an instance with an empty cache.
    ///
    /// # Errors
    /// - Returns [`BuildErrorKind::UnexpectedInstance`] if a supplied value isn't declared by the component
    /// - Returns [`BuildErrorKind::IncompleteBuilder`] if a declared value isn't supplied
    /// - Returns [`BuildErrorKind::Validation`] if the graph visible from the component is invalid
    pub fn build(self) -> Result<Component, BuildErrorKind> {
        let name = &self.registry.node(self.id).name;

        let slots = self.registry.slots_of(self.id);
        if let Some(key) = self.values.keys().find(|key| !slots.iter().any(|(slot, _)| slot == key)) {
            let err = BuildErrorKind::UnexpectedInstance {
                key: key.clone(),
                component: name.clone(),
            };
            error!("{}", err);
            return Err(err);
        }

        let missing = self.missing();
        if !missing.is_empty() {
            let err = BuildErrorKind::IncompleteBuilder {
                component: name.clone(),
                missing,
            };
            error!("{}", err);
            return Err(err);
        }

        self.registry.validate_component(self.id)?;

        info!(component = %name, "Component built");
        Ok(Component::new(self.registry.clone(), self.id, self.parent, self.values))
    }
}

impl Debug for ComponentBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBuilder")
            .field("component", &self.registry.node(self.id).name)
            .field("supplied", &self.values.keys().collect::<Vec<_>>())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn component_id(registry: &Registry, name: &str) -> Result<ComponentId, BuildErrorKind> {
    registry.component_id(name).ok_or_else(|| {
        let err = BuildErrorKind::UnknownComponent {
            name: Cow::Owned(name.into()),
        };
        error!("{}", err);
        err
    })
}
