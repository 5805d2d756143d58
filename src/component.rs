use alloc::{borrow::Cow, collections::BTreeMap, sync::Arc};
use core::fmt::{self, Debug, Formatter};
use tracing::info_span;

use crate::{
    any::{Provided, RcAny},
    builder::ComponentBuilder,
    cache::Cache,
    errors::{BuildErrorKind, ResolveErrorKind},
    multibinding::{ProvidedMap, ProvidedSet},
    registry::{ComponentId, Registry},
    resolver::{self, ResolveStack},
    scope::ScopeData,
    Key,
};

/// Live instance of a component node.
///
/// Cloning is cheap and clones share the same cache.
/// Scoped values are cached in the instance of the component installing their binding,
/// so two instances of the same component never share them.
#[derive(Clone)]
pub struct Component {
    pub(crate) inner: Arc<ComponentInner>,
}

pub(crate) struct ComponentInner {
    pub(crate) registry: Arc<Registry>,
    pub(crate) id: ComponentId,
    pub(crate) parent: Option<Component>,
    pub(crate) instances: BTreeMap<Key, RcAny>,
    pub(crate) cache: Cache,
}

impl Component {
    #[inline]
    #[must_use]
    pub(crate) fn new(registry: Arc<Registry>, id: ComponentId, parent: Option<Component>, instances: BTreeMap<Key, RcAny>) -> Self {
        Self {
            inner: Arc::new(ComponentInner {
                registry,
                id,
                parent,
                instances,
                cache: Cache::new(),
            }),
        }
    }

    /// Gets a dependency of type `Dep` without a qualifier.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoBinding`] if nothing visible from this component binds the key
    /// - Returns [`ResolveErrorKind::Factory`] if a factory of the dependency graph fails
    /// - Returns [`ResolveErrorKind::Cycle`] and [`ResolveErrorKind::DepthExceeded`] if the construction never ends
    #[inline]
    pub fn get<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        let key = Key::of::<Dep>();
        self.get_key(&key)?.into_single(&key)
    }

    /// # Errors
    /// See [`Self::get`]
    #[inline]
    pub fn get_named<Dep: Send + Sync + 'static>(&self, qualifier: impl Into<Cow<'static, str>>) -> Result<Arc<Dep>, ResolveErrorKind> {
        let key = Key::named::<Dep>(qualifier);
        self.get_key(&key)?.into_single(&key)
    }

    /// # Errors
    /// See [`Self::get`]
    #[inline]
    pub fn get_set<Dep: Send + Sync + 'static>(&self) -> Result<ProvidedSet<Dep>, ResolveErrorKind> {
        let key = Key::set_of::<Dep>();
        self.get_key(&key)?.into_set(&key)
    }

    /// # Errors
    /// See [`Self::get`]
    #[inline]
    pub fn get_named_set<Dep: Send + Sync + 'static>(
        &self,
        qualifier: impl Into<Cow<'static, str>>,
    ) -> Result<ProvidedSet<Dep>, ResolveErrorKind> {
        let key = Key::named_set_of::<Dep>(qualifier);
        self.get_key(&key)?.into_set(&key)
    }

    /// # Errors
    /// See [`Self::get`]. Also returns [`ResolveErrorKind::DuplicateMapKey`] if two contributions share a map key
    #[inline]
    pub fn get_map<Dep: Send + Sync + 'static>(&self) -> Result<ProvidedMap<Dep>, ResolveErrorKind> {
        let key = Key::map_of::<Dep>();
        self.get_key(&key)?.into_map(&key)
    }

    /// # Errors
    /// See [`Self::get_map`]
    #[inline]
    pub fn get_named_map<Dep: Send + Sync + 'static>(
        &self,
        qualifier: impl Into<Cow<'static, str>>,
    ) -> Result<ProvidedMap<Dep>, ResolveErrorKind> {
        let key = Key::named_map_of::<Dep>(qualifier);
        self.get_key(&key)?.into_map(&key)
    }

    /// Gets the type-erased value of any key.
    ///
    /// # Errors
    /// See [`Self::get`]
    pub fn get_key(&self, key: &Key) -> Result<Provided, ResolveErrorKind> {
        let span = info_span!("get", key = %key, component = %self.name());
        let _guard = span.enter();

        let mut stack = ResolveStack::new(self.inner.registry.config().max_depth);
        resolver::resolve(self, key, &mut stack)
    }

    /// Creates a builder of an instance of the child component `name`, with this instance as its parent.
    ///
    /// # Errors
    /// - Returns [`BuildErrorKind::UnknownComponent`] if there's no such component
    /// - Returns [`BuildErrorKind::NotAChild`] if the component isn't a child of this one
    #[inline]
    pub fn child(&self, name: &str) -> Result<ComponentBuilder, BuildErrorKind> {
        ComponentBuilder::child(self.clone(), name)
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.registry.node(self.inner.id).name
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> ScopeData {
        self.inner.registry.node(self.inner.id).scope
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Component> {
        self.inner.parent.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    #[inline]
    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl Debug for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name())
            .field("scope", &self.scope())
            .field("parent", &self.parent().map(Component::name))
            .finish_non_exhaustive()
    }
}
