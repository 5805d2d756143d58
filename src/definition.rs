use alloc::{borrow::Cow, sync::Arc, vec::Vec};

use crate::{
    dependency_resolver::DependencyResolver,
    instantiator::Instantiator,
    key::MapKey,
    multibinding::{MultibindingDecl, SetPolicy},
    registry::Binding,
    scope::{Scope, ScopeData},
    Key,
};

/// Reusable bundle of bindings and multibinding declarations.
///
/// Nothing is checked until the module is installed into a component,
/// so the same module can be installed into several components.
///
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use thicket::{ComponentDef, DefaultScope, InstantiateErrorKind, Module, Registry};
///
/// trait Tank: Send + Sync {}
/// struct Panther;
/// impl Tank for Panther {}
///
/// let module = Module::new()
///     .provide(|| Ok::<_, InstantiateErrorKind>(Panther))
///     .bind(|panther: Arc<Panther>| panther as Arc<dyn Tank>);
///
/// let registry = Arc::new(Registry::new([ComponentDef::new("app", DefaultScope::App).install(module)]).unwrap());
/// let app = registry.root("app").unwrap().build().unwrap();
///
/// assert!(app.get::<Arc<dyn Tank>>().is_ok());
/// ```
#[derive(Clone, Default)]
pub struct Module {
    pub(crate) bindings: Vec<(Key, Binding)>,
    pub(crate) multibindings: Vec<(Key, MultibindingDecl)>,
}

impl Module {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bindings: Vec::new(),
            multibindings: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn add(mut self, key: Key, binding: Binding) -> Self {
        self.bindings.push((key, binding));
        self
    }

    /// Unscoped binding, the instantiator is called on every request.
    #[inline]
    #[must_use]
    pub fn provide<Inst, Deps>(self, instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        self.add(Key::of::<Inst::Provides>(), Binding::direct(instantiator))
    }

    /// Binding cached once per instance of the component owning `scope`.
    #[inline]
    #[must_use]
    pub fn provide_scoped<Inst, Deps>(self, instantiator: Inst, scope: impl Scope) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        self.add(Key::of::<Inst::Provides>(), Binding::direct(instantiator).scoped(scope))
    }

    #[inline]
    #[must_use]
    pub fn provide_named<Inst, Deps>(self, qualifier: impl Into<Cow<'static, str>>, instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        self.add(Key::named::<Inst::Provides>(qualifier), Binding::direct(instantiator))
    }

    /// Binds `key` to the value of `target`, both keys must have the same type.
    #[inline]
    #[must_use]
    pub fn alias(self, key: Key, target: Key) -> Self {
        self.add(key, Binding::alias(target))
    }

    /// Binds `T` to the converted value of `S`, e.g. a trait object to its implementation.
    #[inline]
    #[must_use]
    pub fn bind<S, T, F>(self, convert: F) -> Self
    where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(Arc<S>) -> T + Send + Sync + 'static,
    {
        self.add(Key::of::<T>(), Binding::cast(Key::of::<S>(), convert))
    }

    #[inline]
    #[must_use]
    pub fn into_set<Inst, Deps>(self, instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        self.add(Key::set_of::<Inst::Provides>(), Binding::set_contribution(instantiator))
    }

    #[inline]
    #[must_use]
    pub fn into_named_set<Inst, Deps>(self, qualifier: impl Into<Cow<'static, str>>, instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        self.add(Key::named_set_of::<Inst::Provides>(qualifier), Binding::set_contribution(instantiator))
    }

    #[inline]
    #[must_use]
    pub fn into_map<Inst, Deps>(self, map_key: impl Into<MapKey>, instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        self.add(Key::map_of::<Inst::Provides>(), Binding::map_contribution(map_key, instantiator))
    }

    #[inline]
    #[must_use]
    pub fn into_named_map<Inst, Deps>(
        self,
        qualifier: impl Into<Cow<'static, str>>,
        map_key: impl Into<MapKey>,
        instantiator: Inst,
    ) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        self.add(
            Key::named_map_of::<Inst::Provides>(qualifier),
            Binding::map_contribution(map_key, instantiator),
        )
    }

    #[inline]
    #[must_use]
    pub fn declare_set<T: ?Sized + 'static>(self) -> Self {
        self.declare(Key::set_of::<T>(), MultibindingDecl::new())
    }

    #[inline]
    #[must_use]
    pub fn declare_named_set<T: ?Sized + 'static>(self, qualifier: impl Into<Cow<'static, str>>) -> Self {
        self.declare(Key::named_set_of::<T>(qualifier), MultibindingDecl::new())
    }

    /// Declares a set with its own duplicate policy, equality of `T` is used to detect duplicates.
    #[inline]
    #[must_use]
    pub fn declare_set_with_policy<T: PartialEq + 'static>(self, policy: SetPolicy) -> Self {
        self.declare(Key::set_of::<T>(), MultibindingDecl::with_policy::<T>(policy))
    }

    #[inline]
    #[must_use]
    pub fn declare_named_set_with_policy<T: PartialEq + 'static>(
        self,
        qualifier: impl Into<Cow<'static, str>>,
        policy: SetPolicy,
    ) -> Self {
        self.declare(Key::named_set_of::<T>(qualifier), MultibindingDecl::with_policy::<T>(policy))
    }

    #[inline]
    #[must_use]
    pub fn declare_map<T: ?Sized + 'static>(self) -> Self {
        self.declare(Key::map_of::<T>(), MultibindingDecl::new())
    }

    #[inline]
    #[must_use]
    pub fn declare_named_map<T: ?Sized + 'static>(self, qualifier: impl Into<Cow<'static, str>>) -> Self {
        self.declare(Key::named_map_of::<T>(qualifier), MultibindingDecl::new())
    }

    #[inline]
    fn declare(mut self, key: Key, decl: MultibindingDecl) -> Self {
        self.multibindings.push((key, decl));
        self
    }
}

/// Declarative node of the component tree.
pub struct ComponentDef {
    pub(crate) name: Cow<'static, str>,
    pub(crate) scope: ScopeData,
    pub(crate) modules: Vec<Module>,
    pub(crate) slots: Vec<(Key, Binding)>,
    pub(crate) children: Vec<ComponentDef>,
}

impl ComponentDef {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, scope: impl Scope) -> Self {
        Self {
            name: name.into(),
            scope: scope.data(),
            modules: Vec::new(),
            slots: Vec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn install(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    /// Requires the builder to supply a `T` with [`crate::ComponentBuilder::instance`].
    #[inline]
    #[must_use]
    pub fn bind_instance<T: Send + Sync + 'static>(mut self) -> Self {
        self.slots.push((Key::of::<T>(), Binding::instance::<T>()));
        self
    }

    #[inline]
    #[must_use]
    pub fn bind_named_instance<T: Send + Sync + 'static>(mut self, qualifier: impl Into<Cow<'static, str>>) -> Self {
        self.slots.push((Key::named::<T>(qualifier), Binding::instance::<T>()));
        self
    }

    /// Requires the builder to supply a `T` with [`crate::ComponentBuilder::module`].
    #[inline]
    #[must_use]
    pub fn module_param<T: Send + Sync + 'static>(mut self) -> Self {
        self.slots.push((Key::of::<T>(), Binding::module_param::<T>()));
        self
    }

    #[inline]
    #[must_use]
    pub fn child(mut self, child: ComponentDef) -> Self {
        self.children.push(child);
        self
    }
}
