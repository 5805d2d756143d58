use alloc::{
    borrow::Cow,
    collections::{btree_map, BTreeMap},
    sync::Arc,
    vec::Vec,
};
use core::{
    fmt::{self, Debug, Formatter},
    slice,
};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::{
    any::RcAny,
    builder::ComponentBuilder,
    config::Config,
    definition::{ComponentDef, Module},
    dependency_resolver::{Dependencies, DependencyResolver},
    errors::{BuildErrorKind, InstantiateErrorKind, RegistryErrorKind, ValidationErrorKind},
    instantiator::{boxed_fn_factory, boxed_instantiator_factory, BoxedFactory, Instantiator},
    key::{MapKey, MultibindingKind, TypeInfo},
    multibinding::{EqFn, MultibindingDecl, SetPolicy},
    scope::{Scope, ScopeData},
    validator, Key,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Identity of a binding: the component that installs it and its position there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct BindingId {
    pub(crate) component: ComponentId,
    pub(crate) index: usize,
}

/// Kind of a value supplied to a [`ComponentBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    Instance,
    Module,
}

#[derive(Clone)]
pub(crate) struct Cast {
    pub(crate) source: TypeInfo,
    pub(crate) convert: Arc<dyn Fn(RcAny) -> Option<RcAny> + Send + Sync>,
}

#[derive(Clone)]
pub(crate) enum BindingKind {
    Direct {
        factory: BoxedFactory,
        dependencies: Vec<Key>,
    },
    Alias {
        target: Key,
        cast: Option<Cast>,
    },
    SetContribution {
        factory: BoxedFactory,
        dependencies: Vec<Key>,
    },
    MapContribution {
        map_key: MapKey,
        factory: BoxedFactory,
        dependencies: Vec<Key>,
    },
    Slot(SlotKind),
}

/// Recipe producing the value of a [`Key`].
///
/// A binding is unscoped by default and constructed again on every request.
/// [`Binding::scoped`] caches it once per instance of the component owning the scope.
#[derive(Clone)]
pub struct Binding {
    pub(crate) kind: BindingKind,
    pub(crate) scope: Option<ScopeData>,
    pub(crate) provides: TypeInfo,
}

impl Binding {
    #[inline]
    #[must_use]
    pub fn direct<Inst, Deps>(instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        Self::unscoped(
            BindingKind::Direct {
                factory: boxed_instantiator_factory(instantiator),
                dependencies: Deps::dependencies(),
            },
            TypeInfo::of::<Inst::Provides>(),
        )
    }

    /// Factory reading its dependencies in the order of `dependencies`,
    /// used when keys are only known at runtime, e.g. string qualifiers.
    #[inline]
    #[must_use]
    pub fn from_fn<T, F>(dependencies: impl IntoIterator<Item = Key>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Dependencies) -> Result<T, InstantiateErrorKind> + Send + Sync + 'static,
    {
        Self::unscoped(
            BindingKind::Direct {
                factory: boxed_fn_factory(factory),
                dependencies: dependencies.into_iter().collect(),
            },
            TypeInfo::of::<T>(),
        )
    }

    /// Delegates to the binding of `target` and returns its value as is.
    #[inline]
    #[must_use]
    pub fn alias(target: Key) -> Self {
        let provides = target.type_info;
        Self::unscoped(BindingKind::Alias { target, cast: None }, provides)
    }

    /// Delegates to the binding of `target` and converts its value,
    /// e.g. `Arc<Panther>` into `Arc<dyn Tank + Send + Sync>`.
    #[inline]
    #[must_use]
    pub fn cast<S, T, F>(target: Key, convert: F) -> Self
    where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(Arc<S>) -> T + Send + Sync + 'static,
    {
        let cast = Cast {
            source: TypeInfo::of::<S>(),
            convert: Arc::new(move |value: RcAny| {
                value
                    .downcast::<S>()
                    .ok()
                    .map(|value| Arc::new(convert(value)) as RcAny)
            }),
        };
        Self::unscoped(BindingKind::Alias { target, cast: Some(cast) }, TypeInfo::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn set_contribution<Inst, Deps>(instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        Self::unscoped(
            BindingKind::SetContribution {
                factory: boxed_instantiator_factory(instantiator),
                dependencies: Deps::dependencies(),
            },
            TypeInfo::of::<Inst::Provides>(),
        )
    }

    #[inline]
    #[must_use]
    pub fn map_contribution<Inst, Deps>(map_key: impl Into<MapKey>, instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: DependencyResolver,
    {
        Self::unscoped(
            BindingKind::MapContribution {
                map_key: map_key.into(),
                factory: boxed_instantiator_factory(instantiator),
                dependencies: Deps::dependencies(),
            },
            TypeInfo::of::<Inst::Provides>(),
        )
    }

    /// Value supplied with [`ComponentBuilder::instance`].
    #[inline]
    #[must_use]
    pub fn instance<T: Send + Sync + 'static>() -> Self {
        Self::unscoped(BindingKind::Slot(SlotKind::Instance), TypeInfo::of::<T>())
    }

    /// Value supplied with [`ComponentBuilder::module`].
    #[inline]
    #[must_use]
    pub fn module_param<T: Send + Sync + 'static>() -> Self {
        Self::unscoped(BindingKind::Slot(SlotKind::Module), TypeInfo::of::<T>())
    }

    /// Caches the value in the instance of the component owning `scope`.
    /// The binding must be installed in that component.
    #[inline]
    #[must_use]
    pub fn scoped(mut self, scope: impl Scope) -> Self {
        self.scope = Some(scope.data());
        self
    }

    #[inline]
    #[must_use]
    pub const fn scope(&self) -> Option<ScopeData> {
        self.scope
    }

    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[Key] {
        match &self.kind {
            BindingKind::Direct { dependencies, .. }
            | BindingKind::SetContribution { dependencies, .. }
            | BindingKind::MapContribution { dependencies, .. } => dependencies,
            BindingKind::Alias { target, .. } => slice::from_ref(target),
            BindingKind::Slot(_) => &[],
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_contribution(&self) -> bool {
        matches!(
            self.kind,
            BindingKind::SetContribution { .. } | BindingKind::MapContribution { .. }
        )
    }

    #[inline]
    #[must_use]
    pub const fn slot_kind(&self) -> Option<SlotKind> {
        match self.kind {
            BindingKind::Slot(kind) => Some(kind),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn map_key(&self) -> Option<&MapKey> {
        match &self.kind {
            BindingKind::MapContribution { map_key, .. } => Some(map_key),
            _ => None,
        }
    }

    #[inline]
    const fn unscoped(kind: BindingKind, provides: TypeInfo) -> Self {
        Self {
            kind,
            scope: None,
            provides,
        }
    }

    fn check(&self, key: &Key) -> Result<(), RegistryErrorKind> {
        let kind_matches = match (&self.kind, key.multibinding) {
            (BindingKind::SetContribution { .. }, Some(MultibindingKind::Set))
            | (BindingKind::MapContribution { .. }, Some(MultibindingKind::Map)) => true,
            (BindingKind::SetContribution { .. } | BindingKind::MapContribution { .. }, _) | (_, Some(_)) => false,
            (_, None) => true,
        };
        if !kind_matches {
            return Err(RegistryErrorKind::MultibindingMismatch { key: key.clone() });
        }
        if self.provides != key.type_info {
            return Err(RegistryErrorKind::TypeMismatch {
                key: key.clone(),
                provides: self.provides,
            });
        }
        if let BindingKind::Alias { target, cast } = &self.kind {
            let source = cast.as_ref().map_or(self.provides, |cast| cast.source);
            if source != target.type_info || target.is_multibinding() {
                return Err(RegistryErrorKind::TypeMismatch {
                    key: target.clone(),
                    provides: source,
                });
            }
        }
        Ok(())
    }
}

impl Debug for Binding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            BindingKind::Direct { .. } => "Direct",
            BindingKind::Alias { cast: None, .. } => "Alias",
            BindingKind::Alias { cast: Some(_), .. } => "Cast",
            BindingKind::SetContribution { .. } => "SetContribution",
            BindingKind::MapContribution { .. } => "MapContribution",
            BindingKind::Slot(_) => "Slot",
        };
        f.debug_struct("Binding")
            .field("kind", &kind)
            .field("provides", &self.provides.name)
            .field("scope", &self.scope)
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

pub(crate) struct ComponentNode {
    pub(crate) name: Cow<'static, str>,
    pub(crate) scope: ScopeData,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<ComponentId>,
    pub(crate) bindings: Vec<(Key, Binding)>,
    unique: BTreeMap<Key, usize>,
    contributions: BTreeMap<Key, Vec<usize>>,
    multibindings: BTreeMap<Key, MultibindingDecl>,
}

impl ComponentNode {
    pub(crate) fn multibinding_keys(&self) -> impl Iterator<Item = &Key> {
        self.contributions.keys().chain(self.multibindings.keys())
    }
}

#[derive(Clone, Copy)]
pub(crate) struct BindingRef<'a> {
    pub(crate) id: BindingId,
    pub(crate) key: &'a Key,
    pub(crate) binding: &'a Binding,
}

/// Mutable stage of a [`Registry`]: components and their bindings are added here,
/// the built registry can't be changed anymore.
#[derive(Default)]
pub struct RegistryBuilder {
    config: Config,
    nodes: Vec<ComponentNode>,
    names: BTreeMap<Cow<'static, str>, ComponentId>,
    scopes: BTreeMap<ScopeData, ComponentId>,
}

impl RegistryBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Adds an empty component node.
    ///
    /// # Errors
    /// - Returns [`RegistryErrorKind::DuplicateComponent`] if the name is taken
    /// - Returns [`RegistryErrorKind::UnknownComponent`] if the parent isn't in this builder
    /// - Returns [`RegistryErrorKind::ScopeAlreadyOwned`] if another node owns the scope
    /// - Returns [`RegistryErrorKind::ScopeOrder`] if the scope isn't narrower than the parent's
    pub fn add_component(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        scope: impl Scope,
        parent: Option<ComponentId>,
    ) -> Result<ComponentId, RegistryErrorKind> {
        let name = name.into();
        let scope = scope.data();

        if self.names.contains_key(&name) {
            return Err(RegistryErrorKind::DuplicateComponent { name });
        }
        if let Some(owner) = self.scopes.get(&scope) {
            return Err(RegistryErrorKind::ScopeAlreadyOwned {
                scope,
                component: name,
                owner: self.nodes[owner.0].name.clone(),
            });
        }
        if let Some(parent) = parent {
            let Some(parent_node) = self.nodes.get(parent.0) else {
                return Err(RegistryErrorKind::UnknownComponent { index: parent.0 });
            };
            if !scope.is_narrower_than(&parent_node.scope) {
                return Err(RegistryErrorKind::ScopeOrder {
                    scope,
                    component: name,
                    parent_scope: parent_node.scope,
                    parent: parent_node.name.clone(),
                });
            }
        }

        let id = ComponentId(self.nodes.len());
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        self.nodes.push(ComponentNode {
            name: name.clone(),
            scope,
            parent,
            children: Vec::new(),
            bindings: Vec::new(),
            unique: BTreeMap::new(),
            contributions: BTreeMap::new(),
            multibindings: BTreeMap::new(),
        });
        self.scopes.insert(scope, id);

        debug!(component = %name, "Component added");
        self.names.insert(name, id);
        Ok(id)
    }

    /// # Errors
    /// - Returns [`RegistryErrorKind::UnknownComponent`] if the component isn't in this builder
    /// - Returns [`RegistryErrorKind::DuplicateBinding`] if the component already binds the key
    /// - Returns [`RegistryErrorKind::MultibindingMismatch`] if a contribution is registered for a plain key or vice versa
    /// - Returns [`RegistryErrorKind::TypeMismatch`] if the binding provides another type than the key
    pub fn register(&mut self, component: ComponentId, key: Key, binding: Binding) -> Result<(), RegistryErrorKind> {
        use btree_map::Entry::{Occupied, Vacant};

        let Some(node) = self.nodes.get_mut(component.0) else {
            return Err(RegistryErrorKind::UnknownComponent { index: component.0 });
        };
        if let Err(err) = binding.check(&key) {
            error!("{}", err);
            return Err(err);
        }

        let index = node.bindings.len();
        if binding.is_contribution() {
            node.contributions.entry(key.clone()).or_default().push(index);
        } else {
            match node.unique.entry(key.clone()) {
                Vacant(entry) => {
                    entry.insert(index);
                }
                Occupied(entry) => {
                    let err = RegistryErrorKind::DuplicateBinding {
                        key: entry.key().clone(),
                        component: node.name.clone(),
                    };
                    error!("{}", err);
                    return Err(err);
                }
            }
        }
        node.bindings.push((key, binding));
        Ok(())
    }

    /// Declares a multibinding, so it resolves to an empty collection without contributions.
    ///
    /// # Errors
    /// - Returns [`RegistryErrorKind::UnknownComponent`] if the component isn't in this builder
    /// - Returns [`RegistryErrorKind::MultibindingMismatch`] if the key isn't a multibinding key
    /// - Returns [`RegistryErrorKind::DuplicateMultibindingDeclaration`] if the component already declares it
    pub fn declare_multibinding(
        &mut self,
        component: ComponentId,
        key: Key,
        decl: MultibindingDecl,
    ) -> Result<(), RegistryErrorKind> {
        let Some(node) = self.nodes.get_mut(component.0) else {
            return Err(RegistryErrorKind::UnknownComponent { index: component.0 });
        };
        if !key.is_multibinding() {
            return Err(RegistryErrorKind::MultibindingMismatch { key });
        }
        if node.multibindings.contains_key(&key) {
            return Err(RegistryErrorKind::DuplicateMultibindingDeclaration {
                key,
                component: node.name.clone(),
            });
        }
        node.multibindings.insert(key, decl);
        Ok(())
    }

    /// Registers every binding and declaration of the module in the component.
    ///
    /// # Errors
    /// See [`Self::register`] and [`Self::declare_multibinding`]
    pub fn install(&mut self, component: ComponentId, module: Module) -> Result<(), RegistryErrorKind> {
        for (key, decl) in module.multibindings {
            self.declare_multibinding(component, key, decl)?;
        }
        for (key, binding) in module.bindings {
            self.register(component, key, binding)?;
        }
        Ok(())
    }

    /// Adds the component definition with all of its children.
    ///
    /// # Errors
    /// See [`Self::add_component`] and [`Self::install`]
    pub fn add(&mut self, def: ComponentDef, parent: Option<ComponentId>) -> Result<ComponentId, RegistryErrorKind> {
        let ComponentDef {
            name,
            scope,
            modules,
            slots,
            children,
        } = def;

        let id = self.add_component(name, scope, parent)?;
        for (key, binding) in slots {
            self.register(id, key, binding)?;
        }
        for module in modules {
            self.install(id, module)?;
        }
        for child in children {
            self.add(child, Some(id))?;
        }
        Ok(id)
    }

    #[must_use]
    pub fn build(self) -> Registry {
        info!(components = self.nodes.len(), "Registry built");

        Registry {
            config: self.config,
            nodes: self.nodes,
            names: self.names,
            validated: Mutex::new(BTreeMap::new()),
        }
    }
}

/// Immutable graph of components and their bindings.
pub struct Registry {
    config: Config,
    nodes: Vec<ComponentNode>,
    names: BTreeMap<Cow<'static, str>, ComponentId>,
    validated: Mutex<BTreeMap<ComponentId, Result<(), ValidationErrorKind>>>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Creates a registry from root component definitions.
    ///
    /// # Errors
    /// See [`RegistryBuilder::add`]
    pub fn new(roots: impl IntoIterator<Item = ComponentDef>) -> Result<Self, RegistryErrorKind> {
        Self::with_config(Config::default(), roots)
    }

    /// # Errors
    /// See [`RegistryBuilder::add`]
    pub fn with_config(config: Config, roots: impl IntoIterator<Item = ComponentDef>) -> Result<Self, RegistryErrorKind> {
        let mut builder = RegistryBuilder::new().with_config(config);
        for root in roots {
            builder.add(root, None)?;
        }
        Ok(builder.build())
    }

    /// Creates a builder for an instance of the root component `name`.
    ///
    /// # Errors
    /// - Returns [`BuildErrorKind::UnknownComponent`] if there's no such component
    /// - Returns [`BuildErrorKind::NotARoot`] if the component has a parent
    #[inline]
    pub fn root(self: &Arc<Self>, name: &str) -> Result<ComponentBuilder, BuildErrorKind> {
        ComponentBuilder::new(self.clone(), name)
    }

    /// Validates every component.
    ///
    /// # Errors
    /// Returns the first [`ValidationErrorKind`] found
    pub fn validate(&self) -> Result<(), ValidationErrorKind> {
        self.components().try_for_each(|component| self.validate_component(component))
    }

    /// Validates the graph visible from the component, the result is memoized per component.
    ///
    /// # Errors
    /// - Returns [`ValidationErrorKind::UnknownComponent`] if the id doesn't belong to this registry
    /// - Returns the first other [`ValidationErrorKind`] found
    pub fn validate_component(&self, component: ComponentId) -> Result<(), ValidationErrorKind> {
        let Some(node) = self.get_node(component) else {
            let err = ValidationErrorKind::UnknownComponent { index: component.0 };
            error!("{}", err);
            return Err(err);
        };
        if let Some(result) = self.validated.lock().get(&component) {
            return result.clone();
        }

        let result = validator::validate_component(self, component);
        match &result {
            Ok(()) => debug!(component = %node.name, "Validated"),
            Err(err) => error!("{}", err),
        }
        self.validated.lock().insert(component, result.clone());
        result
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.names.get(name).copied()
    }

    /// `None` if the id doesn't belong to this registry, as do the other accessors by id.
    #[inline]
    #[must_use]
    pub fn component_name(&self, component: ComponentId) -> Option<&str> {
        self.get_node(component).map(|node| &*node.name)
    }

    #[inline]
    #[must_use]
    pub fn component_scope(&self, component: ComponentId) -> Option<ScopeData> {
        self.get_node(component).map(|node| node.scope)
    }

    /// `None` for a root as well.
    #[inline]
    #[must_use]
    pub fn parent_of(&self, component: ComponentId) -> Option<ComponentId> {
        self.get_node(component).and_then(|node| node.parent)
    }

    #[inline]
    #[must_use]
    pub fn children_of(&self, component: ComponentId) -> Option<&[ComponentId]> {
        self.get_node(component).map(|node| node.children.as_slice())
    }

    /// Keys and kinds of the values a builder of the component must supply.
    #[must_use]
    pub fn slots(&self, component: ComponentId) -> Option<Vec<(&Key, SlotKind)>> {
        self.get_node(component).map(|_| self.slots_of(component))
    }

    pub(crate) fn slots_of(&self, component: ComponentId) -> Vec<(&Key, SlotKind)> {
        self.node(component)
            .bindings
            .iter()
            .filter_map(|(key, binding)| binding.slot_kind().map(|kind| (key, kind)))
            .collect()
    }

    /// Binding of `key` visible from the component, its own bindings shadow the ancestors' ones.
    #[must_use]
    pub(crate) fn lookup(&self, component: ComponentId, key: &Key) -> Option<BindingRef<'_>> {
        self.ancestors(component).find_map(|id| {
            let node = self.node(id);
            node.unique.get(key).map(|&index| self.binding_ref(id, index))
        })
    }

    /// Contributions of `key` visible from the component, from the outermost component to the component itself.
    #[must_use]
    pub(crate) fn contributions(&self, component: ComponentId, key: &Key) -> Vec<BindingRef<'_>> {
        let mut chain: Vec<ComponentId> = self.ancestors(component).collect();
        chain.reverse();

        let mut contributions = Vec::new();
        for id in chain {
            if let Some(indexes) = self.node(id).contributions.get(key) {
                contributions.extend(indexes.iter().map(|&index| self.binding_ref(id, index)));
            }
        }
        contributions
    }

    #[must_use]
    pub(crate) fn multibinding_decl(&self, component: ComponentId, key: &Key) -> Option<&MultibindingDecl> {
        self.ancestors(component).find_map(|id| self.node(id).multibindings.get(key))
    }

    /// Policy of the set from the innermost declaration, or the registry default.
    #[must_use]
    pub(crate) fn set_policy(&self, component: ComponentId, key: &Key) -> (SetPolicy, Option<EqFn>) {
        match self.multibinding_decl(component, key) {
            Some(decl) => (decl.policy.unwrap_or(self.config.set_policy), decl.eq),
            None => (self.config.set_policy, None),
        }
    }

    /// The component itself first, then its ancestors up to the root.
    pub(crate) fn ancestors(&self, component: ComponentId) -> impl Iterator<Item = ComponentId> + '_ {
        core::iter::successors(Some(component), |&id| self.node(id).parent)
    }

    /// Ids handed out inside the crate always come from this registry.
    #[inline]
    pub(crate) fn node(&self, component: ComponentId) -> &ComponentNode {
        &self.nodes[component.0]
    }

    #[inline]
    pub(crate) fn get_node(&self, component: ComponentId) -> Option<&ComponentNode> {
        self.nodes.get(component.0)
    }

    #[inline]
    pub(crate) fn binding_ref(&self, component: ComponentId, index: usize) -> BindingRef<'_> {
        let (key, binding) = &self.node(component).bindings[index];
        BindingRef {
            id: BindingId { component, index },
            key,
            binding,
        }
    }

    #[inline]
    pub(crate) fn components(&self) -> impl Iterator<Item = ComponentId> {
        (0..self.nodes.len()).map(ComponentId)
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("components", &self.names)
            .finish_non_exhaustive()
    }
}
