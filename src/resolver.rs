use alloc::{boxed::Box, vec::Vec};
use tracing::{debug, error};

use crate::{
    any::{Provided, RcAny},
    component::Component,
    dependency_resolver::Dependencies,
    errors::{InstantiatorErrorKind, ResolveErrorKind},
    instantiator::BoxedFactory,
    key::MultibindingKind,
    multibinding::{aggregate_map, aggregate_set},
    registry::{BindingId, BindingKind, BindingRef},
    Key,
};

struct Frame {
    binding: BindingId,
    instance: usize,
    key: Key,
}

/// Bindings being constructed by one request, innermost last.
pub(crate) struct ResolveStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl ResolveStack {
    #[inline]
    #[must_use]
    pub(crate) const fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Must be checked before locking the binding's slot, a reentrant lock would deadlock.
    fn enter(&mut self, binding: &BindingRef<'_>, instance: &Component) -> Result<(), ResolveErrorKind> {
        let instance = instance.address();

        if let Some(position) = self
            .frames
            .iter()
            .position(|frame| frame.binding == binding.id && frame.instance == instance)
        {
            let mut path: Vec<Key> = self.frames[position..].iter().map(|frame| frame.key.clone()).collect();
            path.push(binding.key.clone());

            let err = ResolveErrorKind::Cycle { path };
            error!("{}", err);
            return Err(err);
        }
        if self.frames.len() >= self.max_depth {
            let err = ResolveErrorKind::DepthExceeded { depth: self.max_depth };
            error!("{}", err);
            return Err(err);
        }

        self.frames.push(Frame {
            binding: binding.id,
            instance,
            key: binding.key.clone(),
        });
        Ok(())
    }

    #[inline]
    fn exit(&mut self) {
        self.frames.pop();
    }
}

pub(crate) fn resolve(component: &Component, key: &Key, stack: &mut ResolveStack) -> Result<Provided, ResolveErrorKind> {
    if key.is_multibinding() {
        return resolve_multibinding(component, key, stack);
    }
    resolve_single(component, key, stack).map(Provided::Single)
}

fn resolve_single(component: &Component, key: &Key, stack: &mut ResolveStack) -> Result<RcAny, ResolveErrorKind> {
    let registry = component.registry();
    let Some(binding) = registry.lookup(component.id(), key) else {
        let err = ResolveErrorKind::NoBinding {
            key: key.clone(),
            component: registry.node(component.id()).name.clone(),
        };
        error!("{}", err);
        return Err(err);
    };
    provide(component, binding, stack)
}

/// Collects every visible contribution, each one is provided according to its own scope.
fn resolve_multibinding(component: &Component, key: &Key, stack: &mut ResolveStack) -> Result<Provided, ResolveErrorKind> {
    let registry = component.registry();
    let id = component.id();

    let contributions = registry.contributions(id, key);
    if contributions.is_empty() && registry.multibinding_decl(id, key).is_none() {
        let err = ResolveErrorKind::NoBinding {
            key: key.clone(),
            component: registry.node(id).name.clone(),
        };
        error!("{}", err);
        return Err(err);
    }

    if key.multibinding == Some(MultibindingKind::Map) {
        let mut entries = Vec::with_capacity(contributions.len());
        for contribution in contributions {
            if let Some(map_key) = contribution.binding.map_key() {
                entries.push((map_key.clone(), provide(component, contribution, stack)?));
            }
        }
        return aggregate_map(key, entries).map(Provided::Map);
    }

    let mut values = Vec::with_capacity(contributions.len());
    for contribution in contributions {
        values.push(provide(component, contribution, stack)?);
    }
    let (policy, eq) = registry.set_policy(id, key);
    debug!(contributions = values.len(), ?policy, "Set aggregated");

    Ok(Provided::Set(aggregate_set(values, policy, eq)))
}

fn provide(requester: &Component, binding: BindingRef<'_>, stack: &mut ResolveStack) -> Result<RcAny, ResolveErrorKind> {
    if let BindingKind::Slot(_) = binding.binding.kind {
        return provide_instance(requester, binding);
    }

    if binding.binding.scope().is_none() {
        stack.enter(&binding, requester)?;
        let result = produce(requester, binding, stack);
        stack.exit();
        return result;
    }

    let owner = owner_of(requester, binding)?;
    stack.enter(&binding, owner)?;
    let result = owner.inner.cache.get_or_try_init(binding.id, || produce(owner, binding, stack));
    stack.exit();

    let (value, cached) = result?;
    if cached {
        debug!(key = %binding.key, "Found in cache");
    } else {
        debug!(key = %binding.key, component = %owner.name(), "Cached");
    }
    Ok(value)
}

/// Constructs the value, dependencies are resolved from `context`.
fn produce(context: &Component, binding: BindingRef<'_>, stack: &mut ResolveStack) -> Result<RcAny, ResolveErrorKind> {
    match &binding.binding.kind {
        BindingKind::Direct { factory, dependencies }
        | BindingKind::SetContribution { factory, dependencies }
        | BindingKind::MapContribution { factory, dependencies, .. } => {
            instantiate(context, binding.key, factory, dependencies, stack)
        }
        BindingKind::Alias { target, cast } => {
            let value = resolve_single(context, target, stack)?;
            match cast {
                None => Ok(value),
                Some(cast) => (cast.convert)(value).ok_or_else(|| {
                    let err = ResolveErrorKind::IncorrectType {
                        key: target.clone(),
                        expected: cast.source,
                    };
                    error!("{}", err);
                    err
                }),
            }
        }
        BindingKind::Slot(_) => provide_instance(context, binding),
    }
}

fn instantiate(
    context: &Component,
    key: &Key,
    factory: &BoxedFactory,
    dependencies: &[Key],
    stack: &mut ResolveStack,
) -> Result<RcAny, ResolveErrorKind> {
    let mut resolved = Dependencies::with_capacity(dependencies.len());
    for dependency in dependencies {
        let value = resolve(context, dependency, stack)?;
        resolved.push(dependency.clone(), value);
    }

    match factory(resolved) {
        Ok(value) => Ok(value),
        Err(InstantiatorErrorKind::Deps(err)) => {
            error!("{}", err);
            Err(err)
        }
        Err(InstantiatorErrorKind::Factory(source)) => {
            let err = ResolveErrorKind::Factory {
                key: key.clone(),
                source: Box::new(source),
            };
            error!("{}", err);
            Err(err)
        }
    }
}

fn provide_instance(requester: &Component, binding: BindingRef<'_>) -> Result<RcAny, ResolveErrorKind> {
    let owner = owner_of(requester, binding)?;
    match owner.inner.instances.get(binding.key) {
        Some(value) => Ok(value.clone()),
        None => {
            let err = ResolveErrorKind::MissingInstance { key: binding.key.clone() };
            error!("{}", err);
            Err(err)
        }
    }
}

/// Instance of the component installing the binding, found in the requester's chain.
fn owner_of<'c>(requester: &'c Component, binding: BindingRef<'_>) -> Result<&'c Component, ResolveErrorKind> {
    let mut current = Some(requester);
    while let Some(component) = current {
        if component.id() == binding.id.component {
            return Ok(component);
        }
        current = component.parent();
    }

    let err = ResolveErrorKind::NoAccessible {
        key: binding.key.clone(),
        expected_scope_data: requester.registry().node(binding.id.component).scope,
        actual_scope_data: requester.scope(),
    };
    error!("{}", err);
    Err(err)
}
