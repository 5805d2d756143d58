use alloc::{sync::Arc, vec::Vec};
use core::marker::PhantomData;

use crate::{
    dependency_resolver::{Dependencies, DependencyResolver},
    errors::ResolveErrorKind,
    key::Qualifier,
    multibinding::{ProvidedMap, ProvidedSet},
    Key,
};

/// Unqualified dependency.
pub struct Inject<Dep>(pub Arc<Dep>);

impl<Dep: Send + Sync + 'static> DependencyResolver for Inject<Dep> {
    #[inline]
    fn keys(keys: &mut Vec<Key>) {
        keys.push(Key::of::<Dep>());
    }

    #[inline]
    fn extract(dependencies: &mut Dependencies) -> Result<Self, ResolveErrorKind> {
        dependencies.take().map(Self)
    }
}

/// Dependency with a type-level qualifier, see [`crate::qualifier!`].
pub struct Named<Dep, Q>(pub Arc<Dep>, pub PhantomData<Q>);

impl<Dep: Send + Sync + 'static, Q: Qualifier> DependencyResolver for Named<Dep, Q> {
    #[inline]
    fn keys(keys: &mut Vec<Key>) {
        keys.push(Key::qualified::<Dep, Q>());
    }

    #[inline]
    fn extract(dependencies: &mut Dependencies) -> Result<Self, ResolveErrorKind> {
        dependencies.take().map(|dep| Self(dep, PhantomData))
    }
}

/// Set aggregated from all visible contributions of element type `Dep`.
pub struct InjectSet<Dep, Q = ()>(pub ProvidedSet<Dep>, pub PhantomData<Q>);

impl<Dep: Send + Sync + 'static, Q: Qualifier> DependencyResolver for InjectSet<Dep, Q> {
    #[inline]
    fn keys(keys: &mut Vec<Key>) {
        keys.push(Key::set_of::<Dep>().with_qualifier_of::<Q>());
    }

    #[inline]
    fn extract(dependencies: &mut Dependencies) -> Result<Self, ResolveErrorKind> {
        dependencies.take_set().map(|set| Self(set, PhantomData))
    }
}

/// Map aggregated from all visible contributions of value type `Dep`.
pub struct InjectMap<Dep, Q = ()>(pub ProvidedMap<Dep>, pub PhantomData<Q>);

impl<Dep: Send + Sync + 'static, Q: Qualifier> DependencyResolver for InjectMap<Dep, Q> {
    #[inline]
    fn keys(keys: &mut Vec<Key>) {
        keys.push(Key::map_of::<Dep>().with_qualifier_of::<Q>());
    }

    #[inline]
    fn extract(dependencies: &mut Dependencies) -> Result<Self, ResolveErrorKind> {
        dependencies.take_map().map(|map| Self(map, PhantomData))
    }
}
