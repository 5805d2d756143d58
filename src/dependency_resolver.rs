use alloc::{collections::VecDeque, sync::Arc, vec::Vec};

use crate::{
    any::Provided,
    errors::ResolveErrorKind,
    key::TypeInfo,
    multibinding::{ProvidedMap, ProvidedSet},
    Key,
};

/// Extracts a factory argument from the resolved dependencies.
///
/// Implementors declare the keys they need up front with [`DependencyResolver::keys`],
/// so the graph can be validated without running any factory.
pub trait DependencyResolver: Sized {
    fn keys(keys: &mut Vec<Key>);

    #[allow(clippy::missing_errors_doc)]
    fn extract(dependencies: &mut Dependencies) -> Result<Self, ResolveErrorKind>;

    #[inline]
    #[must_use]
    fn dependencies() -> Vec<Key> {
        let mut keys = Vec::new();
        Self::keys(&mut keys);
        keys
    }
}

macro_rules! impl_dependency_resolver {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut)]
        impl<$($ty,)*> DependencyResolver for ($($ty,)*)
        where
            $( $ty: DependencyResolver, )*
        {
            #[inline]
            #[allow(unused_variables)]
            fn keys(keys: &mut Vec<Key>) {
                $( $ty::keys(keys); )*
            }

            #[inline]
            #[allow(unused_variables)]
            fn extract(dependencies: &mut Dependencies) -> Result<Self, ResolveErrorKind> {
                Ok(($($ty::extract(dependencies)?,)*))
            }
        }
    };
}

all_the_tuples!(impl_dependency_resolver);

/// Values resolved for the declared dependency keys of a factory, in declaration order.
pub struct Dependencies {
    values: VecDeque<(Key, Provided)>,
}

impl Dependencies {
    #[inline]
    #[must_use]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, key: Key, value: Provided) {
        self.values.push_back((key, value));
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Takes the next dependency as a single value.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NotDeclared`] if all declared dependencies are taken
    /// - Returns [`ResolveErrorKind::IncorrectType`] if the next dependency isn't a `T`
    pub fn take<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>, ResolveErrorKind> {
        let (key, value) = self.next::<T>()?;
        value.into_single(&key)
    }

    /// Takes the next dependency as an aggregated set.
    ///
    /// # Errors
    /// See [`Self::take`]
    pub fn take_set<T: Send + Sync + 'static>(&mut self) -> Result<ProvidedSet<T>, ResolveErrorKind> {
        let (key, value) = self.next::<T>()?;
        value.into_set(&key)
    }

    /// Takes the next dependency as an aggregated map.
    ///
    /// # Errors
    /// See [`Self::take`]
    pub fn take_map<T: Send + Sync + 'static>(&mut self) -> Result<ProvidedMap<T>, ResolveErrorKind> {
        let (key, value) = self.next::<T>()?;
        value.into_map(&key)
    }

    #[inline]
    fn next<T: 'static>(&mut self) -> Result<(Key, Provided), ResolveErrorKind> {
        self.values.pop_front().ok_or(ResolveErrorKind::NotDeclared {
            expected: TypeInfo::of::<T>(),
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{Dependencies, DependencyResolver};
    use crate::{
        any::{Provided, RcAny},
        inject::{Inject, InjectMap, InjectSet, Named},
        Key, ResolveErrorKind,
    };

    use alloc::{sync::Arc, vec};

    crate::qualifier!(Russia = "Russia");

    struct Tank;

    #[test]
    #[allow(dead_code)]
    fn test_dependency_resolver_impls() {
        fn resolver<T: DependencyResolver>() {}
        fn resolver_with_dep<Dep: Send + Sync + 'static>() {
            resolver::<Inject<Dep>>();
            resolver::<Named<Dep, Russia>>();
            resolver::<(Inject<Dep>, InjectSet<Dep>, InjectMap<Dep, Russia>)>();
        }
    }

    #[test]
    fn test_keys_in_declaration_order() {
        let keys = <(Inject<u8>, Named<Tank, Russia>, InjectSet<Tank, Russia>, InjectMap<u8>)>::dependencies();

        assert_eq!(
            keys,
            vec![
                Key::of::<u8>(),
                Key::named::<Tank>("Russia"),
                Key::named_set_of::<Tank>("Russia"),
                Key::map_of::<u8>(),
            ]
        );
        assert!(<()>::dependencies().is_empty());
    }

    #[test]
    fn test_take() {
        let mut dependencies = Dependencies::with_capacity(2);
        dependencies.push(Key::of::<u8>(), Provided::Single(Arc::new(1u8)));
        dependencies.push(Key::set_of::<u8>(), Provided::Set(vec![Arc::new(2u8) as RcAny]));

        assert_eq!(dependencies.len(), 2);
        assert_eq!(*dependencies.take::<u8>().unwrap(), 1);
        assert_eq!(dependencies.take_set::<u8>().unwrap().len(), 1);
        assert!(dependencies.is_empty());
        assert!(matches!(dependencies.take::<u8>(), Err(ResolveErrorKind::NotDeclared { .. })));
    }
}
