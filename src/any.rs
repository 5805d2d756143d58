use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::any::Any;

use crate::{
    errors::ResolveErrorKind,
    key::{MapKey, TypeInfo},
    multibinding::{ProvidedMap, ProvidedSet},
    Key,
};

pub type RcAny = Arc<dyn Any + Send + Sync>;

/// Type-erased result of resolving a [`Key`].
#[derive(Clone, Debug)]
pub enum Provided {
    Single(RcAny),
    Set(Vec<RcAny>),
    Map(BTreeMap<MapKey, RcAny>),
}

impl Provided {
    /// # Errors
    /// Returns [`ResolveErrorKind::IncorrectType`] if the value isn't a single `T`.
    pub fn into_single<T: Send + Sync + 'static>(self, key: &Key) -> Result<Arc<T>, ResolveErrorKind> {
        match self {
            Provided::Single(value) => downcast(value, key),
            Provided::Set(_) | Provided::Map(_) => Err(incorrect_type::<T>(key)),
        }
    }

    /// # Errors
    /// Returns [`ResolveErrorKind::IncorrectType`] if the value isn't a set of `T`.
    pub fn into_set<T: Send + Sync + 'static>(self, key: &Key) -> Result<ProvidedSet<T>, ResolveErrorKind> {
        match self {
            Provided::Set(values) => values
                .into_iter()
                .map(|value| downcast(value, key))
                .collect::<Result<Vec<_>, _>>()
                .map(ProvidedSet::new),
            Provided::Single(_) | Provided::Map(_) => Err(incorrect_type::<T>(key)),
        }
    }

    /// # Errors
    /// Returns [`ResolveErrorKind::IncorrectType`] if the value isn't a map of `T`.
    pub fn into_map<T: Send + Sync + 'static>(self, key: &Key) -> Result<ProvidedMap<T>, ResolveErrorKind> {
        match self {
            Provided::Map(entries) => entries
                .into_iter()
                .map(|(map_key, value)| downcast(value, key).map(|value| (map_key, value)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(ProvidedMap::new),
            Provided::Single(_) | Provided::Set(_) => Err(incorrect_type::<T>(key)),
        }
    }
}

#[inline]
fn downcast<T: Send + Sync + 'static>(value: RcAny, key: &Key) -> Result<Arc<T>, ResolveErrorKind> {
    value.downcast().map_err(|_| incorrect_type::<T>(key))
}

#[inline]
fn incorrect_type<T: 'static>(key: &Key) -> ResolveErrorKind {
    ResolveErrorKind::IncorrectType {
        key: key.clone(),
        expected: TypeInfo::of::<T>(),
    }
}

/// Compares data pointers only, vtables of the same type may differ between codegen units.
#[inline]
#[must_use]
pub(crate) fn same_value(left: &RcAny, right: &RcAny) -> bool {
    core::ptr::eq(Arc::as_ptr(left).cast::<()>(), Arc::as_ptr(right).cast::<()>())
}
