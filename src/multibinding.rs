use alloc::{
    collections::{btree_map, BTreeMap},
    sync::Arc,
    vec::Vec,
};
use core::{
    any::Any,
    fmt::{self, Debug, Formatter},
    slice,
};
use tracing::error;

use crate::{
    any::{same_value, RcAny},
    errors::ResolveErrorKind,
    Key, MapKey,
};

/// Duplicate handling for set multibindings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SetPolicy {
    /// Every contribution is kept, duplicates are meaningful.
    #[default]
    KeepAll,
    /// Contributions equal to an earlier one are dropped.
    /// Equality is value equality when the set is declared with
    /// [`crate::Module::declare_set_with_policy`], identity otherwise.
    DedupByValue,
}

pub(crate) type EqFn = fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> bool;

#[must_use]
pub(crate) fn erased_eq<T: PartialEq + 'static>(left: &(dyn Any + Send + Sync), right: &(dyn Any + Send + Sync)) -> bool {
    match (left.downcast_ref::<T>(), right.downcast_ref::<T>()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Declaration of a multibinding, allows it to be empty and sets its duplicate policy.
#[derive(Clone, Copy, Default)]
pub struct MultibindingDecl {
    pub(crate) policy: Option<SetPolicy>,
    pub(crate) eq: Option<EqFn>,
}

impl MultibindingDecl {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { policy: None, eq: None }
    }

    #[inline]
    #[must_use]
    pub fn with_policy<T: PartialEq + 'static>(policy: SetPolicy) -> Self {
        Self {
            policy: Some(policy),
            eq: Some(erased_eq::<T>),
        }
    }
}

pub(crate) fn aggregate_set(values: Vec<RcAny>, policy: SetPolicy, eq: Option<EqFn>) -> Vec<RcAny> {
    match policy {
        SetPolicy::KeepAll => values,
        SetPolicy::DedupByValue => {
            let mut unique: Vec<RcAny> = Vec::with_capacity(values.len());
            for value in values {
                let duplicate = unique
                    .iter()
                    .any(|kept| same_value(kept, &value) || eq.is_some_and(|eq| eq(&**kept, &*value)));
                if !duplicate {
                    unique.push(value);
                }
            }
            unique
        }
    }
}

pub(crate) fn aggregate_map(key: &Key, entries: Vec<(MapKey, RcAny)>) -> Result<BTreeMap<MapKey, RcAny>, ResolveErrorKind> {
    let mut map = BTreeMap::new();
    for (map_key, value) in entries {
        match map.entry(map_key) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(value);
            }
            btree_map::Entry::Occupied(entry) => {
                let err = ResolveErrorKind::DuplicateMapKey {
                    key: key.clone(),
                    map_key: entry.key().clone(),
                };
                error!("{}", err);
                return Err(err);
            }
        }
    }
    Ok(map)
}

/// Aggregated set multibinding.
///
/// Elements follow the component chain from the outermost component to the requesting one,
/// and registration order inside one component.
pub struct ProvidedSet<T>(Vec<Arc<T>>);

impl<T> ProvidedSet<T> {
    #[inline]
    #[must_use]
    pub(crate) const fn new(values: Vec<Arc<T>>) -> Self {
        Self(values)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Arc<T>> {
        self.0.iter()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Arc<T>] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<Arc<T>> {
        self.0
    }
}

impl<T> Clone for ProvidedSet<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Debug> Debug for ProvidedSet<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl<T> IntoIterator for ProvidedSet<T> {
    type Item = Arc<T>;
    type IntoIter = alloc::vec::IntoIter<Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ProvidedSet<T> {
    type Item = &'a Arc<T>;
    type IntoIter = slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Aggregated map multibinding.
pub struct ProvidedMap<T>(BTreeMap<MapKey, Arc<T>>);

impl<T> ProvidedMap<T> {
    #[inline]
    #[must_use]
    pub(crate) const fn new(entries: BTreeMap<MapKey, Arc<T>>) -> Self {
        Self(entries)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, map_key: impl Into<MapKey>) -> Option<&Arc<T>> {
        self.0.get(&map_key.into())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> btree_map::Keys<'_, MapKey, Arc<T>> {
        self.0.keys()
    }

    #[inline]
    pub fn iter(&self) -> btree_map::Iter<'_, MapKey, Arc<T>> {
        self.0.iter()
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<MapKey, Arc<T>> {
        self.0
    }
}

impl<T> Clone for ProvidedMap<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Debug> Debug for ProvidedMap<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{aggregate_map, aggregate_set, erased_eq, EqFn, SetPolicy};
    use crate::{any::RcAny, Key, MapKey, ResolveErrorKind};

    use alloc::{sync::Arc, vec, vec::Vec};

    fn values() -> Vec<RcAny> {
        let shared: RcAny = Arc::new(1u8);
        vec![shared.clone(), Arc::new(2u8), shared, Arc::new(2u8)]
    }

    #[test]
    fn test_keep_all() {
        assert_eq!(aggregate_set(values(), SetPolicy::KeepAll, None).len(), 4);
    }

    #[test]
    fn test_dedup_by_identity() {
        assert_eq!(aggregate_set(values(), SetPolicy::DedupByValue, None).len(), 3);
    }

    #[test]
    fn test_dedup_by_value() {
        let eq: EqFn = erased_eq::<u8>;
        let unique = aggregate_set(values(), SetPolicy::DedupByValue, Some(eq));

        assert_eq!(unique.len(), 2);
        assert_eq!(*unique[0].clone().downcast::<u8>().unwrap(), 1);
        assert_eq!(*unique[1].clone().downcast::<u8>().unwrap(), 2);
    }

    #[test]
    fn test_aggregate_map_duplicate_key() {
        let key = Key::map_of::<u8>();

        let map = aggregate_map(&key, vec![(MapKey::from("a"), Arc::new(1u8) as RcAny), (MapKey::from("b"), Arc::new(2u8))]).unwrap();
        assert_eq!(map.len(), 2);

        let err = aggregate_map(&key, vec![(MapKey::from("a"), Arc::new(1u8) as RcAny), (MapKey::from("a"), Arc::new(2u8))]).unwrap_err();
        assert!(matches!(err, ResolveErrorKind::DuplicateMapKey { map_key: MapKey::Str(_), .. }));
    }
}
