use alloc::{borrow::Cow, string::String};
use core::{
    any::{type_name, TypeId},
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// Type name without its module path, generic arguments are kept as is.
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split_once('<').map_or(self.name, |(base, _)| base);
        match base.rsplit_once("::") {
            Some((path, _)) => &self.name[path.len() + 2..],
            None => self.name,
        }
    }
}

/// Type-level qualifier used by typed extractors such as [`crate::Named`].
///
/// `()` is the absence of a qualifier. Use [`crate::qualifier!`] to declare named ones.
pub trait Qualifier: 'static {
    fn name() -> Option<&'static str>;
}

impl Qualifier for () {
    #[inline]
    fn name() -> Option<&'static str> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MultibindingKind {
    Set,
    Map,
}

/// Identity of an injectable value: type, optional qualifier and optional multibinding marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub type_info: TypeInfo,
    pub qualifier: Option<Cow<'static, str>>,
    pub multibinding: Option<MultibindingKind>,
}

impl Key {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            qualifier: None,
            multibinding: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn named<T: ?Sized + 'static>(qualifier: impl Into<Cow<'static, str>>) -> Self {
        Self::of::<T>().with_qualifier(qualifier)
    }

    #[inline]
    #[must_use]
    pub fn qualified<T: ?Sized + 'static, Q: Qualifier>() -> Self {
        Self::of::<T>().with_qualifier_of::<Q>()
    }

    /// Key of the set aggregated from contributions of element type `T`.
    #[inline]
    #[must_use]
    pub fn set_of<T: ?Sized + 'static>() -> Self {
        Self::of::<T>().with_multibinding(MultibindingKind::Set)
    }

    #[inline]
    #[must_use]
    pub fn named_set_of<T: ?Sized + 'static>(qualifier: impl Into<Cow<'static, str>>) -> Self {
        Self::set_of::<T>().with_qualifier(qualifier)
    }

    /// Key of the map aggregated from contributions of value type `T`.
    #[inline]
    #[must_use]
    pub fn map_of<T: ?Sized + 'static>() -> Self {
        Self::of::<T>().with_multibinding(MultibindingKind::Map)
    }

    #[inline]
    #[must_use]
    pub fn named_map_of<T: ?Sized + 'static>(qualifier: impl Into<Cow<'static, str>>) -> Self {
        Self::map_of::<T>().with_qualifier(qualifier)
    }

    #[inline]
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<Cow<'static, str>>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_qualifier_of<Q: Qualifier>(mut self) -> Self {
        self.qualifier = Q::name().map(Cow::Borrowed);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_multibinding(mut self, kind: MultibindingKind) -> Self {
        self.multibinding = Some(kind);
        self
    }

    #[inline]
    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    #[inline]
    #[must_use]
    pub const fn is_multibinding(&self) -> bool {
        self.multibinding.is_some()
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_info.short_name())?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, "@{qualifier}")?;
        }
        match self.multibinding {
            Some(MultibindingKind::Set) => f.write_str(" [set]"),
            Some(MultibindingKind::Map) => f.write_str(" [map]"),
            None => Ok(()),
        }
    }
}

/// Key of one entry in a map multibinding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Str(Cow<'static, str>),
    Int(i64),
    Type(TypeInfo),
}

impl MapKey {
    #[inline]
    #[must_use]
    pub fn of_type<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeInfo::of::<T>())
    }
}

impl Display for MapKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Str(val) => write!(f, "{val:?}"),
            MapKey::Int(val) => write!(f, "{val}"),
            MapKey::Type(type_info) => f.write_str(type_info.short_name()),
        }
    }
}

impl From<&'static str> for MapKey {
    fn from(val: &'static str) -> Self {
        Self::Str(Cow::Borrowed(val))
    }
}

impl From<String> for MapKey {
    fn from(val: String) -> Self {
        Self::Str(Cow::Owned(val))
    }
}

impl From<i64> for MapKey {
    fn from(val: i64) -> Self {
        Self::Int(val)
    }
}

impl From<i32> for MapKey {
    fn from(val: i32) -> Self {
        Self::Int(val.into())
    }
}

impl From<u32> for MapKey {
    fn from(val: u32) -> Self {
        Self::Int(val.into())
    }
}

impl From<TypeInfo> for MapKey {
    fn from(val: TypeInfo) -> Self {
        Self::Type(val)
    }
}

pub(crate) struct KeyPath<'a>(pub(crate) &'a [Key]);

impl Display for KeyPath<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, key) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}
