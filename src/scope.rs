use core::fmt::{self, Display, Formatter};

/// Lifetime tier of a component.
///
/// A larger priority is a narrower scope: a child component must always be narrower than its parent.
pub trait Scope {
    #[must_use]
    fn name(&self) -> &'static str;

    #[must_use]
    fn priority(&self) -> u8;

    #[inline]
    #[must_use]
    fn data(&self) -> ScopeData {
        ScopeData {
            priority: self.priority(),
            name: self.name(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum DefaultScope {
    App,
    Session,
    Request,
    Action,
}

impl Scope for DefaultScope {
    #[inline]
    fn name(&self) -> &'static str {
        match self {
            DefaultScope::App => "app",
            DefaultScope::Session => "session",
            DefaultScope::Request => "request",
            DefaultScope::Action => "action",
        }
    }

    #[inline]
    fn priority(&self) -> u8 {
        *self as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeData {
    pub priority: u8,
    pub name: &'static str,
}

impl ScopeData {
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str, priority: u8) -> Self {
        Self { priority, name }
    }

    #[inline]
    #[must_use]
    pub const fn is_narrower_than(&self, other: &ScopeData) -> bool {
        self.priority > other.priority
    }
}

impl Scope for ScopeData {
    #[inline]
    fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    fn priority(&self) -> u8 {
        self.priority
    }
}

impl From<DefaultScope> for ScopeData {
    fn from(scope: DefaultScope) -> Self {
        scope.data()
    }
}

impl Display for ScopeData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} priority)", self.name, self.priority)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{DefaultScope::*, Scope as _, ScopeData};

    use alloc::string::ToString as _;

    #[test]
    fn test_default_scope_order() {
        assert!(Session.data().is_narrower_than(&App.data()));
        assert!(Action.data().is_narrower_than(&Request.data()));
        assert!(!App.data().is_narrower_than(&App.data()));
    }

    #[test]
    fn test_custom_scope() {
        let fragment = ScopeData::new("fragment", 10);

        assert_eq!(fragment.data(), fragment);
        assert!(fragment.is_narrower_than(&Action.data()));
        assert_eq!(fragment.to_string(), "fragment (10 priority)");
    }
}
