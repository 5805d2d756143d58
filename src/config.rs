use crate::multibinding::SetPolicy;

/// Config for a registry
/// ## Fields
/// - `set_policy`:
///   Duplicate handling for set multibindings that don't declare their own policy.
///
/// - `max_depth`:
///   Maximum depth of nested resolutions for one request.
///   Exceeding it fails with [`crate::ResolveErrorKind::DepthExceeded`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub set_policy: SetPolicy,
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            set_policy: SetPolicy::KeepAll,
            max_depth: 1024,
        }
    }
}
