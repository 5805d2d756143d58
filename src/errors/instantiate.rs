use super::ResolveErrorKind;

/// Failure raised by a factory body.
///
/// Any error convertible into [`anyhow::Error`] can be returned with `?` from a factory.
/// [`ResolveErrorKind`] is kept as is, so a failed [`crate::Dependencies::take`] propagates unchanged.
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error(transparent)]
    Resolve(#[from] ResolveErrorKind),
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}
