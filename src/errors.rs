mod builder;
mod instantiate;
mod instantiator;
mod registry;
mod resolve;
mod validation;

pub use builder::BuildErrorKind;
pub use instantiate::InstantiateErrorKind;
pub use instantiator::InstantiatorErrorKind;
pub use registry::RegistryErrorKind;
pub use resolve::ResolveErrorKind;
pub use validation::ValidationErrorKind;
