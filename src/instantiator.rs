use alloc::sync::Arc;
use tracing::debug;

use crate::{
    any::RcAny,
    dependency_resolver::{Dependencies, DependencyResolver},
    errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
};

pub trait Instantiator<Deps>: Send + Sync + 'static
where
    Deps: DependencyResolver,
{
    type Provides: Send + Sync + 'static;
    type Error: Into<InstantiateErrorKind>;

    fn instantiate(&self, dependencies: Deps) -> Result<Self::Provides, Self::Error>;
}

pub(crate) type BoxedFactory =
    Arc<dyn Fn(Dependencies) -> Result<RcAny, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>> + Send + Sync>;

#[must_use]
pub(crate) fn boxed_instantiator_factory<Inst, Deps>(instantiator: Inst) -> BoxedFactory
where
    Inst: Instantiator<Deps>,
    Deps: DependencyResolver,
{
    Arc::new(move |mut dependencies: Dependencies| {
        let dependencies = match Deps::extract(&mut dependencies) {
            Ok(dependencies) => dependencies,
            Err(err) => return Err(InstantiatorErrorKind::Deps(err)),
        };
        let dependency = match instantiator.instantiate(dependencies) {
            Ok(dependency) => dependency,
            Err(err) => return Err(InstantiatorErrorKind::Factory(err.into())),
        };

        debug!("Instantiated");

        Ok(Arc::new(dependency) as RcAny)
    })
}

#[must_use]
pub(crate) fn boxed_fn_factory<F, T>(factory: F) -> BoxedFactory
where
    F: Fn(&mut Dependencies) -> Result<T, InstantiateErrorKind> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    Arc::new(move |mut dependencies: Dependencies| match factory(&mut dependencies) {
        Ok(dependency) => {
            debug!("Instantiated");
            Ok(Arc::new(dependency) as RcAny)
        }
        Err(InstantiateErrorKind::Resolve(err)) => Err(InstantiatorErrorKind::Deps(err)),
        Err(err) => Err(InstantiatorErrorKind::Factory(err)),
    })
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, Err, $($ty,)*> Instantiator<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Result<Response, Err> + Send + Sync + 'static,
            Response: Send + Sync + 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver, )*
        {
            type Provides = Response;
            type Error = Err;

            #[inline]
            fn instantiate(&self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Provides, Self::Error> {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_instantiator);

/// Wrapper to create an instantiator that just returns passed value.
/// It can be used when the value was created outside the registry, but is known at configuration time.
/// Values only known when a component is built should be declared as instance slots instead.
#[inline]
#[must_use]
pub fn instance<T: Clone + Send + Sync + 'static>(val: T) -> impl Instantiator<(), Provides = T, Error = InstantiateErrorKind> {
    move || Ok(val.clone())
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{boxed_fn_factory, boxed_instantiator_factory, instance, DependencyResolver, InstantiateErrorKind, Instantiator};
    use crate::{
        any::Provided,
        dependency_resolver::Dependencies,
        errors::{InstantiatorErrorKind, ResolveErrorKind},
        inject::Inject,
        Key,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
    };
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing::debug;
    use tracing_test::traced_test;

    struct Request(bool);
    struct Response(bool);

    #[test]
    #[allow(dead_code)]
    fn test_factory_helper() {
        fn resolver<Deps: DependencyResolver, F: Instantiator<Deps>>(_f: F) {}
        fn resolver_with_dep<Deps: DependencyResolver>() {
            resolver(|| Ok::<_, InstantiateErrorKind>(()));
            resolver(instance(1u8));
        }
    }

    #[test]
    #[traced_test]
    fn test_boxed_instantiator_factory() {
        let call_count = Arc::new(AtomicU8::new(0));

        let factory = boxed_instantiator_factory({
            let call_count = call_count.clone();
            move |Inject(request): Inject<Request>| {
                call_count.fetch_add(1, Ordering::SeqCst);

                debug!("Call instantiator response");
                Ok::<_, InstantiateErrorKind>(Response(request.0))
            }
        });

        let mut dependencies = Dependencies::with_capacity(1);
        dependencies.push(Key::of::<Request>(), Provided::Single(Arc::new(Request(true))));

        let response = factory(dependencies).ok().unwrap();

        assert!(response.downcast::<Response>().unwrap().0);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Instantiated"));
    }

    #[test]
    #[traced_test]
    fn test_boxed_instantiator_factory_errors() {
        let factory = boxed_instantiator_factory(|Inject(_): Inject<Request>| Ok::<_, InstantiateErrorKind>(Response(true)));

        let mut dependencies = Dependencies::with_capacity(1);
        dependencies.push(Key::of::<Request>(), Provided::Single(Arc::new(1u8)));
        assert!(matches!(
            factory(dependencies),
            Err(InstantiatorErrorKind::Deps(ResolveErrorKind::IncorrectType { .. }))
        ));

        let factory = boxed_instantiator_factory(|| Err::<Response, _>(anyhow::anyhow!("no response")));
        assert!(matches!(
            factory(Dependencies::with_capacity(0)),
            Err(InstantiatorErrorKind::Factory(InstantiateErrorKind::Custom(_)))
        ));
    }

    #[test]
    fn test_boxed_fn_factory() {
        let factory = boxed_fn_factory(|dependencies: &mut Dependencies| {
            let request = dependencies.take::<Request>()?;
            Ok(Response(!request.0))
        });

        let mut dependencies = Dependencies::with_capacity(1);
        dependencies.push(Key::of::<Request>(), Provided::Single(Arc::new(Request(false))));

        let response = factory(dependencies).ok().unwrap();
        assert!(response.downcast::<Response>().unwrap().0);

        assert!(matches!(
            factory(Dependencies::with_capacity(0)),
            Err(InstantiatorErrorKind::Deps(ResolveErrorKind::NotDeclared { .. }))
        ));
    }
}
