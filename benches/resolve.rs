#![allow(dead_code)]

use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use thicket::{Component, ComponentDef, DefaultScope::*, Inject, InstantiateErrorKind, Module, Registry};

struct A(Arc<B>, Arc<C>);
struct B(i32);
struct C(Arc<CA>);
struct CA(Arc<CAA>);
struct CAA(Arc<CAAA>);
struct CAAA;

#[inline]
fn module(scoped: bool) -> Module {
    let module = Module::new()
        .provide(|Inject(caaa): Inject<CAAA>| Ok::<_, InstantiateErrorKind>(CAA(caaa)))
        .provide(|Inject(caa): Inject<CAA>| Ok::<_, InstantiateErrorKind>(CA(caa)))
        .provide(|Inject(ca): Inject<CA>| Ok::<_, InstantiateErrorKind>(C(ca)))
        .provide(|Inject(b): Inject<B>, Inject(c): Inject<C>| Ok::<_, InstantiateErrorKind>(A(b, c)));
    if scoped {
        module
            .provide_scoped(|| Ok::<_, InstantiateErrorKind>(CAAA), App)
            .provide_scoped(|| Ok::<_, InstantiateErrorKind>(B(2)), App)
    } else {
        module
            .provide(|| Ok::<_, InstantiateErrorKind>(CAAA))
            .provide(|| Ok::<_, InstantiateErrorKind>(B(2)))
    }
}

#[inline]
fn registry(scoped: bool) -> Arc<Registry> {
    Arc::new(
        Registry::new([ComponentDef::new("app", App)
            .install(module(scoped))
            .child(ComponentDef::new("session", Session).child(ComponentDef::new("request", Request)))])
        .unwrap(),
    )
}

#[inline]
fn component_child_chain(app: &Component) {
    let session = app.child("session").unwrap().build().unwrap();
    let _ = session.child("request").unwrap().build().unwrap();
}

#[inline]
fn component_get(component: &Component) {
    let _ = component.get::<A>().unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let transient = registry(false).root("app").unwrap().build().unwrap();
    let scoped = registry(true).root("app").unwrap().build().unwrap();

    c.bench_function("registry_new", |b| b.iter(|| registry(false)))
        .bench_function("registry_validate", |b| b.iter(|| registry(false).validate().unwrap()))
        .bench_function("component_child_chain", |b| b.iter(|| component_child_chain(&scoped)))
        .bench_function("component_get", |b| b.iter(|| component_get(&transient)))
        .bench_function("component_get_with_cache", |b| b.iter(|| component_get(&scoped)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
