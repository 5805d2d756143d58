use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Barrier,
    },
    thread,
    time::Duration,
};
use thicket::{
    Binding, BuildErrorKind, ComponentDef, DefaultScope::*, Inject, InjectSet, InstantiateErrorKind, Key, Module, Registry,
    ResolveErrorKind, ValidationErrorKind,
};

struct Engine;
struct Radio;
struct Crew(Arc<Engine>);

struct Squad;
struct Member;

#[test]
fn test_concurrent_singleton_is_constructed_once() {
    const THREADS: usize = 16;

    let call_count = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(
        Registry::new([ComponentDef::new("app", App).install(
            Module::new()
                .provide_scoped(
                    {
                        let call_count = call_count.clone();
                        move || {
                            call_count.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok::<_, InstantiateErrorKind>(Engine)
                        }
                    },
                    App,
                )
                .provide(|Inject(engine): Inject<Engine>| Ok::<_, InstantiateErrorKind>(Crew(engine))),
        )])
        .unwrap(),
    );
    let app = registry.root("app").unwrap().build().unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|index| {
            let app = app.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                if index % 2 == 0 {
                    app.get::<Engine>().unwrap()
                } else {
                    app.get::<Crew>().unwrap().0.clone()
                }
            })
        })
        .collect();
    let engines: Vec<Arc<Engine>> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    assert_eq!(call_count.load(Ordering::SeqCst), 1);
    assert!(engines.iter().all(|engine| Arc::ptr_eq(engine, &engines[0])));
}

#[test]
fn test_distinct_keys_are_constructed_in_parallel() {
    // Both factories wait for each other, a shared lock would never let them meet
    let meeting = Arc::new(Barrier::new(2));
    let registry = Arc::new(
        Registry::new([ComponentDef::new("app", App).install(
            Module::new()
                .provide_scoped(
                    {
                        let meeting = meeting.clone();
                        move || {
                            meeting.wait();
                            Ok::<_, InstantiateErrorKind>(Engine)
                        }
                    },
                    App,
                )
                .provide_scoped(
                    {
                        let meeting = meeting.clone();
                        move || {
                            meeting.wait();
                            Ok::<_, InstantiateErrorKind>(Radio)
                        }
                    },
                    App,
                ),
        )])
        .unwrap(),
    );
    let app = registry.root("app").unwrap().build().unwrap();

    let engine = thread::spawn({
        let app = app.clone();
        move || app.get::<Engine>().is_ok()
    });
    let radio = thread::spawn(move || app.get::<Radio>().is_ok());

    assert!(engine.join().unwrap());
    assert!(radio.join().unwrap());
}

#[test]
fn test_sibling_instances_across_threads() {
    let registry = Arc::new(
        Registry::new([ComponentDef::new("app", App)
            .install(Module::new().provide_scoped(|| Ok::<_, InstantiateErrorKind>(Engine), App))
            .child(ComponentDef::new("request", Request).install(
                Module::new().provide_scoped(|Inject(engine): Inject<Engine>| Ok::<_, InstantiateErrorKind>(Crew(engine)), Request),
            ))])
        .unwrap(),
    );
    let app = registry.root("app").unwrap().build().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            thread::spawn(move || {
                let request = app.child("request").unwrap().build().unwrap();
                let crew = request.get::<Crew>().unwrap();
                assert!(Arc::ptr_eq(&crew, &request.get::<Crew>().unwrap()));
                crew
            })
        })
        .collect();
    let crews: Vec<Arc<Crew>> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    let engine = app.get::<Engine>().unwrap();
    assert!(crews.iter().all(|crew| Arc::ptr_eq(&crew.0, &engine)));
    assert!(!Arc::ptr_eq(&crews[0], &crews[1]));
}

fn squad_module(member_scoped: bool) -> Module {
    let member = Binding::set_contribution(|Inject(_): Inject<Squad>| Ok::<_, InstantiateErrorKind>(Member));
    let member = if member_scoped { member.scoped(App) } else { member };

    Module::new()
        .provide_scoped(|InjectSet(_, _): InjectSet<Member>| Ok::<_, InstantiateErrorKind>(Squad), App)
        .into_set(|| {
            thread::sleep(Duration::from_millis(20));
            Ok::<_, InstantiateErrorKind>(Member)
        })
        .add(Key::set_of::<Member>(), member)
}

#[test]
fn test_cycle_through_set_entered_from_both_ends() {
    let registry = Arc::new(Registry::new([ComponentDef::new("app", App).install(squad_module(false))]).unwrap());
    let app = registry.root("app").unwrap().build().unwrap();
    let barrier = Arc::new(Barrier::new(2));
    let (sender, receiver) = mpsc::channel();

    for from_squad in [true, false] {
        let app = app.clone();
        let barrier = barrier.clone();
        let sender = sender.clone();
        thread::spawn(move || {
            barrier.wait();
            let result = if from_squad {
                app.get::<Squad>().map(|_| ())
            } else {
                app.get_set::<Member>().map(|_| ())
            };
            sender.send(result).unwrap();
        });
    }

    for _ in 0..2 {
        let result = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(ResolveErrorKind::Cycle { .. })));
    }
}

#[test]
fn test_cycle_through_set_with_two_scoped_bindings_is_rejected() {
    let registry = Arc::new(Registry::new([ComponentDef::new("app", App).install(squad_module(true))]).unwrap());

    assert!(matches!(
        registry.root("app").unwrap().build(),
        Err(BuildErrorKind::Validation(ValidationErrorKind::Cycle { .. }))
    ));
}
