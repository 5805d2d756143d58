use alloc::{collections::BTreeSet, vec::Vec};

use crate::{
    errors::ValidationErrorKind,
    key::{MapKey, MultibindingKind},
    registry::{BindingId, BindingRef, ComponentId, Registry},
    Key,
};

type Frame = (BindingId, ComponentId);

/// Checks everything visible from `component`: own and ancestors' bindings, every dependency edge reachable from them.
pub(crate) fn validate_component(registry: &Registry, component: ComponentId) -> Result<(), ValidationErrorKind> {
    check_scopes(registry, component)?;
    check_map_keys(registry, component)?;

    let mut dfs = Dfs {
        registry,
        visited: BTreeSet::new(),
        stack: Vec::new(),
        barriers: Vec::new(),
    };
    for id in registry.ancestors(component) {
        let node = registry.node(id);
        for (key, binding) in &node.bindings {
            if binding.is_contribution() {
                continue;
            }
            if let Some(binding) = registry.lookup(component, key) {
                dfs.visit_binding(binding, component)?;
            }
        }
        for key in node.multibinding_keys() {
            dfs.visit_key(key, component, None)?;
        }
    }
    Ok(())
}

fn check_scopes(registry: &Registry, component: ComponentId) -> Result<(), ValidationErrorKind> {
    for id in registry.ancestors(component) {
        let node = registry.node(id);
        for (key, binding) in &node.bindings {
            match binding.scope() {
                Some(scope) if scope != node.scope => {
                    return Err(ValidationErrorKind::ScopeMismatch {
                        key: key.clone(),
                        declared_scope: scope,
                        installed_at: node.name.clone(),
                    });
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn check_map_keys(registry: &Registry, component: ComponentId) -> Result<(), ValidationErrorKind> {
    for id in registry.ancestors(component) {
        for key in registry.node(id).multibinding_keys() {
            if key.multibinding != Some(MultibindingKind::Map) {
                continue;
            }

            let mut seen: BTreeSet<&MapKey> = BTreeSet::new();
            for contribution in registry.contributions(component, key) {
                let Some(map_key) = contribution.binding.map_key() else {
                    continue;
                };
                if !seen.insert(map_key) {
                    return Err(ValidationErrorKind::DuplicateMapKey {
                        key: key.clone(),
                        map_key: map_key.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

struct Dfs<'a> {
    registry: &'a Registry,
    visited: BTreeSet<Frame>,
    stack: Vec<(Frame, Key)>,
    /// Stack lengths at which a multibinding edge was followed.
    barriers: Vec<usize>,
}

impl<'a> Dfs<'a> {
    fn visit_key(&mut self, key: &Key, context: ComponentId, required_by: Option<&Key>) -> Result<(), ValidationErrorKind> {
        let registry = self.registry;

        if key.is_multibinding() {
            let contributions = registry.contributions(context, key);
            if contributions.is_empty() && registry.multibinding_decl(context, key).is_none() {
                return Err(self.missing(key, context, required_by));
            }

            self.barriers.push(self.stack.len());
            for contribution in contributions {
                self.visit_binding(contribution, context)?;
            }
            self.barriers.pop();
            return Ok(());
        }

        match registry.lookup(context, key) {
            Some(binding) => self.visit_binding(binding, context),
            None => Err(self
                .narrower(key, context)
                .unwrap_or_else(|| self.missing(key, context, required_by))),
        }
    }

    fn visit_binding(&mut self, binding: BindingRef<'a>, requester: ComponentId) -> Result<(), ValidationErrorKind> {
        // Scoped bindings see the graph from the component owning them
        let context = if binding.binding.scope().is_some() {
            binding.id.component
        } else {
            requester
        };
        let frame = (binding.id, context);

        if self.visited.contains(&frame) {
            return Ok(());
        }
        if let Some(position) = self.stack.iter().position(|(visiting, _)| *visiting == frame) {
            // Two scoped bindings on one cycle could wait on each other's slots from different threads
            let barrier = self.barriers.last().copied().unwrap_or(0);
            if position < barrier && self.scoped_on_stack(position) < 2 {
                return Ok(());
            }

            let mut path: Vec<Key> = self.stack[position..].iter().map(|(_, key)| key.clone()).collect();
            path.push(binding.key.clone());
            return Err(ValidationErrorKind::Cycle { path });
        }

        self.stack.push((frame, binding.key.clone()));
        for dependency in binding.binding.dependencies() {
            self.visit_key(dependency, context, Some(binding.key))?;
        }
        self.stack.pop();
        self.visited.insert(frame);

        Ok(())
    }

    fn scoped_on_stack(&self, from: usize) -> usize {
        self.stack[from..]
            .iter()
            .filter(|((id, _), _)| self.registry.binding_ref(id.component, id.index).binding.scope().is_some())
            .count()
    }

    /// A scoped binding of a descendant can't be consumed from `context`, even though it exists.
    fn narrower(&self, key: &Key, context: ComponentId) -> Option<ValidationErrorKind> {
        let registry = self.registry;

        let mut pending: Vec<ComponentId> = registry.node(context).children.clone();
        while let Some(id) = pending.pop() {
            let node = registry.node(id);
            let scoped = node
                .bindings
                .iter()
                .find(|(bound, binding)| bound == key && binding.scope().is_some());
            if let Some((_, binding)) = scoped {
                return binding.scope().map(|declared_scope| ValidationErrorKind::ScopeMismatch {
                    key: key.clone(),
                    declared_scope,
                    installed_at: node.name.clone(),
                });
            }
            pending.extend_from_slice(&node.children);
        }
        None
    }

    fn missing(&self, key: &Key, context: ComponentId, required_by: Option<&Key>) -> ValidationErrorKind {
        ValidationErrorKind::MissingBinding {
            key: key.clone(),
            required_by: required_by.cloned(),
            component: self.registry.node(context).name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use crate::{
        definition::{ComponentDef, Module},
        errors::{InstantiateErrorKind, ValidationErrorKind},
        inject::{Inject, InjectMap, InjectSet},
        registry::{Binding, Registry},
        scope::{DefaultScope::*, Scope as _},
        Key,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        vec,
    };
    use tracing_test::traced_test;

    struct A;
    struct B;

    fn registry(roots: impl IntoIterator<Item = ComponentDef>) -> Registry {
        Registry::new(roots).unwrap()
    }

    fn validate(registry: &Registry, name: &str) -> Result<(), ValidationErrorKind> {
        registry.validate_component(registry.component_id(name).unwrap())
    }

    #[test]
    #[traced_test]
    fn test_missing_binding() {
        let registry = registry([ComponentDef::new("app", App)
            .install(Module::new().provide(|Inject(_): Inject<B>| Ok::<_, InstantiateErrorKind>(A)))]);

        let err = validate(&registry, "app").unwrap_err();
        assert_eq!(
            err,
            ValidationErrorKind::MissingBinding {
                key: Key::of::<B>(),
                required_by: Some(Key::of::<A>()),
                component: "app".into(),
            }
        );
        assert!(logs_contain("Missing binding for B required by A in component app"));
    }

    #[test]
    fn test_cycle() {
        let registry = registry([ComponentDef::new("app", App).install(
            Module::new()
                .provide(|Inject(_): Inject<B>| Ok::<_, InstantiateErrorKind>(A))
                .provide(|Inject(_): Inject<A>| Ok::<_, InstantiateErrorKind>(B)),
        )]);

        let ValidationErrorKind::Cycle { path } = validate(&registry, "app").unwrap_err() else {
            panic!("expected cycle");
        };
        assert_eq!(path, vec![Key::of::<A>(), Key::of::<B>(), Key::of::<A>()]);
        assert!(registry.validate().is_err());
    }

    #[test]
    fn test_alias_cycle() {
        let registry = registry([ComponentDef::new("app", App).install(
            Module::new()
                .alias(Key::named::<A>("first"), Key::named::<A>("second"))
                .alias(Key::named::<A>("second"), Key::named::<A>("first")),
        )]);

        assert!(matches!(
            validate(&registry, "app"),
            Err(ValidationErrorKind::Cycle { path }) if path.len() == 3
        ));
    }

    #[test]
    fn test_cycle_through_multibinding_is_exempt() {
        let registry = registry([ComponentDef::new("app", App).install(
            Module::new()
                .provide(|InjectSet(_, _): InjectSet<B>| Ok::<_, InstantiateErrorKind>(A))
                .into_set(|Inject(_): Inject<A>| Ok::<_, InstantiateErrorKind>(B)),
        )]);

        assert_eq!(validate(&registry, "app"), Ok(()));
    }

    #[test]
    fn test_empty_multibinding() {
        let undeclared = registry([ComponentDef::new("app", App)
            .install(Module::new().provide(|InjectSet(_, _): InjectSet<B>| Ok::<_, InstantiateErrorKind>(A)))]);
        assert!(matches!(
            validate(&undeclared, "app"),
            Err(ValidationErrorKind::MissingBinding { key, .. }) if key == Key::set_of::<B>()
        ));

        let declared = registry([ComponentDef::new("app", App).install(
            Module::new()
                .declare_set::<B>()
                .declare_map::<u8>()
                .provide(|InjectSet(_, _): InjectSet<B>, InjectMap(_, _): InjectMap<u8>| Ok::<_, InstantiateErrorKind>(A)),
        )]);
        assert_eq!(validate(&declared, "app"), Ok(()));
    }

    #[test]
    fn test_scope_mismatch() {
        let registry = registry([ComponentDef::new("app", App)
            .install(Module::new().provide_scoped(|| Ok::<_, InstantiateErrorKind>(A), Session))
            .child(ComponentDef::new("session", Session))]);

        assert!(matches!(
            validate(&registry, "app"),
            Err(ValidationErrorKind::ScopeMismatch { installed_at, .. }) if installed_at == "app"
        ));
        assert!(validate(&registry, "session").is_err());
    }

    #[test]
    #[traced_test]
    fn test_narrower_binding_isnt_visible_from_parent() {
        let registry = registry([ComponentDef::new("app", App)
            .install(Module::new().provide(|Inject(_): Inject<B>| Ok::<_, InstantiateErrorKind>(A)))
            .child(
                ComponentDef::new("session", Session)
                    .install(Module::new().provide_scoped(|| Ok::<_, InstantiateErrorKind>(B), Session)),
            )]);

        assert_eq!(
            validate(&registry, "app"),
            Err(ValidationErrorKind::ScopeMismatch {
                key: Key::of::<B>(),
                declared_scope: Session.data(),
                installed_at: "session".into(),
            })
        );
        assert_eq!(validate(&registry, "session"), Ok(()));
        assert!(logs_contain("Binding for B with scope session (1 priority) in component session"));

        let registry = self::registry([ComponentDef::new("app", App)
            .install(Module::new().provide_scoped(|Inject(_): Inject<B>| Ok::<_, InstantiateErrorKind>(A), App))
            .child(
                ComponentDef::new("session", Session)
                    .install(Module::new().provide_scoped(|| Ok::<_, InstantiateErrorKind>(B), Session)),
            )]);

        assert!(matches!(
            validate(&registry, "session"),
            Err(ValidationErrorKind::ScopeMismatch { key, installed_at, .. }) if key == Key::of::<B>() && installed_at == "session"
        ));
    }

    #[test]
    fn test_unscoped_descendant_binding_is_missing() {
        let registry = registry([ComponentDef::new("app", App)
            .install(Module::new().provide_scoped(|Inject(_): Inject<B>| Ok::<_, InstantiateErrorKind>(A), App))
            .child(ComponentDef::new("session", Session).install(Module::new().provide(|| Ok::<_, InstantiateErrorKind>(B))))]);

        assert!(matches!(
            validate(&registry, "session"),
            Err(ValidationErrorKind::MissingBinding { key, component, .. }) if key == Key::of::<B>() && component == "app"
        ));
    }

    #[test]
    fn test_cycle_through_multibinding_with_scoped_bindings() {
        let one_scoped = registry([ComponentDef::new("app", App).install(
            Module::new()
                .provide_scoped(|InjectSet(_, _): InjectSet<B>| Ok::<_, InstantiateErrorKind>(A), App)
                .into_set(|Inject(_): Inject<A>| Ok::<_, InstantiateErrorKind>(B)),
        )]);
        assert_eq!(validate(&one_scoped, "app"), Ok(()));

        let two_scoped = registry([ComponentDef::new("app", App).install(
            Module::new()
                .provide_scoped(|InjectSet(_, _): InjectSet<B>| Ok::<_, InstantiateErrorKind>(A), App)
                .into_set(|| Ok::<_, InstantiateErrorKind>(B))
                .add(
                    Key::set_of::<B>(),
                    Binding::set_contribution(|Inject(_): Inject<A>| Ok::<_, InstantiateErrorKind>(B)).scoped(App),
                ),
        )]);
        assert_eq!(
            validate(&two_scoped, "app"),
            Err(ValidationErrorKind::Cycle {
                path: vec![Key::of::<A>(), Key::set_of::<B>(), Key::of::<A>()],
            })
        );
    }

    #[test]
    fn test_duplicate_map_key() {
        let registry = registry([ComponentDef::new("app", App)
            .install(Module::new().into_map("T-34", || Ok::<_, InstantiateErrorKind>(1u8)))
            .child(ComponentDef::new("session", Session).install(Module::new().into_map("T-34", || Ok::<_, InstantiateErrorKind>(2u8))))]);

        assert_eq!(validate(&registry, "app"), Ok(()));
        assert!(matches!(
            validate(&registry, "session"),
            Err(ValidationErrorKind::DuplicateMapKey { key, .. }) if key == Key::map_of::<u8>()
        ));
    }

    #[test]
    #[traced_test]
    fn test_memoized() {
        let registry = registry([ComponentDef::new("app", App).install(Module::new().provide(|| Ok::<_, InstantiateErrorKind>(A)))]);

        assert_eq!(validate(&registry, "app"), Ok(()));
        assert_eq!(validate(&registry, "app"), Ok(()));

        logs_assert(|lines: &[&str]| match lines.iter().filter(|line| line.contains("Validated")).count() {
            1 => Ok(()),
            count => Err(format!("expected one validation, got {count}")),
        });
    }
}
