//! Integration tests for the resolver over synthetic resource sets.

use std::sync::Arc;

use quiver_resolver::{ResolveError, Resolver};
use resource_types::{DependencyStrength, Resource, ResourceId};

fn resource(id: &str, required: &[&str], recommended: &[&str]) -> Arc<Resource> {
    let dependencies = if required.is_empty() && recommended.is_empty() {
        String::new()
    } else {
        let list = |ids: &[&str]| {
            ids.iter()
                .map(|id| format!("'{id}'"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "dependencies:\n  required: [{}]\n  recommended: [{}]\n",
            list(required),
            list(recommended)
        )
    };
    Arc::new(
        serde_yaml::from_str(&format!(
            "id: {id}\n\
             type: agent\n\
             name: {id}\n\
             source:\n  url: https://github.com/org/repo\n\
             {dependencies}\
             install_path: agents/{id}.md\n"
        ))
        .unwrap(),
    )
}

fn id(s: &str) -> ResourceId {
    s.parse().unwrap()
}

fn plan_ids(plan: &resource_types::InstallPlan) -> Vec<&str> {
    plan.ids().map(ResourceId::as_str).collect()
}

#[test]
fn diamond_resolves_each_resource_once() {
    let resolver = Resolver::new([
        resource("a", &["b", "c"], &[]),
        resource("b", &["d"], &[]),
        resource("c", &["d"], &[]),
        resource("d", &[], &[]),
    ]);

    let plan = resolver.resolve(&[id("a")], false).unwrap();
    let order = plan_ids(&plan);

    assert_eq!(order.len(), 4, "each resource appears exactly once");
    assert_eq!(order.first(), Some(&"d"));
    assert_eq!(order.last(), Some(&"a"));
    let position = |needle: &str| order.iter().position(|&x| x == needle).unwrap();
    assert!(position("b") > position("d") && position("b") < position("a"));
    assert!(position("c") > position("d") && position("c") < position("a"));
}

#[test]
fn order_is_topological_for_every_required_edge() {
    let resolver = Resolver::new([
        resource("app", &["lib-core", "lib-net"], &[]),
        resource("lib-net", &["lib-core"], &[]),
        resource("lib-core", &["base"], &[]),
        resource("base", &[], &[]),
    ]);

    let plan = resolver.resolve(&[id("app")], false).unwrap();
    let order = plan_ids(&plan);
    assert_eq!(order, ["base", "lib-core", "lib-net", "app"]);
}

#[test]
fn independent_resources_break_ties_lexicographically() {
    let resolver = Resolver::new([
        resource("zeta", &[], &[]),
        resource("alpha", &[], &[]),
        resource("mid", &[], &[]),
    ]);

    let plan = resolver
        .resolve(&[id("zeta"), id("alpha"), id("mid")], false)
        .unwrap();
    assert_eq!(plan_ids(&plan), ["alpha", "mid", "zeta"]);
}

#[test]
fn recommended_dependencies_are_opt_in() {
    let resolver = Resolver::new([
        resource("main", &["req"], &["rec"]),
        resource("req", &[], &[]),
        resource("rec", &[], &[]),
    ]);

    let without = resolver.resolve(&[id("main")], false).unwrap();
    assert_eq!(plan_ids(&without), ["req", "main"]);

    let with = resolver.resolve(&[id("main")], true).unwrap();
    assert_eq!(plan_ids(&with), ["rec", "req", "main"]);

    let strengths: Vec<DependencyStrength> =
        with.iter().map(|planned| planned.strength).collect();
    assert_eq!(
        strengths,
        [
            DependencyStrength::Recommended,
            DependencyStrength::Required,
            DependencyStrength::Required,
        ]
    );
}

#[test]
fn cycle_is_fatal_and_reported_in_full() {
    let resolver = Resolver::new([
        resource("x", &["y"], &[]),
        resource("y", &["z"], &[]),
        resource("z", &["x"], &[]),
        resource("w", &[], &[]),
    ]);

    let err = resolver.resolve(&[id("x")], false).unwrap_err();
    match err {
        ResolveError::CycleDetected { cycles } => {
            assert_eq!(cycles.len(), 1);
            let cycle: Vec<&str> = cycles[0].iter().map(ResourceId::as_str).collect();
            assert_eq!(cycle, ["x", "y", "z"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // A selection that avoids the cycle still resolves.
    let plan = resolver.resolve(&[id("w")], false).unwrap();
    assert_eq!(plan_ids(&plan), ["w"]);
}

#[test]
fn self_dependency_is_a_cycle() {
    let resolver = Resolver::new([resource("selfish", &["selfish"], &[])]);

    let err = resolver.resolve(&[id("selfish")], false).unwrap_err();
    match err {
        ResolveError::CycleDetected { cycles } => {
            assert_eq!(cycles, [vec![id("selfish")]]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_dependency_names_the_referrer() {
    let resolver = Resolver::new([resource("app", &["ghost"], &[])]);

    let err = resolver.resolve(&[id("app")], false).unwrap_err();
    match err {
        ResolveError::MissingDependency { id: missing, referrer } => {
            assert_eq!(missing.as_str(), "ghost");
            assert_eq!(referrer.as_str(), "app");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_dependency_outside_the_closure_is_ignored() {
    let resolver = Resolver::new([
        resource("app", &[], &[]),
        resource("broken", &["ghost"], &[]),
    ]);

    let plan = resolver.resolve(&[id("app")], false).unwrap();
    assert_eq!(plan_ids(&plan), ["app"]);
}

#[test]
fn unknown_selection_is_fatal() {
    let resolver = Resolver::new([resource("app", &[], &[])]);
    assert!(matches!(
        resolver.resolve(&[id("nope")], false),
        Err(ResolveError::UnknownResource { .. })
    ));
}

#[test]
fn empty_selection_yields_an_empty_plan() {
    let resolver = Resolver::new([resource("app", &[], &[])]);
    assert!(resolver.resolve(&[], false).unwrap().is_empty());
}

#[test]
fn deep_chain_resolves_iteratively() {
    // chain-000 <- chain-001 <- ... <- chain-199
    let mut resources = Vec::new();
    for i in 0..200 {
        let name = format!("chain-{i:03}");
        let deps: Vec<String> = if i == 0 {
            Vec::new()
        } else {
            vec![format!("chain-{:03}", i - 1)]
        };
        let dep_refs: Vec<&str> = deps.iter().map(String::as_str).collect();
        resources.push(resource(&name, &dep_refs, &[]));
    }
    let resolver = Resolver::new(resources);

    let plan = resolver.resolve(&[id("chain-199")], false).unwrap();
    assert_eq!(plan.len(), 200);
    assert_eq!(plan_ids(&plan)[0], "chain-000");
    assert_eq!(plan_ids(&plan)[199], "chain-199");
}

#[test]
fn detect_cycles_enumerates_all_of_them() {
    let resolver = Resolver::new([
        resource("a", &["b"], &[]),
        resource("b", &["a"], &[]),
        resource("p", &["q"], &[]),
        resource("q", &["r"], &[]),
        resource("r", &["p"], &[]),
        resource("solo", &[], &[]),
    ]);

    let cycles = resolver.detect_cycles(false);
    assert_eq!(cycles.len(), 2);
    let rendered: Vec<Vec<&str>> = cycles
        .iter()
        .map(|cycle| cycle.iter().map(ResourceId::as_str).collect())
        .collect();
    assert_eq!(rendered, [vec!["a", "b"], vec!["p", "q", "r"]]);
}

#[test]
fn recommended_cycle_counts_only_when_enabled() {
    let resolver = Resolver::new([
        resource("a", &[], &["b"]),
        resource("b", &[], &["a"]),
    ]);

    assert!(resolver.detect_cycles(false).is_empty());
    assert_eq!(resolver.detect_cycles(true).len(), 1);

    // The required-only resolve is unaffected by the recommended cycle.
    let plan = resolver.resolve(&[id("a")], false).unwrap();
    assert_eq!(plan_ids(&plan), ["a"]);

    assert!(matches!(
        resolver.resolve(&[id("a")], true),
        Err(ResolveError::CycleDetected { .. })
    ));
}

#[test]
fn reverse_dependencies_are_transitive() {
    let resolver = Resolver::new([
        resource("app", &["lib"], &[]),
        resource("tool", &["lib"], &[]),
        resource("lib", &["base"], &[]),
        resource("base", &[], &[]),
        resource("bystander", &[], &[]),
    ]);

    let reverse_deps = resolver.reverse_dependencies(&id("base"));
    let dependents: Vec<&str> = reverse_deps.iter().map(ResourceId::as_str).collect();
    assert_eq!(dependents, ["app", "lib", "tool"]);

    assert!(resolver.reverse_dependencies(&id("app")).is_empty());
    assert!(resolver.reverse_dependencies(&id("ghost")).is_empty());
}

#[test]
fn resolution_is_deterministic() {
    let build = || {
        Resolver::new([
            resource("a", &["b", "c"], &[]),
            resource("b", &["d"], &[]),
            resource("c", &["d"], &[]),
            resource("d", &[], &[]),
        ])
    };
    let first = build().resolve(&[id("a")], false).unwrap();
    let second = build().resolve(&[id("a")], false).unwrap();
    assert_eq!(first, second);
}
