use std::collections::BTreeSet;

use tomb_assets::{
    module::{
        ClassId, ClassIndex, ClassInfo, DependencyInfo, Module, ModuleEnvironment, ModuleMetadata,
        ModuleRegistry,
    },
    ModuleError, Name, Version,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn v(s: &str) -> Version {
    s.parse().unwrap()
}

fn id(s: &str) -> ClassId {
    ClassId::new(s)
}

/// core: the engine with its base shape types
/// shapes: concrete shapes built on core
/// fancy: shapes extending a base from `effects`, which the game never depends on
fn registry() -> ModuleRegistry {
    let core = Module::new(
        ModuleMetadata::new("core", v("1.2.0")),
        ClassIndex::new()
            .with(ClassInfo::abstract_class("core::Renderable"))
            .with(ClassInfo::abstract_class("core::Shape").implements("core::Renderable"))
            .with(ClassInfo::concrete("core::Quad").extends("core::Shape")),
    );
    let old_core = Module::new(
        ModuleMetadata::new("core", v("1.0.0")),
        ClassIndex::new().with(ClassInfo::abstract_class("core::Renderable")),
    );
    let shapes = Module::new(
        ModuleMetadata::new("shapes", v("0.5.0"))
            .with_dependency(DependencyInfo::new("core", v("1.1.0"))),
        ClassIndex::new()
            .with(ClassInfo::concrete("shapes::Circle").extends("core::Shape"))
            .with(ClassInfo::concrete("shapes::Star").implements("core::Renderable")),
    );
    let fancy = Module::new(
        ModuleMetadata::new("fancy", v("1.0.0"))
            .with_dependency(DependencyInfo::new("core", v("1.0.0")))
            .with_dependency(DependencyInfo::new("effects", v("1.0.0")).optional()),
        ClassIndex::new()
            .with(ClassInfo::concrete("fancy::Glow").extends("effects::Effect"))
            .with(ClassInfo::concrete("fancy::Sparkle").implements("core::Renderable")),
    );
    let effects = Module::new(
        ModuleMetadata::new("effects", v("1.0.0"))
            .with_dependency(DependencyInfo::new("core", v("1.0.0"))),
        ClassIndex::new()
            .with(ClassInfo::abstract_class("effects::Effect").implements("core::Renderable")),
    );

    let mut registry = ModuleRegistry::new();
    registry.extend([core, old_core, shapes, fancy, effects]);
    registry
}

#[test]
fn merged_queries_cross_modules() {
    init();
    let env = ModuleEnvironment::resolve(&registry(), &[Name::new("shapes")]).unwrap();

    assert_eq!(env.get_module(&Name::new("core")).unwrap().version(), &v("1.2.0"));
    assert!(env.get_module(&Name::new("fancy")).is_none());
    assert_eq!(
        env.get_subtypes_of(&id("core::Renderable")),
        BTreeSet::from([id("core::Quad"), id("shapes::Circle"), id("shapes::Star")])
    );
    assert_eq!(
        env.module_of(&id("shapes::Circle")).unwrap().id(),
        &Name::new("shapes")
    );
}

#[test]
fn isolated_index_misses_cross_module_chains() {
    init();
    let registry = registry();
    let shapes = registry.get(&Name::new("shapes"), &v("0.5.0")).unwrap();

    // Circle only reaches Renderable through core::Shape, which lives in core
    let isolated = shapes.classes().subtypes_of(&id("core::Renderable"));
    assert_eq!(isolated, BTreeSet::from([id("shapes::Star")]));
}

#[test]
fn missing_ancestor_module_excludes_class() {
    init();
    let registry = registry();
    let env = ModuleEnvironment::resolve(&registry, &[Name::new("fancy")]).unwrap();

    assert!(!env.contains_module(&Name::new("effects")));
    assert!(env.class(&id("fancy::Glow")).is_none());
    assert!(env.excluded_classes().contains(&id("fancy::Glow")));
    assert_eq!(
        env.get_subtypes_of(&id("core::Renderable")),
        BTreeSet::from([id("core::Quad"), id("fancy::Sparkle")])
    );

    // its own module still lists it
    let fancy = env.get_module(&Name::new("fancy")).unwrap();
    assert!(fancy.classes().contains(&id("fancy::Glow")));
    assert!(fancy
        .classes()
        .subtypes_of(&id("effects::Effect"))
        .contains(&id("fancy::Glow")));

    // pulling effects in makes it reachable again
    let full =
        ModuleEnvironment::resolve(&registry, &[Name::new("fancy"), Name::new("effects")]).unwrap();
    assert!(full
        .get_subtypes_of(&id("core::Renderable"))
        .contains(&id("fancy::Glow")));
    assert!(full.excluded_classes().is_empty());
}

#[test]
fn conflicting_constraints_fail() {
    init();
    let mut registry = registry();
    registry.add(Module::new(
        ModuleMetadata::new("legacy", v("1.0.0")).with_dependency(
            DependencyInfo::new("core", v("1.0.0")).up_to(v("1.1.0")),
        ),
        ClassIndex::new(),
    ));

    let err = ModuleEnvironment::resolve(&registry, &[Name::new("shapes"), Name::new("legacy")])
        .unwrap_err();
    match err {
        ModuleError::DependencyConflict { module, constraints } => {
            assert_eq!(module, Name::new("core"));
            assert!(constraints.iter().any(|c| c.contains("legacy")));
            assert!(constraints.iter().any(|c| c.contains("shapes")));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn highest_major_version_resolves() {
    init();
    let mut registry = ModuleRegistry::default();
    registry.add(Module::new(
        ModuleMetadata::new("titan", Version::new(u32::MAX, 2, 0)),
        ClassIndex::new().with(ClassInfo::concrete("titan::Hull")),
    ));
    let manifest = format!(
        r#"{{
            "id": "dock",
            "version": "1.0.0",
            "dependencies": [{{ "id": "titan", "min_version": "{}.0.0" }}]
        }}"#,
        u32::MAX
    );
    let dock: ModuleMetadata = serde_json::from_str(&manifest).unwrap();
    registry.add(Module::new(dock, ClassIndex::new()));

    let env = ModuleEnvironment::resolve(&registry, &[Name::new("dock")]).unwrap();
    assert_eq!(
        env.get_module(&Name::new("titan")).unwrap().version(),
        &Version::new(u32::MAX, 2, 0)
    );
    assert!(env.class(&id("titan::Hull")).is_some());
}
