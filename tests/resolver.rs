// tests/resolver.rs

use std::error::Error;

use bpm::errors::BpmError;
use bpm::registry::Registry;
use bpm::resolve::{resolve, TargetKind};
use bpm_test_utils::builders::{ActionConfigBuilder, ModuleConfigBuilder, RawConfigBuilder};
use bpm_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn registry() -> Registry {
    RawConfigBuilder::new()
        .with_module(
            "api",
            ModuleConfigBuilder::new("api")
                .action("build", ActionConfigBuilder::new("make").build())
                .action("lint", ActionConfigBuilder::new("clippy").build())
                .build(),
        )
        .with_module(
            "web",
            ModuleConfigBuilder::new("web")
                .action("build", ActionConfigBuilder::new("npm run build").build())
                .build(),
        )
        .with_module(
            "cli",
            ModuleConfigBuilder::new("cli")
                .action("build", ActionConfigBuilder::new("go build").build())
                .build(),
        )
        .build("/repo")
}

#[test]
fn action_in_several_modules_is_a_group_in_module_order() -> TestResult {
    init_tracing();

    let registry = registry();
    let target = resolve(&registry, "build", None)?;

    assert_eq!(target.kind(), TargetKind::Group);
    assert_eq!(target.action_name(), "build");
    let modules: Vec<&str> = target.members().iter().map(|m| m.module.name.as_str()).collect();
    assert_eq!(modules, vec!["api", "web", "cli"]);
    Ok(())
}

#[test]
fn action_in_one_module_is_a_single_target() -> TestResult {
    init_tracing();

    let registry = registry();
    let target = resolve(&registry, "lint", None)?;

    assert!(target.is_single());
    assert_eq!(target.len(), 1);
    assert_eq!(target.members()[0].action.qualified_name(), "api.lint");
    Ok(())
}

#[test]
fn module_filter_selects_exactly_one_member() -> TestResult {
    init_tracing();

    let registry = registry();
    let target = resolve(&registry, "build", Some("web"))?;

    assert!(target.is_single());
    assert_eq!(target.members()[0].module.name, "web");
    assert_eq!(target.members()[0].action.commands, vec!["npm run build"]);
    Ok(())
}

#[test]
fn unknown_action_lists_defined_actions() {
    init_tracing();

    let registry = registry();
    match resolve(&registry, "deploy", None) {
        Err(BpmError::ActionNotFound(msg)) => {
            assert!(msg.contains("no module defines action 'deploy'"), "got: {msg}");
            assert!(msg.contains("build, lint"), "got: {msg}");
        }
        other => panic!("expected ActionNotFound, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn module_filter_errors_name_the_missing_part() {
    init_tracing();

    let registry = registry();

    assert!(matches!(
        resolve(&registry, "lint", Some("web")),
        Err(BpmError::ActionNotFound(ref msg)) if msg.contains("not defined for module 'web'")
    ));
    assert!(matches!(
        resolve(&registry, "build", Some("docs")),
        Err(BpmError::ActionNotFound(ref msg)) if msg.contains("unknown module 'docs'")
    ));
}
