// tests/property_ordering.rs

use proptest::prelude::*;

use bpm::engine::ExecutionPlan;
use bpm::registry::Registry;
use bpm::resolve::resolve;
use bpm::types::ExecMode;
use bpm_test_utils::builders::{ActionConfigBuilder, ModuleConfigBuilder, RawConfigBuilder};

/// Per module: (defines `build`, background-capable).
fn modules_strategy(max_modules: usize) -> impl Strategy<Value = Vec<(bool, bool)>> {
    proptest::collection::vec((any::<bool>(), any::<bool>()), 1..=max_modules)
}

fn registry_from(layout: &[(bool, bool)]) -> Registry {
    let mut builder = RawConfigBuilder::new();
    for (i, (has_build, background)) in layout.iter().enumerate() {
        let name = format!("mod_{}", i);
        let mut module = ModuleConfigBuilder::new(&name)
            .action("other", ActionConfigBuilder::new("true").build());
        if *has_build {
            module = module.action(
                "build",
                ActionConfigBuilder::new(&format!("echo {}", name))
                    .background(*background)
                    .build(),
            );
        }
        builder = builder.with_module(&name, module.build());
    }
    builder.build("/repo")
}

proptest! {
    #[test]
    fn group_members_follow_declaration_order(layout in modules_strategy(12)) {
        let registry = registry_from(&layout);

        let expected: Vec<String> = layout
            .iter()
            .enumerate()
            .filter(|(_, (has_build, _))| *has_build)
            .map(|(i, _)| format!("mod_{}", i))
            .collect();

        let found: Vec<String> = registry
            .actions_named("build")
            .into_iter()
            .map(|(m, _)| m.name.clone())
            .collect();
        prop_assert_eq!(&found, &expected);

        match resolve(&registry, "build", None) {
            Ok(target) => {
                prop_assert!(!expected.is_empty());
                prop_assert_eq!(target.is_single(), expected.len() == 1);
            }
            Err(_) => prop_assert!(expected.is_empty()),
        }
    }

    #[test]
    fn plan_partitions_without_reordering(layout in modules_strategy(12)) {
        let registry = registry_from(&layout);
        let Ok(target) = resolve(&registry, "build", None) else {
            return Ok(());
        };

        let plan = ExecutionPlan::build(&target, ExecMode::Normal, &[]).unwrap();
        prop_assert_eq!(plan.len(), target.len());

        // group order is recoverable from the plan
        let in_order: Vec<String> = plan.members().iter().map(|inv| inv.module.clone()).collect();
        let resolved: Vec<String> = target.members().iter().map(|m| m.module.name.clone()).collect();
        prop_assert_eq!(in_order, resolved);

        // each partition keeps relative order
        prop_assert!(plan.foreground.windows(2).all(|w| w[0].position < w[1].position));
        prop_assert!(plan.background.windows(2).all(|w| w[0].position < w[1].position));

        if target.is_single() {
            prop_assert!(plan.background.is_empty());
        } else {
            for inv in plan.foreground.iter().chain(plan.background.iter()) {
                let member = &target.members()[inv.position];
                prop_assert_eq!(inv.background, member.action.background_capable);
            }
        }
    }
}
