//! End-to-end resolution: discovery, inclusion, model, and context together.

use caisson_config::{
    AnchorLocator, Config, Entrypoint, Overrides, load_document, resolve_context,
};
use caisson_test_utils::TestProject;

/// The full pipeline as the launcher drives it: locate, load, validate,
/// resolve.
fn resolve_in(
    start: &std::path::Path,
    command: &[&str],
    overrides: Overrides,
) -> (caisson_config::Discovery, caisson_config::ExecutionContext) {
    let locator = AnchorLocator::new(false).with_boundary_check(|_| false);
    let discovery = locator.locate_from(start).unwrap();
    let doc = load_document(&discovery.anchor_path()).unwrap();
    let config = Config::from_value(&doc).unwrap();
    let command: Vec<String> = command.iter().map(ToString::to_string).collect();
    let context = resolve_context(&config, &command, &overrides).unwrap();
    (discovery, context)
}

#[test]
fn nested_invocation_resolves_against_the_project_root() {
    let project = TestProject::new();
    project.write_anchor(
        "image: busybox\n\
         environment:\n  TIER: base\n\
         aliases:\n  check: make test\n",
    );
    let deep = project.mkdirs("src/engine");

    let (discovery, context) =
        resolve_in(&deep, &["check", "--verbose"], Overrides::default());

    assert_eq!(discovery.root, project.root());
    assert_eq!(discovery.rel, std::path::Path::new("src/engine"));
    assert_eq!(discovery.root.join(&discovery.rel), deep);

    assert_eq!(context.image, "busybox");
    assert_eq!(context.script, ["make test --verbose"]);
    assert_eq!(context.environment["TIER"], "base");
}

#[test]
fn included_values_feed_the_model_transparently() {
    let project = TestProject::new();
    project.write_file(
        "shared/versions.yml",
        "toolchains:\n  stable:\n    image: rust:1.80\n",
    );
    project.write_file(
        "shared/scripts.yml",
        "ci:\n  - cargo fmt --check\n  - cargo test\n",
    );
    project.write_anchor(
        "image: !from_yaml shared/versions.yml toolchains.stable.image\n\
         aliases:\n  ci:\n    script: !from_yaml shared/scripts.yml ci\n",
    );

    let (_, context) = resolve_in(project.root(), &["ci"], Overrides::default());
    assert_eq!(context.image, "rust:1.80");
    assert_eq!(context.script, ["cargo fmt --check", "cargo test"]);
}

#[test]
fn alias_overrides_compose_with_call_site_overrides() {
    let project = TestProject::new();
    project.write_anchor(
        "image: base-img\n\
         shell: /bin/sh\n\
         entrypoint: /bin/global\n\
         aliases:\n  \
           release:\n    \
             image: release-img\n    \
             shell: /bin/bash\n    \
             entrypoint:\n    \
             root: true\n    \
             script:\n      \
               - ./package\n      \
               - ./publish\n",
    );

    let (_, context) = resolve_in(
        project.root(),
        &["release"],
        Overrides {
            image: Some("pinned-img".to_string()),
            shell: None,
        },
    );

    assert_eq!(context.image, "pinned-img");
    assert_eq!(context.shell, "/bin/bash");
    assert_eq!(context.entrypoint, Entrypoint::Cleared);
    assert!(context.as_root);
    assert_eq!(context.script, ["./package", "./publish"]);
}

#[test]
fn hook_scripts_survive_to_the_staging_layer() {
    use caisson_config::HookPhase;
    use caisson_launch::StagingDir;

    let project = TestProject::new();
    project.write_anchor(
        "image: busybox\n\
         hooks:\n  \
           root:\n    \
             script:\n      \
               - apk add build-base\n      \
               - adduser -D builder\n  \
           user: touch /tmp/ready\n",
    );

    let doc = load_document(&project.root().join(".caisson.yml")).unwrap();
    let config = Config::from_value(&doc).unwrap();

    let staging = StagingDir::create().unwrap();
    for phase in HookPhase::ALL {
        let lines = config.hooks().get(phase);
        assert!(!lines.is_empty());
        staging.write_hook_script(phase, "/bin/sh", lines).unwrap();
    }

    let root_hook =
        std::fs::read_to_string(staging.host_path().join("hooks/root.sh")).unwrap();
    assert!(root_hook.starts_with("#!/bin/sh\n"));
    assert!(root_hook.contains("apk add build-base\nadduser -D builder\n"));

    let user_hook =
        std::fs::read_to_string(staging.host_path().join("hooks/user.sh")).unwrap();
    assert!(user_hook.contains("touch /tmp/ready\n"));
}
