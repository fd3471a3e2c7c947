// tests/package_info.rs

//! Published metadata, package verification, source fetching and strategy
//! selection

mod common;

use common::*;
use ragel_installer::recipe::kitchen::{EnvProvider, select_strategy};
use ragel_installer::recipe::{Arch, Compiler, CompilerFamily, Os, Target};
use ragel_installer::{Error, Kitchen, KitchenConfig, PackageInfo, StrategyKind};
use std::fs;
use std::sync::Arc;
use strum::IntoEnumIterator;

#[test]
fn published_info_points_at_package() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_ragel_tarball(tmp.path());
    let recipe = local_recipe(&archive);
    let kitchen = test_kitchen(
        FakeToolchain::new(),
        &tmp.path().join("build"),
        EnvProvider::isolated(),
    );

    let target = Target::new(Os::Linux, Arch::X86_64, Compiler::new(CompilerFamily::Gcc));
    let result = kitchen.cook(&recipe, &target, &tmp.path().join("out")).unwrap();

    assert_eq!(result.info.root_env, "RAGEL_ROOT");
    assert_eq!(result.info.root, result.package_dir);
    assert_eq!(result.info.path, vec![result.package_dir.join("bin")]);
    assert!(result.package_dir.starts_with(tmp.path().join("out")));

    let json = result.info.to_json().unwrap();
    let parsed: PackageInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, result.info);
    assert!(
        result
            .info
            .shell_exports()
            .starts_with(&format!("export RAGEL_ROOT=\"{}\"", result.package_dir.display()))
    );
}

#[test]
fn verify_runs_packaged_executable_with_published_path() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_ragel_tarball(tmp.path());
    let recipe = local_recipe(&archive);
    let toolchain = FakeToolchain::new();
    toolchain
        .recorder
        .respond("verify", "Ragel State Machine Compiler version 6.10 March 2017\n");
    let kitchen = test_kitchen(
        toolchain.clone(),
        &tmp.path().join("build"),
        EnvProvider::isolated(),
    );

    let target = Target::new(Os::Linux, Arch::X86_64, Compiler::new(CompilerFamily::Gcc));
    let result = kitchen.cook(&recipe, &target, &tmp.path().join("out")).unwrap();
    let version = kitchen.verify_package(&result.info, "ragel").unwrap();

    assert_eq!(version, "Ragel State Machine Compiler version 6.10 March 2017");
    let call = toolchain.call("verify");
    assert_eq!(call.program, result.package_dir.join("bin").join("ragel"));
    assert_eq!(call.args, vec!["--version"]);
    assert_eq!(
        call.env.get("RAGEL_ROOT").as_deref(),
        Some(&*result.package_dir.to_string_lossy())
    );
    assert!(
        call.env
            .search_path()
            .unwrap()
            .starts_with(&*result.package_dir.join("bin").to_string_lossy())
    );
}

#[test]
fn verify_fails_when_executable_is_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let kitchen = Kitchen::new(KitchenConfig::uncached())
        .with_runner(FakeToolchain::new())
        .with_base_environment(base_environment());
    let info = PackageInfo {
        root_env: "RAGEL_ROOT".to_string(),
        root: tmp.path().to_path_buf(),
        path: vec![tmp.path().join("bin")],
    };
    assert!(matches!(
        kitchen.verify_package(&info, "ragel"),
        Err(Error::Packaging(_))
    ));
}

#[test]
fn fetch_is_idempotent_with_cache() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_ragel_tarball(tmp.path());
    let recipe = local_recipe(&archive);
    let cache = tmp.path().join("cache");
    let kitchen = Kitchen::new(KitchenConfig {
        source_cache: Some(cache.clone()),
        ..KitchenConfig::uncached()
    })
    .with_runner(FakeToolchain::new());

    let first = kitchen.fetch(&recipe, tmp.path()).unwrap();
    let content = fs::read(&first.path).unwrap();
    let second = kitchen.fetch(&recipe, tmp.path()).unwrap();

    assert!(first.cached && second.cached);
    assert_eq!(first.path, second.path);
    assert_eq!(fs::read(&second.path).unwrap(), content);
    assert_eq!(fs::read_dir(&cache).unwrap().count(), 1);
}

#[test]
fn corrupted_cache_entry_is_replaced() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_ragel_tarball(tmp.path());
    let recipe = local_recipe(&archive);
    let kitchen = Kitchen::new(KitchenConfig {
        source_cache: Some(tmp.path().join("cache")),
        ..KitchenConfig::uncached()
    });

    let fetched = kitchen.fetch(&recipe, tmp.path()).unwrap();
    fs::write(&fetched.path, b"bit rot").unwrap();

    let again = kitchen.fetch(&recipe, tmp.path()).unwrap();
    assert_eq!(fs::read(&again.path).unwrap(), fs::read(&archive).unwrap());
}

#[test]
fn cached_source_builds_offline() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_ragel_tarball(tmp.path());
    let recipe = local_recipe(&archive);
    let cache = tmp.path().join("cache");

    let config = KitchenConfig {
        source_cache: Some(cache),
        build_root: Some(tmp.path().join("build")),
        ..KitchenConfig::uncached()
    };
    let toolchain = FakeToolchain::new();
    let kitchen = Kitchen::new(config)
        .with_runner(toolchain)
        .with_provider(Arc::new(EnvProvider::isolated()))
        .with_base_environment(base_environment());

    kitchen.fetch(&recipe, tmp.path()).unwrap();
    fs::remove_file(&archive).unwrap();
    assert!(kitchen.source_cached(&recipe).unwrap());

    let target = Target::new(Os::Linux, Arch::X86_64, Compiler::new(CompilerFamily::Gcc));
    let result = kitchen.cook(&recipe, &target, &tmp.path().join("out")).unwrap();
    assert!(result.package_dir.join("bin/ragel").is_file());
    // Cached archives outlive the build
    assert!(kitchen.source_cached(&recipe).unwrap());
}

#[test]
fn every_supported_target_gets_exactly_one_strategy() {
    for os in Os::iter() {
        for arch in Arch::iter() {
            for family in CompilerFamily::iter() {
                let target = Target::new(os, arch, Compiler::new(family));
                let Ok(kind) = select_strategy(&target) else {
                    continue;
                };
                let expected = if os == Os::Windows {
                    StrategyKind::Windows
                } else {
                    StrategyKind::Unix
                };
                assert_eq!(kind, expected, "{}", target);
            }
        }
    }

    let supported = [
        (Os::Linux, CompilerFamily::Gcc),
        (Os::Linux, CompilerFamily::Clang),
        (Os::Macos, CompilerFamily::AppleClang),
        (Os::Windows, CompilerFamily::VisualStudio),
        (Os::Windows, CompilerFamily::Gcc),
    ];
    for (os, family) in supported {
        let target = Target::new(os, Arch::X86_64, Compiler::new(family));
        assert!(select_strategy(&target).is_ok(), "{}", target);
    }
}
