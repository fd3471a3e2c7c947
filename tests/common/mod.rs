// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use ragel_installer::hash::{HashAlgorithm, hash_reader};
use ragel_installer::recipe::kitchen::requirements::MSYS2;
use ragel_installer::recipe::kitchen::{
    CommandOutput, CommandRunner, EnvProvider, Invocation, RecordingRunner,
};
use ragel_installer::{Kitchen, KitchenConfig, Recipe, builtin_recipe};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const MAKEFILE_AM: &str = "INCLUDES = -I$(top_srcdir)/aapl\n\
bin_PROGRAMS = ragel\n\
ragel_SOURCES = main.cpp\n";

pub const MAIN_CPP: &str = "#include <iostream>\n\
#include <unistd.h>\n\
int main(int argc, const char **argv) { return 0; }\n";

pub const CONFIGURE: &str = "#!/bin/sh\necho configured\n";

/// Write a gzip tarball of `files` (path, content, mode)
pub fn write_tarball(path: &Path, files: &[(String, &str, u32)]) {
    let file = File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// A miniature Ragel 6.10 source release
pub fn write_ragel_tarball(dir: &Path) -> PathBuf {
    write_ragel_tarball_with(dir, MAKEFILE_AM, MAIN_CPP)
}

pub fn write_ragel_tarball_with(dir: &Path, makefile_am: &str, main_cpp: &str) -> PathBuf {
    let archive = dir.join("ragel-6.10.tar.gz");
    write_tarball(
        &archive,
        &[
            ("ragel-6.10/configure".to_string(), CONFIGURE, 0o755),
            ("ragel-6.10/COPYING".to_string(), "GNU GENERAL PUBLIC LICENSE\n", 0o644),
            ("ragel-6.10/CREDITS".to_string(), "Adrian Thurston\n", 0o644),
            ("ragel-6.10/ragel/Makefile.am".to_string(), makefile_am, 0o644),
            ("ragel-6.10/ragel/main.cpp".to_string(), main_cpp, 0o644),
        ],
    );
    archive
}

/// The built-in recipe, pointed at a local archive with a matching checksum
pub fn local_recipe(archive: &Path) -> Recipe {
    let mut recipe = builtin_recipe().unwrap();
    recipe.source.archive = format!("file://{}", archive.display());
    let mut file = File::open(archive).unwrap();
    let checksum = hash_reader(HashAlgorithm::Sha256, &mut file).unwrap();
    recipe.source.checksum = Some(checksum.to_string());
    recipe
}

/// Records every invocation and fakes the files an install would produce
#[derive(Debug, Default)]
pub struct FakeToolchain {
    pub recorder: RecordingRunner,
    prefix: Mutex<Option<PathBuf>>,
}

impl FakeToolchain {
    pub fn new() -> Arc<Self> {
        let toolchain = Self::default();
        toolchain.recorder.respond("vswhere", "C:\\VS\\2019\\Community\r\n");
        toolchain.recorder.respond(
            "vcvars",
            "INCLUDE=C:\\VC\\include\r\nPATH=C:\\VC\\bin\r\nVSCMD_ARG_TGT_ARCH=x64\r\n",
        );
        Arc::new(toolchain)
    }

    pub fn steps(&self) -> Vec<String> {
        self.recorder.steps()
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.recorder.calls()
    }

    pub fn call(&self, step: &str) -> Invocation {
        self.calls()
            .into_iter()
            .find(|c| c.step == step)
            .unwrap_or_else(|| panic!("no {} step recorded", step))
    }

    fn install(&self, executable: &str) {
        let prefix = self.prefix.lock().unwrap().clone();
        let Some(prefix) = prefix else {
            panic!("install before configure");
        };
        std::fs::create_dir_all(prefix.join("bin")).unwrap();
        std::fs::write(prefix.join("bin").join(executable), "binary").unwrap();
    }
}

fn find_prefix(args: &[String]) -> Option<PathBuf> {
    args.iter().find_map(|arg| {
        let start = arg.find("--prefix=")? + "--prefix=".len();
        let rest = &arg[start..];
        let end = rest.find(['\'', ' ']).unwrap_or(rest.len());
        Some(PathBuf::from(&rest[..end]))
    })
}

impl CommandRunner for FakeToolchain {
    fn run(&self, invocation: &Invocation) -> ragel_installer::Result<CommandOutput> {
        let output = self.recorder.run(invocation)?;
        match invocation.step.as_str() {
            "configure" => {
                *self.prefix.lock().unwrap() = find_prefix(&invocation.args);
            }
            "install" => self.install("ragel"),
            "make" if invocation.args.iter().any(|a| a.ends_with("install")) => {
                self.install("ragel.exe")
            }
            _ => {}
        }
        Ok(output)
    }
}

/// Environment the builds start from
pub fn base_environment() -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("PATH".to_string(), "/usr/bin".to_string());
    vars.insert("VisualStudioVersion".to_string(), "16.0".to_string());
    vars
}

/// A kitchen that never touches the network, the cache or real tools
pub fn test_kitchen(
    toolchain: Arc<FakeToolchain>,
    build_root: &Path,
    provider: EnvProvider,
) -> Kitchen {
    let config = KitchenConfig {
        build_root: Some(build_root.to_path_buf()),
        jobs: 4,
        ..KitchenConfig::uncached()
    };
    Kitchen::new(config)
        .with_runner(toolchain)
        .with_provider(Arc::new(provider))
        .with_base_environment(base_environment())
}

/// Provider with MSYS2 at `root`
pub fn msys_provider(root: &Path) -> EnvProvider {
    EnvProvider::isolated().with_root(MSYS2, root)
}
