// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: recipe override
fn recipe_arg() -> Arg {
    Arg::new("recipe")
        .long("recipe")
        .value_name("FILE")
        .help("Recipe file to use instead of the built-in Ragel recipe")
}

/// Target selection arguments
fn target_args() -> Vec<Arg> {
    vec![
        Arg::new("os").long("os").help("Operating system (windows, linux, macos)"),
        Arg::new("arch").long("arch").help("Architecture (x86, x86_64)"),
        Arg::new("compiler")
            .long("compiler")
            .help("Compiler family (gcc, clang, apple-clang, msvc)"),
        Arg::new("compiler_version").long("compiler-version").help("Compiler version"),
        Arg::new("runtime").long("runtime").help("MSVC runtime (MT, MTd, MD, MDd)"),
        Arg::new("threads").long("threads").help("Threading model sub-setting"),
        Arg::new("exception").long("exception").help("Exception model sub-setting"),
    ]
}

/// Build tuning arguments
fn build_args() -> Vec<Arg> {
    vec![
        Arg::new("source_cache")
            .long("source-cache")
            .value_name("DIR")
            .help("Directory for caching downloaded sources"),
        Arg::new("no_cache")
            .long("no-cache")
            .action(ArgAction::SetTrue)
            .help("Do not cache downloaded sources"),
        Arg::new("jobs").short('j').long("jobs").help("Number of parallel build jobs"),
        Arg::new("msys_root")
            .long("msys-root")
            .value_name("DIR")
            .help("MSYS2 install root (default: $MSYS_ROOT)"),
        Arg::new("mingw_home")
            .long("mingw-home")
            .value_name("DIR")
            .help("MinGW install root (default: $MINGW_HOME)"),
        Arg::new("vs_install_dir")
            .long("vs-install-dir")
            .value_name("DIR")
            .help("Visual Studio installation directory"),
    ]
}

fn build_cli() -> Command {
    Command::new("ragel-installer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build the Ragel state machine compiler from source")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging (overridden by RUST_LOG)"),
        )
        .subcommand(
            Command::new("cook")
                .about("Fetch, build and package Ragel")
                .args(target_args())
                .args(build_args())
                .arg(recipe_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .default_value("packages")
                        .help("Output directory for packages"),
                )
                .arg(
                    Arg::new("keep_builddir")
                        .long("keep-builddir")
                        .action(ArgAction::SetTrue)
                        .help("Keep build directory after completion"),
                ),
        )
        .subcommand(
            Command::new("fetch")
                .about("Fetch and verify the source archive without building")
                .arg(recipe_arg())
                .arg(Arg::new("dest").long("dest").default_value(".").help("Archive directory")),
        )
        .subcommand(
            Command::new("plan")
                .about("Print every build command in order without running any")
                .args(target_args())
                .args(build_args())
                .arg(recipe_arg()),
        )
        .subcommand(
            Command::new("info")
                .about("Show the normalized target, strategy, requirements and package id")
                .args(target_args())
                .arg(recipe_arg()),
        )
        .subcommand(
            Command::new("verify")
                .about("Run the packaged executable with --version")
                .arg(Arg::new("package_dir").required(true).help("Package directory"))
                .arg(recipe_arg()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("ragel-installer.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
