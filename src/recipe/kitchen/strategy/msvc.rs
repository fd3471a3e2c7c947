// src/recipe/kitchen/strategy/msvc.rs

//! MSVC toolchain flags and environment capture

use super::BuildContext;
use crate::error::{Error, Result};
use crate::recipe::kitchen::environment::BuildEnvironment;
use crate::recipe::kitchen::runner::Invocation;
use crate::recipe::target::{Arch, Runtime};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Warnings disabled for the Ragel sources
const DISABLED_WARNINGS: &[&str] = &["4244", "4267", "4800", "4996", "4018"];

const DEFINES: &[&str] = &["_CRT_SECURE_NO_WARNINGS", "WIN32", "_WINDOWS", "NOMINMAX"];

const VSWHERE_DEFAULT: &str =
    r"C:\Program Files (x86)\Microsoft Visual Studio\Installer\vswhere.exe";

/// `CFLAGS`/`CXXFLAGS` for cl
pub fn compiler_flags(runtime: Runtime) -> String {
    let mut flags = vec!["-nologo".to_string(), "-EHsc".to_string(), runtime.flag()];
    flags.extend(DISABLED_WARNINGS.iter().map(|w| format!("-wd{}", w)));
    flags.join(" ")
}

/// `CPPFLAGS` for cl
pub fn preprocessor_flags() -> String {
    DEFINES
        .iter()
        .map(|d| format!("-D{}", d))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn machine_flag(arch: Arch) -> &'static str {
    match arch {
        Arch::X86 => "/MACHINE:X86",
        Arch::X86_64 => "/MACHINE:X64",
    }
}

/// `LDFLAGS` for link
pub fn linker_flags(arch: Arch) -> String {
    format!("-nologo {}", machine_flag(arch))
}

/// Argument to `vcvarsall.bat`
fn vcvars_arch(arch: Arch) -> &'static str {
    match arch {
        Arch::X86 => "x86",
        Arch::X86_64 => "amd64",
    }
}

/// Variables for the configure script when compiling with cl
pub fn configure_variables(
    source_dir: &Path,
    arch: Arch,
    runtime: Runtime,
) -> Vec<(String, String)> {
    let wrapper = format!("{}/compile cl -nologo", super::windows::unix_path(source_dir));
    let cflags = compiler_flags(runtime);

    vec![
        ("CC".to_string(), wrapper.clone()),
        ("CXX".to_string(), wrapper),
        ("CFLAGS".to_string(), cflags.clone()),
        ("CXXFLAGS".to_string(), cflags),
        ("CPPFLAGS".to_string(), preprocessor_flags()),
        ("LDFLAGS".to_string(), linker_flags(arch)),
        ("LD".to_string(), "link".to_string()),
        ("NM".to_string(), "dumpbin -symbols".to_string()),
        ("STRIP".to_string(), ":".to_string()),
        ("RANLIB".to_string(), ":".to_string()),
    ]
}

/// Parse the output of `set` into variables
///
/// Lines without `=` (banners, blank lines) are ignored.
pub fn parse_set_output(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_end_matches('\r');
            let (key, value) = line.split_once('=')?;
            if key.is_empty() || key.contains(' ') {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Find the Visual Studio installation root
fn locate_installation(ctx: &BuildContext<'_>, env: &BuildEnvironment) -> Result<PathBuf> {
    if let Some(dir) = ctx.vs_install_dir {
        return Ok(dir.to_path_buf());
    }

    let vswhere = which::which_in("vswhere", env.search_path(), env.cwd())
        .unwrap_or_else(|_| PathBuf::from(VSWHERE_DEFAULT));
    let output = ctx.run(Invocation::new("vswhere", vswhere, env).args([
        "-latest",
        "-products",
        "*",
        "-requires",
        "Microsoft.VisualStudio.Component.VC.Tools.x86.x64",
        "-property",
        "installationPath",
    ]))?;

    let installation = output.stdout.lines().map(str::trim).find(|l| !l.is_empty());
    match installation {
        Some(path) => Ok(PathBuf::from(path)),
        None => Err(Error::Environment(
            "vswhere found no Visual Studio installation with C++ tools".to_string(),
        )),
    }
}

/// Arguments for `cmd` running `vcvarsall.bat <arch> && set`
///
/// Each piece is its own argument so the path is quoted once, plainly. The
/// leading `call` keeps cmd from stripping the quotes around a path that
/// contains parentheses.
fn vcvars_args(vcvarsall: &Path, arch: Arch) -> Vec<String> {
    vec![
        "/c".to_string(),
        "call".to_string(),
        vcvarsall.to_string_lossy().into_owned(),
        vcvars_arch(arch).to_string(),
        "&&".to_string(),
        "set".to_string(),
    ]
}

/// Run `vcvarsall.bat <arch> && set` and collect the resulting variables
pub fn capture_vcvars(
    ctx: &BuildContext<'_>,
    env: &BuildEnvironment,
    arch: Arch,
) -> Result<BTreeMap<String, String>> {
    let installation = locate_installation(ctx, env)?;
    let vcvarsall = installation
        .join("VC")
        .join("Auxiliary")
        .join("Build")
        .join("vcvarsall.bat");
    debug!("Using {}", vcvarsall.display());

    let output =
        ctx.run(Invocation::new("vcvars", "cmd", env).args(vcvars_args(&vcvarsall, arch)))?;

    let captured = parse_set_output(&output.stdout);
    if captured.is_empty() {
        return Err(Error::Environment(format!(
            "{} produced no environment",
            vcvarsall.display()
        )));
    }
    Ok(captured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_flags() {
        let flags = compiler_flags(Runtime::MT);
        assert!(flags.starts_with("-nologo -EHsc -MT "));
        for w in ["-wd4244", "-wd4267", "-wd4800", "-wd4996", "-wd4018"] {
            assert!(flags.contains(w), "{} missing from {}", w, flags);
        }
        assert_eq!(
            preprocessor_flags(),
            "-D_CRT_SECURE_NO_WARNINGS -DWIN32 -D_WINDOWS -DNOMINMAX"
        );
    }

    #[test]
    fn test_linker_flags() {
        assert_eq!(linker_flags(Arch::X86), "-nologo /MACHINE:X86");
        assert_eq!(linker_flags(Arch::X86_64), "-nologo /MACHINE:X64");
    }

    #[test]
    fn test_configure_variables_use_wrapper() {
        let vars = configure_variables(
            Path::new("C:/build/source_subfolder"),
            Arch::X86_64,
            Runtime::MD,
        );
        let get = |k: &str| vars.iter().find(|(n, _)| n == k).map(|(_, v)| v.as_str());
        assert_eq!(get("CC"), Some("C:/build/source_subfolder/compile cl -nologo"));
        assert_eq!(get("CXX"), get("CC"));
        assert_eq!(get("NM"), Some("dumpbin -symbols"));
        assert_eq!(get("STRIP"), Some(":"));
        assert!(get("CFLAGS").unwrap().contains("-MD"));
    }

    #[test]
    fn test_vcvars_args_keep_path_whole() {
        let vcvarsall = Path::new(r"C:\Program Files (x86)\VS\VC\Auxiliary\Build\vcvarsall.bat");
        let args = vcvars_args(vcvarsall, Arch::X86_64);
        assert_eq!(args[..2], ["/c", "call"]);
        assert_eq!(args[2], vcvarsall.to_string_lossy());
        assert_eq!(args[3..], ["amd64", "&&", "set"]);
        assert!(args.iter().all(|a| !a.contains('"')), "{:?}", args);
    }

    #[test]
    fn test_parse_set_output() {
        let out = "**********\r\nINCLUDE=C:\\VC\\include\r\nPath=C:\\VC\\bin;C:\\Windows\r\n\r\n";
        let vars = parse_set_output(out);
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["INCLUDE"], "C:\\VC\\include");
        assert_eq!(vars["Path"], "C:\\VC\\bin;C:\\Windows");
    }
}
