// xtask - Build automation for spindle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Workspace chores that don't fit in `cargo` alone. The interpreter
//! binary is discovered from the workspace root manifest, so renaming
//! the package does not break `cargo xtask install`.

use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, exit};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("install") => install(&args[1..]),
        Some("uninstall") => uninstall(&args[1..]),
        Some("help") | Some("-h") | Some("--help") | None => {
            usage();
            Ok(())
        }
        Some(other) => Err(format!("unknown command '{}' (try 'help')", other)),
    };

    if let Err(message) = result {
        eprintln!("xtask: {}", message);
        exit(1);
    }
}

fn usage() {
    println!("cargo xtask <command>");
    println!();
    println!("  install   [--prefix <dir>] [--debug]   build and copy the interpreter");
    println!("            into <dir>/bin (default: $CARGO_HOME or ~/.cargo)");
    println!("  uninstall [--prefix <dir>]             remove an installed interpreter");
    println!("  help                                   show this message");
}

/// Settings shared by install and uninstall, parsed from trailing args.
struct Config {
    bin_dir: PathBuf,
    release: bool,
}

impl Config {
    fn parse(args: &[String]) -> Result<Config, String> {
        let mut prefix = None;
        let mut release = true;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--prefix" => {
                    let dir = iter
                        .next()
                        .ok_or("--prefix requires a directory argument")?;
                    prefix = Some(PathBuf::from(dir));
                }
                "--debug" => release = false,
                other => return Err(format!("unrecognized option '{}'", other)),
            }
        }

        let prefix = match prefix {
            Some(dir) => dir,
            None => cargo_home()?,
        };
        Ok(Config {
            bin_dir: prefix.join("bin"),
            release,
        })
    }
}

/// `$CARGO_HOME` if set, `~/.cargo` otherwise.
fn cargo_home() -> Result<PathBuf, String> {
    if let Ok(dir) = env::var("CARGO_HOME") {
        return Ok(PathBuf::from(dir));
    }
    env::var("HOME")
        .map(|home| Path::new(&home).join(".cargo"))
        .map_err(|_| "cannot determine an install prefix (no CARGO_HOME or HOME)".to_string())
}

fn workspace_root() -> PathBuf {
    // xtask lives one level below the workspace root.
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("xtask has a parent directory")
        .to_path_buf()
}

/// Read the interpreter's package name out of the root manifest rather
/// than hardcoding it here.
fn interpreter_name(root: &Path) -> Result<String, String> {
    let manifest = fs::read_to_string(root.join("Cargo.toml"))
        .map_err(|e| format!("cannot read root Cargo.toml: {}", e))?;

    let mut in_package = false;
    for line in manifest.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_package = line == "[package]";
            continue;
        }
        if in_package
            && let Some(rest) = line.strip_prefix("name")
            && let Some(value) = rest.trim_start().strip_prefix('=')
        {
            return Ok(value.trim().trim_matches('"').to_string());
        }
    }
    Err("root Cargo.toml has no [package] name".to_string())
}

fn install(args: &[String]) -> Result<(), String> {
    let config = Config::parse(args)?;
    let root = workspace_root();
    let name = interpreter_name(&root)?;

    let profile = if config.release { "release" } else { "debug" };
    let mut build = Command::new("cargo");
    build.args(["build", "--bin", name.as_str()]).current_dir(&root);
    if config.release {
        build.arg("--release");
    }

    println!("building {} ({})...", name, profile);
    let status = build
        .status()
        .map_err(|e| format!("failed to run cargo: {}", e))?;
    if !status.success() {
        return Err("build failed".to_string());
    }

    let built = root.join("target").join(profile).join(&name);
    let installed = config.bin_dir.join(&name);

    fs::create_dir_all(&config.bin_dir)
        .map_err(|e| format!("cannot create {}: {}", config.bin_dir.display(), e))?;
    fs::copy(&built, &installed)
        .map_err(|e| format!("cannot copy {} to {}: {}", built.display(), installed.display(), e))?;
    fs::set_permissions(&installed, fs::Permissions::from_mode(0o755))
        .map_err(|e| format!("cannot mark {} executable: {}", installed.display(), e))?;

    println!("installed {}", installed.display());
    println!("make sure {} is on your PATH", config.bin_dir.display());
    Ok(())
}

fn uninstall(args: &[String]) -> Result<(), String> {
    let config = Config::parse(args)?;
    let name = interpreter_name(&workspace_root())?;
    let installed = config.bin_dir.join(&name);

    if !installed.exists() {
        println!("nothing installed at {}", installed.display());
        return Ok(());
    }

    fs::remove_file(&installed)
        .map_err(|e| format!("cannot remove {}: {}", installed.display(), e))?;
    println!("removed {}", installed.display());
    Ok(())
}
