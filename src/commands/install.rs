// `flux-relay install [--force]`: reinstall the CLI, through cargo when it
// is available and through the platform installer script otherwise.

use anyhow::{bail, Context, Result};
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::ui;

const CRATE_NAME: &str = "flux-relay-cli";
const INSTALLER_BASE: &str = "https://raw.githubusercontent.com/postacksol/flux-relay-cli/main";

pub fn run(force: bool) -> Result<()> {
    println!("Flux Relay CLI Installer");
    println!("========================");
    println!();

    if cargo_available() {
        ui::success("cargo found - using 'cargo install'");
        println!();
        install_with_cargo(force)
    } else {
        ui::warning("cargo not found - using the platform installer");
        println!();
        install_with_script()
    }
}

fn cargo_available() -> bool {
    Command::new("cargo")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn install_with_cargo(force: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["install", CRATE_NAME]);
    if force {
        cmd.arg("--force");
    }
    println!("Installing {}...", CRATE_NAME);
    let status = cmd.status().context("Failed to run cargo install")?;
    if !status.success() {
        bail!("cargo install failed ({})", status);
    }

    println!();
    ui::success("Installation complete!");
    println!();
    if let Some(bin_dir) = cargo_bin_dir() {
        if path_contains(env::var_os("PATH").as_deref(), &bin_dir) {
            ui::success("The cargo bin directory is already in your PATH");
        } else {
            ui::warning("The cargo bin directory is not in your PATH");
            println!();
            println!("Add this to your ~/.bashrc or ~/.zshrc:");
            println!("  export PATH=\"$PATH:{}\"", bin_dir.display());
        }
    }
    println!();
    println!("To verify, run: flux-relay --version");
    Ok(())
}

fn cargo_bin_dir() -> Option<PathBuf> {
    env::var_os("CARGO_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".cargo")))
        .map(|dir| dir.join("bin"))
}

/// Whether `dir` is one of the entries of a PATH-style variable.
pub(crate) fn path_contains(path_var: Option<&OsStr>, dir: &Path) -> bool {
    path_var
        .map(|paths| env::split_paths(paths).any(|entry| entry == dir))
        .unwrap_or(false)
}

#[cfg(windows)]
fn installer_command() -> (Command, String) {
    let line = format!("irm {}/install.ps1 | iex", INSTALLER_BASE);
    let mut cmd = Command::new("powershell");
    cmd.args(["-Command", &line]);
    (cmd, line)
}

#[cfg(not(windows))]
fn installer_command() -> (Command, String) {
    let line = format!("curl -fsSL {}/install.sh | bash", INSTALLER_BASE);
    let mut cmd = Command::new("bash");
    cmd.args(["-c", &line]);
    (cmd, line)
}

fn install_with_script() -> Result<()> {
    let (mut cmd, manual) = installer_command();
    println!("Running installer script...");
    println!("If this doesn't work automatically, run:");
    println!("  {}", manual);
    println!();

    let status = cmd.status().context("Failed to start the installer")?;
    if !status.success() {
        bail!(
            "installer failed ({})\n\nTry running manually:\n  {}",
            status,
            manual
        );
    }
    println!();
    ui::success("Installation complete!");
    Ok(())
}
