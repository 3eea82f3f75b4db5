use serde::Serialize;
use std::path::Path;

use tokio::process::Command;

use crate::commands::spawn::{self, DEFAULT_MODEL};
use crate::envpath::EnvProfile;
use crate::error::Result;

/// Results from scanning the system for required tools and build artifacts.
/// Advisory only — doctor never fails the invocation.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorReport {
    pub os: String,
    pub gz_installed: bool,
    pub gz_version: Option<String>,
    pub git_installed: bool,
    pub git_version: Option<String>,
    pub cmake_installed: bool,
    pub cmake_version: Option<String>,
    pub sitl_binary: bool,
    pub plugin_library: bool,
    pub default_model_resolves: bool,
    pub env_script_written: bool,
    pub simulator_running: bool,
}

/// Runs `<tool> <args>` and parses the first output line to check availability.
async fn detect_tool(name: &str, args: &[&str]) -> (bool, Option<String>) {
    let mut cmd = Command::new(name);
    cmd.args(args);
    match cmd.output().await {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            (true, Some(version))
        }
        _ => (false, None),
    }
}

/// Scan the system. Missing pieces are findings, not errors — the plugin
/// check in particular is the advisory "plugin found / not found" signal.
pub async fn inspect(workspace: &Path, data_dir: &Path, profile: &EnvProfile) -> DoctorReport {
    let (gz_installed, gz_version) = detect_tool("gz", &["sim", "--version"]).await;
    let (git_installed, git_version) = detect_tool("git", &["--version"]).await;
    let (cmake_installed, cmake_version) = detect_tool("cmake", &["--version"]).await;

    DoctorReport {
        os: std::env::consts::OS.to_string(),
        gz_installed,
        gz_version,
        git_installed,
        git_version,
        cmake_installed,
        cmake_version,
        sitl_binary: workspace
            .join("ardupilot")
            .join("build")
            .join("sitl")
            .join("bin")
            .join("arducopter")
            .exists(),
        plugin_library: workspace
            .join("ardupilot_gazebo")
            .join("build")
            .join("libArduPilotPlugin.so")
            .exists(),
        default_model_resolves: spawn::resolve_model(DEFAULT_MODEL, &profile.resource_path)
            .is_some(),
        env_script_written: data_dir.join("env.sh").exists(),
        simulator_running: spawn::simulator_running().await,
    }
}

fn line(label: &str, ok: bool, detail: Option<&str>) {
    let mark = if ok { "ok " } else { "-- " };
    match detail {
        Some(d) => println!("  {mark} {label} ({d})"),
        None => println!("  {mark} {label}"),
    }
}

/// Print the report, human-readable or as JSON.
pub fn print_report(report: &DoctorReport, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report)
                .map_err(|e| crate::error::SimError::Custom(e.to_string()))?
        );
        return Ok(());
    }

    println!("dronesim doctor ({})", report.os);
    line("gz", report.gz_installed, report.gz_version.as_deref());
    line("git", report.git_installed, report.git_version.as_deref());
    line("cmake", report.cmake_installed, report.cmake_version.as_deref());
    line("SITL binary (arducopter)", report.sitl_binary, None);
    line(
        "ArduPilot plugin library",
        report.plugin_library,
        Some(if report.plugin_library {
            "plugin found"
        } else {
            "plugin not found"
        }),
    );
    line(
        "default model on resource path",
        report.default_model_resolves,
        Some(DEFAULT_MODEL),
    );
    line("environment script", report.env_script_written, None);
    line("simulator running", report.simulator_running, None);

    Ok(())
}
