use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::commands::env::write_env_script;
use crate::config::{self, SimConfig};
use crate::envpath::EnvProfile;
use crate::error::{Result, SimError};
use crate::logs::{format_timestamp, send_log, unix_timestamp};
use crate::templates;

const ARDUPILOT_REPO: &str = "https://github.com/ArduPilot/ardupilot.git";
const ARDUPILOT_REF: &str = "Copter-4.5.7";

const PLUGIN_REPO: &str = "https://github.com/ArduPilot/ardupilot_gazebo.git";
const PLUGIN_REF: &str = "main";

const MODELS_ZIP_URL: &str =
    "https://github.com/ArduPilot/SITL_Models/archive/refs/heads/master.zip";
/// Bundle revision recorded in the config; bump together with the URL above.
const MODELS_VERSION: &str = "1.1.0";
/// Re-download window for an already-current bundle.
const MODELS_REFRESH_SECS: i64 = 24 * 3600;

/// OS packages required before anything can be cloned or built.
const APT_PACKAGES: &[&str] = &[
    "git",
    "cmake",
    "build-essential",
    "pkg-config",
    "rapidjson-dev",
    "libgz-sim8-dev",
    "python3-pip",
    "python3-setuptools",
];

// ── Options & progress ──────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct SetupOptions {
    pub workspace: PathBuf,
    pub skip_packages: bool,
    pub skip_ardupilot: bool,
    pub skip_plugin: bool,
    pub skip_models: bool,
}

/// Terminal + session-log progress reporting for the setup steps.
struct Reporter {
    step_index: usize,
    total_steps: usize,
    log: Option<mpsc::UnboundedSender<String>>,
}

impl Reporter {
    fn started(&mut self, description: &str) {
        self.step_index += 1;
        println!("[{}/{}] {description}", self.step_index, self.total_steps);
        if let Some(ref tx) = self.log {
            send_log(tx, "setup", description);
        }
    }

    fn progress(&self, detail: &str) {
        println!("    {detail}");
        if let Some(ref tx) = self.log {
            send_log(tx, "setup", detail);
        }
    }

    fn completed(&self, detail: &str) {
        println!("    ✓ {detail}");
        if let Some(ref tx) = self.log {
            send_log(tx, "setup", detail);
        }
    }

    fn warning(&self, message: &str) {
        eprintln!("    warning: {message}");
        if let Some(ref tx) = self.log {
            send_log(tx, "setup-warn", message);
        }
    }
}

fn calculate_total_steps(opts: &SetupOptions) -> usize {
    let mut steps = 2; // fallback assets + environment always run
    if !opts.skip_packages {
        steps += 1;
    }
    if !opts.skip_ardupilot {
        steps += 1;
    }
    if !opts.skip_plugin {
        steps += 1;
    }
    if !opts.skip_models {
        steps += 1;
    }
    steps
}

// ── Orchestration ───────────────────────────────────────────────────────────

/// Run the full workspace setup. Hard failures terminate immediately with no
/// rollback; the model-bundle fetch alone degrades to a warning because the
/// fallback assets cover it.
pub async fn run_setup(
    opts: &SetupOptions,
    data_dir: &Path,
    log: Option<mpsc::UnboundedSender<String>>,
) -> Result<()> {
    let mut reporter = Reporter {
        step_index: 0,
        total_steps: calculate_total_steps(opts),
        log,
    };

    std::fs::create_dir_all(&opts.workspace)?;

    if !opts.skip_packages {
        reporter.started("Installing OS packages");
        install_packages(&reporter).await?;
        reporter.completed("OS packages installed");
    }

    if !opts.skip_ardupilot {
        reporter.started("Cloning and building ArduPilot SITL");
        let checkout = opts.workspace.join("ardupilot");
        sync_repo(ARDUPILOT_REPO, ARDUPILOT_REF, &checkout, &reporter).await?;
        build_ardupilot(&checkout, &reporter).await?;
        reporter.completed("ArduPilot SITL built");
    }

    if !opts.skip_plugin {
        reporter.started("Cloning and building the ardupilot_gazebo plugin");
        let checkout = opts.workspace.join("ardupilot_gazebo");
        sync_repo(PLUGIN_REPO, PLUGIN_REF, &checkout, &reporter).await?;
        build_plugin(&checkout, &reporter).await?;
        reporter.completed("Simulator plugin built");
    }

    let mut config = config::load_config().unwrap_or_default();

    if !opts.skip_models {
        reporter.started("Fetching the model/world bundle");
        if bundle_is_current(&config) {
            reporter.completed("Model bundle already current — skipped");
        } else {
            // Non-critical: the fallback assets below keep spawn usable
            match fetch_models(data_dir, &reporter).await {
                Ok(()) => {
                    config.models_version = Some(MODELS_VERSION.into());
                    config.last_models_fetch = Some(format_timestamp(unix_timestamp()));
                    reporter.completed("Model bundle installed");
                }
                Err(e) => reporter.warning(&format!(
                    "could not fetch the model bundle: {e}. The built-in assets will be used."
                )),
            }
        }
    }

    reporter.started("Writing built-in fallback assets");
    write_fallback_assets(data_dir)?;
    reporter.completed("Cube model and plains_world written");

    reporter.started("Composing the simulator environment");
    let profile = EnvProfile::from_env(&opts.workspace, data_dir);
    let script = write_env_script(&profile, &opts.workspace, data_dir)?;
    reporter.completed(&format!(
        "{} written and hooked into ~/.bashrc",
        script.display()
    ));

    config.workspace = Some(opts.workspace.to_string_lossy().to_string());
    config.last_setup = Some(format_timestamp(unix_timestamp()));
    config::save_config(&config)?;

    println!("Setup finished. Open a new shell or `source {}`.", script.display());
    Ok(())
}

// ── External tools ──────────────────────────────────────────────────────────

/// Run an external tool to completion, capturing output. Non-zero exit maps
/// to a labeled tool failure carrying the captured stderr.
async fn run_tool(tool: &str, args: &[&str], cwd: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new(tool);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| SimError::tool(tool, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.lines().rev().find(|l| !l.trim().is_empty());
        return Err(SimError::tool(
            format!("{tool} {}", args.first().copied().unwrap_or_default()),
            detail.unwrap_or("exited with a non-zero status").to_string(),
        ));
    }

    Ok(())
}

async fn install_packages(reporter: &Reporter) -> Result<()> {
    reporter.progress(&format!("apt-get install {} packages...", APT_PACKAGES.len()));
    let mut args = vec!["apt-get", "install", "-y"];
    args.extend_from_slice(APT_PACKAGES);
    run_tool("sudo", &args, None).await
}

/// Clone `repo` at the fixed `git_ref`, or bring an existing checkout to it.
/// Submodules are required by the ArduPilot build.
async fn sync_repo(repo: &str, git_ref: &str, dest: &Path, reporter: &Reporter) -> Result<()> {
    let dest_str = dest.to_string_lossy();
    let dest_str: &str = &dest_str;

    if dest.join(".git").exists() {
        reporter.progress(&format!("updating {} to {git_ref}...", dest.display()));
        run_tool("git", &["-C", dest_str, "fetch", "--tags", "origin"], None).await?;
        run_tool("git", &["-C", dest_str, "checkout", git_ref], None).await?;
        run_tool(
            "git",
            &["-C", dest_str, "submodule", "update", "--init", "--recursive"],
            None,
        )
        .await?;
    } else {
        reporter.progress(&format!("cloning {repo} ({git_ref})..."));
        run_tool(
            "git",
            &[
                "clone",
                "--branch",
                git_ref,
                "--recurse-submodules",
                repo,
                dest_str,
            ],
            None,
        )
        .await?;
    }
    Ok(())
}

/// Build SITL with ArduPilot's own build system and verify the binary landed
/// at its fixed relative path.
async fn build_ardupilot(checkout: &Path, reporter: &Reporter) -> Result<()> {
    let waf = checkout.join("waf");
    let waf = waf.to_string_lossy();

    reporter.progress("waf configure --board sitl");
    run_tool(&waf, &["configure", "--board", "sitl"], Some(checkout)).await?;

    reporter.progress("waf copter (this takes a while)...");
    run_tool(&waf, &["copter"], Some(checkout)).await?;

    let artifact = checkout.join("build").join("sitl").join("bin").join("arducopter");
    if !artifact.exists() {
        return Err(SimError::MissingArtifact(artifact));
    }
    Ok(())
}

/// Configure and build the plugin with CMake and verify the library landed at
/// its fixed relative path.
async fn build_plugin(checkout: &Path, reporter: &Reporter) -> Result<()> {
    reporter.progress("cmake configure (RelWithDebInfo)...");
    let mut cmd = Command::new("cmake");
    cmd.args(["-S", ".", "-B", "build", "-DCMAKE_BUILD_TYPE=RelWithDebInfo"])
        .env("GZ_VERSION", "harmonic")
        .current_dir(checkout);
    let output = cmd
        .output()
        .await
        .map_err(|e| SimError::tool("cmake", e.to_string()))?;
    if !output.status.success() {
        return Err(SimError::tool(
            "cmake",
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    reporter.progress("cmake --build build...");
    run_tool(
        "cmake",
        &["--build", "build", "--parallel", "4"],
        Some(checkout),
    )
    .await?;

    let artifact = checkout.join("build").join("libArduPilotPlugin.so");
    if !artifact.exists() {
        return Err(SimError::MissingArtifact(artifact));
    }
    Ok(())
}

// ── Model bundle ────────────────────────────────────────────────────────────

fn bundle_is_current(config: &SimConfig) -> bool {
    let installed = match config.models_version.as_deref() {
        Some(v) => v,
        None => return false,
    };
    if config::is_newer_version(installed, MODELS_VERSION) {
        return false;
    }
    // Same revision: only refresh when the last fetch is stale
    match config
        .last_models_fetch
        .as_deref()
        .and_then(config::parse_iso8601_to_unix)
    {
        Some(last) => (unix_timestamp() as i64) - last < MODELS_REFRESH_SECS,
        None => false,
    }
}

/// Streamed download of the SITL_Models zipball, then extraction of its
/// Gazebo models and worlds into the data directory.
async fn fetch_models(data_dir: &Path, reporter: &Reporter) -> Result<()> {
    let response = reqwest::get(MODELS_ZIP_URL).await?;
    if !response.status().is_success() {
        return Err(SimError::Custom(format!(
            "Failed to download the model bundle: HTTP {} from {MODELS_ZIP_URL}",
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let mut stream = response.bytes_stream();

    let temp_dir = std::env::temp_dir().join("dronesim-setup");
    tokio::fs::create_dir_all(&temp_dir).await?;
    let zip_path = temp_dir.join("sitl-models.zip");

    let mut file = tokio::fs::File::create(&zip_path).await?;
    let mut downloaded: u64 = 0;
    let mut last_reported: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        // Report at most every 5 MB — this is a terminal, not a progress bar
        if downloaded - last_reported >= 5_000_000 {
            last_reported = downloaded;
            if total_size > 0 {
                reporter.progress(&format!(
                    "downloading... {:.1} MB / {:.1} MB",
                    downloaded as f64 / 1_000_000.0,
                    total_size as f64 / 1_000_000.0,
                ));
            } else {
                reporter.progress(&format!(
                    "downloading... {:.1} MB",
                    downloaded as f64 / 1_000_000.0
                ));
            }
        }
    }
    file.flush().await?;
    drop(file);

    reporter.progress("extracting models and worlds...");

    // Extraction is sync but fast, so we spawn_blocking
    let dest = data_dir.to_path_buf();
    let zip_path_clone = zip_path.clone();
    tokio::task::spawn_blocking(move || extract_gazebo_assets(&zip_path_clone, &dest))
        .await
        .map_err(|e| SimError::Custom(e.to_string()))??;

    let _ = tokio::fs::remove_dir_all(&temp_dir).await;

    Ok(())
}

/// Pull only `Gazebo/models/**` and `Gazebo/worlds/**` out of the zipball,
/// dropping the `SITL_Models-<ref>/` prefix so entries land under
/// `<data>/models/...` and `<data>/worlds/...`.
fn extract_gazebo_assets(zip_path: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        let relative = match name.split_once("/Gazebo/") {
            Some((_, rest)) if rest.starts_with("models/") || rest.starts_with("worlds/") => rest,
            _ => continue,
        };

        let out_path = dest.join(relative);
        if name.ends_with('/') {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out_file = std::fs::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)?;
    }

    Ok(())
}

/// Write the embedded Cube model and plains_world so spawn and sim work even
/// without the downloaded bundle. Idempotent — plain overwrites.
pub fn write_fallback_assets(data_dir: &Path) -> Result<()> {
    let cube_dir = data_dir.join("models").join("Cube");
    std::fs::create_dir_all(&cube_dir)?;
    std::fs::write(cube_dir.join("model.config"), templates::cube_model_config())?;
    std::fs::write(cube_dir.join("model.sdf"), templates::cube_model_sdf())?;

    let worlds_dir = data_dir.join("worlds");
    std::fs::create_dir_all(&worlds_dir)?;
    std::fs::write(
        worlds_dir.join("plains_world.sdf"),
        templates::plains_world_sdf(),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::unix_timestamp;

    #[test]
    fn fallback_assets_are_written_and_idempotent() {
        let data = std::env::temp_dir().join(format!("dronesim-assets-{}", unix_timestamp()));

        write_fallback_assets(&data).unwrap();
        write_fallback_assets(&data).unwrap();

        assert!(data.join("models/Cube/model.sdf").exists());
        assert!(data.join("models/Cube/model.config").exists());
        assert!(data.join("worlds/plains_world.sdf").exists());

        let _ = std::fs::remove_dir_all(&data);
    }

    #[test]
    fn bundle_currency_requires_version_and_fresh_fetch() {
        let mut config = SimConfig::default();
        assert!(!bundle_is_current(&config));

        config.models_version = Some(MODELS_VERSION.into());
        assert!(!bundle_is_current(&config), "no fetch timestamp yet");

        config.last_models_fetch = Some(format_timestamp(unix_timestamp()));
        assert!(bundle_is_current(&config));

        config.last_models_fetch = Some("2020-01-01T00:00:00Z".into());
        assert!(!bundle_is_current(&config), "stale fetch");

        config.models_version = Some("0.9.0".into());
        config.last_models_fetch = Some(format_timestamp(unix_timestamp()));
        assert!(!bundle_is_current(&config), "older revision installed");
    }

    #[test]
    fn step_count_tracks_skips() {
        let opts = SetupOptions {
            workspace: PathBuf::from("/tmp/ws"),
            skip_packages: false,
            skip_ardupilot: false,
            skip_plugin: false,
            skip_models: false,
        };
        assert_eq!(calculate_total_steps(&opts), 6);

        let all_skipped = SetupOptions {
            skip_packages: true,
            skip_ardupilot: true,
            skip_plugin: true,
            skip_models: true,
            ..opts
        };
        assert_eq!(calculate_total_steps(&all_skipped), 2);
    }
}
