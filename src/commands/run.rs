use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::commands::spawn::DEFAULT_WORLD;
use crate::envpath::EnvProfile;
use crate::error::{Result, SimError};
use crate::logs::send_log;

/// Resolve a world argument to a world file: a path is taken as-is, a bare
/// name is looked up as `<dir>/<name>.sdf` along the resource path.
fn resolve_world(world: &str, resource_path: &str) -> Option<PathBuf> {
    let direct = Path::new(world);
    if direct.extension().is_some() && direct.exists() {
        return Some(direct.to_path_buf());
    }
    for dir in resource_path.split(':').filter(|d| !d.is_empty()) {
        let candidate = Path::new(dir).join(format!("{world}.sdf"));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// Launch the simulator in the foreground with the composed environment and
/// stream its output until it exits.
pub async fn run_sim(
    world: Option<&str>,
    profile: &EnvProfile,
    log: Option<mpsc::UnboundedSender<String>>,
) -> Result<()> {
    let world = world.unwrap_or(DEFAULT_WORLD);
    let world_file = resolve_world(world, &profile.resource_path).ok_or_else(|| {
        SimError::Validation(format!(
            "world '{world}' not found on the resource path — run `dronesim setup` first"
        ))
    })?;

    println!("Launching gz sim with {}...", world_file.display());
    let mut cmd = Command::new("gz");
    cmd.args(["sim", "-v4", "-r"]).arg(&world_file);
    profile.apply(&mut cmd);

    stream_to_exit(cmd, "gz sim", log).await
}

/// Launch ArduPilot's SITL autotest tool in the foreground.
pub async fn run_sitl(
    workspace: &Path,
    profile: &EnvProfile,
    log: Option<mpsc::UnboundedSender<String>>,
) -> Result<()> {
    let sim_vehicle = workspace
        .join("ardupilot")
        .join("Tools")
        .join("autotest")
        .join("sim_vehicle.py");
    if !sim_vehicle.exists() {
        return Err(SimError::Validation(format!(
            "{} not found — run `dronesim setup` first",
            sim_vehicle.display()
        )));
    }

    println!("Launching SITL (ArduCopter, JSON backend)...");
    let mut cmd = Command::new(&sim_vehicle);
    cmd.args(["-v", "ArduCopter", "-f", "JSON"])
        .current_dir(workspace.join("ardupilot"));
    profile.apply(&mut cmd);

    stream_to_exit(cmd, "sitl", log).await
}

/// Spawn the child, stream stdout/stderr line-by-line to the terminal and
/// the session log (ANSI stripped), and propagate the exit status.
async fn stream_to_exit(
    mut cmd: Command,
    prefix: &str,
    log: Option<mpsc::UnboundedSender<String>>,
) -> Result<()> {
    cmd.stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| SimError::tool(prefix, format!("failed to start: {e}")))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let out_log = log.clone();
    let out_prefix = prefix.to_string();
    let stdout_task = tokio::spawn(async move {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(raw_line)) = lines.next_line().await {
                let line = strip_ansi(&raw_line);
                println!("{line}");
                if let Some(ref tx) = out_log {
                    send_log(tx, &out_prefix, &line);
                }
            }
        }
    });

    let err_log = log.clone();
    let err_prefix = prefix.to_string();
    let stderr_task = tokio::spawn(async move {
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(raw_line)) = lines.next_line().await {
                let line = strip_ansi(&raw_line);
                eprintln!("{line}");
                if let Some(ref tx) = err_log {
                    send_log(tx, &err_prefix, &line);
                }
            }
        }
    });

    let status = child
        .wait()
        .await
        .map_err(|e| SimError::tool(prefix, e.to_string()))?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if !status.success() {
        return Err(SimError::tool(
            prefix,
            format!("exited with status {}", status.code().unwrap_or(-1)),
        ));
    }
    Ok(())
}

/// Strip ANSI escape sequences (e.g. `\x1b[32m`) from a string.
fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip ESC + '[' + params + final letter
            if let Some(next) = chars.next() {
                if next == '[' {
                    for c in chars.by_ref() {
                        if c.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::unix_timestamp;

    #[test]
    fn ansi_sequences_are_stripped() {
        assert_eq!(strip_ansi("\x1b[32mok\x1b[0m"), "ok");
        assert_eq!(strip_ansi("plain"), "plain");
        assert_eq!(strip_ansi("\x1b[1;31merror:\x1b[0m boom"), "error: boom");
    }

    #[test]
    fn world_names_resolve_along_the_resource_path() {
        let root = std::env::temp_dir().join(format!("dronesim-worlds-{}", unix_timestamp()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("plains_world.sdf"), "<sdf/>").unwrap();

        let path = root.display().to_string();
        assert!(resolve_world("plains_world", &path).is_some());
        assert!(resolve_world("missing_world", &path).is_none());

        // Explicit file paths pass through untouched
        let file = root.join("plains_world.sdf");
        assert_eq!(
            resolve_world(&file.display().to_string(), ""),
            Some(file.clone())
        );

        let _ = std::fs::remove_dir_all(&root);
    }
}
