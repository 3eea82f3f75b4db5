use std::io::Write;
use std::path::{Path, PathBuf};

use crate::envpath::{EnvProfile, PLUGIN_PATH_VAR, RESOURCE_PATH_VAR};
use crate::error::Result;
use crate::templates;
use crate::util::home_dir;

/// Where the autotest tools live inside the workspace; this is the only PATH
/// fragment the generated script prepends.
pub fn autotest_dir(workspace: &Path) -> PathBuf {
    workspace.join("ardupilot").join("Tools").join("autotest")
}

/// Print the composed environment as shell exports.
pub fn print_profile(profile: &EnvProfile, workspace: &Path) {
    println!("export {PLUGIN_PATH_VAR}=\"{}\"", profile.plugin_path);
    println!("export {RESOURCE_PATH_VAR}=\"{}\"", profile.resource_path);
    println!(
        "export PATH=\"{}:$PATH\"",
        autotest_dir(workspace).display()
    );
}

/// Write `~/.dronesim/env.sh` and hook it into `~/.bashrc` once.
pub fn write_env_script(profile: &EnvProfile, workspace: &Path, data_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    let script_path = data_dir.join("env.sh");
    let script = templates::env_script(
        &profile.plugin_path,
        &profile.resource_path,
        &autotest_dir(workspace).display().to_string(),
    );
    std::fs::write(&script_path, script)?;

    let bashrc = home_dir()?.join(".bashrc");
    let source_line = format!("source {}", script_path.display());
    append_line_once(&bashrc, &source_line)?;

    Ok(script_path)
}

/// Append `line` to `file` unless an identical line is already present.
/// Returns whether the line was appended. A missing file is created.
pub fn append_line_once(file: &Path, line: &str) -> Result<bool> {
    if let Ok(content) = std::fs::read_to_string(file) {
        if content.lines().any(|l| l.trim() == line) {
            return Ok(false);
        }
    }

    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)?;
    writeln!(f, "{line}")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::unix_timestamp;

    #[test]
    fn append_is_idempotent() {
        let file = std::env::temp_dir().join(format!("dronesim-bashrc-{}", unix_timestamp()));
        let line = "source /home/user/.dronesim/env.sh";

        assert!(append_line_once(&file, line).unwrap());
        assert!(!append_line_once(&file, line).unwrap());
        assert!(!append_line_once(&file, line).unwrap());

        let content = std::fs::read_to_string(&file).unwrap();
        assert_eq!(content.matches(line).count(), 1);

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn append_matches_exact_line_not_substring() {
        let file = std::env::temp_dir().join(format!("dronesim-bashrc2-{}", unix_timestamp()));
        std::fs::write(&file, "# source /x/env.sh was here once\n").unwrap();

        assert!(append_line_once(&file, "source /x/env.sh").unwrap());
        let content = std::fs::read_to_string(&file).unwrap();
        assert!(content.ends_with("source /x/env.sh\n"));

        let _ = std::fs::remove_file(&file);
    }
}
