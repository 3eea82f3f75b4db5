//! Search-path composition for the simulator environment.
//!
//! Gazebo locates plugins and models through colon-delimited environment
//! variables. Composition here is pure string processing: candidate
//! fragments in priority order, the variable's prior value last, duplicates
//! and empty segments dropped. Re-composing a composed value is a no-op.

use std::path::{Path, PathBuf};

/// Variable consulted by the simulator for system plugins.
pub const PLUGIN_PATH_VAR: &str = "GZ_SIM_SYSTEM_PLUGIN_PATH";
/// Variable consulted by the simulator for models and worlds.
pub const RESOURCE_PATH_VAR: &str = "GZ_SIM_RESOURCE_PATH";

/// Ordered, duplicate-free list of search-path entries.
#[derive(Clone, Debug, Default)]
pub struct SearchPath {
    entries: Vec<String>,
}

impl SearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Empty fragments and fragments already present are
    /// dropped, so first-seen order wins.
    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if self.entries.iter().any(|e| e == fragment) {
            return;
        }
        self.entries.push(fragment.to_string());
    }

    /// Append every segment of an already-serialized value (e.g. the prior
    /// contents of the variable).
    pub fn extend_from_value(&mut self, value: &str) {
        for segment in value.split(':') {
            self.push(segment);
        }
    }

    /// Serialize: single `:` separators, no leading or trailing separator.
    pub fn join(&self) -> String {
        self.entries.join(":")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Compose a search-path value from prioritized fragments plus the
/// variable's prior value, if any.
pub fn compose<S: AsRef<str>>(fragments: &[S], existing: Option<&str>) -> String {
    let mut path = SearchPath::new();
    for fragment in fragments {
        path.push(fragment.as_ref());
    }
    if let Some(prior) = existing {
        path.extend_from_value(prior);
    }
    path.join()
}

/// Recursively collect every `lib` directory under `root`.
///
/// Used to pick up plugin directories from a source-built install prefix.
/// A missing or empty root is not an error — composition just proceeds with
/// the remaining fragments.
pub fn discover_lib_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if path.file_name().and_then(|n| n.to_str()) == Some("lib") {
                dirs.push(path);
            } else {
                dirs.extend(discover_lib_dirs(&path));
            }
        }
    }
    dirs.sort();
    dirs
}

/// The composed simulator environment: plugin path, resource path, and the
/// PATH additions for the flight-stack tools.
///
/// Held as explicit values and applied per child process rather than
/// exported into this process's ambient environment.
#[derive(Clone, Debug)]
pub struct EnvProfile {
    pub plugin_path: String,
    pub resource_path: String,
    pub path: String,
}

impl EnvProfile {
    /// Compose the profile from explicit inputs. Pure except for the
    /// install-prefix scan, which runs at composition time and is never cached.
    pub fn compose(
        workspace: &Path,
        data_dir: &Path,
        prior_plugin: Option<&str>,
        prior_resource: Option<&str>,
        prior_path: Option<&str>,
    ) -> Self {
        let mut plugin_fragments: Vec<String> = Vec::new();
        plugin_fragments.push(
            workspace
                .join("ardupilot_gazebo")
                .join("build")
                .to_string_lossy()
                .to_string(),
        );
        for dir in discover_lib_dirs(&workspace.join("install")) {
            plugin_fragments.push(dir.to_string_lossy().to_string());
        }

        let resource_fragments: Vec<String> = [
            data_dir.join("models"),
            data_dir.join("worlds"),
            workspace.join("ardupilot_gazebo").join("models"),
            workspace.join("ardupilot_gazebo").join("worlds"),
        ]
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();

        let path_fragments: Vec<String> = vec![workspace
            .join("ardupilot")
            .join("Tools")
            .join("autotest")
            .to_string_lossy()
            .to_string()];

        EnvProfile {
            plugin_path: compose(&plugin_fragments, prior_plugin),
            resource_path: compose(&resource_fragments, prior_resource),
            path: compose(&path_fragments, prior_path),
        }
    }

    /// Compose from the current process environment.
    pub fn from_env(workspace: &Path, data_dir: &Path) -> Self {
        let plugin = std::env::var(PLUGIN_PATH_VAR).ok();
        let resource = std::env::var(RESOURCE_PATH_VAR).ok();
        let path = std::env::var("PATH").ok();
        Self::compose(
            workspace,
            data_dir,
            plugin.as_deref(),
            resource.as_deref(),
            path.as_deref(),
        )
    }

    /// Apply the profile to a child process. The simulator and the autotest
    /// tools see the composed values; this process's environment is untouched.
    pub fn apply(&self, cmd: &mut tokio::process::Command) {
        cmd.env(PLUGIN_PATH_VAR, &self.plugin_path);
        cmd.env(RESOURCE_PATH_VAR, &self.resource_path);
        cmd.env("PATH", &self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_drops_empty_and_duplicate_segments() {
        let composed = compose(&["/a", "", "/b", "/a", "/b"], Some("/c::/a"));
        assert_eq!(composed, "/a:/b:/c");
    }

    #[test]
    fn compose_preserves_first_seen_order() {
        let composed = compose(&["/z", "/a", "/m"], None);
        assert_eq!(composed, "/z:/a:/m");
    }

    #[test]
    fn compose_is_idempotent() {
        let fragments = ["/plugin/build", "/opt/sim/lib"];
        let once = compose(&fragments, Some("/usr/lib"));
        let twice = compose(&fragments, Some(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn compose_with_no_fragments_keeps_prior_value() {
        assert_eq!(compose::<&str>(&[], Some("/usr/lib")), "/usr/lib");
        assert_eq!(compose::<&str>(&[], None), "");
    }

    #[test]
    fn join_has_no_stray_separators() {
        let mut path = SearchPath::new();
        path.push("");
        path.push("/only");
        path.push("");
        assert_eq!(path.join(), "/only");
    }

    #[test]
    fn discover_finds_nested_lib_dirs() {
        let root = std::env::temp_dir().join(format!(
            "dronesim-libscan-{}",
            crate::logs::unix_timestamp()
        ));
        std::fs::create_dir_all(root.join("gz-sim/lib")).unwrap();
        std::fs::create_dir_all(root.join("gz-transport/lib")).unwrap();
        std::fs::create_dir_all(root.join("gz-sim/share")).unwrap();

        let found = discover_lib_dirs(&root);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.ends_with("lib")));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn discover_missing_root_is_empty() {
        let found = discover_lib_dirs(Path::new("/nonexistent/install/prefix"));
        assert!(found.is_empty());
    }

    #[test]
    fn missing_scan_leaves_no_stray_separator() {
        let ws = Path::new("/nonexistent/ws");
        let data = Path::new("/nonexistent/data");
        let profile = EnvProfile::compose(ws, data, None, None, None);
        assert!(!profile.plugin_path.starts_with(':'));
        assert!(!profile.plugin_path.ends_with(':'));
        assert!(!profile.plugin_path.contains("::"));
    }
}
