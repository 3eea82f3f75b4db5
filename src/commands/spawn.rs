use std::path::{Path, PathBuf};

use tokio::process::Command;
use tokio::sync::mpsc;

use crate::envpath::EnvProfile;
use crate::error::{Result, SimError};
use crate::logs::send_log;

/// World used when the caller names none.
pub const DEFAULT_WORLD: &str = "plains_world";
/// Model used by the flag-style convention when `-m` is omitted.
pub const DEFAULT_MODEL: &str = "iris";

/// Raw spawn input as parsed from either CLI convention. Coordinates stay
/// strings until validation so diagnostics can quote what the user typed.
#[derive(Clone, Debug)]
pub struct SpawnArgs {
    pub name: String,
    pub model: String,
    pub x: String,
    pub y: String,
    pub z: String,
    pub world: Option<String>,
    /// Explicit model-description file, bypassing resource-path resolution.
    pub model_file: Option<PathBuf>,
}

/// A validated, immutable entity-creation request. Constructed once, sent
/// once, discarded — no retry and no record of prior spawns.
#[derive(Clone, Debug)]
pub struct SpawnRequest {
    pub name: String,
    pub world: String,
    pub model_file: PathBuf,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Validate raw input into a request. Every failure here is reported before
/// any call leaves this process.
pub fn build_request(args: &SpawnArgs, resource_path: &str) -> Result<SpawnRequest> {
    if args.name.is_empty() {
        return Err(SimError::Validation("drone name must not be empty".into()));
    }

    let x = parse_coordinate("x", &args.x)?;
    let y = parse_coordinate("y", &args.y)?;
    let z = parse_coordinate("z", &args.z)?;

    let model_file = match &args.model_file {
        Some(path) => {
            if !path.exists() {
                return Err(SimError::Validation(format!(
                    "model file {} does not exist",
                    path.display()
                )));
            }
            path.clone()
        }
        None => resolve_model(&args.model, resource_path).ok_or_else(|| {
            SimError::Validation(format!(
                "model '{}' not found on the resource path — run `dronesim setup` or pass --model-file",
                args.model
            ))
        })?,
    };

    Ok(SpawnRequest {
        name: args.name.clone(),
        world: args.world.clone().unwrap_or_else(|| DEFAULT_WORLD.into()),
        model_file,
        x,
        y,
        z,
    })
}

/// Lexical check: optional sign, digits, optional decimal fraction.
/// Deliberately narrower than f64 parsing — "inf", "nan", and exponent
/// forms are rejected.
fn is_decimal(s: &str) -> bool {
    let digits = s.strip_prefix('-').or_else(|| s.strip_prefix('+')).unwrap_or(s);
    let (whole, fraction) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return false; // "", "-", ".", "-."
    }
    whole.chars().all(|c| c.is_ascii_digit()) && fraction.chars().all(|c| c.is_ascii_digit())
}

fn parse_coordinate(label: &str, raw: &str) -> Result<f64> {
    if !is_decimal(raw) {
        return Err(SimError::Validation(format!(
            "coordinate {label} is not a decimal number: '{raw}'"
        )));
    }
    raw.parse::<f64>()
        .map_err(|_| SimError::Validation(format!("coordinate {label} is out of range: '{raw}'")))
}

/// Resolve a model identifier against the resource path: the first
/// `<dir>/<model>/model.sdf` that exists wins, matching the simulator's own
/// left-to-right search order.
pub fn resolve_model(model: &str, resource_path: &str) -> Option<PathBuf> {
    for dir in resource_path.split(':').filter(|d| !d.is_empty()) {
        let candidate = Path::new(dir).join(model).join("model.sdf");
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// The topic names the companion simulation bridge publishes for an entity.
/// A convention — their existence is not verified.
pub fn topics(name: &str) -> [String; 3] {
    [
        format!("/model/{name}/cmd_vel"),
        format!("/model/{name}/pose"),
        format!("/model/{name}/odometry"),
    ]
}

/// Process-table check for a running simulator. Detection only — no handshake.
pub async fn simulator_running() -> bool {
    let output = Command::new("pgrep").args(["-f", "gz sim"]).output().await;
    match output {
        Ok(out) => out.status.success(),
        Err(_) => false, // no pgrep — treat as not running
    }
}

impl SpawnRequest {
    /// The request in Gazebo's structured text form for the EntityFactory
    /// service. Position only — this interface cannot set orientation.
    pub fn factory_request(&self) -> String {
        format!(
            "sdf_filename: \"{}\", name: \"{}\", pose: {{ position: {{ x: {} y: {} z: {} }} }}",
            self.model_file.display(),
            self.name,
            self.x,
            self.y,
            self.z
        )
    }

    /// The world-scoped entity-creation endpoint.
    pub fn service(&self) -> String {
        format!("/world/{}/create", self.world)
    }

    /// Issue the single synchronous service call. The transport enforces a
    /// one-second timeout; success is the call's exit status.
    pub async fn send(&self, profile: &EnvProfile) -> Result<()> {
        let mut cmd = Command::new("gz");
        cmd.args([
            "service",
            "-s",
            &self.service(),
            "--reqtype",
            "gz.msgs.EntityFactory",
            "--reptype",
            "gz.msgs.Boolean",
            "--timeout",
            "1000",
            "--req",
            &self.factory_request(),
        ]);
        profile.apply(&mut cmd);

        let output = cmd
            .output()
            .await
            .map_err(|e| SimError::tool("gz service", e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SimError::tool(
                "gz service",
                if stderr.is_empty() {
                    format!("entity creation rejected for world '{}'", self.world)
                } else {
                    stderr
                },
            ));
        }

        Ok(())
    }
}

/// Full spawn flow shared by both call conventions: validate, check the
/// simulator, send once, report the bridge topics.
pub async fn run_spawn(
    args: &SpawnArgs,
    profile: &EnvProfile,
    log: Option<&mpsc::UnboundedSender<String>>,
) -> Result<()> {
    let request = build_request(args, &profile.resource_path)?;

    if !simulator_running().await {
        return Err(SimError::Validation(
            "simulator is not running — start it with `dronesim sim` first".into(),
        ));
    }

    if let Some(tx) = log {
        send_log(
            tx,
            "spawn",
            &format!(
                "requesting '{}' ({}) at ({}, {}, {}) in world '{}'",
                request.name,
                request.model_file.display(),
                request.x,
                request.y,
                request.z,
                request.world
            ),
        );
    }

    request.send(profile).await?;

    println!(
        "Spawned '{}' into world '{}'.",
        request.name, request.world
    );
    println!("The simulation bridge publishes these topics:");
    for topic in topics(&request.name) {
        println!("  {topic}");
    }

    if let Some(tx) = log {
        send_log(tx, "spawn", &format!("'{}' spawned", request.name));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(x: &str, y: &str, z: &str) -> SpawnArgs {
        SpawnArgs {
            name: "drone1".into(),
            model: "Cube".into(),
            x: x.into(),
            y: y.into(),
            z: z.into(),
            world: None,
            model_file: None,
        }
    }

    #[test]
    fn decimal_pattern_accepts_signed_and_fractional() {
        for ok in ["0", "-3", "+2", "2.5", "-0.25", "10.", ".5", "007"] {
            assert!(is_decimal(ok), "expected '{ok}' to be accepted");
        }
    }

    #[test]
    fn decimal_pattern_rejects_non_numbers() {
        for bad in ["abc", "", "-", ".", "1e5", "inf", "nan", "1.2.3", "2,5", "5 "] {
            assert!(!is_decimal(bad), "expected '{bad}' to be rejected");
        }
    }

    #[test]
    fn non_numeric_coordinate_is_a_validation_error() {
        let err = build_request(&args("abc", "0", "2"), "").unwrap_err();
        match err {
            SimError::Validation(msg) => assert!(msg.contains("abc")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut a = args("0", "0", "2");
        a.name = String::new();
        assert!(matches!(
            build_request(&a, ""),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn missing_model_is_a_validation_error_distinct_from_coordinates() {
        let err = build_request(&args("0", "0", "2"), "/nonexistent").unwrap_err();
        match err {
            SimError::Validation(msg) => assert!(msg.contains("model 'Cube' not found")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn model_resolution_honors_path_order() {
        let root = std::env::temp_dir().join(format!(
            "dronesim-models-{}",
            crate::logs::unix_timestamp()
        ));
        let first = root.join("first");
        let second = root.join("second");
        std::fs::create_dir_all(second.join("Cube")).unwrap();
        std::fs::write(second.join("Cube").join("model.sdf"), "<sdf/>").unwrap();
        std::fs::create_dir_all(&first).unwrap();

        let path = format!("{}:{}", first.display(), second.display());
        let resolved = resolve_model("Cube", &path).unwrap();
        assert!(resolved.starts_with(&second));

        std::fs::create_dir_all(first.join("Cube")).unwrap();
        std::fs::write(first.join("Cube").join("model.sdf"), "<sdf/>").unwrap();
        let resolved = resolve_model("Cube", &path).unwrap();
        assert!(resolved.starts_with(&first));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn request_targets_the_named_world_with_position_only_pose() {
        let request = SpawnRequest {
            name: "drone1".into(),
            world: "plains_world".into(),
            model_file: PathBuf::from("/tmp/Cube/model.sdf"),
            x: 0.0,
            y: 0.0,
            z: 2.0,
        };
        assert_eq!(request.service(), "/world/plains_world/create");
        let req = request.factory_request();
        assert!(req.contains("sdf_filename: \"/tmp/Cube/model.sdf\""));
        assert!(req.contains("name: \"drone1\""));
        assert!(req.contains("position: { x: 0 y: 0 z: 2 }"));
        assert!(!req.contains("orientation"));
    }

    #[test]
    fn default_world_applies_when_omitted() {
        let root = std::env::temp_dir().join(format!(
            "dronesim-defworld-{}",
            crate::logs::unix_timestamp()
        ));
        std::fs::create_dir_all(root.join("Cube")).unwrap();
        std::fs::write(root.join("Cube").join("model.sdf"), "<sdf/>").unwrap();

        let request =
            build_request(&args("0", "0", "2"), &root.display().to_string()).unwrap();
        assert_eq!(request.world, DEFAULT_WORLD);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn bridge_topics_derive_from_the_entity_name() {
        assert_eq!(
            topics("drone1"),
            [
                "/model/drone1/cmd_vel".to_string(),
                "/model/drone1/pose".to_string(),
                "/model/drone1/odometry".to_string(),
            ]
        );
    }
}
