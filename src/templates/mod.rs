/// Returns the generated environment script content.
///
/// The plugin and resource paths are baked in fully composed, so re-sourcing
/// the script cannot grow them. PATH keeps a plain prepend because the shell
/// owns the rest of its value — sourcing twice double-prepends the autotest
/// fragment, which downstream tooling tolerates.
pub fn env_script(plugin_path: &str, resource_path: &str, autotest_dir: &str) -> String {
    format!(
        r#"# Generated by dronesim — re-run `dronesim env --write` to refresh.
export GZ_SIM_SYSTEM_PLUGIN_PATH="{plugin_path}"
export GZ_SIM_RESOURCE_PATH="{resource_path}"
export PATH="{autotest_dir}:$PATH"
"#
    )
}

/// Returns the model.config for the fallback Cube model.
pub fn cube_model_config() -> &'static str {
    r#"<?xml version="1.0"?>
<model>
  <name>Cube</name>
  <version>1.0</version>
  <sdf version="1.9">model.sdf</sdf>
  <description>Minimal test body written by dronesim setup.</description>
</model>
"#
}

/// Returns the SDF for the fallback Cube model.
///
/// Carries the velocity-control, pose-publisher, and odometry-publisher
/// systems so a spawned instance serves the bridge's conventional
/// /model/&lt;name&gt;/{cmd_vel,pose,odometry} topics.
pub fn cube_model_sdf() -> &'static str {
    r#"<?xml version="1.0"?>
<sdf version="1.9">
  <model name="Cube">
    <link name="base_link">
      <inertial>
        <mass>1.0</mass>
        <inertia>
          <ixx>0.042</ixx>
          <iyy>0.042</iyy>
          <izz>0.042</izz>
        </inertia>
      </inertial>
      <collision name="collision">
        <geometry>
          <box><size>0.5 0.5 0.5</size></box>
        </geometry>
      </collision>
      <visual name="visual">
        <geometry>
          <box><size>0.5 0.5 0.5</size></box>
        </geometry>
        <material>
          <ambient>0.2 0.4 0.8 1</ambient>
          <diffuse>0.2 0.4 0.8 1</diffuse>
        </material>
      </visual>
    </link>
    <plugin filename="gz-sim-velocity-control-system"
            name="gz::sim::systems::VelocityControl"/>
    <plugin filename="gz-sim-pose-publisher-system"
            name="gz::sim::systems::PosePublisher"/>
    <plugin filename="gz-sim-odometry-publisher-system"
            name="gz::sim::systems::OdometryPublisher"/>
  </model>
</sdf>
"#
}

/// Returns the SDF for the default world.
///
/// UserCommands must be loaded — it provides the /world/plains_world/create
/// entity-creation service the spawn commands call.
pub fn plains_world_sdf() -> &'static str {
    r#"<?xml version="1.0"?>
<sdf version="1.9">
  <world name="plains_world">
    <physics name="default_physics" type="ignored">
      <max_step_size>0.001</max_step_size>
      <real_time_factor>1.0</real_time_factor>
    </physics>
    <plugin filename="gz-sim-physics-system"
            name="gz::sim::systems::Physics"/>
    <plugin filename="gz-sim-user-commands-system"
            name="gz::sim::systems::UserCommands"/>
    <plugin filename="gz-sim-scene-broadcaster-system"
            name="gz::sim::systems::SceneBroadcaster"/>
    <light type="directional" name="sun">
      <cast_shadows>true</cast_shadows>
      <pose>0 0 10 0 0 0</pose>
      <diffuse>0.8 0.8 0.8 1</diffuse>
      <direction>-0.5 0.1 -0.9</direction>
    </light>
    <model name="ground_plane">
      <static>true</static>
      <link name="link">
        <collision name="collision">
          <geometry>
            <plane>
              <normal>0 0 1</normal>
              <size>500 500</size>
            </plane>
          </geometry>
        </collision>
        <visual name="visual">
          <geometry>
            <plane>
              <normal>0 0 1</normal>
              <size>500 500</size>
            </plane>
          </geometry>
          <material>
            <ambient>0.4 0.5 0.3 1</ambient>
            <diffuse>0.4 0.5 0.3 1</diffuse>
          </material>
        </visual>
      </link>
    </model>
  </world>
</sdf>
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_script_bakes_composed_values() {
        let script = env_script("/a:/b", "/m:/w", "/home/u/ardupilot/Tools/autotest");
        assert!(script.contains("export GZ_SIM_SYSTEM_PLUGIN_PATH=\"/a:/b\""));
        assert!(script.contains("export GZ_SIM_RESOURCE_PATH=\"/m:/w\""));
        assert!(script.contains(":$PATH\""));
    }

    #[test]
    fn world_carries_user_commands_system() {
        assert!(plains_world_sdf().contains("gz::sim::systems::UserCommands"));
        assert!(plains_world_sdf().contains("<world name=\"plains_world\">"));
    }
}
