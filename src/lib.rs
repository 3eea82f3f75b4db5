//! dronesim sets up and drives a Gazebo + ArduPilot simulation workspace:
//! it orchestrates the external installers and build systems, composes the
//! simulator's search-path environment, and issues entity-creation requests
//! to a running simulator.

pub mod cli;
pub mod commands;
pub mod config;
pub mod envpath;
pub mod error;
pub mod logs;
pub mod templates;
pub mod util;

use std::path::PathBuf;

use tokio::sync::mpsc;

use cli::Command;
use commands::{doctor, env as env_cmd, run as run_cmd, setup, spawn};
use envpath::EnvProfile;
use error::Result;
use logs::SessionLogger;
use util::{data_dir, expand_tilde, home_dir};

/// Workspace resolution order: explicit flag, then the configured workspace
/// from the last setup, then `~/dronesim`.
fn resolve_workspace(flag: Option<&str>) -> Result<PathBuf> {
    if let Some(ws) = flag {
        return Ok(PathBuf::from(expand_tilde(ws)));
    }
    if let Some(ws) = config::load_config().and_then(|c| c.workspace) {
        return Ok(PathBuf::from(ws));
    }
    Ok(home_dir()?.join("dronesim"))
}

async fn spawn_with_profile(
    args: spawn::SpawnArgs,
    log: Option<mpsc::UnboundedSender<String>>,
) -> Result<()> {
    let workspace = resolve_workspace(None)?;
    let data = data_dir()?;
    let profile = EnvProfile::from_env(&workspace, &data);
    spawn::run_spawn(&args, &profile, log.as_ref()).await
}

/// Dispatch a parsed command. Every failure propagates to the caller, which
/// reports it and exits 1.
pub async fn run(command: Command, logger: Option<SessionLogger>) -> Result<()> {
    let log = logger.as_ref().map(|l| l.sender());

    match command {
        Command::Setup {
            workspace,
            skip_packages,
            skip_ardupilot,
            skip_plugin,
            skip_models,
        } => {
            let opts = setup::SetupOptions {
                workspace: resolve_workspace(workspace.as_deref())?,
                skip_packages,
                skip_ardupilot,
                skip_plugin,
                skip_models,
            };
            setup::run_setup(&opts, &data_dir()?, log).await
        }

        Command::Env { workspace, write } => {
            let workspace = resolve_workspace(workspace.as_deref())?;
            let data = data_dir()?;
            let profile = EnvProfile::from_env(&workspace, &data);
            if write {
                let script = env_cmd::write_env_script(&profile, &workspace, &data)?;
                println!("Wrote {} and hooked it into ~/.bashrc.", script.display());
            } else {
                env_cmd::print_profile(&profile, &workspace);
            }
            Ok(())
        }

        Command::Doctor { json } => {
            let workspace = resolve_workspace(None)?;
            let data = data_dir()?;
            let profile = EnvProfile::from_env(&workspace, &data);
            let report = doctor::inspect(&workspace, &data, &profile).await;
            doctor::print_report(&report, json)
        }

        Command::Spawn {
            name,
            model,
            x,
            y,
            z,
            world,
        } => {
            let args = spawn::SpawnArgs {
                name,
                model,
                x,
                y,
                z,
                world,
                model_file: None,
            };
            spawn_with_profile(args, log).await
        }

        Command::Add {
            name,
            x,
            y,
            z,
            model,
            world,
            model_file,
        } => {
            let args = spawn::SpawnArgs {
                name,
                model,
                x,
                y,
                z,
                world: Some(world),
                model_file,
            };
            spawn_with_profile(args, log).await
        }

        Command::Sim { world } => {
            let workspace = resolve_workspace(None)?;
            let data = data_dir()?;
            let profile = EnvProfile::from_env(&workspace, &data);
            run_cmd::run_sim(world.as_deref(), &profile, log).await
        }

        Command::Sitl => {
            let workspace = resolve_workspace(None)?;
            let data = data_dir()?;
            let profile = EnvProfile::from_env(&workspace, &data);
            run_cmd::run_sitl(&workspace, &profile, log).await
        }
    }
}
