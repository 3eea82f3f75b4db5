//! Command-line surface for dronesim, built with clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::spawn::{DEFAULT_MODEL, DEFAULT_WORLD};

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "dronesim",
    version,
    about = "Workspace setup and spawn tooling for Gazebo + ArduPilot simulation."
)]
pub struct DronesimArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install packages, build the flight stack and simulator plugin, and
    /// write the environment script.
    Setup {
        /// Workspace directory for the clones and builds.
        #[arg(long)]
        workspace: Option<String>,
        /// Skip the OS package installation step.
        #[arg(long)]
        skip_packages: bool,
        /// Skip cloning/building ArduPilot SITL.
        #[arg(long)]
        skip_ardupilot: bool,
        /// Skip cloning/building the ardupilot_gazebo plugin.
        #[arg(long)]
        skip_plugin: bool,
        /// Skip fetching the model/world bundle.
        #[arg(long)]
        skip_models: bool,
    },
    /// Print the composed simulator environment, or write it to
    /// ~/.dronesim/env.sh with --write.
    Env {
        #[arg(long)]
        workspace: Option<String>,
        /// Write the environment script and hook it into ~/.bashrc.
        #[arg(long)]
        write: bool,
    },
    /// Report the state of required tools, build artifacts, and the
    /// simulator process. Always exits 0 — findings are advisory.
    Doctor {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Spawn a drone: fixed positional arguments.
    Spawn {
        /// Entity name, unique within the target world.
        name: String,
        /// Model identifier, resolved against the resource path.
        model: String,
        x: String,
        y: String,
        z: String,
        /// Target world (defaults to plains_world).
        world: Option<String>,
    },
    /// Spawn a drone: flag-style arguments with defaults.
    Add {
        /// Entity name, unique within the target world.
        name: String,
        x: String,
        y: String,
        z: String,
        /// Model identifier, resolved against the resource path.
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: String,
        /// Target world.
        #[arg(short, long, default_value = DEFAULT_WORLD)]
        world: String,
        /// Explicit model-description file, bypassing resolution.
        #[arg(long)]
        model_file: Option<PathBuf>,
    },
    /// Launch the simulator in the foreground with the composed environment.
    Sim {
        /// World name or world file (defaults to plains_world).
        world: Option<String>,
    },
    /// Launch the ArduPilot SITL autotest tool in the foreground.
    Sitl,
}
