//! `list-cameras` and `config` subcommands.

use std::path::{Path, PathBuf};

use super::args::ConfigAction;
use crate::camera::{self, CameraError};
use crate::config::{self, Config, ConfigError};

/// Print the cameras the platform backend can see, with their probe indices.
pub fn list_cameras() -> Result<(), CameraError> {
    let devices = camera::list_devices()?;
    if devices.is_empty() {
        if cfg!(feature = "camera") {
            println!("No cameras detected. Check the connection and camera permissions.");
        } else {
            println!("Camera support is not compiled in; rebuild with `--features camera`.");
        }
        return Ok(());
    }

    println!("idx  camera");
    for device in &devices {
        println!("{}", device);
    }
    println!();
    println!("Probe specific devices with --camera <idx> (repeatable).");
    Ok(())
}

/// Run `config show` or `config init`.
///
/// `explicit` is the `--config` path, if one was given; it takes precedence
/// over the default location.
pub fn handle_config_action(
    action: ConfigAction,
    explicit: Option<&Path>,
    effective: &Config,
) -> Result<(), ConfigError> {
    let path: Option<PathBuf> = explicit
        .map(Path::to_path_buf)
        .or_else(config::default_path);

    match action {
        ConfigAction::Show => {
            match &path {
                Some(p) if p.exists() => println!("# Config file: {} (exists)", p.display()),
                Some(p) => println!("# Config file: {} (not found, using defaults)", p.display()),
                None => println!("# No config directory on this platform, using defaults"),
            }
            println!();
            print!("{}", effective.to_toml()?);
            Ok(())
        }
        ConfigAction::Init { force } => {
            let path = path.ok_or(ConfigError::NoConfigDir)?;
            config::write_default(&path, force)?;
            println!("Created config file: {}", path.display());
            Ok(())
        }
    }
}
