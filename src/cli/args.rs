//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Webcam object detection stream with natural-language questions about the picture
#[derive(Parser, Debug)]
#[command(name = "lookout")]
#[command(version, about = "Annotated webcam stream with a vision-language Q&A channel", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Camera device index to probe; repeat to probe several in order
    #[arg(long, allow_negative_numbers = true)]
    pub camera: Vec<i32>,

    /// Mirror camera horizontally
    #[arg(long)]
    pub mirror: bool,

    /// YOLOv8 ONNX model
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Front-end bundle directory
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the server (default)
    Serve,
    /// List available cameras
    ListCameras,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,
    /// Create default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if !self.camera.is_empty() {
            config.camera.devices = Some(self.camera.clone());
        }
        if self.mirror {
            config.camera.mirror = true;
        }
        if let Some(model) = &self.model {
            config.detector.model_path = model.clone();
        }
        if let Some(dir) = &self.static_dir {
            config.server.static_dir = dir.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["lookout"]);
        assert!(args.command.is_none());
        assert!(args.config.is_none());
        assert!(args.camera.is_empty());
        assert!(!args.mirror);
        assert!(args.port.is_none());
    }

    #[test]
    fn test_args_repeated_camera_keeps_order() {
        let args = Args::parse_from(["lookout", "--camera", "3", "--camera", "-1"]);
        assert_eq!(args.camera, vec![3, -1]);
    }

    #[test]
    fn test_args_subcommands() {
        let args = Args::parse_from(["lookout", "list-cameras"]);
        assert_eq!(args.command, Some(Command::ListCameras));

        let args = Args::parse_from(["lookout", "config", "init", "--force"]);
        assert_eq!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Init { force: true }
            })
        );

        let args = Args::parse_from(["lookout", "config", "show", "--config", "/tmp/x.toml"]);
        assert_eq!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        );
        assert_eq!(args.config, Some(PathBuf::from("/tmp/x.toml")));
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::parse_from([
            "lookout", "--port", "8000", "--camera", "2", "--mirror", "--model", "m.onnx",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.camera.devices, Some(vec![2]));
        assert!(config.camera.mirror);
        assert_eq!(config.detector.model_path, PathBuf::from("m.onnx"));
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_apply_without_flags_keeps_config() {
        let args = Args::parse_from(["lookout"]);
        let mut config = Config::default();
        config.camera.devices = Some(vec![5]);
        args.apply(&mut config);
        assert_eq!(config, {
            let mut expected = Config::default();
            expected.camera.devices = Some(vec![5]);
            expected
        });
    }
}
