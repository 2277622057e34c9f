use clap::Parser;

use lookout::app::{self, AppError};
use lookout::cli::{self, Args, Command, ConfigAction};
use lookout::config::Config;

fn main() {
    // .env is optional; the API key may come from the real environment
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let command = args.command.clone().unwrap_or(Command::Serve);

    // `config init` must work even when the existing file is broken
    if let Command::Config {
        action: ConfigAction::Init { force },
    } = command
    {
        return Ok(cli::handle_config_action(
            ConfigAction::Init { force },
            args.config.as_deref(),
            &Config::default(),
        )?);
    }

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    match command {
        Command::Serve => app::run_server(config),
        Command::ListCameras => Ok(cli::list_cameras()?),
        Command::Config { action } => Ok(cli::handle_config_action(
            action,
            args.config.as_deref(),
            &config,
        )?),
    }
}
