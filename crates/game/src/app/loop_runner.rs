use std::process::ExitCode;

use engine::run_app;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        game,
        asset_dir,
    } = app;
    match run_app(config, game, asset_dir) {
        Ok(()) => {
            info!("game_exited");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(error = %error, "event_loop_failed");
            ExitCode::FAILURE
        }
    }
}
