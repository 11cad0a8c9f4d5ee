use rocket::launch;
use std::sync::Arc;

use fee_calibrator::{bootstrap, config, web};

#[launch]
async fn rocket() -> _ {
    env_logger::init();

    // Load configuration
    let config = config::Config::from_env()
        .expect("Failed to load configuration");

    // Build application state
    let app_state = Arc::new(
        bootstrap::AppState::new(&config)
            .expect("Failed to initialize application state")
    );

    log::info!(
        "calibration plan: samples {}..{}, step 1/{}, {} passes",
        config.sample_from, config.sample_to, config.step_divisor, config.passes
    );

    web::build_rocket(app_state, config.port)
}
