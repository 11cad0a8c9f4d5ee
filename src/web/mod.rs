pub mod dto;
pub mod routes;

use std::sync::Arc;

use rocket::{routes, Build, Rocket};

use crate::bootstrap::AppState;
use crate::web::routes::{evaluate_rpn, health, reference_fee, regression, simulate_calibration, solve, square_root};

pub fn build_rocket(app_state: Arc<AppState>, port: u16) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("port", port))
        .merge(("address", "0.0.0.0"));

    rocket::custom(figment).manage(app_state).mount(
        "/",
        routes![evaluate_rpn, regression, square_root, solve, simulate_calibration, reference_fee, health],
    )
}
