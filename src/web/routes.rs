use std::sync::Arc;

use num_bigint::BigInt;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::bootstrap::AppState;
use crate::chain::simulated::SimulatedChain;
use crate::engine::calibrator::{solve_coefficient, CalibrationReport, CalibrationSample, Calibrator};
use crate::math::{linear_regression, rpn, Fraction, MathError};
use crate::web::dto::{
    CalibrationReportDto, ReferenceFeeResponse, RegressionRequest, RegressionResponse, RpnItem, RpnRequest,
    RpnResponse, SimulateRequest, SimulateResponse, SolveRequest, SolveResponse, SqrtRequest, SqrtResponse,
};

const MAX_SIMULATION_PASSES: u32 = 10;
const RPN_DECIMAL_SCALES: [u32; 3] = [18, 9, 0];

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Raw balance units rendered as whole tokens, six fractional digits.
fn token_amount(raw: &BigInt, nominal: &BigInt) -> String {
    Fraction::new(raw.clone(), nominal.clone())
        .and_then(|f| f.to_decimal(6))
        .map(|d| d.to_string())
        .unwrap_or_else(|e| format!("n/a ({})", e))
}

/// Finest scale rust_decimal can hold for this value.
fn decimal_rendering(value: &Fraction) -> Option<String> {
    RPN_DECIMAL_SCALES
        .iter()
        .find_map(|scale| value.to_decimal(*scale).ok())
        .map(|d| d.normalize().to_string())
}

fn parse_integer(raw: &str) -> Result<BigInt, MathError> {
    raw.trim().parse().map_err(|_| MathError::Parse(raw.to_string()))
}

#[post("/api/v1/rpn", format = "json", data = "<request>")]
pub fn evaluate_rpn(request: Json<RpnRequest>) -> Json<RpnResponse> {
    let outcome = request
        .program
        .iter()
        .map(RpnItem::to_token)
        .collect::<Result<Vec<_>, _>>()
        .and_then(|tokens| rpn::evaluate(&tokens));

    match outcome {
        Ok(value) => Json(RpnResponse {
            timestamp_utc: now(),
            decimal: decimal_rendering(&value),
            result: Some(value.optimize().to_string()),
            error: None,
        }),
        Err(e) => {
            log::error!("RPN evaluation failed: {}", e);
            Json(RpnResponse { timestamp_utc: now(), result: None, decimal: None, error: Some(e.to_string()) })
        }
    }
}

#[post("/api/v1/regression", format = "json", data = "<request>")]
pub fn regression(request: Json<RegressionRequest>) -> Json<RegressionResponse> {
    let outcome = request
        .points
        .iter()
        .map(|p| -> Result<(Fraction, Fraction), MathError> {
            Ok((p.x.parse()?, p.y.parse()?))
        })
        .collect::<Result<Vec<_>, MathError>>()
        .and_then(|points| linear_regression(&points));

    match outcome {
        Ok(fit) => Json(RegressionResponse {
            timestamp_utc: now(),
            slope: Some(fit.slope.to_string()),
            intercept: Some(fit.intercept.to_string()),
            slope_approx: Some(fit.slope.to_f64()),
            intercept_approx: Some(fit.intercept.to_f64()),
            error: None,
        }),
        Err(e) => {
            log::error!("Regression failed: {}", e);
            Json(RegressionResponse {
                timestamp_utc: now(),
                slope: None,
                intercept: None,
                slope_approx: None,
                intercept_approx: None,
                error: Some(e.to_string()),
            })
        }
    }
}

#[post("/api/v1/sqrt", format = "json", data = "<request>")]
pub fn square_root(request: Json<SqrtRequest>) -> Json<SqrtResponse> {
    match request.value.parse::<Fraction>().and_then(|v| v.sqrt()) {
        Ok(root) => Json(SqrtResponse {
            timestamp_utc: now(),
            approx: Some(root.to_f64()),
            result: Some(root.to_string()),
            error: None,
        }),
        Err(e) => {
            log::error!("Square root failed: {}", e);
            Json(SqrtResponse { timestamp_utc: now(), result: None, approx: None, error: Some(e.to_string()) })
        }
    }
}

#[post("/api/v1/calibration/solve", format = "json", data = "<request>")]
pub fn solve(request: Json<SolveRequest>) -> Json<SolveResponse> {
    let outcome = request
        .samples
        .iter()
        .map(|s| -> Result<CalibrationSample, MathError> {
            Ok(CalibrationSample {
                price: parse_integer(&s.price)?,
                coefficient: parse_integer(&s.coefficient)?,
            })
        })
        .collect::<Result<Vec<_>, MathError>>()
        .and_then(|samples| -> Result<_, MathError> {
            let target = request.target_price.parse::<Fraction>()?;
            solve_coefficient(&samples, &target)
        });

    match outcome {
        Ok((fit, coefficient)) => Json(SolveResponse {
            timestamp_utc: now(),
            coefficient: Some(coefficient.to_string()),
            slope: Some(fit.slope.to_string()),
            intercept: Some(fit.intercept.to_string()),
            error: None,
        }),
        Err(e) => {
            log::error!("Coefficient solve failed: {}", e);
            Json(SolveResponse {
                timestamp_utc: now(),
                coefficient: None,
                slope: None,
                intercept: None,
                error: Some(e.to_string()),
            })
        }
    }
}

fn report_dto(report: &CalibrationReport, nominal: &BigInt) -> CalibrationReportDto {
    CalibrationReportDto {
        parameter: report.param.to_string(),
        original_price: report.original_price.to_string(),
        target_price: report.target_price.to_bigint().to_string(),
        sample_count: report.samples.len(),
        slope: report.fit.slope.to_string(),
        intercept: report.fit.intercept.to_string(),
        applied_coefficient: report.applied_coefficient.to_string(),
        calibrated_price: report.calibrated_price.to_string(),
        calibrated_price_tokens: token_amount(&report.calibrated_price, nominal),
    }
}

#[post("/api/v1/calibration/simulate", format = "json", data = "<request>")]
pub async fn simulate_calibration(
    request: Json<SimulateRequest>,
    app_state: &State<Arc<AppState>>,
) -> Json<SimulateResponse> {
    let mut plan = app_state.plan.clone();
    if let Some(passes) = request.passes {
        plan.passes = passes.min(MAX_SIMULATION_PASSES);
    }

    let mut chain = SimulatedChain::default();
    let nominal = chain.nominal().clone();
    match Calibrator::new(plan).run_all(&mut chain).await {
        Ok(reports) => Json(SimulateResponse {
            timestamp_utc: now(),
            reports: reports.iter().map(|r| report_dto(r, &nominal)).collect(),
            error: None,
        }),
        Err(e) => {
            log::error!("Simulated calibration failed: {}", e);
            Json(SimulateResponse { timestamp_utc: now(), reports: Vec::new(), error: Some(e.to_string()) })
        }
    }
}

#[get("/api/v1/reference-fee")]
pub async fn reference_fee(app_state: &State<Arc<AppState>>) -> Json<ReferenceFeeResponse> {
    let unavailable = |error: String| ReferenceFeeResponse {
        timestamp_utc: now(),
        block_number: None,
        gas_price: None,
        gas_limit: None,
        total: None,
        total_tokens: None,
        error: Some(error),
    };

    let Some(probe) = app_state.fee_probe.as_ref() else {
        return Json(unavailable("EVM_RPC_URL is not configured".to_string()));
    };

    match probe.reference_fee().await {
        Ok(fee) => {
            let nominal = BigInt::from(10u8).pow(app_state.token_decimals);
            Json(ReferenceFeeResponse {
                timestamp_utc: now(),
                block_number: Some(fee.block_number),
                gas_price: Some(fee.gas_price.to_string()),
                gas_limit: Some(fee.gas_limit),
                total_tokens: Some(token_amount(&fee.total, &nominal)),
                total: Some(fee.total.to_string()),
                error: None,
            })
        }
        Err(e) => {
            log::error!("Reference fee probe failed: {}", e);
            Json(unavailable(e.to_string()))
        }
    }
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
