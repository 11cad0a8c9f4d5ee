use rocket::serde::{Deserialize, Serialize};

use crate::math::rpn::{Op, Token};
use crate::math::{Fraction, MathError};

/// One RPN program item: an integer, a `"n/d"` literal, an operator, or a nested program.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RpnItem {
    Integer(i64),
    Text(String),
    Group(Vec<RpnItem>),
}

impl RpnItem {
    pub fn to_token(&self) -> Result<Token, MathError> {
        match self {
            RpnItem::Integer(v) => Ok(Token::Value(Fraction::from(*v))),
            RpnItem::Text(s) => {
                if let Ok(op) = s.trim().parse::<Op>() {
                    Ok(Token::Op(op))
                } else if s.chars().any(|c| c.is_ascii_digit()) {
                    Ok(Token::Value(s.parse()?))
                } else {
                    // left for the evaluator to reject as an unknown operand
                    Ok(Token::Symbol(s.clone()))
                }
            }
            RpnItem::Group(items) => Ok(Token::Group(
                items.iter().map(RpnItem::to_token).collect::<Result<_, _>>()?,
            )),
        }
    }
}

#[derive(Deserialize)]
pub struct RpnRequest {
    pub program: Vec<RpnItem>,
}

#[derive(Serialize)]
pub struct RpnResponse {
    pub timestamp_utc: String,
    pub result: Option<String>,
    pub decimal: Option<String>, // truncated, trailing zeros dropped; null when out of range
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct PointDto {
    pub x: String,
    pub y: String,
}

#[derive(Deserialize)]
pub struct RegressionRequest {
    pub points: Vec<PointDto>,
}

#[derive(Serialize)]
pub struct RegressionResponse {
    pub timestamp_utc: String,
    pub slope: Option<String>,
    pub intercept: Option<String>,
    pub slope_approx: Option<f64>,
    pub intercept_approx: Option<f64>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct SqrtRequest {
    pub value: String,
}

#[derive(Serialize)]
pub struct SqrtResponse {
    pub timestamp_utc: String,
    pub result: Option<String>,
    pub approx: Option<f64>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct SampleDto {
    pub price: String,       // raw balance units spent on the reference operation
    pub coefficient: String, // coefficient in force while measuring
}

#[derive(Deserialize)]
pub struct SolveRequest {
    pub samples: Vec<SampleDto>,
    pub target_price: String, // raw units, fractions allowed
}

#[derive(Serialize)]
pub struct SolveResponse {
    pub timestamp_utc: String,
    pub coefficient: Option<String>,
    pub slope: Option<String>,
    pub intercept: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct SimulateRequest {
    pub passes: Option<u32>,
}

#[derive(Serialize)]
pub struct CalibrationReportDto {
    pub parameter: String,
    pub original_price: String,
    pub target_price: String,
    pub sample_count: usize,
    pub slope: String,
    pub intercept: String,
    pub applied_coefficient: String,
    pub calibrated_price: String,
    pub calibrated_price_tokens: String,
}

#[derive(Serialize)]
pub struct SimulateResponse {
    pub timestamp_utc: String,
    pub reports: Vec<CalibrationReportDto>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ReferenceFeeResponse {
    pub timestamp_utc: String,
    pub block_number: Option<u64>,
    pub gas_price: Option<String>,
    pub gas_limit: Option<u64>,
    pub total: Option<String>,
    pub total_tokens: Option<String>,
    pub error: Option<String>,
}
