//! Request validation, feature preparation and post-processing.
//!
//! This is the only place that knows how an API request becomes the feature
//! row the model was trained on.

use chrono::Weekday;
use tracing::debug;

use crate::error::{PredictError, PredictResult};
use crate::model::{Artifacts, FeatureRow};

/// How the submitted day of week relates to the day being predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayMode {
    /// The caller sends today; the prediction is for tomorrow.
    Today,
    /// The caller sends the day being predicted.
    Target,
}

impl DayMode {
    pub fn target_day(self, reference: Weekday) -> Weekday {
        match self {
            DayMode::Today => reference.succ(),
            DayMode::Target => reference,
        }
    }
}

/// Variant-independent view of a prediction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub menu_name: String,
    pub reference_day_sales: i64,
    pub reference_day_of_week: i64,
}

/// Model input, in training column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureVector {
    pub target_day_of_week: u32,
    pub is_weekend: u32,
    pub reference_day_sales: i64,
    pub menu_code: u32,
}

impl FeatureVector {
    pub fn to_row(&self) -> FeatureRow {
        [
            f64::from(self.target_day_of_week),
            f64::from(self.is_weekend),
            self.reference_day_sales as f64,
            f64::from(self.menu_code),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub menu_name: String,
    pub target_day: Weekday,
    pub predicted_quantity: u64,
}

impl Prediction {
    pub fn message(&self) -> String {
        format!(
            "Predicted quantity for '{}' on {}: {}",
            self.menu_name,
            weekday_name(self.target_day),
            self.predicted_quantity
        )
    }
}

/// Parse a 0=Monday..6=Sunday index.
pub fn parse_day_of_week(value: i64) -> PredictResult<Weekday> {
    u8::try_from(value)
        .ok()
        .and_then(|v| Weekday::try_from(v).ok())
        .ok_or_else(|| {
            PredictError::validation(format!(
                "day_of_week must be between 0 and 6 (0=Monday, 6=Sunday), got {}",
                value
            ))
        })
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Validate the request and build the model's feature vector.
pub fn prepare_features(
    artifacts: &Artifacts,
    request: &PredictionRequest,
    mode: DayMode,
) -> PredictResult<(FeatureVector, Weekday)> {
    let reference_day = parse_day_of_week(request.reference_day_of_week)?;
    if request.reference_day_sales < 0 {
        return Err(PredictError::validation(format!(
            "previous day sales must be non-negative, got {}",
            request.reference_day_sales
        )));
    }

    let target_day = mode.target_day(reference_day);
    let menu_code = artifacts
        .encoder()
        .encode(&request.menu_name)
        .ok_or_else(|| PredictError::UnknownCategory(request.menu_name.clone()))?;

    let features = FeatureVector {
        target_day_of_week: target_day.num_days_from_monday(),
        is_weekend: u32::from(is_weekend(target_day)),
        reference_day_sales: request.reference_day_sales,
        menu_code,
    };
    Ok((features, target_day))
}

/// Round half to even and clamp at zero.
pub fn postprocess(raw: f64) -> PredictResult<u64> {
    if !raw.is_finite() {
        return Err(PredictError::internal(format!(
            "model returned a non-finite value: {}",
            raw
        )));
    }
    // Saturating cast; negatives already clamped by max.
    Ok(raw.round_ties_even().max(0.0) as u64)
}

/// Run one prediction against loaded artifacts.
///
/// `None` artifacts means loading failed at startup.
pub fn predict(
    artifacts: Option<&Artifacts>,
    request: &PredictionRequest,
    mode: DayMode,
) -> PredictResult<Prediction> {
    let artifacts = artifacts.ok_or(PredictError::ServiceUnavailable)?;
    let (features, target_day) = prepare_features(artifacts, request, mode)?;
    debug!(?features, menu = %request.menu_name, "running model");

    let raw = artifacts
        .model()
        .predict(&[features.to_row()])
        .first()
        .copied()
        .ok_or_else(|| PredictError::internal("model returned no prediction"))?;

    Ok(Prediction {
        menu_name: request.menu_name.clone(),
        target_day,
        predicted_quantity: postprocess(raw)?,
    })
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
