use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::app::AppState;
use crate::error::{PredictError, PredictErrorKind};
use crate::prediction::{self, DayMode, PredictionRequest};
use crate::schema::{
    DetailBody, ErrorBody, NextDayPredictionInput, NextDayPredictionOutput, RootMessage,
    SameDayPredictionInput, SameDayPredictionOutput,
};

pub async fn read_root(State(state): State<AppState>) -> Json<RootMessage> {
    Json(RootMessage {
        message: state.service_message.clone(),
    })
}

const NEXT_DAY_BODY: &str =
    "{menu_name: string, last_day_quantity: int, today_day_of_week: int}";
const SAME_DAY_BODY: &str = "{menu_name: string, prev_day_sales: int, day_of_week: int}";

// always 200; failures go in the `error` field
pub async fn predict_next_day(
    State(state): State<AppState>,
    payload: Result<Json<NextDayPredictionInput>, JsonRejection>,
) -> Response {
    let result = payload
        .map_err(|rejection| body_error(&rejection, NEXT_DAY_BODY))
        .and_then(|Json(input)| {
            let request = PredictionRequest::from(input);
            prediction::predict(state.artifacts(), &request, DayMode::Today)
        });

    match result {
        Ok(prediction) => Json(NextDayPredictionOutput {
            predicted_quantity: prediction.predicted_quantity,
        })
        .into_response(),
        Err(e) => {
            log_failure(&e);
            Json(ErrorBody {
                error: e.to_string(),
            })
            .into_response()
        }
    }
}

pub async fn predict_same_day(
    State(state): State<AppState>,
    payload: Result<Json<SameDayPredictionInput>, JsonRejection>,
) -> Result<impl IntoResponse, (StatusCode, Json<DetailBody>)> {
    let Json(input) = payload
        .map_err(|rejection| detail_error(body_error(&rejection, SAME_DAY_BODY)))?;
    let request = PredictionRequest::from(input);

    let prediction = prediction::predict(state.artifacts(), &request, DayMode::Target)
        .map_err(detail_error)?;

    Ok(Json(SameDayPredictionOutput {
        message: prediction.message(),
        predicted_quantity: prediction.predicted_quantity,
    }))
}

// the extractor's own text names serde internals, keep it out of responses
fn body_error(rejection: &JsonRejection, expected: &str) -> PredictError {
    debug!(rejection = %rejection.body_text(), "request body rejected");
    PredictError::validation(format!("Invalid request body: expected {}", expected))
}

fn detail_error(err: PredictError) -> (StatusCode, Json<DetailBody>) {
    log_failure(&err);
    let (status, detail) = match err.kind() {
        PredictErrorKind::Validation | PredictErrorKind::UnknownCategory => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        PredictErrorKind::ServiceUnavailable => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        // raw detail stays in the logs
        PredictErrorKind::Internal => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal prediction error".to_string(),
        ),
    };
    (status, Json(DetailBody { detail }))
}

fn log_failure(err: &PredictError) {
    match err.kind() {
        PredictErrorKind::Internal => error!(error = %err, "prediction failed"),
        PredictErrorKind::ServiceUnavailable => error!("prediction requested but artifacts are not loaded"),
        PredictErrorKind::Validation | PredictErrorKind::UnknownCategory => {
            debug!(error = %err, "prediction request rejected")
        }
    }
}
