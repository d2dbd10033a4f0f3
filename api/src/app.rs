use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::{ApiVariant, CorsConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::handler::{predict_next_day, predict_same_day, read_root};
use crate::model::Artifacts;

#[derive(Clone)]
pub struct AppState {
    /// `None` when loading failed at startup
    pub artifacts: Option<Arc<Artifacts>>,
    pub service_message: String,
}

impl AppState {
    pub fn new(artifacts: Option<Artifacts>, service_message: impl Into<String>) -> Self {
        Self {
            artifacts: artifacts.map(Arc::new),
            service_message: service_message.into(),
        }
    }

    pub fn artifacts(&self) -> Option<&Artifacts> {
        self.artifacts.as_deref()
    }
}

pub fn create_router(app_state: AppState, variant: ApiVariant, cors: CorsLayer) -> Router {
    let api_routes = match variant {
        ApiVariant::NextDay => Router::new()
            .route("/", get(read_root))
            .route("/predict/", post(predict_next_day)),
        ApiVariant::SameDay => Router::new().route("/predict", post(predict_same_day)),
    };

    api_routes.layer(cors).with_state(app_state)
}

/// Credentialed CORS cannot answer with a literal `*`, so a wildcard origin
/// is mirrored back along with the requested method and headers.
pub fn cors_layer(config: &CorsConfig) -> ConfigResult<CorsLayer> {
    let origin = if config.allows_any_origin() {
        AllowOrigin::mirror_request()
    } else {
        let origins = config
            .allow_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o)
                    .map_err(|_| ConfigError::Invalid(format!("invalid CORS origin '{}'", o)))
            })
            .collect::<ConfigResult<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(config.allow_credentials))
}
