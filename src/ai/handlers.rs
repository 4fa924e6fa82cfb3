use axum::{extract::State, routing::post, Router};
use tracing::{instrument, warn};

use super::dto::{AnalysisResponse, LocationAnalysisRequest, PropertyAnalysisRequest};
use super::services::AiService;
use crate::{error::ApiError, extract::Json, state::AppState};

pub fn ai_routes() -> Router<AppState> {
    Router::new()
        .route("/ai/properties", post(analyze_properties))
        .route("/ai/locations", post(analyze_locations))
}

fn service(state: &AppState) -> Result<&AiService, ApiError> {
    state.ai.as_ref().ok_or_else(|| {
        warn!("analysis requested but OPENAI_API_KEY is not configured");
        ApiError::Unavailable("AI analysis is not configured".into())
    })
}

#[instrument(skip(state, payload))]
pub async fn analyze_properties(
    State(state): State<AppState>,
    Json(payload): Json<PropertyAnalysisRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let ai = service(&state)?;
    if payload.properties.is_empty() {
        return Err(ApiError::Validation("No properties to analyze".into()));
    }
    let analysis = ai
        .analyze_properties(
            &payload.properties,
            &payload.city,
            payload.max_price.as_ref(),
            &payload.property_category,
            &payload.property_type,
        )
        .await;
    Ok(Json(AnalysisResponse { success: true, analysis }))
}

#[instrument(skip(state, payload))]
pub async fn analyze_locations(
    State(state): State<AppState>,
    Json(payload): Json<LocationAnalysisRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let ai = service(&state)?;
    if payload.locations.is_empty() {
        return Err(ApiError::Validation("No locations to analyze".into()));
    }
    let analysis = ai
        .analyze_location_trends(&payload.locations, &payload.city)
        .await;
    Ok(Json(AnalysisResponse { success: true, analysis }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::ai::{dto::Property, services::testing::FakeCompletion};

    fn request() -> PropertyAnalysisRequest {
        PropertyAnalysisRequest {
            properties: vec![Property {
                building_name: Some("Palm Heights".into()),
                ..Default::default()
            }],
            city: "Pune".into(),
            max_price: Some(json!(2)),
            property_category: "Residential".into(),
            property_type: "Flat".into(),
        }
    }

    #[tokio::test]
    async fn disabled_feature_answers_503() {
        let state = AppState::fake();
        let err = analyze_properties(State(state), Json(request())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn property_analysis_returns_text() {
        let state = AppState::fake().with_ai(Arc::new(FakeCompletion::default()));
        let Json(resp) = analyze_properties(State(state), Json(request())).await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.analysis, "Best value: Palm Heights.");
    }

    #[tokio::test]
    async fn empty_locations_are_rejected() {
        let state = AppState::fake().with_ai(Arc::new(FakeCompletion::default()));
        let req = LocationAnalysisRequest { locations: vec![], city: "Pune".into() };
        let err = analyze_locations(State(state), Json(req)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn backend_failure_is_reported_in_text() {
        let fake = FakeCompletion { fail: true, ..Default::default() };
        let state = AppState::fake().with_ai(Arc::new(fake));
        let req = LocationAnalysisRequest {
            locations: vec![json!({ "location": "Baner", "growth": "8%" })],
            city: "Pune".into(),
        };
        let Json(resp) = analyze_locations(State(state), Json(req)).await.unwrap();
        assert!(resp.analysis.starts_with("Error: "));
    }
}
