use serde::{Deserialize, Serialize};

/// Listing record as supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Property {
    #[serde(default)]
    pub building_name: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub area_sqft: Option<serde_json::Value>,
    #[serde(default)]
    pub amenities: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Trimmed-down property embedded in the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedProperty {
    pub building_name: Option<String>,
    pub property_type: Option<String>,
    pub location_address: Option<String>,
    pub price: Option<serde_json::Value>,
    pub area_sqft: Option<serde_json::Value>,
    pub amenities: Vec<serde_json::Value>,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct PropertyAnalysisRequest {
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub max_price: Option<serde_json::Value>,
    #[serde(default)]
    pub property_category: String,
    #[serde(default)]
    pub property_type: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationAnalysisRequest {
    #[serde(default)]
    pub locations: Vec<serde_json::Value>,
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub analysis: String,
}
