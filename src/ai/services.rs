use std::{sync::Arc, time::Instant};

use tracing::{error, info};

use super::client::CompletionClient;
use super::dto::{PreparedProperty, Property};

pub const MAX_PROPERTIES: usize = 3;
pub const MAX_LOCATIONS: usize = 5;
pub const MAX_AMENITIES: usize = 5;
pub const MAX_DESCRIPTION_CHARS: usize = 150;

pub fn prepare_properties(properties: &[Property]) -> Vec<PreparedProperty> {
    properties
        .iter()
        .take(MAX_PROPERTIES)
        .map(|p| PreparedProperty {
            building_name: p.building_name.clone(),
            property_type: p.property_type.clone(),
            location_address: p.location_address.clone(),
            price: p.price.clone(),
            area_sqft: p.area_sqft.clone(),
            amenities: match &p.amenities {
                Some(serde_json::Value::Array(items)) => {
                    items.iter().take(MAX_AMENITIES).cloned().collect()
                }
                _ => Vec::new(),
            },
            description: p
                .description
                .as_deref()
                .map(truncate_description)
                .unwrap_or_default(),
        })
        .collect()
}

fn truncate_description(text: &str) -> String {
    // Cut after MAX_DESCRIPTION_CHARS chars, not UTF-16 code units.
    match text.char_indices().nth(MAX_DESCRIPTION_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn prepare_locations(locations: &[serde_json::Value]) -> Vec<serde_json::Value> {
    locations.iter().take(MAX_LOCATIONS).cloned().collect()
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

/// Strings are shown bare, everything else as JSON.
fn display_value(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => "any".to_string(),
    }
}

pub fn property_prompt(
    properties: &[PreparedProperty],
    city: &str,
    max_price: Option<&serde_json::Value>,
    property_category: &str,
    property_type: &str,
) -> String {
    format!(
        r#"As a real estate expert, analyze these properties:

Properties Found in {city}:
{data}

INSTRUCTIONS:
1. Focus ONLY on these properties that match:
   - Property Category: {property_category}
   - Property Type: {property_type}
   - Maximum Price: {max_price} crores
2. Provide a brief analysis with these sections:
   - Property Overview (basic facts about each)
   - Best Value Analysis (which offers the best value)
   - Quick Recommendations

Keep your response concise and focused on these properties only.
"#,
        data = pretty(&properties),
        max_price = display_value(max_price),
    )
}

pub fn location_prompt(locations: &[serde_json::Value], city: &str) -> String {
    format!(
        r#"As a real estate expert, analyze these location price trends for {city}:

{data}

Please provide:
1. A brief summary of price trends for each location
2. Which areas are showing the highest appreciation
3. Which areas offer the best rental yield
4. Quick investment recommendations based on this data

Keep your response concise (maximum 300 words).
"#,
        data = pretty(&locations),
    )
}

/// Real-estate analysis on top of a completion backend.
#[derive(Clone)]
pub struct AiService {
    client: Arc<dyn CompletionClient>,
}

impl AiService {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Generated text, or `Error: <reason>` when the backend fails.
    pub async fn generate_text(&self, prompt: &str) -> String {
        let started = Instant::now();
        info!("starting completion");
        match self.client.complete(prompt).await {
            Ok(text) => {
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "completion finished");
                text
            }
            Err(e) => {
                error!(error = %e, "completion failed");
                format!("Error: {e}")
            }
        }
    }

    pub async fn analyze_properties(
        &self,
        properties: &[Property],
        city: &str,
        max_price: Option<&serde_json::Value>,
        property_category: &str,
        property_type: &str,
    ) -> String {
        let prepared = prepare_properties(properties);
        let prompt = property_prompt(&prepared, city, max_price, property_category, property_type);
        self.generate_text(&prompt).await
    }

    pub async fn analyze_location_trends(
        &self,
        locations: &[serde_json::Value],
        city: &str,
    ) -> String {
        let prepared = prepare_locations(locations);
        let prompt = location_prompt(&prepared, city);
        self.generate_text(&prompt).await
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Echoes a canned reply and remembers prompts.
    #[derive(Default)]
    pub struct FakeCompletion {
        pub prompts: Mutex<Vec<String>>,
        pub fail: bool,
    }

    #[async_trait]
    impl CompletionClient for FakeCompletion {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                anyhow::bail!("429 Too Many Requests");
            }
            Ok("Best value: Palm Heights.".to_string())
        }
    }
}
