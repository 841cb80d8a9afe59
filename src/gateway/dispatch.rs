// src/gateway/dispatch.rs

//! Model-specific request parameters.
//!
//! New-generation models reject a sampling temperature and take their output
//! budget as `max_completion_tokens`; legacy models take `temperature` and
//! `max_tokens`. The table is resolved once per run.

use super::types::ChatRequest;
use crate::models::GatewayConfig;

/// Parameters applied to every request for one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelDispatch {
    Modern { max_completion_tokens: u32 },
    Legacy { temperature: f32, max_tokens: u32 },
}

impl ModelDispatch {
    pub fn is_modern(&self) -> bool {
        matches!(self, Self::Modern { .. })
    }

    /// Set this dispatch's parameters on `request`, clearing the other shape's.
    pub fn apply(&self, mut request: ChatRequest) -> ChatRequest {
        match *self {
            Self::Modern {
                max_completion_tokens,
            } => {
                request.temperature = None;
                request.max_tokens = None;
                request.max_completion_tokens = Some(max_completion_tokens);
            }
            Self::Legacy {
                temperature,
                max_tokens,
            } => {
                request.temperature = Some(temperature);
                request.max_tokens = Some(max_tokens);
                request.max_completion_tokens = None;
            }
        }
        request
    }
}

/// Versioned list of markers that identify new-generation models.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchTable {
    version: String,
    markers: Vec<String>,
    max_output_tokens: u32,
    legacy_temperature: f32,
}

impl DispatchTable {
    pub fn new(
        version: impl Into<String>,
        markers: Vec<String>,
        max_output_tokens: u32,
        legacy_temperature: f32,
    ) -> Self {
        Self {
            version: version.into(),
            markers: markers.into_iter().map(|m| m.to_lowercase()).collect(),
            max_output_tokens,
            legacy_temperature,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.dispatch_version.clone(),
            config.new_generation_markers.clone(),
            config.max_output_tokens,
            config.legacy_temperature,
        )
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Classify `model` by case-insensitive substring match against the markers.
    pub fn resolve(&self, model: &str) -> ModelDispatch {
        let model = model.to_lowercase();
        if self.markers.iter().any(|m| model.contains(m.as_str())) {
            ModelDispatch::Modern {
                max_completion_tokens: self.max_output_tokens,
            }
        } else {
            ModelDispatch::Legacy {
                temperature: self.legacy_temperature,
                max_tokens: self.max_output_tokens,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DispatchTable {
        DispatchTable::from_config(&GatewayConfig::default())
    }

    fn body(model: &str) -> serde_json::Value {
        let dispatch = table().resolve(model);
        serde_json::to_value(dispatch.apply(ChatRequest::new(model, "s", "u"))).unwrap()
    }

    #[test]
    fn test_new_generation_requests_never_carry_temperature() {
        for model in ["gpt-4o-mini", "o1-preview", "o3-mini", "gpt-4.1-2025-04-14", "gpt-5", "GPT-4O"] {
            let json = body(model);
            assert!(json.get("temperature").is_none(), "{model}");
            assert_eq!(json["max_completion_tokens"], 4000, "{model}");
            assert!(json.get("max_tokens").is_none(), "{model}");
        }
    }

    #[test]
    fn test_legacy_requests_always_carry_temperature() {
        for model in ["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo", "some-local-model"] {
            let json = body(model);
            let temperature = json["temperature"].as_f64().unwrap();
            assert!((temperature - 0.7).abs() < 1e-6, "{model}");
            assert_eq!(json["max_tokens"], 4000, "{model}");
            assert!(json.get("max_completion_tokens").is_none(), "{model}");
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let table = table();
        assert_eq!(table.resolve("gpt-4o"), table.resolve("gpt-4o"));
        assert_eq!(table.version(), "2025-04");
    }

    #[test]
    fn test_apply_overrides_previous_shape() {
        let legacy = table().resolve("gpt-4").apply(ChatRequest::new("gpt-4", "s", "u"));
        let modern = table().resolve("o3").apply(legacy);
        assert_eq!(modern.temperature, None);
        assert_eq!(modern.max_tokens, None);
    }
}
