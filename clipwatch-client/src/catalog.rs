//! Model catalog and request shaping
//!
//! Fills in per-model defaults and rejects or coerces parameters a model
//! does not accept, before the request reaches a provider.

use clipwatch_core::ValidationError;
use clipwatch_core::domain::request::{GenerationRequest, Provider};

/// Parameters a model accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: Provider,
    pub id: &'static str,
    pub seconds_options: &'static [&'static str],
    pub default_seconds: &'static str,
    /// Empty when the model takes any size string
    pub size_options: &'static [&'static str],
    pub default_size: &'static str,
    pub aspect_ratio: Option<&'static str>,
    pub supports_image_reference: bool,
}

const SORA_SECONDS: &[&str] = &["4", "8", "12"];

pub const MODELS: &[ModelSpec] = &[
    ModelSpec {
        provider: Provider::OpenAi,
        id: "sora-2",
        seconds_options: SORA_SECONDS,
        default_seconds: "8",
        size_options: &[],
        default_size: "1280x720",
        aspect_ratio: None,
        supports_image_reference: true,
    },
    ModelSpec {
        provider: Provider::OpenAi,
        id: "sora-2-pro",
        seconds_options: SORA_SECONDS,
        default_seconds: "8",
        size_options: &[],
        default_size: "1280x720",
        aspect_ratio: None,
        supports_image_reference: true,
    },
    ModelSpec {
        provider: Provider::Replicate,
        id: "bytedance/seedance-1-pro",
        seconds_options: &["5", "10"],
        default_seconds: "5",
        size_options: &["1080p", "480p"],
        default_size: "1080p",
        aspect_ratio: Some("16:9"),
        supports_image_reference: true,
    },
];

/// Looks up a model by provider and id
pub fn find(provider: Provider, model: &str) -> Option<&'static ModelSpec> {
    MODELS
        .iter()
        .find(|spec| spec.provider == provider && spec.id == model)
}

/// Validates `request` and fills in model defaults
///
/// OpenAI rejects unsupported durations; Replicate coerces unsupported
/// durations and resolutions to the model default and rejects unknown models.
pub fn shape(request: &GenerationRequest) -> Result<GenerationRequest, ValidationError> {
    request.validate()?;

    let mut shaped = request.clone();
    shaped.prompt = request.prompt.trim().to_string();
    shaped.model = request.model.trim().to_string();
    shaped.remix_video_id = trimmed(&request.remix_video_id);
    shaped.input_reference = trimmed(&request.input_reference);

    match request.provider {
        Provider::OpenAi => {
            // Unlisted OpenAI models are passed through with Sora's rules
            let spec = find(Provider::OpenAi, &shaped.model).unwrap_or(&MODELS[0]);
            let seconds = trimmed(&request.seconds).unwrap_or_else(|| spec.default_seconds.into());
            if !spec.seconds_options.contains(&seconds.as_str()) {
                return Err(ValidationError::new(format!(
                    "Invalid seconds value. Allowed options: {}.",
                    spec.seconds_options.join(", ")
                )));
            }
            shaped.seconds = Some(seconds);
            shaped.size = Some(trimmed(&request.size).unwrap_or_else(|| spec.default_size.into()));
        }
        Provider::Replicate => {
            let spec = find(Provider::Replicate, &shaped.model).ok_or_else(|| {
                ValidationError::new(format!("Unsupported Replicate model \"{}\".", shaped.model))
            })?;
            shaped.seconds = Some(coerce(&request.seconds, spec.seconds_options, spec.default_seconds));
            shaped.size = Some(coerce(&request.size, spec.size_options, spec.default_size));
            if !spec.supports_image_reference {
                shaped.input_reference = None;
            }
            shaped.remix_video_id = None;
        }
    }

    Ok(shaped)
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn coerce(value: &Option<String>, allowed: &[&str], fallback: &str) -> String {
    match trimmed(value) {
        Some(v) if allowed.contains(&v.as_str()) => v,
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_defaults() {
        let shaped = shape(&GenerationRequest::new(Provider::OpenAi, "  neon jungle  ")).unwrap();
        assert_eq!(shaped.prompt, "neon jungle");
        assert_eq!(shaped.seconds.as_deref(), Some("8"));
        assert_eq!(shaped.size.as_deref(), Some("1280x720"));
    }

    #[test]
    fn test_openai_rejects_unsupported_seconds() {
        let req = GenerationRequest::new(Provider::OpenAi, "A").with_seconds("7");
        let err = shape(&req).unwrap_err();
        assert_eq!(err.message(), "Invalid seconds value. Allowed options: 4, 8, 12.");
    }

    #[test]
    fn test_replicate_coerces_to_defaults() {
        let req = GenerationRequest::new(Provider::Replicate, "A")
            .with_seconds("7")
            .with_size("4k");
        let shaped = shape(&req).unwrap();
        assert_eq!(shaped.seconds.as_deref(), Some("5"));
        assert_eq!(shaped.size.as_deref(), Some("1080p"));

        let req = GenerationRequest::new(Provider::Replicate, "A")
            .with_seconds("10")
            .with_size("480p");
        let shaped = shape(&req).unwrap();
        assert_eq!(shaped.seconds.as_deref(), Some("10"));
        assert_eq!(shaped.size.as_deref(), Some("480p"));
    }

    #[test]
    fn test_replicate_rejects_unknown_model() {
        let req = GenerationRequest::new(Provider::Replicate, "A").with_model("someone/else");
        assert!(shape(&req).is_err());
    }

    #[test]
    fn test_empty_prompt_is_rejected() {
        assert!(shape(&GenerationRequest::new(Provider::OpenAi, " ")).is_err());
    }

    #[test]
    fn test_blank_optional_fields_are_dropped() {
        let mut req = GenerationRequest::new(Provider::OpenAi, "A");
        req.remix_video_id = Some("   ".to_string());
        req.input_reference = Some(" ref ".to_string());
        let shaped = shape(&req).unwrap();
        assert!(shaped.remix_video_id.is_none());
        assert_eq!(shaped.input_reference.as_deref(), Some("ref"));
    }
}
