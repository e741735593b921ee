//! Best-effort AI descriptions of extracted images.

use crate::images::InlineImage;
use crate::provider::{FailoverOptions, GenerationProvider};

/// Instruction sent with every image.
pub const DESCRIBE_PROMPT: &str = "Describe this image in detail, focusing on UI elements, \
interface components, navigation elements, buttons, menus, text, and any other important \
visual elements. This description will help users understand website navigation and \
interface layout.";

/// Returned whenever a description cannot be produced.
pub const FALLBACK_DESCRIPTION: &str = "Unable to generate image description";

/// Sends images to a vision-capable model.
#[derive(Clone)]
pub struct ImageDescriber {
    generator: GenerationProvider,
    vision_model: String,
}

impl ImageDescriber {
    pub fn new(generator: GenerationProvider, vision_model: impl Into<String>) -> Self {
        Self {
            generator,
            vision_model: vision_model.into(),
        }
    }

    /// Describe the image in `payload` (a `data:` URI).
    ///
    /// Never fails: any error yields [`FALLBACK_DESCRIPTION`].
    pub async fn describe(&self, payload: &str) -> String {
        let Some(image) = InlineImage::from_data_uri(payload) else {
            tracing::warn!("image payload is not a base64 data URI");
            return FALLBACK_DESCRIPTION.to_string();
        };

        let options = FailoverOptions::preferring(self.vision_model.clone());
        match self
            .generator
            .generate_with(DESCRIBE_PROMPT, std::slice::from_ref(&image), &options)
            .await
        {
            Ok(generated) => {
                tracing::debug!(model = %generated.model_used, "image described");
                generated.text
            }
            Err(e) => {
                tracing::warn!(error = %e, "image description failed");
                FALLBACK_DESCRIPTION.to_string()
            }
        }
    }

    /// Whether `description` is the fallback text rather than a model reply.
    pub fn is_fallback(description: &str) -> bool {
        description == FALLBACK_DESCRIPTION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::*;
    use crate::provider::ProviderError;
    use std::sync::Arc;
    use std::time::Duration;

    fn describer(backend: Arc<ScriptedBackend>) -> ImageDescriber {
        let generator = GenerationProvider::new(
            backend,
            specs(&["gemini-2.5-flash", "gemini-2.0-flash-exp"]),
            Duration::from_secs(5),
        );
        ImageDescriber::new(generator, "gemini-2.0-flash-exp")
    }

    #[tokio::test]
    async fn sends_image_to_vision_model_first() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with("gemini-2.0-flash-exp", Reply::Text("A settings menu".into())),
        );
        let d = describer(backend.clone());
        let desc = d.describe("data:image/png;base64,AAAA").await;
        assert_eq!(desc, "A settings menu");
        assert_eq!(backend.calls(), vec!["gemini-2.0-flash-exp"]);
        assert_eq!(*backend.image_counts.lock().unwrap(), vec![1]);
        assert!(backend.prompts.lock().unwrap()[0].starts_with("Describe this image"));
    }

    #[tokio::test]
    async fn any_failure_yields_fallback() {
        let backend = Arc::new(ScriptedBackend::new().with(
            "gemini-2.0-flash-exp",
            Reply::Fail(ProviderError::new(Some(403), "permission denied")),
        ));
        let desc = describer(backend).describe("data:image/png;base64,AAAA").await;
        assert_eq!(desc, FALLBACK_DESCRIPTION);
        assert!(ImageDescriber::is_fallback(&desc));
    }

    #[tokio::test]
    async fn malformed_payload_yields_fallback_without_calling_model() {
        let backend = Arc::new(ScriptedBackend::new());
        let desc = describer(backend.clone()).describe("not-a-data-uri").await;
        assert_eq!(desc, FALLBACK_DESCRIPTION);
        assert!(backend.calls().is_empty());
    }
}
