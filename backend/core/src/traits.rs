use anyhow::Result;
use async_trait::async_trait;

/// Trait for hosted multimodal models used by the rib mapper.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// Send a prompt with images and return the response text.
    async fn complete(&self, request: &VisionRequest) -> Result<VisionResponse>;
}

/// An image attached to a vision request.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Short label the prompt refers to (e.g., "catalog", "order").
    pub label: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Request to a vision provider. Images are sent in order.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub images: Vec<ImageInput>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response from a vision provider.
#[derive(Debug, Clone)]
pub struct VisionResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
