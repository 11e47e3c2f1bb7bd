mod anthropic;
mod gemini;
mod ollama;
mod openai;

pub use anthropic::AnthropicOracle;
pub use gemini::GeminiOracle;
pub use ollama::OllamaOracle;
pub use openai::OpenAiOracle;

/// Low temperature keeps cost-center picks stable between calls.
pub(crate) const TEMPERATURE: f32 = 0.2;
