pub mod client;
pub mod error;
pub mod types;

pub use client::ChatClient;
pub use error::LlmError;
pub use types::CompletionOptions;

/// One-shot text generation: a system prompt and a user prompt in, text out.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;
}
