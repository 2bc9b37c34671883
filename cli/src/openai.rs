use anyhow::{Context, Result};

use mealplan_core::chat::{
    ChatError, ChatMessage, ChatProvider, build_request, extract_reply, rejected,
};

use crate::config::{ChatConfig, OPENAI_API_KEY_VAR};

pub struct OpenAiClient {
    client: reqwest::Client,
    config: ChatConfig,
    rt: tokio::runtime::Handle,
}

impl OpenAiClient {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "mealplan-cli/{} (meal planner)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(60))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        let rt = tokio::runtime::Handle::try_current()
            .context("Chat client must be created inside the tokio runtime")?;
        Ok(Self { client, config, rt })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// One request/response exchange; no retries.
    pub async fn complete_async(
        &self,
        history: &[ChatMessage],
        context: &str,
    ) -> Result<String, ChatError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::Config(format!("{OPENAI_API_KEY_VAR} is not set")))?;

        let request = build_request(&self.config.model, history, context);
        let url = format!("{}/chat/completions", self.config.base_url);
        tracing::debug!(%url, model = %request.model, turns = request.messages.len(), "sending chat request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Transport {
                status: None,
                message: format!("failed to reach {url}: {e}"),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ChatError::Transport {
            status: Some(status.as_u16()),
            message: format!("failed to read response: {e}"),
        })?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "chat request rejected");
            return Err(rejected(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                &body,
            ));
        }

        extract_reply(&body)
    }
}

impl ChatProvider for OpenAiClient {
    fn complete(&self, history: &[ChatMessage], context: &str) -> Result<String, ChatError> {
        self.rt.block_on(self.complete_async(history, context))
    }
}
