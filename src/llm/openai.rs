//! OpenAI 兼容补全传输
//!
//! 通过 reqwest 直接 POST `{base_url}/chat/completions`；支持任意 OpenAI 兼容端点（可配置 base_url）。
//! 非 2xx 状态原样带回状态码与响应体，解析失败归为 Decode。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::TransportError;
use crate::llm::{ChatRequest, ChatResponse, ChatTransport, Message, Usage};
use crate::tools::ToolDescriptor;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Default)]
struct UsageCounters {
    prompt: AtomicU64,
    completion: AtomicU64,
}

/// 会话累计 token 用量；克隆共享同一组计数（嵌套补全也计入）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage(Arc<UsageCounters>);

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 计入一次补全响应的用量
    pub fn record(&self, usage: &Usage) {
        self.0.prompt.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.0.completion.fetch_add(usage.completion_tokens, Ordering::Relaxed);
    }

    pub fn totals(&self) -> Usage {
        let prompt_tokens = self.0.prompt.load(Ordering::Relaxed);
        let completion_tokens = self.0.completion.load(Ordering::Relaxed);
        Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// OpenAI 兼容传输：持有 HTTP 客户端、端点与凭据
pub struct OpenAiTransport {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiTransport {
    /// 凭据由调用方（配置层）提供；timeout 为 None 时请求不设超时
    pub fn new(
        base_url: Option<&str>,
        api_key: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        if api_key.trim().is_empty() {
            return Err(TransportError::MissingCredential);
        }
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let base = base_url.unwrap_or(OPENAI_BASE_URL).trim_end_matches('/');
        Ok(Self {
            http: builder.build()?,
            endpoint: format!("{base}/chat/completions"),
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for OpenAiTransport {
    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ChatResponse, TransportError> {
        let request = ChatRequest::new(model, messages, tools);

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<ChatResponse>(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
