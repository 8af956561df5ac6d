//! HTTP completion backends and their environment configuration.
//!
//! Backend selection:
//! - `LEXSHAPE_LLM_BACKEND` = `openai` (default) | `anthropic` | `ollama`
//! - OpenAI: `OPENAI_API_KEY` (required), `OPENAI_BASE_URL`, `OPENAI_MODEL`
//! - Anthropic: `ANTHROPIC_API_KEY` (required), `ANTHROPIC_BASE_URL`,
//!   `ANTHROPIC_MODEL`, `ANTHROPIC_VERSION`
//! - Ollama: `OLLAMA_HOST`, `OLLAMA_MODEL`
//!
//! `LEXSHAPE_LLM_TIMEOUT_SECS` sets a request timeout; unset or `0` keeps the
//! transport default.

use crate::completion::CompletionService;
use crate::LlmError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const LEXSHAPE_LLM_BACKEND_ENV: &str = "LEXSHAPE_LLM_BACKEND";
pub const LEXSHAPE_LLM_TIMEOUT_SECS_ENV: &str = "LEXSHAPE_LLM_TIMEOUT_SECS";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const OPENAI_MODEL_ENV: &str = "OPENAI_MODEL";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_BASE_URL_ENV: &str = "ANTHROPIC_BASE_URL";
pub const ANTHROPIC_MODEL_ENV: &str = "ANTHROPIC_MODEL";
pub const ANTHROPIC_VERSION_ENV: &str = "ANTHROPIC_VERSION";
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";
pub const OLLAMA_MODEL_ENV: &str = "OLLAMA_MODEL";

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
/// Generated shapes run long; the providers' small defaults truncate them.
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Secret that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAi {
        base_url: String,
        api_key: ApiKey,
        model: String,
    },
    Anthropic {
        base_url: String,
        api_key: ApiKey,
        model: String,
        version: String,
    },
    Ollama {
        host: String,
        model: String,
    },
}

impl LlmBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi { .. } => "openai",
            Self::Anthropic { .. } => "anthropic",
            Self::Ollama { .. } => "ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi { model, .. } | Self::Anthropic { model, .. } | Self::Ollama { model, .. } => {
                model
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    /// `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration through `lookup` (an environment stand-in).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());
        let required_key = |name: &str, backend: &str| {
            get(name).map(ApiKey::new).ok_or_else(|| {
                LlmError::Config(format!(
                    "{backend} backend requires {name} (set it in your env; do not hardcode secrets in scripts)"
                ))
            })
        };

        let backend_name = get(LEXSHAPE_LLM_BACKEND_ENV)
            .unwrap_or_else(|| "openai".to_string())
            .to_ascii_lowercase();
        let backend = match backend_name.as_str() {
            "openai" => LlmBackend::OpenAi {
                base_url: normalize_http_base_url(
                    &or_default(OPENAI_BASE_URL_ENV, DEFAULT_OPENAI_BASE_URL),
                    DEFAULT_OPENAI_BASE_URL,
                ),
                api_key: required_key(OPENAI_API_KEY_ENV, "OpenAI")?,
                model: or_default(OPENAI_MODEL_ENV, DEFAULT_OPENAI_MODEL),
            },
            "anthropic" => LlmBackend::Anthropic {
                base_url: normalize_http_base_url(
                    &or_default(ANTHROPIC_BASE_URL_ENV, DEFAULT_ANTHROPIC_BASE_URL),
                    DEFAULT_ANTHROPIC_BASE_URL,
                ),
                api_key: required_key(ANTHROPIC_API_KEY_ENV, "Anthropic")?,
                model: or_default(ANTHROPIC_MODEL_ENV, DEFAULT_ANTHROPIC_MODEL),
                version: or_default(ANTHROPIC_VERSION_ENV, DEFAULT_ANTHROPIC_VERSION),
            },
            "ollama" => LlmBackend::Ollama {
                host: normalize_ollama_host(&or_default(OLLAMA_HOST_ENV, DEFAULT_OLLAMA_HOST)),
                model: or_default(OLLAMA_MODEL_ENV, DEFAULT_OLLAMA_MODEL),
            },
            other => {
                return Err(LlmError::Config(format!(
                    "unknown {LEXSHAPE_LLM_BACKEND_ENV}={other:?} (expected openai, anthropic or ollama)"
                )))
            }
        };

        Ok(Self {
            backend,
            timeout: parse_timeout(get(LEXSHAPE_LLM_TIMEOUT_SECS_ENV))?,
        })
    }
}

/// `0` or absent disables the timeout.
fn parse_timeout(raw: Option<String>) -> Result<Option<Duration>, LlmError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let secs = raw.parse::<u64>().map_err(|_| {
        LlmError::Config(format!(
            "invalid {LEXSHAPE_LLM_TIMEOUT_SECS_ENV}={raw:?} (expected integer seconds; 0 disables)"
        ))
    })?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

fn normalize_http_base_url(base_url: &str, default: &str) -> String {
    let mut host = base_url.trim().to_string();
    if host.is_empty() {
        host = default.to_string();
    }
    if !host.starts_with("http://") && !host.starts_with("https://") {
        host = format!("https://{host}");
    }
    host.trim_end_matches('/').to_string()
}

fn normalize_ollama_host(host: &str) -> String {
    let mut host = host.trim().to_string();
    if host.is_empty() {
        host = DEFAULT_OLLAMA_HOST.to_string();
    }
    if !host.starts_with("http://") && !host.starts_with("https://") {
        host = format!("http://{host}");
    }
    host.trim_end_matches('/').to_string()
}

/// Build the completion service described by `config`.
pub fn connect(config: &LlmConfig) -> Result<Arc<dyn CompletionService>, LlmError> {
    tracing::debug!(
        backend = config.backend.name(),
        model = config.backend.model(),
        timeout_secs = config.timeout.map(|t| t.as_secs()),
        "connecting completion backend"
    );
    match &config.backend {
        #[cfg(feature = "llm-openai")]
        LlmBackend::OpenAi {
            base_url,
            api_key,
            model,
        } => Ok(Arc::new(OpenAiCompletion {
            client: http_client(config.timeout)?,
            base_url: base_url.clone(),
            api_key: api_key.clone(),
            model: model.clone(),
        })),
        #[cfg(feature = "llm-anthropic")]
        LlmBackend::Anthropic {
            base_url,
            api_key,
            model,
            version,
        } => Ok(Arc::new(AnthropicCompletion {
            client: http_client(config.timeout)?,
            base_url: base_url.clone(),
            api_key: api_key.clone(),
            model: model.clone(),
            version: version.clone(),
        })),
        #[cfg(feature = "llm-ollama")]
        LlmBackend::Ollama { host, model } => Ok(Arc::new(OllamaCompletion {
            client: http_client(config.timeout)?,
            host: host.clone(),
            model: model.clone(),
        })),
        #[allow(unreachable_patterns)]
        other => Err(LlmError::Config(format!(
            "the {} backend is not compiled in (enable the llm-{} feature)",
            other.name(),
            other.name()
        ))),
    }
}

#[cfg(any(feature = "llm-openai", feature = "llm-anthropic", feature = "llm-ollama"))]
fn http_client(timeout: Option<Duration>) -> Result<reqwest::blocking::Client, LlmError> {
    let mut builder = reqwest::blocking::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| LlmError::Config(format!("failed to build http client: {e}")))
}

#[cfg(any(feature = "llm-openai", feature = "llm-anthropic", feature = "llm-ollama"))]
fn send_json(
    backend: &'static str,
    url: &str,
    request: reqwest::blocking::RequestBuilder,
) -> Result<serde_json::Value, LlmError> {
    let resp = request.send().map_err(|e| LlmError::Network {
        backend,
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(LlmError::Api {
            backend,
            status: status.as_u16(),
            body,
        });
    }
    resp.json().map_err(|e| LlmError::InvalidResponse {
        backend,
        message: format!("invalid JSON: {e}"),
    })
}

#[cfg(any(feature = "llm-openai", feature = "llm-anthropic", feature = "llm-ollama"))]
fn non_empty(out: String) -> Option<String> {
    let trimmed = out.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// =============================================================================
// OpenAI (Responses API)
// =============================================================================

#[cfg(feature = "llm-openai")]
pub struct OpenAiCompletion {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: ApiKey,
    model: String,
}

#[cfg(feature = "llm-openai")]
impl CompletionService for OpenAiCompletion {
    fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String, LlmError> {
        let url = format!("{}/v1/responses", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "instructions": system,
            "input": user,
            "temperature": temperature,
            "max_output_tokens": MAX_OUTPUT_TOKENS,
        });
        let request = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&body);
        let v = send_json("openai", &url, request)?;
        openai_output_text(&v).ok_or_else(|| LlmError::InvalidResponse {
            backend: "openai",
            message: "no output_text in response (unexpected response shape)".to_string(),
        })
    }

    fn describe(&self) -> String {
        format!("openai ({})", self.model)
    }
}

/// Concatenated `output_text` parts of every `message` output item.
#[cfg(feature = "llm-openai")]
fn openai_output_text(v: &serde_json::Value) -> Option<String> {
    if let Some(text) = v.get("output_text").and_then(|x| x.as_str()) {
        return non_empty(text.to_string());
    }
    let mut out = String::new();
    for item in v.get("output")?.as_array()? {
        if item.get("type").and_then(|x| x.as_str()) != Some("message") {
            continue;
        }
        let Some(content) = item.get("content").and_then(|x| x.as_array()) else {
            continue;
        };
        for part in content {
            if part.get("type").and_then(|x| x.as_str()) != Some("output_text") {
                continue;
            }
            if let Some(t) = part.get("text").and_then(|x| x.as_str()) {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(t);
            }
        }
    }
    non_empty(out)
}

// =============================================================================
// Anthropic (Messages API)
// =============================================================================

#[cfg(feature = "llm-anthropic")]
pub struct AnthropicCompletion {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: ApiKey,
    model: String,
    version: String,
}

#[cfg(feature = "llm-anthropic")]
impl CompletionService for AnthropicCompletion {
    fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "temperature": temperature,
            "system": system,
            "messages": [
                { "role": "user", "content": user }
            ]
        });
        let request = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", &self.version)
            .json(&body);
        let v = send_json("anthropic", &url, request)?;
        anthropic_output_text(&v).ok_or_else(|| LlmError::InvalidResponse {
            backend: "anthropic",
            message: "no text blocks in response (unexpected response shape)".to_string(),
        })
    }

    fn describe(&self) -> String {
        format!("anthropic ({})", self.model)
    }
}

#[cfg(feature = "llm-anthropic")]
fn anthropic_output_text(v: &serde_json::Value) -> Option<String> {
    let mut out = String::new();
    for block in v.get("content")?.as_array()? {
        if block.get("type").and_then(|x| x.as_str()) != Some("text") {
            continue;
        }
        if let Some(t) = block.get("text").and_then(|x| x.as_str()) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(t);
        }
    }
    non_empty(out)
}

// =============================================================================
// Ollama (chat API)
// =============================================================================

#[cfg(feature = "llm-ollama")]
pub struct OllamaCompletion {
    client: reqwest::blocking::Client,
    host: String,
    model: String,
}

#[cfg(feature = "llm-ollama")]
impl CompletionService for OllamaCompletion {
    fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.host);
        let body = serde_json::json!({
            "model": self.model,
            "stream": false,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "options": { "temperature": temperature }
        });
        let request = self.client.post(&url).json(&body);
        let v = send_json("ollama", &url, request).map_err(|err| match err {
            LlmError::Network { backend, url, message } => LlmError::Network {
                backend,
                url,
                message: format!("{message} (is it running? try `ollama serve` or set {OLLAMA_HOST_ENV})"),
            },
            other => other,
        })?;
        ollama_output_text(&v).ok_or_else(|| LlmError::InvalidResponse {
            backend: "ollama",
            message: "missing message.content in response".to_string(),
        })
    }

    fn describe(&self) -> String {
        format!("ollama ({})", self.model)
    }
}

#[cfg(feature = "llm-ollama")]
fn ollama_output_text(v: &serde_json::Value) -> Option<String> {
    let content = v.get("message")?.get("content")?.as_str()?;
    non_empty(content.to_string())
}
