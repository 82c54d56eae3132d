use std::time::Duration;

use ankigen_core::error::AppError;
use url::Url;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    /// Create a client for an Ollama server. `base_url` must be a bare `http(s)://host[:port]`
    /// origin; a trailing slash is trimmed.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        validate_origin(&base_url).map_err(|reason| {
            AppError::new("AI_BASE_URL_INVALID", "Model base URL must be an http(s) origin")
                .with_details(format!("base_url={base_url}; reason={reason}"))
        })?;
        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url).timeout(Duration::from_millis(800)).call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::new("AI_OLLAMA_UNHEALTHY", "Ollama health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(ureq::Error::Status(code, _)) => Err(
                AppError::new("AI_OLLAMA_UNHEALTHY", "Ollama health check failed")
                    .with_details(format!("status={code}")),
            ),
            Err(e) => Err(AppError::new(
                "AI_OLLAMA_UNREACHABLE",
                "Failed to reach the Ollama server",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}

fn validate_origin(raw: &str) -> Result<(), &'static str> {
    let url = Url::parse(raw).map_err(|_| "not a valid absolute URL")?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err("scheme must be http or https");
    }
    if url.host().is_none() {
        return Err("missing host");
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err("user info is not allowed");
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err("path, query and fragment are not allowed");
    }
    // `Url` accepts an empty port ("host:") and port 0.
    if raw.ends_with(':') || url.port() == Some(0) {
        return Err("port must be 1-65535");
    }
    Ok(())
}
