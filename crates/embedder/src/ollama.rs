use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, LlmProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for an Ollama-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL, e.g. `http://localhost:11434`.
    pub host: String,

    /// Embedding model name.
    pub embedding_model: String,

    /// Text-generation model name.
    pub llm_model: String,

    /// Total request timeout in seconds.
    pub timeout_secs: u64,

    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            llm_model: "llama3.2:3b".to_string(),
            timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

/// HTTP client for Ollama's embedding and generation endpoints.
///
/// Failure classification drives the engine's retry policy: 429 and 5xx
/// map to transient overload, other 4xx fail fast, connection problems and
/// timeouts are retryable network errors.
pub struct OllamaProvider {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|err| EmbedError::Other(format!("failed to build HTTP client: {err}")))?;

        log::info!(
            "Ollama provider at {} (embedding: {}, llm: {})",
            config.host,
            config.embedding_model,
            config.llm_model
        );

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.host.trim_end_matches('/'))
    }

    async fn classify_failure(response: reqwest::Response) -> EmbedError {
        let status = response.status();
        let code = status.as_u16();
        if code == 429 || status.is_server_error() {
            return EmbedError::Overloaded { status: code };
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        EmbedError::Client {
            status: code,
            message,
        }
    }
}

fn map_transport_error(err: &reqwest::Error) -> EmbedError {
    if err.is_timeout() {
        EmbedError::Timeout(err.to_string())
    } else {
        EmbedError::Network(err.to_string())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_id(&self) -> &str {
        &self.config.embedding_model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            prompt: text,
        };

        let response = self
            .client
            .post(self.endpoint("/api/embeddings"))
            .json(&request)
            .send()
            .await
            .map_err(|err| map_transport_error(&err))?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| EmbedError::InvalidResponse(err.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(EmbedError::InvalidResponse(
                "provider returned an empty embedding".to_string(),
            ));
        }

        Ok(parsed.embedding)
    }

    async fn health(&self) -> bool {
        let outcome = self
            .client
            .get(self.endpoint("/api/tags"))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match outcome {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                log::warn!("Ollama health check failed: {err}");
                false
            }
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn model_id(&self) -> &str {
        &self.config.llm_model
    }

    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.llm_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature,
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint("/api/generate"))
            .json(&request)
            .send()
            .await
            .map_err(|err| map_transport_error(&err))?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| EmbedError::InvalidResponse(err.to_string()))?;

        Ok(parsed.response)
    }

    async fn health(&self) -> bool {
        EmbeddingProvider::health(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Minimal HTTP server answering one connection per canned response.
    async fn spawn_mock_server(responses: Vec<&'static str>) -> u16 {
        use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            for resp in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let (reader, mut writer) = stream.split();
                    let mut buf_reader = BufReader::new(reader);
                    let mut content_length = 0usize;
                    let mut line = String::new();
                    loop {
                        line.clear();
                        if buf_reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                            break;
                        }
                        let lowered = line.to_ascii_lowercase();
                        if let Some(rest) = lowered.strip_prefix("content-length:") {
                            content_length = rest.trim().parse().unwrap_or(0);
                        }
                        if line == "\r\n" || line == "\n" {
                            break;
                        }
                    }
                    let mut body = vec![0u8; content_length];
                    let _ = buf_reader.read_exact(&mut body).await;
                    writer.write_all(resp.as_bytes()).await.ok();
                });
            }
        });

        port
    }

    fn provider_for(port: u16) -> OllamaProvider {
        OllamaProvider::new(OllamaConfig {
            host: format!("http://127.0.0.1:{port}"),
            timeout_secs: 5,
            connect_timeout_secs: 2,
            ..OllamaConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn embed_parses_successful_response() {
        let body = r#"{"embedding":[0.1,0.2,0.3]}"#;
        let response: &'static str = Box::leak(
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .into_boxed_str(),
        );
        let port = spawn_mock_server(vec![response]).await;

        let vector = provider_for(port).embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn server_error_maps_to_overloaded() {
        let response =
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        let port = spawn_mock_server(vec![response]).await;

        let err = provider_for(port).embed("hello").await.unwrap_err();
        assert!(matches!(err, EmbedError::Overloaded { status: 500 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn client_error_maps_to_client() {
        let body = r#"{"error":"model not found"}"#;
        let response: &'static str = Box::leak(
            format!(
                "HTTP/1.1 404 Not Found\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .into_boxed_str(),
        );
        let port = spawn_mock_server(vec![response]).await;

        let err = provider_for(port).embed("hello").await.unwrap_err();
        match err {
            EmbedError::Client { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("model not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn connection_refused_maps_to_network() {
        // Bind then drop a listener to find a dead port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = provider_for(port).embed("hello").await.unwrap_err();
        assert!(matches!(
            err,
            EmbedError::Network(_) | EmbedError::Timeout(_)
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn generate_parses_response_field() {
        let body = r#"{"response":"- Depends on IUserService"}"#;
        let response: &'static str = Box::leak(
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .into_boxed_str(),
        );
        let port = spawn_mock_server(vec![response]).await;

        let text = provider_for(port)
            .generate("Analyze this class", 256, 0.7)
            .await
            .unwrap();
        assert_eq!(text, "- Depends on IUserService");
    }

    #[tokio::test]
    async fn health_reflects_endpoint_status() {
        let response = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}";
        let port = spawn_mock_server(vec![response]).await;
        assert!(EmbeddingProvider::health(&provider_for(port)).await);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(!EmbeddingProvider::health(&provider_for(dead_port)).await);
    }
}
