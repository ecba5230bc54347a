//! Tipos de erro para o cliente de geração de texto.
//!
//! Nenhuma destas falhas chega ao chamador externo: o
//! [`CopyGenerator`](crate::copy::CopyGenerator) as registra e cai no
//! gerador determinístico.

use thiserror::Error;

/// Erros que podem ocorrer ao chamar o serviço de geração de texto.
#[derive(Debug, Error)]
pub enum LlmError {
    /// O servidor retornou HTTP 429 (rate limit ou cota esgotada).
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Erro retornado pela API (ex.: 401 chave inválida, 500 erro interno).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// A resposta não trouxe nenhuma escolha com conteúdo.
    #[error("empty response from text generation service")]
    EmptyResponse,

    /// Falha de rede subjacente (DNS, conexão recusada, timeout do reqwest).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}
