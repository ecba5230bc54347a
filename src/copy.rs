//! Geração de copy para as lâminas de um carrossel.
//!
//! O [`CopyGenerator`] chama o serviço de geração de texto uma única vez,
//! valida e normaliza o JSON devolvido e, em qualquer falha (serviço
//! indisponível, timeout, JSON inválido, contagem errada), cai no gerador
//! determinístico [`fallback_copy`]. A geração nunca falha para fora.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::brief::CopyInput;
use crate::llm::{CompletionOptions, TextGenerator};

const SYSTEM_PROMPT: &str = "Você é copywriter especialista em carrosséis de redes sociais.\n\
Crie textos claros, curtos e persuasivos.\n\
Retorne APENAS JSON válido, sem markdown, sem code fences.";

const FALLBACK_LAST_HEADLINE: &str = "Comece agora!";
const FALLBACK_LAST_CTA: &str = "Siga para mais dicas";

/// Copy for one slide. `idx` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideCopy {
    pub idx: u32,
    pub headline: String,
    pub subheadline: String,
    pub bullets: Vec<String>,
    pub cta: String,
}

/// Exactly `slides_count` slides with `idx` = 1..N in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOutput {
    pub slides: Vec<SlideCopy>,
}

/// Why an upstream result was discarded.
#[derive(Debug, Error)]
enum Rejection {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response has no \"slides\" array")]
    MissingSlides,

    #[error("expected {expected} slides, got {got}")]
    WrongCount { expected: u32, got: usize },
}

/// Limits applied to the upstream call.
#[derive(Debug, Clone, Copy)]
pub struct CopySettings {
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// Produces slide copy from the text-generation service, or deterministically
/// when it is missing or misbehaves.
pub struct CopyGenerator<G> {
    client: Option<G>,
    settings: CopySettings,
}

impl<G: TextGenerator> CopyGenerator<G> {
    pub fn new(client: Option<G>, settings: CopySettings) -> Self {
        Self { client, settings }
    }

    pub fn is_ai_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Generate copy for `input`. Total: upstream failures degrade to
    /// [`fallback_copy`].
    pub async fn generate(&self, input: &CopyInput) -> CopyOutput {
        let Some(client) = &self.client else {
            info!("no text generation service configured, using fallback copy");
            return fallback_copy(input);
        };

        let options = CompletionOptions {
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            json_mode: true,
        };
        let user_prompt = build_user_prompt(input);

        debug!(slides = input.slides_count, "requesting copy from text generation service");
        let call = client.complete(SYSTEM_PROMPT, &user_prompt, &options);
        let text = match tokio::time::timeout(self.settings.timeout, call).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "text generation failed, using fallback copy");
                return fallback_copy(input);
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.settings.timeout.as_millis() as u64,
                    "text generation timed out, using fallback copy"
                );
                return fallback_copy(input);
            }
        };

        match parse_copy(&text, input.slides_count) {
            Ok(output) => {
                info!(slides = output.slides.len(), "generated copy with text generation service");
                output
            }
            Err(reason) => {
                warn!(%reason, "invalid copy response, using fallback copy");
                fallback_copy(input)
            }
        }
    }
}

fn build_user_prompt(input: &CopyInput) -> String {
    format!(
        "Gere um carrossel com {count} lâminas.\n\
         Nicho: {niche}\n\
         Tema: {theme}\n\
         Objetivo: {objective}\n\
         Tom: {tone}\n\
         CTA final: {cta}\n\
         \n\
         Regras:\n\
         - Lâmina 1: gancho forte que prende atenção\n\
         - Lâminas intermediárias: construção lógica de valor\n\
         - Última lâmina: CTA claro\n\
         - headline até 52 caracteres\n\
         - subheadline até 110 caracteres\n\
         - bullets: 0 a 3 por lâmina, até 40 chars cada\n\
         - Português do Brasil\n\
         \n\
         Retorne JSON neste formato exato:\n\
         {{\"slides\": [{{\"idx\": 1, \"headline\": \"\", \"subheadline\": \"\", \"bullets\": [], \"cta\": \"\"}}]}}",
        count = input.slides_count,
        niche = input.niche,
        theme = input.theme,
        objective = input.objective,
        tone = input.tone,
        cta = input.cta,
    )
}

/// Models sometimes wrap JSON in a markdown fence despite the instructions.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn text_field(slide: &Value, key: &str) -> String {
    slide
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

/// Validate and normalize an upstream response.
///
/// `idx` is reassigned 1..N in the order returned; an empty headline becomes
/// `"Slide {i}"`; missing subheadline/cta become empty; non-array bullets
/// become empty and non-string bullet entries are dropped.
fn parse_copy(text: &str, expected: u32) -> Result<CopyOutput, Rejection> {
    let root: Value = serde_json::from_str(strip_code_fence(text))?;
    let raw_slides = root
        .get("slides")
        .and_then(Value::as_array)
        .ok_or(Rejection::MissingSlides)?;

    if raw_slides.len() != expected as usize {
        return Err(Rejection::WrongCount {
            expected,
            got: raw_slides.len(),
        });
    }

    let slides = raw_slides
        .iter()
        .zip(1..)
        .map(|(raw, idx)| {
            let headline = text_field(raw, "headline");
            SlideCopy {
                idx,
                headline: if headline.is_empty() {
                    format!("Slide {idx}")
                } else {
                    headline
                },
                subheadline: text_field(raw, "subheadline"),
                bullets: raw
                    .get("bullets")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                cta: text_field(raw, "cta"),
            }
        })
        .collect();

    Ok(CopyOutput { slides })
}

/// Deterministic copy: a hook, numbered tips, and a closing CTA.
///
/// Pure function of `input`.
pub fn fallback_copy(input: &CopyInput) -> CopyOutput {
    let count = input.slides_count;
    let objective = input.objective.to_lowercase();
    let has_cta = !input.cta.is_empty();

    let slides = (1..=count)
        .map(|i| {
            if i == 1 {
                SlideCopy {
                    idx: i,
                    headline: input.theme.clone(),
                    subheadline: format!("Descubra como {objective} no nicho de {}", input.niche),
                    bullets: Vec::new(),
                    cta: String::new(),
                }
            } else if i == count {
                SlideCopy {
                    idx: i,
                    headline: if has_cta {
                        input.cta.clone()
                    } else {
                        FALLBACK_LAST_HEADLINE.to_string()
                    },
                    subheadline: format!("Transforme seu {} hoje", input.niche.to_lowercase()),
                    bullets: Vec::new(),
                    cta: if has_cta {
                        input.cta.clone()
                    } else {
                        FALLBACK_LAST_CTA.to_string()
                    },
                }
            } else {
                SlideCopy {
                    idx: i,
                    headline: format!("Dica {} sobre {}", i - 1, input.theme),
                    subheadline: format!("Estratégia prática para {objective}"),
                    bullets: vec![format!("Ponto importante {i}")],
                    cta: String::new(),
                }
            }
        })
        .collect();

    CopyOutput { slides }
}
