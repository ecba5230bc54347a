//! Briefing de um carrossel: entrada do gerador de copy e resolução de overrides.
//!
//! A precedência de cada campo é fixa: override da requisição, depois o valor
//! gravado no carrossel, depois um default nomeado.

use serde::{Deserialize, Serialize};

use crate::error::CarouselError;
use crate::model::Carousel;

pub const MIN_SLIDES: u32 = 1;
pub const MAX_SLIDES: u32 = 10;

pub const DEFAULT_NICHE: &str = "Geral";
pub const DEFAULT_THEME: &str = "Carrossel";
pub const DEFAULT_OBJECTIVE: &str = "Engajamento";
pub const DEFAULT_TONE: &str = "Profissional";
pub const DEFAULT_CTA: &str = "Siga para mais dicas";
pub const DEFAULT_SLIDES_COUNT: u32 = 5;

/// Input to the copy generator. Every text field is required and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyInput {
    pub slides_count: u32,
    pub niche: String,
    pub theme: String,
    pub objective: String,
    pub tone: String,
    pub cta: String,
}

impl CopyInput {
    pub fn validate(&self) -> Result<(), CarouselError> {
        if !(MIN_SLIDES..=MAX_SLIDES).contains(&self.slides_count) {
            return Err(CarouselError::Validation(format!(
                "slidesCount must be {MIN_SLIDES}–{MAX_SLIDES}, got {}",
                self.slides_count
            )));
        }

        let fields = [
            ("niche", &self.niche),
            ("theme", &self.theme),
            ("objective", &self.objective),
            ("tone", &self.tone),
            ("cta", &self.cta),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(CarouselError::Validation(format!("{name} is required")));
            }
        }

        Ok(())
    }
}

/// Optional per-request replacements for the stored brief.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefOverrides {
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub cta: Option<String>,
}

/// First candidate that is present and not blank.
fn first_filled<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

fn pick(override_value: &Option<String>, stored: &Option<String>, default: &str) -> String {
    first_filled([override_value.as_deref(), stored.as_deref()])
        .unwrap_or(default)
        .to_string()
}

/// Resolve the effective brief for a copy request.
///
/// | field | precedence |
/// |---|---|
/// | niche | override, stored, `"Geral"` |
/// | theme | override, stored, title, `"Carrossel"` |
/// | objective | override, stored, `"Engajamento"` |
/// | tone | override, stored, `"Profissional"` |
/// | cta | override, stored `cta_final`, `"Siga para mais dicas"` |
/// | slides | existing slide count, stored `slides_count`, `5` |
pub fn resolve_brief(
    overrides: &BriefOverrides,
    carousel: &Carousel,
    existing_slides: usize,
) -> CopyInput {
    let theme = first_filled([
        overrides.theme.as_deref(),
        carousel.theme.as_deref(),
        Some(carousel.title.as_str()),
    ])
    .unwrap_or(DEFAULT_THEME)
    .to_string();

    let slides_count = if existing_slides > 0 {
        u32::try_from(existing_slides).unwrap_or(MAX_SLIDES)
    } else if carousel.slides_count > 0 {
        carousel.slides_count
    } else {
        DEFAULT_SLIDES_COUNT
    };

    CopyInput {
        slides_count: slides_count.clamp(MIN_SLIDES, MAX_SLIDES),
        niche: pick(&overrides.niche, &carousel.niche, DEFAULT_NICHE),
        theme,
        objective: pick(&overrides.objective, &carousel.objective, DEFAULT_OBJECTIVE),
        tone: pick(&overrides.tone, &carousel.tone, DEFAULT_TONE),
        cta: pick(&overrides.cta, &carousel.cta_final, DEFAULT_CTA),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::CarouselStatus;
    use uuid::Uuid;

    fn input() -> CopyInput {
        CopyInput {
            slides_count: 3,
            niche: "Fitness".into(),
            theme: "3 Mistakes".into(),
            objective: "Engagement".into(),
            tone: "Casual".into(),
            cta: "Follow for more".into(),
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn slides_count_out_of_range_rejected() {
        for count in [0, 11] {
            let err = CopyInput {
                slides_count: count,
                ..input()
            }
            .validate()
            .unwrap_err();
            assert!(err.to_string().contains("slidesCount"));
        }
    }

    #[test]
    fn blank_field_rejected_by_name() {
        let err = CopyInput {
            tone: "   ".into(),
            ..input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "validation failed: tone is required");
    }

    #[test]
    fn copy_input_uses_camel_case_on_the_wire() {
        let json = r#"{"slidesCount":4,"niche":"a","theme":"b","objective":"c","tone":"d","cta":"e"}"#;
        let parsed: CopyInput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.slides_count, 4);
    }

    #[test]
    fn empty_carousel_resolves_to_named_defaults() {
        let carousel = Carousel::new(Uuid::new_v4(), "", CarouselStatus::Draft);
        let brief = resolve_brief(&BriefOverrides::default(), &carousel, 0);
        assert_eq!(brief.niche, DEFAULT_NICHE);
        assert_eq!(brief.theme, DEFAULT_THEME);
        assert_eq!(brief.objective, DEFAULT_OBJECTIVE);
        assert_eq!(brief.tone, DEFAULT_TONE);
        assert_eq!(brief.cta, DEFAULT_CTA);
        assert_eq!(brief.slides_count, DEFAULT_SLIDES_COUNT);
        assert!(brief.validate().is_ok());
    }

    #[test]
    fn override_beats_stored_beats_default() {
        let mut carousel = Carousel::new(Uuid::new_v4(), "Título", CarouselStatus::Draft);
        carousel.niche = Some("Finanças".into());
        carousel.tone = Some("Sério".into());
        carousel.slides_count = 7;

        let overrides = BriefOverrides {
            tone: Some("Descontraído".into()),
            niche: Some("  ".into()),
            ..Default::default()
        };
        let brief = resolve_brief(&overrides, &carousel, 0);

        assert_eq!(brief.tone, "Descontraído");
        assert_eq!(brief.niche, "Finanças");
        assert_eq!(brief.theme, "Título");
        assert_eq!(brief.slides_count, 7);
    }

    #[test]
    fn existing_slides_decide_count() {
        let mut carousel = Carousel::new(Uuid::new_v4(), "x", CarouselStatus::Draft);
        carousel.slides_count = 9;
        let brief = resolve_brief(&BriefOverrides::default(), &carousel, 4);
        assert_eq!(brief.slides_count, 4);
    }
}
