//! Magazine style presets.

use crate::error::{MagEditError, Result};
use serde::Serialize;

/// A named magazine look and the prompt that produces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StylePreset {
    /// Display name, stored on gallery entries.
    pub name: String,
    /// Lowercase identifier used on the command line.
    pub slug: String,
    /// Prompt sent to the generation service.
    pub prompt: String,
}

impl StylePreset {
    /// Creates a preset outside the built-in catalog.
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Self {
            name,
            slug,
            prompt: prompt.into(),
        }
    }

    /// The built-in catalog, in display order.
    pub fn all() -> Vec<StylePreset> {
        CATALOG
            .iter()
            .map(|(name, prompt)| StylePreset::new(*name, *prompt))
            .collect()
    }

    /// Finds a built-in preset by name or slug, ignoring case.
    pub fn find(query: &str) -> Result<StylePreset> {
        let wanted = slugify(query);
        Self::all()
            .into_iter()
            .find(|p| p.slug == wanted)
            .ok_or_else(|| MagEditError::InvalidRequest(format!("unknown preset: {query}")))
    }
}

impl Default for StylePreset {
    fn default() -> Self {
        let (name, prompt) = CATALOG[0];
        StylePreset::new(name, prompt)
    }
}

fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

const CATALOG: &[(&str, &str)] = &[
    (
        "Cosmopolitan",
        "Turn this photo into a Cosmopolitan magazine cover: bold pink masthead, \
         bright high-key lighting, glossy skin, punchy cover lines around the subject",
    ),
    (
        "GQ",
        "Turn this photo into a GQ magazine cover: sharp tailored styling, \
         cool contrasty grade, confident pose, clean white masthead",
    ),
    (
        "Vogue",
        "Turn this photo into a Vogue magazine cover: elegant serif masthead, \
         editorial high-fashion lighting, refined muted palette, minimal cover lines",
    ),
    (
        "Elle",
        "Turn this photo into an Elle magazine cover: fresh saturated colour, \
         soft beauty lighting, playful cover lines, large bold masthead",
    ),
    (
        "Runaway Matte",
        "Restyle this photo as a runway editorial with a matte film finish: \
         lifted blacks, desaturated tones, soft grain, catwalk backdrop",
    ),
    (
        "Harper Luxe",
        "Turn this photo into a Harper's Bazaar style luxury cover: dramatic \
         chiaroscuro lighting, rich jewel tones, thin didone masthead",
    ),
    (
        "W",
        "Turn this photo into a W magazine cover: oversized single-letter masthead, \
         experimental art-directed framing, high-contrast studio light",
    ),
    (
        "Glamour",
        "Turn this photo into a Glamour magazine cover: warm golden lighting, \
         polished red-carpet styling, vivid red masthead",
    ),
    (
        "Vanity Fair",
        "Turn this photo into a Vanity Fair cover portrait: cinematic lighting, \
         classic Hollywood glamour, deep rich shadows, timeless serif masthead",
    ),
    (
        "InStyle",
        "Turn this photo into an InStyle magazine cover: bright airy daylight, \
         candid smile, pastel accents, modern sans-serif masthead",
    ),
];
