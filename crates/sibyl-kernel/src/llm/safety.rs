//! Safety policy tables.
//!
//! One table per provider, fixed for the life of the process. Filters are
//! permissive by default: responses are only refused when the provider itself
//! reports a block.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::config::Provider;

/// Content-harm category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHateSpeech,
    HarmCategoryDangerousContent,
    HarmCategorySexuallyExplicit,
    HarmCategoryHarassment,
}

/// Block threshold applied to a category.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum HarmBlockThreshold {
    #[default]
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

/// One `(category, threshold)` entry, serialized as a provider
/// `safetySettings` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Ordered set of safety settings for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyPolicy {
    settings: Vec<SafetySetting>,
}

const VERTEX_CATEGORIES: [HarmCategory; 4] = [
    HarmCategory::HarmCategoryHateSpeech,
    HarmCategory::HarmCategoryDangerousContent,
    HarmCategory::HarmCategorySexuallyExplicit,
    HarmCategory::HarmCategoryHarassment,
];

const GEMINI_CATEGORIES: [HarmCategory; 4] = [
    HarmCategory::HarmCategoryHarassment,
    HarmCategory::HarmCategoryHateSpeech,
    HarmCategory::HarmCategorySexuallyExplicit,
    HarmCategory::HarmCategoryDangerousContent,
];

impl SafetyPolicy {
    /// The table for `provider`, every category at `threshold`.
    pub fn for_provider(provider: Provider, threshold: HarmBlockThreshold) -> Self {
        let categories = match provider {
            Provider::Vertex => &VERTEX_CATEGORIES,
            Provider::Gemini => &GEMINI_CATEGORIES,
        };
        Self {
            settings: categories
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold,
                })
                .collect(),
        }
    }

    pub fn settings(&self) -> &[SafetySetting] {
        &self.settings
    }
}
