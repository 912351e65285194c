#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHateSpeech,
    HarmCategoryDangerousContent,
    HarmCategorySexuallyExplicit,
    HarmCategoryHarassment,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::HarmCategoryHateSpeech,
        HarmCategory::HarmCategoryDangerousContent,
        HarmCategory::HarmCategorySexuallyExplicit,
        HarmCategory::HarmCategoryHarassment,
    ];
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct SafetySetting {
    category: HarmCategory,
    threshold: HarmBlockThreshold,
}

impl SafetySetting {
    pub fn new(category: HarmCategory, threshold: HarmBlockThreshold) -> Self {
        Self {
            category,
            threshold,
        }
    }

    /// One setting per harm category, all at the same threshold.
    pub fn uniform(threshold: HarmBlockThreshold) -> Vec<Self> {
        HarmCategory::ALL
            .iter()
            .map(|category| Self::new(*category, threshold))
            .collect()
    }

    pub fn category(&self) -> HarmCategory {
        self.category
    }

    pub fn threshold(&self) -> HarmBlockThreshold {
        self.threshold
    }
}
