use serde::{Deserialize, Serialize};

/// Off-chain token metadata uploaded before the creation transaction is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    /// Local file path or remote URL of the token image.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default = "default_show_name")]
    pub show_name: bool,
    /// Already-uploaded metadata URI. When set, the upload step is skipped.
    #[serde(default)]
    pub metadata_uri: Option<String>,
}

fn default_show_name() -> bool {
    true
}

impl TokenMetadata {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, description: impl Into<String>) -> Self {
        TokenMetadata {
            name: name.into(),
            symbol: symbol.into(),
            description: description.into(),
            image: None,
            twitter: None,
            telegram: None,
            website: None,
            show_name: true,
            metadata_uri: None,
        }
    }

    /// Social links that are present and non-empty, as (form field, value) pairs.
    pub fn social_links(&self) -> Vec<(&'static str, &str)> {
        [
            ("twitter", self.twitter.as_deref()),
            ("telegram", self.telegram.as_deref()),
            ("website", self.website.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| match value {
            Some(v) if !v.trim().is_empty() => Some((field, v)),
            _ => None,
        })
        .collect()
    }
}
