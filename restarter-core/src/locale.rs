//! Supported content languages.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Locale {
    #[default]
    #[serde(rename = "zh-TW")]
    ZhTw,
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en")]
    En,
    #[serde(rename = "ja")]
    Ja,
    #[serde(rename = "ko")]
    Ko,
    #[serde(rename = "vi")]
    Vi,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported locale tag: {0}")]
pub struct UnsupportedLocale(pub String);

impl Locale {
    pub const ALL: &'static [Self] = &[
        Self::ZhTw,
        Self::ZhCn,
        Self::En,
        Self::Ja,
        Self::Ko,
        Self::Vi,
    ];

    /// Canonical language tag, as stored in content data.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::ZhTw => "zh-TW",
            Self::ZhCn => "zh-CN",
            Self::En => "en",
            Self::Ja => "ja",
            Self::Ko => "ko",
            Self::Vi => "vi",
        }
    }

    /// Primary language subtag (`zh` for both Chinese variants).
    #[must_use]
    pub const fn language(self) -> &'static str {
        match self {
            Self::ZhTw | Self::ZhCn => "zh",
            Self::En => "en",
            Self::Ja => "ja",
            Self::Ko => "ko",
            Self::Vi => "vi",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "-").to_ascii_lowercase();
        match normalized.as_str() {
            "zh-tw" | "zh-hant" => Ok(Self::ZhTw),
            "zh-cn" | "zh-hans" | "zh" => Ok(Self::ZhCn),
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            "ja" | "ja-jp" => Ok(Self::Ja),
            "ko" | "ko-kr" => Ok(Self::Ko),
            "vi" | "vi-vn" => Ok(Self::Vi),
            _ => Err(UnsupportedLocale(s.to_string())),
        }
    }
}
