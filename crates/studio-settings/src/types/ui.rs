//! Chat and navigation preferences.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SettingsError;

/// Interface language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// Simplified Chinese.
    Zh,
}

impl Language {
    /// All supported languages, in menu order.
    pub const ALL: [Language; 2] = [Language::En, Language::Zh];

    /// Language code.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = SettingsError;

    /// Accepts bare codes and regional variants (`zh-CN`, `en_US`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let primary = lower.split(['-', '_']).next().unwrap_or_default();
        match primary {
            "en" => Ok(Self::En),
            "zh" => Ok(Self::Zh),
            _ => Err(SettingsError::InvalidValue(format!("unsupported language: {s}"))),
        }
    }
}

/// How the chat transcript lays out messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    /// One bubble per reply.
    #[default]
    ByReply,
    /// One bubble per message.
    ByMessage,
}

/// UI settings container.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiSettings {
    /// Interface language.
    pub language: Language,
    /// Pick a decorative avatar per participant name.
    pub random_avatar: bool,
    /// Seed mixed into the avatar hash.
    pub avatar_seed: i32,
    /// Transcript layout.
    pub display_mode: DisplayMode,
    /// Render text blocks as markdown.
    pub render_markdown: bool,
    /// Directory scanned for avatar images. Empty disables random avatars.
    pub avatar_dir: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            language: Language::En,
            random_avatar: true,
            avatar_seed: 0,
            display_mode: DisplayMode::ByReply,
            render_markdown: true,
            avatar_dir: String::new(),
        }
    }
}
