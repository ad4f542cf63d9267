//! Application settings.
//!
//! The engine treats settings as an opaque typed record with a get/set
//! contract; only the presentation layer interprets most of them.

use serde::{Deserialize, Serialize};

/// Color theme preference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    Auto,
}

/// Recognized configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Color theme
    pub theme: Theme,
    /// UI locale tag, e.g. `en-US`
    pub language: String,
    /// Whether voice input is enabled
    pub voice_input: bool,
    /// Whether conversations are saved automatically
    pub auto_save: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            language: "en-US".to_string(),
            voice_input: false,
            auto_save: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.language, "en-US");
        assert!(!settings.voice_input);
        assert!(settings.auto_save);
    }

    #[test]
    fn test_serde_round_trip_uses_camel_case() {
        let settings = AppSettings {
            theme: Theme::Dark,
            language: "zh-CN".to_string(),
            voice_input: true,
            auto_save: false,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"voiceInput\":true"));
        assert!(json.contains("\"theme\":\"dark\""));
        let back: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.theme, Theme::Dark);
        assert!(!back.auto_save);
    }
}
