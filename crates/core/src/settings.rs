use flamecanvas_protocol::FontFamily;
use serde::{Deserialize, Serialize};

/// Preferences the user set elsewhere in the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub monospace: Monospace,
    /// Orientation used when the view state does not say.
    pub reverse_flame_by_default: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            monospace: Monospace::Default,
            reverse_flame_by_default: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Monospace {
    /// The application's bundled face.
    Default,
    /// The platform's `monospace`.
    System,
}

impl Monospace {
    pub fn font_family(self) -> FontFamily {
        match self {
            Self::Default => FontFamily::BundledMonospace,
            Self::System => FontFamily::SystemMonospace,
        }
    }
}

/// Layout configuration of the flame graph widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlamegraphConfig {
    /// Height of one stack level, in pixels.
    pub level_height: f64,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self { level_height: 20.0 }
    }
}

/// Both config files share one document so hosts load a single file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub user: UserSettings,
    pub flamegraph: FlamegraphConfig,
}

impl Settings {
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = Settings::from_json(br#"{"user": {"reverseFlameByDefault": true}}"#)
            .unwrap_or_default();
        assert!(settings.user.reverse_flame_by_default);
        assert_eq!(settings.user.monospace, Monospace::Default);
        assert!((settings.flamegraph.level_height - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn monospace_selects_font() {
        let settings: UserSettings =
            serde_json::from_str(r#"{"monospace": "system"}"#).unwrap_or_default();
        assert_eq!(settings.monospace.font_family(), FontFamily::SystemMonospace);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(Settings::from_json(br#"{"flamegraph": {"levelHeight": "tall"}}"#).is_err());
    }
}
