use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

use crate::errors::AgoraError;

/// 界面主题，保存在 cookie 里
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// 读 cookie 时用：缺失或无法识别都回落到默认主题
    pub fn from_cookie(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for Theme {
    type Err = AgoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(AgoraError::validation(format!(
                "Unknown theme '{}', expected 'light' or 'dark'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" LIGHT ".parse::<Theme>().unwrap(), Theme::Light);
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
    }

    #[test]
    fn test_unknown_theme_rejected() {
        let err = "solarized".parse::<Theme>().unwrap_err();
        assert!(matches!(err, AgoraError::Validation(_)));
    }

    #[test]
    fn test_cookie_fallback() {
        assert_eq!(Theme::from_cookie(None), Theme::Light);
        assert_eq!(Theme::from_cookie(Some("purple")), Theme::Light);
        assert_eq!(Theme::from_cookie(Some("dark")), Theme::Dark);
    }

    #[test]
    fn test_display_roundtrips() {
        for theme in Theme::iter() {
            assert_eq!(theme.to_string().parse::<Theme>().unwrap(), theme);
        }
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
    }
}
