//! Reader preferences carried in cookies.
//!
//! Two single-string keys survive across visits: the color theme and the
//! post content language. Anything unparseable falls back to the default.

use axum::http::{HeaderMap, header::COOKIE};

use crate::domain::types::{Language, Theme};

pub const THEME_COOKIE: &str = "theme";
pub const LANGUAGE_COOKIE: &str = "post_language";

const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Preferences {
    pub theme: Theme,
    pub language: Language,
}

impl Preferences {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut prefs = Self::default();
        for header in headers.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else { continue };
            for (name, value) in parse_cookie_pairs(raw) {
                match name {
                    THEME_COOKIE => {
                        if let Some(theme) = Theme::parse(value) {
                            prefs.theme = theme;
                        }
                    }
                    LANGUAGE_COOKIE => {
                        if let Some(language) = Language::parse(value) {
                            prefs.language = language;
                        }
                    }
                    _ => {}
                }
            }
        }
        prefs
    }
}

fn parse_cookie_pairs(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        Some((name.trim(), value.trim()))
    })
}

/// `Set-Cookie` value for a preference key.
pub fn set_cookie_value(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(raw).expect("valid header"));
        headers
    }

    #[test]
    fn defaults_when_no_cookie_present() {
        let prefs = Preferences::from_headers(&HeaderMap::new());
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.language, Language::En);
    }

    #[test]
    fn parses_both_preference_keys() {
        let headers = headers_with_cookie("theme=dark; post_language=bn; other=1");
        let prefs = Preferences::from_headers(&headers);
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.language, Language::Bn);
    }

    #[test]
    fn unknown_values_fall_back_to_defaults() {
        let headers = headers_with_cookie("theme=neon; post_language=xx");
        let prefs = Preferences::from_headers(&headers);
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.language, Language::En);
    }

    #[test]
    fn set_cookie_value_scopes_to_site_root() {
        let value = set_cookie_value(THEME_COOKIE, "dark");
        assert!(value.starts_with("theme=dark; Path=/"));
        assert!(value.contains("SameSite=Lax"));
    }
}
