//! Social platform table.
//!
//! A closed set of supported platforms, each with a display name, an input
//! placeholder for the editing UI, and an optional base URL. Platforms
//! without a base URL (YouTube, Spotify, LinkedIn, Facebook) take a full
//! profile URL instead of a bare handle.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
    Youtube,
    Twitter,
    Spotify,
    Github,
    Linkedin,
    Twitch,
    Facebook,
    Email,
}

impl Platform {
    pub const ALL: [Platform; 10] = [
        Platform::Instagram,
        Platform::Tiktok,
        Platform::Youtube,
        Platform::Twitter,
        Platform::Spotify,
        Platform::Github,
        Platform::Linkedin,
        Platform::Twitch,
        Platform::Facebook,
        Platform::Email,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::Tiktok => "TikTok",
            Platform::Youtube => "YouTube",
            Platform::Twitter => "X / Twitter",
            Platform::Spotify => "Spotify",
            Platform::Github => "GitHub",
            Platform::Linkedin => "LinkedIn",
            Platform::Twitch => "Twitch",
            Platform::Facebook => "Facebook",
            Platform::Email => "Email",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Platform::Instagram | Platform::Tiktok | Platform::Twitter => "username",
            Platform::Github | Platform::Twitch => "username",
            Platform::Youtube => "channel URL or @handle",
            Platform::Spotify => "profile or playlist URL",
            Platform::Linkedin => "profile URL",
            Platform::Facebook => "profile URL",
            Platform::Email => "your@email.com",
        }
    }

    pub fn base_url(self) -> Option<&'static str> {
        match self {
            Platform::Instagram => Some("https://instagram.com/"),
            Platform::Tiktok => Some("https://tiktok.com/@"),
            Platform::Twitter => Some("https://x.com/"),
            Platform::Github => Some("https://github.com/"),
            Platform::Twitch => Some("https://twitch.tv/"),
            Platform::Email => Some("mailto:"),
            Platform::Youtube | Platform::Spotify | Platform::Linkedin | Platform::Facebook => None,
        }
    }

    /// Resolves a user-entered handle to a destination URL. Platforms with
    /// a base URL prepend it; the rest expect the handle to already be a
    /// full URL and pass it through unchanged.
    pub fn profile_url(self, handle: &str) -> String {
        match self.base_url() {
            Some(base) => format!("{base}{handle}"),
            None => handle.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_platforms_prepend_base_url() {
        assert_eq!(
            Platform::Instagram.profile_url("someone"),
            "https://instagram.com/someone"
        );
        assert_eq!(
            Platform::Tiktok.profile_url("someone"),
            "https://tiktok.com/@someone"
        );
        assert_eq!(Platform::Email.profile_url("a@b.com"), "mailto:a@b.com");
    }

    #[test]
    fn url_platforms_pass_through() {
        assert_eq!(
            Platform::Youtube.profile_url("https://youtube.com/@chan"),
            "https://youtube.com/@chan"
        );
        assert_eq!(
            Platform::Linkedin.profile_url("https://linkedin.com/in/me"),
            "https://linkedin.com/in/me"
        );
    }

    #[test]
    fn platform_keys_are_lowercase_ids() {
        for platform in Platform::ALL {
            let key = serde_json::to_value(platform).unwrap();
            let key = key.as_str().unwrap();
            assert_eq!(key, key.to_lowercase());
        }
    }
}
