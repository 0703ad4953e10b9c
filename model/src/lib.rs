//! Shared domain types for the link page service.
//!
//! Both the server and the editing client speak in these shapes, so wire
//! payloads and in-memory mirrors cannot drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod platforms;

pub use platforms::Platform;

/// Header installed by the identity layer in front of the API. The server
/// trusts its value as the authenticated owner id.
pub const OWNER_HEADER: &str = "x-owner-id";

/// One entry in a user's curated outbound-link collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub url: String,
    #[serde(flatten)]
    pub kind: LinkKind,
    #[serde(default)]
    pub image_url: Option<String>,
    pub order: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LinkKind {
    Regular,
    Social { platform: Platform },
}

impl Default for LinkKind {
    fn default() -> Self {
        LinkKind::Regular
    }
}

/// Sorts for display: ascending `order`, ties broken by id so two links
/// sharing an order value always render in the same sequence.
pub fn sort_links(links: &mut [Link]) {
    links.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
}

/// Body of `POST /api/links`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLink {
    pub title: String,
    pub url: String,
    #[serde(flatten)]
    pub kind: Option<LinkKind>,
}

/// Body of `PATCH /api/links/{id}`. Absent fields are left untouched.
///
/// `image_url` distinguishes absent from explicit `null`: absent means no
/// change, `null` clears the stored image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<Option<String>>,
}

impl LinkPatch {
    pub fn apply(&self, link: &mut Link) {
        if let Some(title) = &self.title {
            link.title = title.clone();
        }
        if let Some(url) = &self.url {
            link.url = url.clone();
        }
        if let Some(order) = self.order {
            link.order = order;
        }
        if let Some(active) = self.active {
            link.active = active;
        }
        if let Some(image_url) = &self.image_url {
            link.image_url = image_url.clone();
        }
    }
}

/// Body of `POST /api/links/reorder`: the full id set of the owner's
/// collection in its new display sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub link_ids: Vec<String>,
}

/// An account that owns a link collection and a vanity path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bg_color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub accent_color: Option<String>,
    #[serde(default)]
    pub background_url: Option<String>,
    #[serde(default)]
    pub cursor_url: Option<String>,
    #[serde(default)]
    pub profile_views: u64,
}

/// Partial update of a user's profile fields. Same absent-vs-null rule as
/// [`LinkPatch::image_url`] for every clearable field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<Option<String>>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub bio: Option<Option<String>>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub bg_color: Option<Option<String>>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub text_color: Option<Option<String>>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub accent_color: Option<Option<String>>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub background_url: Option<Option<String>>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cursor_url: Option<Option<String>>,
}

impl UserPatch {
    pub fn apply(&self, user: &mut User) {
        if let Some(display_name) = &self.display_name {
            user.display_name = display_name.clone();
        }
        if let Some(bio) = &self.bio {
            user.bio = bio.clone();
        }
        if let Some(bg_color) = &self.bg_color {
            user.bg_color = bg_color.clone();
        }
        if let Some(text_color) = &self.text_color {
            user.text_color = text_color.clone();
        }
        if let Some(accent_color) = &self.accent_color {
            user.accent_color = accent_color.clone();
        }
        if let Some(background_url) = &self.background_url {
            user.background_url = background_url.clone();
        }
        if let Some(cursor_url) = &self.cursor_url {
            user.cursor_url = cursor_url.clone();
        }
    }
}

/// Response of `GET /api/username/check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameAvailability {
    pub available: bool,
    pub username: String,
}

/// Public page payload: the owner's visible profile fields plus the
/// active, display-sorted link list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub bg_color: Option<String>,
    pub text_color: Option<String>,
    pub accent_color: Option<String>,
    pub background_url: Option<String>,
    pub cursor_url: Option<String>,
    pub profile_views: u64,
    pub links: Vec<Link>,
}

impl Profile {
    pub fn new(user: User, links: Vec<Link>) -> Self {
        Self {
            username: user.username,
            display_name: user.display_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            bg_color: user.bg_color,
            text_color: user.text_color,
            accent_color: user.accent_color,
            background_url: user.background_url,
            cursor_url: user.cursor_url,
            profile_views: user.profile_views,
            links,
        }
    }
}
