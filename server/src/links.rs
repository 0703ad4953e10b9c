//! # Ordering engine
//!
//! Applies mutations to one owner's link collection while keeping the
//! ordering consistent and the collection isolated per owner.
//!
//! `order` values are allowed to carry gaps and duplicates; display always
//! re-sorts by `(order, id)`. Appends go to the end (`order` = current
//! count), deletes leave the remaining values alone, and only the bulk
//! reorder rewrites them — atomically, from a client-supplied sequence
//! that must match the owner's current id set exactly. Two concurrent
//! reorders resolve last-write-wins.
//!
//! Every lookup on behalf of an owner answers a uniform not-found for ids
//! that are missing *or* owned by someone else, so the API never confirms
//! that a foreign id exists.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use model::{CreateLink, Link, LinkKind, LinkPatch};
use uuid::Uuid;

use crate::error::AppError;
use crate::store::LinkStore;

pub struct LinkEngine {
    store: Arc<dyn LinkStore>,
}

impl LinkEngine {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }

    /// Dashboard view: every link of the owner, active or not, in display
    /// order.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<Link>, AppError> {
        require_owner(owner_id)?;
        self.store.find_all_by_owner(owner_id).await
    }

    /// Public view: active links only, in display order.
    pub async fn public_links(&self, owner_id: &str) -> Result<Vec<Link>, AppError> {
        require_owner(owner_id)?;
        let mut links = self.store.find_all_by_owner(owner_id).await?;
        links.retain(|l| l.active);
        Ok(links)
    }

    /// Creates a link at the end of the collection.
    pub async fn append(&self, owner_id: &str, req: CreateLink) -> Result<Link, AppError> {
        require_owner(owner_id)?;
        if req.title.trim().is_empty() || req.url.trim().is_empty() {
            return Err(AppError::Validation(
                "Title and URL are required".to_string(),
            ));
        }

        let order = self.store.count_by_owner(owner_id).await? as i64;
        let link = Link {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: req.title,
            url: req.url,
            kind: req.kind.unwrap_or(LinkKind::Regular),
            image_url: None,
            order,
            active: true,
            created_at: Utc::now(),
        };
        self.store.create(link).await
    }

    /// Partial update. Fields absent from the patch are untouched; an
    /// explicit null `image_url` clears the image.
    pub async fn patch(
        &self,
        owner_id: &str,
        id: &str,
        patch: LinkPatch,
    ) -> Result<Link, AppError> {
        self.owned(owner_id, id).await?;
        self.store.update_by_id(id, &patch).await
    }

    /// Replaces the display order of the owner's whole collection.
    ///
    /// `ordered_ids` must be exactly the owner's current id set — same
    /// cardinality, no foreign ids, no duplicates. Anything else rejects
    /// the request in full and leaves the stored order unchanged.
    pub async fn reorder(&self, owner_id: &str, ordered_ids: &[String]) -> Result<(), AppError> {
        require_owner(owner_id)?;
        let current = self.store.find_all_by_owner(owner_id).await?;

        if ordered_ids.len() != current.len() {
            return Err(AppError::Validation("Invalid link IDs".to_string()));
        }
        let owned: HashSet<&str> = current.iter().map(|l| l.id.as_str()).collect();
        let mut seen = HashSet::with_capacity(ordered_ids.len());
        for id in ordered_ids {
            if !owned.contains(id.as_str()) || !seen.insert(id.as_str()) {
                return Err(AppError::Validation("Invalid link IDs".to_string()));
            }
        }

        let assignments: Vec<(String, i64)> = ordered_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (id.clone(), index as i64))
            .collect();
        self.store.update_order(owner_id, &assignments).await
    }

    /// Removes a link. Sibling `order` values are not renumbered.
    pub async fn delete(&self, owner_id: &str, id: &str) -> Result<(), AppError> {
        self.owned(owner_id, id).await?;
        self.store.delete_by_id(id).await
    }

    /// Flips visibility; `order` is untouched so the link keeps its slot
    /// when shown again.
    pub async fn toggle_active(&self, owner_id: &str, id: &str) -> Result<Link, AppError> {
        let link = self.owned(owner_id, id).await?;
        let patch = LinkPatch {
            active: Some(!link.active),
            ..Default::default()
        };
        self.store.update_by_id(id, &patch).await
    }

    async fn owned(&self, owner_id: &str, id: &str) -> Result<Link, AppError> {
        require_owner(owner_id)?;
        match self.store.find_by_id(id).await? {
            Some(link) if link.owner_id == owner_id => Ok(link),
            _ => Err(AppError::NotFound),
        }
    }
}

fn require_owner(owner_id: &str) -> Result<(), AppError> {
    if owner_id.is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::store::MemoryStore;

    use super::*;

    fn engine() -> LinkEngine {
        LinkEngine::new(Arc::new(MemoryStore::new()))
    }

    fn create(title: &str) -> CreateLink {
        CreateLink {
            title: title.to_string(),
            url: format!("https://example.com/{title}"),
            kind: None,
        }
    }

    async fn seed(engine: &LinkEngine, owner: &str, titles: &[&str]) -> Vec<Link> {
        let mut links = Vec::new();
        for title in titles {
            links.push(engine.append(owner, create(title)).await.unwrap());
        }
        links
    }

    fn ids(links: &[Link]) -> Vec<String> {
        links.iter().map(|l| l.id.clone()).collect()
    }

    #[tokio::test]
    async fn append_goes_to_the_end() {
        let engine = engine();
        seed(&engine, "alice", &["a", "b"]).await;

        let link = engine.append("alice", create("c")).await.unwrap();
        assert_eq!(link.order, 2);
        assert!(link.active);

        let all = engine.list("alice").await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.last().unwrap().id, link.id);
    }

    #[tokio::test]
    async fn append_requires_title_and_url() {
        let engine = engine();

        let err = engine
            .append(
                "alice",
                CreateLink {
                    title: "  ".to_string(),
                    url: "https://example.com".to_string(),
                    kind: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = engine
            .append(
                "alice",
                CreateLink {
                    title: "site".to_string(),
                    url: String::new(),
                    kind: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(engine.list("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reorder_assigns_sequential_orders() {
        let engine = engine();
        let links = seed(&engine, "alice", &["a", "b", "c"]).await;
        let (a, b, c) = (&links[0].id, &links[1].id, &links[2].id);

        engine
            .reorder("alice", &[c.clone(), a.clone(), b.clone()])
            .await
            .unwrap();

        let after = engine.list("alice").await.unwrap();
        assert_eq!(ids(&after), [c.clone(), a.clone(), b.clone()]);
        let orders: Vec<i64> = after.iter().map(|l| l.order).collect();
        assert_eq!(orders, [0, 1, 2]);
    }

    #[tokio::test]
    async fn reorder_is_idempotent() {
        let engine = engine();
        let links = seed(&engine, "alice", &["a", "b", "c"]).await;
        let sequence = vec![links[2].id.clone(), links[0].id.clone(), links[1].id.clone()];

        engine.reorder("alice", &sequence).await.unwrap();
        let first = engine.list("alice").await.unwrap();
        engine.reorder("alice", &sequence).await.unwrap();
        let second = engine.list("alice").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn reorder_rejects_incomplete_or_foreign_sets() {
        let engine = engine();
        let alice = seed(&engine, "alice", &["a", "b", "c"]).await;
        let bob = seed(&engine, "bob", &["x"]).await;
        let before = engine.list("alice").await.unwrap();

        // Missing one id.
        let err = engine
            .reorder("alice", &[alice[0].id.clone(), alice[1].id.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Right cardinality, one foreign id.
        let err = engine
            .reorder(
                "alice",
                &[alice[0].id.clone(), alice[1].id.clone(), bob[0].id.clone()],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Right cardinality, duplicate id.
        let err = engine
            .reorder(
                "alice",
                &[alice[0].id.clone(), alice[1].id.clone(), alice[1].id.clone()],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Unknown id entirely.
        let err = engine
            .reorder(
                "alice",
                &[
                    alice[0].id.clone(),
                    alice[1].id.clone(),
                    "no-such-id".to_string(),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Stored order unchanged by all of the above.
        assert_eq!(engine.list("alice").await.unwrap(), before);
    }

    #[tokio::test]
    async fn delete_leaves_gaps_without_renumbering() {
        let engine = engine();
        let links = seed(&engine, "alice", &["a", "b", "c"]).await;

        engine.delete("alice", &links[1].id).await.unwrap();

        let after = engine.list("alice").await.unwrap();
        assert_eq!(ids(&after), [links[0].id.clone(), links[2].id.clone()]);
        let orders: Vec<i64> = after.iter().map(|l| l.order).collect();
        assert_eq!(orders, [0, 2]);
    }

    #[tokio::test]
    async fn toggle_preserves_order_and_filters_public_view() {
        let engine = engine();
        let links = seed(&engine, "alice", &["a", "b", "c"]).await;

        let toggled = engine.toggle_active("alice", &links[2].id).await.unwrap();
        assert!(!toggled.active);
        assert_eq!(toggled.order, 2);

        // Dashboard still shows it, the public page does not.
        assert_eq!(engine.list("alice").await.unwrap().len(), 3);
        let public = engine.public_links("alice").await.unwrap();
        assert_eq!(ids(&public), [links[0].id.clone(), links[1].id.clone()]);

        let restored = engine.toggle_active("alice", &links[2].id).await.unwrap();
        assert!(restored.active);
        assert_eq!(restored.order, 2);
    }

    #[tokio::test]
    async fn foreign_links_answer_uniform_not_found() {
        let engine = engine();
        let bob = seed(&engine, "bob", &["x"]).await;
        seed(&engine, "alice", &["a"]).await;

        let patch = LinkPatch {
            title: Some("mine now".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            engine.patch("alice", &bob[0].id, patch).await.unwrap_err(),
            AppError::NotFound
        ));
        assert!(matches!(
            engine.delete("alice", &bob[0].id).await.unwrap_err(),
            AppError::NotFound
        ));
        assert!(matches!(
            engine.toggle_active("alice", &bob[0].id).await.unwrap_err(),
            AppError::NotFound
        ));
        // Same answer as an id that does not exist at all.
        assert!(matches!(
            engine.delete("alice", "no-such-id").await.unwrap_err(),
            AppError::NotFound
        ));

        // Bob's link is untouched.
        let bobs = engine.list("bob").await.unwrap();
        assert_eq!(bobs[0].title, "x");
        assert!(bobs[0].active);
    }

    #[tokio::test]
    async fn patch_clears_image_only_on_explicit_null() {
        let engine = engine();
        let links = seed(&engine, "alice", &["a"]).await;
        let id = &links[0].id;

        let set = LinkPatch {
            image_url: Some(Some("https://cdn/x.png".to_string())),
            ..Default::default()
        };
        let link = engine.patch("alice", id, set).await.unwrap();
        assert_eq!(link.image_url.as_deref(), Some("https://cdn/x.png"));

        let unrelated = LinkPatch {
            title: Some("renamed".to_string()),
            ..Default::default()
        };
        let link = engine.patch("alice", id, unrelated).await.unwrap();
        assert_eq!(link.image_url.as_deref(), Some("https://cdn/x.png"));
        assert_eq!(link.title, "renamed");

        let clear = LinkPatch {
            image_url: Some(None),
            ..Default::default()
        };
        let link = engine.patch("alice", id, clear).await.unwrap();
        assert_eq!(link.image_url, None);
    }

    #[tokio::test]
    async fn missing_owner_is_unauthorized() {
        let engine = engine();
        assert!(matches!(
            engine.list("").await.unwrap_err(),
            AppError::Unauthorized
        ));
        assert!(matches!(
            engine.append("", create("a")).await.unwrap_err(),
            AppError::Unauthorized
        ));
        assert!(matches!(
            engine.reorder("", &[]).await.unwrap_err(),
            AppError::Unauthorized
        ));
    }
}
