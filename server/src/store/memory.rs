//! In-process store used by the test suite and by single-instance runs
//! without a Redis URL configured. State lives in one `RwLock`, so the
//! bulk order update is atomic by construction.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use model::{sort_links, Link, LinkPatch, User, UserPatch};

use super::{LinkStore, UserDirectory};
use crate::error::AppError;

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    links: HashMap<String, Link>,
    users: HashMap<String, User>,
    usernames: HashMap<String, String>,
    views: HashMap<String, u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn create(&self, link: Link) -> Result<Link, AppError> {
        let mut inner = self.inner.write().unwrap();
        inner.links.insert(link.id.clone(), link.clone());
        Ok(link)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Link>, AppError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.links.get(id).cloned())
    }

    async fn find_all_by_owner(&self, owner_id: &str) -> Result<Vec<Link>, AppError> {
        let inner = self.inner.read().unwrap();
        let mut links: Vec<Link> = inner
            .links
            .values()
            .filter(|l| l.owner_id == owner_id)
            .cloned()
            .collect();
        sort_links(&mut links);
        Ok(links)
    }

    async fn update_by_id(&self, id: &str, patch: &LinkPatch) -> Result<Link, AppError> {
        let mut inner = self.inner.write().unwrap();
        let link = inner.links.get_mut(id).ok_or(AppError::NotFound)?;
        patch.apply(link);
        Ok(link.clone())
    }

    async fn update_order(
        &self,
        _owner_id: &str,
        assignments: &[(String, i64)],
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().unwrap();
        for (id, order) in assignments {
            if let Some(link) = inner.links.get_mut(id) {
                link.order = *order;
            }
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), AppError> {
        let mut inner = self.inner.write().unwrap();
        inner.links.remove(id).ok_or(AppError::NotFound)?;
        Ok(())
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<usize, AppError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.links.values().filter(|l| l.owner_id == owner_id).count())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_by_id(&self, owner_id: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.users.get(owner_id).cloned().map(|mut user| {
            user.profile_views = inner.views.get(owner_id).copied().unwrap_or(0);
            user
        }))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let owner_id = {
            let inner = self.inner.read().unwrap();
            match inner.usernames.get(username) {
                Some(owner_id) => owner_id.clone(),
                None => return Ok(None),
            }
        };
        UserDirectory::find_by_id(self, &owner_id).await
    }

    async fn username_taken(&self, username: &str) -> Result<bool, AppError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.usernames.contains_key(username))
    }

    async fn claim_username(&self, owner_id: &str, username: &str) -> Result<User, AppError> {
        let mut inner = self.inner.write().unwrap();
        if let Some(holder) = inner.usernames.get(username) {
            if holder != owner_id {
                return Err(AppError::Conflict("Username is already taken".to_string()));
            }
        }

        let user = match inner.users.get_mut(owner_id) {
            Some(user) => {
                let previous = std::mem::replace(&mut user.username, username.to_string());
                let user = user.clone();
                inner.usernames.remove(&previous);
                user
            }
            None => {
                let user = User {
                    id: owner_id.to_string(),
                    username: username.to_string(),
                    display_name: None,
                    bio: None,
                    avatar_url: None,
                    bg_color: None,
                    text_color: None,
                    accent_color: None,
                    background_url: None,
                    cursor_url: None,
                    profile_views: 0,
                };
                inner.users.insert(owner_id.to_string(), user.clone());
                user
            }
        };

        inner
            .usernames
            .insert(username.to_string(), owner_id.to_string());
        Ok(user)
    }

    async fn update_user(&self, owner_id: &str, patch: &UserPatch) -> Result<User, AppError> {
        let mut inner = self.inner.write().unwrap();
        let user = inner.users.get_mut(owner_id).ok_or(AppError::NotFound)?;
        patch.apply(user);
        Ok(user.clone())
    }

    async fn bump_views(&self, owner_id: &str) -> Result<(), AppError> {
        let mut inner = self.inner.write().unwrap();
        *inner.views.entry(owner_id.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use model::LinkKind;

    use super::*;

    fn link(id: &str, owner: &str, order: i64) -> Link {
        Link {
            id: id.to_string(),
            owner_id: owner.to_string(),
            title: format!("link {id}"),
            url: "https://example.com".to_string(),
            kind: LinkKind::Regular,
            image_url: None,
            order,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn find_all_is_sorted_and_owner_scoped() {
        let store = MemoryStore::new();
        store.create(link("b", "alice", 1)).await.unwrap();
        store.create(link("a", "alice", 0)).await.unwrap();
        store.create(link("x", "bob", 0)).await.unwrap();

        let links = store.find_all_by_owner("alice").await.unwrap();
        let ids: Vec<&str> = links.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn update_order_applies_every_assignment() {
        let store = MemoryStore::new();
        store.create(link("a", "alice", 0)).await.unwrap();
        store.create(link("b", "alice", 1)).await.unwrap();

        store
            .update_order("alice", &[("b".to_string(), 0), ("a".to_string(), 1)])
            .await
            .unwrap();

        let links = store.find_all_by_owner("alice").await.unwrap();
        let ids: Vec<&str> = links.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[tokio::test]
    async fn claiming_a_taken_username_conflicts() {
        let store = MemoryStore::new();
        store.claim_username("alice", "taken").await.unwrap();

        let err = store.claim_username("bob", "taken").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Re-claiming your own name is a no-op, and moving to a new one
        // frees the old mapping.
        store.claim_username("alice", "taken").await.unwrap();
        store.claim_username("alice", "fresh").await.unwrap();
        assert!(!store.username_taken("taken").await.unwrap());
        assert!(store.username_taken("fresh").await.unwrap());
    }

    #[tokio::test]
    async fn views_accumulate_per_owner() {
        let store = MemoryStore::new();
        store.claim_username("alice", "alice").await.unwrap();
        store.bump_views("alice").await.unwrap();
        store.bump_views("alice").await.unwrap();

        let user = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.profile_views, 2);
    }
}
