//! # Redis
//!
//! Durable store for link and account records.
//!
//! ## Schema
//!
//! - `links:{owner}` hash: link id → JSON record. One hash per owner keeps
//!   `find_all_by_owner` a single `HGETALL` and keeps the bulk order
//!   update inside one key.
//! - `link-owners` hash: link id → owner id. Global index so `find_by_id`
//!   works from an id alone.
//! - `users` hash: owner id → JSON record.
//! - `usernames` hash: username → owner id. The vanity-path registry.
//! - `views:{owner}` counter: profile views, atomic `INCR`.
//!
//! ## Reorder atomicity
//!
//! `update_order` rewrites every moved record through one `MULTI`/`EXEC`
//! pipeline, so a concurrent `HGETALL` observes either the old order or
//! the new one, never a half-applied mix. Two racing reorders resolve
//! last-write-wins; there is no version token.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use model::{sort_links, Link, LinkPatch, User, UserPatch};
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};

use super::{LinkStore, UserDirectory};
use crate::error::AppError;

const LINK_OWNERS_KEY: &str = "link-owners";
const USERS_KEY: &str = "users";
const USERNAMES_KEY: &str = "usernames";

pub struct RedisStore {
    conn: ConnectionManager,
}

pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).unwrap();

    client
        .get_connection_manager_with_config(config)
        .await
        .unwrap()
}

fn links_key(owner_id: &str) -> String {
    format!("links:{owner_id}")
}

fn views_key(owner_id: &str) -> String {
    format!("views:{owner_id}")
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    async fn owner_of(&self, id: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();
        let owner: Option<String> = conn.hget(LINK_OWNERS_KEY, id).await?;
        Ok(owner)
    }

    async fn load_link(&self, owner_id: &str, id: &str) -> Result<Option<Link>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(links_key(owner_id), id).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn store_link(&self, link: &Link) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(link)?;
        let _: () = conn.hset(links_key(&link.owner_id), &link.id, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl LinkStore for RedisStore {
    async fn create(&self, link: Link) -> Result<Link, AppError> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(&link)?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(links_key(&link.owner_id), &link.id, raw)
            .ignore()
            .hset(LINK_OWNERS_KEY, &link.id, &link.owner_id)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        Ok(link)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Link>, AppError> {
        match self.owner_of(id).await? {
            Some(owner_id) => self.load_link(&owner_id, id).await,
            None => Ok(None),
        }
    }

    async fn find_all_by_owner(&self, owner_id: &str) -> Result<Vec<Link>, AppError> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(links_key(owner_id)).await?;

        let mut links = Vec::with_capacity(raw.len());
        for value in raw.values() {
            links.push(serde_json::from_str(value)?);
        }
        sort_links(&mut links);
        Ok(links)
    }

    async fn update_by_id(&self, id: &str, patch: &LinkPatch) -> Result<Link, AppError> {
        let mut link = LinkStore::find_by_id(self, id)
            .await?
            .ok_or(AppError::NotFound)?;
        patch.apply(&mut link);
        self.store_link(&link).await?;
        Ok(link)
    }

    async fn update_order(
        &self,
        owner_id: &str,
        assignments: &[(String, i64)],
    ) -> Result<(), AppError> {
        let key = links_key(owner_id);
        let new_orders: HashMap<&str, i64> = assignments
            .iter()
            .map(|(id, order)| (id.as_str(), *order))
            .collect();

        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(&key).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (id, value) in &raw {
            if let Some(order) = new_orders.get(id.as_str()) {
                let mut link: Link = serde_json::from_str(value)?;
                link.order = *order;
                pipe.hset(&key, id, serde_json::to_string(&link)?).ignore();
            }
        }
        let _: () = pipe.query_async(&mut conn).await?;

        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), AppError> {
        let owner_id = self.owner_of(id).await?.ok_or(AppError::NotFound)?;

        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hdel(links_key(&owner_id), id)
            .ignore()
            .hdel(LINK_OWNERS_KEY, id)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        Ok(())
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<usize, AppError> {
        let mut conn = self.conn.clone();
        let count: usize = conn.hlen(links_key(owner_id)).await?;
        Ok(count)
    }
}

#[async_trait]
impl UserDirectory for RedisStore {
    async fn find_by_id(&self, owner_id: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(USERS_KEY, owner_id).await?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let mut user: User = serde_json::from_str(&raw)?;
        let views: Option<u64> = conn.get(views_key(owner_id)).await?;
        user.profile_views = views.unwrap_or(0);
        Ok(Some(user))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.conn.clone();
        let owner_id: Option<String> = conn.hget(USERNAMES_KEY, username).await?;
        match owner_id {
            Some(owner_id) => UserDirectory::find_by_id(self, &owner_id).await,
            None => Ok(None),
        }
    }

    async fn username_taken(&self, username: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let taken: bool = conn.hexists(USERNAMES_KEY, username).await?;
        Ok(taken)
    }

    async fn claim_username(&self, owner_id: &str, username: &str) -> Result<User, AppError> {
        let mut conn = self.conn.clone();

        let holder: Option<String> = conn.hget(USERNAMES_KEY, username).await?;
        if holder.as_deref().is_some_and(|h| h != owner_id) {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        let existing = UserDirectory::find_by_id(self, owner_id).await?;
        let (user, previous) = match existing {
            Some(mut user) => {
                let previous = std::mem::replace(&mut user.username, username.to_string());
                (user, Some(previous))
            }
            None => (
                User {
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
                },
                None,
            ),
        };

        let mut pipe = redis::pipe();
        pipe.atomic();
        if let Some(previous) = previous.filter(|p| p != username) {
            pipe.hdel(USERNAMES_KEY, previous).ignore();
        }
        pipe.hset(USERS_KEY, owner_id, serde_json::to_string(&user)?)
            .ignore()
            .hset(USERNAMES_KEY, username, owner_id)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        Ok(user)
    }

    async fn update_user(&self, owner_id: &str, patch: &UserPatch) -> Result<User, AppError> {
        let mut user = UserDirectory::find_by_id(self, owner_id)
            .await?
            .ok_or(AppError::NotFound)?;
        patch.apply(&mut user);

        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(USERS_KEY, owner_id, serde_json::to_string(&user)?)
            .await?;
        Ok(user)
    }

    async fn bump_views(&self, owner_id: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: u64 = conn.incr(views_key(owner_id), 1).await?;
        Ok(())
    }
}
