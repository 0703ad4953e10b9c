use async_trait::async_trait;
use model::{Link, LinkPatch, User, UserPatch};

use crate::error::AppError;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Persistence contract for link records.
///
/// The store owns durability only; ownership checks and order assignment
/// live in the engine. `find_all_by_owner` returns links already in
/// display order (ascending `order`, ties broken by id).
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn create(&self, link: Link) -> Result<Link, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Link>, AppError>;

    async fn find_all_by_owner(&self, owner_id: &str) -> Result<Vec<Link>, AppError>;

    async fn update_by_id(&self, id: &str, patch: &LinkPatch) -> Result<Link, AppError>;

    /// Applies a batch of `(link id, order)` assignments in one atomic
    /// step. A concurrent reader sees either none or all of them.
    async fn update_order(
        &self,
        owner_id: &str,
        assignments: &[(String, i64)],
    ) -> Result<(), AppError>;

    async fn delete_by_id(&self, id: &str) -> Result<(), AppError>;

    async fn count_by_owner(&self, owner_id: &str) -> Result<usize, AppError>;
}

/// Account records and the vanity-path registry.
///
/// A record is created the first time an owner claims a username; profile
/// mutations on an unclaimed owner report not-found.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, owner_id: &str) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn username_taken(&self, username: &str) -> Result<bool, AppError>;

    async fn claim_username(&self, owner_id: &str, username: &str) -> Result<User, AppError>;

    async fn update_user(&self, owner_id: &str, patch: &UserPatch) -> Result<User, AppError>;

    async fn bump_views(&self, owner_id: &str) -> Result<(), AppError>;
}
