use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::{
    config::Config,
    links::LinkEngine,
    rate_limit::{LocalRateLimiter, RateLimit},
    store::{redis::init_redis, LinkStore, MemoryStore, RedisStore, UserDirectory},
};

pub struct AppState {
    pub config: Config,
    pub engine: LinkEngine,
    pub users: Arc<dyn UserDirectory>,
    pub username_limiter: Arc<dyn RateLimit>,
    pub views_limiter: Arc<dyn RateLimit>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let (links, users): (Arc<dyn LinkStore>, Arc<dyn UserDirectory>) = match &config.redis_url
        {
            Some(url) => {
                let conn = init_redis(url).await;
                let store = Arc::new(RedisStore::new(conn));
                (store.clone(), store)
            }
            None => {
                warn!("REDIS_URL not set, falling back to the in-memory store (single instance, not durable)");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

        Self::assemble(config, links, users)
    }

    /// Wires a state from explicit collaborators. Tests plug a memory
    /// store in here.
    pub fn assemble(
        config: Config,
        links: Arc<dyn LinkStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Arc<Self> {
        let username_limiter = LocalRateLimiter::new(Duration::from_secs(60), 30);
        username_limiter.spawn_sweeper();
        let views_limiter = LocalRateLimiter::new(Duration::from_secs(60), 10);
        views_limiter.spawn_sweeper();

        Arc::new(Self {
            config,
            engine: LinkEngine::new(links),
            users,
            username_limiter,
            views_limiter,
        })
    }
}
