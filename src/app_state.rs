use std::sync::Arc;
use std::time::Duration;

use crate::{
    auth::AuthService,
    cache::{MemoryCache, ResultCache},
    config::Config,
    db::Database,
    listings::ListingService,
    relationships::RelationshipService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthService>,
    pub listings: Arc<ListingService>,
    pub relationships: Arc<RelationshipService>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize database
        let database = Database::new(&config.database.url).await?;
        database.init().await?;
        let db = Arc::new(database);

        let cache: Arc<dyn ResultCache> = Arc::new(MemoryCache::new(config.cache.capacity));

        Ok(Self::assemble(db, cache, config))
    }

    /// Wires services over an existing database and cache; tests use this
    /// to inject an in-memory database or a no-op cache.
    pub fn assemble(db: Arc<Database>, cache: Arc<dyn ResultCache>, config: Config) -> Self {
        let cache_ttl = Duration::from_secs(config.cache.ttl_secs);
        let auth = Arc::new(AuthService::new(db.clone(), &config.auth.jwt_secret));
        let listings = Arc::new(ListingService::new(db.clone(), cache, cache_ttl));
        let relationships = Arc::new(RelationshipService::new(db.clone()));

        Self {
            db,
            auth,
            listings,
            relationships,
            config,
        }
    }
}
