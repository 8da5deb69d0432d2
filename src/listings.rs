// Property repository: listing pipeline over the collection snapshot,
// read-through result caching, and owner-scoped mutations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument};

use crate::cache::{self, ResultCache};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{
    ListingPage, NewProperty, OwnerSummary, Property, PropertyPatch, PropertyWithOwner,
};
use crate::query::{self, ListingQuery};

pub struct ListingService {
    db: Arc<Database>,
    cache: Arc<dyn ResultCache>,
    cache_ttl: Duration,
}

impl ListingService {
    pub fn new(db: Arc<Database>, cache: Arc<dyn ResultCache>, cache_ttl: Duration) -> Self {
        Self {
            db,
            cache,
            cache_ttl,
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> AppResult<PropertyWithOwner> {
        let key = cache::property_key(id);
        if let Some(data) = self.cache.get(&key).await {
            return cache::decode(&data);
        }

        let property = self
            .db
            .get_property(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Property not found".to_string()))?;
        let joined = with_owner(&self.db, property).await?;

        self.cache
            .set(&key, cache::encode(&joined)?, self.cache_ttl)
            .await;
        Ok(joined)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, listing_query: &ListingQuery) -> AppResult<ListingPage> {
        let key = listing_query.cache_key();
        if let Some(data) = self.cache.get(&key).await {
            return cache::decode(&data);
        }

        let snapshot = self.db.all_properties().await?;
        let result = query::run(snapshot, listing_query);
        let properties = with_owners(&self.db, result.items).await?;

        let page = ListingPage {
            properties,
            total: result.total,
            page: result.page,
            total_pages: result.total_pages,
        };

        self.cache
            .set(&key, cache::encode(&page)?, self.cache_ttl)
            .await;
        Ok(page)
    }

    #[instrument(skip(self, data))]
    pub async fn create(&self, data: NewProperty, owner_id: i64) -> AppResult<PropertyWithOwner> {
        if data.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if data.price <= 0.0 {
            return Err(AppError::Validation("Price must be a positive amount".to_string()));
        }
        if data.city.trim().is_empty() {
            return Err(AppError::Validation("City is required".to_string()));
        }
        if self.db.get_user(owner_id).await?.is_none() {
            return Err(AppError::Validation("Unknown listing owner".to_string()));
        }

        let property = self.db.insert_property(&data, owner_id).await?;
        self.cache.flush().await;

        info!("Created property {} for user {}", property.id, owner_id);
        with_owner(&self.db, property).await
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: i64,
        patch: PropertyPatch,
        requester_id: i64,
    ) -> AppResult<PropertyWithOwner> {
        let mut property = self.owned_property(id, requester_id).await?;

        patch.apply(&mut property);
        property.updated_at = Utc::now();

        self.db.update_property(&property).await?;
        self.cache.flush().await;

        info!("Updated property {}", id);
        with_owner(&self.db, property).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64, requester_id: i64) -> AppResult<()> {
        self.owned_property(id, requester_id).await?;

        self.db.delete_property_cascading(id).await?;
        self.cache.flush().await;

        info!("Deleted property {} and its links", id);
        Ok(())
    }

    /// The requester's own listings, for the dashboard.
    #[instrument(skip(self))]
    pub async fn list_mine(&self, owner_id: i64) -> AppResult<Vec<PropertyWithOwner>> {
        let properties = self.db.properties_by_owner(owner_id).await?;
        with_owners(&self.db, properties).await
    }

    /// Missing and foreign properties yield the same signal, so a caller
    /// cannot probe which ids exist.
    async fn owned_property(&self, id: i64, requester_id: i64) -> AppResult<Property> {
        match self.db.get_property(id).await? {
            Some(property) if property.created_by == requester_id => Ok(property),
            _ => Err(AppError::NotFound("Property not found".to_string())),
        }
    }
}

/// Joins a property with its owner. An unresolvable owner degrades to the
/// "Unknown" placeholder instead of dropping the property.
pub(crate) async fn with_owner(db: &Database, property: Property) -> AppResult<PropertyWithOwner> {
    let owner = match db.get_user(property.created_by).await? {
        Some(user) => OwnerSummary::from(&user),
        None => OwnerSummary::unknown(),
    };
    Ok(PropertyWithOwner { property, owner })
}

pub(crate) async fn with_owners(
    db: &Database,
    properties: Vec<Property>,
) -> AppResult<Vec<PropertyWithOwner>> {
    let mut owners: HashMap<i64, OwnerSummary> = HashMap::new();
    for property in &properties {
        if !owners.contains_key(&property.created_by) {
            let owner = match db.get_user(property.created_by).await? {
                Some(user) => OwnerSummary::from(&user),
                None => OwnerSummary::unknown(),
            };
            owners.insert(property.created_by, owner);
        }
    }

    Ok(properties
        .into_iter()
        .map(|property| {
            let owner = owners[&property.created_by].clone();
            PropertyWithOwner { property, owner }
        })
        .collect())
}
