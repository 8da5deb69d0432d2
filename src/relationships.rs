// Relationship store: favorites (user ↔ property links) and directed
// recommendation edges between users, mediated by a property.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::listings::with_owners;
use crate::models::{Favorite, Property, PropertyWithOwner, Recommendation};

pub struct RelationshipService {
    db: Arc<Database>,
}

impl RelationshipService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Idempotent: re-favoriting an already-favorited property returns the
    /// existing link.
    #[instrument(skip(self))]
    pub async fn add_favorite(&self, user_id: i64, property_id: i64) -> AppResult<Favorite> {
        if self.db.get_property(property_id).await?.is_none() {
            return Err(AppError::NotFound("Property not found".to_string()));
        }

        let favorite = self.db.insert_favorite(user_id, property_id).await?;
        info!("User {} favorited property {}", user_id, property_id);
        Ok(favorite)
    }

    #[instrument(skip(self))]
    pub async fn remove_favorite(&self, user_id: i64, property_id: i64) -> AppResult<()> {
        let removed = self.db.delete_favorite(user_id, property_id).await?;
        if !removed {
            return Err(AppError::NotFound("Favorite not found".to_string()));
        }
        Ok(())
    }

    /// The user's favorited properties, owners attached, in the order the
    /// favorites were added.
    #[instrument(skip(self))]
    pub async fn list_favorites(&self, user_id: i64) -> AppResult<Vec<PropertyWithOwner>> {
        let favorites = self.db.favorites_for_user(user_id).await?;
        let properties = self.resolve_properties(favorites.iter().map(|f| f.property_id)).await?;
        with_owners(&self.db, properties).await
    }

    /// Resolves the recipient by email at creation time. An unknown email
    /// or property fails the request; nothing is stored. Self-
    /// recommendation and duplicates are allowed.
    #[instrument(skip(self))]
    pub async fn recommend(
        &self,
        from_user_id: i64,
        recipient_email: &str,
        property_id: i64,
    ) -> AppResult<Recommendation> {
        let recipient = self
            .db
            .find_user_by_email(recipient_email)
            .await?
            .ok_or_else(|| AppError::BadRequest("Recipient not found".to_string()))?;

        if self.db.get_property(property_id).await?.is_none() {
            return Err(AppError::BadRequest("Property not found".to_string()));
        }

        let recommendation = self
            .db
            .insert_recommendation(from_user_id, recipient.id, property_id)
            .await?;

        info!(
            "User {} recommended property {} to user {}",
            from_user_id, property_id, recipient.id
        );
        Ok(recommendation)
    }

    /// Properties recommended to this user, owners attached.
    #[instrument(skip(self))]
    pub async fn list_recommendations_received(
        &self,
        user_id: i64,
    ) -> AppResult<Vec<PropertyWithOwner>> {
        let received = self.db.recommendations_received(user_id).await?;
        let properties = self.resolve_properties(received.iter().map(|r| r.property_id)).await?;
        with_owners(&self.db, properties).await
    }

    /// Looks up linked properties, skipping ids that no longer resolve.
    /// A lingering link after a partial cascade is tolerated rather than
    /// surfaced as an error.
    async fn resolve_properties(
        &self,
        ids: impl Iterator<Item = i64>,
    ) -> AppResult<Vec<Property>> {
        let mut properties = Vec::new();
        for id in ids {
            if let Some(property) = self.db.get_property(id).await? {
                properties.push(property);
            }
        }
        Ok(properties)
    }
}
