use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::models::{Favorite, NewProperty, Property, Recommendation, User};

/// List fields are stored as a single delimited TEXT column; SQLite has no
/// native array type. The model only ever sees `Vec<String>`.
const LIST_DELIMITER: &str = "|";

fn encode_list(items: &[String]) -> String {
    items.join(LIST_DELIMITER)
}

fn decode_list(raw: &str) -> Vec<String> {
    raw.split(LIST_DELIMITER)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// Async property-store database with SQLx connection pool
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Database { pool })
    }

    /// Single-connection in-memory database. SQLite `:memory:` is
    /// per-connection, so tests must not fan out over a pool.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Database { pool };
        db.init().await?;
        Ok(db)
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS properties (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                price REAL NOT NULL,
                area INTEGER NOT NULL,
                bedrooms INTEGER NOT NULL,
                bathrooms INTEGER NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                country TEXT NOT NULL,
                property_type TEXT NOT NULL,
                furnished TEXT NOT NULL,
                listed_by TEXT NOT NULL,
                listing_type TEXT NOT NULL,
                is_verified INTEGER NOT NULL DEFAULT 0,
                rating REAL NOT NULL DEFAULT 0,
                amenities TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '',
                available_from TEXT,
                image_url TEXT,
                created_by INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                color_theme TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS favorites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                property_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(user_id, property_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS recommendations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                from_user_id INTEGER NOT NULL,
                to_user_id INTEGER NOT NULL,
                property_id INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_properties_created_by ON properties(created_by)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_favorites_user ON favorites(user_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_recommendations_to_user ON recommendations(to_user_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_recommendations_property ON recommendations(property_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // User operations

    pub async fn insert_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| user_from_row(&row)))
    }

    /// Exact, case-sensitive email lookup.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| user_from_row(&row)))
    }

    // Property operations

    pub async fn insert_property(&self, data: &NewProperty, owner_id: i64) -> Result<Property> {
        let now = Utc::now();
        let listed_by = data
            .listed_by
            .clone()
            .unwrap_or_else(|| crate::models::DEFAULT_LISTED_BY.to_string());
        let color_theme = data
            .color_theme
            .clone()
            .unwrap_or_else(|| crate::models::DEFAULT_COLOR_THEME.to_string());

        let result = sqlx::query(
            "INSERT INTO properties (
                title, description, price, area, bedrooms, bathrooms,
                city, state, country, property_type, furnished, listed_by,
                listing_type, is_verified, rating, amenities, tags,
                available_from, image_url, created_by, created_at, updated_at,
                color_theme
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.price)
        .bind(data.area)
        .bind(data.bedrooms)
        .bind(data.bathrooms)
        .bind(&data.city)
        .bind(&data.state)
        .bind(&data.country)
        .bind(&data.property_type)
        .bind(&data.furnished)
        .bind(&listed_by)
        .bind(&data.listing_type)
        .bind(false)
        .bind(0.0_f64)
        .bind(encode_list(&data.amenities))
        .bind(encode_list(&data.tags))
        .bind(data.available_from)
        .bind(&data.image_url)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .bind(&color_theme)
        .execute(&self.pool)
        .await?;

        Ok(Property {
            id: result.last_insert_rowid(),
            title: data.title.clone(),
            description: data.description.clone(),
            price: data.price,
            area: data.area,
            bedrooms: data.bedrooms,
            bathrooms: data.bathrooms,
            city: data.city.clone(),
            state: data.state.clone(),
            country: data.country.clone(),
            property_type: data.property_type.clone(),
            furnished: data.furnished.clone(),
            listed_by,
            listing_type: data.listing_type.clone(),
            is_verified: false,
            rating: 0.0,
            amenities: data.amenities.clone(),
            tags: data.tags.clone(),
            available_from: data.available_from,
            image_url: data.image_url.clone(),
            created_by: owner_id,
            created_at: now,
            updated_at: now,
            color_theme,
        })
    }

    pub async fn get_property(&self, id: i64) -> Result<Option<Property>> {
        let row = sqlx::query("SELECT * FROM properties WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| property_from_row(&row)))
    }

    /// Snapshot of the whole collection in insertion order; the listing
    /// pipeline filters and sorts in memory.
    pub async fn all_properties(&self) -> Result<Vec<Property>> {
        let rows = sqlx::query("SELECT * FROM properties ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(property_from_row).collect())
    }

    pub async fn properties_by_owner(&self, owner_id: i64) -> Result<Vec<Property>> {
        let rows = sqlx::query("SELECT * FROM properties WHERE created_by = ? ORDER BY id")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(property_from_row).collect())
    }

    pub async fn update_property(&self, property: &Property) -> Result<()> {
        sqlx::query(
            "UPDATE properties SET
                title = ?, description = ?, price = ?, area = ?, bedrooms = ?,
                bathrooms = ?, city = ?, state = ?, country = ?,
                property_type = ?, furnished = ?, listed_by = ?,
                listing_type = ?, is_verified = ?, rating = ?, amenities = ?,
                tags = ?, available_from = ?, image_url = ?, updated_at = ?,
                color_theme = ?
             WHERE id = ?",
        )
        .bind(&property.title)
        .bind(&property.description)
        .bind(property.price)
        .bind(property.area)
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(&property.city)
        .bind(&property.state)
        .bind(&property.country)
        .bind(&property.property_type)
        .bind(&property.furnished)
        .bind(&property.listed_by)
        .bind(&property.listing_type)
        .bind(property.is_verified)
        .bind(property.rating)
        .bind(encode_list(&property.amenities))
        .bind(encode_list(&property.tags))
        .bind(property.available_from)
        .bind(&property.image_url)
        .bind(property.updated_at)
        .bind(&property.color_theme)
        .bind(property.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a property and every favorite and recommendation that
    /// references it, in one transaction.
    pub async fn delete_property_cascading(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM favorites WHERE property_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM recommendations WHERE property_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM properties WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    // Favorite operations

    pub async fn find_favorite(&self, user_id: i64, property_id: i64) -> Result<Option<Favorite>> {
        let row = sqlx::query(
            "SELECT id, user_id, property_id, created_at FROM favorites
             WHERE user_id = ? AND property_id = ?",
        )
        .bind(user_id)
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| favorite_from_row(&row)))
    }

    /// Idempotent on the (user, property) pair: the UNIQUE constraint
    /// swallows the duplicate insert and the existing row is returned.
    pub async fn insert_favorite(&self, user_id: i64, property_id: i64) -> Result<Favorite> {
        sqlx::query(
            "INSERT INTO favorites (user_id, property_id, created_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id, property_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(property_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let favorite = self
            .find_favorite(user_id, property_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("favorite row missing after insert"))?;

        Ok(favorite)
    }

    pub async fn delete_favorite(&self, user_id: i64, property_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND property_id = ?")
            .bind(user_id)
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn favorites_for_user(&self, user_id: i64) -> Result<Vec<Favorite>> {
        let rows = sqlx::query(
            "SELECT id, user_id, property_id, created_at FROM favorites
             WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(favorite_from_row).collect())
    }

    // Recommendation operations

    pub async fn insert_recommendation(
        &self,
        from_user_id: i64,
        to_user_id: i64,
        property_id: i64,
    ) -> Result<Recommendation> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO recommendations (from_user_id, to_user_id, property_id, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .bind(property_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Recommendation {
            id: result.last_insert_rowid(),
            from_user_id,
            to_user_id,
            property_id,
            created_at: now,
        })
    }

    pub async fn recommendations_received(&self, user_id: i64) -> Result<Vec<Recommendation>> {
        let rows = sqlx::query(
            "SELECT id, from_user_id, to_user_id, property_id, created_at FROM recommendations
             WHERE to_user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(recommendation_from_row).collect())
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn property_from_row(row: &SqliteRow) -> Property {
    Property {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        price: row.get("price"),
        area: row.get("area"),
        bedrooms: row.get("bedrooms"),
        bathrooms: row.get("bathrooms"),
        city: row.get("city"),
        state: row.get("state"),
        country: row.get("country"),
        property_type: row.get("property_type"),
        furnished: row.get("furnished"),
        listed_by: row.get("listed_by"),
        listing_type: row.get("listing_type"),
        is_verified: row.get("is_verified"),
        rating: row.get("rating"),
        amenities: decode_list(row.get::<String, _>("amenities").as_str()),
        tags: decode_list(row.get::<String, _>("tags").as_str()),
        available_from: row.get::<Option<NaiveDate>, _>("available_from"),
        image_url: row.get("image_url"),
        created_by: row.get("created_by"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        color_theme: row.get("color_theme"),
    }
}

fn favorite_from_row(row: &SqliteRow) -> Favorite {
    Favorite {
        id: row.get("id"),
        user_id: row.get("user_id"),
        property_id: row.get("property_id"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn recommendation_from_row(row: &SqliteRow) -> Recommendation {
    Recommendation {
        id: row.get("id"),
        from_user_id: row.get("from_user_id"),
        to_user_id: row.get("to_user_id"),
        property_id: row.get("property_id"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}
