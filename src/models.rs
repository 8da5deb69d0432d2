use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Registered account. The password hash never leaves the service layer;
/// wire responses carry [`PublicUser`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Owner identity attached to listed properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl OwnerSummary {
    /// Placeholder for a property whose owner record no longer resolves.
    /// Such properties stay in listings rather than being dropped.
    pub fn unknown() -> Self {
        OwnerSummary {
            id: 0,
            name: "Unknown".to_string(),
            email: String::new(),
        }
    }
}

impl From<&User> for OwnerSummary {
    fn from(user: &User) -> Self {
        OwnerSummary {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

pub const DEFAULT_COLOR_THEME: &str = "#6ab45e";
pub const DEFAULT_LISTED_BY: &str = "Owner";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub area: i64,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(rename = "type")]
    pub property_type: String,
    pub furnished: String,
    pub listed_by: String,
    pub listing_type: String,
    pub is_verified: bool,
    pub rating: f64,
    pub amenities: Vec<String>,
    pub tags: Vec<String>,
    pub available_from: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub color_theme: String,
}

/// Property joined with its owner, the shape every read endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyWithOwner {
    #[serde(flatten)]
    pub property: Property,
    pub owner: OwnerSummary,
}

/// One page of listing results, with the pre-pagination match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub properties: Vec<PropertyWithOwner>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// Creation payload. Absent fields fall back to `Default`, so validation in
/// the listing service sees empty strings / zero rather than missing keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProperty {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub area: i64,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(rename = "type", alias = "propertyType")]
    pub property_type: String,
    pub furnished: String,
    pub listed_by: Option<String>,
    pub listing_type: String,
    pub amenities: Vec<String>,
    pub tags: Vec<String>,
    pub available_from: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub color_theme: Option<String>,
}

/// Shallow-merge update payload; only supplied fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub area: Option<i64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type", alias = "propertyType")]
    pub property_type: Option<String>,
    pub furnished: Option<String>,
    pub listed_by: Option<String>,
    pub listing_type: Option<String>,
    pub is_verified: Option<bool>,
    pub rating: Option<f64>,
    pub amenities: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub available_from: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub color_theme: Option<String>,
}

impl PropertyPatch {
    /// Applies the patch on top of `property`, leaving untouched fields as-is.
    pub fn apply(self, property: &mut Property) {
        if let Some(title) = self.title {
            property.title = title;
        }
        if self.description.is_some() {
            property.description = self.description;
        }
        if let Some(price) = self.price {
            property.price = price;
        }
        if let Some(area) = self.area {
            property.area = area;
        }
        if let Some(bedrooms) = self.bedrooms {
            property.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            property.bathrooms = bathrooms;
        }
        if let Some(city) = self.city {
            property.city = city;
        }
        if let Some(state) = self.state {
            property.state = state;
        }
        if let Some(country) = self.country {
            property.country = country;
        }
        if let Some(property_type) = self.property_type {
            property.property_type = property_type;
        }
        if let Some(furnished) = self.furnished {
            property.furnished = furnished;
        }
        if let Some(listed_by) = self.listed_by {
            property.listed_by = listed_by;
        }
        if let Some(listing_type) = self.listing_type {
            property.listing_type = listing_type;
        }
        if let Some(is_verified) = self.is_verified {
            property.is_verified = is_verified;
        }
        if let Some(rating) = self.rating {
            property.rating = rating;
        }
        if let Some(amenities) = self.amenities {
            property.amenities = amenities;
        }
        if let Some(tags) = self.tags {
            property.tags = tags;
        }
        if self.available_from.is_some() {
            property.available_from = self.available_from;
        }
        if self.image_url.is_some() {
            property.image_url = self.image_url;
        }
        if let Some(color_theme) = self.color_theme {
            property.color_theme = color_theme;
        }
    }
}

/// Saved-for-later link from a user to a property. Unique per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub property_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Directed suggestion of a property from one user to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub property_id: i64,
    pub created_at: DateTime<Utc>,
}
