// Listing query pipeline: conjunctive predicate filtering, comparator
// selection, and arithmetic pagination over the property collection.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::Property;

pub const DEFAULT_PAGE_SIZE: i64 = 12;

/// Values that callers send to mean "no constraint".
const SENTINELS: [&str; 2] = ["all", "any"];

/// Treats empty strings and sentinel values as an absent field, otherwise
/// parses. Query strings arrive as text, so every typed filter goes
/// through here.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if SENTINELS.iter().any(|sentinel| s.eq_ignore_ascii_case(sentinel)) => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    Oldest,
    #[default]
    Newest,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_asc" => Ok(SortOrder::PriceAsc),
            "price_desc" => Ok(SortOrder::PriceDesc),
            "oldest" => Ok(SortOrder::Oldest),
            "newest" => Ok(SortOrder::Newest),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Filter, sort, and pagination parameters for property listings. All
/// filters are optional and AND-combined; an absent field constrains
/// nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingQuery {
    #[serde(deserialize_with = "lenient")]
    pub price_min: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub price_max: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub area_min: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub area_max: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub bedrooms: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub bathrooms: Option<i64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type", alias = "propertyType")]
    pub property_type: Option<String>,
    pub furnished: Option<String>,
    pub listing_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub verified: Option<bool>,
    pub amenity: Option<String>,
    pub tag: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub available_after: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient")]
    pub available_before: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient")]
    pub sort: Option<SortOrder>,
    #[serde(deserialize_with = "lenient")]
    pub page: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub limit: Option<i64>,
}

fn scrub(field: &Option<String>) -> Option<String> {
    let value = field.as_deref()?.trim();
    if value.is_empty() || SENTINELS.iter().any(|s| value.eq_ignore_ascii_case(s)) {
        return None;
    }
    Some(value.to_string())
}

impl ListingQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }

    pub fn sort(&self) -> SortOrder {
        self.sort.unwrap_or_default()
    }

    /// Canonical form: sentinel and blank text filters removed, defaults
    /// made explicit. Both predicate evaluation and cache keying run on
    /// this form, so equivalent spellings of a query share a cache entry.
    pub fn normalized(&self) -> ListingQuery {
        ListingQuery {
            city: scrub(&self.city),
            state: scrub(&self.state),
            country: scrub(&self.country),
            property_type: scrub(&self.property_type),
            furnished: scrub(&self.furnished),
            listing_type: scrub(&self.listing_type),
            amenity: scrub(&self.amenity),
            tag: scrub(&self.tag),
            sort: Some(self.sort()),
            page: Some(self.page()),
            limit: Some(self.limit()),
            ..self.clone()
        }
    }

    /// Stable key for the result cache, derived from the canonical query.
    pub fn cache_key(&self) -> String {
        let canonical =
            serde_json::to_string(&self.normalized()).expect("listing query serializes");
        let mut hasher = DefaultHasher::new();
        canonical.hash(&mut hasher);
        format!("list:{:016x}", hasher.finish())
    }

    /// Conjunction of every supplied predicate. Expects `self` to be in
    /// normalized form.
    pub fn matches(&self, property: &Property) -> bool {
        if let Some(min) = self.price_min {
            if property.price < min {
                return false;
            }
        }
        if let Some(max) = self.price_max {
            if property.price > max {
                return false;
            }
        }
        if let Some(min) = self.area_min {
            if property.area < min {
                return false;
            }
        }
        if let Some(max) = self.area_max {
            if property.area > max {
                return false;
            }
        }
        if let Some(bedrooms) = self.bedrooms {
            if property.bedrooms < bedrooms {
                return false;
            }
        }
        if let Some(bathrooms) = self.bathrooms {
            if property.bathrooms < bathrooms {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !contains_ci(&property.city, city) {
                return false;
            }
        }
        if let Some(state) = &self.state {
            if !contains_ci(&property.state, state) {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if !contains_ci(&property.country, country) {
                return false;
            }
        }
        if let Some(property_type) = &self.property_type {
            if &property.property_type != property_type {
                return false;
            }
        }
        if let Some(furnished) = &self.furnished {
            if &property.furnished != furnished {
                return false;
            }
        }
        if let Some(listing_type) = &self.listing_type {
            if &property.listing_type != listing_type {
                return false;
            }
        }
        if let Some(verified) = self.verified {
            if property.is_verified != verified {
                return false;
            }
        }
        if let Some(amenity) = &self.amenity {
            if !contains_ci(&property.amenities.join("|"), amenity) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !contains_ci(&property.tags.join("|"), tag) {
                return false;
            }
        }
        if self.available_after.is_some() || self.available_before.is_some() {
            let Some(available) = property.available_from else {
                return false;
            };
            if let Some(after) = self.available_after {
                if available < after {
                    return false;
                }
            }
            if let Some(before) = self.available_before {
                if available > before {
                    return false;
                }
            }
        }
        true
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn sort_properties(properties: &mut [Property], order: SortOrder) {
    match order {
        SortOrder::PriceAsc => properties.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortOrder::PriceDesc => properties.sort_by(|a, b| b.price.total_cmp(&a.price)),
        SortOrder::Oldest => properties.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOrder::Newest => properties.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

/// Output of the listing pipeline: the requested page plus pre-pagination
/// totals.
#[derive(Debug)]
pub struct PipelineResult {
    pub items: Vec<Property>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// Runs the whole pipeline over an in-memory snapshot of the collection:
/// filter, then sort, then slice out the requested page.
pub fn run(mut properties: Vec<Property>, query: &ListingQuery) -> PipelineResult {
    let query = query.normalized();
    properties.retain(|property| query.matches(property));
    sort_properties(&mut properties, query.sort());

    let total = properties.len() as i64;
    let page = query.page();
    let limit = query.limit();
    let total_pages = (total + limit - 1) / limit;
    let skip = ((page - 1) * limit) as usize;

    let items = properties
        .into_iter()
        .skip(skip)
        .take(limit as usize)
        .collect();

    PipelineResult {
        items,
        total,
        page,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DEFAULT_COLOR_THEME, DEFAULT_LISTED_BY};
    use chrono::{TimeZone, Utc};

    fn prop(id: i64, mutate: impl FnOnce(&mut Property)) -> Property {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::days(id);
        let mut property = Property {
            id,
            title: format!("Listing {}", id),
            description: None,
            price: 100000.0,
            area: 1000,
            bedrooms: 2,
            bathrooms: 1,
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            country: "USA".to_string(),
            property_type: "House".to_string(),
            furnished: "No".to_string(),
            listed_by: DEFAULT_LISTED_BY.to_string(),
            listing_type: "Sale".to_string(),
            is_verified: false,
            rating: 0.0,
            amenities: vec![],
            tags: vec![],
            available_from: None,
            image_url: None,
            created_by: 1,
            created_at: created,
            updated_at: created,
            color_theme: DEFAULT_COLOR_THEME.to_string(),
        };
        mutate(&mut property);
        property
    }

    fn seeded() -> Vec<Property> {
        vec![
            prop(1, |p| {
                p.price = 40000.0;
                p.city = "Lakeview".to_string();
                p.bedrooms = 1;
            }),
            prop(2, |p| {
                p.price = 60000.0;
                p.city = "Lakeview Heights".to_string();
                p.property_type = "Apartment".to_string();
                p.furnished = "Yes".to_string();
                p.amenities = vec!["Pool".to_string(), "Gym".to_string()];
            }),
            prop(3, |p| {
                p.price = 90000.0;
                p.state = "WI".to_string();
                p.bedrooms = 3;
                p.bathrooms = 2;
                p.is_verified = true;
                p.tags = vec!["family".to_string()];
            }),
            prop(4, |p| {
                p.price = 120000.0;
                p.listing_type = "Rent".to_string();
                p.area = 2200;
                p.available_from = NaiveDate::from_ymd_opt(2024, 6, 15);
            }),
            prop(5, |p| {
                p.price = 200000.0;
                p.country = "Canada".to_string();
                p.bedrooms = 4;
                p.bathrooms = 3;
                p.is_verified = true;
                p.available_from = NaiveDate::from_ymd_opt(2024, 9, 1);
            }),
        ]
    }

    /// Brute-force reference: the same predicates written out by hand so a
    /// pipeline regression cannot hide in shared code.
    fn reference_filter(properties: &[Property], q: &ListingQuery) -> Vec<i64> {
        properties
            .iter()
            .filter(|p| q.price_min.map_or(true, |v| p.price >= v))
            .filter(|p| q.price_max.map_or(true, |v| p.price <= v))
            .filter(|p| q.area_min.map_or(true, |v| p.area >= v))
            .filter(|p| q.area_max.map_or(true, |v| p.area <= v))
            .filter(|p| q.bedrooms.map_or(true, |v| p.bedrooms >= v))
            .filter(|p| q.bathrooms.map_or(true, |v| p.bathrooms >= v))
            .filter(|p| {
                q.city.as_ref().map_or(true, |v| {
                    p.city.to_lowercase().contains(&v.to_lowercase())
                })
            })
            .filter(|p| {
                q.state.as_ref().map_or(true, |v| {
                    p.state.to_lowercase().contains(&v.to_lowercase())
                })
            })
            .filter(|p| q.property_type.as_ref().map_or(true, |v| &p.property_type == v))
            .filter(|p| q.listing_type.as_ref().map_or(true, |v| &p.listing_type == v))
            .filter(|p| q.verified.map_or(true, |v| p.is_verified == v))
            .map(|p| p.id)
            .collect()
    }

    #[test]
    fn pipeline_agrees_with_reference_across_filter_combinations() {
        let properties = seeded();
        let combos = vec![
            ListingQuery::default(),
            ListingQuery {
                price_min: Some(50000.0),
                price_max: Some(150000.0),
                ..Default::default()
            },
            ListingQuery {
                bedrooms: Some(3),
                verified: Some(true),
                ..Default::default()
            },
            ListingQuery {
                city: Some("lakeview".to_string()),
                ..Default::default()
            },
            ListingQuery {
                property_type: Some("Apartment".to_string()),
                price_max: Some(100000.0),
                ..Default::default()
            },
            ListingQuery {
                listing_type: Some("Rent".to_string()),
                area_min: Some(2000),
                ..Default::default()
            },
            ListingQuery {
                state: Some("wi".to_string()),
                bathrooms: Some(2),
                ..Default::default()
            },
        ];

        for query in combos {
            let mut expected = reference_filter(&properties, &query.normalized());
            let result = run(properties.clone(), &ListingQuery {
                limit: Some(100),
                ..query.clone()
            });
            let mut got: Vec<i64> = result.items.iter().map(|p| p.id).collect();
            expected.sort_unstable();
            got.sort_unstable();
            assert_eq!(got, expected, "filter mismatch for {:?}", query);
        }
    }

    #[test]
    fn no_filters_returns_everything_newest_first() {
        let result = run(seeded(), &ListingQuery::default());
        assert_eq!(result.total, 5);
        let ids: Vec<i64> = result.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn sentinel_values_constrain_nothing() {
        let query = ListingQuery {
            property_type: Some("all".to_string()),
            furnished: Some("ANY".to_string()),
            city: Some("  ".to_string()),
            ..Default::default()
        };
        let result = run(seeded(), &query);
        assert_eq!(result.total, 5);
    }

    #[test]
    fn price_band_sorted_ascending() {
        let query = ListingQuery {
            price_min: Some(50000.0),
            price_max: Some(150000.0),
            sort: Some(SortOrder::PriceAsc),
            ..Default::default()
        };
        let result = run(seeded(), &query);
        let prices: Vec<f64> = result.items.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![60000.0, 90000.0, 120000.0]);
    }

    #[test]
    fn amenity_and_tag_match_is_substring_case_insensitive() {
        let query = ListingQuery {
            amenity: Some("pool".to_string()),
            ..Default::default()
        };
        let result = run(seeded(), &query);
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].id, 2);

        let query = ListingQuery {
            tag: Some("FAM".to_string()),
            ..Default::default()
        };
        let result = run(seeded(), &query);
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].id, 3);
    }

    #[test]
    fn availability_window_is_inclusive_and_requires_a_date() {
        let query = ListingQuery {
            available_after: NaiveDate::from_ymd_opt(2024, 6, 15),
            available_before: NaiveDate::from_ymd_opt(2024, 8, 31),
            ..Default::default()
        };
        let result = run(seeded(), &query);
        // Undated properties cannot satisfy a date window; id 5 is past it.
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].id, 4);
    }

    #[test]
    fn pagination_slices_and_counts_pages() {
        let properties: Vec<Property> = (1..=30).map(|id| prop(id, |_| {})).collect();

        let page1 = run(properties.clone(), &ListingQuery::default());
        assert_eq!(page1.items.len(), 12);
        assert_eq!(page1.total, 30);
        assert_eq!(page1.total_pages, 3);
        assert_eq!(page1.page, 1);

        let page3 = run(properties.clone(), &ListingQuery {
            page: Some(3),
            ..Default::default()
        });
        assert_eq!(page3.items.len(), 6);
        assert_eq!(page3.page, 3);

        let beyond = run(properties, &ListingQuery {
            page: Some(9),
            ..Default::default()
        });
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 30);
    }

    #[test]
    fn empty_match_set_has_zero_pages() {
        let query = ListingQuery {
            price_min: Some(9_000_000.0),
            ..Default::default()
        };
        let result = run(seeded(), &query);
        assert_eq!(result.total, 0);
        assert_eq!(result.total_pages, 0);
        assert!(result.items.is_empty());
    }

    #[test]
    fn equivalent_queries_share_a_cache_key() {
        let explicit = ListingQuery {
            page: Some(1),
            limit: Some(12),
            city: Some("".to_string()),
            property_type: Some("any".to_string()),
            ..Default::default()
        };
        let bare = ListingQuery::default();
        assert_eq!(explicit.cache_key(), bare.cache_key());

        let different = ListingQuery {
            page: Some(2),
            ..Default::default()
        };
        assert_ne!(bare.cache_key(), different.cache_key());
    }

    #[test]
    fn sort_order_parses_from_query_values() {
        assert_eq!("price_asc".parse::<SortOrder>().unwrap(), SortOrder::PriceAsc);
        assert_eq!("newest".parse::<SortOrder>().unwrap(), SortOrder::Newest);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
