use std::sync::Arc;

use propbase::app_state::AppState;
use propbase::cache::{MemoryCache, NoopCache, ResultCache};
use propbase::config::{AuthConfig, CacheConfig, Config, DatabaseConfig, ServerConfig};
use propbase::db::Database;
use propbase::error::AppError;
use propbase::models::{NewProperty, PropertyPatch};
use propbase::query::{ListingQuery, SortOrder};

fn test_config() -> Config {
    Config {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        cache: CacheConfig {
            capacity: 64,
            ttl_secs: 60,
        },
        auth: AuthConfig {
            jwt_secret: "scenario-secret".to_string(),
        },
    }
}

async fn test_app(cache: Arc<dyn ResultCache>) -> AppState {
    let db = Arc::new(Database::in_memory().await.unwrap());
    AppState::assemble(db, cache, test_config())
}

fn listing(title: &str, city: &str, price: f64) -> NewProperty {
    NewProperty {
        title: title.to_string(),
        city: city.to_string(),
        price,
        ..Default::default()
    }
}

#[tokio::test]
async fn register_login_and_verify_round_trip() {
    let app = test_app(Arc::new(NoopCache)).await;

    let registered = app
        .auth
        .register("Ana", "a@x.com", "correct-horse")
        .await
        .unwrap();

    let wrong = app.auth.login("a@x.com", "wrong-password").await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

    let session = app.auth.login("a@x.com", "correct-horse").await.unwrap();
    let claims = app.auth.verify(&session.token).unwrap();
    assert_eq!(claims.user_id().unwrap(), registered.user.id);
    assert_eq!(claims.email, "a@x.com");
}

#[tokio::test]
async fn listing_lifecycle_with_favorites_and_recommendations() {
    let app = test_app(Arc::new(MemoryCache::new(64))).await;

    let ana = app
        .auth
        .register("Ana", "a@x.com", "correct-horse")
        .await
        .unwrap();
    let ben = app
        .auth
        .register("Ben", "b@x.com", "correct-horse")
        .await
        .unwrap();

    let p1 = app
        .listings
        .create(listing("Lake cottage", "Lakeview", 100000.0), ana.user.id)
        .await
        .unwrap();

    app.relationships
        .add_favorite(ana.user.id, p1.property.id)
        .await
        .unwrap();
    let favorites = app.relationships.list_favorites(ana.user.id).await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].property.id, p1.property.id);

    app.relationships
        .recommend(ana.user.id, "b@x.com", p1.property.id)
        .await
        .unwrap();
    let received = app
        .relationships
        .list_recommendations_received(ben.user.id)
        .await
        .unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].property.id, p1.property.id);

    app.listings
        .delete(p1.property.id, ana.user.id)
        .await
        .unwrap();

    assert!(app
        .relationships
        .list_favorites(ana.user.id)
        .await
        .unwrap()
        .is_empty());
    assert!(app
        .relationships
        .list_recommendations_received(ben.user.id)
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        app.listings.get(p1.property.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn price_band_filter_returns_sorted_band() {
    let app = test_app(Arc::new(MemoryCache::new(64))).await;
    let ana = app
        .auth
        .register("Ana", "a@x.com", "correct-horse")
        .await
        .unwrap();

    for price in [40000.0, 60000.0, 90000.0, 120000.0, 200000.0] {
        app.listings
            .create(
                listing(&format!("Listing at {}", price), "Lakeview", price),
                ana.user.id,
            )
            .await
            .unwrap();
    }

    let page = app
        .listings
        .list(&ListingQuery {
            price_min: Some(50000.0),
            price_max: Some(150000.0),
            sort: Some(SortOrder::PriceAsc),
            ..Default::default()
        })
        .await
        .unwrap();

    let prices: Vec<f64> = page.properties.iter().map(|p| p.property.price).collect();
    assert_eq!(prices, vec![60000.0, 90000.0, 120000.0]);
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn pagination_over_thirty_matching_properties() {
    let app = test_app(Arc::new(NoopCache)).await;
    let ana = app
        .auth
        .register("Ana", "a@x.com", "correct-horse")
        .await
        .unwrap();

    for i in 0..30 {
        app.listings
            .create(
                listing(&format!("Listing {}", i), "Lakeview", 100000.0),
                ana.user.id,
            )
            .await
            .unwrap();
    }

    let page1 = app.listings.list(&ListingQuery::default()).await.unwrap();
    assert_eq!(page1.properties.len(), 12);
    assert_eq!(page1.total, 30);
    assert_eq!(page1.total_pages, 3);

    let page3 = app
        .listings
        .list(&ListingQuery {
            page: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page3.properties.len(), 6);
    assert_eq!(page3.page, 3);
}

#[tokio::test]
async fn update_merges_partially_and_keeps_the_rest() {
    let app = test_app(Arc::new(MemoryCache::new(64))).await;
    let ana = app
        .auth
        .register("Ana", "a@x.com", "correct-horse")
        .await
        .unwrap();

    let mut data = listing("Cottage", "Lakeview", 100000.0);
    data.bedrooms = 3;
    let created = app.listings.create(data, ana.user.id).await.unwrap();

    let updated = app
        .listings
        .update(
            created.property.id,
            PropertyPatch {
                price: Some(95000.0),
                furnished: Some("Yes".to_string()),
                ..Default::default()
            },
            ana.user.id,
        )
        .await
        .unwrap();

    assert_eq!(updated.property.price, 95000.0);
    assert_eq!(updated.property.furnished, "Yes");
    assert_eq!(updated.property.bedrooms, 3);
    assert_eq!(updated.property.title, "Cottage");
    assert!(updated.property.updated_at >= created.property.updated_at);

    // The refreshed listing is what readers see afterward.
    let fetched = app.listings.get(created.property.id).await.unwrap();
    assert_eq!(fetched.property.price, 95000.0);
}

#[tokio::test]
async fn cache_presence_does_not_change_results() {
    let db = Arc::new(Database::in_memory().await.unwrap());
    let cached = AppState::assemble(
        db.clone(),
        Arc::new(MemoryCache::new(64)),
        test_config(),
    );
    let uncached = AppState::assemble(db.clone(), Arc::new(NoopCache), test_config());

    let ana = cached
        .auth
        .register("Ana", "a@x.com", "correct-horse")
        .await
        .unwrap();
    for price in [40000.0, 90000.0, 150000.0] {
        cached
            .listings
            .create(
                listing(&format!("Listing at {}", price), "Lakeview", price),
                ana.user.id,
            )
            .await
            .unwrap();
    }

    let queries = vec![
        ListingQuery::default(),
        ListingQuery {
            price_min: Some(50000.0),
            sort: Some(SortOrder::PriceDesc),
            ..Default::default()
        },
        ListingQuery {
            city: Some("lake".to_string()),
            ..Default::default()
        },
    ];

    for query in queries {
        // Run the cached side twice so the second read is a cache hit.
        let warm = cached.listings.list(&query).await.unwrap();
        let hit = cached.listings.list(&query).await.unwrap();
        let cold = uncached.listings.list(&query).await.unwrap();

        let warm = serde_json::to_value(&warm).unwrap();
        let hit = serde_json::to_value(&hit).unwrap();
        let cold = serde_json::to_value(&cold).unwrap();
        assert_eq!(warm, cold);
        assert_eq!(hit, cold);
    }
}

#[tokio::test]
async fn file_backed_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("propbase.db").display());

    let db = Database::new(&url).await.unwrap();
    db.init().await.unwrap();
    db.insert_user("Ana", "a@x.com", "hash").await.unwrap();
    db.pool.close().await;

    let reopened = Database::new(&url).await.unwrap();
    reopened.init().await.unwrap();
    let user = reopened.find_user_by_email("a@x.com").await.unwrap();
    assert!(user.is_some());
}
