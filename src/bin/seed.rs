// Seeds a local database with demo accounts and listings for development.

use chrono::NaiveDate;

use propbase::{
    app_state::AppState, config::Config, error::AppResult, models::NewProperty,
};

fn ok<T>(result: AppResult<T>) -> anyhow::Result<T> {
    result.map_err(|e| anyhow::anyhow!("{}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let state = AppState::new(config).await?;

    if state.db.find_user_by_email("ana@propbase.dev").await?.is_some() {
        println!("Database already seeded, nothing to do");
        return Ok(());
    }

    let ana = ok(state
        .auth
        .register("Ana Alvarez", "ana@propbase.dev", "demo-password")
        .await)?;
    let ben = ok(state
        .auth
        .register("Ben Okafor", "ben@propbase.dev", "demo-password")
        .await)?;

    let listings = vec![
        NewProperty {
            title: "Sunny two-bedroom apartment".to_string(),
            description: Some("Bright corner unit close to the waterfront.".to_string()),
            price: 265000.0,
            area: 870,
            bedrooms: 2,
            bathrooms: 1,
            city: "Lakeview".to_string(),
            state: "MN".to_string(),
            country: "USA".to_string(),
            property_type: "Apartment".to_string(),
            furnished: "Partially".to_string(),
            listing_type: "Sale".to_string(),
            amenities: vec!["Balcony".to_string(), "Parking".to_string()],
            tags: vec!["waterfront".to_string(), "bright".to_string()],
            available_from: NaiveDate::from_ymd_opt(2026, 9, 1),
            ..Default::default()
        },
        NewProperty {
            title: "Family house with garden".to_string(),
            description: Some("Quiet street, renovated kitchen, large garden.".to_string()),
            price: 489000.0,
            area: 2150,
            bedrooms: 4,
            bathrooms: 2,
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            country: "USA".to_string(),
            property_type: "House".to_string(),
            furnished: "No".to_string(),
            listing_type: "Sale".to_string(),
            amenities: vec!["Garden".to_string(), "Garage".to_string(), "Fireplace".to_string()],
            tags: vec!["family".to_string()],
            ..Default::default()
        },
        NewProperty {
            title: "Downtown studio for rent".to_string(),
            price: 1450.0,
            area: 420,
            bedrooms: 1,
            bathrooms: 1,
            city: "Lakeview".to_string(),
            state: "MN".to_string(),
            country: "USA".to_string(),
            property_type: "Condo".to_string(),
            furnished: "Yes".to_string(),
            listing_type: "Rent".to_string(),
            amenities: vec!["Gym".to_string(), "Elevator".to_string()],
            tags: vec!["downtown".to_string()],
            available_from: NaiveDate::from_ymd_opt(2026, 8, 15),
            ..Default::default()
        },
    ];

    let mut created = Vec::new();
    for (index, listing) in listings.into_iter().enumerate() {
        let owner = if index % 2 == 0 { ana.user.id } else { ben.user.id };
        created.push(ok(state.listings.create(listing, owner).await)?);
    }

    ok(state
        .relationships
        .add_favorite(ben.user.id, created[0].property.id)
        .await)?;
    ok(state
        .relationships
        .recommend(ana.user.id, "ben@propbase.dev", created[1].property.id)
        .await)?;

    println!("Seeded {} listings for 2 demo users", created.len());
    println!("  ana@propbase.dev / demo-password");
    println!("  ben@propbase.dev / demo-password");

    Ok(())
}
