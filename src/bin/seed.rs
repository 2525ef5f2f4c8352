use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use nutristore_api::{config::AppConfig, db::create_pool};
use serde_json::json;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_admin(&pool, "admin@example.com", "admin123").await?;
    seed_products(&pool).await?;
    seed_settings(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_admin(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO admin_users (id, email, password_hash, name, role)
        VALUES ($1, $2, $3, $4, 'admin')
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind("Store Admin")
    .fetch_optional(pool)
    .await?;

    let admin_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM admin_users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured admin {email}");
    Ok(admin_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // Prices in paise.
    let products = vec![
        (
            "Whey Protein Isolate 1kg",
            "whey-protein-isolate-1kg",
            "24g protein per serving, unflavoured",
            249_900_i64,
            120,
        ),
        (
            "Creatine Monohydrate 250g",
            "creatine-monohydrate-250g",
            "Micronised, 83 servings",
            89_900,
            200,
        ),
        (
            "Omega-3 Fish Oil 90 caps",
            "omega-3-fish-oil-90",
            "1000mg EPA/DHA softgels",
            64_900,
            150,
        ),
        (
            "Multivitamin 60 tabs",
            "multivitamin-60",
            "Daily micronutrient blend",
            49_900,
            300,
        ),
    ];

    for (title, handle, desc, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, title, handle, description, price, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (handle) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(handle)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_settings(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO store_settings (store_id, cod, defaults)
        VALUES ('default', $1, $2)
        ON CONFLICT (store_id) DO NOTHING
        "#,
    )
    .bind(json!({ "enabled": true, "min_amount": 0, "max_amount": 500000, "extra_charge": 0 }))
    .bind(json!({
        "payment_method": "cod",
        "currency": "INR",
        "default_shipping_cost": 0,
        "free_shipping_threshold": 99900
    }))
    .execute(pool)
    .await?;

    println!("Seeded settings");
    Ok(())
}
