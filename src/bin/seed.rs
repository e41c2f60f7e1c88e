use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use roots_rope_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_admin(&pool, "admin@rootsandrope.in", "admin123").await?;
    let user_id = ensure_user(&pool, "customer@example.com", "customer123").await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_admin(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    ensure_user_with_role(pool, email, password, "admin").await
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    ensure_user_with_role(pool, email, password, "user").await
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(row.0)
}

struct SeedProduct {
    name: &'static str,
    category: &'static str,
    unit: &'static str,
    description: &'static str,
    benefits: &'static [&'static str],
    featured: bool,
    // (pack size, price in paise, stock, default)
    variants: &'static [(&'static str, i64, i32, bool)],
}

const CATALOG: &[SeedProduct] = &[
    SeedProduct {
        name: "Cold-Pressed Groundnut Oil",
        category: "oils",
        unit: "ml",
        description: "Wood-pressed groundnut oil from single-origin kernels",
        benefits: &["No refining or bleaching", "Retains natural vitamin E"],
        featured: true,
        variants: &[("500 ml", 28500, 40, false), ("1 L", 54000, 25, true)],
    },
    SeedProduct {
        name: "A2 Gir Cow Ghee",
        category: "dairy",
        unit: "ml",
        description: "Bilona-churned ghee from grass-fed Gir cows",
        benefits: &["Traditional bilona method", "Rich nutty aroma"],
        featured: true,
        variants: &[("250 ml", 65000, 20, true), ("500 ml", 125000, 12, false)],
    },
    SeedProduct {
        name: "Country Sugar",
        category: "sweeteners",
        unit: "g",
        description: "Sun-dried palm jaggery powder, unrefined",
        benefits: &["No sulphur processing", "Iron-rich alternative to white sugar"],
        featured: false,
        variants: &[("500 g", 12000, 60, true), ("1 kg", 22000, 35, false)],
    },
    SeedProduct {
        name: "Foxtail Millet",
        category: "millets",
        unit: "g",
        description: "Stone-ground foxtail millet, ready to cook",
        benefits: &["High fibre", "Low glycemic index"],
        featured: false,
        variants: &[("500 g", 9500, 80, true)],
    },
    SeedProduct {
        name: "Wild Forest Honey",
        category: "honey",
        unit: "g",
        description: "Raw honey gathered from forest hives, unpasteurised",
        benefits: &["Single-harvest batches", "Never heated above hive temperature"],
        featured: true,
        variants: &[("250 g", 32500, 30, false), ("500 g", 60000, 18, true)],
    },
];

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for product in CATALOG {
        let benefits: Vec<String> = product.benefits.iter().map(|b| b.to_string()).collect();
        let (product_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, category, unit, description, benefits, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO UPDATE SET category = EXCLUDED.category
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.name)
        .bind(product.category)
        .bind(product.unit)
        .bind(product.description)
        .bind(serde_json::json!(benefits))
        .bind(product.featured)
        .fetch_one(pool)
        .await?;

        for (idx, (pack_size, price, stock, is_default)) in product.variants.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO product_variants
                    (id, product_id, pack_size, price, stock, is_default, display_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (product_id, pack_size) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(pack_size)
            .bind(price)
            .bind(stock)
            .bind(is_default)
            .bind(idx as i32)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded catalog");
    Ok(())
}
