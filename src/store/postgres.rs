//! Postgres-backed store. Queries are built at runtime and bound positionally;
//! enum columns are stored as TEXT and parsed back through the closed domain
//! enums.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{GeoPoint, Listing, ListingStatus, Role, User};
use crate::query::SearchFilters;

use super::{CredentialStore, ListingStore, StoreError};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Idempotent schema bootstrap.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS "users" (
                "id" UUID PRIMARY KEY,
                "name" TEXT NOT NULL,
                "email" TEXT NOT NULL UNIQUE,
                "password_hash" TEXT NOT NULL,
                "role" TEXT NOT NULL,
                "phone" TEXT NOT NULL DEFAULT '',
                "agent_license" TEXT NOT NULL DEFAULT '',
                "verified" BOOLEAN NOT NULL DEFAULT FALSE,
                "created_at" TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS "properties" (
                "id" UUID PRIMARY KEY,
                "title" TEXT NOT NULL,
                "description" TEXT NOT NULL,
                "price" DOUBLE PRECISION NOT NULL,
                "type" TEXT NOT NULL,
                "property_type" TEXT NOT NULL,
                "bedrooms" INTEGER NOT NULL DEFAULT 0,
                "bathrooms" INTEGER NOT NULL DEFAULT 0,
                "sqft" DOUBLE PRECISION,
                "address" TEXT NOT NULL,
                "city" TEXT NOT NULL,
                "state" TEXT NOT NULL,
                "zip_code" TEXT,
                "images" TEXT[] NOT NULL DEFAULT '{}',
                "amenities" TEXT[] NOT NULL DEFAULT '{}',
                "status" TEXT NOT NULL DEFAULT 'draft',
                "owner" UUID NOT NULL REFERENCES "users"("id"),
                "lat" DOUBLE PRECISION,
                "lng" DOUBLE PRECISION,
                "pet_friendly" BOOLEAN NOT NULL DEFAULT FALSE,
                "furnished" TEXT NOT NULL DEFAULT 'unfurnished',
                "created_at" TIMESTAMPTZ NOT NULL,
                "updated_at" TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS "properties_search_idx"
               ON "properties" ("city", "price", "type", "status")"#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(r#"CREATE INDEX IF NOT EXISTS "properties_owner_idx" ON "properties" ("owner")"#)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn parse_col<T: FromStr>(value: String, column: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("unexpected {} value: {}", column, value)))
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: parse_col::<Role>(row.try_get("role")?, "role")?,
        phone: row.try_get("phone")?,
        agent_license: row.try_get("agent_license")?,
        verified: row.try_get("verified")?,
        created_at: row.try_get("created_at")?,
    })
}

fn listing_from_row(row: &PgRow) -> Result<Listing, StoreError> {
    let lat: Option<f64> = row.try_get("lat")?;
    let lng: Option<f64> = row.try_get("lng")?;
    let bedrooms: i32 = row.try_get("bedrooms")?;
    let bathrooms: i32 = row.try_get("bathrooms")?;

    Ok(Listing {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        kind: parse_col(row.try_get("type")?, "type")?,
        property_type: parse_col(row.try_get("property_type")?, "property_type")?,
        bedrooms: bedrooms.max(0) as u32,
        bathrooms: bathrooms.max(0) as u32,
        sqft: row.try_get("sqft")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        zip_code: row.try_get("zip_code")?,
        images: row.try_get("images")?,
        amenities: row.try_get("amenities")?,
        status: parse_col(row.try_get("status")?, "status")?,
        owner: row.try_get("owner")?,
        geo: match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        },
        pet_friendly: row.try_get("pet_friendly")?,
        furnished: parse_col(row.try_get("furnished")?, "furnished")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Bind a JSON-typed filter parameter to the next placeholder.
fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    value: &Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match value {
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else {
                q.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => q.bind(s.clone()),
        _ => {
            let none: Option<String> = None;
            q.bind(none)
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO "users"
                ("id", "name", "email", "password_hash", "role", "phone",
                 "agent_license", "verified", "created_at")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .bind(&user.agent_license)
        .bind(user.verified)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(r#"SELECT * FROM "users" WHERE "email" = $1"#)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(r#"SELECT * FROM "users" WHERE "id" = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query(r#"SELECT * FROM "users" WHERE "id" = ANY($1)"#)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }
}

#[async_trait]
impl ListingStore for PgStore {
    async fn insert_listing(&self, listing: Listing) -> Result<Listing, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "properties"
                ("id", "title", "description", "price", "type", "property_type",
                 "bedrooms", "bathrooms", "sqft", "address", "city", "state",
                 "zip_code", "images", "amenities", "status", "owner", "lat",
                 "lng", "pet_friendly", "furnished", "created_at", "updated_at")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)
            "#,
        )
        .bind(listing.id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(listing.kind.as_str())
        .bind(listing.property_type.as_str())
        .bind(listing.bedrooms as i32)
        .bind(listing.bathrooms as i32)
        .bind(listing.sqft)
        .bind(&listing.address)
        .bind(&listing.city)
        .bind(&listing.state)
        .bind(&listing.zip_code)
        .bind(&listing.images)
        .bind(&listing.amenities)
        .bind(listing.status.as_str())
        .bind(listing.owner)
        .bind(listing.geo.map(|g| g.lat))
        .bind(listing.geo.map(|g| g.lng))
        .bind(listing.pet_friendly)
        .bind(listing.furnished.as_str())
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(listing)
    }

    async fn listing_by_id(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let row = sqlx::query(r#"SELECT * FROM "properties" WHERE "id" = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(listing_from_row).transpose()
    }

    async fn update_listing(&self, listing: Listing) -> Result<Listing, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE "properties" SET
                "title" = $2, "description" = $3, "price" = $4, "type" = $5,
                "property_type" = $6, "bedrooms" = $7, "bathrooms" = $8,
                "sqft" = $9, "address" = $10, "city" = $11, "state" = $12,
                "zip_code" = $13, "images" = $14, "amenities" = $15,
                "status" = $16, "lat" = $17, "lng" = $18, "pet_friendly" = $19,
                "furnished" = $20, "updated_at" = $21
            WHERE "id" = $1
            "#,
        )
        .bind(listing.id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(listing.kind.as_str())
        .bind(listing.property_type.as_str())
        .bind(listing.bedrooms as i32)
        .bind(listing.bathrooms as i32)
        .bind(listing.sqft)
        .bind(&listing.address)
        .bind(&listing.city)
        .bind(&listing.state)
        .bind(&listing.zip_code)
        .bind(&listing.images)
        .bind(&listing.amenities)
        .bind(listing.status.as_str())
        .bind(listing.geo.map(|g| g.lat))
        .bind(listing.geo.map(|g| g.lng))
        .bind(listing.pet_friendly)
        .bind(listing.furnished.as_str())
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Property"));
        }
        Ok(listing)
    }

    async fn delete_listing(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"DELETE FROM "properties" WHERE "id" = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn listings_by_owner(&self, owner: Uuid) -> Result<Vec<Listing>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT * FROM "properties" WHERE "owner" = $1 ORDER BY "created_at" DESC"#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(listing_from_row).collect()
    }

    async fn search_listings(
        &self,
        filters: &SearchFilters,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Listing>, u64), StoreError> {
        let (where_sql, params) = filters.to_where_sql();
        // Clamped to bigint range so an extreme page number stays a valid OFFSET
        let offset = page
            .saturating_sub(1)
            .saturating_mul(page_size)
            .min(i64::MAX as u64);

        let select_sql = format!(
            r#"SELECT * FROM "properties" WHERE {} ORDER BY "created_at" DESC, "id" LIMIT {} OFFSET {}"#,
            where_sql, page_size, offset
        );
        let mut select = sqlx::query(&select_sql);
        for param in &params {
            select = bind_value(select, param);
        }
        let rows = select.fetch_all(&self.pool).await?;
        let items = rows.iter().map(listing_from_row).collect::<Result<Vec<_>, _>>()?;

        let count_sql = format!(r#"SELECT COUNT(*) AS "count" FROM "properties" WHERE {}"#, where_sql);
        let mut count = sqlx::query(&count_sql);
        for param in &params {
            count = bind_value(count, param);
        }
        let total: i64 = count.fetch_one(&self.pool).await?.try_get("count")?;

        Ok((items, total.max(0) as u64))
    }

    async fn recent_published(&self, limit: u64) -> Result<Vec<Listing>, StoreError> {
        let sql = format!(
            r#"SELECT * FROM "properties" WHERE "status" = $1 ORDER BY "created_at" DESC LIMIT {}"#,
            limit
        );
        let rows = sqlx::query(&sql)
            .bind(ListingStatus::Published.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(listing_from_row).collect()
    }
}
