//! `PostgreSQL` product catalog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, query, query_as};
use uuid::Uuid;

use bagrit_core::ProductId;

use super::{ProductStore, RepositoryError, map_unique_violation};
use crate::models::product::Product;

const LIST_SQL: &str = "SELECT id, title, description, price, image, category, details, created_at \
                        FROM products ORDER BY created_at, id";

const GET_SQL: &str = "SELECT id, title, description, price, image, category, details, created_at \
                       FROM products WHERE id = $1";

// strpos instead of ILIKE so '%' and '_' in the needle match literally.
const SEARCH_SQL: &str = "SELECT id, title, description, price, image, category, details, created_at \
                          FROM products WHERE strpos(lower(title), lower($1)) > 0 \
                          ORDER BY created_at, id";

const INSERT_SQL: &str = "INSERT INTO products \
                          (id, title, description, price, image, category, details, created_at) \
                          VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    description: String,
    price: Decimal,
    image: Option<String>,
    category: Option<String>,
    details: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            title: row.title,
            description: row.description,
            price: row.price,
            image: row.image,
            category: row.category,
            created_at: row.created_at,
            details: row.details.0,
        }
    }
}

/// Product store backed by the `products` table.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    /// Create a new product store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a catalog entry. Used by the seeding CLI; the API itself never
    /// writes products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is already used.
    pub async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        query::<Postgres>(INSERT_SQL)
            .bind(product.id)
            .bind(&product.title)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.image.as_deref())
            .bind(product.category.as_deref())
            .bind(Json(&product.details))
            .bind(product.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "product"))?;
        Ok(())
    }

    /// Remove every catalog entry, returning how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self) -> Result<u64, RepositoryError> {
        let result = query::<Postgres>("DELETE FROM products")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = query_as::<Postgres, ProductRow>(LIST_SQL)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = query_as::<Postgres, ProductRow>(GET_SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    async fn search_title(&self, needle: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = query_as::<Postgres, ProductRow>(SEARCH_SQL)
            .bind(needle)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }
}
