//! `PostgreSQL` user store.
//!
//! Cart, buy cart and purchase history are JSONB arrays on the user row.
//! Each mutation is one `UPDATE` so appends and removals are atomic per
//! user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, query, query_as, query_scalar};
use uuid::Uuid;

use bagrit_core::{CartItem, Email, ItemList, PurchaseRecord, UserId};

use super::{ListEdit, RepositoryError, UserStore, map_unique_violation};
use crate::models::user::{NewUser, User};

const USER_COLUMNS: &str = "id, email, username, password_hash, verified, cart, buy_cart, \
                            bought_products, created_at, updated_at";

const EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)";

const MARK_VERIFIED_SQL: &str =
    "UPDATE users SET verified = true, updated_at = now() WHERE email = $1";

const SET_PASSWORD_SQL: &str =
    "UPDATE users SET password_hash = $2, updated_at = now() WHERE email = $1";

const PUSH_CART_SQL: &str = "UPDATE users SET cart = cart || jsonb_build_array($2::jsonb), \
                             updated_at = now() WHERE email = $1";

const PUSH_BUY_CART_SQL: &str = "UPDATE users \
                                 SET buy_cart = buy_cart || jsonb_build_array($2::jsonb), \
                                 updated_at = now() WHERE email = $1";

const CLEAR_CART_SQL: &str =
    "UPDATE users SET cart = '[]'::jsonb, updated_at = now() WHERE email = $1";

const CLEAR_BUY_CART_SQL: &str =
    "UPDATE users SET buy_cart = '[]'::jsonb, updated_at = now() WHERE email = $1";

const REMOVE_CART_ITEM_SQL: &str = "UPDATE users SET cart = cart - $2::int, updated_at = now() \
                                    WHERE email = $1 AND $2::int < jsonb_array_length(cart)";

const PUSH_PURCHASE_SQL: &str = "UPDATE users \
                                 SET bought_products = bought_products || jsonb_build_array($2::jsonb), \
                                 updated_at = now() WHERE email = $1";

const POP_PURCHASE_SQL: &str = "UPDATE users SET bought_products = bought_products - (-1), \
                                updated_at = now() \
                                WHERE email = $1 AND jsonb_array_length(bought_products) > 0";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    verified: bool,
    cart: Json<Vec<CartItem>>,
    buy_cart: Json<Vec<CartItem>>,
    bought_products: Json<Vec<PurchaseRecord>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            username: row.username,
            password_hash: row.password_hash,
            verified: row.verified,
            cart: row.cart.0,
            buy_cart: row.buy_cart.0,
            bought_products: row.bought_products.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// User store backed by the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        Ok(query_scalar::<Postgres, bool>(EXISTS_SQL)
            .bind(email.as_str())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_one(&self, sql: &str, email: &Email) -> Result<bool, RepositoryError> {
        let result = query::<Postgres>(sql)
            .bind(email.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = query_as::<Postgres, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users (email, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        let row = query_as::<Postgres, UserRow>(&sql)
            .bind(user.email.as_str())
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "email"))?;

        User::try_from(row)
    }

    async fn mark_verified(&self, email: &Email) -> Result<bool, RepositoryError> {
        self.update_one(MARK_VERIFIED_SQL, email).await
    }

    async fn set_password_hash(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let result = query::<Postgres>(SET_PASSWORD_SQL)
            .bind(email.as_str())
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn push_item(
        &self,
        email: &Email,
        list: ItemList,
        item: &CartItem,
    ) -> Result<bool, RepositoryError> {
        let sql = match list {
            ItemList::Cart => PUSH_CART_SQL,
            ItemList::BuyCart => PUSH_BUY_CART_SQL,
        };
        let result = query::<Postgres>(sql)
            .bind(email.as_str())
            .bind(Json(item))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_list(&self, email: &Email, list: ItemList) -> Result<bool, RepositoryError> {
        let sql = match list {
            ItemList::Cart => CLEAR_CART_SQL,
            ItemList::BuyCart => CLEAR_BUY_CART_SQL,
        };
        self.update_one(sql, email).await
    }

    async fn remove_cart_item(
        &self,
        email: &Email,
        index: usize,
    ) -> Result<ListEdit, RepositoryError> {
        // Indexes beyond i32 can never be in range of a JSONB array.
        if let Ok(index) = i32::try_from(index) {
            let result = query::<Postgres>(REMOVE_CART_ITEM_SQL)
                .bind(email.as_str())
                .bind(index)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() > 0 {
                return Ok(ListEdit::Applied);
            }
        }

        if self.exists(email).await? {
            Ok(ListEdit::OutOfRange)
        } else {
            Ok(ListEdit::UserMissing)
        }
    }

    async fn push_purchase(
        &self,
        email: &Email,
        record: &PurchaseRecord,
    ) -> Result<bool, RepositoryError> {
        let result = query::<Postgres>(PUSH_PURCHASE_SQL)
            .bind(email.as_str())
            .bind(Json(record))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn pop_purchase(&self, email: &Email) -> Result<ListEdit, RepositoryError> {
        if self.update_one(POP_PURCHASE_SQL, email).await? {
            return Ok(ListEdit::Applied);
        }

        if self.exists(email).await? {
            Ok(ListEdit::OutOfRange)
        } else {
            Ok(ListEdit::UserMissing)
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        query::<Postgres>("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
