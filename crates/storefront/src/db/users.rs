//! User queries for `PostgreSQL`.

use chrono::{DateTime, Utc};

use aurelia_core::{Email, UserId, UserRole};

use super::{PgStore, RepositoryError, Result, UserStore, conflict_on_unique};
use crate::models::{NewUser, User, UserCredentials};

/// Internal row type for user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    role: UserRole,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> std::result::Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO aurelia.app_user (email, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, role, created_at
            ",
        )
        .bind(user.email.as_str())
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(self.pool())
        .await
        .map_err(conflict_on_unique("email already exists"))?;

        row.try_into()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, name, role, created_at FROM aurelia.app_user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_user_with_password(&self, email: &Email) -> Result<Option<UserCredentials>> {
        let row: Option<CredentialsRow> = sqlx::query_as(
            r"
            SELECT id, email, name, role, created_at, password_hash
            FROM aurelia.app_user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| {
            Ok(UserCredentials {
                user: r.user.try_into()?,
                password_hash: r.password_hash,
            })
        })
        .transpose()
    }

    async fn set_user_role(&self, email: &Email, role: UserRole) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            UPDATE aurelia.app_user SET role = $2, updated_at = now()
            WHERE email = $1
            RETURNING id, email, name, role, created_at
            ",
        )
        .bind(email.as_str())
        .bind(role)
        .fetch_optional(self.pool())
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn count_users(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM aurelia.app_user")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
