//! User and password reset storage for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use brana_core::{Email, Role, UserId, Username};

use super::{EMAIL_TAKEN, PgStore, RepositoryError, USERNAME_TAKEN, UserStore, count};
use crate::models::{NewUser, ProfileChanges, User};

// =============================================================================
// Internal Row Types
// =============================================================================

const USER_COLUMNS: &str = "id, email, username, display_name, bio, profile_picture, phone, \
                            studio_address, role, created_at, updated_at";

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    username: Option<String>,
    display_name: Option<String>,
    bio: Option<String>,
    profile_picture: Option<String>,
    phone: Option<String>,
    studio_address: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let username = row
            .username
            .as_deref()
            .map(Username::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
            })?;
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            username,
            display_name: row.display_name,
            bio: row.bio,
            profile_picture: row.profile_picture,
            phone: row.phone,
            studio_address: row.studio_address,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Map a unique violation on `user` to the matching conflict message.
fn user_conflict(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let message = if db_err.constraint() == Some("user_username_key") {
            USERNAME_TAKEN
        } else {
            EMAIL_TAKEN
        };
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Repository
// =============================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO brana.user (email, username, display_name, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.email.as_str())
        .bind(new.username.as_ref().map(Username::as_str))
        .bind(new.display_name.as_deref())
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(user_conflict)?;

        row.try_into()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM brana.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM brana.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM brana.user WHERE username = $1"
        ))
        .bind(username.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM brana.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(r) => Ok(Some((r.user.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE brana.user SET updated_at = now()");
        if let Some(username) = &changes.username {
            qb.push(", username = ")
                .push_bind(username.as_ref().map(|u| u.as_str().to_owned()));
        }
        for (column, value) in [
            ("display_name", &changes.display_name),
            ("bio", &changes.bio),
            ("profile_picture", &changes.profile_picture),
            ("phone", &changes.phone),
            ("studio_address", &changes.studio_address),
        ] {
            if let Some(value) = value {
                qb.push(format!(", {column} = ")).push_bind(value.clone());
            }
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {USER_COLUMNS}"));

        let row = qb
            .build_query_as::<UserRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(user_conflict)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE brana.user SET role = $2, updated_at = now() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM brana.user ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_users(&self) -> Result<u64, RepositoryError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM brana.user")
            .fetch_one(self.pool())
            .await?;
        count(n)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, RepositoryError> {
        // Foreign keys carry the cascade: artworks, likes, comments, cart and
        // reset tokens go; orders and bought artworks lose the reference.
        let result = sqlx::query("DELETE FROM brana.user WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_reset_token(
        &self,
        user: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM brana.password_reset_token WHERE user_id = $1 AND used_at IS NULL")
            .bind(user)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO brana.password_reset_token (user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(user)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let user_id: Option<i32> = sqlx::query_scalar(
            "UPDATE brana.password_reset_token SET used_at = $2 \
             WHERE token_hash = $1 AND used_at IS NULL AND expires_at > $2 \
             RETURNING user_id",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        sqlx::query("UPDATE brana.user SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(UserId::new(user_id)))
    }
}
