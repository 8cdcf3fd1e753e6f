//! User queries.

use super::db::{DatabaseError, RepairDatabase};
use super::models::User;
use crate::policy::Role;

/// Fields for a new user row. The password is already hashed.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub full_name: &'a str,
    pub phone: &'a str,
    pub login: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

impl RepairDatabase {
    /// Insert a user. A taken login yields [`DatabaseError::Conflict`].
    pub async fn create_user(&self, user: &NewUser<'_>) -> Result<User, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO users (full_name, phone, login, password_hash, role) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.full_name)
        .bind(user.phone)
        .bind(user.login)
        .bind(user.password_hash)
        .bind(user.role)
        .execute(self.pool())
        .await?;

        self.get_user(result.last_insert_rowid()).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: i64) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Find a user by exact, case-sensitive login.
    pub async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE login = ?")
            .bind(login)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY user_id")
            .fetch_all(self.pool())
            .await?;
        Ok(users)
    }

    /// Users holding `role`, ordered by name.
    pub async fn list_users_with_role(&self, role: Role) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE role = ? ORDER BY full_name, user_id",
        )
        .bind(role)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }

    pub async fn count_users(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    pub async fn count_users_with_role(&self, role: Role) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Delete a user. Requests and comments keep their (now dangling) ids.
    pub async fn delete_user(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
