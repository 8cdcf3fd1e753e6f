//! Comment queries.

use repairdesk_core::db::unix_timestamp;

use super::db::{DatabaseError, RepairDatabase};
use super::models::{Comment, CommentView};

/// Comments with the author's name, or `Unknown` when the author is gone.
const VIEW_SELECT: &str = "SELECT c.*, COALESCE(u.full_name, 'Unknown') AS master_name \
     FROM comments c LEFT JOIN users u ON u.user_id = c.master_id";

impl RepairDatabase {
    /// Attach a comment to an existing request.
    ///
    /// The existence check and the insert are one statement; a missing
    /// request yields [`DatabaseError::NotFound`].
    pub async fn create_comment(
        &self,
        request_id: i64,
        author_id: i64,
        message: &str,
    ) -> Result<CommentView, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO comments (message, master_id, request_id, created_at) \
             SELECT ?, ?, request_id, ? FROM repair_requests WHERE request_id = ?",
        )
        .bind(message)
        .bind(author_id)
        .bind(unix_timestamp())
        .bind(request_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Request {request_id}")));
        }

        self.get_comment_view(result.last_insert_rowid()).await
    }

    /// Get a comment by ID.
    pub async fn get_comment(&self, id: i64) -> Result<Comment, DatabaseError> {
        sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE comment_id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Comment {id}")))
    }

    pub async fn get_comment_view(&self, id: i64) -> Result<CommentView, DatabaseError> {
        let sql = format!("{VIEW_SELECT} WHERE c.comment_id = ?");
        sqlx::query_as::<_, CommentView>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Comment {id}")))
    }

    /// Comments on a request, newest first.
    pub async fn list_comments(&self, request_id: i64) -> Result<Vec<CommentView>, DatabaseError> {
        let sql = format!(
            "{VIEW_SELECT} WHERE c.request_id = ? ORDER BY c.created_at DESC, c.comment_id DESC"
        );
        let comments = sqlx::query_as::<_, CommentView>(&sql)
            .bind(request_id)
            .fetch_all(self.pool())
            .await?;
        Ok(comments)
    }

    pub async fn delete_comment(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM comments WHERE comment_id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
