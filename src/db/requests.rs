use crate::model::request::{NewRequest, Request, RequestDetail, RequestItem};

use super::{Store, StoreError, bounded};

impl Store {
    pub async fn list_requests(&self, employee_id: Option<u64>) -> Result<Vec<Request>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(Vec::new());
        };

        bounded(
            db.timeout,
            sqlx::query_as::<_, Request>(
                r#"
                SELECT id, employee_id, `type`, status, created, updated
                FROM requests
                WHERE (? IS NULL OR employee_id = ?)
                ORDER BY id DESC
                "#,
            )
            .bind(employee_id)
            .bind(employee_id)
            .fetch_all(&db.pool),
        )
        .await
    }

    pub async fn find_request(&self, id: u64) -> Result<Option<RequestDetail>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(None);
        };

        let request = bounded(
            db.timeout,
            sqlx::query_as::<_, Request>(
                "SELECT id, employee_id, `type`, status, created, updated FROM requests WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&db.pool),
        )
        .await?;

        let Some(request) = request else {
            return Ok(None);
        };

        let items = bounded(
            db.timeout,
            sqlx::query_as::<_, RequestItem>(
                "SELECT id, request_id, name, quantity FROM request_items WHERE request_id = ? ORDER BY id",
            )
            .bind(id)
            .fetch_all(&db.pool),
        )
        .await?;

        Ok(Some(RequestDetail { request, items }))
    }

    /// Inserts a request and its items atomically.
    /// Returns `None` when the employee does not exist.
    pub async fn create_request(&self, request: &NewRequest) -> Result<Option<u64>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(Some(0));
        };

        let mut tx = bounded(db.timeout, db.pool.begin()).await?;

        let matches = bounded(
            db.timeout,
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
                .bind(request.employee_id)
                .fetch_one(&mut *tx),
        )
        .await?;

        if matches == 0 {
            return Ok(None);
        }

        let request_id = bounded(
            db.timeout,
            sqlx::query("INSERT INTO requests (employee_id, `type`, status) VALUES (?, ?, 'Pending')")
                .bind(request.employee_id)
                .bind(&request.kind)
                .execute(&mut *tx),
        )
        .await?
        .last_insert_id();

        for item in &request.items {
            bounded(
                db.timeout,
                sqlx::query("INSERT INTO request_items (request_id, name, quantity) VALUES (?, ?, ?)")
                    .bind(request_id)
                    .bind(&item.name)
                    .bind(item.quantity)
                    .execute(&mut *tx),
            )
            .await?;
        }

        bounded(db.timeout, tx.commit()).await?;
        Ok(Some(request_id))
    }

    /// Deletes a request; its items cascade.
    pub async fn delete_request(&self, id: u64) -> Result<bool, StoreError> {
        let Some(db) = self.live() else {
            return Ok(false);
        };

        let result = bounded(
            db.timeout,
            sqlx::query("DELETE FROM requests WHERE id = ?")
                .bind(id)
                .execute(&db.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
