use crate::model::{
    account::{Account, NewAccount, RefreshTokenRecord},
    role::Role,
};

use super::{Store, StoreError, bounded};

const ACCOUNT_COLUMNS: &str = r#"
    id, email, password_hash, title, first_name, last_name, role,
    verification_token, verified, is_active, created, updated
"#;

const COUNT_ACCOUNTS_LOCKED: &str = "SELECT COUNT(*) FROM accounts FOR UPDATE";

impl Store {
    /// Inserts the account and decides its role in the same transaction.
    ///
    /// The locking count holds the accounts index until commit, so of two
    /// concurrent first registrations only one sees an empty table.
    pub async fn register_account(&self, account: &NewAccount) -> Result<(u64, Role), StoreError> {
        let Some(db) = self.live() else {
            return Ok((0, Role::User));
        };

        let mut tx = bounded(db.timeout, db.pool.begin()).await?;

        let existing = bounded(
            db.timeout,
            sqlx::query_scalar::<_, i64>(COUNT_ACCOUNTS_LOCKED).fetch_one(&mut *tx),
        )
        .await?;
        let role = Role::for_new_account(existing);

        let result = bounded(
            db.timeout,
            sqlx::query(
                r#"
                INSERT INTO accounts
                    (email, password_hash, title, first_name, last_name, role, verification_token, is_active)
                VALUES (?, ?, ?, ?, ?, ?, ?, FALSE)
                "#,
            )
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.title)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(role.as_ref())
            .bind(&account.verification_token)
            .execute(&mut *tx),
        )
        .await?;

        bounded(db.timeout, tx.commit()).await?;
        Ok((result.last_insert_id(), role))
    }

    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(None);
        };

        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?");
        bounded(
            db.timeout,
            sqlx::query_as::<_, Account>(&sql)
                .bind(email)
                .fetch_optional(&db.pool),
        )
        .await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(Vec::new());
        };

        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id");
        bounded(
            db.timeout,
            sqlx::query_as::<_, Account>(&sql).fetch_all(&db.pool),
        )
        .await
    }

    /// Marks the account owning `token` as verified and active.
    pub async fn verify_email(&self, token: &str) -> Result<bool, StoreError> {
        let Some(db) = self.live() else {
            return Ok(false);
        };

        let result = bounded(
            db.timeout,
            sqlx::query(
                r#"
                UPDATE accounts
                SET verified = NOW(), is_active = TRUE, verification_token = NULL, updated = NOW()
                WHERE verification_token = ?
                "#,
            )
            .bind(token)
            .execute(&db.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn store_refresh_token(
        &self,
        account_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> Result<(), StoreError> {
        let Some(db) = self.live() else {
            return Ok(());
        };

        bounded(
            db.timeout,
            sqlx::query(
                r#"
                INSERT INTO refresh_tokens (account_id, jti, expires_at)
                VALUES (?, ?, FROM_UNIXTIME(?))
                "#,
            )
            .bind(account_id)
            .bind(jti)
            .bind(expires_at)
            .execute(&db.pool),
        )
        .await?;

        Ok(())
    }

    pub async fn find_refresh_token(
        &self,
        jti: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(None);
        };

        bounded(
            db.timeout,
            sqlx::query_as::<_, RefreshTokenRecord>(
                r#"
                SELECT account_id, revoked
                FROM refresh_tokens
                WHERE jti = ? AND expires_at > NOW()
                "#,
            )
            .bind(jti)
            .fetch_optional(&db.pool),
        )
        .await
    }

    /// Revokes a refresh token. Idempotent; returns whether a live token was revoked.
    pub async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, StoreError> {
        let Some(db) = self.live() else {
            return Ok(false);
        };

        let result = bounded(
            db.timeout,
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE")
                .bind(jti)
                .execute(&db.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_account_role_is_decided_under_a_row_lock() {
        assert!(COUNT_ACCOUNTS_LOCKED.ends_with("FOR UPDATE"));
    }

    #[actix_web::test]
    async fn inert_store_registers_nobody() {
        let account = NewAccount {
            email: "first@company.com".into(),
            password_hash: String::new(),
            title: None,
            first_name: "First".into(),
            last_name: "Account".into(),
            verification_token: "token".into(),
        };

        let (id, role) = Store::Unavailable.register_account(&account).await.unwrap();

        assert_eq!(id, 0);
        assert_eq!(role, Role::User);
    }
}
