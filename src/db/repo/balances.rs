use super::{parse_decimal, Repository};
use crate::domain::{Decimal, UserId};
use crate::store::{BalanceStore, StoreError};
use async_trait::async_trait;
use sqlx::Row;

#[async_trait]
impl BalanceStore for Repository {
    async fn get_balance(&self, user: &UserId) -> Result<Decimal, StoreError> {
        let row = sqlx::query("SELECT tokens FROM token_balances WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let tokens: String = row.try_get("tokens")?;
                parse_decimal(user.as_str(), "tokens", &tokens)
            }
            None => Ok(Decimal::zero()),
        }
    }

    async fn set_balance(&self, user: &UserId, tokens: Decimal) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO token_balances (user_id, tokens, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                tokens = excluded.tokens,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user.as_str())
        .bind(tokens.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_to_balance(&self, user: &UserId, delta: Decimal) -> Result<Decimal, StoreError> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        // Writing first takes the database write lock before the read, so
        // no other writer can slip in between the read and the update.
        sqlx::query(
            r#"
            INSERT INTO token_balances (user_id, tokens, updated_at)
            VALUES (?, '0', ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let raw: String = sqlx::query("SELECT tokens FROM token_balances WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_one(&mut *tx)
            .await?
            .try_get("tokens")?;
        let balance = parse_decimal(user.as_str(), "tokens", &raw)? + delta;

        sqlx::query("UPDATE token_balances SET tokens = ?, updated_at = ? WHERE user_id = ?")
            .bind(balance.to_canonical_string())
            .bind(now)
            .bind(user.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_balance_defaults_to_zero_then_upserts() {
        let (repo, _temp) = setup_test_db().await;
        let user = UserId::new("u1".to_string());
        assert!(repo.get_balance(&user).await.unwrap().is_zero());

        repo.set_balance(&user, Decimal::from_str_canonical("2.5").unwrap())
            .await
            .unwrap();
        repo.set_balance(&user, Decimal::from_str_canonical("3.75").unwrap())
            .await
            .unwrap();
        assert_eq!(
            repo.get_balance(&user).await.unwrap(),
            Decimal::from_str_canonical("3.75").unwrap()
        );
    }

    #[tokio::test]
    async fn test_add_to_balance_starts_from_zero() {
        let (repo, _temp) = setup_test_db().await;
        let user = UserId::new("u1".to_string());

        let after = repo
            .add_to_balance(&user, Decimal::from_str_canonical("1.25").unwrap())
            .await
            .unwrap();
        assert_eq!(after, Decimal::from_str_canonical("1.25").unwrap());

        let after = repo.add_to_balance(&user, Decimal::from(-2)).await.unwrap();
        assert_eq!(after, Decimal::from_str_canonical("-0.75").unwrap());
        assert_eq!(repo.get_balance(&user).await.unwrap(), after);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_are_not_lost() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let user = UserId::new("u1".to_string());

        let mut handles = Vec::new();
        for _ in 0..40 {
            let repo = repo.clone();
            let user = user.clone();
            handles.push(tokio::spawn(async move {
                repo.add_to_balance(&user, Decimal::from(1)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.get_balance(&user).await.unwrap(), Decimal::from(40));
    }
}
