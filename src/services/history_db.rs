//! Postgres-backed history store.
//!
//! Rows are insert-only. `seq` gives a stable insertion order independent of
//! clock resolution; `created_at` feeds the `(user_id, created_at)` index.

use std::net::IpAddr;

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use super::history::{HistoryError, HistoryPage, HistoryQuery, HistoryStore};
use crate::state::{ChatExchange, ClientContext};

const SELECT_COLUMNS: &str =
    "id, user_id, conversation_id, user_message, ai_response, created_at, client_context, client_ip";

pub struct PgHistory {
    pool: PgPool,
}

impl PgHistory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HistoryStore for PgHistory {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn append(&self, exchange: ChatExchange) -> Result<(), HistoryError> {
        sqlx::query(
            r"INSERT INTO chat_exchanges
                  (id, user_id, conversation_id, user_message, ai_response, created_at, client_context, client_ip)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(exchange.id)
        .bind(&exchange.user_id)
        .bind(&exchange.conversation_id)
        .bind(&exchange.user_message)
        .bind(&exchange.ai_response)
        .bind(exchange.timestamp)
        .bind(exchange.client_context.map(Json))
        .bind(exchange.client_ip.map(|ip| ip.to_string()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, query: &HistoryQuery) -> Result<HistoryPage, HistoryError> {
        let total: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM chat_exchanges
              WHERE ($1::text IS NULL OR user_id = $1)
                AND ($2::text IS NULL OR conversation_id = $2)",
        )
        .bind(query.user_id.as_deref())
        .bind(query.conversation_id.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r"SELECT {SELECT_COLUMNS} FROM chat_exchanges
              WHERE ($1::text IS NULL OR user_id = $1)
                AND ($2::text IS NULL OR conversation_id = $2)
              ORDER BY seq DESC
              LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(query.user_id.as_deref())
            .bind(query.conversation_id.as_deref())
            .bind(to_sql_limit(query.limit))
            .fetch_all(&self.pool)
            .await?;

        let mut items = rows.iter().map(row_to_exchange).collect::<Result<Vec<_>, _>>()?;
        items.reverse();
        Ok(HistoryPage { items, total: usize::try_from(total).unwrap_or(0) })
    }

    async fn recent(&self, conversation_id: &str, n: usize) -> Result<Vec<ChatExchange>, HistoryError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let sql = format!(
            r"SELECT {SELECT_COLUMNS} FROM chat_exchanges
              WHERE conversation_id = $1
              ORDER BY seq DESC
              LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(conversation_id)
            .bind(to_sql_limit(n))
            .fetch_all(&self.pool)
            .await?;

        let mut window = rows.iter().map(row_to_exchange).collect::<Result<Vec<_>, _>>()?;
        window.reverse();
        Ok(window)
    }
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn row_to_exchange(row: &PgRow) -> Result<ChatExchange, HistoryError> {
    let client_context: Option<Json<ClientContext>> = row.try_get("client_context")?;
    let client_ip: Option<String> = row.try_get("client_ip")?;
    let client_ip = client_ip
        .map(|raw| {
            raw.parse::<IpAddr>()
                .map_err(|e| HistoryError::Corrupt(format!("client_ip {raw:?}: {e}")))
        })
        .transpose()?;

    Ok(ChatExchange {
        id: row.try_get::<Uuid, _>("id")?,
        user_id: row.try_get("user_id")?,
        conversation_id: row.try_get("conversation_id")?,
        user_message: row.try_get("user_message")?,
        ai_response: row.try_get("ai_response")?,
        timestamp: row.try_get::<OffsetDateTime, _>("created_at")?,
        client_context: client_context.map(|Json(ctx)| ctx),
        client_ip,
    })
}

#[cfg(test)]
#[path = "history_db_test.rs"]
mod tests;
