use crate::db::models::{DbSetting, DbUser, UserCreate};
use crate::db::schema::SQLITE_INIT;
use crate::error::ConsoleError;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

#[derive(Debug)]
pub enum DbActorMessage {
    /// Create a local account and return its id.
    CreateUser(UserCreate, RpcReplyPort<Result<i64, ConsoleError>>),

    /// Look up an account by (case-insensitive) email.
    GetUserByEmail(String, RpcReplyPort<Result<Option<DbUser>, ConsoleError>>),

    /// Get an account by id.
    GetUserById(i64, RpcReplyPort<Result<DbUser, ConsoleError>>),

    /// Bump `login_count` and return the new value.
    IncrementLoginCount(i64, RpcReplyPort<Result<i64, ConsoleError>>),

    /// Raw JSON of a stored setting.
    GetSetting(String, RpcReplyPort<Result<Option<String>, ConsoleError>>),

    /// Upsert a setting (key, JSON value).
    SetSetting(String, String, RpcReplyPort<Result<(), ConsoleError>>),

    ListSettings(RpcReplyPort<Result<Vec<DbSetting>, ConsoleError>>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn create_user(&self, create: UserCreate) -> Result<i64, ConsoleError> {
        ractor::call!(self.actor, DbActorMessage::CreateUser, create)
            .map_err(|e| ConsoleError::Ractor(format!("DbActor CreateUser RPC failed: {e}")))?
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<DbUser>, ConsoleError> {
        ractor::call!(
            self.actor,
            DbActorMessage::GetUserByEmail,
            email.to_string()
        )
        .map_err(|e| ConsoleError::Ractor(format!("DbActor GetUserByEmail RPC failed: {e}")))?
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<DbUser, ConsoleError> {
        ractor::call!(self.actor, DbActorMessage::GetUserById, id)
            .map_err(|e| ConsoleError::Ractor(format!("DbActor GetUserById RPC failed: {e}")))?
    }

    pub async fn increment_login_count(&self, id: i64) -> Result<i64, ConsoleError> {
        ractor::call!(self.actor, DbActorMessage::IncrementLoginCount, id).map_err(|e| {
            ConsoleError::Ractor(format!("DbActor IncrementLoginCount RPC failed: {e}"))
        })?
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, ConsoleError> {
        ractor::call!(self.actor, DbActorMessage::GetSetting, key.to_string())
            .map_err(|e| ConsoleError::Ractor(format!("DbActor GetSetting RPC failed: {e}")))?
    }

    pub async fn set_setting(&self, key: &str, value: String) -> Result<(), ConsoleError> {
        ractor::call!(
            self.actor,
            DbActorMessage::SetSetting,
            key.to_string(),
            value
        )
        .map_err(|e| ConsoleError::Ractor(format!("DbActor SetSetting RPC failed: {e}")))?
    }

    pub async fn list_settings(&self) -> Result<Vec<DbSetting>, ConsoleError> {
        ractor::call!(self.actor, DbActorMessage::ListSettings)
            .map_err(|e| ConsoleError::Ractor(format!("DbActor ListSettings RPC failed: {e}")))?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::CreateUser(create, reply) => {
                let res = self.create_user(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetUserByEmail(email, reply) => {
                let res = self.get_user_by_email(&state.pool, &email).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetUserById(id, reply) => {
                let res = self.get_user_by_id(&state.pool, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::IncrementLoginCount(id, reply) => {
                let res = self.increment_login_count(&state.pool, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetSetting(key, reply) => {
                let res = self.get_setting(&state.pool, &key).await;
                let _ = reply.send(res);
            }
            DbActorMessage::SetSetting(key, value, reply) => {
                let res = self.set_setting(&state.pool, &key, &value).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListSettings(reply) => {
                let res = self.list_settings(&state.pool).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, dev_id, login_count, created_at, updated_at";

impl DbActor {
    async fn create_user(&self, pool: &SqlitePool, c: UserCreate) -> Result<i64, ConsoleError> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"
        INSERT INTO users (
            email, password_hash, first_name, last_name, dev_id, login_count, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, 0, ?, ?)
        RETURNING id
        "#,
        )
        .bind(c.email.trim().to_lowercase())
        .bind(c.password_hash)
        .bind(c.first_name)
        .bind(c.last_name)
        .bind(c.dev_id)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    async fn get_user_by_email(
        &self,
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<DbUser>, ConsoleError> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn get_user_by_id(&self, pool: &SqlitePool, id: i64) -> Result<DbUser, ConsoleError> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    async fn increment_login_count(&self, pool: &SqlitePool, id: i64) -> Result<i64, ConsoleError> {
        let count: i64 = sqlx::query_scalar(
            r#"
        UPDATE users
        SET login_count = login_count + 1, updated_at = ?
        WHERE id = ?
        RETURNING login_count
        "#,
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    async fn get_setting(
        &self,
        pool: &SqlitePool,
        key: &str,
    ) -> Result<Option<String>, ConsoleError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM dynamic_settings WHERE key = ?")
                .bind(key)
                .fetch_optional(pool)
                .await?;

        Ok(value)
    }

    async fn set_setting(
        &self,
        pool: &SqlitePool,
        key: &str,
        value: &str,
    ) -> Result<(), ConsoleError> {
        sqlx::query(
            r#"
        INSERT INTO dynamic_settings (key, value, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn list_settings(&self, pool: &SqlitePool) -> Result<Vec<DbSetting>, ConsoleError> {
        let rows = sqlx::query_as::<_, DbSetting>(
            "SELECT key, value, updated_at FROM dynamic_settings ORDER BY key",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}

/// Spawn the database actor and return a cloneable handle.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, ConsoleError> {
    let (actor, _jh) = ractor::Actor::spawn(
        Some(format!("DbActor-{database_url}")),
        DbActor,
        database_url.to_string(),
    )
    .await
    .map_err(|e| ConsoleError::Ractor(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), ConsoleError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
