use crate::error::CharadesError;
use crate::store::models::{DbCharadeSet, DbSessionRecord, DbSettingRecord};
use crate::store::patch::{CharadeSetCreate, CharadeSetPatch, SessionCreate, SettingUpsert};
use crate::store::schema::SQLITE_INIT;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

#[derive(Debug)]
pub enum StoreActorMessage {
    /// Upsert a session row keyed by twitch_id and return the key.
    UpsertSession(SessionCreate, RpcReplyPort<Result<String, CharadesError>>),

    /// Get a session row by twitch_id.
    GetSession(
        String,
        RpcReplyPort<Result<Option<DbSessionRecord>, CharadesError>>,
    ),

    /// Get the sole local session, if any (one-account-per-device lookup).
    GetSoleSession(RpcReplyPort<Result<Option<DbSessionRecord>, CharadesError>>),

    /// Delete a session row by twitch_id; true if a row was removed.
    DeleteSession(String, RpcReplyPort<Result<bool, CharadesError>>),

    SetSetting(SettingUpsert, RpcReplyPort<Result<(), CharadesError>>),
    GetSetting(
        String,
        RpcReplyPort<Result<Option<String>, CharadesError>>,
    ),
    GetAllSettings(RpcReplyPort<Result<Vec<DbSettingRecord>, CharadesError>>),
    DeleteSetting(String, RpcReplyPort<Result<bool, CharadesError>>),

    CreateCharadeSet(CharadeSetCreate, RpcReplyPort<Result<i64, CharadesError>>),
    GetCharadeSet(i64, RpcReplyPort<Result<Option<DbCharadeSet>, CharadesError>>),
    ListCharadeSets(RpcReplyPort<Result<Vec<DbCharadeSet>, CharadesError>>),
    ListActiveCharadeSets(RpcReplyPort<Result<Vec<DbCharadeSet>, CharadesError>>),
    UpdateCharadeSet(
        i64,
        CharadeSetPatch,
        RpcReplyPort<Result<bool, CharadesError>>,
    ),
    DeleteCharadeSet(i64, RpcReplyPort<Result<bool, CharadesError>>),
}

/// Cloneable RPC handle to the store actor.
///
/// All writes funnel through one mailbox, so mutations for a given key are
/// serialized without any in-process locking.
#[derive(Clone)]
pub struct StoreHandle {
    actor: ActorRef<StoreActorMessage>,
}

impl StoreHandle {
    pub async fn upsert_session(&self, create: SessionCreate) -> Result<String, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::UpsertSession, create)
            .map_err(|e| CharadesError::StoreUnavailable(format!("UpsertSession RPC failed: {e}")))?
    }

    pub async fn get_session(
        &self,
        twitch_id: &str,
    ) -> Result<Option<DbSessionRecord>, CharadesError> {
        ractor::call!(
            self.actor,
            StoreActorMessage::GetSession,
            twitch_id.to_string()
        )
        .map_err(|e| CharadesError::StoreUnavailable(format!("GetSession RPC failed: {e}")))?
    }

    pub async fn get_sole_session(&self) -> Result<Option<DbSessionRecord>, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::GetSoleSession).map_err(|e| {
            CharadesError::StoreUnavailable(format!("GetSoleSession RPC failed: {e}"))
        })?
    }

    pub async fn delete_session(&self, twitch_id: &str) -> Result<bool, CharadesError> {
        ractor::call!(
            self.actor,
            StoreActorMessage::DeleteSession,
            twitch_id.to_string()
        )
        .map_err(|e| CharadesError::StoreUnavailable(format!("DeleteSession RPC failed: {e}")))?
    }

    pub async fn set_setting(&self, upsert: SettingUpsert) -> Result<(), CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::SetSetting, upsert)
            .map_err(|e| CharadesError::StoreUnavailable(format!("SetSetting RPC failed: {e}")))?
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::GetSetting, key.to_string())
            .map_err(|e| CharadesError::StoreUnavailable(format!("GetSetting RPC failed: {e}")))?
    }

    pub async fn get_all_settings(&self) -> Result<Vec<DbSettingRecord>, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::GetAllSettings).map_err(|e| {
            CharadesError::StoreUnavailable(format!("GetAllSettings RPC failed: {e}"))
        })?
    }

    pub async fn delete_setting(&self, key: &str) -> Result<bool, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::DeleteSetting, key.to_string())
            .map_err(|e| CharadesError::StoreUnavailable(format!("DeleteSetting RPC failed: {e}")))?
    }

    pub async fn create_charade_set(
        &self,
        create: CharadeSetCreate,
    ) -> Result<i64, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::CreateCharadeSet, create).map_err(|e| {
            CharadesError::StoreUnavailable(format!("CreateCharadeSet RPC failed: {e}"))
        })?
    }

    pub async fn get_charade_set(&self, id: i64) -> Result<Option<DbCharadeSet>, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::GetCharadeSet, id)
            .map_err(|e| CharadesError::StoreUnavailable(format!("GetCharadeSet RPC failed: {e}")))?
    }

    pub async fn list_charade_sets(&self) -> Result<Vec<DbCharadeSet>, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::ListCharadeSets).map_err(|e| {
            CharadesError::StoreUnavailable(format!("ListCharadeSets RPC failed: {e}"))
        })?
    }

    pub async fn list_active_charade_sets(&self) -> Result<Vec<DbCharadeSet>, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::ListActiveCharadeSets).map_err(|e| {
            CharadesError::StoreUnavailable(format!("ListActiveCharadeSets RPC failed: {e}"))
        })?
    }

    pub async fn update_charade_set(
        &self,
        id: i64,
        patch: CharadeSetPatch,
    ) -> Result<bool, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::UpdateCharadeSet, id, patch).map_err(|e| {
            CharadesError::StoreUnavailable(format!("UpdateCharadeSet RPC failed: {e}"))
        })?
    }

    pub async fn delete_charade_set(&self, id: i64) -> Result<bool, CharadesError> {
        ractor::call!(self.actor, StoreActorMessage::DeleteCharadeSet, id).map_err(|e| {
            CharadesError::StoreUnavailable(format!("DeleteCharadeSet RPC failed: {e}"))
        })?
    }
}

struct StoreActorState {
    pool: SqlitePool,
}

struct StoreActor;

#[ractor::async_trait]
impl Actor for StoreActor {
    type Msg = StoreActorMessage;
    type State = StoreActorState;
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

        info!("StoreActor initialized");
        Ok(StoreActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let pool = &state.pool;
        match message {
            StoreActorMessage::UpsertSession(create, reply) => {
                let _ = reply.send(upsert_session(pool, create).await);
            }
            StoreActorMessage::GetSession(twitch_id, reply) => {
                let _ = reply.send(get_session(pool, &twitch_id).await);
            }
            StoreActorMessage::GetSoleSession(reply) => {
                let _ = reply.send(get_sole_session(pool).await);
            }
            StoreActorMessage::DeleteSession(twitch_id, reply) => {
                let _ = reply.send(delete_session(pool, &twitch_id).await);
            }
            StoreActorMessage::SetSetting(upsert, reply) => {
                let _ = reply.send(set_setting(pool, upsert).await);
            }
            StoreActorMessage::GetSetting(key, reply) => {
                let _ = reply.send(get_setting(pool, &key).await);
            }
            StoreActorMessage::GetAllSettings(reply) => {
                let _ = reply.send(get_all_settings(pool).await);
            }
            StoreActorMessage::DeleteSetting(key, reply) => {
                let _ = reply.send(delete_setting(pool, &key).await);
            }
            StoreActorMessage::CreateCharadeSet(create, reply) => {
                let _ = reply.send(create_charade_set(pool, create).await);
            }
            StoreActorMessage::GetCharadeSet(id, reply) => {
                let _ = reply.send(get_charade_set(pool, id).await);
            }
            StoreActorMessage::ListCharadeSets(reply) => {
                let _ = reply.send(list_charade_sets(pool).await);
            }
            StoreActorMessage::ListActiveCharadeSets(reply) => {
                let _ = reply.send(list_active_charade_sets(pool).await);
            }
            StoreActorMessage::UpdateCharadeSet(id, patch, reply) => {
                let _ = reply.send(update_charade_set(pool, id, patch).await);
            }
            StoreActorMessage::DeleteCharadeSet(id, reply) => {
                let _ = reply.send(delete_charade_set(pool, id).await);
            }
        }
        Ok(())
    }
}

async fn upsert_session(pool: &SqlitePool, create: SessionCreate) -> Result<String, CharadesError> {
    let now = Utc::now();
    let twitch_id: String = sqlx::query_scalar(
        r#"
    INSERT INTO sessions (
        twitch_id, display_name, username, email, avatar_url,
        access_token, refresh_token, expires_in, token_obtained_at,
        auth_payload, created_at, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(twitch_id) DO UPDATE SET
        display_name=excluded.display_name,
        username=excluded.username,
        email=excluded.email,
        avatar_url=excluded.avatar_url,
        access_token=excluded.access_token,
        refresh_token=excluded.refresh_token,
        expires_in=excluded.expires_in,
        token_obtained_at=excluded.token_obtained_at,
        auth_payload=excluded.auth_payload,
        updated_at=excluded.updated_at
    RETURNING twitch_id
    "#,
    )
    .bind(create.twitch_id)
    .bind(create.display_name)
    .bind(create.username)
    .bind(create.email)
    .bind(create.avatar_url)
    .bind(create.access_token)
    .bind(create.refresh_token)
    .bind(create.expires_in)
    .bind(now)
    .bind(create.auth_payload)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(twitch_id)
}

async fn get_session(
    pool: &SqlitePool,
    twitch_id: &str,
) -> Result<Option<DbSessionRecord>, CharadesError> {
    let row = sqlx::query_as::<_, DbSessionRecord>(
        r#"
    SELECT twitch_id, display_name, username, email, avatar_url,
           access_token, refresh_token, expires_in, token_obtained_at,
           auth_payload, created_at, updated_at
    FROM sessions
    WHERE twitch_id = ?
    "#,
    )
    .bind(twitch_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

async fn get_sole_session(pool: &SqlitePool) -> Result<Option<DbSessionRecord>, CharadesError> {
    let row = sqlx::query_as::<_, DbSessionRecord>(
        r#"
    SELECT twitch_id, display_name, username, email, avatar_url,
           access_token, refresh_token, expires_in, token_obtained_at,
           auth_payload, created_at, updated_at
    FROM sessions
    LIMIT 1
    "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

async fn delete_session(pool: &SqlitePool, twitch_id: &str) -> Result<bool, CharadesError> {
    let result = sqlx::query("DELETE FROM sessions WHERE twitch_id = ?")
        .bind(twitch_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn set_setting(pool: &SqlitePool, upsert: SettingUpsert) -> Result<(), CharadesError> {
    let now = Utc::now();
    sqlx::query(
        r#"
    INSERT INTO settings (key, value, description, updated_at)
    VALUES (?, ?, ?, ?)
    ON CONFLICT(key) DO UPDATE SET
        value=excluded.value,
        description=excluded.description,
        updated_at=excluded.updated_at
    "#,
    )
    .bind(upsert.key)
    .bind(upsert.value)
    .bind(upsert.description)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>, CharadesError> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

async fn get_all_settings(pool: &SqlitePool) -> Result<Vec<DbSettingRecord>, CharadesError> {
    let rows = sqlx::query_as::<_, DbSettingRecord>(
        "SELECT id, key, value, description, updated_at FROM settings ORDER BY key",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn delete_setting(pool: &SqlitePool, key: &str) -> Result<bool, CharadesError> {
    let result = sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn create_charade_set(
    pool: &SqlitePool,
    create: CharadeSetCreate,
) -> Result<i64, CharadesError> {
    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
    INSERT INTO charade_sets (name, channels, words, settings, is_active, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    RETURNING id
    "#,
    )
    .bind(create.name)
    .bind(create.channels)
    .bind(create.words)
    .bind(create.settings)
    .bind(create.is_active)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

async fn get_charade_set(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<DbCharadeSet>, CharadesError> {
    let row = sqlx::query_as::<_, DbCharadeSet>(
        r#"
    SELECT id, name, channels, words, settings, is_active, created_at, updated_at
    FROM charade_sets
    WHERE id = ?
    "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

async fn list_charade_sets(pool: &SqlitePool) -> Result<Vec<DbCharadeSet>, CharadesError> {
    let rows = sqlx::query_as::<_, DbCharadeSet>(
        r#"
    SELECT id, name, channels, words, settings, is_active, created_at, updated_at
    FROM charade_sets
    ORDER BY name
    "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn list_active_charade_sets(pool: &SqlitePool) -> Result<Vec<DbCharadeSet>, CharadesError> {
    let rows = sqlx::query_as::<_, DbCharadeSet>(
        r#"
    SELECT id, name, channels, words, settings, is_active, created_at, updated_at
    FROM charade_sets
    WHERE is_active = 1
    ORDER BY name
    "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn update_charade_set(
    pool: &SqlitePool,
    id: i64,
    patch: CharadeSetPatch,
) -> Result<bool, CharadesError> {
    if patch.is_empty() {
        return Ok(false);
    }
    let now = Utc::now();
    let result = sqlx::query(
        r#"
    UPDATE charade_sets SET
        name = COALESCE(?, name),
        channels = COALESCE(?, channels),
        words = COALESCE(?, words),
        settings = COALESCE(?, settings),
        is_active = COALESCE(?, is_active),
        updated_at = ?
    WHERE id = ?
    "#,
    )
    .bind(patch.name)
    .bind(patch.channels)
    .bind(patch.words)
    .bind(patch.settings)
    .bind(patch.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn delete_charade_set(pool: &SqlitePool, id: i64) -> Result<bool, CharadesError> {
    let result = sqlx::query("DELETE FROM charade_sets WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Spawn the store actor and return a cloneable handle.
///
/// Errors here are fatal preconditions (bad URL, unreachable file, schema
/// failure); the shell should quit rather than run without a store.
pub async fn spawn(database_url: &str) -> Result<StoreHandle, CharadesError> {
    // Unnamed: the registry name is never looked up, and a fixed name would
    // make a second store in the same process fail to spawn.
    let (actor, _jh) = ractor::Actor::spawn(None, StoreActor, database_url.to_string())
        .await
        .map_err(|e| CharadesError::StoreUnavailable(format!("failed to spawn StoreActor: {e}")))?;

    Ok(StoreHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), CharadesError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
