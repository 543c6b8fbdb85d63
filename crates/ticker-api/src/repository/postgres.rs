//! PostgreSQL 저장소.
//!
//! 브리지 설정과 브리지 응답 블록, 첨부 목록은 JSONB 컬럼에 저장합니다.
//! 스키마는 워크스페이스 루트의 `migrations/`에 있습니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use ticker_core::{
    Attachment, BlueskyReply, DatabaseConfig, FindOptions, InactiveSettings, MastodonReply,
    MatrixReply, Message, Pagination, RefreshInterval, SignalGroupReply, Storage, StorageError,
    StorageResult, TelegramReply, Ticker, TickerBluesky, TickerInformation, TickerLocation,
    TickerMastodon, TickerMatrix, TickerSignalGroup, TickerTelegram, TickerWebsite, Upload, User,
    INACTIVE_SETTINGS_NAME, REFRESH_INTERVAL_NAME,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ================================================================================================
// Row 타입
// ================================================================================================

#[derive(Debug, FromRow)]
struct TickerRow {
    id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    title: String,
    description: String,
    active: bool,
    information: Json<TickerInformation>,
    telegram: Json<TickerTelegram>,
    mastodon: Json<TickerMastodon>,
    bluesky: Json<TickerBluesky>,
    signal_group: Json<TickerSignalGroup>,
    matrix: Json<TickerMatrix>,
    location: Json<TickerLocation>,
}

impl TickerRow {
    fn into_ticker(self, websites: Vec<TickerWebsite>) -> Ticker {
        Ticker {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            title: self.title,
            description: self.description,
            active: self.active,
            information: self.information.0,
            websites,
            telegram: self.telegram.0,
            mastodon: self.mastodon.0,
            bluesky: self.bluesky.0,
            signal_group: self.signal_group.0,
            matrix: self.matrix.0,
            location: self.location.0,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: i64,
    ticker_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    text: String,
    attachments: Json<Vec<Attachment>>,
    telegram: Option<Json<TelegramReply>>,
    mastodon: Option<Json<MastodonReply>>,
    bluesky: Option<Json<BlueskyReply>>,
    signal_group: Option<Json<SignalGroupReply>>,
    matrix: Option<Json<MatrixReply>>,
}

impl MessageRow {
    fn into_message(self, opts: FindOptions) -> Message {
        Message {
            id: self.id,
            ticker_id: self.ticker_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            text: self.text,
            attachments: if opts.with_attachments {
                self.attachments.0
            } else {
                Vec::new()
            },
            telegram: self.telegram.map(|j| j.0),
            mastodon: self.mastodon.map(|j| j.0),
            bluesky: self.bluesky.map(|j| j.0),
            signal_group: self.signal_group.map(|j| j.0),
            matrix: self.matrix.map(|j| j.0),
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
    email: String,
    encrypted_password: String,
    is_super_admin: bool,
}

impl UserRow {
    fn into_user(self, tickers: Vec<i64>) -> User {
        User {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_login: self.last_login,
            email: self.email,
            encrypted_password: self.encrypted_password,
            is_super_admin: self.is_super_admin,
            tickers,
        }
    }
}

#[derive(Debug, FromRow)]
struct UploadRow {
    id: i64,
    uuid: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ticker_id: i64,
    extension: String,
    content_type: String,
}

impl From<UploadRow> for Upload {
    fn from(row: UploadRow) -> Self {
        Upload {
            id: row.id,
            uuid: row.uuid,
            created_at: row.created_at,
            updated_at: row.updated_at,
            ticker_id: row.ticker_id,
            extension: row.extension,
            content_type: row.content_type,
        }
    }
}

const TICKER_COLUMNS: &str = "t.id, t.created_at, t.updated_at, t.title, t.description, t.active, \
     t.information, t.telegram, t.mastodon, t.bluesky, t.signal_group, t.matrix, t.location";

const MESSAGE_COLUMNS: &str = "id, ticker_id, created_at, updated_at, text, attachments, \
     telegram, mastodon, bluesky, signal_group, matrix";

const USER_COLUMNS: &str =
    "id, created_at, updated_at, last_login, email, encrypted_password, is_super_admin";

const UPLOAD_COLUMNS: &str = "id, uuid, created_at, updated_at, ticker_id, extension, content_type";

// ================================================================================================
// 에러 변환
// ================================================================================================

fn map_err(context: impl Into<String>) -> impl FnOnce(sqlx::Error) -> StorageError {
    let context = context.into();
    move |e| match e {
        sqlx::Error::RowNotFound => StorageError::NotFound(context),
        sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
            StorageError::InvalidInput(format!("{}: {}", context, db))
        }
        other => StorageError::Database(format!("{}: {}", context, other)),
    }
}

// ================================================================================================
// PgStorage
// ================================================================================================

/// PostgreSQL 기반 [`Storage`] 구현.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// 연결 풀을 만들고 마이그레이션을 적용합니다.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect(&config.url)
            .await?;
        info!(max_connections = config.max_connections, "Database pool created");

        let storage = Self::from_pool(pool);
        storage.migrate().await?;
        Ok(storage)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    async fn websites(&self, ticker_id: i64) -> StorageResult<Vec<TickerWebsite>> {
        let origins: Vec<(String,)> = sqlx::query_as(
            "SELECT origin FROM ticker_websites WHERE ticker_id = $1 ORDER BY id",
        )
        .bind(ticker_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err(format!("websites of ticker {}", ticker_id)))?;

        Ok(origins
            .into_iter()
            .map(|(origin,)| TickerWebsite { origin })
            .collect())
    }

    async fn shape_ticker(&self, row: TickerRow, opts: FindOptions) -> StorageResult<Ticker> {
        let websites = if opts.with_websites {
            self.websites(row.id).await?
        } else {
            Vec::new()
        };
        Ok(row.into_ticker(websites))
    }

    async fn user_tickers(&self, user_id: i64) -> StorageResult<Vec<i64>> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT ticker_id FROM ticker_users WHERE user_id = $1 ORDER BY ticker_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err(format!("tickers of user {}", user_id)))?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn shape_user(&self, row: UserRow, opts: FindOptions) -> StorageResult<User> {
        let tickers = if opts.with_tickers {
            self.user_tickers(row.id).await?
        } else {
            Vec::new()
        };
        Ok(row.into_user(tickers))
    }

    async fn replace_websites(
        tx: &mut Transaction<'_, Postgres>,
        ticker: &Ticker,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM ticker_websites WHERE ticker_id = $1")
            .bind(ticker.id)
            .execute(&mut **tx)
            .await?;

        for website in &ticker.websites {
            sqlx::query("INSERT INTO ticker_websites (ticker_id, origin) VALUES ($1, $2)")
                .bind(ticker.id)
                .bind(website.origin.to_ascii_lowercase())
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    async fn get_setting(&self, name: &str) -> StorageResult<Option<serde_json::Value>> {
        let row: Option<(Json<serde_json::Value>,)> =
            sqlx::query_as("SELECT value FROM settings WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err(format!("setting {}", name)))?;

        Ok(row.map(|(value,)| value.0))
    }

    async fn put_setting(&self, name: &str, value: serde_json::Value) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (name, value) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(name)
        .bind(Json(value))
        .execute(&self.pool)
        .await
        .map_err(map_err(format!("setting {}", name)))?;
        Ok(())
    }
}

#[async_trait]
impl Storage for PgStorage {
    // ==================== 사용자 ====================

    async fn find_users(&self) -> StorageResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_err("users"))?;

        Ok(rows.into_iter().map(|r| r.into_user(Vec::new())).collect())
    }

    async fn find_user_by_id(&self, id: i64, opts: FindOptions) -> StorageResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err(format!("user {}", id)))?;

        self.shape_user(row, opts).await
    }

    async fn find_user_by_email(&self, email: &str, opts: FindOptions) -> StorageResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err(format!("user {}", email)))?;

        self.shape_user(row, opts).await
    }

    async fn save_user(&self, user: &mut User) -> StorageResult<()> {
        user.updated_at = Utc::now();

        if user.id != 0 {
            sqlx::query(
                r#"
                UPDATE users
                SET updated_at = $2, last_login = $3, email = $4,
                    encrypted_password = $5, is_super_admin = $6
                WHERE id = $1
                "#,
            )
            .bind(user.id)
            .bind(user.updated_at)
            .bind(user.last_login)
            .bind(&user.email)
            .bind(&user.encrypted_password)
            .bind(user.is_super_admin)
            .execute(&self.pool)
            .await
            .map_err(map_err(format!("user {}", user.id)))?;
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(map_err("begin"))?;
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO users (created_at, updated_at, last_login, email, encrypted_password, is_super_admin)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login)
        .bind(&user.email)
        .bind(&user.encrypted_password)
        .bind(user.is_super_admin)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err(format!("user {}", user.email)))?;

        for ticker_id in &user.tickers {
            sqlx::query("INSERT INTO ticker_users (ticker_id, user_id) VALUES ($1, $2)")
                .bind(ticker_id)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(map_err(format!("ticker {}", ticker_id)))?;
        }
        tx.commit().await.map_err(map_err("commit"))?;

        user.id = id;
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> StorageResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err(format!("user {}", id)))?;
        Ok(())
    }

    // ==================== 티커 ====================

    async fn find_tickers_by_user(
        &self,
        user: &User,
        opts: FindOptions,
    ) -> StorageResult<Vec<Ticker>> {
        let rows = if user.is_super_admin {
            sqlx::query_as::<_, TickerRow>(&format!(
                "SELECT {} FROM tickers t ORDER BY t.id",
                TICKER_COLUMNS
            ))
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, TickerRow>(&format!(
                "SELECT {} FROM tickers t JOIN ticker_users tu ON tu.ticker_id = t.id \
                 WHERE tu.user_id = $1 ORDER BY t.id",
                TICKER_COLUMNS
            ))
            .bind(user.id)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(map_err(format!("tickers of user {}", user.id)))?;

        let mut tickers = Vec::with_capacity(rows.len());
        for row in rows {
            tickers.push(self.shape_ticker(row, opts).await?);
        }
        Ok(tickers)
    }

    async fn find_ticker_by_id(&self, id: i64, opts: FindOptions) -> StorageResult<Ticker> {
        let row = sqlx::query_as::<_, TickerRow>(&format!(
            "SELECT {} FROM tickers t WHERE t.id = $1",
            TICKER_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err(format!("ticker {}", id)))?;

        self.shape_ticker(row, opts).await
    }

    async fn find_ticker_by_domain(
        &self,
        domain: &str,
        opts: FindOptions,
    ) -> StorageResult<Ticker> {
        let row = sqlx::query_as::<_, TickerRow>(&format!(
            "SELECT {} FROM tickers t JOIN ticker_websites w ON w.ticker_id = t.id \
             WHERE w.origin = lower($1) LIMIT 1",
            TICKER_COLUMNS
        ))
        .bind(domain)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err(format!("ticker for domain {}", domain)))?;

        self.shape_ticker(row, opts).await
    }

    async fn save_ticker(&self, ticker: &mut Ticker) -> StorageResult<()> {
        ticker.updated_at = Utc::now();
        let mut tx = self.pool.begin().await.map_err(map_err("begin"))?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO tickers (id, created_at, updated_at, title, description, active,
                                 information, telegram, mastodon, bluesky, signal_group, matrix, location)
            VALUES (COALESCE(NULLIF($1, 0), nextval(pg_get_serial_sequence('tickers', 'id'))),
                    $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                updated_at = EXCLUDED.updated_at,
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                active = EXCLUDED.active,
                information = EXCLUDED.information,
                telegram = EXCLUDED.telegram,
                mastodon = EXCLUDED.mastodon,
                bluesky = EXCLUDED.bluesky,
                signal_group = EXCLUDED.signal_group,
                matrix = EXCLUDED.matrix,
                location = EXCLUDED.location
            RETURNING id
            "#,
        )
        .bind(ticker.id)
        .bind(ticker.created_at)
        .bind(ticker.updated_at)
        .bind(&ticker.title)
        .bind(&ticker.description)
        .bind(ticker.active)
        .bind(Json(&ticker.information))
        .bind(Json(&ticker.telegram))
        .bind(Json(&ticker.mastodon))
        .bind(Json(&ticker.bluesky))
        .bind(Json(&ticker.signal_group))
        .bind(Json(&ticker.matrix))
        .bind(Json(&ticker.location))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err(format!("ticker {}", ticker.id)))?;
        ticker.id = id;

        Self::replace_websites(&mut tx, ticker)
            .await
            .map_err(map_err(format!("websites of ticker {}", id)))?;
        tx.commit().await.map_err(map_err("commit"))?;

        debug!(ticker_id = id, "Ticker saved");
        Ok(())
    }

    async fn delete_ticker(&self, id: i64) -> StorageResult<()> {
        // messages, uploads, ticker_websites, ticker_users는 ON DELETE CASCADE
        sqlx::query("DELETE FROM tickers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err(format!("ticker {}", id)))?;
        Ok(())
    }

    async fn add_ticker_user(&self, ticker_id: i64, user_id: i64) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO ticker_users (ticker_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(ticker_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_err(format!("ticker {} user {}", ticker_id, user_id)))?;
        Ok(())
    }

    async fn remove_ticker_user(&self, ticker_id: i64, user_id: i64) -> StorageResult<()> {
        sqlx::query("DELETE FROM ticker_users WHERE ticker_id = $1 AND user_id = $2")
            .bind(ticker_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_err(format!("ticker {} user {}", ticker_id, user_id)))?;
        Ok(())
    }

    // ==================== 업로드 ====================

    async fn find_upload_by_uuid(&self, uuid: Uuid) -> StorageResult<Upload> {
        let row = sqlx::query_as::<_, UploadRow>(&format!(
            "SELECT {} FROM uploads WHERE uuid = $1",
            UPLOAD_COLUMNS
        ))
        .bind(uuid)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err(format!("upload {}", uuid)))?;

        Ok(row.into())
    }

    async fn find_uploads_by_uuids(&self, uuids: &[Uuid]) -> StorageResult<Vec<Upload>> {
        let rows = sqlx::query_as::<_, UploadRow>(&format!(
            "SELECT {} FROM uploads WHERE uuid = ANY($1)",
            UPLOAD_COLUMNS
        ))
        .bind(uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err("uploads"))?;

        // 입력 순서 유지
        let mut uploads: Vec<Upload> = rows.into_iter().map(Upload::from).collect();
        uploads.sort_by_key(|u| uuids.iter().position(|x| *x == u.uuid));
        Ok(uploads)
    }

    async fn save_upload(&self, upload: &mut Upload) -> StorageResult<()> {
        upload.updated_at = Utc::now();
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO uploads (uuid, created_at, updated_at, ticker_id, extension, content_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (uuid) DO UPDATE SET
                updated_at = EXCLUDED.updated_at,
                ticker_id = EXCLUDED.ticker_id,
                extension = EXCLUDED.extension,
                content_type = EXCLUDED.content_type
            RETURNING id
            "#,
        )
        .bind(upload.uuid)
        .bind(upload.created_at)
        .bind(upload.updated_at)
        .bind(upload.ticker_id)
        .bind(&upload.extension)
        .bind(&upload.content_type)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err(format!("upload {}", upload.uuid)))?;

        upload.id = id;
        Ok(())
    }

    async fn delete_upload(&self, uuid: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM uploads WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await
            .map_err(map_err(format!("upload {}", uuid)))?;
        Ok(())
    }

    async fn delete_uploads(&self, uuids: &[Uuid]) -> StorageResult<()> {
        sqlx::query("DELETE FROM uploads WHERE uuid = ANY($1)")
            .bind(uuids)
            .execute(&self.pool)
            .await
            .map_err(map_err("uploads"))?;
        Ok(())
    }

    // ==================== 메시지 ====================

    async fn find_message(
        &self,
        ticker_id: i64,
        message_id: i64,
        opts: FindOptions,
    ) -> StorageResult<Message> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {} FROM messages WHERE ticker_id = $1 AND id = $2",
            MESSAGE_COLUMNS
        ))
        .bind(ticker_id)
        .bind(message_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err(format!("message {}", message_id)))?;

        Ok(row.into_message(opts))
    }

    async fn find_messages_by_ticker(
        &self,
        ticker_id: i64,
        pagination: Pagination,
        opts: FindOptions,
    ) -> StorageResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {} FROM messages
            WHERE ticker_id = $1
              AND ($2::BIGINT IS NULL OR id < $2)
              AND ($3::BIGINT IS NULL OR id > $3)
            ORDER BY id DESC
            LIMIT $4
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(ticker_id)
        .bind(pagination.before)
        .bind(pagination.after)
        .bind(pagination.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err(format!("messages of ticker {}", ticker_id)))?;

        Ok(rows.into_iter().map(|r| r.into_message(opts)).collect())
    }

    async fn save_message(&self, message: &mut Message) -> StorageResult<()> {
        message.updated_at = Utc::now();

        if message.id != 0 {
            sqlx::query(
                r#"
                UPDATE messages
                SET updated_at = $2, text = $3, attachments = $4, telegram = $5,
                    mastodon = $6, bluesky = $7, signal_group = $8, matrix = $9
                WHERE id = $1
                "#,
            )
            .bind(message.id)
            .bind(message.updated_at)
            .bind(&message.text)
            .bind(Json(&message.attachments))
            .bind(message.telegram.as_ref().map(Json))
            .bind(message.mastodon.as_ref().map(Json))
            .bind(message.bluesky.as_ref().map(Json))
            .bind(message.signal_group.as_ref().map(Json))
            .bind(message.matrix.as_ref().map(Json))
            .execute(&self.pool)
            .await
            .map_err(map_err(format!("message {}", message.id)))?;
            return Ok(());
        }

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO messages (ticker_id, created_at, updated_at, text, attachments,
                                  telegram, mastodon, bluesky, signal_group, matrix)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(message.ticker_id)
        .bind(message.created_at)
        .bind(message.updated_at)
        .bind(&message.text)
        .bind(Json(&message.attachments))
        .bind(message.telegram.as_ref().map(Json))
        .bind(message.mastodon.as_ref().map(Json))
        .bind(message.bluesky.as_ref().map(Json))
        .bind(message.signal_group.as_ref().map(Json))
        .bind(message.matrix.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await
        .map_err(map_err(format!("ticker {}", message.ticker_id)))?;

        message.id = id;
        Ok(())
    }

    async fn delete_message(&self, ticker_id: i64, message_id: i64) -> StorageResult<()> {
        sqlx::query("DELETE FROM messages WHERE ticker_id = $1 AND id = $2")
            .bind(ticker_id)
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(map_err(format!("message {}", message_id)))?;
        Ok(())
    }

    // ==================== 설정 ====================

    async fn get_inactive_settings(&self) -> StorageResult<InactiveSettings> {
        Ok(self
            .get_setting(INACTIVE_SETTINGS_NAME)
            .await?
            .map(|value| InactiveSettings::from_value(&value))
            .unwrap_or_default())
    }

    async fn save_inactive_settings(&self, settings: &InactiveSettings) -> StorageResult<()> {
        self.put_setting(INACTIVE_SETTINGS_NAME, serde_json::to_value(settings)?)
            .await
    }

    async fn get_refresh_interval(&self) -> StorageResult<RefreshInterval> {
        let Some(value) = self.get_setting(REFRESH_INTERVAL_NAME).await? else {
            return Ok(RefreshInterval::default());
        };

        match serde_json::from_value::<RefreshInterval>(value) {
            Ok(interval) => Ok(interval),
            Err(e) => {
                warn!(error = %e, "Invalid refresh interval setting, using default");
                Ok(RefreshInterval::default())
            }
        }
    }

    async fn save_refresh_interval(&self, interval: &RefreshInterval) -> StorageResult<()> {
        self.put_setting(REFRESH_INTERVAL_NAME, serde_json::to_value(interval)?)
            .await
    }
}
