//! 인메모리 저장소.
//!
//! 테스트와 로컬 개발용입니다. 프로세스가 종료되면 모든 데이터가 사라집니다.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FindOptions, Pagination, Storage, StorageError, StorageResult};
use crate::domain::{InactiveSettings, Message, RefreshInterval, Ticker, Upload, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tickers: BTreeMap<i64, Ticker>,
    /// 메시지 ID는 전역적으로 증가하므로 BTreeMap 순서가 곧 시간 순서입니다.
    messages: BTreeMap<i64, Message>,
    uploads: HashMap<Uuid, Upload>,
    inactive_settings: Option<InactiveSettings>,
    refresh_interval: Option<RefreshInterval>,
}

/// `RwLock<HashMap>` 기반 저장소.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
    next_id: AtomicI64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn shape_ticker(mut ticker: Ticker, opts: FindOptions) -> Ticker {
        if !opts.with_websites {
            ticker.websites.clear();
        }
        ticker
    }

    fn shape_message(mut message: Message, opts: FindOptions) -> Message {
        if !opts.with_attachments {
            message.attachments.clear();
        }
        message
    }

    fn shape_user(mut user: User, opts: FindOptions) -> User {
        if !opts.with_tickers {
            user.tickers.clear();
        }
        user
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    // ==================== 사용자 ====================

    async fn find_users(&self) -> StorageResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().cloned().collect())
    }

    async fn find_user_by_id(&self, id: i64, opts: FindOptions) -> StorageResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .cloned()
            .map(|u| Self::shape_user(u, opts))
            .ok_or_else(|| StorageError::NotFound(format!("user {}", id)))
    }

    async fn find_user_by_email(&self, email: &str, opts: FindOptions) -> StorageResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .map(|u| Self::shape_user(u, opts))
            .ok_or_else(|| StorageError::NotFound(format!("user {}", email)))
    }

    async fn save_user(&self, user: &mut User) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StorageError::InvalidInput(format!(
                "email already in use: {}",
                user.email
            )));
        }
        if user.id == 0 {
            user.id = self.next_id();
        }
        user.updated_at = Utc::now();
        let mut stored = user.clone();
        if let Some(existing) = tables.users.get(&user.id) {
            // 티커 연결은 add/remove_ticker_user로만 바뀝니다
            stored.tickers = existing.tickers.clone();
        }
        tables.users.insert(user.id, stored);
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.users.remove(&id);
        Ok(())
    }

    // ==================== 티커 ====================

    async fn find_tickers_by_user(
        &self,
        user: &User,
        opts: FindOptions,
    ) -> StorageResult<Vec<Ticker>> {
        let tables = self.tables.read().await;
        let assigned = tables
            .users
            .get(&user.id)
            .map(|u| u.tickers.clone())
            .unwrap_or_default();

        Ok(tables
            .tickers
            .values()
            .filter(|t| user.is_super_admin || assigned.contains(&t.id))
            .cloned()
            .map(|t| Self::shape_ticker(t, opts))
            .collect())
    }

    async fn find_ticker_by_id(&self, id: i64, opts: FindOptions) -> StorageResult<Ticker> {
        let tables = self.tables.read().await;
        tables
            .tickers
            .get(&id)
            .cloned()
            .map(|t| Self::shape_ticker(t, opts))
            .ok_or_else(|| StorageError::NotFound(format!("ticker {}", id)))
    }

    async fn find_ticker_by_domain(
        &self,
        domain: &str,
        opts: FindOptions,
    ) -> StorageResult<Ticker> {
        let tables = self.tables.read().await;
        tables
            .tickers
            .values()
            .find(|t| t.has_origin(domain))
            .cloned()
            .map(|t| Self::shape_ticker(t, opts))
            .ok_or_else(|| StorageError::NotFound(format!("ticker for domain {}", domain)))
    }

    async fn save_ticker(&self, ticker: &mut Ticker) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if ticker.id == 0 {
            ticker.id = self.next_id();
        }
        ticker.updated_at = Utc::now();
        tables.tickers.insert(ticker.id, ticker.clone());
        Ok(())
    }

    async fn delete_ticker(&self, id: i64) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.tickers.remove(&id);
        tables.messages.retain(|_, m| m.ticker_id != id);
        tables.uploads.retain(|_, u| u.ticker_id != id);
        for user in tables.users.values_mut() {
            user.tickers.retain(|t| *t != id);
        }
        Ok(())
    }

    async fn add_ticker_user(&self, ticker_id: i64, user_id: i64) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.tickers.contains_key(&ticker_id) {
            return Err(StorageError::NotFound(format!("ticker {}", ticker_id)));
        }
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StorageError::NotFound(format!("user {}", user_id)))?;
        if !user.tickers.contains(&ticker_id) {
            user.tickers.push(ticker_id);
        }
        Ok(())
    }

    async fn remove_ticker_user(&self, ticker_id: i64, user_id: i64) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.tickers.retain(|t| *t != ticker_id);
        }
        Ok(())
    }

    // ==================== 업로드 ====================

    async fn find_upload_by_uuid(&self, uuid: Uuid) -> StorageResult<Upload> {
        let tables = self.tables.read().await;
        tables
            .uploads
            .get(&uuid)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("upload {}", uuid)))
    }

    async fn find_uploads_by_uuids(&self, uuids: &[Uuid]) -> StorageResult<Vec<Upload>> {
        let tables = self.tables.read().await;
        Ok(uuids
            .iter()
            .filter_map(|uuid| tables.uploads.get(uuid).cloned())
            .collect())
    }

    async fn save_upload(&self, upload: &mut Upload) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if upload.id == 0 {
            upload.id = self.next_id();
        }
        upload.updated_at = Utc::now();
        tables.uploads.insert(upload.uuid, upload.clone());
        Ok(())
    }

    async fn delete_upload(&self, uuid: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.uploads.remove(&uuid);
        Ok(())
    }

    // ==================== 메시지 ====================

    async fn find_message(
        &self,
        ticker_id: i64,
        message_id: i64,
        opts: FindOptions,
    ) -> StorageResult<Message> {
        let tables = self.tables.read().await;
        tables
            .messages
            .get(&message_id)
            .filter(|m| m.ticker_id == ticker_id)
            .cloned()
            .map(|m| Self::shape_message(m, opts))
            .ok_or_else(|| StorageError::NotFound(format!("message {}", message_id)))
    }

    async fn find_messages_by_ticker(
        &self,
        ticker_id: i64,
        pagination: Pagination,
        opts: FindOptions,
    ) -> StorageResult<Vec<Message>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .values()
            .rev()
            .filter(|m| m.ticker_id == ticker_id && pagination.matches(m.id))
            .take(pagination.limit)
            .cloned()
            .map(|m| Self::shape_message(m, opts))
            .collect())
    }

    async fn save_message(&self, message: &mut Message) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.tickers.contains_key(&message.ticker_id) {
            return Err(StorageError::NotFound(format!(
                "ticker {}",
                message.ticker_id
            )));
        }
        if message.id == 0 {
            message.id = self.next_id();
        }
        message.updated_at = Utc::now();
        tables.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn delete_message(&self, ticker_id: i64, message_id: i64) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .messages
            .get(&message_id)
            .is_some_and(|m| m.ticker_id == ticker_id)
        {
            tables.messages.remove(&message_id);
        }
        Ok(())
    }

    // ==================== 설정 ====================

    async fn get_inactive_settings(&self) -> StorageResult<InactiveSettings> {
        let tables = self.tables.read().await;
        Ok(tables.inactive_settings.clone().unwrap_or_default())
    }

    async fn save_inactive_settings(&self, settings: &InactiveSettings) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.inactive_settings = Some(settings.clone());
        Ok(())
    }

    async fn get_refresh_interval(&self) -> StorageResult<RefreshInterval> {
        let tables = self.tables.read().await;
        Ok(tables.refresh_interval.unwrap_or_default())
    }

    async fn save_refresh_interval(&self, interval: &RefreshInterval) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.refresh_interval = Some(*interval);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_increase() {
        let storage = MemoryStorage::new();
        let mut ticker = Ticker::new("Demo");
        storage.save_ticker(&mut ticker).await.unwrap();

        let mut first = Message::new(ticker.id, "one");
        let mut second = Message::new(ticker.id, "two");
        storage.save_message(&mut first).await.unwrap();
        storage.save_message(&mut second).await.unwrap();

        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_message_requires_ticker() {
        let storage = MemoryStorage::new();
        let mut message = Message::new(99, "orphan");

        let err = storage.save_message(&mut message).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
