//! 메시지 발행 서비스.
//!
//! 메시지를 저장한 뒤 브리지로 복제하고, 브리지 응답 식별자를 다시 저장한 다음
//! 실시간 구독자에게 알립니다. 브리지와 실시간 전달은 best-effort이며 실패해도
//! 저장된 메시지는 되돌리지 않습니다.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use ticker_bridge::Bridges;
use ticker_core::{ticker_span, FindOptions, Message, Storage, StorageError, Ticker};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::types::TimelineEntry;
use crate::websocket::{BroadcastMessage, Engine};

/// 발행 에러.
#[derive(Debug, Error)]
pub enum PublicationError {
    /// 첨부 UUID 중 존재하지 않거나 다른 티커의 것이 있음
    #[error("첨부 파일을 찾을 수 없음")]
    FilesNotFound,

    #[error("메시지를 찾을 수 없음: {0}")]
    MessageNotFound(i64),

    #[error("저장 실패: {0}")]
    Storage(#[from] StorageError),
}

impl From<PublicationError> for ApiError {
    fn from(err: PublicationError) -> Self {
        match err {
            PublicationError::FilesNotFound => ApiError::files_identifier(),
            PublicationError::MessageNotFound(_) => ApiError::message_not_found(),
            PublicationError::Storage(_) => ApiError::failed_to_save(),
        }
    }
}

/// 메시지 생성/삭제 오케스트레이터.
pub struct PublicationService {
    storage: Arc<dyn Storage>,
    bridges: Arc<Bridges>,
    engine: Arc<Engine>,
    media_base_url: String,
    upload_root: PathBuf,
}

impl PublicationService {
    pub fn new(
        storage: Arc<dyn Storage>,
        bridges: Arc<Bridges>,
        engine: Arc<Engine>,
        media_base_url: impl Into<String>,
        upload_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            bridges,
            engine,
            media_base_url: media_base_url.into(),
            upload_root: upload_root.into(),
        }
    }

    pub fn media_base_url(&self) -> &str {
        &self.media_base_url
    }

    /// 메시지를 발행합니다.
    ///
    /// 첨부 UUID는 모두 이 티커의 업로드여야 합니다.
    pub async fn create_message(
        &self,
        ticker: &Ticker,
        text: &str,
        attachments: &[Uuid],
    ) -> Result<Message, PublicationError> {
        async {
            let uploads = if attachments.is_empty() {
                Vec::new()
            } else {
                self.storage.find_uploads_by_uuids(attachments).await?
            };
            if uploads.len() != attachments.len()
                || uploads.iter().any(|u| u.ticker_id != ticker.id)
            {
                debug!(
                    requested = attachments.len(),
                    found = uploads.len(),
                    "Attachment lookup mismatch"
                );
                return Err(PublicationError::FilesNotFound);
            }

            let mut message = Message::new(ticker.id, text).with_uploads(&uploads);
            self.storage.save_message(&mut message).await?;

            if self.bridges.send(ticker, &mut message).await.is_err() {
                warn!(message_id = message.id, "Message published with bridge failures");
            }

            if let Err(e) = self.storage.save_message(&mut message).await {
                error!(message_id = message.id, error = %e, "Failed to persist bridge replies");
            }

            let entry = TimelineEntry::from_message(&message, &self.media_base_url);
            self.engine
                .broadcast(BroadcastMessage::message_created(ticker.id, &entry));

            info!(message_id = message.id, attachments = uploads.len(), "Message published");
            Ok(message)
        }
        .instrument(ticker_span!("create_message", ticker.id))
        .await
    }

    /// 메시지를 브리지, 디스크, 저장소에서 삭제하고 구독자에게 알립니다.
    pub async fn delete_message(
        &self,
        ticker: &Ticker,
        message_id: i64,
    ) -> Result<(), PublicationError> {
        async {
            let mut message = self
                .storage
                .find_message(ticker.id, message_id, FindOptions::none().with_attachments())
                .await
                .map_err(|e| {
                    if e.is_not_found() {
                        PublicationError::MessageNotFound(message_id)
                    } else {
                        PublicationError::Storage(e)
                    }
                })?;

            if self.bridges.delete(ticker, &mut message).await.is_err() {
                warn!("Message retracted with bridge failures");
            }

            self.remove_attachments(&message).await;

            self.storage.delete_message(ticker.id, message_id).await?;
            self.engine
                .broadcast(BroadcastMessage::message_deleted(ticker.id, message_id));

            info!("Message deleted");
            Ok(())
        }
        .instrument(ticker_span!("delete_message", ticker.id, message_id))
        .await
    }

    /// 모든 브리지의 부가 상태를 동기화하고 티커를 저장합니다.
    pub async fn sync_bridges(&self, ticker: &mut Ticker) -> Result<(), PublicationError> {
        let span = ticker_span!("sync_bridges", ticker.id);
        async move {
            if self.bridges.update(ticker).await.is_err() {
                warn!("Bridge sync finished with failures");
            }
            self.storage.save_ticker(ticker).await?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn remove_attachments(&self, message: &Message) {
        let uuids = message.attachment_uuids();
        if uuids.is_empty() {
            return;
        }

        let uploads = match self.storage.find_uploads_by_uuids(&uuids).await {
            Ok(uploads) => uploads,
            Err(e) => {
                error!(error = %e, "Failed to load attachments for removal");
                return;
            }
        };

        for upload in &uploads {
            let path = upload.full_path(&self.upload_root);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove upload file");
                }
            }
        }

        if let Err(e) = self.storage.delete_uploads(&uuids).await {
            error!(error = %e, "Failed to delete attachment records");
        }
    }
}
