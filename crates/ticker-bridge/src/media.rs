//! 첨부 파일 로딩.

use std::path::PathBuf;
use std::sync::Arc;

use ticker_core::{Attachment, Storage};

use crate::types::{BridgeError, BridgeResult};

/// 브리지로 전송할 첨부 파일 내용.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn is_gif(&self) -> bool {
        self.content_type == "image/gif"
    }
}

/// 업로드 디렉토리에서 첨부 파일을 읽습니다.
#[derive(Clone)]
pub struct MediaLoader {
    storage: Arc<dyn Storage>,
    root: PathBuf,
}

impl MediaLoader {
    pub fn new(storage: Arc<dyn Storage>, root: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            root: root.into(),
        }
    }

    pub async fn load(&self, attachment: &Attachment) -> BridgeResult<MediaFile> {
        let upload = self
            .storage
            .find_upload_by_uuid(attachment.uuid)
            .await
            .map_err(|e| BridgeError::Media(e.to_string()))?;

        let path = upload.full_path(&self.root);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| BridgeError::Media(format!("{}: {}", path.display(), e)))?;

        Ok(MediaFile {
            file_name: upload.file_name(),
            content_type: upload.content_type,
            bytes,
        })
    }
}
