//! 인메모리 저장소 계약 테스트.

use ticker_core::{
    FindOptions, InactiveSettings, MemoryStorage, Message, Pagination, RefreshInterval, Storage,
    Ticker, Upload, User,
};

async fn seeded() -> (MemoryStorage, Ticker) {
    let storage = MemoryStorage::new();
    let mut ticker = Ticker::new("Demo").with_website("a.example");
    ticker.active = true;
    storage.save_ticker(&mut ticker).await.unwrap();
    (storage, ticker)
}

#[tokio::test]
async fn test_find_ticker_by_domain() {
    let (storage, ticker) = seeded().await;

    let found = storage
        .find_ticker_by_domain("a.example", FindOptions::none().with_websites())
        .await
        .unwrap();
    assert_eq!(found.id, ticker.id);
    assert_eq!(found.websites.len(), 1);

    let without = storage
        .find_ticker_by_domain("a.example", FindOptions::none())
        .await
        .unwrap();
    assert!(without.websites.is_empty());

    let missing = storage
        .find_ticker_by_domain("b.example", FindOptions::none())
        .await
        .unwrap_err();
    assert!(missing.is_not_found());
}

#[tokio::test]
async fn test_pagination_descending_with_bounds() {
    let (storage, ticker) = seeded().await;
    let mut ids = Vec::new();
    for i in 0..15 {
        let mut message = Message::new(ticker.id, format!("message {}", i));
        storage.save_message(&mut message).await.unwrap();
        ids.push(message.id);
    }

    let page = storage
        .find_messages_by_ticker(ticker.id, Pagination::default(), FindOptions::none())
        .await
        .unwrap();
    assert_eq!(page.len(), 10);
    assert_eq!(page[0].id, ids[14]);
    assert!(page.windows(2).all(|w| w[0].id > w[1].id));

    let before = storage
        .find_messages_by_ticker(ticker.id, Pagination::new(3).before(ids[5]), FindOptions::none())
        .await
        .unwrap();
    assert_eq!(
        before.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![ids[4], ids[3], ids[2]]
    );

    let after = storage
        .find_messages_by_ticker(ticker.id, Pagination::new(50).after(ids[12]), FindOptions::none())
        .await
        .unwrap();
    assert_eq!(
        after.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![ids[14], ids[13]]
    );
}

#[tokio::test]
async fn test_message_scoped_by_ticker() {
    let (storage, ticker) = seeded().await;
    let mut other = Ticker::new("Other");
    storage.save_ticker(&mut other).await.unwrap();

    let mut message = Message::new(ticker.id, "hi");
    storage.save_message(&mut message).await.unwrap();

    assert!(storage
        .find_message(other.id, message.id, FindOptions::none())
        .await
        .unwrap_err()
        .is_not_found());

    storage.delete_message(other.id, message.id).await.unwrap();
    assert!(storage
        .find_message(ticker.id, message.id, FindOptions::none())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_attachments_preload() {
    let (storage, ticker) = seeded().await;
    let mut upload = Upload::new(ticker.id, "image/png");
    storage.save_upload(&mut upload).await.unwrap();

    let mut message = Message::new(ticker.id, "with image").with_uploads(&[upload.clone()]);
    storage.save_message(&mut message).await.unwrap();

    let bare = storage
        .find_message(ticker.id, message.id, FindOptions::none())
        .await
        .unwrap();
    assert!(bare.attachments.is_empty());

    let full = storage
        .find_message(ticker.id, message.id, FindOptions::none().with_attachments())
        .await
        .unwrap();
    assert_eq!(full.attachment_uuids(), vec![upload.uuid]);
}

#[tokio::test]
async fn test_delete_ticker_cascades() {
    let (storage, ticker) = seeded().await;
    let mut upload = Upload::new(ticker.id, "image/png");
    storage.save_upload(&mut upload).await.unwrap();
    let mut message = Message::new(ticker.id, "bye");
    storage.save_message(&mut message).await.unwrap();
    let mut user = User::new("editor@example.org", "hash");
    storage.save_user(&mut user).await.unwrap();
    storage.add_ticker_user(ticker.id, user.id).await.unwrap();

    storage.delete_ticker(ticker.id).await.unwrap();

    assert!(storage
        .find_message(ticker.id, message.id, FindOptions::none())
        .await
        .is_err());
    assert!(storage.find_upload_by_uuid(upload.uuid).await.is_err());
    let user = storage
        .find_user_by_id(user.id, FindOptions::none().with_tickers())
        .await
        .unwrap();
    assert!(user.tickers.is_empty());
}

#[tokio::test]
async fn test_ticker_user_association() {
    let (storage, ticker) = seeded().await;
    let mut user = User::new("editor@example.org", "hash");
    storage.save_user(&mut user).await.unwrap();

    assert!(storage
        .find_tickers_by_user(&user, FindOptions::none())
        .await
        .unwrap()
        .is_empty());

    storage.add_ticker_user(ticker.id, user.id).await.unwrap();
    storage.add_ticker_user(ticker.id, user.id).await.unwrap();
    let tickers = storage
        .find_tickers_by_user(&user, FindOptions::none())
        .await
        .unwrap();
    assert_eq!(tickers.len(), 1);

    storage.remove_ticker_user(ticker.id, user.id).await.unwrap();
    assert!(storage
        .find_tickers_by_user(&user, FindOptions::none())
        .await
        .unwrap()
        .is_empty());

    let mut admin = User::new("admin@example.org", "hash");
    admin.is_super_admin = true;
    storage.save_user(&mut admin).await.unwrap();
    assert_eq!(
        storage
            .find_tickers_by_user(&admin, FindOptions::none())
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let storage = MemoryStorage::new();
    let mut first = User::new("editor@example.org", "hash");
    storage.save_user(&mut first).await.unwrap();

    let mut second = User::new("Editor@Example.org", "hash");
    assert!(storage.save_user(&mut second).await.is_err());

    let found = storage
        .find_user_by_email("EDITOR@example.org", FindOptions::none())
        .await
        .unwrap();
    assert_eq!(found.id, first.id);
}

#[tokio::test]
async fn test_settings_defaults_and_save() {
    let storage = MemoryStorage::new();
    assert_eq!(
        storage.get_refresh_interval().await.unwrap(),
        RefreshInterval::default()
    );
    assert_eq!(
        storage.get_inactive_settings().await.unwrap(),
        InactiveSettings::default()
    );

    storage
        .save_refresh_interval(&RefreshInterval {
            refresh_interval: 20_000,
        })
        .await
        .unwrap();
    let settings = InactiveSettings {
        headline: "Paused".to_string(),
        ..Default::default()
    };
    storage.save_inactive_settings(&settings).await.unwrap();

    assert_eq!(
        storage.get_refresh_interval().await.unwrap().refresh_interval,
        20_000
    );
    assert_eq!(storage.get_inactive_settings().await.unwrap().headline, "Paused");
}

#[tokio::test]
async fn test_find_uploads_by_uuids_keeps_order() {
    let (storage, ticker) = seeded().await;
    let mut a = Upload::new(ticker.id, "image/png");
    let mut b = Upload::new(ticker.id, "image/jpeg");
    storage.save_upload(&mut a).await.unwrap();
    storage.save_upload(&mut b).await.unwrap();

    let found = storage
        .find_uploads_by_uuids(&[b.uuid, uuid::Uuid::new_v4(), a.uuid])
        .await
        .unwrap();
    assert_eq!(
        found.iter().map(|u| u.uuid).collect::<Vec<_>>(),
        vec![b.uuid, a.uuid]
    );

    storage.delete_uploads(&[a.uuid, b.uuid]).await.unwrap();
    assert!(storage.find_upload_by_uuid(a.uuid).await.is_err());
}

#[tokio::test]
async fn test_save_user_keeps_ticker_associations() {
    let (storage, ticker) = seeded().await;
    let mut user = User::new("editor@example.org", "hash");
    storage.save_user(&mut user).await.unwrap();
    storage.add_ticker_user(ticker.id, user.id).await.unwrap();

    // 연결 없이 불러온 사용자를 다시 저장해도 연결은 유지
    let mut loaded = storage
        .find_user_by_id(user.id, FindOptions::none())
        .await
        .unwrap();
    loaded.last_login = Some(chrono::Utc::now());
    storage.save_user(&mut loaded).await.unwrap();

    let user = storage
        .find_user_by_id(user.id, FindOptions::none().with_tickers())
        .await
        .unwrap();
    assert_eq!(user.tickers, vec![ticker.id]);
    assert!(user.last_login.is_some());
}
