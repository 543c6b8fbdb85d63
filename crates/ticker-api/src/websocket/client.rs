//! 연결된 WebSocket 클라이언트.
//!
//! 각 클라이언트는 두 개의 태스크로 동작합니다.
//!
//! - `read_pump`: 수신 프레임을 버리고 pong으로 읽기 기한을 연장합니다.
//! - `write_pump`: 송신 큐의 메시지를 JSON으로 쓰고 주기적으로 ping을 보냅니다.
//!
//! 송신 큐는 최대 한 번만 닫히며, 엔진 해제 요청도 한 번만 보냅니다.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::engine::Engine;
use super::messages::BroadcastMessage;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// 클라이언트 송신 큐 항목.
pub type QueuedMessage = Arc<BroadcastMessage>;

/// 송신 큐 제출 실패.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("송신 큐가 가득 참")]
    Full,
    #[error("송신 큐가 닫힘")]
    Closed,
}

/// 소켓 I/O 타이밍.
#[derive(Debug, Clone, Copy)]
pub struct ClientTimings {
    pub write_wait: Duration,
    pub pong_wait: Duration,
}

impl ClientTimings {
    /// ping 주기는 pong 대기 시간의 90%입니다.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait * 9 / 10
    }
}

impl Default for ClientTimings {
    fn default() -> Self {
        Self {
            write_wait: Duration::from_secs(10),
            pong_wait: Duration::from_secs(60),
        }
    }
}

/// 연결된 클라이언트.
///
/// 엔진이 유일한 소유자입니다. `engine`은 자기 해제를 요청하기 위한
/// 비소유 참조입니다.
pub struct Client {
    id: u64,
    ticker_id: i64,
    origin: String,
    engine: Weak<Engine>,
    queue: Mutex<Option<mpsc::Sender<QueuedMessage>>>,
    unregistered: AtomicBool,
    connection: CancellationToken,
    timings: ClientTimings,
}

impl Client {
    /// 새 클라이언트와 송신 큐 수신단을 생성합니다.
    pub fn new(
        engine: &Arc<Engine>,
        ticker_id: i64,
        origin: impl Into<String>,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<QueuedMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let client = Arc::new(Self {
            id: NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed),
            ticker_id,
            origin: origin.into(),
            engine: Arc::downgrade(engine),
            queue: Mutex::new(Some(tx)),
            unregistered: AtomicBool::new(false),
            connection: CancellationToken::new(),
            timings: engine.client_timings(),
        });
        (client, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn ticker_id(&self) -> i64 {
        self.ticker_id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn is_closed(&self) -> bool {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// 블로킹 없이 메시지를 큐에 넣습니다.
    pub fn try_send(&self, message: QueuedMessage) -> Result<(), QueueError> {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = queue.as_ref() else {
            return Err(QueueError::Closed);
        };
        sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    /// 송신 큐를 닫습니다. 두 번째 호출부터는 아무 일도 하지 않습니다.
    ///
    /// 쓰기 펌프는 남은 메시지를 보낸 뒤 close 프레임을 쓰고 종료합니다.
    pub fn close(&self) -> bool {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// 연결을 강제로 끊습니다. 두 펌프가 모두 종료되면 소켓이 해제됩니다.
    pub fn close_connection(&self) {
        self.connection.cancel();
    }

    pub fn is_connection_closed(&self) -> bool {
        self.connection.is_cancelled()
    }

    /// 엔진에 자기 해제를 요청합니다 (최대 한 번).
    pub fn request_unregister(self: &Arc<Self>) {
        if self.unregistered.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(engine) = self.engine.upgrade() {
            engine.unregister(Arc::clone(self));
        }
    }

    /// 소켓을 나누고 읽기/쓰기 펌프를 시작합니다.
    pub fn serve(self: &Arc<Self>, socket: WebSocket, queue: mpsc::Receiver<QueuedMessage>) {
        let (sender, receiver) = socket.split();
        tokio::spawn(Arc::clone(self).write_pump(sender, queue));
        tokio::spawn(Arc::clone(self).read_pump(receiver));
    }

    /// 수신 프레임 처리.
    ///
    /// 텍스트/바이너리 프레임은 버립니다. pong을 받으면 읽기 기한을 연장합니다.
    pub async fn read_pump(self: Arc<Self>, mut receiver: SplitStream<WebSocket>) {
        let mut deadline = Instant::now() + self.timings.pong_wait;

        loop {
            let frame = tokio::select! {
                _ = self.connection.cancelled() => break,
                frame = timeout_at(deadline, receiver.next()) => frame,
            };

            match frame {
                Err(_) => {
                    debug!(client_id = self.id, "Read deadline exceeded");
                    break;
                }
                Ok(None) | Ok(Some(Ok(Message::Close(_)))) => break,
                Ok(Some(Err(e))) => {
                    debug!(client_id = self.id, error = %e, "WebSocket read error");
                    break;
                }
                Ok(Some(Ok(Message::Pong(_)))) => {
                    deadline = Instant::now() + self.timings.pong_wait;
                }
                Ok(Some(Ok(_))) => {}
            }
        }

        self.request_unregister();
        self.close_connection();
    }

    /// 송신 큐와 ping 타이머를 처리합니다.
    pub async fn write_pump(
        self: Arc<Self>,
        mut sender: SplitSink<WebSocket, Message>,
        mut queue: mpsc::Receiver<QueuedMessage>,
    ) {
        let period = self.timings.ping_period();
        let mut ping = tokio::time::interval_at(Instant::now() + period, period);
        let write_wait = self.timings.write_wait;

        loop {
            tokio::select! {
                _ = self.connection.cancelled() => break,
                next = queue.recv() => match next {
                    Some(message) => {
                        let text = match message.to_json() {
                            Ok(text) => text,
                            Err(e) => {
                                warn!(client_id = self.id, error = %e, "Failed to serialize message");
                                continue;
                            }
                        };
                        if !matches!(timeout(write_wait, sender.send(Message::Text(text.into()))).await, Ok(Ok(()))) {
                            debug!(client_id = self.id, "WebSocket write failed");
                            break;
                        }
                    }
                    None => {
                        let _ = timeout(write_wait, sender.send(Message::Close(None))).await;
                        break;
                    }
                },
                _ = ping.tick() => {
                    if !matches!(timeout(write_wait, sender.send(Message::Ping(Default::default()))).await, Ok(Ok(()))) {
                        debug!(client_id = self.id, "WebSocket ping failed");
                        break;
                    }
                }
            }
        }

        self.request_unregister();
        self.close_connection();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("ticker_id", &self.ticker_id)
            .field("origin", &self.origin)
            .field("closed", &self.is_closed())
            .finish()
    }
}
