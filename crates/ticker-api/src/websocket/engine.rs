//! 실시간 브로드캐스트 엔진.
//!
//! 하나의 실행 루프가 `ticker_id → 클라이언트 집합` 인덱스를 단독으로 소유합니다.
//! 외부에서는 네 개의 채널(register, unregister, broadcast, shutdown)을 통해서만
//! 인덱스를 변경할 수 있습니다.
//!
//! # 채널 포화 정책
//!
//! `register`, `unregister`, `broadcast`는 블로킹하지 않습니다. 채널이 가득 차면
//! 제출을 버리고 경고를 남깁니다. HTTP 핸들러가 느린 루프에 묶이지 않습니다.
//!
//! # 상태 전이
//!
//! ```text
//! Created ──start──▶ Running ──shutdown──▶ ShuttingDown ──close_all──▶ Done
//! ```

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use ticker_core::RealtimeConfig;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::{Client, ClientTimings};
use super::messages::BroadcastMessage;
use crate::metrics::{
    record_broadcast_duration, record_client_connected, record_client_disconnected,
    record_message_dropped, record_message_sent, set_total_connected_clients,
};

pub const REASON_CHANNEL_FULL: &str = "channel_full";
pub const REASON_SERVER_SHUTDOWN: &str = "server_shutdown";
pub const REASON_CLIENT_DISCONNECTED: &str = "client_disconnected";

/// 엔진 입력 큐 포화로 버려진 broadcast의 origin 라벨.
const ENGINE_ORIGIN_LABEL: &str = "engine";

// ==================== 설정 ====================

/// 엔진 설정.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub broadcast_capacity: usize,
    pub register_capacity: usize,
    pub client_queue_capacity: usize,
    pub write_wait: Duration,
    pub pong_wait: Duration,
    pub client_close_wait: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&RealtimeConfig::default())
    }
}

impl From<&RealtimeConfig> for EngineConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            broadcast_capacity: config.broadcast_capacity.max(1),
            register_capacity: config.register_capacity.max(1),
            client_queue_capacity: config.client_queue_capacity.max(1),
            write_wait: Duration::from_millis(config.write_wait_ms),
            pong_wait: Duration::from_millis(config.pong_wait_ms),
            client_close_wait: Duration::from_millis(config.client_close_wait_ms),
        }
    }
}

// ==================== 에러 ====================

/// 엔진 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("종료 기한 초과: {0:?}")]
    ShutdownTimeout(Duration),
}

// ==================== 상태 ====================

/// 엔진 수명 주기 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Running,
    ShuttingDown,
    Done,
}

type ClientIndex = HashMap<i64, HashMap<u64, Arc<Client>>>;

struct Receivers {
    register: mpsc::Receiver<Arc<Client>>,
    unregister: mpsc::Receiver<Arc<Client>>,
    broadcast: mpsc::Receiver<BroadcastMessage>,
}

enum Step {
    Continue,
    Shutdown,
}

// ==================== Engine ====================

/// 실시간 엔진.
pub struct Engine {
    config: EngineConfig,
    register_tx: mpsc::Sender<Arc<Client>>,
    unregister_tx: mpsc::Sender<Arc<Client>>,
    broadcast_tx: mpsc::Sender<BroadcastMessage>,
    receivers: Mutex<Option<Receivers>>,
    /// 실행 루프와 종료 시퀀스만 잠급니다.
    clients: tokio::sync::Mutex<ClientIndex>,
    state: Mutex<EngineState>,
    shutdown: CancellationToken,
    done: CancellationToken,
    connected: AtomicUsize,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Arc<Self> {
        let (register_tx, register) = mpsc::channel(config.register_capacity);
        let (unregister_tx, unregister) = mpsc::channel(config.register_capacity);
        let (broadcast_tx, broadcast) = mpsc::channel(config.broadcast_capacity);

        Arc::new(Self {
            config,
            register_tx,
            unregister_tx,
            broadcast_tx,
            receivers: Mutex::new(Some(Receivers {
                register,
                unregister,
                broadcast,
            })),
            clients: tokio::sync::Mutex::new(HashMap::new()),
            state: Mutex::new(EngineState::Created),
            shutdown: CancellationToken::new(),
            done: CancellationToken::new(),
            connected: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn client_timings(&self) -> ClientTimings {
        ClientTimings {
            write_wait: self.config.write_wait,
            pong_wait: self.config.pong_wait,
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    /// 현재 등록된 클라이언트 수.
    pub fn connected_clients(&self) -> usize {
        self.connected.load(Ordering::Acquire)
    }

    /// 실행 루프를 시작합니다. 이미 시작된 엔진이면 `None`.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let receivers = self
            .receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != EngineState::Created {
                return None;
            }
            *state = EngineState::Running;
        }

        info!("Realtime engine started");
        Some(tokio::spawn(Arc::clone(self).run(receivers)))
    }

    // ==================== 외부 제출 (non-blocking) ====================

    /// 클라이언트 등록 요청. 채널이 가득 찼거나 엔진이 멈췄으면 버리고 `false`.
    pub fn register(&self, client: Arc<Client>) -> bool {
        match self.register_tx.try_send(client) {
            Ok(()) => true,
            Err(TrySendError::Full(client)) => {
                warn!(
                    client_id = client.id(),
                    ticker_id = client.ticker_id(),
                    "Register channel full, dropping registration"
                );
                false
            }
            Err(TrySendError::Closed(client)) => {
                debug!(client_id = client.id(), "Engine stopped, rejecting registration");
                client.close();
                false
            }
        }
    }

    /// 클라이언트 해제 요청. 채널이 가득 찼거나 엔진이 멈췄으면 버리고 `false`.
    pub fn unregister(&self, client: Arc<Client>) -> bool {
        match self.unregister_tx.try_send(client) {
            Ok(()) => true,
            Err(TrySendError::Full(client)) => {
                warn!(
                    client_id = client.id(),
                    ticker_id = client.ticker_id(),
                    "Unregister channel full, dropping unregistration"
                );
                false
            }
            // 멈춘 엔진에는 해제할 인덱스가 없음
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// 티커 구독자에게 메시지를 전달합니다.
    ///
    /// 채널이 가득 차면 버리고 드롭 카운터를 올립니다. 멈춘 엔진에 대한
    /// 제출은 드롭으로 세지 않습니다.
    pub fn broadcast(&self, message: BroadcastMessage) -> bool {
        match self.broadcast_tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!(
                    ticker_id = message.ticker_id,
                    kind = %message.kind,
                    "Broadcast channel full, dropping message"
                );
                record_message_dropped(ENGINE_ORIGIN_LABEL, message.kind.as_str());
                false
            }
            Err(TrySendError::Closed(message)) => {
                debug!(
                    ticker_id = message.ticker_id,
                    kind = %message.kind,
                    "Engine stopped, ignoring broadcast"
                );
                false
            }
        }
    }

    // ==================== 종료 ====================

    /// 엔진을 종료합니다.
    ///
    /// 시작되지 않은 엔진은 즉시 성공합니다. 반복 호출은 안전합니다.
    /// `deadline` 안에 끝나지 않으면 남은 연결의 강제 종료를 별도 태스크로
    /// 넘기고 `EngineError::ShutdownTimeout`을 반환합니다.
    pub async fn shutdown(self: &Arc<Self>, deadline: Duration) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match *state {
                EngineState::Created | EngineState::Done => return Ok(()),
                EngineState::Running => *state = EngineState::ShuttingDown,
                EngineState::ShuttingDown => {}
            }
        }
        // 두 번 취소해도 안전
        self.shutdown.cancel();

        match tokio::time::timeout(deadline, self.done.cancelled()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(?deadline, "Realtime engine shutdown deadline exceeded, forcing close");
                let engine = Arc::clone(self);
                tokio::spawn(async move { engine.force_close_all().await });
                Err(EngineError::ShutdownTimeout(deadline))
            }
        }
    }

    // ==================== 실행 루프 ====================

    async fn run(self: Arc<Self>, mut receivers: Receivers) {
        loop {
            match AssertUnwindSafe(self.step(&mut receivers))
                .catch_unwind()
                .await
            {
                Ok(Step::Continue) => {}
                Ok(Step::Shutdown) => break,
                Err(_) => error!("Recovered from panic in realtime engine loop"),
            }
        }

        self.close_all_connections().await;

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = EngineState::Done;
        self.done.cancel();
        info!("Realtime engine stopped");
    }

    async fn step(&self, receivers: &mut Receivers) -> Step {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Step::Shutdown,
            Some(client) = receivers.register.recv() => {
                self.add_client(client).await;
                Step::Continue
            }
            Some(client) = receivers.unregister.recv() => {
                self.remove_client(&client).await;
                Step::Continue
            }
            Some(message) = receivers.broadcast.recv() => {
                self.fan_out(message).await;
                Step::Continue
            }
        }
    }

    async fn add_client(&self, client: Arc<Client>) {
        if client.is_closed() {
            debug!(client_id = client.id(), "Ignoring registration of closed client");
            return;
        }

        let mut clients = self.clients.lock().await;
        let previous = clients
            .entry(client.ticker_id())
            .or_default()
            .insert(client.id(), Arc::clone(&client));
        if previous.is_none() {
            let total = self.connected.fetch_add(1, Ordering::AcqRel) + 1;
            record_client_connected(client.origin());
            set_total_connected_clients(total);
        }

        debug!(
            client_id = client.id(),
            ticker_id = client.ticker_id(),
            origin = %client.origin(),
            "Client registered"
        );
    }

    async fn remove_client(&self, client: &Arc<Client>) {
        let mut clients = self.clients.lock().await;
        if Self::detach(&mut clients, client.ticker_id(), client.id()).is_none() {
            return;
        }
        client.close();
        self.record_removal(client, REASON_CLIENT_DISCONNECTED);

        debug!(
            client_id = client.id(),
            ticker_id = client.ticker_id(),
            "Client unregistered"
        );
    }

    /// 티커의 모든 클라이언트 큐에 메시지를 넣습니다.
    ///
    /// 큐가 가득 찬 클라이언트는 메시지를 받지 못하고 즉시 제거됩니다.
    async fn fan_out(&self, message: BroadcastMessage) {
        let started = Instant::now();
        let kind = message.kind.as_str();
        let ticker_id = message.ticker_id;
        #[cfg(test)]
        if ticker_id == tests::PANICKING_TICKER {
            panic!("fan-out failure for ticker {}", ticker_id);
        }
        let message = Arc::new(message);

        let mut clients = self.clients.lock().await;
        let Some(targets) = clients.get(&ticker_id) else {
            debug!(ticker_id, kind, "No clients for broadcast");
            return;
        };

        let mut dead = Vec::new();
        let mut origins = HashSet::new();
        for client in targets.values() {
            origins.insert(client.origin().to_string());
            match client.try_send(Arc::clone(&message)) {
                Ok(()) => record_message_sent(client.origin(), kind),
                Err(e) => {
                    record_message_dropped(client.origin(), kind);
                    debug!(client_id = client.id(), error = %e, "Client queue rejected message");
                    dead.push(Arc::clone(client));
                }
            }
        }

        for client in dead {
            if Self::detach(&mut clients, ticker_id, client.id()).is_some() {
                client.close();
                self.record_removal(&client, REASON_CHANNEL_FULL);
                warn!(
                    client_id = client.id(),
                    ticker_id,
                    origin = %client.origin(),
                    "Evicted slow client"
                );
            }
        }
        drop(clients);

        let elapsed = started.elapsed();
        for origin in &origins {
            record_broadcast_duration(origin, kind, elapsed);
        }
    }

    fn detach(clients: &mut ClientIndex, ticker_id: i64, client_id: u64) -> Option<Arc<Client>> {
        let targets = clients.get_mut(&ticker_id)?;
        let removed = targets.remove(&client_id);
        if targets.is_empty() {
            clients.remove(&ticker_id);
        }
        removed
    }

    fn record_removal(&self, client: &Client, reason: &str) {
        let total = self
            .connected
            .fetch_sub(1, Ordering::AcqRel)
            .saturating_sub(1);
        record_client_disconnected(client.origin(), reason);
        set_total_connected_clients(total);
    }

    /// 모든 클라이언트에 종료 알림을 보내고 연결을 닫습니다.
    ///
    /// 알림을 받은 클라이언트는 인덱스에서 빠지며, 기한 초과로 강제 종료가
    /// 먼저 실행되어도 해제가 두 번 기록되지 않습니다.
    async fn close_all_connections(&self) {
        let notified: Vec<Arc<Client>> = {
            let mut clients = self.clients.lock().await;
            let drained: Vec<_> = clients
                .drain()
                .flat_map(|(_, targets)| targets.into_values())
                .collect();
            for client in &drained {
                let notice = Arc::new(BroadcastMessage::server_shutdown(client.ticker_id()));
                let kind = notice.kind.as_str();
                match client.try_send(notice) {
                    Ok(()) => record_message_sent(client.origin(), kind),
                    Err(_) => record_message_dropped(client.origin(), kind),
                }
                client.close();
                self.record_removal(client, REASON_SERVER_SHUTDOWN);
            }
            drained
        };

        // 쓰기 펌프가 close 프레임을 보낼 시간
        tokio::time::sleep(self.config.client_close_wait).await;

        for client in &notified {
            client.close_connection();
        }
        self.force_close_all().await;
    }

    /// 인덱스에 남은 연결을 알림 없이 닫습니다.
    async fn force_close_all(&self) {
        let mut clients = self.clients.lock().await;
        let remaining: Vec<_> = clients
            .drain()
            .flat_map(|(_, targets)| targets.into_values())
            .collect();
        drop(clients);

        for client in &remaining {
            client.close();
            client.close_connection();
            self.record_removal(client, REASON_SERVER_SHUTDOWN);
        }

        if !remaining.is_empty() {
            info!(count = remaining.len(), "Closed remaining WebSocket connections");
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("connected", &self.connected_clients())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
    use serde_json::json;

    /// 이 티커로의 broadcast는 fan-out 중 panic을 일으킵니다.
    pub(super) const PANICKING_TICKER: i64 = -1;

    /// 이름과 라벨이 일치하는 카운터 값의 합.
    fn counter(snapshotter: &Snapshotter, name: &str, labels: &[(&str, &str)]) -> u64 {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| {
                let key = key.key();
                let matches = key.name() == name
                    && labels
                        .iter()
                        .all(|(k, v)| key.labels().any(|l| l.key() == *k && l.value() == *v));
                match value {
                    DebugValue::Counter(n) if matches => Some(n),
                    _ => None,
                }
            })
            .sum()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_shutdown_created_engine_is_noop() {
        let engine = Engine::new(EngineConfig::default());
        assert_eq!(engine.shutdown(Duration::from_secs(1)).await, Ok(()));
        assert_eq!(engine.state(), EngineState::Created);
    }

    #[tokio::test]
    async fn test_broadcast_before_start_does_not_panic() {
        let engine = Engine::new(EngineConfig::default());
        assert!(engine.broadcast(BroadcastMessage::message_deleted(1, 1)));
    }

    #[tokio::test]
    async fn test_broadcast_channel_full_drops() {
        let engine = Engine::new(EngineConfig {
            broadcast_capacity: 1,
            ..EngineConfig::default()
        });
        assert!(engine.broadcast(BroadcastMessage::message_deleted(1, 1)));
        assert!(!engine.broadcast(BroadcastMessage::message_deleted(1, 2)));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let engine = Engine::new(EngineConfig::default());
        engine.start().unwrap();
        assert!(engine.start().is_none());

        assert_eq!(engine.shutdown(Duration::from_secs(2)).await, Ok(()));
        assert_eq!(engine.shutdown(Duration::from_secs(2)).await, Ok(()));
        assert_eq!(engine.state(), EngineState::Done);
    }

    #[tokio::test]
    async fn test_broadcast_only_reaches_ticker_clients() {
        let engine = Engine::new(EngineConfig::default());
        engine.start().unwrap();

        let (first, mut first_rx) = Client::new(&engine, 10, "a.example", 8);
        let (second, mut second_rx) = Client::new(&engine, 20, "b.example", 8);
        assert!(engine.register(first));
        assert!(engine.register(second));
        wait_until(|| engine.connected_clients() == 2).await;

        engine.broadcast(BroadcastMessage::message_created(10, json!({ "id": 1 })));

        let received = tokio::time::timeout(Duration::from_secs(1), first_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.ticker_id, 10);
        assert!(second_rx.try_recv().is_err());

        engine.shutdown(Duration::from_secs(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_full_queue_evicts_client() {
        // current_thread 런타임이라 엔진 루프도 이 스레드의 레코더를 사용
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let engine = Engine::new(EngineConfig::default());
        engine.start().unwrap();

        let (client, mut rx) = Client::new(&engine, 3, "a.example", 1);
        engine.register(Arc::clone(&client));
        wait_until(|| engine.connected_clients() == 1).await;

        for id in 0..10 {
            engine.broadcast(BroadcastMessage::message_deleted(3, id));
        }
        wait_until(|| engine.connected_clients() == 0).await;

        assert!(client.is_closed());
        let first = rx.recv().await.unwrap();
        assert_eq!(first.data["id"], 0);
        assert!(rx.recv().await.is_none());

        let disconnect = [("origin", "a.example"), ("reason", REASON_CHANNEL_FULL)];
        assert_eq!(
            counter(&snapshotter, "websocket_disconnections_total", &disconnect),
            1
        );
        let dropped = [("origin", "a.example"), ("type", "message_deleted")];
        assert_eq!(
            counter(&snapshotter, "websocket_messages_dropped_total", &dropped),
            1
        );

        engine.shutdown(Duration::from_secs(2)).await.unwrap();
        assert_eq!(
            counter(&snapshotter, "websocket_disconnections_total", &disconnect),
            1
        );
    }

    #[tokio::test]
    async fn test_shutdown_deadline_forces_close() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let engine = Engine::new(EngineConfig {
            client_close_wait: Duration::from_millis(200),
            ..EngineConfig::default()
        });
        engine.start().unwrap();

        let (client, _rx) = Client::new(&engine, 1, "a.example", 8);
        engine.register(Arc::clone(&client));
        wait_until(|| engine.connected_clients() == 1).await;

        let deadline = Duration::from_millis(10);
        let started = Instant::now();
        assert_eq!(
            engine.shutdown(deadline).await,
            Err(EngineError::ShutdownTimeout(deadline))
        );
        assert!(started.elapsed() < Duration::from_millis(150));

        wait_until(|| engine.state() == EngineState::Done).await;
        assert!(client.is_connection_closed());
        assert_eq!(engine.connected_clients(), 0);
        assert_eq!(engine.shutdown(deadline).await, Ok(()));

        // 알림 경로와 강제 종료 경로가 겹쳐도 해제는 한 번만 기록
        let shutdown = [("origin", "a.example"), ("reason", REASON_SERVER_SHUTDOWN)];
        assert_eq!(
            counter(&snapshotter, "websocket_disconnections_total", &shutdown),
            1
        );
    }

    #[tokio::test]
    async fn test_force_close_records_remaining_clients() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let engine = Engine::new(EngineConfig::default());
        engine.start().unwrap();

        let (client, _rx) = Client::new(&engine, 4, "b.example", 8);
        engine.register(Arc::clone(&client));
        wait_until(|| engine.connected_clients() == 1).await;

        // 종료 알림 단계보다 먼저 강제 종료가 실행된 경우
        engine.force_close_all().await;

        assert!(client.is_connection_closed());
        assert_eq!(engine.connected_clients(), 0);
        let shutdown = [("origin", "b.example"), ("reason", REASON_SERVER_SHUTDOWN)];
        assert_eq!(
            counter(&snapshotter, "websocket_disconnections_total", &shutdown),
            1
        );

        engine.shutdown(Duration::from_secs(2)).await.unwrap();
        assert_eq!(
            counter(&snapshotter, "websocket_disconnections_total", &shutdown),
            1
        );
    }

    #[tokio::test]
    async fn test_loop_survives_panicking_step() {
        let engine = Engine::new(EngineConfig::default());
        engine.start().unwrap();

        let (client, mut rx) = Client::new(&engine, 7, "a.example", 8);
        engine.register(Arc::clone(&client));
        wait_until(|| engine.connected_clients() == 1).await;

        assert!(engine.broadcast(BroadcastMessage::message_deleted(PANICKING_TICKER, 1)));
        assert!(engine.broadcast(BroadcastMessage::message_deleted(7, 2)));

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.data["id"], 2);
        assert!(engine.is_running());
        assert_eq!(engine.connected_clients(), 1);

        engine.shutdown(Duration::from_secs(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_submissions_after_stop_are_not_counted_as_dropped() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let engine = Engine::new(EngineConfig::default());
        engine.start().unwrap();
        engine.shutdown(Duration::from_secs(2)).await.unwrap();
        // 루프 태스크가 수신자를 놓을 때까지 대기
        wait_until(|| engine.broadcast_tx.is_closed()).await;

        assert!(!engine.broadcast(BroadcastMessage::message_deleted(1, 1)));
        assert_eq!(
            counter(&snapshotter, "websocket_messages_dropped_total", &[("origin", "engine")]),
            0
        );

        let (client, _rx) = Client::new(&engine, 1, "a.example", 8);
        assert!(!engine.register(Arc::clone(&client)));
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_shutdown_notifies_and_clears() {
        let engine = Engine::new(EngineConfig::default());
        engine.start().unwrap();

        let (client, mut rx) = Client::new(&engine, 1, "a.example", 8);
        engine.register(Arc::clone(&client));
        wait_until(|| engine.connected_clients() == 1).await;

        engine.shutdown(Duration::from_secs(2)).await.unwrap();

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.kind, super::super::messages::MessageType::ServerShutdown);
        assert!(rx.recv().await.is_none());
        assert!(client.is_connection_closed());
        assert_eq!(engine.connected_clients(), 0);
    }

    #[tokio::test]
    async fn test_unregister_removes_client_once() {
        let engine = Engine::new(EngineConfig::default());
        engine.start().unwrap();

        let (client, _rx) = Client::new(&engine, 5, "a.example", 8);
        engine.register(Arc::clone(&client));
        wait_until(|| engine.connected_clients() == 1).await;

        client.request_unregister();
        client.request_unregister();
        wait_until(|| engine.connected_clients() == 0).await;
        assert!(client.is_closed());

        engine.shutdown(Duration::from_secs(2)).await.unwrap();
    }
}
