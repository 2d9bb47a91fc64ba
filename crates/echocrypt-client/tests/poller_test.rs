//! Active-room polling tests.
//!
//! These run under a paused tokio clock, so poll intervals elapse
//! deterministically without wall-clock waits.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use echocrypt_client::{ChatTransport, Poller, Session, TransportError};
use echocrypt_core::{EncryptedMessage, Environment, Room, RoomId, UserId, UserProfile};
use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Clone, Default)]
struct TestEnv {
    clock: Arc<AtomicI64>,
    rng: Arc<AtomicU64>,
}

impl Environment for TestEnv {
    fn now_millis(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    // Real tokio sleep: the paused test clock drives it
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for chunk in buffer.chunks_mut(8) {
            let value = self.rng.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            let bytes = value.to_be_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

// Transport that only counts pulls per room; logs stay empty.
#[derive(Clone)]
struct CountingTransport {
    me: UserId,
    pulls: Arc<Mutex<HashMap<RoomId, usize>>>,
    fail_pulls: Arc<AtomicBool>,
    next: Arc<AtomicU64>,
}

impl CountingTransport {
    fn new(me: UserId) -> Self {
        Self {
            me,
            pulls: Arc::new(Mutex::new(HashMap::new())),
            fail_pulls: Arc::new(AtomicBool::new(false)),
            next: Arc::new(AtomicU64::new(1)),
        }
    }

    fn pulls_for(&self, room_id: RoomId) -> usize {
        self.pulls.lock().get(&room_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ChatTransport for CountingTransport {
    async fn create_room(&self, name: &str) -> Result<Room, TransportError> {
        let id = Uuid::from_u128(u128::from(self.next.fetch_add(1, Ordering::Relaxed)));
        Ok(Room {
            id,
            name: name.to_string(),
            owner_id: self.me,
            member_ids: vec![self.me],
        })
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, TransportError> {
        Ok(Vec::new())
    }

    async fn join_room(&self, _room_id: RoomId) -> Result<Room, TransportError> {
        Err(TransportError::NotFound("room".to_string()))
    }

    async fn list_messages(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<EncryptedMessage>, TransportError> {
        *self.pulls.lock().entry(room_id).or_insert(0) += 1;
        if self.fail_pulls.load(Ordering::Relaxed) {
            return Err(TransportError::Network("connection refused".to_string()));
        }
        Ok(Vec::new())
    }

    async fn send_message(
        &self,
        _room_id: RoomId,
        _ciphertext: Vec<u8>,
    ) -> Result<EncryptedMessage, TransportError> {
        Err(TransportError::Rejected("not used here".to_string()))
    }

    async fn fetch_users(&self, _ids: &[UserId]) -> Result<Vec<UserProfile>, TransportError> {
        Ok(Vec::new())
    }
}

const INTERVAL: Duration = Duration::from_millis(100);

fn setup() -> (Arc<Session<CountingTransport, TestEnv>>, CountingTransport) {
    let me = UserProfile {
        id: Uuid::from_u128(1),
        username: "alice".to_string(),
        avatar_url: None,
    };
    let transport = CountingTransport::new(me.id);
    let session = Arc::new(Session::new(me, transport.clone(), TestEnv::default()));
    (session, transport)
}

async fn ticks(n: u32) {
    tokio::time::sleep(INTERVAL * n + Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn polls_the_active_room_on_every_interval() {
    let (session, transport) = setup();
    let room = session.create_room("general").await.unwrap();

    let mut poller = Poller::with_interval(Arc::clone(&session), INTERVAL);
    poller.set_active_room(Some(room.id));

    ticks(3).await;

    // Immediate sync on activation plus one per elapsed interval
    assert!(transport.pulls_for(room.id) >= 3);
    assert_eq!(poller.active_room(), Some(room.id));
}

#[tokio::test(start_paused = true)]
async fn switching_rooms_stops_the_old_poll() {
    let (session, transport) = setup();
    let a = session.create_room("a").await.unwrap();
    let b = session.create_room("b").await.unwrap();

    let mut poller = Poller::with_interval(Arc::clone(&session), INTERVAL);
    poller.set_active_room(Some(a.id));
    ticks(2).await;

    poller.set_active_room(Some(b.id));
    tokio::task::yield_now().await;
    let pulls_of_a = transport.pulls_for(a.id);

    ticks(3).await;

    assert_eq!(transport.pulls_for(a.id), pulls_of_a, "old room must not be polled");
    assert!(transport.pulls_for(b.id) >= 3);
}

#[tokio::test(start_paused = true)]
async fn clearing_the_active_room_stops_polling() {
    let (session, transport) = setup();
    let room = session.create_room("general").await.unwrap();

    let mut poller = Poller::with_interval(Arc::clone(&session), INTERVAL);
    poller.set_active_room(Some(room.id));
    ticks(1).await;

    poller.set_active_room(None);
    tokio::task::yield_now().await;
    let pulls = transport.pulls_for(room.id);

    ticks(3).await;

    assert_eq!(transport.pulls_for(room.id), pulls);
    assert_eq!(poller.active_room(), None);
}

#[tokio::test(start_paused = true)]
async fn pull_failures_do_not_kill_the_loop() {
    let (session, transport) = setup();
    let room = session.create_room("general").await.unwrap();
    transport.fail_pulls.store(true, Ordering::Relaxed);

    let mut poller = Poller::with_interval(Arc::clone(&session), INTERVAL);
    poller.set_active_room(Some(room.id));
    ticks(2).await;

    let failing_pulls = transport.pulls_for(room.id);
    assert!(failing_pulls >= 2, "loop must survive failed pulls");

    // Recovery picks up on the next tick without intervention
    transport.fail_pulls.store(false, Ordering::Relaxed);
    ticks(2).await;
    assert!(transport.pulls_for(room.id) > failing_pulls);
    assert!(session.messages(room.id).is_empty());
}

#[tokio::test(start_paused = true)]
async fn setting_the_same_room_again_is_a_noop() {
    let (session, _transport) = setup();
    let room = session.create_room("general").await.unwrap();

    let mut poller = Poller::with_interval(Arc::clone(&session), INTERVAL);
    poller.set_active_room(Some(room.id));
    ticks(1).await;

    poller.set_active_room(Some(room.id));
    assert_eq!(poller.active_room(), Some(room.id));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_poller_stops_polling() {
    let (session, transport) = setup();
    let room = session.create_room("general").await.unwrap();

    let mut poller = Poller::with_interval(Arc::clone(&session), INTERVAL);
    poller.set_active_room(Some(room.id));
    ticks(1).await;
    drop(poller);
    tokio::task::yield_now().await;

    let pulls = transport.pulls_for(room.id);
    ticks(3).await;
    assert_eq!(transport.pulls_for(room.id), pulls);
}
