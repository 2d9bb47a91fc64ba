//! Room State Store tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use echocrypt_core::{Environment, NONCE_LEN, UserId};
use echocrypt_server::{RoomStore, StoreError};
use uuid::Uuid;

// Deterministic test environment: counter clock, counter RNG.
#[derive(Clone, Default)]
struct TestEnv {
    clock: Arc<AtomicI64>,
    rng: Arc<AtomicU64>,
}

impl Environment for TestEnv {
    fn now_millis(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for chunk in buffer.chunks_mut(8) {
            let value = self.rng.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            let bytes = value.to_be_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

fn user(n: u128) -> UserId {
    Uuid::from_u128(n)
}

fn ciphertext(tag: u8) -> Vec<u8> {
    vec![tag; NONCE_LEN + 16]
}

#[test]
fn create_room_makes_owner_the_only_member() {
    let store = RoomStore::new(TestEnv::default());

    let room = store.create_room("general", user(1));

    assert_eq!(room.name, "general");
    assert_eq!(room.owner_id, user(1));
    assert_eq!(room.member_ids, vec![user(1)]);
}

#[test]
fn created_rooms_get_distinct_ids() {
    let store = RoomStore::new(TestEnv::default());

    let a = store.create_room("one", user(1));
    let b = store.create_room("two", user(1));

    assert_ne!(a.id, b.id);
}

#[test]
fn join_unknown_room_fails() {
    let store = RoomStore::new(TestEnv::default());

    let result = store.join(user(99), user(2));
    assert!(matches!(result, Err(StoreError::RoomNotFound(_))));
}

#[test]
fn join_is_idempotent() {
    let store = RoomStore::new(TestEnv::default());
    let room = store.create_room("general", user(1));

    let first = store.join(room.id, user(2)).unwrap();
    let second = store.join(room.id, user(2)).unwrap();

    assert_eq!(first.member_ids, vec![user(1), user(2)]);
    assert_eq!(second.member_ids, vec![user(1), user(2)]);

    // Owner re-joining is also a no-op
    let third = store.join(room.id, user(1)).unwrap();
    assert_eq!(third.member_ids, vec![user(1), user(2)]);
}

#[test]
fn append_requires_membership() {
    let store = RoomStore::new(TestEnv::default());
    let room = store.create_room("general", user(1));

    let result = store.append_message(room.id, user(2), ciphertext(0xaa));
    assert!(matches!(result, Err(StoreError::NotAMember { .. })));

    // After joining, the same sender succeeds
    store.join(room.id, user(2)).unwrap();
    assert!(store.append_message(room.id, user(2), ciphertext(0xaa)).is_ok());
}

#[test]
fn append_rejects_ciphertext_shorter_than_nonce() {
    let store = RoomStore::new(TestEnv::default());
    let room = store.create_room("general", user(1));

    let result = store.append_message(room.id, user(1), vec![0u8; NONCE_LEN - 1]);
    assert!(matches!(result, Err(StoreError::CiphertextTooShort { .. })));
}

#[test]
fn list_requires_membership_on_every_call() {
    let store = RoomStore::new(TestEnv::default());
    let room = store.create_room("general", user(1));

    assert!(matches!(
        store.list_messages(room.id, user(2)),
        Err(StoreError::NotAMember { .. })
    ));

    store.join(room.id, user(2)).unwrap();
    assert!(store.list_messages(room.id, user(2)).is_ok());
}

#[test]
fn messages_come_back_in_append_order() {
    let store = RoomStore::new(TestEnv::default());
    let room = store.create_room("general", user(1));

    let first = store.append_message(room.id, user(1), ciphertext(1)).unwrap();
    let second = store.append_message(room.id, user(1), ciphertext(2)).unwrap();
    let third = store.append_message(room.id, user(1), ciphertext(3)).unwrap();

    let log = store.list_messages(room.id, user(1)).unwrap();
    assert_eq!(log, vec![first.clone(), second.clone(), third.clone()]);

    // Timestamps never decrease along the log
    assert!(first.timestamp <= second.timestamp);
    assert!(second.timestamp <= third.timestamp);
}

#[test]
fn appended_messages_get_distinct_ids() {
    let store = RoomStore::new(TestEnv::default());
    let room = store.create_room("general", user(1));

    let a = store.append_message(room.id, user(1), ciphertext(1)).unwrap();
    let b = store.append_message(room.id, user(1), ciphertext(1)).unwrap();

    assert_ne!(a.id, b.id);
}

#[test]
fn concurrent_appends_lose_nothing() {
    const WRITERS: usize = 8;
    const PER_WRITER: usize = 25;

    let store = Arc::new(RoomStore::new(TestEnv::default()));
    let room = store.create_room("busy", user(1));
    for w in 0..WRITERS {
        store.join(room.id, user(100 + w as u128)).unwrap();
    }

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let store = Arc::clone(&store);
            let room_id = room.id;
            std::thread::spawn(move || {
                for _ in 0..PER_WRITER {
                    store
                        .append_message(room_id, user(100 + w as u128), ciphertext(w as u8))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let log = store.list_messages(room.id, user(1)).unwrap();
    assert_eq!(log.len(), WRITERS * PER_WRITER, "no appends lost or duplicated");

    // Every message id is distinct
    let mut ids: Vec<_> = log.iter().map(|m| m.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), WRITERS * PER_WRITER);

    // Log order is a total order consistent with non-decreasing timestamps
    for pair in log.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[test]
fn rooms_for_user_only_includes_memberships() {
    let store = RoomStore::new(TestEnv::default());

    let mine = store.create_room("mine", user(1));
    let joined = store.create_room("other", user(2));
    store.join(joined.id, user(1)).unwrap();
    let _foreign = store.create_room("foreign", user(3));

    let mut ids: Vec<_> = store.rooms_for_user(user(1)).into_iter().map(|r| r.id).collect();
    ids.sort();
    let mut expected = vec![mine.id, joined.id];
    expected.sort();

    assert_eq!(ids, expected);
}
