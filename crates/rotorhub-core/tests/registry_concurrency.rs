//! Registry behavior under contention.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use rotorhub_core::{
    Device, ErrorKind, RotorMachine, SessionId, SessionRegistry, SessionService,
};
use rotorhub_harness::{
    SimEnv,
    fixtures::{identity, service, shift_request, shift_settings},
};
use rotorhub_proto::SettingsRequest;
use tokio::time::timeout;

fn machine() -> Box<dyn Device> {
    Box::new(RotorMachine::with_settings(shift_settings(&[1, 5])).unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sections_on_one_id_never_overlap() {
    let registry = Arc::new(SessionRegistry::new(SimEnv::with_seed(1)));
    let id = registry.create("alice", machine()).unwrap();

    let inside = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let inside = Arc::clone(&inside);
            let overlaps = Arc::clone(&overlaps);
            tokio::spawn(async move {
                for _ in 0..50 {
                    registry
                        .with_exclusive_access(id, |device| {
                            if inside.swap(true, Ordering::SeqCst) {
                                overlaps.fetch_add(1, Ordering::SeqCst);
                            }
                            let _ = device.encrypt_char('A');
                            std::thread::yield_now();
                            inside.store(false, Ordering::SeqCst);
                        })
                        .await
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_encrypts_serialize_rotor_steps() {
    let service = Arc::new(service(2));
    let alice = identity("alice");
    let id = service.create(Some(&alice), SettingsRequest::random(1)).await.unwrap().id;
    let id = id.to_string();

    let reference = service.encrypt(Some(&alice), &id, &"A".repeat(26)).await.unwrap();
    service.reset(Some(&alice), &id).await.unwrap();

    // 4 tasks x 13 letters = two full revolutions, back to the start
    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let alice = alice.clone();
            let id = id.clone();
            tokio::spawn(async move {
                for _ in 0..13 {
                    service.encrypt(Some(&alice), &id, "A").await.unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(service.encrypt(Some(&alice), &id, &"A".repeat(26)).await.unwrap(), reference);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn other_sessions_do_not_wait() {
    let service = service(3);
    let alice = identity("alice");
    let held = service.create(Some(&alice), shift_request(&[1])).await.unwrap().id;
    let free = service.create(Some(&alice), shift_request(&[2])).await.unwrap().id.to_string();

    let session = service.registry().get(held).unwrap();
    let _guard = session.lock().await.unwrap();

    let result =
        timeout(Duration::from_secs(5), service.encrypt(Some(&alice), &free, "ABC")).await;
    assert_eq!(result.unwrap().unwrap(), "CDE");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn same_session_waits_for_holder() {
    let service = service(4);
    let alice = identity("alice");
    let id = service.create(Some(&alice), shift_request(&[1])).await.unwrap().id;

    let session = service.registry().get(id).unwrap();
    let guard = session.lock().await.unwrap();

    let id_text = id.to_string();
    let blocked =
        timeout(Duration::from_millis(50), service.reset(Some(&alice), &id_text)).await;
    assert!(blocked.is_err(), "reset must wait for the holder");

    drop(guard);
    service.reset(Some(&alice), &id_text).await.unwrap();
}

#[tokio::test]
async fn keyed_sections_share_the_session_lock() {
    let service = service(9);
    let alice = identity("alice");
    let id = service.create(Some(&alice), shift_request(&[1])).await.unwrap().id;
    let registry = service.registry();

    let guard = registry.get(id).unwrap().lock().await.unwrap();
    let section = registry.with_exclusive_access(id, |d| d.reset());
    let blocked = timeout(Duration::from_millis(50), section).await;
    assert!(blocked.is_err(), "keyed section must wait for the holder");

    drop(guard);
    let out = registry.with_exclusive_access(id, |d| d.encrypt("A")).await.unwrap();
    assert_eq!(out.unwrap(), "B");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_deletes_have_one_winner() {
    let service = Arc::new(service(5));
    let alice = identity("alice");
    let id = service.create(Some(&alice), shift_request(&[1])).await.unwrap().id.to_string();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let alice = alice.clone();
            let id = id.clone();
            tokio::spawn(async move { service.delete(Some(&alice), &id).await })
        })
        .collect();

    let mut wins = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => wins += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::NotFound),
        }
    }
    assert_eq!(wins, 1);
    assert!(service.registry().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn no_access_after_delete_completes() {
    let service = Arc::new(service(6));
    let alice = identity("alice");
    let id = service.create(Some(&alice), shift_request(&[1])).await.unwrap().id;

    let session = service.registry().get(id).unwrap();
    let guard = session.lock().await.unwrap();

    let waiter = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.lock().await.map(|_| ()) })
    };
    let deleter = {
        let service = Arc::clone(&service);
        let alice = alice.clone();
        let id = id.to_string();
        tokio::spawn(async move { service.delete(Some(&alice), &id).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(guard);

    deleter.await.unwrap().unwrap();
    // The waiter may have been granted the lock before the delete retired
    // the device; once the delete has finished, no new access is granted.
    let _ = waiter.await.unwrap();
    assert_eq!(session.lock().await.err().map(|e| e.kind()), Some(ErrorKind::NotFound));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_unique_ids() {
    let service: Arc<SessionService<SimEnv>> = Arc::new(service(7));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let owner = identity(&format!("user{}", i % 3));
                let mut ids = Vec::new();
                for _ in 0..10 {
                    ids.push(service.create(Some(&owner), shift_request(&[1])).await.unwrap().id);
                }
                ids
            })
        })
        .collect();

    let mut all: HashSet<SessionId> = HashSet::new();
    for task in tasks {
        for id in task.await.unwrap() {
            assert!(all.insert(id), "duplicate id {id}");
        }
    }
    assert_eq!(all.len(), 160);
    assert_eq!(service.registry().len(), 160);
}
