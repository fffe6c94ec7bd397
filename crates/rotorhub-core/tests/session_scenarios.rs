//! End-to-end session scenarios through the service.

use rotorhub_core::{CoreError, ErrorKind, ExistencePolicy, ServiceConfig, SessionService};
use rotorhub_harness::{
    SimEnv,
    fixtures::{identity, service, shift_request, shift_settings},
};
use rotorhub_proto::{MachineSettings, SettingsRequest, WheelSetting};

#[tokio::test]
async fn random_wheels_replay_after_reset() {
    let service = service(1);
    let alice = identity("alice");

    let created = service.create(Some(&alice), SettingsRequest::random(3)).await.unwrap();
    assert_eq!(created.settings.wheel_count(), 3);

    let id = created.id.to_string();
    let first = service.encrypt(Some(&alice), &id, "HELLO").await.unwrap();
    assert_eq!(first.len(), 5);
    assert!(first.chars().all(|c| c.is_ascii_uppercase()));

    service.reset(Some(&alice), &id).await.unwrap();
    let second = service.encrypt(Some(&alice), &id, "HELLO").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn explicit_wheels_encrypt_predictably() {
    let service = service(2);
    let alice = identity("alice");

    let created = service.create(Some(&alice), shift_request(&[1])).await.unwrap();
    assert_eq!(created.settings, shift_settings(&[1]));

    let id = created.id.to_string();
    assert_eq!(service.encrypt(Some(&alice), &id, "Hello World").await.unwrap(), "Ifmmp Xpsme");
    assert_eq!(service.get_settings(Some(&alice), &id).await.unwrap(), shift_settings(&[1]));
}

#[tokio::test]
async fn duplicate_mapping_is_rejected_and_settings_kept() {
    let service = service(3);
    let alice = identity("alice");
    let id = service.create(Some(&alice), shift_request(&[2])).await.unwrap().id.to_string();

    let mut mappings: Vec<i64> = (0..26).collect();
    mappings[25] = 0;
    let bad = SettingsRequest::explicit(MachineSettings::new(vec![WheelSetting::new(mappings)]));

    let err = service.update_settings(Some(&alice), &id, bad).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(service.get_settings(Some(&alice), &id).await.unwrap(), shift_settings(&[2]));
}

#[tokio::test]
async fn invalid_create_registers_nothing() {
    let service = service(4);
    let alice = identity("alice");

    for request in [
        SettingsRequest::random(0),
        SettingsRequest::default(),
        SettingsRequest::explicit(MachineSettings::default()),
        SettingsRequest {
            machine_settings: Some(shift_settings(&[1])),
            ..SettingsRequest::random(2)
        },
    ] {
        let err = service.create(Some(&alice), request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{err}");
    }
    assert!(service.registry().is_empty());
}

#[tokio::test]
async fn cross_owner_denial_consumes_no_rotor_progress() {
    let service = service(5);
    let alice = identity("alice");
    let mallory = identity("mallory");
    let id = service.create(Some(&alice), SettingsRequest::random(2)).await.unwrap().id.to_string();

    let err = service.encrypt(Some(&mallory), &id, "AAAA").await.unwrap_err();
    assert_eq!(err.code(), 403);
    for err in [
        service.get_settings(Some(&mallory), &id).await.unwrap_err(),
        service.reset(Some(&mallory), &id).await.unwrap_err(),
        service.delete(Some(&mallory), &id).await.unwrap_err(),
        service.update_settings(Some(&mallory), &id, shift_request(&[1])).await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    let alice_first = service.encrypt(Some(&alice), &id, "AAAA").await.unwrap();
    service.reset(Some(&alice), &id).await.unwrap();
    assert_eq!(service.encrypt(Some(&alice), &id, "AAAA").await.unwrap(), alice_first);
}

#[tokio::test]
async fn concealed_sessions_look_missing() {
    let config =
        ServiceConfig { existence_policy: ExistencePolicy::Conceal, ..ServiceConfig::default() };
    let service = SessionService::new(SimEnv::with_seed(6), config);
    let alice = identity("alice");
    let id = service.create(Some(&alice), shift_request(&[1])).await.unwrap().id.to_string();

    let err = service.get_settings(Some(&identity("bob")), &id).await.unwrap_err();
    assert_eq!(err, CoreError::NotFound(id));
}

#[tokio::test]
async fn unauthenticated_callers_are_rejected_first() {
    let service = service(7);

    let err = service.create(None, SettingsRequest::random(1)).await.unwrap_err();
    assert_eq!(err.code(), 401);
    assert!(service.registry().is_empty());

    // Rejected before the id is even parsed
    let err = service.encrypt(None, "not-an-id", "HELLO").await.unwrap_err();
    assert_eq!(err.code(), 401);
}

#[tokio::test]
async fn invalid_plaintext_is_checked_before_lookup() {
    let service = service(8);
    let alice = identity("alice");

    let err = service.encrypt(Some(&alice), "missing", "HELLO 123").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = service.encrypt(Some(&alice), "missing", "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let service = service(9);
    let alice = identity("alice");

    let unknown = "0".repeat(32);
    for id in ["", "xyz", unknown.as_str()] {
        let err = service.get_settings(Some(&alice), id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{id:?}");
    }
}

#[tokio::test]
async fn delete_is_final() {
    let service = service(10);
    let alice = identity("alice");
    let id = service.create(Some(&alice), shift_request(&[3])).await.unwrap().id.to_string();

    service.delete(Some(&alice), &id).await.unwrap();

    assert_eq!(
        service.encrypt(Some(&alice), &id, "HI").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(service.reset(Some(&alice), &id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(
        service.get_settings(Some(&alice), &id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        service.update_settings(Some(&alice), &id, shift_request(&[4])).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        service.open_stream(Some(&alice), &id, None).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(service.delete(Some(&alice), &id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert!(service.registry().is_empty());
}

#[tokio::test]
async fn update_resets_and_replaces() {
    let service = service(11);
    let alice = identity("alice");
    let id = service.create(Some(&alice), shift_request(&[1])).await.unwrap().id.to_string();
    service.encrypt(Some(&alice), &id, "ABC").await.unwrap();

    let applied = service.update_settings(Some(&alice), &id, SettingsRequest::random(4)).await;
    let applied = applied.unwrap();
    assert_eq!(applied.wheel_count(), 4);
    assert_eq!(service.get_settings(Some(&alice), &id).await.unwrap(), applied);

    service.update_settings(Some(&alice), &id, shift_request(&[2])).await.unwrap();
    assert_eq!(service.encrypt(Some(&alice), &id, "ABC").await.unwrap(), "CDE");
}

#[tokio::test]
async fn reset_is_idempotent() {
    let service = service(12);
    let alice = identity("alice");
    let id = service.create(Some(&alice), SettingsRequest::random(2)).await.unwrap().id.to_string();

    let fresh = service.encrypt(Some(&alice), &id, "SECRET").await.unwrap();
    service.reset(Some(&alice), &id).await.unwrap();
    service.reset(Some(&alice), &id).await.unwrap();
    service.reset(Some(&alice), &id).await.unwrap();
    assert_eq!(service.encrypt(Some(&alice), &id, "SECRET").await.unwrap(), fresh);
}

#[tokio::test]
async fn same_seed_same_sessions() {
    let a = service(99);
    let b = service(99);
    let alice = identity("alice");

    let first = a.create(Some(&alice), SettingsRequest::random(3)).await.unwrap();
    let second = b.create(Some(&alice), SettingsRequest::random(3)).await.unwrap();
    assert_eq!(first, second);
}
