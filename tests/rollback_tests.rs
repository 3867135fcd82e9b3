//! Rollback history, rescue configuration and configuration retrieval.

mod common;

use common::*;
use junos::prelude::*;
use junos::rpc::MAX_ROLLBACK;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// `config_diff(n)`, `rollback(n)`, then `config_diff(0)` is empty, and the new
/// active configuration is the one slot `n` held.
async fn assert_rollback_converges(slot: u8) {
    let (session, device) = open(SimulatedDevice::new("fw1").with_history(12)).await;
    let target = device.slot(slot as usize).unwrap();

    session.config_diff(slot).await.unwrap();
    session.rollback(RollbackTarget::Numbered(slot)).await.unwrap();

    assert!(session.config_diff_parsed(0).await.unwrap().is_empty());
    assert_eq!(device.active(), target);
    // The previous active configuration moved one slot further back
    assert!(session.config_diff_parsed(slot + 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rollback_converges_for_every_retained_slot() {
    for slot in 0..=12 {
        assert_rollback_converges(slot).await;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_rollback_converges(slot in 0u8..=12) {
        tokio_test::block_on(assert_rollback_converges(slot));
    }
}

#[tokio::test]
async fn test_rollback_diff_lists_what_changed() {
    let (session, _) = open(SimulatedDevice::new("fw1").with_history(3)).await;

    let diff = session.config_diff_parsed(1).await.unwrap();
    assert_eq!(
        diff.added().map(|(_, l)| l).collect::<Vec<_>>(),
        vec!["system login message revision-2;"]
    );
    assert_eq!(
        diff.removed().map(|(_, l)| l).collect::<Vec<_>>(),
        vec!["system login message revision-1;"]
    );
}

#[tokio::test]
async fn test_rollback_to_missing_slot_is_not_found() {
    let (session, device) = open(SimulatedDevice::new("fw1").with_history(2)).await;

    let err = session
        .rollback(RollbackTarget::Numbered(7))
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err}");
    assert_eq!(device.history_len(), 3);

    let err = session.config_diff(9).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_slot_beyond_history_is_rejected_before_sending() {
    let (session, device) = open(SimulatedDevice::new("fw1")).await;

    assert!(matches!(
        RollbackTarget::numbered(u32::from(MAX_ROLLBACK) + 1),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        session.rollback(RollbackTarget::Numbered(MAX_ROLLBACK + 1)).await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        session.diff(MAX_ROLLBACK + 1).await,
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(device.operations(), vec!["get-software-information"]);
}

#[tokio::test]
async fn test_rescue_save_delete_then_rollback_fails() {
    let (session, device) = open(SimulatedDevice::new("fw1")).await;

    session.rescue(RescueAction::Save).await.unwrap();
    assert!(device.has_rescue());
    session.rescue(RescueAction::Delete).await.unwrap();
    assert!(!device.has_rescue());

    let err = session.rollback(RollbackTarget::Rescue).await.unwrap_err();
    match err {
        Error::NotFound { what, .. } => assert_eq!(what, "rescue"),
        other => panic!("expected not found, got {other:?}"),
    }
    assert_eq!(device.history_len(), 1);
}

#[tokio::test]
async fn test_rollback_to_rescue_restores_it() {
    let (session, device) = open(SimulatedDevice::new("fw1")).await;
    let saved = device.active();
    session.rescue(RescueAction::Save).await.unwrap();

    session
        .load_configuration(
            ConfigPayload::inline("set system ntp server 192.0.2.10"),
            ConfigFormat::Set,
            true,
        )
        .await
        .unwrap();
    assert_ne!(device.active(), saved);

    session.rollback(RollbackTarget::Rescue).await.unwrap();
    assert_eq!(device.active(), saved);
}

#[tokio::test]
async fn test_rescue_config_text() {
    let (session, _) = open(SimulatedDevice::new("fw1")).await;

    assert!(session.rescue_config().await.unwrap_err().is_not_found());

    session.rescue(RescueAction::Save).await.unwrap();
    let text = session.rescue_config().await.unwrap();
    assert!(text.contains("system host-name fw1;"));
}

#[tokio::test]
async fn test_get_config_formats_and_sections() {
    let (session, _) = open(SimulatedDevice::new("fw1")).await;

    let text = session.get_config(None, ConfigFormat::Text).await.unwrap();
    assert!(text.contains("system host-name fw1;"));

    let set = session
        .get_config(Some("system>services"), ConfigFormat::Set)
        .await
        .unwrap();
    assert_eq!(set, "set system services netconf ssh");

    let xml = session.get_config(None, ConfigFormat::Xml).await.unwrap();
    assert!(xml.starts_with("<configuration"));
}

#[tokio::test]
async fn test_get_config_unconfigured_section_is_not_found() {
    let (session, _) = open(SimulatedDevice::new("fw1")).await;

    let err = session
        .get_config(Some("security>address-book"), ConfigFormat::Text)
        .await
        .unwrap_err();
    match err {
        Error::NotFound { what, .. } => assert_eq!(what, "security>address-book"),
        other => panic!("expected not found, got {other:?}"),
    }
}
