//! End-to-end obfuscation sequence tests
//!
//! Drives `MirageBind` with a mock inner bind while a loopback UDP socket
//! captures the decoy traffic.


use harness::{MockBind, MockEndpoint, initiation_packet, spawn_capture, transport_packet};
use mirage_obfuscation::ObfuscationConfig;
use mirage_transport::{MirageBind, UdpBind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[tokio::test]
async fn test_sequence_brackets_initiation() -> anyhow::Result<()> {
    let (target, captured) = spawn_capture().await;

    let config = ObfuscationConfig {
        i1: "c0ffee".into(),
        i2: "<r 10>".into(),
        jc: 5,
        jc_before_hs: 5,
        junk_interval_ms: 1,
        ..Default::default()
    };

    let inner = MockBind::new();
    let sent = Arc::clone(&inner.sent);
    let bind = MirageBind::new(inner, config)?;
    let endpoint = MockEndpoint { addr: target };

    let start = Instant::now();
    bind.send(&[initiation_packet()], &endpoint).await?;
    let elapsed = start.elapsed();

    // The synchronous phase stays within a small latency bound.
    assert!(elapsed < Duration::from_millis(200), "send took {:?}", elapsed);

    // The real batch reached the inner bind exactly once, unchanged.
    let batches = sent.lock().unwrap().clone();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0], vec![initiation_packet()]);

    // The asynchronous tail finishes the full decoy volume:
    // I1 + I2 + 5 before-handshake junk + 5 general junk.
    sleep(Duration::from_millis(500)).await;
    let packets = captured.lock().unwrap().clone();
    assert_eq!(packets.len(), 12, "expected full decoy volume");

    // I1 leads with its literal bytes, then the 10-byte random I2.
    assert_eq!(packets[0], vec![0xC0, 0xFF, 0xEE]);
    assert_eq!(packets[1].len(), 10);

    Ok(())
}

#[tokio::test]
async fn test_junk_cap_defers_remainder() -> anyhow::Result<()> {
    let (target, captured) = spawn_capture().await;

    // A slow junk interval keeps the asynchronous remainder visibly apart
    // from the capped synchronous prefix.
    let config = ObfuscationConfig {
        jc_before_hs: 5,
        junk_interval_ms: 300,
        ..Default::default()
    };

    let bind = MirageBind::new(MockBind::new(), config)?;
    let endpoint = MockEndpoint { addr: target };

    bind.send(&[initiation_packet()], &endpoint).await?;

    // Right after send returns: the 3 capped junk packets, plus at most the
    // first packet of the deferred remainder.
    sleep(Duration::from_millis(50)).await;
    let early = captured.lock().unwrap().len();
    assert!((3..=4).contains(&early), "got {} packets early", early);

    // The remaining before-handshake packets arrive at the slow interval.
    sleep(Duration::from_millis(800)).await;
    assert_eq!(captured.lock().unwrap().len(), 5);

    Ok(())
}

#[tokio::test]
async fn test_non_initiation_traffic_passes_through() -> anyhow::Result<()> {
    let (target, captured) = spawn_capture().await;

    let config = ObfuscationConfig {
        i1: "c0ffee".into(),
        jc: 5,
        ..Default::default()
    };

    let inner = MockBind::new();
    let sent = Arc::clone(&inner.sent);
    let bind = MirageBind::new(inner, config)?;
    let endpoint = MockEndpoint { addr: target };

    bind.send(&[transport_packet()], &endpoint).await?;
    bind.send(&[transport_packet(), transport_packet()], &endpoint)
        .await?;

    sleep(Duration::from_millis(150)).await;
    assert!(captured.lock().unwrap().is_empty(), "no decoys expected");
    assert_eq!(sent.lock().unwrap().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_retransmission_is_rate_limited() -> anyhow::Result<()> {
    let (target, captured) = spawn_capture().await;

    let config = ObfuscationConfig {
        i1: "c0ffee".into(),
        min_trigger_interval_ms: 200,
        ..Default::default()
    };

    let inner = MockBind::new();
    let sent = Arc::clone(&inner.sent);
    let bind = MirageBind::new(inner, config)?;
    let endpoint = MockEndpoint { addr: target };

    // Initiation plus an immediate retransmission.
    bind.send(&[initiation_packet()], &endpoint).await?;
    bind.send(&[initiation_packet()], &endpoint).await?;

    sleep(Duration::from_millis(100)).await;
    assert_eq!(captured.lock().unwrap().len(), 1, "one burst expected");

    // Both real packets were still forwarded.
    assert_eq!(sent.lock().unwrap().len(), 2);

    // Past the interval a new burst is admitted.
    sleep(Duration::from_millis(150)).await;
    bind.send(&[initiation_packet()], &endpoint).await?;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(captured.lock().unwrap().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_handshake_delay_holds_the_real_packet() -> anyhow::Result<()> {
    let (target, _captured) = spawn_capture().await;

    let config = ObfuscationConfig {
        handshake_delay_ms: 60,
        ..Default::default()
    };

    let bind = MirageBind::new(MockBind::new(), config)?;
    let endpoint = MockEndpoint { addr: target };

    let start = Instant::now();
    bind.send(&[initiation_packet()], &endpoint).await?;
    assert!(start.elapsed() >= Duration::from_millis(60));

    Ok(())
}

#[tokio::test]
async fn test_malformed_template_fails_construction() {
    let config = ObfuscationConfig {
        i1: "<b zz>".into(),
        ..Default::default()
    };
    assert!(MirageBind::new(MockBind::new(), config).is_err());

    let config = ObfuscationConfig {
        i3: "<r soon>".into(),
        ..Default::default()
    };
    assert!(MirageBind::new(MockBind::new(), config).is_err());
}
