//! Delegation tests for the non-decorated bind surface
//!
//! Everything except `send` must reach the inner bind unchanged.


use harness::{MockBind, MockEndpoint, transport_packet};
use mirage_obfuscation::ObfuscationConfig;
use mirage_transport::{Endpoint, MirageBind, UdpBind};
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn wrapped() -> MirageBind<MockBind> {
    MirageBind::new(MockBind::new(), ObfuscationConfig::default()).expect("default config compiles")
}

#[tokio::test]
async fn test_open_and_close_delegate() -> anyhow::Result<()> {
    let bind = wrapped();

    assert_eq!(bind.open(51820).await?, 51820);
    bind.close().await?;

    assert_eq!(bind.inner().opened.load(Ordering::SeqCst), 1);
    assert_eq!(bind.inner().closed.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_set_mark_delegates() -> anyhow::Result<()> {
    let bind = wrapped();

    bind.set_mark(0x51)?;
    assert_eq!(bind.inner().mark.load(Ordering::SeqCst), 0x51);
    Ok(())
}

#[tokio::test]
async fn test_parse_endpoint_delegates() -> anyhow::Result<()> {
    let bind = wrapped();

    let endpoint = bind.parse_endpoint("192.0.2.7:51820")?;
    assert_eq!(endpoint.dst_addr(), "192.0.2.7:51820".parse()?);

    assert!(bind.parse_endpoint("not an endpoint").is_err());
    Ok(())
}

#[tokio::test]
async fn test_batch_size_delegates() {
    let bind = wrapped();
    assert_eq!(bind.batch_size(), 128);
}

#[tokio::test]
async fn test_send_forwards_batch_unchanged() -> anyhow::Result<()> {
    let inner = MockBind::new();
    let sent = Arc::clone(&inner.sent);
    let bind = MirageBind::new(inner, ObfuscationConfig::default())?;

    let endpoint = MockEndpoint {
        addr: "127.0.0.1:51820".parse()?,
    };
    let batch = vec![transport_packet(), transport_packet()];
    bind.send(&batch, &endpoint).await?;

    let batches = sent.lock().unwrap().clone();
    assert_eq!(batches, vec![batch]);
    Ok(())
}
