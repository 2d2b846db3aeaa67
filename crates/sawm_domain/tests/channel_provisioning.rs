use std::sync::Arc;

use sawm_domain::{
    error::PlatformError, memory::MemoryPlatform, ChannelRegistry, NotificationChannel,
};

#[tokio::test]
async fn provisioning_twice_leaves_identical_channels() {
    let platform = Arc::new(MemoryPlatform::new());
    let registry = ChannelRegistry::new(platform.clone());

    registry.ensure_channels().await.expect("first provisioning");
    let first = platform.channels();
    registry.ensure_channels().await.expect("second provisioning");
    let second = platform.channels();

    assert_eq!(first.len(), NotificationChannel::ALL.len());
    assert_eq!(first, second);
    assert_eq!(
        first.get("call-to-prayer"),
        Some(&NotificationChannel::CallToPrayer.attributes())
    );
    assert_eq!(
        registry.channel_tag(NotificationChannel::Reminders),
        Some("reminders")
    );
}

#[tokio::test]
async fn channel_less_platform_is_a_silent_no_op() {
    let platform = Arc::new(MemoryPlatform::new().without_channels());
    let registry = ChannelRegistry::new(platform.clone());

    registry
        .ensure_channels()
        .await
        .expect("unsupported platform is not an error");
    assert_eq!(platform.calls().channel_updates, 0);
    assert_eq!(registry.channel_tag(NotificationChannel::CallToPrayer), None);
}

#[tokio::test]
async fn refused_provisioning_is_reported_once_after_trying_every_channel() {
    let platform = Arc::new(MemoryPlatform::new());
    platform.fail_channel_updates(true);
    let registry = ChannelRegistry::new(platform.clone());

    let err = registry.ensure_channels().await.expect_err("provisioning refused");
    assert_eq!(err.channel_id, "call-to-prayer");
    assert!(matches!(err.source, PlatformError::Rejected(_)));
    assert_eq!(platform.calls().channel_updates, NotificationChannel::ALL.len());
    assert!(platform.channels().is_empty());
}
