//! Startup log filter: installed before config load, then narrowed to
//! `logging.level`

mod helpers;

use helpers::log_capture::LogCapture;
use tracing_subscriber::layer::SubscriberExt;
use wardrobe_common::config::WardrobeConfig;
use wardrobe_server::logging::{filter_layer, LogLevelHandle};

fn capturing_subscriber(
    rust_log: Option<&'static str>,
) -> (impl tracing::Subscriber + Send + Sync, LogLevelHandle, LogCapture) {
    let capture = LogCapture::new();
    let (filter, handle) = filter_layer(rust_log);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(capture.clone());
    (subscriber, handle, capture)
}

#[test]
fn test_config_warnings_logged_before_level_applied() {
    let (subscriber, handle, capture) = capturing_subscriber(None);

    tracing::subscriber::with_default(subscriber, || {
        let mut config = WardrobeConfig::default();
        config.apply_overrides_from(|key| {
            (key == "WARDROBE_PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.server.port, 5780);

        handle.apply_configured_level("error").unwrap();
        tracing::warn!("after level applied");
        tracing::error!("still reported");
    });

    capture.assert_contains("Ignoring invalid WARDROBE_PORT value: not-a-port");
    capture.assert_no_match("after level applied");
    capture.assert_contains("still reported");
}

#[test]
fn test_startup_filter_hides_debug() {
    let (subscriber, handle, capture) = capturing_subscriber(None);

    tracing::subscriber::with_default(subscriber, || {
        tracing::debug!("before config");
        handle.apply_configured_level("debug").unwrap();
        tracing::debug!("after config");
    });

    capture.assert_no_match("before config");
    capture.assert_contains("after config");
}

#[test]
fn test_invalid_configured_level_keeps_filter() {
    let (subscriber, handle, capture) = capturing_subscriber(None);

    tracing::subscriber::with_default(subscriber, || {
        assert!(handle.apply_configured_level("loud=notalevel").is_err());
        tracing::info!("filter unchanged");
    });

    capture.assert_contains("filter unchanged");
}

#[test]
fn test_rust_log_wins_over_configured_level() {
    let (subscriber, handle, capture) = capturing_subscriber(Some("debug"));

    tracing::subscriber::with_default(subscriber, || {
        handle.apply_configured_level("error").unwrap();
        tracing::debug!("env directives kept");
    });

    capture.assert_contains("env directives kept");
}

#[test]
fn test_blank_rust_log_falls_back_to_startup_level() {
    let (subscriber, handle, capture) = capturing_subscriber(Some("  "));

    tracing::subscriber::with_default(subscriber, || {
        tracing::debug!("hidden at startup");
        handle.apply_configured_level("warn").unwrap();
        tracing::info!("hidden after config");
        tracing::warn!("shown after config");
    });

    capture.assert_no_match("hidden");
    capture.assert_contains("shown after config");
}
