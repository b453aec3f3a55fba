//! Contract tests against a real Chromium. Ignored by default; run with
//! `CASEFILL_CDP_CONTRACT=1 cargo test -p cdp-adapter -- --ignored`.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use casefill_core_types::{ExecRoute, PageId as RoutePage, SessionId as RouteSession};
use cdp_adapter::{Cdp, CdpAdapter, CdpConfig, KeyStroke};

fn contract_enabled() -> bool {
    env::var("CASEFILL_CDP_CONTRACT")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

async fn setup_adapter() -> (Arc<CdpAdapter>, tempfile::TempDir) {
    let profile = tempfile::tempdir().expect("temporary chrome profile");
    let mut cfg = CdpConfig::default();
    cfg.headless = true;
    cfg.user_data_dir = profile.path().into();
    let adapter = Arc::new(CdpAdapter::new(cfg).expect("chrome available"));
    adapter.start().await.expect("adapter start");
    (adapter, profile)
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set CASEFILL_CDP_CONTRACT=1"]
async fn contract_types_into_framed_input() {
    if !contract_enabled() {
        eprintln!("skipping CDP contract test (CASEFILL_CDP_CONTRACT not enabled)");
        return;
    }

    let (adapter, _profile) = setup_adapter().await;
    let route = ExecRoute::main_frame(RouteSession::new(), RoutePage::new());
    let ctx = adapter
        .resolve_execution_context(&route)
        .await
        .expect("page for route");

    let html = "data:text/html,<iframe id='f' srcdoc=\"<input id='x'>\"></iframe>";
    adapter
        .navigate(ctx.page, html, Duration::from_secs(15))
        .await
        .expect("navigate succeeds");
    tokio::time::sleep(Duration::from_millis(300)).await;

    let framed = adapter
        .resolve_execution_context(&route.with_frame_selector("#f"))
        .await
        .expect("framed context");
    adapter
        .type_text_in_context(&framed, "#x", "abc", Duration::from_secs(5))
        .await
        .expect("type_text succeeds");
    adapter
        .press_key(ctx.page, &KeyStroke::character('d'))
        .await
        .expect("key press");

    let value = adapter
        .evaluate_script(
            ctx.page,
            "document.querySelector('#f').contentDocument.querySelector('#x').value",
        )
        .await
        .expect("read value");
    assert_eq!(value.as_str(), Some("abcd"));

    adapter.shutdown().await;
}
