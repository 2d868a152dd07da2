//! Shared utilities for integration tests.

use std::sync::Arc;

use covert_gate::admin::StatusPayload;
use covert_gate::config::GateConfig;
use covert_gate::lifecycle::{launch, GateHandle};
use tokio::net::TcpListener;

/// Start a gate on an ephemeral loopback port.
pub async fn spawn_gate(configure: impl FnOnce(&mut GateConfig)) -> GateHandle {
    let mut config = GateConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    configure(&mut config);

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    launch(config, listener, Arc::new(StatusPayload::new())).await.unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub fn url(handle: &GateHandle, path: &str) -> String {
    format!("http://{}{}", handle.local_addr(), path)
}

/// Current `(access path, token)` for the running gate.
pub fn credential(handle: &GateHandle) -> (String, String) {
    let cred = handle.gate().credentials().current_credential();
    (
        format!("{}/{}/access", handle.gate().namespace(), cred.secret_path()),
        cred.access_token().to_string(),
    )
}

/// Status and body bytes, for byte-level comparison of responses.
pub async fn fetch(req: reqwest::RequestBuilder) -> (u16, Vec<u8>) {
    let res = req.send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.bytes().await.unwrap().to_vec())
}
