//! End-to-end behaviour of the gate over real HTTP.

use std::time::Duration;

use covert_gate::audit::Decision;
use covert_gate::http::NOT_FOUND_BODY;

mod common;

const TOKEN_HEADER: &str = "X-Admin-Token";

#[tokio::test]
async fn test_operator_access_succeeds() {
    let handle = common::spawn_gate(|_| {}).await;
    let client = common::client();
    let (path, token) = common::credential(&handle);

    let res = client
        .get(common::url(&handle, &path))
        .header(TOKEN_HEADER, &token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.headers().get("x-request-id").is_none());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "operational");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_near_miss_token_matches_wrong_path_response() {
    let handle = common::spawn_gate(|c| c.rate_limit.limit = 10).await;
    let client = common::client();
    let (path, token) = common::credential(&handle);

    let mut near_miss = token.clone();
    let last = if near_miss.ends_with('A') { "B" } else { "A" };
    near_miss.replace_range(near_miss.len() - 1.., last);

    let wrong_token = common::fetch(
        client
            .get(common::url(&handle, &path))
            .header(TOKEN_HEADER, &near_miss),
    )
    .await;
    let wrong_path = common::fetch(
        client
            .get(common::url(&handle, "/hidden/not-the-secret/access"))
            .header(TOKEN_HEADER, &token),
    )
    .await;
    let unknown = common::fetch(client.get(common::url(&handle, "/definitely/not/here"))).await;

    assert_eq!(wrong_token, wrong_path);
    assert_eq!(wrong_token, unknown);
    assert_eq!(wrong_token, (404, NOT_FOUND_BODY.as_bytes().to_vec()));

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_non_allowlisted_origin_never_sees_payload() {
    let handle = common::spawn_gate(|c| c.allowlist.origins = vec!["10.0.0.0/8".into()]).await;
    let client = common::client();
    let (path, token) = common::credential(&handle);
    let mut audit = handle.gate().audit().subscribe();

    let res = common::fetch(client.get(common::url(&handle, &path)).header(TOKEN_HEADER, &token)).await;

    assert_eq!(res.0, 404);
    let record = audit.recv().await.unwrap();
    assert_eq!(record.decision(), Decision::DeniedOrigin);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_honeypot_is_indistinguishable_and_audited() {
    let handle = common::spawn_gate(|_| {}).await;
    let client = common::client();
    let mut audit = handle.gate().audit().subscribe();

    let decoy = common::fetch(client.get(common::url(&handle, "/wp-admin/install.php"))).await;
    let random = common::fetch(client.get(common::url(&handle, "/x7f3q9"))).await;
    assert_eq!(decoy, random);

    let record = tokio::time::timeout(Duration::from_secs(5), audit.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.decision(), Decision::HoneypotTriggered);
    assert_eq!(record.path(), "/wp-admin/install.php");
    assert!(record.request_id().is_some());

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_rotation_endpoint_invalidates_old_pair() {
    let handle = common::spawn_gate(|c| c.rate_limit.limit = 10).await;
    let client = common::client();
    let (path, token) = common::credential(&handle);
    let rotate_path = path.replace("/access", "/rotate");

    let res = client
        .post(common::url(&handle, &rotate_path))
        .header(TOKEN_HEADER, &token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let receipt: serde_json::Value = res.json().await.unwrap();
    assert_eq!(receipt["rotated"], true);
    assert!(receipt.get("secret_path").is_none());

    let stale = common::fetch(client.get(common::url(&handle, &path)).header(TOKEN_HEADER, &token)).await;
    assert_eq!(stale.0, 404);

    let (new_path, new_token) = common::credential(&handle);
    let fresh = common::fetch(client.get(common::url(&handle, &new_path)).header(TOKEN_HEADER, &new_token)).await;
    assert_eq!(fresh.0, 200);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_fourth_attempt_in_window_is_refused() {
    let handle = common::spawn_gate(|c| c.rate_limit.limit = 3).await;
    let client = common::client();
    let (path, token) = common::credential(&handle);
    let mut audit = handle.gate().audit().subscribe();

    for _ in 0..3 {
        let res = common::fetch(client.get(common::url(&handle, "/hidden/guess/access"))).await;
        assert_eq!(res.0, 404);
    }

    // Correct credential, but the budget is spent.
    let res = common::fetch(client.get(common::url(&handle, &path)).header(TOKEN_HEADER, &token)).await;
    assert_eq!(res, (404, NOT_FOUND_BODY.as_bytes().to_vec()));

    let mut decisions = Vec::new();
    for _ in 0..4 {
        decisions.push(audit.recv().await.unwrap().decision());
    }
    assert_eq!(
        decisions,
        vec![
            Decision::DeniedCredential,
            Decision::DeniedCredential,
            Decision::DeniedCredential,
            Decision::DeniedRateLimited,
        ]
    );

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_audit_file_is_flushed_on_stop() {
    let log = std::env::temp_dir().join(format!("covert-gate-it-{}.jsonl", uuid::Uuid::new_v4()));
    let log_path = log.to_string_lossy().into_owned();
    let handle = common::spawn_gate(|c| c.audit.log_path = Some(log_path)).await;
    let client = common::client();

    let _ = common::fetch(client.get(common::url(&handle, "/phpmyadmin"))).await;
    handle.stop().await.unwrap();

    let content = tokio::fs::read_to_string(&log).await.unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("honeypot-triggered"));

    let _ = tokio::fs::remove_file(&log).await;
}
