//! Coordinator Module Tests
//!
//! Drives the control-plane router in-process with `tower::ServiceExt::oneshot`.

#[cfg(test)]
mod tests {
    use crate::coordinator::router;
    use crate::membership::registry::{LIVENESS_WINDOW, LivenessRegistry, parse_worker_list};
    use crate::membership::types::WorkerId;
    use axum::{
        Router,
        body::{Body, to_bytes},
        extract::connect_info::MockConnectInfo,
        http::{Request, StatusCode},
    };
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(registry: Arc<LivenessRegistry>) -> Router {
        router(registry).layer(MockConnectInfo(SocketAddr::from(([10, 1, 2, 3], 40000))))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    // ============================================================
    // PING TESTS
    // ============================================================

    #[tokio::test]
    async fn test_ping_registers_caller_address() {
        let registry = LivenessRegistry::new(LIVENESS_WINDOW);

        let (status, body) = get(app(registry.clone()), "/ping?id=abcde&port=8001").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
        let record = registry.get(&WorkerId::from("abcde")).unwrap();
        assert_eq!(record.ip, "10.1.2.3");
        assert_eq!(record.port, 8001);
    }

    #[tokio::test]
    async fn test_ping_rejects_missing_or_empty_id() {
        let registry = LivenessRegistry::new(LIVENESS_WINDOW);

        let (status, _) = get(app(registry.clone()), "/ping?port=8001").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(app(registry.clone()), "/ping?id=&port=8001").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_ping_rejects_malformed_port() {
        let registry = LivenessRegistry::new(LIVENESS_WINDOW);

        for uri in [
            "/ping?id=abcde",
            "/ping?id=abcde&port=http",
            "/ping?id=abcde&port=70000",
            "/ping?id=abcde&port=-1",
        ] {
            let (status, _) = get(app(registry.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_ping_refreshes_single_record() {
        let registry = LivenessRegistry::new(LIVENESS_WINDOW);

        get(app(registry.clone()), "/ping?id=abcde&port=8001").await;
        get(app(registry.clone()), "/ping?id=abcde&port=8001").await;

        assert_eq!(registry.len(), 1);
    }

    // ============================================================
    // WORKER LIST TESTS
    // ============================================================

    #[tokio::test]
    async fn test_workers_lists_pinged_workers() {
        let registry = LivenessRegistry::new(LIVENESS_WINDOW);
        get(app(registry.clone()), "/ping?id=aaaaa&port=8001").await;
        get(app(registry.clone()), "/ping?id=bbbbb&port=8002").await;

        let (status, body) = get(app(registry), "/workers").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("2\n"));
        let mut entries = parse_worker_list(&body);
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, WorkerId::from("aaaaa"));
        assert_eq!(entries[0].ip, "10.1.2.3");
        assert_eq!(entries[1].port, 8002);
    }

    #[tokio::test]
    async fn test_empty_worker_list() {
        let registry = LivenessRegistry::new(LIVENESS_WINDOW);

        let (status, body) = get(app(registry), "/workers").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "0\n");
    }
}
