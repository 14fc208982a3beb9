//! Axum middleware that records one `api.request` audit event per request.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::domain::AuditActor;

use super::logger::AuditLogger;

/// Paths excluded from request auditing.
const EXCLUDED_PATHS: [&str; 4] = ["/healthz", "/metrics", "/docs", "/static"];

/// Capture method, path, status, duration, client identity and a fresh
/// request id for every non-excluded request.
pub async fn audit_middleware(
    State(logger): State<Arc<AuditLogger>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if EXCLUDED_PATHS.iter().any(|excluded| path.starts_with(excluded)) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let request_id = Uuid::new_v4().to_string();
    let actor = extract_actor(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;
    logger
        .log_api_request(&method, &path, status, duration_ms, actor, &request_id)
        .await;

    response
}

/// Client identity from headers and the socket peer. The forwarded-for
/// chain's first hop wins over X-Real-IP, which wins over the peer address.
fn extract_actor(request: &Request) -> AuditActor {
    let headers = request.headers();

    let forwarded_ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let peer_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let user_agent = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    AuditActor {
        user_id: None,
        username: None,
        user_role: None,
        ip_address: forwarded_ip.or(real_ip).or(peer_ip),
        user_agent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    fn request_with_headers(headers: &[(&str, &str)]) -> Request {
        let mut builder = HttpRequest::builder().uri("/mcp/policies");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_forwarded_for_first_hop_wins() {
        let request = request_with_headers(&[
            ("x-forwarded-for", "203.0.113.9, 10.0.0.2"),
            ("x-real-ip", "10.0.0.3"),
        ]);
        let actor = extract_actor(&request);
        assert_eq!(actor.ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_real_ip_fallback() {
        let request = request_with_headers(&[("x-real-ip", "10.0.0.3")]);
        let actor = extract_actor(&request);
        assert_eq!(actor.ip_address.as_deref(), Some("10.0.0.3"));
    }

    #[test]
    fn test_user_agent_captured() {
        let request = request_with_headers(&[("user-agent", "curl/8.0")]);
        let actor = extract_actor(&request);
        assert_eq!(actor.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_excluded_paths() {
        for path in EXCLUDED_PATHS {
            assert!(path.starts_with('/'));
        }
    }
}
