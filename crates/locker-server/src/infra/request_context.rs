use axum::http::HeaderMap;
use ipnet::IpNet;
use std::net::{IpAddr, SocketAddr};

use crate::app::AppState;

pub fn client_ip(
    headers: &HeaderMap,
    remote_addr: Option<SocketAddr>,
    state: Option<&AppState>,
) -> Option<String> {
    let trusted = state
        .map(|value| value.config.server.trusted_proxies.as_slice())
        .unwrap_or(&[]);
    let remote_ip = remote_addr.map(|addr| addr.ip());
    if trusted.is_empty() {
        return remote_ip.map(|ip| ip.to_string());
    }
    if remote_ip.is_some_and(|ip| is_trusted_proxy(ip, trusted)) {
        return forwarded_ip(headers).or_else(|| remote_ip.map(|ip| ip.to_string()));
    }
    remote_ip.map(|ip| ip.to_string())
}

pub fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(std::string::ToString::to_string)
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        let first = value.split(',').next().map_or(value, str::trim);
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(std::string::ToString::to_string)
}

fn is_trusted_proxy(remote_ip: IpAddr, trusted: &[String]) -> bool {
    trusted
        .iter()
        .filter_map(|value| value.parse::<IpNet>().ok())
        .any(|net| net.contains(&remote_ip))
}
