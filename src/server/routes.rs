use tracing::warn;

use crate::server::api::{self, ApiError};

pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    pub fn to_http_string(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status_code,
            self.status_text,
            self.content_type,
            self.body.len(),
            self.body
        )
    }

    fn ok(content_type: &'static str, body: String) -> Self {
        Self {
            status_code: 200,
            status_text: "OK",
            content_type,
            body,
        }
    }
}

fn json_response(result: Result<String, ApiError>) -> HttpResponse {
    match result {
        Ok(payload) => HttpResponse::ok("application/json", payload),
        Err(err) => api_error_response(&err),
    }
}

fn api_error_response(err: &ApiError) -> HttpResponse {
    match err {
        ApiError::Parse(_) | ApiError::Config(_) | ApiError::Validation(_) => {
            error_response(400, "Bad Request", &err.to_string())
        }
        ApiError::NotFound(_) => error_response(404, "Not Found", &err.to_string()),
        ApiError::Encode(_) => error_response(500, "Internal Server Error", &err.to_string()),
    }
}

fn wants_csv(query: &str) -> bool {
    query
        .split('&')
        .any(|p| p.trim().eq_ignore_ascii_case("format=csv"))
}

pub fn route_request(method: &str, path: &str, body: &str) -> HttpResponse {
    let (route, query) = path.split_once('?').unwrap_or((path, ""));
    match (method, route) {
        ("GET", "/api/health") => json_response(api::health_payload().map_err(|e| ApiError::Encode(e.to_string()))),
        ("POST", "/api/simulate") => json_response(api::simulate_payload(body)),
        ("POST", "/api/weights") => json_response(api::weights_payload(body)),
        ("POST", "/api/trace") if wants_csv(query) => match api::trace_csv_payload(body) {
            Ok(payload) => HttpResponse::ok("text/csv", payload),
            Err(err) => api_error_response(&err),
        },
        ("POST", "/api/trace") => json_response(api::trace_payload(body)),
        ("GET", "/api/presets") => json_response(api::presets_payload().map_err(|e| ApiError::Encode(e.to_string()))),
        ("GET", route) if route.starts_with("/api/presets/") => {
            let name = route.trim_start_matches("/api/presets/").split('/').next().unwrap_or("");
            json_response(api::preset_payload(name))
        }
        ("GET", "/api/strategy") => json_response(api::strategy_payload().map_err(|e| ApiError::Encode(e.to_string()))),
        _ => error_response(404, "Not Found", "Route not found"),
    }
}

pub fn error_response(status_code: u16, status_text: &'static str, message: &str) -> HttpResponse {
    if status_code >= 500 {
        warn!(status_code, message, "request failed");
    }
    HttpResponse {
        status_code,
        status_text,
        content_type: "application/json",
        body: format!(
            "{{\n  \"status\": \"error\",\n  \"message\": {}\n}}",
            serde_json::to_string(message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
        ),
    }
}
