use may_minihttp::Response;
use serde_json::Value;

use crate::error::ServiceError;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Write a JSON success body with the given status.
pub fn write_json_response(res: &mut Response, status: u16, body: &Value) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body.to_string().into_bytes());
}

/// Write the canonical `{"error": "<message>"}` body for an error status.
pub fn write_json_error(res: &mut Response, status: u16, message: &str) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(
        serde_json::json!({ "error": message })
            .to_string()
            .into_bytes(),
    );
}

/// Map a service error to its status and write it out.
pub fn write_service_error(res: &mut Response, err: &ServiceError) {
    write_json_error(res, err.status(), &err.to_string());
}
