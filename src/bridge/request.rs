use serde::Serialize;
use serde_json::{Value, json};

use crate::render::{MapFormat, UnsupportedFormat};

/// A network map request as received from the bus.
///
/// The format is kept as sent so that an unsupported value can be echoed back verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMapRequest {
    pub format: String,
    pub include_routes: bool,
    /// Opaque correlation value, echoed into the response.
    pub transaction: Option<Value>,
}

impl NetworkMapRequest {
    /// Accepts `{"type": ..., "routes": ..., "transaction": ...}`, or a bare format name
    /// (quoted or not) from older clients, which never ask for routes.
    pub fn parse(payload: &str) -> Self {
        match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(object)) => {
                let format = match object.get("type") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                Self {
                    format,
                    include_routes: object
                        .get("routes")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    transaction: object.get("transaction").cloned(),
                }
            }
            Ok(Value::String(format)) => Self::legacy(format),
            _ => Self::legacy(payload.trim().to_string()),
        }
    }

    fn legacy(format: String) -> Self {
        Self {
            format,
            include_routes: false,
            transaction: None,
        }
    }

    pub fn validate(&self) -> Result<MapFormat, UnsupportedFormat> {
        self.format.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// The single message published in answer to a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkMapResponse {
    pub status: ResponseStatus,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Value>,
}

impl NetworkMapResponse {
    pub fn ok(
        format: MapFormat,
        include_routes: bool,
        value: Value,
        transaction: Option<Value>,
    ) -> Self {
        Self {
            status: ResponseStatus::Ok,
            data: json!({
                "type": format,
                "routes": include_routes,
                "value": value,
            }),
            error: None,
            transaction,
        }
    }

    pub fn error(message: impl Into<String>, transaction: Option<Value>) -> Self {
        Self {
            status: ResponseStatus::Error,
            data: json!({}),
            error: Some(message.into()),
            transaction,
        }
    }
}
