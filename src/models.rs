use serde::{Deserialize, Serialize};
use serde_json::Value;

// POST /api/hit request body, userId is kept loose so numbers still count as ids
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct HitRequest {
    #[serde(rename = "userId", default)]
    pub user_id: Option<Value>,
}

impl HitRequest {
    // anything that is not json, or has no usable userId, reads as empty
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(mut fields)) => Self {
                user_id: fields.remove("userId"),
            },
            _ => Self::default(),
        }
    }

    // strings as-is, numbers and booleans as their json text, everything else empty
    pub fn user_id(&self) -> String {
        match &self.user_id {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }
}

// Body of every non-usage api response
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct HitResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}
