use serde::{Deserialize, Serialize};

pub mod health_check;
pub mod titles;

/// JSON body returned by every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error: String,
}
