use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::keys;

/// A Marathon application definition. Only the id matters for keying; every other
/// field Marathon sends is carried through to the registry untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl App {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn key(&self) -> String {
        keys::app_key(&self.id)
    }
}
