use serde::{Deserialize, Serialize};

use crate::dao::models::GameEntity;

/// Game document as stored in CouchDB, `_id` being the `gameState_<id>` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: GameEntity,
}

/// Body returned by CouchDB after a successful document write.
#[derive(Debug, Deserialize)]
pub struct PutResponse {
    pub rev: String,
}
