use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::{
    dao::{
        game_store::{GameStore, game_key},
        models::{GameEntity, Revision, StoredGame},
        storage::StorageResult,
    },
    state::game::GameId,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CouchGameDocument, PutResponse},
};

/// [`GameStore`] backed by a CouchDB database, using document revisions for compare-and-set.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn document_request(&self, method: Method, doc_id: &str) -> reqwest::RequestBuilder {
        self.request(method, format!("{}/{}", self.database_url(), doc_id))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let response = self
            .request(Method::GET, self.database_url())
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .request(Method::PUT, self.database_url())
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412 means another instance created it in between.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document(&self, doc_id: &str) -> CouchResult<Option<CouchGameDocument>> {
        let response = self
            .document_request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let value = response.json::<Value>().await.map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })?;
                serde_json::from_value(value).map(Some).map_err(|source| {
                    CouchDaoError::DeserializeValue {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document(&self, document: &CouchGameDocument) -> CouchResult<Revision> {
        let doc_id = document.id.as_str();
        let response = self
            .document_request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::RevisionConflict {
                path: doc_id.to_string(),
            }),
            status if status.is_success() => {
                let body = response.json::<PutResponse>().await.map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })?;
                Ok(Revision(body.rev))
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }
}

impl GameStore for CouchGameStore {
    fn find_game(&self, id: &GameId) -> BoxFuture<'static, StorageResult<Option<StoredGame>>> {
        let store = self.clone();
        let doc_id = game_key(id);
        Box::pin(async move {
            let maybe_doc = store.get_document(&doc_id).await?;
            Ok(maybe_doc.and_then(|doc| {
                doc.rev.map(|rev| StoredGame {
                    revision: Revision(rev),
                    game: doc.game,
                })
            }))
        })
    }

    fn insert_game(
        &self,
        id: &GameId,
        game: GameEntity,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let store = self.clone();
        let doc = CouchGameDocument {
            id: game_key(id),
            rev: None,
            game,
        };
        Box::pin(async move { store.put_document(&doc).await.map_err(Into::into) })
    }

    fn compare_and_set(
        &self,
        id: &GameId,
        expected: &Revision,
        game: GameEntity,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let store = self.clone();
        let doc = CouchGameDocument {
            id: game_key(id),
            rev: Some(expected.as_str().to_string()),
            game,
        };
        Box::pin(async move { store.put_document(&doc).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .request(Method::GET, url.clone())
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::GameRecord;

    #[test]
    fn document_flattens_game_fields() {
        let doc = CouchGameDocument {
            id: "gameState_abc".into(),
            rev: Some("1-x".into()),
            game: GameRecord::default().into(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_id"], "gameState_abc");
        assert_eq!(json["_rev"], "1-x");
        assert_eq!(json["state"], "player1Submit");
        assert_eq!(json["player2BannedDeck"], "");
    }

    #[test]
    fn new_document_omits_revision() {
        let doc = CouchGameDocument {
            id: "gameState_abc".into(),
            rev: None,
            game: GameRecord::default().into(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("_rev").is_none());
    }

    #[test]
    fn revision_conflict_maps_to_storage_conflict() {
        let err: crate::dao::storage::StorageError = CouchDaoError::RevisionConflict {
            path: "gameState_abc".into(),
        }
        .into();
        assert!(matches!(
            err,
            crate::dao::storage::StorageError::Conflict { .. }
        ));
    }
}
