use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::error;

use crate::command::{Request, Response, Status};
use crate::engine::Collection;
use crate::error::{Result, StoreError};

const DEFAULT_PAGE: usize = 1;
const DEFAULT_PAGE_SIZE: usize = 10;

/// Maps [`Request`]s onto the [`Collection`] they name and turns each outcome into a
/// [`Response`].
///
/// Cloning a `Router` is cheap; every clone dispatches to the same collections.
#[derive(Clone, Default)]
pub struct Router {
    collections: HashMap<&'static str, Arc<dyn Collection>>,
}

impl Router {
    /// a router with no collections
    pub fn new() -> Self {
        Router::default()
    }

    /// mounts `collection` under its own name, replacing any collection of the same name
    pub fn mount<C: Collection + 'static>(mut self, collection: C) -> Self {
        self.collections.insert(collection.name(), Arc::new(collection));
        self
    }

    /// names of all mounted collections, sorted
    pub fn collections(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.collections.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// executes `req` and builds its response. Failures become 4xx/5xx responses, so this
    /// never returns an error itself.
    pub fn dispatch(&self, req: Request) -> Response {
        match self.execute(req) {
            Ok(resp) => resp,
            Err(e) => error_response(&e),
        }
    }

    fn collection(&self, name: &str) -> Result<&Arc<dyn Collection>> {
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    fn execute(&self, req: Request) -> Result<Response> {
        let resp = match req {
            Request::List {
                collection,
                page: None,
                size: None,
            } => Response::ok(self.collection(&collection)?.list()?),
            Request::List {
                collection,
                page,
                size,
            } => Response::ok(self.collection(&collection)?.list_page(
                page.unwrap_or(DEFAULT_PAGE),
                size.unwrap_or(DEFAULT_PAGE_SIZE),
            )?),
            Request::Get { collection, id } => {
                Response::ok(self.collection(&collection)?.get(id)?)
            }
            Request::Filter {
                collection,
                field,
                value,
            } => Response::ok(self.collection(&collection)?.filter(&field, &value)?),
            Request::Insert { collection, body } => {
                let (id, record) = self.collection(&collection)?.insert(body)?;
                Response::created(format!("/api/{}/{}", collection, id), record)
            }
            Request::Replace {
                collection,
                id,
                body,
            } => Response::ok(self.collection(&collection)?.replace(id, body)?),
            Request::Patch {
                collection,
                id,
                body,
            } => Response::ok(self.collection(&collection)?.patch(id, body)?),
            Request::Delete { collection, id } => {
                self.collection(&collection)?.delete(id)?;
                Response::no_content()
            }
        };
        Ok(resp)
    }
}

/// maps a [`StoreError`] onto the status code and body the client receives
fn error_response(err: &StoreError) -> Response {
    match err {
        StoreError::NotFound { .. } | StoreError::UnknownCollection(_) => {
            Response::error(Status::NotFound, err.to_string())
        }
        StoreError::Validation(invalid) => Response {
            status: Status::BadRequest,
            location: None,
            body: Some(json!({
                "field": invalid.field,
                "reason": invalid.reason,
                "message": invalid.to_string(),
            })),
        },
        StoreError::InvalidPage | StoreError::Payload(_) => {
            Response::error(Status::BadRequest, err.to_string())
        }
        _ => {
            error!("request failed: {}", err);
            Response::error(Status::InternalServerError, err.to_string())
        }
    }
}
