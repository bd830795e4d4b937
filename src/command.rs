use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::record::RecordId;

/// These are the request "commands" a client can send for a collection.
/// Each variant mirrors one REST method on `/api/<collection>` or `/api/<collection>/<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// `GET /api/<collection>`. With neither `page` nor `size` every record is returned,
    /// otherwise the missing one defaults to page 1 / size 10.
    List {
        /// the collection to list
        collection: String,
        /// 1-based page number
        page: Option<usize>,
        /// records per page
        size: Option<usize>,
    },
    /// `GET /api/<collection>/<id>`
    Get {
        /// the collection to search
        collection: String,
        /// the record id
        id: RecordId,
    },
    /// `GET /api/<collection>?<field>=<value>`
    Filter {
        /// the collection to search
        collection: String,
        /// a field declared by the collection's schema
        field: String,
        /// value to compare against, case-insensitively for text fields
        value: String,
    },
    /// `POST /api/<collection>`
    Insert {
        /// the target collection
        collection: String,
        /// the candidate record, without an id
        body: Value,
    },
    /// `PUT /api/<collection>/<id>`
    Replace {
        /// the target collection
        collection: String,
        /// the record to replace
        id: RecordId,
        /// the complete new record
        body: Value,
    },
    /// `PATCH /api/<collection>/<id>`
    Patch {
        /// the target collection
        collection: String,
        /// the record to update
        id: RecordId,
        /// only the fields to change
        body: Value,
    },
    /// `DELETE /api/<collection>/<id>`
    Delete {
        /// the target collection
        collection: String,
        /// the record to remove
        id: RecordId,
    },
}

/// HTTP style status of a [`Response`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// 200
    Ok,
    /// 201
    Created,
    /// 204
    NoContent,
    /// 400
    BadRequest,
    /// 404
    NotFound,
    /// 500
    InternalServerError,
}

impl Status {
    /// the numeric HTTP status code
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::NoContent => 204,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }

    /// true for 2xx codes
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.code())
    }
}

/// The response returned for every [`Request`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// outcome of the request
    pub status: Status,
    /// path of a newly created record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// JSON payload; absent for 204
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Response {
    /// a 200 response carrying `body`
    pub fn ok(body: Value) -> Self {
        Response {
            status: Status::Ok,
            location: None,
            body: Some(body),
        }
    }

    /// a 201 response pointing at the new record
    pub fn created(location: String, body: Value) -> Self {
        Response {
            status: Status::Created,
            location: Some(location),
            body: Some(body),
        }
    }

    /// a 204 response with no body
    pub fn no_content() -> Self {
        Response {
            status: Status::NoContent,
            location: None,
            body: None,
        }
    }

    /// an error response with a `{"message": ..}` body
    pub fn error(status: Status, message: impl Into<String>) -> Self {
        Response {
            status,
            location: None,
            body: Some(json!({ "message": message.into() })),
        }
    }

    /// the `message` of an error body, if there is one
    pub fn message(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
    }
}
