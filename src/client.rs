use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use serde::Deserialize;
use serde_json::de::IoRead;
use serde_json::{Deserializer, Value};
use crate::command::{Request, Response};
use crate::record::RecordId;
use crate::Result;

/// `RecsClient` contains the functionality for communication with a [`RecsServer`]
///
/// Every method returns the server's [`Response`] as is, including 4xx/5xx responses.
/// Only transport and decoding problems are reported as errors.
///
/// [`RecsServer`]: ./struct.RecsServer.html
pub struct RecsClient {
    reader: Deserializer<IoRead<BufReader<TcpStream>>>,
    writer: BufWriter<TcpStream>,
}

impl RecsClient {

    /// creates a client and establishes a socket connection to the server at the given `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let tcp_reader = TcpStream::connect(addr)?;
        let tcp_writer = tcp_reader.try_clone()?;

        Ok(RecsClient {
            reader: Deserializer::from_reader(BufReader::new(tcp_reader)),
            writer: BufWriter::new(tcp_writer),
        })
    }

    /// sends any request and waits for its response
    pub fn send(&mut self, req: &Request) -> Result<Response> {
        serde_json::to_writer(&mut self.writer, req)?;
        self.writer.flush()?;
        Ok(Response::deserialize(&mut self.reader)?)
    }

    /// lists a collection. `page`/`size` are optional, see [`Request::List`]
    pub fn list(&mut self, collection: &str, page: Option<usize>, size: Option<usize>) -> Result<Response> {
        self.send(&Request::List { collection: collection.to_string(), page, size })
    }

    /// fetches one record
    pub fn get(&mut self, collection: &str, id: RecordId) -> Result<Response> {
        self.send(&Request::Get { collection: collection.to_string(), id })
    }

    /// fetches the records whose `field` equals `value`
    pub fn filter(&mut self, collection: &str, field: &str, value: &str) -> Result<Response> {
        self.send(&Request::Filter {
            collection: collection.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    /// creates a record. A successful response carries the new record's `location`
    pub fn insert(&mut self, collection: &str, body: Value) -> Result<Response> {
        self.send(&Request::Insert { collection: collection.to_string(), body })
    }

    /// fully replaces a record
    pub fn replace(&mut self, collection: &str, id: RecordId, body: Value) -> Result<Response> {
        self.send(&Request::Replace { collection: collection.to_string(), id, body })
    }

    /// changes only the fields present in `body`
    pub fn patch(&mut self, collection: &str, id: RecordId, body: Value) -> Result<Response> {
        self.send(&Request::Patch { collection: collection.to_string(), id, body })
    }

    /// removes a record
    pub fn delete(&mut self, collection: &str, id: RecordId) -> Result<Response> {
        self.send(&Request::Delete { collection: collection.to_string(), id })
    }
}
