use crate::command::{Request, Response};
use crate::router::Router;
use crate::thread_pool::ThreadPool;
use crate::Result;
use serde_json::Deserializer;
use std::io::{BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, error, info};

/// A TCP socket server that exposes the collections mounted on a [`Router`].
/// It listens for incoming [`Request`]s on a [`SocketAddr`](https://doc.rust-lang.org/std/net/enum.SocketAddr.html),
/// deserializes them, and services each connection on a thread from its [`ThreadPool`].
///
/// Each thread receives a clone of the router, and therefore a handle to the same stores.
///
/// # Example
/// Serve the book and customer collections on "127.0.0.1:4000", with 4 threads running on a
/// shared queue thread pool, persisting into JSON files in the current directory
/// ```rust
/// use recs::{Book, Customer, JsonFileSink, RecordStore, RecsServer, Router};
/// use recs::thread_pool::{SharedQueueThreadPool, ThreadPool};
/// # fn main() -> recs::Result<()> {
/// let books = RecordStore::<Book, _>::open(JsonFileSink::open(".")?)?;
/// let customers = RecordStore::<Customer, _>::open(JsonFileSink::open(".")?)?;
/// let router = Router::new().mount(books).mount(customers);
/// let server = RecsServer::new(router, SharedQueueThreadPool::new(4)?);
/// //server.run("127.0.0.1:4000")?;
/// # Ok(())
/// # }
/// ```
pub struct RecsServer<P: ThreadPool> {
    /// routes requests to collections
    router: Router,
    /// a pool of threads that will serve connections using a clone of the router
    pool: P,
}

impl<P: ThreadPool> RecsServer<P> {
    /// Create a new `RecsServer` over `router` using the given [`ThreadPool`] implementation.
    pub fn new(router: Router, pool: P) -> Self {
        RecsServer { router, pool }
    }

    /// starts a server listening on the given address.
    /// Each connection that comes in gets serviced on a thread from the ThreadPool
    ///
    /// # Errors
    /// returns [`StoreError`] if the server could not bind to `addr`
    ///
    /// [`StoreError`]: ./enum.StoreError.html
    pub fn run<A: ToSocketAddrs>(self, addr: A) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        self.serve_on(listener)
    }

    /// serves connections accepted by an already bound `listener`. Useful when binding to
    /// port 0 and reading the chosen port back before serving.
    pub fn serve_on(self, listener: TcpListener) -> Result<()> {
        info!("serving {:?} on {}", self.router.collections(), local_addr(&listener));
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let router = self.router.clone();
                    self.pool.spawn(move || {
                        if let Err(e) = serve(&router, stream) {
                            error!("Error on serving client: {}", e);
                        }
                    });
                }
                Err(e) => error!("Connection failed: {}", e),
            }
        }
        Ok(())
    }
}

fn local_addr(listener: &TcpListener) -> String {
    listener
        .local_addr()
        .map(|addr: SocketAddr| addr.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string())
}

/// Listens for and processes [`Request`]s coming over the given `tcp` stream
/// This function will: deserialize each request, dispatch it through the router,
/// and write the [`Response`] back to the client on the `tcp` stream
fn serve(router: &Router, tcp: TcpStream) -> Result<()> {
    let peer_addr = tcp.peer_addr()?;
    let stream_reader = BufReader::new(&tcp);
    let mut stream_writer = BufWriter::new(&tcp);
    let req_reader = Deserializer::from_reader(stream_reader).into_iter::<Request>();

    let mut send_resp = move |resp: Response| -> Result<()> {
        serde_json::to_writer(&mut stream_writer, &resp)?;
        stream_writer.flush()?;
        debug!("Response sent to {}: {:?}", peer_addr, resp.status);
        Ok(())
    };

    for req in req_reader {
        let req = req?;
        debug!("Receive request from {}: {:?}", peer_addr, req);
        send_resp(router.dispatch(req))?;
    }
    Ok(())
}
