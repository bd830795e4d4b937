//! this binary starts the recs server
//! to see the list of options, type: `recs-server --help`
//!
//! `recs-server [--addr IP-PORT] [--dir PATH] [--sink SINK] [--pool POOL] [--threads N]`
//!
//!     Serve the `books` and `customers` collections.
//!     --addr the IP:PORT to listen on, 127.0.0.1:4000 by default.
//!     --dir the directory collections are persisted in, the current directory by default.
//!     --sink either `json` (one .json file per collection) or `sled`. The first sink used in
//!       a directory is remembered; starting again with a different sink is an error.
//!     --pool either `shared` (a shared queue thread pool) or `rayon`.
//!     --threads the number of worker threads, 4 by default.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use clap::{crate_version, App, Arg, arg_enum, value_t};
use recs::{
    Book, Customer, JsonFileSink, RayonThreadPool, RecordStore, RecsServer, Result, Router,
    SharedQueueThreadPool, SledSink, StoreError, ThreadPool,
};
use tracing::{warn, info, Level};
use tracing_subscriber::{FmtSubscriber};
use std::process::exit;

arg_enum! {
    #[allow(non_camel_case_types)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum SinkKind {
        json,
        sled
    }
}

arg_enum! {
    #[allow(non_camel_case_types)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Pool {
        shared,
        rayon
    }
}

const DEFAULT_ADDRESS: &str = "127.0.0.1:4000";
const DEFAULT_THREADS: &str = "4";
const DEFAULT_SINK: SinkKind = SinkKind::json;
const DEFAULT_POOL: Pool = Pool::shared;
// the name of the file that remembers which sink a data directory uses
const SINK_FILE: &str = "sink";
// the sled database directory, inside the data directory
const SLED_DIR: &str = "sled";


/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    addr: SocketAddr,
    dir: PathBuf,
    sink: SinkKind,
    pool: Pool,
    threads: u32,
}

impl Opt {
    /// validates the `addr` and `req_sink` parameters
    /// returns `Ok<Opt>` if everything is valid
    /// # Errors
    /// returns [`StoreError::Parsing`] if one of the parameters is invalid
    ///
    fn build(addr: &str, dir: PathBuf, req_sink: SinkKind, pool: Pool, threads: u32) -> Result<Opt> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| StoreError::Parsing(format!("could not parse {} into an IP address and port", &addr)))?;

        if threads == 0 {
            return Err(StoreError::Parsing("--threads must be at least 1".to_string()));
        }

        // the requested sink must be the same as the sink already used in this directory
        let sink = match current_sink(&dir)? {
            None => req_sink,
            Some(cur_sink) if req_sink == cur_sink => cur_sink,
            Some(cur_sink) => return Err(StoreError::Parsing(format!("the requested sink: {} does not match the sink currently in use: {}", req_sink, cur_sink)))
        };

        Ok(Opt { addr, dir, sink, pool, threads })
    }
}


fn main() {
    // set up a tracing subscriber to log to STDERR
    subscriber_config();

    // parse command line args
    let matches = App::new("recs-server")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("serves validated book and customer collections")
        .arg(Arg::with_name("addr")
            .long("addr")
            .value_name("IP_ADDR:PORT")
            .help("sets the IP_ADDR:PORT that the server listens on")
            .default_value(DEFAULT_ADDRESS))
        .arg(Arg::with_name("dir")
            .long("dir")
            .value_name("PATH")
            .help("sets the directory collections are persisted in")
            .default_value("."))
        .arg(Arg::with_name("sink")
            .long("sink")
            .value_name("SINK")
            .help("sets the persistence sink to use, either 'json' or 'sled'")
            .possible_values(&SinkKind::variants())
            .default_value("json"))
        .arg(Arg::with_name("pool")
            .long("pool")
            .value_name("POOL")
            .help("sets the thread pool to use, either 'shared' or 'rayon'")
            .possible_values(&Pool::variants())
            .default_value("shared"))
        .arg(Arg::with_name("threads")
            .long("threads")
            .value_name("N")
            .help("sets the number of worker threads")
            .default_value(DEFAULT_THREADS))
        .get_matches();

    // validate command line options, store them in Opt
    let addr = matches.value_of("addr").unwrap_or(DEFAULT_ADDRESS);
    let dir = PathBuf::from(matches.value_of("dir").unwrap_or("."));
    let req_sink = value_t!(matches, "sink", SinkKind).unwrap_or(DEFAULT_SINK);
    let pool = value_t!(matches, "pool", Pool).unwrap_or(DEFAULT_POOL);
    let opt = value_t!(matches, "threads", u32)
        .map_err(|e| StoreError::Parsing(e.to_string()))
        .and_then(|threads| Opt::build(addr, dir, req_sink, pool, threads));
    let opt = match opt {
        Ok(opt) => opt,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    // start the server
    if let Err(e) = run(opt) {
        eprintln!("{}", e);
        exit(1);
    }
}


fn run(opt: Opt) -> Result<()> {
    info!("recs-server {}", env!("CARGO_PKG_VERSION"));
    info!("Sink: {}, pool: {} x {}", opt.sink, opt.pool, opt.threads);
    info!("Listening on {}", opt.addr);

    // remember the sink used by this directory
    fs::create_dir_all(&opt.dir)?;
    fs::write(opt.dir.join(SINK_FILE), format!("{}", opt.sink))?;

    let router = match opt.sink {
        SinkKind::json => Router::new()
            .mount(RecordStore::<Book, _>::open(JsonFileSink::open(&opt.dir)?)?)
            .mount(RecordStore::<Customer, _>::open(JsonFileSink::open(&opt.dir)?)?),
        SinkKind::sled => {
            let db = sled::open(opt.dir.join(SLED_DIR))?;
            Router::new()
                .mount(RecordStore::<Book, _>::open(SledSink::open(&db)?)?)
                .mount(RecordStore::<Customer, _>::open(SledSink::open(&db)?)?)
        }
    };

    match opt.pool {
        Pool::shared => RecsServer::new(router, SharedQueueThreadPool::new(opt.threads)?).run(opt.addr),
        Pool::rayon => RecsServer::new(router, RayonThreadPool::new(opt.threads)?).run(opt.addr),
    }
}

/// determines if there is a "sink" file in `dir` and returns the value of that file, else None
///
/// returns `Ok(None)` if a "sink" file does not (yet) exist, `Some(SinkKind)`
/// if the sink file exists and was parsed successfully
///
fn current_sink(dir: &Path) -> Result<Option<SinkKind>> {
    let sink = dir.join(SINK_FILE);
    if !sink.exists() {
        return Ok(None);
    }

    match fs::read_to_string(sink)?.trim().parse() {
        Ok(sink) => Ok(Some(sink)),
        Err(e) => {
            // file is corrupted or invalid contents
            warn!("The content of the sink file is invalid: {}", e);
            Ok(None)
        }
    }
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config() {
    let subscriber = FmtSubscriber::builder()
        // all spans/events with a level of INFO or higher (e.g. warn, error) are written
        .with_max_level(Level::INFO)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("could not set the tracing subscriber: {}", e);
    }
}
