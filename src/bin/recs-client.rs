//! The recs-client executable supports the following command line arguments.
//! Every command accepts `--addr IP-PORT`; without it the client connects to 127.0.0.1:4000.
//! The response body is printed to stdout as JSON. Any non 2xx response prints its message to
//! stderr and exits with a non-zero code.
//!
//! `recs-client list <COLLECTION> [--page N] [--size N]`
//!
//!     List every record of a collection, or one page of it.
//!
//! `recs-client get <COLLECTION> <ID>`
//!
//!     Print one record.
//!
//! `recs-client find <COLLECTION> <FIELD> <VALUE>`
//!
//!     Print the records whose FIELD equals VALUE (case-insensitive for text fields).
//!
//! `recs-client add <COLLECTION> <JSON>`
//!
//!     Create a record from a JSON object. The new record's location is printed to stderr.
//!
//! `recs-client put <COLLECTION> <ID> <JSON>`
//!
//!     Replace every field of a record.
//!
//! `recs-client patch <COLLECTION> <ID> <JSON>`
//!
//!     Change only the fields present in the JSON object.
//!
//! `recs-client rm <COLLECTION> <ID>`
//!
//!     Remove a record.
//!
//! `recs-client -V`
//!
//!     Print the version.


use std::net::SocketAddr;
use std::process::exit;
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use recs::{RecordId, RecsClient, Request, Response, Result, StoreError};
use tracing::{debug, Level};
use tracing_subscriber::{FmtSubscriber};

const DEFAULT_ADDRESS: &str = "127.0.0.1:4000";

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    /// the server's ip:port
    addr: SocketAddr,
    req: Request,
}

impl Opt {
    /// validates the `addr` parameter is a valid IP address and PORT
    /// returns `Ok<Opt>` if everything is valid
    /// # Errors
    /// returns [`StoreError::Parsing`] if one of the parameters is invalid
    ///
    fn build(addr: &str, req: Request) -> Result<Opt> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| StoreError::Parsing(format!("could not parse {} into an IP address and port", &addr)))?;

        Ok(Opt { addr, req })
    }
}

fn main() {
    // configure a subscriber that will log messages to STDERR
    subscriber_config();

    let collection = || Arg::with_name("COLLECTION").required(true).index(1);
    let id = || Arg::with_name("ID").required(true).index(2);
    let addr = || Arg::with_name("addr")
        .long("addr")
        .value_name("IP_ADDR:PORT")
        .help("sets the IP_ADDR:PORT of the server to connect to")
        .default_value(DEFAULT_ADDRESS);

    let matches = App::new("recs-client")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("talks to a recs-server")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommands(vec![
            SubCommand::with_name("list")
                .about("List the records of a collection")
                .arg(collection())
                .arg(Arg::with_name("page").long("page").takes_value(true).value_name("N"))
                .arg(Arg::with_name("size").long("size").takes_value(true).value_name("N"))
                .arg(addr()),
            SubCommand::with_name("get")
                .about("Get a record by id")
                .arg(collection())
                .arg(id())
                .arg(addr()),
            SubCommand::with_name("find")
                .about("Find the records whose FIELD equals VALUE")
                .arg(collection())
                .arg(Arg::with_name("FIELD").required(true).index(2))
                .arg(Arg::with_name("VALUE").required(true).index(3))
                .arg(addr()),
            SubCommand::with_name("add")
                .about("Create a record from a JSON object")
                .arg(collection())
                .arg(Arg::with_name("JSON").required(true).index(2))
                .arg(addr()),
            SubCommand::with_name("put")
                .about("Replace every field of a record")
                .arg(collection())
                .arg(id())
                .arg(Arg::with_name("JSON").required(true).index(3))
                .arg(addr()),
            SubCommand::with_name("patch")
                .about("Change only the given fields of a record")
                .arg(collection())
                .arg(id())
                .arg(Arg::with_name("JSON").required(true).index(3))
                .arg(addr()),
            SubCommand::with_name("rm")
                .about("Remove a record")
                .arg(collection())
                .arg(id())
                .arg(addr()),
        ])
        .get_matches();

    // parse commands into an Opt struct, then send the request
    let outcome = parse_options(&matches).and_then(run);
    match outcome {
        Ok(resp) if resp.status.is_success() => print_response(&resp),
        Ok(resp) => {
            eprintln!("{} {}", resp.status.code(), resp.message().unwrap_or("request failed"));
            exit(1);
        }
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    }
}

/// sends the request held by `opt` to the server at `opt.addr`
fn run(opt: Opt) -> Result<Response> {
    let mut client = RecsClient::connect(opt.addr)?;
    debug!("sending {:?}", opt.req);
    client.send(&opt.req)
}

fn print_response(resp: &Response) {
    if let Some(location) = &resp.location {
        eprintln!("created {}", location);
    }
    if let Some(body) = &resp.body {
        match serde_json::to_string_pretty(body) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("could not print the response: {}", e),
        }
    }
}

/// parses the matches from the command line into an [`Opt`] struct
fn parse_options(matches: &ArgMatches) -> Result<Opt> {
    let (name, args) = match matches.subcommand() {
        (name, Some(args)) => (name, args),
        _ => return Err(StoreError::Parsing("no command given".to_string())),
    };
    let addr = args.value_of("addr").unwrap_or(DEFAULT_ADDRESS);
    let collection = args.value_of("COLLECTION").map(String::from).unwrap_or_default();

    let req = match name {
        "list" => Request::List {
            collection,
            page: optional_number(args, "page")?,
            size: optional_number(args, "size")?,
        },
        "get" => Request::Get { collection, id: record_id(args)? },
        "find" => Request::Filter {
            collection,
            field: args.value_of("FIELD").map(String::from).unwrap_or_default(),
            value: args.value_of("VALUE").map(String::from).unwrap_or_default(),
        },
        "add" => Request::Insert { collection, body: json_body(args)? },
        "put" => Request::Replace { collection, id: record_id(args)?, body: json_body(args)? },
        "patch" => Request::Patch { collection, id: record_id(args)?, body: json_body(args)? },
        "rm" => Request::Delete { collection, id: record_id(args)? },
        other => return Err(StoreError::Parsing(format!("unknown command: {}", other))),
    };
    Opt::build(addr, req)
}

fn record_id(args: &ArgMatches) -> Result<RecordId> {
    let id = args.value_of("ID").unwrap_or_default();
    id.parse()
        .map_err(|_| StoreError::Parsing(format!("could not parse {} into a record id", id)))
}

fn optional_number(args: &ArgMatches, name: &str) -> Result<Option<usize>> {
    args.value_of(name)
        .map(|value| {
            value
                .parse()
                .map_err(|_| StoreError::Parsing(format!("--{} must be a number, got {}", name, value)))
        })
        .transpose()
}

fn json_body(args: &ArgMatches) -> Result<serde_json::Value> {
    let text = args.value_of("JSON").unwrap_or_default();
    serde_json::from_str(text).map_err(|e| StoreError::Parsing(format!("invalid JSON body: {}", e)))
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config() {
    let subscriber = FmtSubscriber::builder()
        // the client only reports warnings and errors
        .with_max_level(Level::WARN)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("could not set the tracing subscriber: {}", e);
    }
}
