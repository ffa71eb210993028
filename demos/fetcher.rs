//! Fetches a handful of URLs through a canned transport and dispatches the
//! outcome by HTTP status, first with closures and then with a handler object.
//!
//! ```text
//! RUST_LOG=debug cargo run --example fetcher -- --handler
//! ```

use curler::{Capability, FAILED, Handler, HandlerResult, PromiseError, RESOLVED, Request, Response, Transport, Value, raise};
use std::rc::Rc;

#[derive(clap::Parser)]
#[command(name = "fetcher", version, about = "Dispatches canned HTTP responses by status")]
struct Cli {
    /// Also run every URL through the handler object
    #[arg(long)]
    handler: bool,

    /// Treat 204 responses as failures
    #[arg(long)]
    ignore_empty: bool,

    /// Extra URLs to fetch; unknown hosts fail at the transport
    urls: Vec<String>,
}

/// Answers from a fixed table instead of the network.
struct CannedTransport;

impl Transport for CannedTransport {
    fn execute(&self, request: &Request) -> Result<Response, PromiseError> {
        let url = request.url();
        let response = match url {
            "https://lrs.example.org/xapi" => Response::new(403),
            "https://lrs.example.org/rest" => Response::new(400),
            "http://www.example.org/robots.txt" => Response::new(200)
                .with_header("Content-Type", "text/plain")
                .with_body("User-agent: *\nDisallow:"),
            "http://www.example.org/ping" => Response::new(204),
            "https://moodle.example.org/robots.txt" => Response::new(404),
            _ => return Err(raise!("could not resolve host for {url}")),
        };
        Ok(response)
    }
}

/// Prints one line per dispatched outcome.
struct PrintingHandler;

impl Capability for PrintingHandler {
    fn responds_to(&self, method: &str) -> bool {
        matches!(method, RESOLVED | FAILED | "forbidden" | "not_found")
    }

    fn invoke(&self, method: &str, value: Value) -> HandlerResult {
        match method {
            RESOLVED => println!("C success"),
            "forbidden" => println!("C forbidden"),
            "not_found" => println!("C not found"),
            _ => println!("C other error {}", describe(&value)),
        }
        Ok(Value::Undefined)
    }
}

fn describe(value: &Value) -> String {
    match value.status() {
        Some(status) => status.to_string(),
        None => value.to_string(),
    }
}

fn main() {
    let cli = <Cli as clap::Parser>::parse();

    // Initialize logger (controlled by RUST_LOG)
    env_logger::init();

    let mut urls: Vec<String> = [
        "https://lrs.example.org/xapi",
        "https://lrs.example.org/rest",
        "http://www.example.org/robots.txt",
        "http://www.example.org/ping",
        "https://moodle.example.org/robots.txt",
    ]
    .iter()
    .map(|url| url.to_string())
    .collect();
    urls.extend(cli.urls);

    let transport = CannedTransport;
    let mut req = Request::default();
    if cli.ignore_empty {
        req.ignore_empty_responses();
    }

    for url in &urls {
        println!("\n{url}");
        req.set_url(url.as_str());
        req.get(&transport)
            .then(|res: Value| {
                println!("success");
                Value::from(res.as_response().map(|r| r.body().to_string()))
            })
            .then(|body: Value| {
                if body.is_truthy() {
                    println!("{body}");
                }
            })
            .forbidden(|_: Value| println!("unauthorized"))
            .not_found(|_: Value| println!("not found"))
            .fails(|err: Value| println!("other error {}", describe(&err)));
    }

    if !cli.handler {
        return;
    }

    let h = Handler::capability(Rc::new(PrintingHandler));
    for url in &urls {
        println!("\n{url}");
        req.set_url(url.as_str());
        req.get(&transport)
            .then(h.clone())
            .forbidden(h.clone())
            .not_found(h.clone())
            .fails(h.clone());
    }
}
