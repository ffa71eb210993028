//! Walks through how success and failure handlers run on a settled promise.
//!
//! ```text
//! cargo run --example promising -- --payload '{"foo":"bar","bar":"baz"}'
//! ```

use curler::{Promise, Value};
use std::process;

#[derive(clap::Parser)]
#[command(name = "promising", version, about = "Shows how curler promises chain their handlers")]
struct Cli {
    /// JSON payload to settle the promises with
    #[arg(short, long, default_value = r#"{"foo":"bar","bar":"baz"}"#)]
    payload: String,
}

fn field(value: &Value, key: &str) -> Value {
    value.get(key).cloned().unwrap_or_default()
}

fn main() {
    let cli = <Cli as clap::Parser>::parse();

    // Initialize logger (controlled by RUST_LOG)
    env_logger::init();

    let payload = match Value::from_json_str(&cli.payload) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("Invalid payload: {err}");
            process::exit(1);
        }
    };

    println!("-- resolved");
    let data = payload.clone();
    let p = Promise::new(move |resolve, _| resolve.call(data));
    p.then(|res: Value| {
        println!("{}", res.to_json());
        field(&res, "foo")
    })
    .fails(|_: Value| println!("must not show"));

    println!("-- rejected");
    let data = payload.clone();
    let p = Promise::new(move |_, reject| reject.call(data));
    p.then(|res: Value| {
        println!("{}", res.to_json());
        field(&res, "foo")
    })
    .fails(|err: Value| {
        println!("{}", err.to_json());
        field(&err, "foo")
    })
    .fails(|err: Value| println!("{err}"))
    .fails(|_: Value| println!("must not show"));

    println!("-- chained");
    let p = Promise::new(move |resolve, _| resolve.call(payload));
    p.then(|res: Value| {
        println!("{}", res.to_json());
        field(&res, "foo")
    })
    .then(|res: Value| println!("{res}"))
    .then(|res: Value| {
        if res.is_truthy() {
            println!("MUST NOT SHOW");
        }
        println!("OK");
    })
    .fails(|_: Value| println!("must not show"));
}
