//! # Tagwire CLI Entry Point
//!
//! Main binary for the tagwire RPC system. Hosts a demo procedure registry
//! or makes ad-hoc calls against a running server.
//!
//! ## Usage
//!
//! ```bash
//! # Start a server with the demo registry on the default well-known port
//! tagwire serve
//!
//! # Start with a configuration file and inline dispatch
//! tagwire serve --config tagwire.json --inline
//!
//! # Make an RPC call (arguments are JSON values, output is JSON)
//! tagwire call 127.0.0.1 echo '"hello"'
//! tagwire call 127.0.0.1 sum '[1, 2, 3]'
//! tagwire call 127.0.0.1 word_count '"the quick brown fox the"'
//! ```
//!
//! ## Argument spelling
//!
//! JSON strings become wire strings, non-negative integers become u32,
//! arrays become sequences, and objects become maps with string keys.
//! Booleans, null, floats, and out-of-range numbers have no wire shape and
//! are rejected.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use argh::FromArgs;
use tracing_subscriber::EnvFilter;

use tagwire_client::RpcClient;
use tagwire_common::{Config, Shape, Value};
use tagwire_server::{DispatchMode, Procedure, Registry, RpcServer};

/// tagwire - typed-element RPC over framed TCP.
#[derive(FromArgs)]
struct Args {
    /// path to a JSON configuration file
    #[argh(option)]
    config: Option<PathBuf>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Serve(ServeArgs),
    Call(CallArgs),
}

/// Host the demo procedure registry.
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
struct ServeArgs {
    /// execute handlers on the connection thread instead of the run loop
    #[argh(switch)]
    inline: bool,
}

/// Call a procedure on a running server.
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
struct CallArgs {
    /// host the server runs on, e.g. 127.0.0.1
    #[argh(positional)]
    host: String,

    /// procedure name
    #[argh(positional)]
    procedure: String,

    /// positional arguments, one JSON value each
    #[argh(positional)]
    args: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Args = argh::from_env();
    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    match args.command {
        Command::Serve(serve) => run_serve(config, serve),
        Command::Call(call) => run_call(config, call),
    }
}

fn run_serve(config: Config, args: ServeArgs) -> Result<()> {
    let mode = if args.inline {
        DispatchMode::Inline
    } else {
        DispatchMode::Deferred
    };

    let server = RpcServer::bind(config, demo_registry(), mode)
        .context("binding the well-known listener")?;
    tracing::info!(addr = %server.local_addr()?, ?mode, "serving demo registry");
    server.serve()?;
    Ok(())
}

fn run_call(config: Config, args: CallArgs) -> Result<()> {
    let values = args
        .args
        .iter()
        .map(|text| {
            let json: serde_json::Value = serde_json::from_str(text)
                .with_context(|| format!("argument '{text}' is not valid JSON"))?;
            json_to_value(&json)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut client = RpcClient::connect(&args.host, &config)
        .with_context(|| format!("connecting to {}", args.host))?;
    let reply = client.call_any(&args.procedure, &values)?;

    println!("{}", serde_json::to_string_pretty(&value_to_json(&reply))?);
    Ok(())
}

/// The procedures `tagwire serve` exposes.
fn demo_registry() -> Registry {
    Registry::new(vec![
        Procedure::new("echo", vec![Shape::Str], Shape::Str, |args| {
            Ok(args[0].clone())
        }),
        Procedure::new("sum", vec![Shape::seq(Shape::U32)], Shape::U32, |args| {
            let mut total = 0u32;
            for item in args[0].as_seq()? {
                total = total.wrapping_add(item.as_u32()?);
            }
            Ok(Value::U32(total))
        }),
        Procedure::new(
            "word_count",
            vec![Shape::Str],
            Shape::map(Shape::Str, Shape::U32),
            |args| {
                let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
                for word in args[0].as_str()?.split_whitespace() {
                    *counts.entry(word).or_insert(0) += 1;
                }
                Ok(Value::Map(
                    counts
                        .into_iter()
                        .map(|(word, count)| (Value::Str(word.to_owned()), Value::U32(count)))
                        .collect(),
                ))
            },
        ),
    ])
}

/// Converts a JSON argument into a wire value.
fn json_to_value(json: &serde_json::Value) -> Result<Value> {
    match json {
        serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
        serde_json::Value::Number(n) => {
            let v = n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| anyhow!("number {n} does not fit a u32"))?;
            Ok(Value::U32(v))
        }
        serde_json::Value::Array(items) => Ok(Value::Seq(
            items.iter().map(json_to_value).collect::<Result<Vec<_>>>()?,
        )),
        serde_json::Value::Object(entries) => Ok(Value::Map(
            entries
                .iter()
                .map(|(key, value)| Ok((Value::Str(key.clone()), json_to_value(value)?)))
                .collect::<Result<Vec<_>>>()?,
        )),
        other => Err(anyhow!("JSON value '{other}' has no wire shape")),
    }
}

/// Renders a reply value as JSON. Maps with non-string keys render as
/// arrays of `[key, value]` pairs.
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::U32(v) => serde_json::Value::Number((*v).into()),
        Value::Seq(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(pairs) => {
            if pairs.iter().all(|(key, _)| matches!(key, Value::Str(_))) {
                let mut object = serde_json::Map::new();
                for (key, value) in pairs {
                    if let Value::Str(key) = key {
                        object.insert(key.clone(), value_to_json(value));
                    }
                }
                serde_json::Value::Object(object)
            } else {
                serde_json::Value::Array(
                    pairs
                        .iter()
                        .map(|(key, value)| {
                            serde_json::Value::Array(vec![
                                value_to_json(key),
                                value_to_json(value),
                            ])
                        })
                        .collect(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_to_value_covers_wire_shapes() {
        assert_eq!(json_to_value(&json!("hi")).unwrap(), Value::Str("hi".into()));
        assert_eq!(json_to_value(&json!(7)).unwrap(), Value::U32(7));
        assert_eq!(
            json_to_value(&json!([1, 2])).unwrap(),
            Value::Seq(vec![Value::U32(1), Value::U32(2)])
        );
        assert_eq!(
            json_to_value(&json!({"a": 1})).unwrap(),
            Value::Map(vec![(Value::Str("a".into()), Value::U32(1))])
        );
    }

    #[test]
    fn test_json_to_value_rejects_shapeless_values() {
        assert!(json_to_value(&json!(null)).is_err());
        assert!(json_to_value(&json!(true)).is_err());
        assert!(json_to_value(&json!(1.5)).is_err());
        assert!(json_to_value(&json!(-1)).is_err());
        assert!(json_to_value(&json!(u64::MAX)).is_err());
    }

    #[test]
    fn test_value_to_json_round_trips_string_keyed_maps() {
        let value = Value::Map(vec![
            (Value::Str("a".into()), Value::U32(1)),
            (Value::Str("b".into()), Value::Seq(vec![Value::U32(2)])),
        ]);
        assert_eq!(value_to_json(&value), json!({"a": 1, "b": [2]}));
    }

    #[test]
    fn test_value_to_json_renders_non_string_keys_as_pairs() {
        let value = Value::Map(vec![(Value::U32(1), Value::Str("one".into()))]);
        assert_eq!(value_to_json(&value), json!([[1, "one"]]));
    }

    #[test]
    fn test_demo_registry_has_the_advertised_procedures() {
        let registry = demo_registry();
        for name in ["echo", "sum", "word_count"] {
            assert!(registry.lookup(name).is_some(), "missing {name}");
        }
    }
}
