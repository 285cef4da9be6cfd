//! Tagwire Server
//!
//! The server side of the tagwire RPC system: a fixed registry of named,
//! typed procedures, a per-connection run loop serializing handler
//! execution, and the connection manager that hands each accepted client a
//! dedicated session port.
//!
//! # Overview
//!
//! A server is assembled from [`Procedure`]s (name, parameter shapes,
//! return shape, native handler) collected into a [`Registry`], then bound
//! and driven by an [`RpcServer`]:
//!
//! ```no_run
//! use tagwire_common::{Config, Shape, Value};
//! use tagwire_server::{DispatchMode, Procedure, Registry, RpcServer};
//!
//! let registry = Registry::new(vec![Procedure::new(
//!     "echo",
//!     vec![Shape::Str],
//!     Shape::Str,
//!     |args| Ok(args[0].clone()),
//! )]);
//!
//! let server = RpcServer::bind(Config::default(), registry, DispatchMode::Deferred).unwrap();
//! server.serve().unwrap();
//! ```
//!
//! # Concurrency
//!
//! Each accepted connection owns a dedicated thread and, in deferred
//! dispatch mode, an independent [`RunLoop`] worker; handlers for one
//! connection therefore run strictly in call order while the connection
//! thread is already reading the next call. The registry is immutable after
//! construction and shared read-only across connections. No lock spans two
//! connections.

pub mod registry;
pub mod run_loop;
pub mod server;

pub use registry::{Procedure, Registry};
pub use run_loop::{Event, RunLoop};
pub use server::{ConnectionInfo, DispatchMode, RpcServer};
