//! Tagwire Client
//!
//! A blocking client for the tagwire RPC system. Connecting performs the
//! two-phase handshake: dial the well-known port, receive the announced
//! session port as decimal text, hang up, and reconnect to the session
//! port where all RPC traffic flows.
//!
//! # Calls
//!
//! A call sends `Tuple[Str(procedure), Tuple(arguments)]` and blocks for
//! the single reply. [`RpcClient::call`] validates arguments against a
//! declared [`ProcedureShape`] and unmarshals the reply against its return
//! shape, so a value sent from here comes out of the handler as the same
//! native value, and vice versa on the return path. [`RpcClient::call_any`]
//! is the shape-free variant for generic tooling: arguments marshal
//! tag-directed and the reply converts back with tuples as sequences.
//!
//! There is no timeout: a caller waiting on a reply blocks until the reply
//! arrives or the connection itself drops, which surfaces as
//! [`TagwireError::Disconnected`].
//!
//! # Example
//!
//! ```no_run
//! use tagwire_client::{ProcedureShape, RpcClient};
//! use tagwire_common::{Config, Shape, Value};
//!
//! let config = Config::default();
//! let mut client = RpcClient::connect("127.0.0.1", &config).unwrap();
//!
//! let echo = ProcedureShape::new("echo", vec![Shape::Str], Shape::Str);
//! let reply = client.call(&echo, &[Value::Str("hello".into())]).unwrap();
//! assert_eq!(reply, Value::Str("hello".into()));
//! ```

use std::net::TcpStream;

use tagwire_common::element::Element;
use tagwire_common::marshal::{marshal, unmarshal, value_from_element, value_to_element};
use tagwire_common::protocol::{decode_reply, encode_call};
use tagwire_common::{Config, FrameTransport, Result, Shape, TagwireError, Value};

/// Client-side descriptor of a remote procedure: its name and declared
/// argument/return shapes, mirroring the server's registration.
#[derive(Debug, Clone)]
pub struct ProcedureShape {
    pub name: String,
    pub params: Vec<Shape>,
    pub ret: Shape,
}

impl ProcedureShape {
    pub fn new(name: impl Into<String>, params: Vec<Shape>, ret: Shape) -> Self {
        ProcedureShape {
            name: name.into(),
            params,
            ret,
        }
    }
}

/// A connected RPC client. One in-flight call at a time; replies are
/// matched to calls by the strict request/reply alternation on the session
/// stream.
#[derive(Debug)]
pub struct RpcClient {
    stream: TcpStream,
    transport: FrameTransport,
}

impl RpcClient {
    /// Connects to a server through the two-phase handshake.
    ///
    /// # Errors
    ///
    /// [`TagwireError::Disconnected`] if the server hangs up before
    /// announcing a session port, [`TagwireError::Protocol`] if the
    /// announcement is not a port number, or connection errors from either
    /// dial.
    pub fn connect(host: &str, config: &Config) -> Result<Self> {
        let transport = FrameTransport::new(config.max_frame_len)?;

        let mut handshake =
            FrameTransport::connect(&format!("{host}:{}", config.listen_port))?;
        let announcement = transport.receive_text(&mut handshake)?.ok_or_else(|| {
            TagwireError::Disconnected("server closed before announcing a session port".into())
        })?;
        drop(handshake);

        let session_port: u16 = announcement.trim().parse().map_err(|_| {
            TagwireError::Protocol(format!("malformed port announcement '{announcement}'"))
        })?;
        tracing::debug!(host, session_port, "reconnecting to session port");

        let stream = FrameTransport::connect(&format!("{host}:{session_port}"))?;
        Ok(RpcClient { stream, transport })
    }

    /// Invokes a remote procedure, validating arguments and reply against
    /// its declared shapes.
    ///
    /// # Errors
    ///
    /// [`TagwireError::Format`] on an arity or shape mismatch on either
    /// side, [`TagwireError::UnknownProcedure`] / [`TagwireError::Fault`]
    /// when the server answers with a fault, and transport errors when the
    /// connection drops.
    pub fn call(&mut self, shape: &ProcedureShape, args: &[Value]) -> Result<Value> {
        if args.len() != shape.params.len() {
            return Err(TagwireError::Format(format!(
                "'{}' takes {} arguments, caller supplies {}",
                shape.name,
                shape.params.len(),
                args.len()
            )));
        }

        let arguments = args
            .iter()
            .zip(&shape.params)
            .map(|(arg, param)| marshal(arg, param))
            .collect::<Result<Vec<_>>>()?;

        let reply = self.exchange(&shape.name, arguments)?;
        unmarshal(&reply, &shape.ret)
    }

    /// Invokes a remote procedure without declared shapes: arguments
    /// marshal tag-directed and the reply converts back with tuples as
    /// sequences.
    pub fn call_any(&mut self, procedure: &str, args: &[Value]) -> Result<Value> {
        let arguments = args.iter().map(value_to_element).collect();
        let reply = self.exchange(procedure, arguments)?;
        value_from_element(&reply)
    }

    /// Sends one call and blocks for its reply element.
    fn exchange(&mut self, procedure: &str, arguments: Vec<Element>) -> Result<Element> {
        let payload = encode_call(procedure, arguments);
        self.transport.send_text(&mut self.stream, &payload)?;

        let reply = self.transport.receive_text(&mut self.stream)?.ok_or_else(|| {
            TagwireError::Disconnected("connection closed while awaiting a reply".into())
        })?;
        decode_reply(reply.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_to_dead_port_fails() {
        let config = Config {
            listen_port: 1, // nothing listens here
            ..Config::default()
        };
        let err = RpcClient::connect("127.0.0.1", &config).unwrap_err();
        assert!(matches!(err, TagwireError::Connection(_)), "got {err:?}");
    }

    #[test]
    fn test_procedure_shape_holds_declaration() {
        let shape = ProcedureShape::new(
            "sum",
            vec![Shape::seq(Shape::U32)],
            Shape::U32,
        );
        assert_eq!(shape.name, "sum");
        assert_eq!(shape.params, vec![Shape::seq(Shape::U32)]);
        assert_eq!(shape.ret, Shape::U32);
    }
}
