//! Procedure registry and call dispatch.
//!
//! A [`Procedure`] binds a name to a native handler plus the declared
//! shapes of its positional parameters and return value. The [`Registry`]
//! is a fixed ordered list built at startup and looked up linearly by name,
//! first match wins; nothing mutates it after construction, so connections
//! share it behind an `Arc` without locking.
//!
//! Dispatch decodes the call payload, unmarshals each argument against its
//! declared shape, invokes the handler, and marshals the returned value
//! into the reply. A call naming no registered procedure is answered with
//! an explicit `unknown-procedure` fault instead of being dropped, and a
//! handler error becomes an `execution` fault. Unmarshalling failures are
//! format errors that abort the call without producing a reply.

use tagwire_common::element::{codec, Element};
use tagwire_common::marshal::{marshal, unmarshal};
use tagwire_common::protocol::replies::{FAULT_EXECUTION, FAULT_UNKNOWN_PROCEDURE};
use tagwire_common::protocol::{decode_call, encode_fault};
use tagwire_common::{Result, Shape, TagwireError, Value};

/// Native handler invoked with the unmarshalled positional arguments.
pub type Handler = Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// One named, typed procedure. Immutable once registered.
pub struct Procedure {
    name: String,
    params: Vec<Shape>,
    ret: Shape,
    handler: Handler,
}

impl Procedure {
    /// Binds a handler under `name` with the given parameter and return
    /// shapes.
    ///
    /// # Example
    ///
    /// ```
    /// use tagwire_common::{Shape, Value};
    /// use tagwire_server::Procedure;
    ///
    /// let sum = Procedure::new(
    ///     "sum",
    ///     vec![Shape::seq(Shape::U32)],
    ///     Shape::U32,
    ///     |args| {
    ///         let mut total = 0u32;
    ///         for item in args[0].as_seq()? {
    ///             total = total.wrapping_add(item.as_u32()?);
    ///         }
    ///         Ok(Value::U32(total))
    ///     },
    /// );
    /// assert_eq!(sum.name(), "sum");
    /// ```
    pub fn new(
        name: impl Into<String>,
        params: Vec<Shape>,
        ret: Shape,
        handler: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Procedure {
            name: name.into(),
            params,
            ret,
            handler: Box::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unmarshals the wire arguments, runs the handler, and marshals its
    /// return value.
    ///
    /// # Errors
    ///
    /// [`TagwireError::Format`] on an arity or shape mismatch; whatever the
    /// handler itself returns on failure.
    pub fn invoke(&self, arguments: &[Element]) -> Result<Element> {
        if arguments.len() != self.params.len() {
            return Err(TagwireError::Format(format!(
                "'{}' takes {} arguments, call supplies {}",
                self.name,
                self.params.len(),
                arguments.len()
            )));
        }

        let values = arguments
            .iter()
            .zip(&self.params)
            .map(|(argument, shape)| unmarshal(argument, shape))
            .collect::<Result<Vec<_>>>()?;

        let returned = (self.handler)(&values)?;
        marshal(&returned, &self.ret)
    }
}

/// The fixed set of procedures a server exposes.
pub struct Registry {
    procedures: Vec<Procedure>,
}

impl Registry {
    pub fn new(procedures: Vec<Procedure>) -> Self {
        Registry { procedures }
    }

    /// Linear first-match lookup by name.
    pub fn lookup(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.name() == name)
    }

    /// Handles one call payload, producing the encoded reply payload.
    ///
    /// Unknown procedures and handler failures produce fault replies.
    ///
    /// # Errors
    ///
    /// [`TagwireError::Format`] when the payload or its arguments are
    /// malformed; such calls get no reply at all.
    pub fn dispatch(&self, payload: &[u8]) -> Result<String> {
        let (name, arguments) = decode_call(payload)?;
        self.dispatch_call(&name, &arguments)
    }

    /// Handles one already-decoded call. The connection cycle decodes the
    /// payload on its own thread and may defer this part to the run loop.
    pub fn dispatch_call(&self, name: &str, arguments: &[Element]) -> Result<String> {
        let procedure = match self.lookup(name) {
            Some(procedure) => procedure,
            None => {
                tracing::warn!(procedure = %name, "call names no registered procedure");
                return Ok(encode_fault(FAULT_UNKNOWN_PROCEDURE, name));
            }
        };

        tracing::debug!(procedure = %name, "dispatching call");
        match procedure.invoke(arguments) {
            Ok(reply) => Ok(codec::encode(&reply)),
            Err(TagwireError::Format(message)) => Err(TagwireError::Format(message)),
            Err(error) => {
                tracing::warn!(procedure = %name, error = %error, "handler failed");
                Ok(encode_fault(FAULT_EXECUTION, &error.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagwire_common::protocol::replies::fault_of;
    use tagwire_common::protocol::{decode_reply, encode_call};

    fn echo() -> Procedure {
        Procedure::new("echo", vec![Shape::Str], Shape::Str, |args| Ok(args[0].clone()))
    }

    fn sum() -> Procedure {
        Procedure::new("sum", vec![Shape::seq(Shape::U32)], Shape::U32, |args| {
            let mut total = 0u32;
            for item in args[0].as_seq()? {
                total = total.wrapping_add(item.as_u32()?);
            }
            Ok(Value::U32(total))
        })
    }

    fn registry() -> Registry {
        Registry::new(vec![echo(), sum()])
    }

    fn dispatch_reply(registry: &Registry, payload: &str) -> Result<Element> {
        let reply = registry.dispatch(payload.as_bytes())?;
        decode_reply(reply.as_bytes())
    }

    #[test]
    fn test_lookup_is_first_match() {
        let registry = Registry::new(vec![
            Procedure::new("dup", vec![], Shape::U32, |_| Ok(Value::U32(1))),
            Procedure::new("dup", vec![], Shape::U32, |_| Ok(Value::U32(2))),
        ]);

        let reply = dispatch_reply(&registry, &encode_call("dup", vec![])).unwrap();
        assert_eq!(reply, Element::U32(1));
    }

    #[test]
    fn test_dispatch_echo() {
        let payload = encode_call("echo", vec![Element::Str("hello".into())]);
        let reply = dispatch_reply(&registry(), &payload).unwrap();
        assert_eq!(reply, Element::Str("hello".into()));
    }

    #[test]
    fn test_dispatch_sum_of_sequence() {
        let payload = encode_call(
            "sum",
            vec![Element::Tuple(vec![
                Element::U32(1),
                Element::U32(2),
                Element::U32(3),
            ])],
        );
        let reply = dispatch_reply(&registry(), &payload).unwrap();
        assert_eq!(reply, Element::U32(6));
    }

    #[test]
    fn test_unknown_procedure_gets_fault_reply() {
        let payload = encode_call("frobnicate", vec![]);
        let reply = registry().dispatch(payload.as_bytes()).unwrap();
        let element = codec::decode(reply.as_bytes()).unwrap();
        let (kind, message) = fault_of(&element).expect("fault reply");
        assert_eq!(kind, FAULT_UNKNOWN_PROCEDURE);
        assert_eq!(message, "frobnicate");
    }

    #[test]
    fn test_arity_mismatch_aborts_without_reply() {
        let payload = encode_call("echo", vec![]);
        let err = registry().dispatch(payload.as_bytes()).unwrap_err();
        assert!(matches!(err, TagwireError::Format(_)));
    }

    #[test]
    fn test_shape_mismatch_aborts_without_reply() {
        let payload = encode_call("echo", vec![Element::U32(5)]);
        let err = registry().dispatch(payload.as_bytes()).unwrap_err();
        assert!(matches!(err, TagwireError::Format(_)));
    }

    #[test]
    fn test_handler_error_becomes_execution_fault() {
        let registry = Registry::new(vec![Procedure::new(
            "fail",
            vec![],
            Shape::U32,
            |_| Err(TagwireError::Connection("backend down".into())),
        )]);

        let reply = registry.dispatch(encode_call("fail", vec![]).as_bytes()).unwrap();
        match decode_reply(reply.as_bytes()) {
            Err(TagwireError::Fault(message)) => assert!(message.contains("backend down")),
            other => panic!("expected Fault, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_payload_is_a_format_error() {
        let err = registry().dispatch(b"<SS 5>hello").unwrap_err();
        assert!(matches!(err, TagwireError::Format(_)));
    }

    #[test]
    fn test_map_argument_round_trip() {
        let registry = Registry::new(vec![Procedure::new(
            "keys",
            vec![Shape::map(Shape::Str, Shape::U32)],
            Shape::seq(Shape::Str),
            |args| {
                let keys = args[0]
                    .as_map()?
                    .iter()
                    .map(|(key, _)| key.clone())
                    .collect();
                Ok(Value::Seq(keys))
            },
        )]);

        let argument = Element::map_from_pairs(vec![
            (Element::Str("b".into()), Element::U32(2)),
            (Element::Str("a".into()), Element::U32(1)),
        ]);
        let reply =
            dispatch_reply(&registry, &encode_call("keys", vec![argument])).unwrap();
        // canonical key order, regardless of how the caller built the map
        assert_eq!(
            reply,
            Element::Tuple(vec![Element::Str("a".into()), Element::Str("b".into())])
        );
    }
}
