// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mapper-chain assembly and the compiled mapper.

use crate::error::{AppEnv, CaughtError, HttpError, UnknownError};
use crate::output::ErrorOutput;
use axum::http::StatusCode;
use std::fmt;
use std::sync::Arc;

/// Fixed client-facing message substituted for internal errors when
/// `show_unknown_error_message` is disabled.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error. Please try again later.";

type MapperFn = dyn Fn(&UnknownError) -> Option<HttpError> + Send + Sync;
type ListenerFn = dyn Fn(&UnknownError) + Send + Sync;
type TransformFn = dyn Fn(ErrorOutput, &CaughtError, Option<&HttpError>) -> ErrorOutput + Send + Sync;

// ---------------------------------------------------------------------------
// MapperOptions
// ---------------------------------------------------------------------------

/// Construction options for [`ErrorMapperBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperOptions {
    /// Whether to copy stack traces into error payloads.
    pub show_stack_trace: bool,
    /// Whether 500 responses keep their real message. When `false`, the
    /// message is replaced with [`INTERNAL_ERROR_MESSAGE`].
    pub show_unknown_error_message: bool,
}

// ---------------------------------------------------------------------------
// ErrorMapperBuilder
// ---------------------------------------------------------------------------

/// Accumulates error mappers, unknown-error listeners, and output
/// transformers, and compiles them into a [`Mapper`].
///
/// Construction installs the built-in transformers derived from
/// [`MapperOptions`]; user transformers registered afterwards run after
/// them, in registration order. [`get`](Self::get) snapshots the chains:
/// registrations made after a `get()` call affect future `get()` calls
/// only, never a previously compiled mapper.
pub struct ErrorMapperBuilder {
    mappers: Vec<Arc<MapperFn>>,
    listeners: Vec<Arc<ListenerFn>>,
    transformers: Vec<Arc<TransformFn>>,
}

impl ErrorMapperBuilder {
    /// Create a builder with the built-in transformers for `options`.
    pub fn new(options: MapperOptions) -> Self {
        let mut builder = Self {
            mappers: Vec::new(),
            listeners: Vec::new(),
            transformers: Vec::new(),
        };

        if options.show_stack_trace {
            builder.register_output_transformer(
                |output: ErrorOutput, caught: &CaughtError, _boomed: Option<&HttpError>| {
                    match caught.stack() {
                        Some(stack) => {
                            let stack = stack.to_owned();
                            output.with_payload_entry("stack", stack)
                        }
                        None => output,
                    }
                },
            );
        }

        builder.register_output_transformer(
            |output: ErrorOutput, caught: &CaughtError, boomed: Option<&HttpError>| {
                let code = boomed
                    .and_then(HttpError::code)
                    .or_else(|| caught.code())
                    .map(str::to_owned);
                match code {
                    Some(code) => output.with_payload_entry("code", code),
                    None => output,
                }
            },
        );

        if !options.show_unknown_error_message {
            builder.register_output_transformer(
                |output: ErrorOutput, _caught: &CaughtError, boomed: Option<&HttpError>| {
                    if boomed.is_some_and(|b| b.status() == StatusCode::INTERNAL_SERVER_ERROR) {
                        output.with_payload_entry("message", INTERNAL_ERROR_MESSAGE)
                    } else {
                        output
                    }
                },
            );
        }

        builder
    }

    /// Create a builder with defaults derived from the deployment
    /// environment: development and test show stack traces and real
    /// internal messages, production hides both.
    pub fn for_env(env: AppEnv) -> Self {
        let relaxed = !env.is_production();
        Self::new(MapperOptions {
            show_stack_trace: relaxed,
            show_unknown_error_message: relaxed,
        })
    }

    /// Register a listener invoked exactly once per error that no mapper
    /// recognizes. Listeners run in registration order and do not affect
    /// the produced output.
    pub fn on_unknown_error(
        &mut self,
        listener: impl Fn(&UnknownError) + Send + Sync + 'static,
    ) -> &mut Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Append a mapper to the chain. Mappers run in registration order;
    /// the first to return `Some` wins and later mappers are not invoked.
    pub fn register_error_mapper(
        &mut self,
        mapper: impl Fn(&UnknownError) -> Option<HttpError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.mappers.push(Arc::new(mapper));
        self
    }

    /// Append an output transformer. Transformers fold left-to-right over
    /// the output in registration order, each consuming the previous
    /// transformer's result.
    pub fn register_output_transformer(
        &mut self,
        transformer: impl Fn(ErrorOutput, &CaughtError, Option<&HttpError>) -> ErrorOutput
        + Send
        + Sync
        + 'static,
    ) -> &mut Self {
        self.transformers.push(Arc::new(transformer));
        self
    }

    /// Compile the current chains into an immutable [`Mapper`].
    pub fn get(&self) -> Mapper {
        Mapper {
            mappers: self.mappers.clone(),
            listeners: self.listeners.clone(),
            transformers: self.transformers.clone(),
        }
    }
}

impl fmt::Debug for ErrorMapperBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorMapperBuilder")
            .field("mappers", &self.mappers.len())
            .field("listeners", &self.listeners.len())
            .field("transformers", &self.transformers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Mapper
// ---------------------------------------------------------------------------

/// Compiled error mapper: a frozen snapshot of the builder's chains.
///
/// Cheap to clone and safe to share across request handlers.
#[derive(Clone)]
pub struct Mapper {
    mappers: Vec<Arc<MapperFn>>,
    listeners: Vec<Arc<ListenerFn>>,
    transformers: Vec<Arc<TransformFn>>,
}

impl Mapper {
    /// Map a caught error to its wire output.
    ///
    /// Normalizes the error (pass-through, mapper chain, or synthesized
    /// 500 fallback), derives the default output, then folds the
    /// transformer chain over it. A panicking mapper, listener, or
    /// transformer propagates: a misconfigured chain is a bug, not a
    /// request-time condition.
    pub fn map(&self, caught: &CaughtError) -> ErrorOutput {
        let normalized = self.normalize(caught);
        let mut output = normalized.to_output();
        for transformer in &self.transformers {
            output = transformer(output, caught, Some(&normalized));
        }
        output
    }

    fn normalize(&self, caught: &CaughtError) -> HttpError {
        match caught {
            CaughtError::Http(err) => err.clone(),
            CaughtError::Unknown(raw) => {
                for mapper in &self.mappers {
                    if let Some(mapped) = mapper(raw) {
                        return mapped;
                    }
                }
                for listener in &self.listeners {
                    listener(raw);
                }
                HttpError::internal(raw.message())
            }
        }
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("mappers", &self.mappers.len())
            .field("listeners", &self.listeners.len())
            .field("transformers", &self.transformers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use serde_json::json;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn relaxed() -> ErrorMapperBuilder {
        ErrorMapperBuilder::new(MapperOptions {
            show_stack_trace: true,
            show_unknown_error_message: true,
        })
    }

    fn strict() -> ErrorMapperBuilder {
        ErrorMapperBuilder::new(MapperOptions {
            show_stack_trace: false,
            show_unknown_error_message: false,
        })
    }

    #[test]
    fn normalized_errors_pass_through_unchanged() {
        let mapper = relaxed().get();
        let caught = CaughtError::from(HttpError::not_found("missing widget"));
        let output = mapper.map(&caught);
        assert_eq!(output.status_code, 404);
        assert_eq!(output.payload["message"], "missing widget");
        assert_eq!(output.payload["error"], "Not Found");
    }

    #[test]
    fn first_matching_mapper_wins_and_later_mappers_are_skipped() {
        let second_calls = Arc::new(AtomicUsize::new(0));
        let counter = second_calls.clone();

        let mut builder = relaxed();
        builder
            .register_error_mapper(|raw| {
                raw.downcast_ref::<io::Error>()
                    .map(|_| HttpError::bad_gateway("io failed"))
            })
            .register_error_mapper(move |_raw| {
                counter.fetch_add(1, Ordering::SeqCst);
                Some(HttpError::bad_request("never reached"))
            });

        let output = builder
            .get()
            .map(&CaughtError::from_error(io::Error::other("boom")));

        assert_eq!(output.status_code, 502);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unmatched_error_notifies_listeners_in_order_and_falls_back_to_500() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut builder = relaxed();
        let first = order.clone();
        let second = order.clone();
        builder
            .on_unknown_error(move |_| first.lock().unwrap().push("first"))
            .on_unknown_error(move |_| second.lock().unwrap().push("second"));

        let output = builder.get().map(&CaughtError::from_error("mystery"));

        assert_eq!(output.status_code, 500);
        assert_eq!(output.payload["message"], "mystery");
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn listeners_are_not_notified_for_mapped_errors() {
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();

        let mut builder = relaxed();
        builder
            .on_unknown_error(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .register_error_mapper(|_| Some(HttpError::bad_request("mapped")));

        builder.get().map(&CaughtError::from_error("anything"));
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn transformers_run_in_registration_order() {
        let mut builder = relaxed();
        builder
            .register_output_transformer(
                |output: ErrorOutput, _: &CaughtError, _: Option<&HttpError>| {
                    output.with_payload_entry("a", 1)
                },
            )
            // Depends on the field the first transformer injected.
            .register_output_transformer(
                |output: ErrorOutput, _: &CaughtError, _: Option<&HttpError>| {
                    let a = output.payload["a"].as_i64().unwrap();
                    output.with_payload_entry("b", a + 1)
                },
            );

        let output = builder
            .get()
            .map(&CaughtError::from(HttpError::bad_request("x")));

        assert_eq!(output.payload["a"], 1);
        assert_eq!(output.payload["b"], 2);
    }

    #[test]
    fn stack_is_exposed_only_when_enabled() {
        let caught = CaughtError::Unknown(
            UnknownError::new(io::Error::other("tipped over")).with_stack("at main.rs:1"),
        );

        let shown = relaxed().get().map(&caught);
        assert_eq!(shown.payload["stack"], "at main.rs:1");

        let hidden = strict().get().map(&caught);
        assert!(hidden.payload.get("stack").is_none());
    }

    #[test]
    fn stack_transformer_is_inert_without_a_stack() {
        let output = relaxed()
            .get()
            .map(&CaughtError::from_error("no stack here"));
        assert!(output.payload.get("stack").is_none());
    }

    #[test]
    fn code_prefers_normalized_over_raw() {
        let mut builder = relaxed();
        builder.register_error_mapper(|_| Some(HttpError::conflict("dup").with_code("MAPPED")));

        let caught = CaughtError::Unknown(
            UnknownError::new(io::Error::other("raw")).with_code("RAW"),
        );
        let output = builder.get().map(&caught);
        assert_eq!(output.payload["code"], "MAPPED");
    }

    #[test]
    fn code_falls_back_to_raw_error_code() {
        let caught =
            CaughtError::Unknown(UnknownError::new(io::Error::other("raw")).with_code("EIO"));
        let output = relaxed().get().map(&caught);
        assert_eq!(output.payload["code"], "EIO");
    }

    #[test]
    fn code_is_absent_when_neither_side_has_one() {
        let output = relaxed().get().map(&CaughtError::from_error("plain"));
        assert!(output.payload.get("code").is_none());
    }

    #[test]
    fn internal_messages_are_redacted_when_hidden() {
        let output = strict()
            .get()
            .map(&CaughtError::from_error("db password is hunter2"));
        assert_eq!(output.status_code, 500);
        assert_eq!(output.payload["message"], INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn redaction_applies_to_passed_through_500s_too() {
        let output = strict()
            .get()
            .map(&CaughtError::from(HttpError::internal("secret detail")));
        assert_eq!(output.payload["message"], INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn non_500_statuses_keep_their_message_when_hidden() {
        let output = strict()
            .get()
            .map(&CaughtError::from(HttpError::not_found("user 42 missing")));
        assert_eq!(output.payload["message"], "user 42 missing");
    }

    #[test]
    fn relaxed_mode_keeps_internal_message() {
        let output = relaxed().get().map(&CaughtError::from_error("real reason"));
        assert_eq!(output.payload["message"], "real reason");
    }

    #[test]
    fn for_env_hides_everything_in_production() {
        let caught = CaughtError::Unknown(
            UnknownError::new(io::Error::other("leak")).with_stack("trace"),
        );

        let prod = ErrorMapperBuilder::for_env(AppEnv::Production).get().map(&caught);
        assert!(prod.payload.get("stack").is_none());
        assert_eq!(prod.payload["message"], INTERNAL_ERROR_MESSAGE);

        let dev = ErrorMapperBuilder::for_env(AppEnv::Development).get().map(&caught);
        assert_eq!(dev.payload["stack"], "trace");
        assert_eq!(dev.payload["message"], "leak");
    }

    #[test]
    fn get_snapshots_the_chains() {
        let mut builder = relaxed();
        let before = builder.get();

        builder.register_error_mapper(|_| Some(HttpError::bad_request("late mapper")));
        let after = builder.get();

        let caught = CaughtError::from_error("late");
        // The earlier snapshot never sees the late registration.
        assert_eq!(before.map(&caught).status_code, 500);
        assert_eq!(after.map(&caught).status_code, 400);
    }

    #[test]
    fn header_declared_by_normalized_error_survives_fallthrough() {
        let mut builder = strict();
        builder.register_error_mapper(|_| {
            Some(
                HttpError::new(StatusCode::TOO_MANY_REQUESTS, "throttled")
                    .with_header("retry-after", 30),
            )
        });
        let output = builder.get().map(&CaughtError::from_error("hot loop"));
        assert_eq!(output.status_code, 429);
        assert_eq!(output.headers["retry-after"], crate::output::HeaderEntry::Int(30));
    }

    #[test]
    fn boxed_errors_convert_into_caught() {
        let boxed: BoxError = Box::new(io::Error::other("boxed"));
        let caught = CaughtError::from(boxed);
        let output = relaxed().get().map(&caught);
        assert_eq!(output.payload["message"], "boxed");
        assert_eq!(output.payload, {
            let v = json!({
                "statusCode": 500,
                "error": "Internal Server Error",
                "message": "boxed",
            });
            v.as_object().unwrap().clone()
        });
    }
}
