// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Mapper-chain assembly and the compiled mapper.
pub mod builder;
/// Error values flowing through the mapping pipeline.
pub mod error;
/// Wire-level shape of an error response.
pub mod output;
/// Bridging mapped error outputs into axum responses.
pub mod respond;

pub use builder::{ErrorMapperBuilder, INTERNAL_ERROR_MESSAGE, Mapper, MapperOptions};
pub use error::{
    AppEnv, BoxError, CaughtError, HttpError, InvalidStatusCode, UnknownAppEnv, UnknownError,
};
pub use output::{ErrorOutput, HeaderEntry};
pub use respond::{ErrorHandler, output_to_response};
