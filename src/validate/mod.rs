//! Schema enforcement steps.
//!
//! - [`InputValidator`] coerces and validates request parts before the
//!   handler runs and answers 400 on the first failing part.
//! - [`OutputInterceptor`] decorates the response emitter so that every
//!   payload is checked against the schema declared for its status code; a
//!   non-conforming payload is replaced by a 500 and never sent.

mod input;
mod output;

pub use input::{validate_input, InputRejection, InputValidator, RequestPart};
pub use output::{check_output, OutputInterceptor};
