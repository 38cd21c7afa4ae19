//! Request authentication.
//!
//! Only HTTP Basic is supported: [`Credentials`] renders the `Authorization`
//! header value the executor attaches before custom headers are applied.

mod basic;

pub use basic::{Credentials, decode_basic_auth};
