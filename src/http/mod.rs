//! HTTP/1.1 transport.
//!
//! - **`connection`**: per-connection state machine, owns the read and request timeouts
//! - **`parser`**: parses requests out of a byte buffer
//! - **`request`**: request type, header lookup, parameter extraction
//! - **`response`**: status table, response type and builder
//! - **`writer`**: serializes and writes responses
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request received (400/413 on a bad one, close on read timeout)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Dispatch, bounded by the request timeout
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
