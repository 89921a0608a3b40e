//! A library for reading, writing, and verifying FPGA registers over UDP.
//!
//! The [`transport`] module defines the [`Transport`](transport::Transport) trait along with
//! the real UDP transport and an in-memory mock. The [`verify`] module exercises any transport
//! with randomized write-then-read round trips.
//!
//! ```
//! use fpgareg::prelude::*;
//!
//! let mut transport = Mock::new();
//! assert!(transport.write_register(8562, 69_696_969).unwrap());
//! assert_eq!(transport.read_register(8562).unwrap(), Some(69_696_969));
//! ```

pub mod prelude;
pub mod transport;
pub mod verify;

pub use udpreg::Error;
