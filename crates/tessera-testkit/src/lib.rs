//! # Tessera Testkit
//!
//! Testing utilities for tessera.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Values with their exact encoded bytes and field ranges
//! - **Generators**: Proptest strategies for storable values and chunk sizes
//! - **Fixtures**: Throwaway databases on disk or in memory
//!
//! ## Golden Vectors
//!
//! Golden vectors pin the payload format, so a database written today stays
//! readable tomorrow:
//!
//! ```rust
//! use tessera_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! for vector in all_vectors() {
//!     println!("{}: {} bytes", vector.name, vector.encoded.len());
//! }
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use tessera_testkit::generators::{chunk_size, storable_value};
//!
//! proptest! {
//!     #[test]
//!     fn encode_is_lossless(value in storable_value(), size in chunk_size()) {
//!         let (encoded, chunks) = tessera_core::encode(&value, size).unwrap();
//!         let back = tessera_core::decode(&chunks, encoded.datatype).unwrap();
//!         prop_assert_eq!(back, value);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up a database:
//!
//! ```rust
//! use tessera::Store;
//! use tessera_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::on_disk(4);
//! fixture.db.kv().set("k", &tessera_testkit::fixtures::text("v")).unwrap();
//! let reopened = fixture.reopen();
//! assert_eq!(reopened.kv().count_records().unwrap(), 1);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::TestFixture;
pub use generators::{chunk_size, storable_value, BlobParams};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
