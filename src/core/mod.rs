//! # Core Codec Components
//!
//! Schema model, value model and the low-level building blocks shared by
//! every port and by the struct codec.
//!
//! ## Components
//! - **Types**: Wire tags and recursive type descriptors
//! - **Schema**: Per-record field descriptor tables
//! - **Value**: Records with presence tracking, containers, and the
//!   deep copy / equality / hash operations over them
//! - **Guard**: Depth-bounded recursion guard
//! - **Codec**: Tokio codec for length-delimited frames
//!
//! ## Security
//! - Nesting depth bounded by the recursion guard (default 128)
//! - Frame length validated before allocation

pub mod codec;
pub mod guard;
pub mod schema;
pub mod types;
pub mod value;
