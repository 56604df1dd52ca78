//! # Transport Layer
//!
//! Carries encoded records over byte streams.
//!
//! Each record travels as one length-prefixed frame ([`FrameCodec`]) whose
//! payload is the record in the binary port format. Any tokio stream that is
//! `AsyncRead + AsyncWrite` works: TCP, Unix sockets, in-memory duplex pipes.
//!
//! [`FrameCodec`]: crate::core::codec::FrameCodec

pub mod framed;

pub use framed::RecordStream;
