//! Bridges the blocking chunk streamer to the asynchronous response stream.

pub mod coordinator;
