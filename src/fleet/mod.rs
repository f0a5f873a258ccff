//! Worker invocation: the client contract and the concurrent dispatcher.

pub mod client;
pub mod dispatcher;

pub use client::HttpWorkerClient;
pub use dispatcher::dispatch;
