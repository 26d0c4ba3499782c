pub mod client;
pub mod signature;

pub use client::{ProcessorClient, ProcessorError, RemoteOrder, RemoteRefund};
pub use signature::{payment_signature, verify_payment_signature};
