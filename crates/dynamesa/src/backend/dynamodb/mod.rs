//! DynamoDB storage backend.
//!
//! Implements [`TableBackend`](crate::backend::TableBackend) on top of
//! `aws-sdk-dynamodb`.

mod backend;
mod conversions;
mod error;

pub use backend::DynamoDbBackend;
