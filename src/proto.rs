//! Generated protocol types for `hemmer.provider.v1`.

#![allow(missing_docs)]
#![allow(clippy::all)]

tonic::include_proto!("hemmer.provider.v1");
