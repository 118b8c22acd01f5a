//! Data Transfer Objects for REST request/response serialization.

pub mod publish_dto;
pub mod stream_dto;

pub use publish_dto::*;
pub use stream_dto::*;
