//! Business services layered over the REST client.

pub mod bulk;
