pub mod ask;
pub mod build_index;
pub mod chat;
pub mod query;
pub mod status;
