pub mod apply;
pub mod cmd;
pub mod repo;
pub mod store;
