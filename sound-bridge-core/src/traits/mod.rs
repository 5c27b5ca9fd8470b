pub mod host;
pub mod native;
