pub mod comments;
pub mod draft;
pub mod gateway;
pub mod synchronizer;
