pub mod advise;
pub mod catalog;
pub mod init;
pub mod list_models;
pub mod play;
pub mod validate;
