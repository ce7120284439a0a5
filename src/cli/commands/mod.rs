pub mod add;
pub mod completions;
pub mod get;
pub mod init;
pub mod list;
pub mod profiles;
