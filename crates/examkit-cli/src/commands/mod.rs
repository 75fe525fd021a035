pub mod init;
pub mod list;
pub mod output;
pub mod score;
pub mod take;
pub mod validate;
