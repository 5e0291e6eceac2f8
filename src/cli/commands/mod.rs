//! One module per `passvault` subcommand.

pub mod add;
#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod delete;
pub mod destroy;
pub mod export;
pub mod get;
pub mod import_cmd;
pub mod info;
pub mod init;
pub mod list;
pub mod migrate;
pub mod passwd;
pub mod pepper_generate;
