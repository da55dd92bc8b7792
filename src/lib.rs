pub mod config;
pub mod contact;
pub mod dialog_info;
pub mod useragent;
pub mod version;
