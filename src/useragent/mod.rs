mod account;
pub use account::{AccountOption, UserAgent, UserCredential};
