//! Ansible helpers: the `dict2ini` filter and an HTTP(s) dynamic inventory
//! source.

pub mod filter;
pub mod inventory;
pub mod source;
