pub mod app;
pub mod catalog;
pub mod combination;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod folder;
pub mod fs_util;
pub mod output;
pub mod record;
pub mod store;
pub mod transform;
pub mod tui;
