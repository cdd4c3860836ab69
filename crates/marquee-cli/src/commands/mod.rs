pub mod clear;
pub mod config;
pub mod context;
pub mod crawl;
pub mod history;
pub mod pick;
pub mod resolve;
pub mod ui;
