pub mod checklist;
pub mod config;
pub mod logging;
pub mod news;
pub mod storage;
pub mod uploads;
pub mod web;
