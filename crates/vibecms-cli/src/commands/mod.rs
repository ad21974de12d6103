//! Command handlers

pub mod ai;
pub mod article;
pub mod config;
pub mod remote;
pub mod status;
pub mod tag;
