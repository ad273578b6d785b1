//! Yatube: a community blogging platform with cached, paginated feeds.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
