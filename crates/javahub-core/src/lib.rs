//! Core library for javahub, a terminal client for the Java Learning Hub.
//!
//! - `auth`: the persisted credential and the session guard
//! - `api`: typed REST client
//! - `models`: server payloads
//! - `config`: configuration file and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;
