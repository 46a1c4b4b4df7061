//! HTTP bridge

pub mod api;
