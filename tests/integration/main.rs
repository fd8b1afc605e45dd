//! Integration tests for Shelf-Crawler
//!
//! Every test serves a small catalog site from a wiremock server and runs
//! the real coordinator against it.

mod common;
mod resume_tests;
