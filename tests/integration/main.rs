//! Integration tests for Sumi-Crawler

mod crawl_tests;
mod http_tests;
mod support;
