//! Integration test suite entry point.

mod concurrency_tests;
mod fixture;
mod session_tests;
