//! CLI process tests.

mod process_test;
