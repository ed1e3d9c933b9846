pub mod common;

mod cycle_tests;
mod dirty_tests;
mod discovery_tests;
mod failure_tests;
mod lifecycle_tests;
