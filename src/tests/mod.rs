pub mod support;

mod dataset_tests;
mod config_tests;
