pub mod config;
pub mod prompt_builder;
pub mod response_parser;
pub mod chat_gateway;
pub mod pipeline;
pub mod dataset;
