mod common;
mod pipeline;
mod scenarios;
