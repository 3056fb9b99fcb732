//! Process plumbing behind `mtscan`: locating the external scanners, building
//! their argument lists, running them and turning their result files into a
//! report.

pub mod commands;
pub mod connectivity;
pub mod environment;
pub mod installer;
pub mod locator;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod summary;
