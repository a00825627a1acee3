//! Finance Service - statement imports, payables and card settlement.

pub mod billing;
pub mod classifier;
pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod queue;
pub mod repositories;
pub mod services;
pub mod startup;
