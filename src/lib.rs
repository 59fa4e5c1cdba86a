//! Call quality analytics: Airtable import, filtered listings, summary
//! statistics and daily score trends over Postgres.

pub mod aggregate;
pub mod airtable;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod export;
pub mod filter;
pub mod importer;
pub mod mapper;
pub mod models;
pub mod report;
pub mod store;
