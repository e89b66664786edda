pub mod cache;
pub mod commands;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod gallery;
pub mod models;
pub mod rps;
pub mod scanner;
pub mod schema;
pub mod state;
pub mod upload;
