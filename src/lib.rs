//! Stockroom - A schema-driven catalog service
//!
//! This library provides CRUD, search and pagination over typed collections
//! (books, movies, products, reviews) backed by SQLite or MySQL.

pub mod api;
pub mod collections;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
