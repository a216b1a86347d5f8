//! Leads API Library
//!
//! CRUD service for sales lead records kept in a remote table, with phone and
//! email validation and best-effort uniqueness checks on every write.
//!
//! # Modules
//!
//! - `api`: Route table and HTTP layers.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Lead record type and response bodies.
//! - `postgrest_client`: REST table store backend (Supabase/PostgREST).
//! - `repository`: CRUD façade over the table store.
//! - `store`: Table store trait and in-memory backend.
//! - `validation`: Phone, email and lead payload validation.

pub mod api;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod postgrest_client;
pub mod repository;
pub mod store;
pub mod validation;
