//! Study Abroad CRM Library
//!
//! Lead management for a study-abroad consultancy: a chat-style intake
//! funnel, heuristic lead scoring, counsellor workflow, and reporting views.
//!
//! # Modules
//!
//! - `api`: HTTP surface (handlers and router).
//! - `core`: Domain logic (scoring engine, models, input adaptation, errors).
//! - `data`: Database pool and lead storage.
//! - `integrations`: Generative-text and WhatsApp collaborators.
//! - `circuit_breaker`: Breaker guarding the model server.
//! - `config`: Configuration management.
//! - `reporting`: Analytics series and CSV export.

pub mod api;
pub mod core;
pub mod data;
pub mod integrations;

pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod intake;
pub mod llm;
pub mod models;
pub mod notify;
pub mod reporting;
pub mod routes;
pub mod scoring;
pub mod storage;
