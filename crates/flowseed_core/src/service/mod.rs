//! Seeding use-cases.
//!
//! # Responsibility
//! - Orchestrate identity and repository store calls into idempotent
//!   startup steps.
//! - Keep callers decoupled from storage details.

pub mod seed_plan;
pub mod seed_service;
