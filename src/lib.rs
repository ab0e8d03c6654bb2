//! # Tutor Gateway
//!
//! `tutor-gateway` mediates every interaction between a student and an
//! AI-backed tutoring system: it classifies the student's prompt, enforces
//! the institution's AI-use policy before anything reaches the student, picks
//! a pedagogical strategy (Socratic questioning, graduated hints, template
//! fallbacks) to respond with, and records an immutable, multi-level trace of
//! what happened so a human reviewer can reconstruct the session afterward.
//!
//! ## Core Concepts
//!
//! - **Sessions**: a bounded interaction window between a student and a
//!   simulated or real activity, tracked in [`domain::Session`].
//! - **Classification**: [`classifier::Classifier`] turns a raw prompt into a
//!   [`domain::intervention::ClassifierOutput`] — cognitive state, requested
//!   help level, delegation risk.
//! - **Governance**: [`governance::GovernanceFilter`] sits between
//!   classification and response, sanitizing PII and blocking responses that
//!   would violate policy.
//! - **Dispatch**: [`dispatcher::Dispatcher`] selects a
//!   [`dispatcher::Strategy`] and produces a [`domain::intervention::Intervention`]
//!   that never contains a directly runnable solution.
//! - **Trace**: [`domain::trace::Trace`] and [`domain::trace::TraceSequence`]
//!   record every inbound/outbound exchange across four levels of detail.
//! - **Risk**: [`risk::RiskRuleRegistry`] scans a session's trace window for
//!   signs of cognitive over-reliance, policy violations, or unsafe patterns.
//!
//! ## Quick Start
//!
//! ```
//! use tutor_gateway::domain::{PolicyId, Session};
//! use tutor_gateway::types::SessionMode;
//!
//! let session = Session::new(
//!     "student-42",
//!     "activity-7",
//!     SessionMode::Tutor,
//!     Some("graph-traversal".to_string()),
//!     PolicyId::new(),
//! );
//! assert!(session.is_active());
//! ```
//!
//! ## Module Guide
//!
//! - [`domain`] - Core entities: sessions, traces, risks, policies, interventions
//! - [`types`] - Closed wire vocabulary shared across the whole crate
//! - [`classifier`] - CRPE prompt classification
//! - [`governance`] - Policy enforcement and PII sanitation
//! - [`dispatcher`] - Pedagogical strategy selection and response generation
//! - [`llm`] - LLM provider abstraction, retrying, and semantic caching
//! - [`risk`] - Over-reliance and policy-violation risk detection
//! - [`repo`] - Persistence traits and their in-memory / SQLite implementations
//! - [`gateway`] - The orchestrator tying every stage together per interaction
//! - [`http`] - The axum HTTP surface
//! - [`config`] - Environment-driven configuration and startup validation
//! - [`error`] - The crate-wide error type and its HTTP mapping
//! - [`event_bus`] - Cross-cutting pipeline event broadcasting
//! - [`channels`] - Structured error events used by the event bus and telemetry
//! - [`telemetry`] - Console formatting for events and error chains

pub mod channels;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod gateway;
pub mod governance;
pub mod http;
pub mod llm;
pub mod repo;
pub mod risk;
pub mod telemetry;
pub mod types;
