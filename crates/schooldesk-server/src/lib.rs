//! `SchoolDesk` site API server.
//!
//! Serves the two JSON routes behind the marketing site: school lookup at
//! `GET /api/school/{schoolId}` and trial signup at `POST /api/trial/signup`,
//! plus `GET /api/health`. Both business routes proxy to the school store
//! defined in `schooldesk-store`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod projection;
pub mod routes;
pub mod state;
