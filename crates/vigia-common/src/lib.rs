//! Domain types shared by storage and the HTTP server.

pub mod folio;
pub mod status;
pub mod types;
