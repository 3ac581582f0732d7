//! gRPC surface (spec §6 "gRPC surface. Unary methods mirror REST.").
//!
//! Unlike the rest of this crate, nothing in the reference workspace wires a
//! `tonic` service directly — `tonic`/`prost` only appear there transitively,
//! behind an `opentelemetry-otlp` exporter feature. This module is still
//! built because spec §6 requires a gRPC surface and the workspace already
//! depends on the full `tonic`/`prost`/`tonic-build` stack; see DESIGN.md.

pub mod service;

pub mod pb {
    tonic::include_proto!("navigant.v1");
}

pub use service::ControlPlaneService;
