//! Memory-management core for a dynamically typed interpreter.
//!
//! Values live in a reference-counted graph with owning and weak handles. A
//! mark-and-sweep collector over a registry of stable identities reclaims the
//! cycles that reference counting cannot. See [`runtime`] for the ownership
//! rules and [`runtime::vm::Vm`] for the entry point a dispatcher drives.
pub mod runtime;
