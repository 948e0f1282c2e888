//! Outer adapters: CSV account files.

pub mod csv;
