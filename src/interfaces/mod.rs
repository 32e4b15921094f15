//! Inbound and outbound data formats for the command-line front end.

pub mod csv;
