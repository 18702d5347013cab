//! WebSocket transport: wire protocol, ingress sanitizing and the socket handler

pub mod handler;
pub mod ingress;
pub mod protocol;
