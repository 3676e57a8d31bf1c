//! CAN 2.0A data link in software: the frame type and transport traits, and
//! the link engine (parser, scheduler, notifications) built on them.
pub mod link;
pub mod transport;
