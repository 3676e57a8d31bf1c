//! Abstraction traits used by the data link: the raw bit transport underneath
//! and the async frame bus exposed above.
pub mod bit_transport;
pub mod can_bus;
