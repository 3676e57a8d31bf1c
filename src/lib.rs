//! `korri-softcan` library: a CAN 2.0A data-link layer implemented in software
//! on top of a raw bit transport (PIO/DMA style sampler) in a `no_std`
//! environment. The crate exposes the bit-level codecs (CRC-15, bit
//! (de)stuffing), the frame parser and transmit scheduler, and the
//! collaborator traits the hardware glue has to implement.
#![no_std]
//==================================================================================
/// Field widths and limits shared by the encoder and the frame parser.
pub mod core;
/// Frame construction and transmit queue errors.
pub mod error;
/// Bit-level codecs: CRC-15 and bit (de)stuffing.
pub mod infra;
/// Data-link protocol: frame type, transport traits, parser and scheduler.
pub mod protocol;
//==================================================================================
