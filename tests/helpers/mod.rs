/// Test doubles simulating the bit engine and a wired-AND bus during integration tests.
use korri_softcan::core::{CRC_BITS, DATA_BITS, ENCODED_HEADER_BITS, MAX_STUFFED_WORDS};
use korri_softcan::infra::codec::bits::BitStuffer;
use korri_softcan::protocol::link::notify::{Event, Notifier};
use korri_softcan::protocol::link::service::LinkService;
use korri_softcan::protocol::transport::can_frame::CanFrame;
use korri_softcan::protocol::transport::traits::bit_transport::BitTransport;

/// Recessive bits a transmitter waits for before SOF (ACK delimiter, EOF, intermission).
pub const BUS_IDLE_BITS: u32 = 11;

#[derive(Debug, Default)]
#[allow(dead_code)]
/// Bit engine double: remembers what the link asked for, the bus simulation acts on it.
pub struct SimTransport {
    /// Image of the last `start_transmit`.
    pub words: Vec<u32>,
    /// Number of `start_transmit` calls.
    pub starts: usize,
    /// A transmission is requested and not cancelled.
    pub active: bool,
    /// Pending ACK request.
    pub ack: Option<(u32, u32)>,
    pub stalled: bool,
    pub resets: usize,
    pub resyncs: usize,
}

impl BitTransport for SimTransport {
    fn start_transmit(&mut self, words: &[u32]) {
        self.words = words.to_vec();
        self.starts += 1;
        self.active = true;
    }

    fn cancel_transmit(&mut self) {
        self.active = false;
    }

    fn inject_ack(&mut self, pattern: u32, bit_position: u32) {
        self.ack = Some((pattern, bit_position));
    }

    fn cancel_ack(&mut self) {
        self.ack = None;
    }

    fn rx_stalled(&mut self) -> bool {
        self.stalled
    }

    fn reset(&mut self) {
        self.resets += 1;
    }

    fn resync(&mut self) {
        self.resyncs += 1;
    }
}

#[derive(Debug, Default)]
#[allow(dead_code)]
/// Notifier keeping every event.
pub struct EventLog {
    pub events: Vec<Event>,
}

impl Notifier for EventLog {
    fn notify(&mut self, event: Event) {
        self.events.push(event);
    }
}

#[allow(dead_code)]
pub type SimService<'q, const N: usize> = LinkService<'q, SimTransport, EventLog, N>;

#[derive(Debug, Default)]
/// Per-node line state kept by the simulation.
struct NodeLine {
    /// `starts` value of the image being driven.
    consumed: usize,
    /// Next image bit to drive.
    driving: Option<usize>,
    /// Line bits seen, newest lowest.
    history: u32,
    /// Line bits delivered so far.
    bit_index: u32,
}

#[allow(dead_code)]
/// Wired-AND bus connecting several nodes, advanced one bit time at a time.
pub struct SimBus<'s, 'q, const N: usize> {
    nodes: Vec<(&'s SimService<'q, N>, NodeLine)>,
    idle_run: u32,
    /// Every line bit, oldest first.
    pub line: Vec<u32>,
}

#[allow(dead_code)]
impl<'s, 'q, const N: usize> SimBus<'s, 'q, N> {
    pub fn new(services: &[&'s SimService<'q, N>]) -> Self {
        Self {
            nodes: services
                .iter()
                .map(|service| (*service, NodeLine::default()))
                .collect(),
            idle_run: 0,
            line: Vec::new(),
        }
    }

    /// Advance `count` bit times.
    pub fn run(&mut self, count: usize) {
        for _ in 0..count {
            self.step();
        }
    }

    fn step(&mut self) {
        let idle_run = self.idle_run;
        let mut driven = Vec::with_capacity(self.nodes.len());

        for (service, node) in self.nodes.iter_mut() {
            let (words, starts, active, ack) = service.with_engine(|engine| {
                let transport = engine.transport();
                (
                    transport.words.clone(),
                    transport.starts,
                    transport.active,
                    transport.ack,
                )
            });

            if !active {
                node.driving = None;
            } else if node.driving.is_none() && starts > node.consumed && idle_run >= BUS_IDLE_BITS {
                node.consumed = starts;
                node.driving = Some(0);
            }

            let mut bit = match node.driving {
                Some(pos) if pos < words.len() * 32 => (words[pos / 32] >> (31 - (pos % 32))) & 1,
                _ => 1,
            };
            if let Some((pattern, position)) = ack {
                let matched = node.history & 0x1F_FFFF == pattern;
                if matched && node.bit_index == position.wrapping_add(1) {
                    bit = 0;
                }
            }
            driven.push(bit);
        }

        let level = driven.iter().fold(1, |acc, bit| acc & bit);
        self.line.push(level);
        self.idle_run = if level == 1 { self.idle_run + 1 } else { 0 };

        for ((service, node), bit) in self.nodes.iter_mut().zip(driven) {
            service.on_rx_bits(level, 1);
            node.history = (node.history << 1) | level;
            node.bit_index = node.bit_index.wrapping_add(1);
            node.driving = match node.driving {
                // Recessive bit overwritten: arbitration lost or ACK slot.
                Some(_) if bit == 1 && level == 0 => None,
                Some(pos) => Some(pos + 1),
                None => None,
            };
        }
    }
}

#[allow(dead_code)]
/// Stuffed bits from SOF through the CRC delimiter, one entry per bit.
pub fn frame_image(frame: &CanFrame) -> Vec<u32> {
    let mut words = [0u32; MAX_STUFFED_WORDS];
    let mut stuffer = BitStuffer::new(&mut words);
    stuffer
        .push(frame.header(), ENCODED_HEADER_BITS)
        .expect("header fits");
    for byte in frame.data() {
        stuffer.push(*byte as u32, DATA_BITS).expect("payload fits");
    }
    let crc = stuffer.crc();
    stuffer.push(crc as u32, CRC_BITS).expect("crc fits");
    stuffer.push_raw(1, 1).expect("delimiter fits");
    let len = stuffer.bit_len();
    (0..len)
        .map(|i| (words[i / 32] >> (31 - (i % 32))) & 1)
        .collect()
}

#[allow(dead_code)]
/// Sampler bytes for a frame as seen on the line: image, ACK slot (dominant
/// when `acked`), then recessive bits up to the next byte boundary (at least eleven).
pub fn line_bytes(frame: &CanFrame, acked: bool) -> Vec<u8> {
    let mut bits = frame_image(frame);
    bits.push(if acked { 0 } else { 1 });
    bits.extend(std::iter::repeat(1).take(BUS_IDLE_BITS as usize));
    bits.chunks(8)
        .map(|chunk| {
            (0..8).fold(0u8, |byte, i| (byte << 1) | chunk.get(i).copied().unwrap_or(1) as u8)
        })
        .collect()
}
