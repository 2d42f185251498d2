//! Memory handling for the bus-functional model.
//!
//! This module consists of:
//! - [`Mem`]: A cpu8 memory (256 bytes, addressed by the low byte of the address bus).
//! - [`MachineInitStrategy`]: How memory is filled at power-on.
//! - [`WordFiller`]: The source of power-on contents.

use rand::rngs::StdRng;
use rand::Rng;
use serde::Deserialize;

/// A source of bytes for a memory coming out of power-on.
///
/// [`Mem::new`] pulls one byte per address, in address order.
pub trait WordFiller {
    /// The byte for the next address.
    fn generate(&mut self) -> u8;
}
impl WordFiller for () {
    /// Thread-local randomness; differs between runs.
    fn generate(&mut self) -> u8 {
        rand::random()
    }
}
impl WordFiller for u8 {
    /// The same byte at every address.
    fn generate(&mut self) -> u8 {
        *self
    }
}
impl WordFiller for StdRng {
    /// Bytes drawn from the generator, so a seeded generator reproduces the same memory image.
    fn generate(&mut self) -> u8 {
        self.gen()
    }
}

/// What the program and data memories of a [`BusModel`] hold before anything writes them.
///
/// The Reset phase clears program memory, but data memory keeps its power-on bytes
/// until the program stores over them. Readback of an address the program never stored
/// to shows these bytes.
///
/// [`BusModel`]: super::bus::BusModel
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Deserialize)]
pub enum MachineInitStrategy {
    /// Random bytes, different on every model.
    #[default]
    Unseeded,

    /// Random bytes from a seeded generator. Two models with the same seed power on identically.
    Seeded {
        /// Generator seed.
        seed: u64
    },

    /// Every byte set to `value` (zero-filled memories use `0`).
    Known {
        /// The fill byte.
        value: u8
    }
}

impl MachineInitStrategy {
    /// A fresh filler for one memory.
    ///
    /// Each call starts over, so two fillers from the same `Seeded` strategy
    /// produce the same bytes.
    pub(super) fn generator(&self) -> impl WordFiller {
        use rand::SeedableRng;

        match *self {
            MachineInitStrategy::Unseeded => PowerOn::Noise,
            MachineInitStrategy::Seeded { seed } => PowerOn::Replay(Box::new(StdRng::seed_from_u64(seed))),
            MachineInitStrategy::Known { value } => PowerOn::Fill(value),
        }
    }
}

enum PowerOn {
    Noise,
    Replay(Box<StdRng>),
    Fill(u8)
}
impl WordFiller for PowerOn {
    fn generate(&mut self) -> u8 {
        match self {
            PowerOn::Noise     => ().generate(),
            PowerOn::Replay(r) => r.generate(),
            PowerOn::Fill(b)   => b.generate(),
        }
    }
}

const N: usize = 1 << 8;

/// A cpu8 memory.
///
/// This can be addressed with any `u16`. Only the low byte of the address
/// is decoded, so addresses alias every 256 words.
///
/// ```
/// use cpu8_ensemble::sim::mem::Mem;
///
/// let mut mem = Mem::new(&mut 0u8);
/// mem.set(0x10, 11);
/// assert_eq!(mem.get(0x10), 11);
/// assert_eq!(mem.get(0x110), 11);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Mem(Box<[u8; N]>);

impl Mem {
    /// The number of words in a memory.
    pub const SIZE: usize = N;

    /// Creates a new memory, filling it from the given filler.
    pub fn new(filler: &mut impl WordFiller) -> Self {
        let mut data = Box::new([0; N]);
        data.iter_mut().for_each(|w| *w = filler.generate());
        Self(data)
    }

    fn index(addr: u16) -> usize {
        usize::from(addr) % N
    }

    /// Reads the word at the given address.
    pub fn get(&self, addr: u16) -> u8 {
        self.0[Self::index(addr)]
    }

    /// Writes the word at the given address.
    pub fn set(&mut self, addr: u16, data: u8) {
        self.0[Self::index(addr)] = data;
    }

    /// Sets every word of the memory to zero.
    pub fn clear(&mut self) {
        self.0.fill(0);
    }

    /// Gets the whole memory as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }
}
