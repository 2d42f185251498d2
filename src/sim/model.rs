//! The interface between the simulation driver and a clocked processor model.
//!
//! The driver talks to a model only through its pins:
//! it sets [`InputPins`], asks the model to evaluate them,
//! and observes the resulting [`OutputPins`].
//!
//! Any model can be driven as long as it implements [`ProcessorModel`].
//! This crate provides a bus-functional model in [`super::bus`].

/// The input pins of a cpu8 processor model.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default, serde::Serialize)]
pub struct InputPins {
    /// The clock line.
    pub clock: bool,
    /// The processor reset line.
    pub reset: bool,
    /// When high, the processor is halted and its memories are accessible from outside.
    pub service_mode: bool,
    /// Clears program memory.
    pub program_memory_reset: bool,
    /// Enables writes on the program memory write bus.
    pub program_memory_write_enable: bool,
    /// Program memory write address.
    pub program_memory_address: u16,
    /// Program memory write data.
    pub program_memory_data_in: u8,
    /// Data memory read address.
    pub data_memory_address: u16,
}

/// The output pins of a cpu8 processor model.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default, serde::Serialize)]
pub struct OutputPins {
    /// The data memory read port.
    pub data_memory_data_out: u8,
}

/// Errors a processor model can raise while being evaluated.
#[derive(Debug, PartialEq, Eq, Hash, Clone, thiserror::Error)]
pub enum ModelErr {
    /// The model was evaluated after it was closed.
    #[error("model is closed")]
    Closed,
    /// The model was evaluated after it finished.
    #[error("model has already finished")]
    Exhausted,
    /// The model failed internally.
    #[error("model fault: {0}")]
    Fault(String),
}

/// A clocked processor model which can be driven by the [`Simulator`].
///
/// A model is opened by constructing it and is released with [`ProcessorModel::close`].
/// The simulator calls `close` exactly once, even on failure.
///
/// [`Simulator`]: super::Simulator
pub trait ProcessorModel {
    /// Evaluates the model with the given pin values, returning the resulting outputs.
    ///
    /// Models are edge-sensitive: a rising clock edge is an evaluation
    /// where `clock` is high and the previous evaluation had `clock` low.
    fn eval(&mut self, pins: &InputPins) -> Result<OutputPins, ModelErr>;

    /// Whether the model has signalled that it has finished.
    fn finished(&self) -> bool;

    /// Releases the model. Later evaluations should fail with [`ModelErr::Closed`].
    fn close(&mut self);
}
impl dyn ProcessorModel {} // assert ProcessorModel is dyn safe

impl<M: ProcessorModel + ?Sized> ProcessorModel for &mut M {
    fn eval(&mut self, pins: &InputPins) -> Result<OutputPins, ModelErr> {
        (**self).eval(pins)
    }

    fn finished(&self) -> bool {
        (**self).finished()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
impl<M: ProcessorModel + ?Sized> ProcessorModel for Box<M> {
    fn eval(&mut self, pins: &InputPins) -> Result<OutputPins, ModelErr> {
        (**self).eval(pins)
    }

    fn finished(&self) -> bool {
        (**self).finished()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
