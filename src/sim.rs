//! Driving a clocked cpu8 processor model.
//!
//! This module is focused on running an assembled [`Program`] on a processor model
//! and reading back the contents of its data memory.
//!
//! This module consists of:
//! - [`Simulator`]: The struct that drives a model through a session.
//! - [`model`]: The module defining the pin interface of a model ([`ProcessorModel`]).
//! - [`bus`]: The module holding a bus-functional model of the cpu8.
//! - [`mem`]: The module handling memory of the bus-functional model.
//! - [`wave`]: The module handling waveform capture.
//!
//! # Usage
//!
//! To run a program, instantiate a Simulator around a model and execute the program:
//!
//! ```
//! use cpu8_ensemble::asm::Program;
//! use cpu8_ensemble::sim::Simulator;
//! use cpu8_ensemble::sim::bus::BusModel;
//!
//! let program = Program::from_words(vec![0x13, 0xEC, 0xF4]);
//!
//! let mut simulator = Simulator::new(BusModel::default(), Default::default());
//! let trace = simulator.execute(&program).unwrap();
//!
//! for entry in trace.entries() {
//!     println!("{entry}"); // Cycle 0 DataMemOut=0x..
//! }
//! ```
//!
//! ## Sessions
//!
//! A session runs the following phases, strictly in order, each at most once:
//! 1. **Reset**: the processor and program memory are reset while the processor is halted (service mode).
//! 2. **Load**: each word of the program is written into program memory at its address.
//! 3. **Run**: the processor leaves service mode and runs for [`SimFlags::run_cycles`] clock periods.
//! 4. **Readback**: the processor is halted again and the first [`SimFlags::readback_cycles`]
//!     words of data memory are read out into a [`Trace`].
//!
//! [`Simulator::execute`] runs all of the phases.
//! They can also be called individually ([`Simulator::reset`], [`Simulator::load`],
//! [`Simulator::run`], [`Simulator::readback`]); calling one out of order is an error.
//!
//! Every clock period evaluates the model on both edges:
//! the clock is raised and the model is evaluated, then the clock is lowered and the model
//! is evaluated again. Each evaluation advances the simulation time by one.
//!
//! ## Readback timing
//!
//! During Readback, each cycle runs one clock period, *then* sets the data memory address
//! for that cycle, *then* records the data memory output from the most recent evaluation.
//! Since the model has not been evaluated with the new address yet,
//! the value recorded for cycle `i` is the word at the address set in cycle `i - 1`
//! (for cycle 0, it is whichever address was present before Readback).
//!
//! ## Failure
//!
//! Any failure of the model while it is being evaluated is fatal.
//! The session moves to [`Phase::Failed`], the model and waveform are closed,
//! and a [`SimErr::Fatal`] is returned.
//! The model and waveform are also closed when a session completes or when the simulator is dropped.

pub mod bus;
pub mod mem;
pub mod model;
pub mod wave;

use serde::{Deserialize, Serialize};

use crate::asm::Program;
use self::model::{InputPins, ModelErr, OutputPins, ProcessorModel};
use self::wave::{Sample, Waveform};

/// The phases of a simulation session.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum Phase {
    /// No phase has run yet.
    #[default]
    Idle,
    /// Processor and program memory reset.
    Reset,
    /// Program loading.
    Load,
    /// Free-running execution.
    Run,
    /// Data memory readback.
    Readback,
    /// The session completed.
    Done,
    /// The session hit a fatal error.
    Failed,
}
impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle     => f.write_str("idle"),
            Phase::Reset    => f.write_str("reset"),
            Phase::Load     => f.write_str("load"),
            Phase::Run      => f.write_str("run"),
            Phase::Readback => f.write_str("readback"),
            Phase::Done     => f.write_str("done"),
            Phase::Failed   => f.write_str("failed"),
        }
    }
}

/// Errors that can occur during simulation.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum SimErr {
    /// The model failed while being evaluated. The session cannot continue.
    #[error("simulation failed in {phase} phase at time {time}: {source}")]
    Fatal {
        /// The phase the failure occurred in.
        phase: Phase,
        /// The simulation time of the failing evaluation.
        time: u64,
        /// The model's error.
        source: ModelErr
    },
    /// The model did not signal that it finished within the evaluation limit.
    #[error("model did not finish within {limit} evaluations")]
    NoFinish {
        /// The evaluation limit.
        limit: u64
    },
    /// A phase was called out of order.
    #[error("expected session to be in {expected} phase, but it was in {found} phase")]
    PhaseOrder {
        /// The phase the session has to be in.
        expected: Phase,
        /// The phase the session was in.
        found: Phase
    },
    /// The program does not fit in the program memory address space.
    #[error("program has {len} words, which does not fit in the program address space")]
    ProgramTooLarge {
        /// The number of words in the program.
        len: usize
    },
}

/// Configuration flags for [`Simulator`].
///
/// These can be modified after the `Simulator` is created with [`Simulator::new`]
/// and their effects apply to any phase which has not yet run.
///
/// These can also be loaded from any `serde` format.
/// Missing fields take their default values:
/// ```
/// use cpu8_ensemble::sim::SimFlags;
///
/// let flags: SimFlags = serde_json::from_str(r#"{ "run_cycles": 64 }"#).unwrap();
/// assert_eq!(flags, SimFlags { run_cycles: 64, ..Default::default() });
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SimFlags {
    /// The number of clock periods the Run phase lasts.
    ///
    /// By default, this is 256.
    pub run_cycles: u32,

    /// The number of data memory words read out in the Readback phase.
    ///
    /// By default, this is 16.
    pub readback_cycles: u16,

    /// The maximum number of evaluations [`Simulator::run_until_finish`] performs
    /// before giving up.
    ///
    /// By default, this is 1,000,000.
    pub finish_limit: u64,
}
impl Default for SimFlags {
    fn default() -> Self {
        Self {
            run_cycles: 256,
            readback_cycles: 16,
            finish_limit: 1_000_000,
        }
    }
}

/// One observation of the Readback phase.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
pub struct TraceEntry {
    /// The readback cycle.
    pub cycle: u16,
    /// The data memory output recorded in that cycle.
    pub value: u8,
}
impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cycle {} DataMemOut=0x{:x}", self.cycle, self.value)
    }
}

/// The observations of the Readback phase, in cycle order.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Trace(Vec<TraceEntry>);
impl Trace {
    /// The entries of this trace.
    pub fn entries(&self) -> &[TraceEntry] {
        &self.0
    }
    /// The recorded values, in cycle order.
    pub fn values(&self) -> impl Iterator<Item=u8> + '_ {
        self.0.iter().map(|e| e.value)
    }
    /// The number of entries in this trace.
    pub fn len(&self) -> usize {
        self.0.len()
    }
    /// Whether this trace has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl std::fmt::Display for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.0 {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Drives a processor model through a simulation session.
///
/// The simulator exclusively owns its model (and waveform, if one is attached).
/// Both are closed exactly once: when the session completes, when it fails,
/// or when the simulator is dropped, whichever comes first.
pub struct Simulator<M: ProcessorModel> {
    model: M,
    waveform: Option<Box<dyn Waveform>>,
    model_open: bool,

    phase: Phase,
    pins: InputPins,
    outputs: OutputPins,

    /// Simulation time, in evaluations (edges).
    time: u64,
    /// Completed clock periods.
    cycles: u64,

    /// Configuration settings for the simulator.
    ///
    /// See [`SimFlags`] for more details on what configuration
    /// settings are available.
    pub flags: SimFlags,
}

impl<M: ProcessorModel> Simulator<M> {
    /// Creates a new simulator around an opened model.
    pub fn new(model: M, flags: SimFlags) -> Self {
        Self {
            model,
            waveform: None,
            model_open: true,
            phase: Phase::Idle,
            pins: InputPins::default(),
            outputs: OutputPins::default(),
            time: 0,
            cycles: 0,
            flags,
        }
    }

    /// Attaches a waveform sink, which receives a [`Sample`] after every evaluation.
    pub fn with_waveform(mut self, waveform: impl Waveform + 'static) -> Self {
        self.waveform = Some(Box::new(waveform));
        self
    }

    /// The model this simulator drives.
    pub fn model(&self) -> &M {
        &self.model
    }
    /// The current phase of the session.
    pub fn phase(&self) -> Phase {
        self.phase
    }
    /// The current simulation time (the number of evaluations so far).
    pub fn time(&self) -> u64 {
        self.time
    }
    /// The number of completed clock periods.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
    /// The current values of the input pins.
    pub fn pins(&self) -> &InputPins {
        &self.pins
    }
    /// The output pins from the most recent evaluation.
    pub fn outputs(&self) -> &OutputPins {
        &self.outputs
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), SimErr> {
        match self.phase == expected {
            true  => Ok(()),
            false => Err(SimErr::PhaseOrder { expected, found: self.phase }),
        }
    }
    fn enter(&mut self, phase: Phase) {
        tracing::debug!(%phase, cycle = self.cycles, time = self.time, "entering phase");
        self.phase = phase;
    }

    /// Releases the model and waveform, if they are still open.
    fn close(&mut self) {
        if std::mem::take(&mut self.model_open) {
            self.model.close();
        }
        if let Some(mut waveform) = self.waveform.take() {
            waveform.close();
        }
    }

    /// Moves the session to [`Phase::Failed`], releasing everything.
    fn fail(&mut self, err: SimErr) -> SimErr {
        tracing::error!(phase = %self.phase, time = self.time, error = %err, "fatal simulation failure");
        self.phase = Phase::Failed;
        self.close();
        err
    }

    /// Evaluates the model with the current pins, then advances time.
    fn eval(&mut self) -> Result<(), SimErr> {
        match self.model.eval(&self.pins) {
            Ok(outputs) => {
                self.outputs = outputs;
                if let Some(waveform) = &mut self.waveform {
                    waveform.dump(&Sample { time: self.time, inputs: self.pins, outputs });
                }
                self.time += 1;
                Ok(())
            },
            Err(source) => {
                let err = SimErr::Fatal { phase: self.phase, time: self.time, source };
                Err(self.fail(err))
            }
        }
    }

    /// Runs one clock period: a rising and a falling edge.
    fn tick(&mut self) -> Result<(), SimErr> {
        self.pins.clock = true;
        self.eval()?;
        self.pins.clock = false;
        self.eval()?;

        self.cycles += 1;
        Ok(())
    }

    /// Resets the processor and clears program memory.
    ///
    /// This must be the first phase of the session.
    pub fn reset(&mut self) -> Result<(), SimErr> {
        self.expect_phase(Phase::Idle)?;
        self.enter(Phase::Reset);

        self.pins.reset = true;
        self.pins.service_mode = true;
        self.pins.program_memory_reset = true;
        self.pins.program_memory_write_enable = false;
        self.tick()?;

        self.pins.reset = false;
        self.pins.program_memory_reset = false;
        Ok(())
    }

    /// Writes each word of the program into program memory at its address,
    /// one word per clock period.
    ///
    /// This must follow [`Simulator::reset`].
    pub fn load(&mut self, program: &Program) -> Result<(), SimErr> {
        self.expect_phase(Phase::Reset)?;
        if program.len() > usize::from(u16::MAX) + 1 {
            return Err(SimErr::ProgramTooLarge { len: program.len() });
        }
        self.enter(Phase::Load);

        for (address, &word) in (0..=u16::MAX).zip(program.words()) {
            tracing::trace!(address, word, "loading word");
            self.pins.program_memory_address = address;
            self.pins.program_memory_data_in = word;
            self.pins.program_memory_write_enable = true;
            self.tick()?;
        }

        self.pins.program_memory_write_enable = false;
        Ok(())
    }

    /// Releases the processor from service mode and runs it for [`SimFlags::run_cycles`] clock periods.
    ///
    /// This must follow [`Simulator::load`].
    pub fn run(&mut self) -> Result<(), SimErr> {
        self.expect_phase(Phase::Load)?;
        self.enter(Phase::Run);

        self.pins.service_mode = false;
        for _ in 0..self.flags.run_cycles {
            self.tick()?;
        }
        Ok(())
    }

    /// Halts the processor and reads out the first [`SimFlags::readback_cycles`] words of data memory.
    ///
    /// This must follow [`Simulator::run`]. It completes the session,
    /// closing the model and waveform.
    ///
    /// See the [module-level documentation](crate::sim#readback-timing) for the timing of each entry.
    pub fn readback(&mut self) -> Result<Trace, SimErr> {
        self.expect_phase(Phase::Run)?;
        self.enter(Phase::Readback);

        self.pins.service_mode = true;
        let mut entries = Vec::with_capacity(usize::from(self.flags.readback_cycles));
        for cycle in 0..self.flags.readback_cycles {
            self.tick()?;
            self.pins.data_memory_address = cycle;
            entries.push(TraceEntry { cycle, value: self.outputs.data_memory_data_out });
        }

        self.enter(Phase::Done);
        self.close();
        Ok(Trace(entries))
    }

    /// Runs a full session with the given program: reset, load, run, and readback.
    ///
    /// ```
    /// use cpu8_ensemble::asm::Program;
    /// use cpu8_ensemble::sim::{Simulator, SimFlags, Phase};
    /// use cpu8_ensemble::sim::bus::BusModel;
    ///
    /// let flags = SimFlags { run_cycles: 8, readback_cycles: 4, ..Default::default() };
    /// let mut sim = Simulator::new(BusModel::default(), flags);
    /// let trace = sim.execute(&Program::from_words(vec![0x13])).unwrap();
    ///
    /// assert_eq!(trace.len(), 4);
    /// assert_eq!(sim.phase(), Phase::Done);
    /// assert_eq!(sim.model().program_mem().get(0), 0x13);
    /// assert_eq!(sim.model().run_edges(), 8);
    /// ```
    pub fn execute(&mut self, program: &Program) -> Result<Trace, SimErr> {
        self.reset()?;
        self.load(program)?;
        self.run()?;
        self.readback()
    }

    /// Evaluates the model with the current pins, advancing time by one per evaluation,
    /// until the model signals that it has finished.
    ///
    /// This is used for self-checking models which drive themselves (e.g., a testbench with its own clock),
    /// and must be the only phase of the session.
    /// This returns the number of evaluations performed.
    ///
    /// If the model does not finish within [`SimFlags::finish_limit`] evaluations,
    /// the session fails with [`SimErr::NoFinish`].
    pub fn run_until_finish(&mut self) -> Result<u64, SimErr> {
        self.expect_phase(Phase::Idle)?;
        self.enter(Phase::Run);

        let limit = self.flags.finish_limit;
        let start = self.time;
        while !self.model.finished() {
            if self.time - start >= limit {
                return Err(self.fail(SimErr::NoFinish { limit }));
            }
            self.eval()?;
        }

        self.enter(Phase::Done);
        self.close();
        Ok(self.time - start)
    }
}
impl<M: ProcessorModel> Drop for Simulator<M> {
    fn drop(&mut self) {
        self.close();
    }
}
impl<M: ProcessorModel + std::fmt::Debug> std::fmt::Debug for Simulator<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("model", &self.model)
            .field("model_open", &self.model_open)
            .field("phase", &self.phase)
            .field("pins", &self.pins)
            .field("outputs", &self.outputs)
            .field("time", &self.time)
            .field("cycles", &self.cycles)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
