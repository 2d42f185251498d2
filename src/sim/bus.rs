//! A bus-functional model of the cpu8 memory interface.
//!
//! [`BusModel`] implements the pin-level behavior of the cpu8's program and data memories
//! that the simulation driver relies on, without executing any instructions:
//! - On a rising clock edge in service mode, a write-enabled program memory bus writes its word.
//! - While `program_memory_reset` is high, program memory is cleared on each rising edge.
//! - The data memory read port is combinational: its output follows `data_memory_address`
//!     in the same evaluation.
//! - Rising edges outside of service mode are counted as run cycles.
//!
//! It can also be configured to finish or fault after a number of evaluations,
//! which is useful for exercising [`Simulator::run_until_finish`] and the failure path.
//!
//! [`Simulator::run_until_finish`]: super::Simulator::run_until_finish

use super::mem::{MachineInitStrategy, Mem};
use super::model::{InputPins, ModelErr, OutputPins, ProcessorModel};

/// A bus-functional model of the cpu8.
///
/// ```
/// use cpu8_ensemble::sim::bus::BusModel;
/// use cpu8_ensemble::sim::mem::MachineInitStrategy;
/// use cpu8_ensemble::sim::model::{InputPins, ProcessorModel};
///
/// let mut model = BusModel::new(MachineInitStrategy::Known { value: 0 });
/// model.data_mem_mut().set(3, 0x2A);
///
/// let out = model.eval(&InputPins { data_memory_address: 3, ..Default::default() }).unwrap();
/// assert_eq!(out.data_memory_data_out, 0x2A);
/// ```
#[derive(Debug)]
pub struct BusModel {
    program_mem: Mem,
    data_mem: Mem,

    last_clock: bool,
    evals: u64,
    program_writes: u64,
    run_edges: u64,
    closes: u32,

    finish_after: Option<u64>,
    fault_after: Option<u64>,
}

impl BusModel {
    /// Creates a new model, initializing both memories with the given strategy.
    pub fn new(init: MachineInitStrategy) -> Self {
        let mut filler = init.generator();
        Self {
            program_mem: Mem::new(&mut filler),
            data_mem: Mem::new(&mut filler),
            last_clock: false,
            evals: 0,
            program_writes: 0,
            run_edges: 0,
            closes: 0,
            finish_after: None,
            fault_after: None,
        }
    }

    /// Configures the model to report that it has finished after `n` evaluations.
    pub fn finish_after(mut self, n: u64) -> Self {
        self.finish_after = Some(n);
        self
    }

    /// Configures the model to fail every evaluation after the first `n`.
    pub fn fault_after(mut self, n: u64) -> Self {
        self.fault_after = Some(n);
        self
    }

    /// The program memory.
    pub fn program_mem(&self) -> &Mem {
        &self.program_mem
    }
    /// The data memory.
    pub fn data_mem(&self) -> &Mem {
        &self.data_mem
    }
    /// The data memory, mutably. This can be used to preload data.
    pub fn data_mem_mut(&mut self) -> &mut Mem {
        &mut self.data_mem
    }

    /// The number of successful evaluations.
    pub fn evals(&self) -> u64 {
        self.evals
    }
    /// The number of words written into program memory.
    pub fn program_writes(&self) -> u64 {
        self.program_writes
    }
    /// The number of rising clock edges seen outside of service mode.
    pub fn run_edges(&self) -> u64 {
        self.run_edges
    }
    /// Whether the model has been closed.
    pub fn is_closed(&self) -> bool {
        self.closes > 0
    }
    /// The number of times [`ProcessorModel::close`] was called.
    pub fn close_count(&self) -> u32 {
        self.closes
    }
}
impl Default for BusModel {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl ProcessorModel for BusModel {
    fn eval(&mut self, pins: &InputPins) -> Result<OutputPins, ModelErr> {
        if self.is_closed() { return Err(ModelErr::Closed) };
        if self.finished() { return Err(ModelErr::Exhausted) };
        if let Some(n) = self.fault_after.filter(|&n| self.evals >= n) {
            return Err(ModelErr::Fault(format!("injected fault after {n} evaluations")));
        }

        let rising = pins.clock && !self.last_clock;
        self.last_clock = pins.clock;

        if rising {
            if pins.program_memory_reset {
                self.program_mem.clear();
            } else if pins.service_mode && pins.program_memory_write_enable {
                self.program_mem.set(pins.program_memory_address, pins.program_memory_data_in);
                self.program_writes += 1;
            }

            if pins.reset {
                self.run_edges = 0;
            } else if !pins.service_mode {
                self.run_edges += 1;
            }
        }

        self.evals += 1;
        Ok(OutputPins {
            data_memory_data_out: self.data_mem.get(pins.data_memory_address)
        })
    }

    fn finished(&self) -> bool {
        self.finish_after.is_some_and(|n| self.evals >= n)
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}

#[cfg(test)]
mod tests {
    use crate::sim::mem::MachineInitStrategy;
    use crate::sim::model::{InputPins, ModelErr, ProcessorModel};

    use super::BusModel;

    fn zeroed() -> BusModel {
        BusModel::new(MachineInitStrategy::Known { value: 0 })
    }
    fn tick(model: &mut BusModel, pins: &mut InputPins) {
        pins.clock = true;
        model.eval(pins).unwrap();
        pins.clock = false;
        model.eval(pins).unwrap();
    }

    #[test]
    fn test_program_write() {
        let mut model = zeroed();
        let mut pins = InputPins {
            service_mode: true,
            program_memory_write_enable: true,
            program_memory_address: 5,
            program_memory_data_in: 0x13,
            ..Default::default()
        };
        tick(&mut model, &mut pins);
        assert_eq!(model.program_mem().get(5), 0x13);
        assert_eq!(model.program_writes(), 1);

        // only rising edges write
        pins.program_memory_data_in = 0xEC;
        model.eval(&pins).unwrap();
        assert_eq!(model.program_mem().get(5), 0x13);

        // no writes outside of service mode
        pins.service_mode = false;
        tick(&mut model, &mut pins);
        assert_eq!(model.program_mem().get(5), 0x13);
        assert_eq!(model.program_writes(), 1);
    }

    #[test]
    fn test_program_reset() {
        let mut model = BusModel::new(MachineInitStrategy::Known { value: 0xFF });
        let mut pins = InputPins { service_mode: true, program_memory_reset: true, ..Default::default() };
        tick(&mut model, &mut pins);
        assert!(model.program_mem().as_slice().iter().all(|&w| w == 0));
        // data memory is untouched
        assert!(model.data_mem().as_slice().iter().all(|&w| w == 0xFF));
    }

    #[test]
    fn test_run_edges() {
        let mut model = zeroed();
        let mut pins = InputPins::default();
        for _ in 0..10 {
            tick(&mut model, &mut pins);
        }
        assert_eq!(model.run_edges(), 10);
        assert_eq!(model.evals(), 20);

        pins.service_mode = true;
        tick(&mut model, &mut pins);
        assert_eq!(model.run_edges(), 10);

        pins.service_mode = false;
        pins.reset = true;
        tick(&mut model, &mut pins);
        assert_eq!(model.run_edges(), 0);
    }

    #[test]
    fn test_combinational_read() {
        let mut model = zeroed();
        model.data_mem_mut().set(1, 0x0A);
        model.data_mem_mut().set(2, 0x0B);

        let mut pins = InputPins { data_memory_address: 1, ..Default::default() };
        assert_eq!(model.eval(&pins).unwrap().data_memory_data_out, 0x0A);
        pins.data_memory_address = 2;
        assert_eq!(model.eval(&pins).unwrap().data_memory_data_out, 0x0B);
    }

    #[test]
    fn test_finish_and_fault() {
        let mut model = zeroed().finish_after(3);
        let pins = InputPins::default();
        for _ in 0..3 {
            assert!(!model.finished());
            model.eval(&pins).unwrap();
        }
        assert!(model.finished());
        assert_eq!(model.eval(&pins), Err(ModelErr::Exhausted));

        let mut model = zeroed().fault_after(2);
        assert!(model.eval(&pins).is_ok());
        assert!(model.eval(&pins).is_ok());
        assert!(matches!(model.eval(&pins), Err(ModelErr::Fault(_))));
    }

    #[test]
    fn test_close() {
        let mut model = zeroed();
        assert!(!model.is_closed());
        model.close();
        assert!(model.is_closed());
        assert_eq!(model.close_count(), 1);
        assert_eq!(model.eval(&InputPins::default()), Err(ModelErr::Closed));
    }
}
