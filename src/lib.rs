//! An assembler and simulation driver for the cpu8, a small 8-bit processor.
//!
//! This is meant to be the host side of a cpu8 testbench:
//! mnemonic source goes in, packed instruction words are loaded into a clocked
//! processor model, and the contents of data memory come back out as a trace.
//!
//! # Usage
//!
//! To convert cpu8 source code into a program, it must be assembled:
//! ```
//! use cpu8_ensemble::asm::{assemble, AsmFlags};
//!
//! let code = "\
//!     ADDI 0 0 3
//!     MOV1 6
//!     MOV2 2";
//! let assembly = assemble(code, AsmFlags::default());
//! assert!(assembly.errors.is_empty());
//! assert_eq!(assembly.program.words(), &[0x13, 0xEC, 0xF4]);
//! ```
//!
//! Once a program has been created, it can be run against a processor model:
//! ```
//! # use cpu8_ensemble::asm::{assemble, AsmFlags};
//! # let assembly = assemble("ADDI 0 0 3\nSTOR 2 2", AsmFlags::default());
//! use cpu8_ensemble::sim::Simulator;
//! use cpu8_ensemble::sim::bus::BusModel;
//!
//! let model = BusModel::new(Default::default());
//! let mut simulator = Simulator::new(model, Default::default());
//! let trace = simulator.execute(&assembly.program).unwrap(); // <-- Result can be handled accordingly
//! assert_eq!(trace.len(), 16);
//! ```
//!
//! See the [`sim`] module for more details on the clocking protocol.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod asm;
pub mod sim;
pub mod err;
