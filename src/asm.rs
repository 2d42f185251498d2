//! Assembling cpu8 source lines into programs.
//!
//! This module is used to convert source text into a [`Program`]
//! that can be loaded into a processor model by the simulator.
//!
//! The assembler module notably consists of:
//! - [`assemble_line`]: assembles one line into one instruction word.
//! - [`assemble`] and [`assemble_lines`]: assemble a batch of lines into a [`Program`],
//!     collecting a report for every line that failed.
//! - [`encoding`]: the packing of instructions into words.
//!
//! # Failing lines
//!
//! A line that fails to assemble never aborts a batch.
//! It is reported in [`Assembly::errors`] and handled according to [`AsmFlags::on_error`]:
//! - [`OnError::Skip`] (default): the line contributes no word,
//!     so every later instruction moves down one address.
//! - [`OnError::Placeholder`]: the line contributes a `NOP`,
//!     so every instruction keeps the address of its line position.

pub mod encoding;

use std::borrow::Cow;
use std::fmt::Write as _;

use serde::Deserialize;

use crate::ast::Instr;
use crate::err::{ErrSpan, Error as _, LexErr};
use crate::parse::lex::Mnemonic;
use crate::parse::parse_line;
use encoding::NOP_WORD;

/// Assembles a single source line into an instruction word.
///
/// # Example
/// ```
/// use cpu8_ensemble::asm::assemble_line;
///
/// assert_eq!(assemble_line("ADDI 0 0 3").unwrap(), 0x13);
/// assert_eq!(assemble_line("MOV1 6").unwrap(), 0xEC);
/// assert_eq!(assemble_line("NOP").unwrap(), 0x00);
/// assert!(assemble_line("FOO 1 2").is_err());
/// ```
pub fn assemble_line(line: &str) -> Result<u8, AsmErr> {
    parse_line(line).map(|instr| instr.encode())
}

/// Assembles source text (one instruction per line) into a program.
///
/// See [`assemble_lines`] for details.
///
/// # Example
/// ```
/// use cpu8_ensemble::asm::{assemble, AsmFlags};
///
/// let src = "\
///     ADDI 0 0 3
///     FOO 1 2
///     MOV1 6";
/// let assembly = assemble(src, AsmFlags::default());
/// assert_eq!(assembly.program.words(), &[0x13, 0xEC]);
///
/// // The failing line is reported with its line index:
/// assert_eq!(assembly.errors.len(), 1);
/// assert_eq!(assembly.errors[0].lno, Some(1));
/// ```
pub fn assemble(src: &str, flags: AsmFlags) -> Assembly {
    assemble_lines(src.lines(), flags)
}

/// Assembles a sequence of lines into a program.
///
/// Each line is assembled independently. A line which fails to assemble
/// is reported in [`Assembly::errors`] (with its line index set) and is
/// otherwise handled according to `flags.on_error`.
///
/// A line consisting only of whitespace has no mnemonic, so it fails
/// as an [`AsmErrKind::UnknownInstruction`] like any other unknown line.
pub fn assemble_lines<I, S>(lines: I, flags: AsmFlags) -> Assembly
    where I: IntoIterator<Item=S>,
          S: AsRef<str>
{
    let mut program = Program::default();
    let mut errors = vec![];

    for (lno, line) in lines.into_iter().enumerate() {
        match assemble_line(line.as_ref()) {
            Ok(word) => program.push(word, Some(lno)),
            Err(mut e) => {
                e.lno = Some(lno);
                match flags.on_error {
                    OnError::Skip => {
                        tracing::warn!(line = lno, error = %e, "skipping line that failed to assemble");
                    },
                    OnError::Placeholder => {
                        tracing::warn!(line = lno, error = %e, "replacing line that failed to assemble with NOP");
                        program.push(NOP_WORD, None);
                    },
                }
                errors.push(e);
            }
        }
    }

    tracing::debug!(words = program.len(), errors = errors.len(), "assembled program");
    Assembly { program, errors }
}

/// What to do with a line which fails to assemble.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default, Deserialize)]
pub enum OnError {
    /// Emit nothing for the line. Later instructions shift down one address.
    #[default]
    Skip,
    /// Emit a `NOP` for the line, keeping later instructions at their line position.
    Placeholder,
}

/// Configuration flags for the assembler.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct AsmFlags {
    /// How lines which fail to assemble affect the program.
    ///
    /// By default, this is [`OnError::Skip`].
    pub on_error: OnError,
}

/// Reasons the operands of an instruction could not be read.
#[derive(Debug, PartialEq, Eq, Hash, Clone, thiserror::Error)]
pub enum OperandErr {
    /// The number of operands did not match the mnemonic.
    #[error("expected {expected} operand(s), found {found}")]
    Count {
        /// The number of operands the mnemonic takes.
        expected: usize,
        /// The number of operands on the line.
        found: usize,
    },
    /// An operand was a name rather than an integer.
    #[error("expected integer operand, found {token:?}")]
    NotInteger {
        /// The offending operand.
        token: String
    },
    /// An operand could not be tokenized.
    #[error(transparent)]
    Lex(#[from] LexErr),
}

/// Kinds of errors that can occur from assembling a source line.
///
/// See [`AsmErr`] for this error type with source information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone, thiserror::Error)]
pub enum AsmErrKind {
    /// The mnemonic is not in the mnemonic table.
    #[error("unknown instruction {mnemonic:?}")]
    UnknownInstruction {
        /// The mnemonic as it was written.
        mnemonic: String
    },
    /// The operands do not match what the mnemonic expects.
    #[error("malformed operands for {mnemonic}: {reason}")]
    MalformedOperands {
        /// The mnemonic of the line.
        mnemonic: Mnemonic,
        /// Why the operands could not be read.
        reason: OperandErr
    },
}

/// Error from assembling a source line.
#[derive(Debug, PartialEq, Eq, Hash, Clone, thiserror::Error)]
#[error("{kind}")]
pub struct AsmErr {
    /// The kind of error.
    pub kind: AsmErrKind,
    /// The columns of the line associated with this error.
    pub span: ErrSpan,
    /// The source line.
    pub line: String,
    /// The index of the line in its batch, if assembled as part of a batch.
    pub lno: Option<usize>,
}
impl AsmErr {
    /// Creates a new [`AsmErr`] for a line outside of any batch.
    pub fn new(kind: AsmErrKind, span: ErrSpan, line: &str) -> Self {
        AsmErr { kind, span, line: line.to_string(), lno: None }
    }

    /// Renders this error as a multi-line diagnostic, pointing at the offending columns.
    ///
    /// ```
    /// use cpu8_ensemble::asm::assemble_line;
    ///
    /// let err = assemble_line("FOO 1 2").unwrap_err();
    /// assert_eq!(err.report(), "\
    /// error: unknown instruction \"FOO\"
    ///   | FOO 1 2
    ///   | ^^^
    /// help: valid instructions are ADD, ADDI, SUB, SUBI, AND, OR, XOR, NOT, LSL, LSR, LDUR, STOR, CMP, B, MOV1, MOV2, NOP
    /// ");
    /// ```
    pub fn report(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = match self.lno {
            Some(lno) => writeln!(out, "error (line {lno}): {self}"),
            None      => writeln!(out, "error: {self}"),
        };
        let _ = writeln!(out, "  | {}", self.line);

        let start = self.line.get(..self.span.start).map_or(0, |s| s.chars().count());
        let len = self.line.get(self.span.clone()).map_or(0, |s| s.chars().count()).max(1);
        let _ = writeln!(out, "  | {}{}", " ".repeat(start), "^".repeat(len));

        if let Some(help) = self.help() {
            let _ = writeln!(out, "help: {help}");
        }
        out
    }
}
impl crate::err::Error for AsmErr {
    fn span(&self) -> Option<ErrSpan> {
        Some(self.span.clone())
    }

    fn help(&self) -> Option<Cow<'_, str>> {
        match &self.kind {
            AsmErrKind::UnknownInstruction { .. } => {
                let names: Vec<_> = Mnemonic::ALL.iter().map(|m| m.name()).collect();
                Some(format!("valid instructions are {}", names.join(", ")).into())
            },
            AsmErrKind::MalformedOperands { mnemonic, reason } => match reason {
                OperandErr::Count { .. } => {
                    let names = mnemonic.shape().operand_names();
                    match names {
                        [] => Some(format!("{mnemonic} takes no operands").into()),
                        _  => Some(format!("{mnemonic} takes {} operand(s): {}", names.len(), names.join(" ")).into()),
                    }
                },
                OperandErr::NotInteger { .. } => Some("operands are decimal integers (registers are written without a prefix)".into()),
                OperandErr::Lex(e) => e.help(),
            },
        }
    }
}

/// The result of assembling a batch of lines.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// The assembled program.
    pub program: Program,
    /// Every line which failed to assemble, in line order.
    pub errors: Vec<AsmErr>,
}
impl Assembly {
    /// Whether every line assembled successfully.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// An assembled program.
///
/// A program is a sequence of instruction words, where the index of a word is its address.
///
/// Alongside the words, the program keeps a mapping from each address
/// to the source line that produced it (if any):
///
/// ```
/// use cpu8_ensemble::asm::{assemble, AsmFlags, OnError};
///
/// let src = "ADDI 0 0 3\nFOO\nMOV1 6";
///
/// let skipped = assemble(src, AsmFlags { on_error: OnError::Skip }).program;
/// assert_eq!(skipped.source_line(1), Some(2));
/// assert_eq!(skipped.address_of_line(2), Some(1));
///
/// let aligned = assemble(src, AsmFlags { on_error: OnError::Placeholder }).program;
/// assert_eq!(aligned.source_line(1), None); // placeholder
/// assert_eq!(aligned.address_of_line(2), Some(2));
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct Program {
    words: Vec<u8>,
    lines: Vec<Option<usize>>,
}
impl Program {
    /// Creates a program from raw instruction words, without any source line information.
    pub fn from_words(words: Vec<u8>) -> Self {
        let lines = vec![None; words.len()];
        Self { words, lines }
    }

    fn push(&mut self, word: u8, line: Option<usize>) {
        self.words.push(word);
        self.lines.push(line);
    }

    /// The instruction words of this program, indexed by address.
    pub fn words(&self) -> &[u8] {
        &self.words
    }

    /// The number of words in this program.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether this program has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Gets the word at the given address.
    pub fn get(&self, addr: usize) -> Option<u8> {
        self.words.get(addr).copied()
    }

    /// Gets the source line index the word at the given address was assembled from.
    ///
    /// This is `None` if the address is out of range or the word was not assembled from a line
    /// (e.g., a placeholder `NOP` or a program created with [`Program::from_words`]).
    pub fn source_line(&self, addr: usize) -> Option<usize> {
        self.lines.get(addr).copied().flatten()
    }

    /// Gets the address of the word assembled from the given source line index, if there is one.
    pub fn address_of_line(&self, lno: usize) -> Option<usize> {
        self.lines.iter()
            .enumerate()
            .filter_map(|(addr, l)| Some((addr, (*l)?)))
            .find(|&(_, l)| l == lno)
            .map(|(addr, _)| addr)
    }

    /// Decodes every word of the program.
    pub fn instrs(&self) -> impl Iterator<Item=Instr> + '_ {
        self.words.iter().map(|&w| Instr::decode(w))
    }
}
impl std::fmt::Display for Program {
    /// Writes a listing of the program: address, word, and disassembly.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (addr, (&word, instr)) in self.words.iter().zip(self.instrs()).enumerate() {
            writeln!(f, "{addr:02X}: {word:02X}  {instr}")?;
        }
        Ok(())
    }
}
