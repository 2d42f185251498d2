//! Components relating to decoded cpu8 instructions.
//!
//! These components together are used to construct [`Instr`],
//! a data structure holding one instruction with its operand fields,
//! which sits between the parser and the encoder.

use std::fmt::Write as _;

use crate::parse::lex::Mnemonic;

/// A cpu8 opcode, which occupies the upper 4 bits of every instruction word.
///
/// | opcode | code   | shape        |
/// |--------|--------|--------------|
/// | `ADD`  | `0000` | [`Shape::Alu`]    |
/// | `ADDI` | `0001` | [`Shape::Alu`]    |
/// | `SUB`  | `0010` | [`Shape::Alu`]    |
/// | `SUBI` | `0011` | [`Shape::Alu`]    |
/// | `AND`  | `0100` | [`Shape::Alu`]    |
/// | `OR`   | `0101` | [`Shape::Alu`]    |
/// | `XOR`  | `0110` | [`Shape::Alu`]    |
/// | `NOT`  | `0111` | [`Shape::Alu`]    |
/// | `LSL`  | `1000` | [`Shape::Alu`]    |
/// | `LSR`  | `1001` | [`Shape::Alu`]    |
/// | `LDUR` | `1010` | [`Shape::Mem`]    |
/// | `STOR` | `1011` | [`Shape::Mem`]    |
/// | `CMP`  | `1100` | [`Shape::Cmp`]    |
/// | `B`    | `1101` | [`Shape::Branch`] |
/// | `MOV1` | `1110` | [`Shape::Mov`]    |
/// | `MOV2` | `1111` | [`Shape::Mov`]    |
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[repr(u8)]
pub enum Opcode {
    #[allow(missing_docs)] Add  = 0b0000,
    #[allow(missing_docs)] Addi = 0b0001,
    #[allow(missing_docs)] Sub  = 0b0010,
    #[allow(missing_docs)] Subi = 0b0011,
    #[allow(missing_docs)] And  = 0b0100,
    #[allow(missing_docs)] Or   = 0b0101,
    #[allow(missing_docs)] Xor  = 0b0110,
    #[allow(missing_docs)] Not  = 0b0111,
    #[allow(missing_docs)] Lsl  = 0b1000,
    #[allow(missing_docs)] Lsr  = 0b1001,
    #[allow(missing_docs)] Ldur = 0b1010,
    #[allow(missing_docs)] Stor = 0b1011,
    #[allow(missing_docs)] Cmp  = 0b1100,
    #[allow(missing_docs)] B    = 0b1101,
    #[allow(missing_docs)] Mov1 = 0b1110,
    #[allow(missing_docs)] Mov2 = 0b1111,
}
impl Opcode {
    /// Every opcode, indexed by its 4-bit code.
    pub const ALL: [Opcode; 16] = [
        Opcode::Add, Opcode::Addi, Opcode::Sub, Opcode::Subi,
        Opcode::And, Opcode::Or, Opcode::Xor, Opcode::Not,
        Opcode::Lsl, Opcode::Lsr, Opcode::Ldur, Opcode::Stor,
        Opcode::Cmp, Opcode::B, Opcode::Mov1, Opcode::Mov2,
    ];

    /// The 4-bit code of this opcode.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Gets the opcode from the low 4 bits of `code` (upper bits are ignored).
    pub fn from_code(code: u8) -> Self {
        Self::ALL[usize::from(code & 0xF)]
    }

    /// The operand layout shared by instructions of this opcode.
    pub fn shape(self) -> Shape {
        match self {
            Opcode::Add | Opcode::Addi | Opcode::Sub | Opcode::Subi | Opcode::And
            | Opcode::Or | Opcode::Xor | Opcode::Not | Opcode::Lsl | Opcode::Lsr => Shape::Alu,
            Opcode::Ldur | Opcode::Stor => Shape::Mem,
            Opcode::Cmp => Shape::Cmp,
            Opcode::B => Shape::Branch,
            Opcode::Mov1 | Opcode::Mov2 => Shape::Mov,
        }
    }

    fn as_alu(self) -> Option<AluOp> {
        AluOp::ALL.iter().copied().find(|op| op.opcode() == self)
    }
    fn as_mem(self) -> Option<MemOp> {
        match self {
            Opcode::Ldur => Some(MemOp::Ldur),
            Opcode::Stor => Some(MemOp::Stor),
            _ => None
        }
    }
    fn as_mov(self) -> Option<MovOp> {
        match self {
            Opcode::Mov1 => Some(MovOp::Mov1),
            Opcode::Mov2 => Some(MovOp::Mov2),
            _ => None
        }
    }
}

/// The ways the low 4 bits of an instruction word can be laid out.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Shape {
    /// `rd` (1 bit), `ra` (1 bit), `rb` (2 bits).
    Alu,
    /// `reg` (2 bits), `addr` (2 bits).
    Mem,
    /// `cond` (2 bits), `target` (2 bits).
    Branch,
    /// `op1` (2 bits), `op2` (2 bits).
    Cmp,
    /// `reg` (3 bits), followed by a zero bit.
    Mov,
    /// No operands. The whole word is zero.
    Nop,
}
impl Shape {
    /// The names of the operands of this shape, in source order.
    pub fn operand_names(self) -> &'static [&'static str] {
        match self {
            Shape::Alu    => &["rd", "ra", "rb"],
            Shape::Mem    => &["reg", "addr"],
            Shape::Branch => &["cond", "target"],
            Shape::Cmp    => &["op1", "op2"],
            Shape::Mov    => &["reg"],
            Shape::Nop    => &[],
        }
    }

    /// The number of operands an instruction of this shape takes.
    pub fn operand_count(self) -> usize {
        self.operand_names().len()
    }
}

macro_rules! sub_op {
    ($(#[$m:meta])* $Op:ident { $($name:ident),+ }) => {
        $(#[$m])*
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum $Op {
            $(
                #[allow(missing_docs)]
                $name
            ),+
        }
        impl $Op {
            /// Every variant of this operation.
            pub const ALL: &'static [$Op] = &[$(Self::$name),+];

            /// The opcode of this operation.
            pub fn opcode(self) -> Opcode {
                match self {
                    $(Self::$name => Opcode::$name),+
                }
            }
        }
    };
}
sub_op! {
    /// An opcode of [`Shape::Alu`].
    AluOp { Add, Addi, Sub, Subi, And, Or, Xor, Not, Lsl, Lsr }
}
sub_op! {
    /// An opcode of [`Shape::Mem`].
    MemOp { Ldur, Stor }
}
sub_op! {
    /// An opcode of [`Shape::Mov`].
    MovOp { Mov1, Mov2 }
}

/// An operand field which is `N` bits wide.
///
/// A field can hold any value, but only its low `N` bits are kept.
/// Out-of-range values are truncated, never rejected:
///
/// ```
/// # use cpu8_ensemble::ast::Field;
/// #
/// assert_eq!(Field::<2>::new(1).get(), 1);
/// assert_eq!(Field::<2>::new(5).get(), 1);  // 5 mod 4
/// assert_eq!(Field::<3>::new(-1).get(), 7); // two's complement
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct Field<const N: u32>(u8);

impl<const N: u32> Field<N> {
    /// The mask of the bits a field of this width keeps.
    pub const MASK: u8 = ((1u16 << N) - 1) as u8;

    /// Creates a field, keeping only the low `N` bits of `value`.
    pub fn new(value: i64) -> Self {
        // `as u8` keeps the low byte of the two's complement representation.
        Self((value as u8) & Self::MASK)
    }

    /// Gets the value of this field. This is always less than `2^N`.
    pub fn get(self) -> u8 {
        self.0
    }
}
impl<const N: u32> From<u8> for Field<N> {
    fn from(value: u8) -> Self {
        Self(value & Self::MASK)
    }
}
impl<const N: u32> std::fmt::Display for Field<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The operand count given to [`Instr::from_operands`] did not match the mnemonic.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct OperandCount {
    /// The number of operands the mnemonic takes.
    pub expected: usize,
    /// The number of operands that were provided.
    pub found: usize,
}

/// A cpu8 instruction with its operand fields.
///
/// Each variant corresponds to one [`Shape`].
/// Instructions are converted to words with [`Instr::encode`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Instr {
    /// An arithmetic/logic instruction.
    #[allow(missing_docs)]
    Alu { op: AluOp, rd: Field<1>, ra: Field<1>, rb: Field<2> },
    /// A load (`LDUR`) or store (`STOR`).
    #[allow(missing_docs)]
    Mem { op: MemOp, reg: Field<2>, addr: Field<2> },
    /// A conditional branch (`B`).
    #[allow(missing_docs)]
    Branch { cond: Field<2>, target: Field<2> },
    /// A comparison (`CMP`).
    #[allow(missing_docs)]
    Cmp { op1: Field<2>, op2: Field<2> },
    /// A register move (`MOV1`, `MOV2`).
    #[allow(missing_docs)]
    Mov { op: MovOp, reg: Field<3> },
    /// Does nothing.
    Nop,
}

impl Instr {
    /// Creates an instruction from a mnemonic and its operands (in source order).
    ///
    /// Each operand is truncated to the width of its field.
    /// This fails if the number of operands does not match the mnemonic's [`Shape`].
    ///
    /// ```
    /// use cpu8_ensemble::ast::Instr;
    /// use cpu8_ensemble::parse::lex::Mnemonic;
    ///
    /// let instr = Instr::from_operands(Mnemonic::ADD, &[1, 1, 5]).unwrap();
    /// assert_eq!(instr.to_string(), "ADD 1 1 1");
    ///
    /// assert!(Instr::from_operands(Mnemonic::ADD, &[1, 1]).is_err());
    /// ```
    pub fn from_operands(mnemonic: Mnemonic, operands: &[i64]) -> Result<Self, OperandCount> {
        let count = OperandCount {
            expected: mnemonic.shape().operand_count(),
            found: operands.len()
        };
        if count.expected != count.found {
            return Err(count);
        }

        let instr = match (mnemonic.opcode(), operands) {
            (None, []) => Some(Instr::Nop),
            (Some(Opcode::B), &[cond, target]) => Some(Instr::Branch { cond: Field::new(cond), target: Field::new(target) }),
            (Some(Opcode::Cmp), &[op1, op2]) => Some(Instr::Cmp { op1: Field::new(op1), op2: Field::new(op2) }),
            (Some(op), &[rd, ra, rb]) => op.as_alu()
                .map(|op| Instr::Alu { op, rd: Field::new(rd), ra: Field::new(ra), rb: Field::new(rb) }),
            (Some(op), &[reg, addr]) => op.as_mem()
                .map(|op| Instr::Mem { op, reg: Field::new(reg), addr: Field::new(addr) }),
            (Some(op), &[reg]) => op.as_mov()
                .map(|op| Instr::Mov { op, reg: Field::new(reg) }),
            _ => None
        };

        instr.ok_or(count)
    }

    /// The opcode of this instruction, or `None` for `NOP`.
    pub fn opcode(&self) -> Option<Opcode> {
        match *self {
            Instr::Alu { op, .. } => Some(op.opcode()),
            Instr::Mem { op, .. } => Some(op.opcode()),
            Instr::Branch { .. }  => Some(Opcode::B),
            Instr::Cmp { .. }     => Some(Opcode::Cmp),
            Instr::Mov { op, .. } => Some(op.opcode()),
            Instr::Nop            => None,
        }
    }

    /// The mnemonic this instruction is written with.
    pub fn mnemonic(&self) -> Mnemonic {
        let Some(op) = self.opcode() else { return Mnemonic::NOP };
        Mnemonic::ALL.iter()
            .copied()
            .find(|m| m.opcode() == Some(op))
            .unwrap_or(Mnemonic::NOP)
    }

    /// The field values of this instruction, in source order.
    pub fn operands(&self) -> Vec<u8> {
        match *self {
            Instr::Alu { rd, ra, rb, .. }    => vec![rd.get(), ra.get(), rb.get()],
            Instr::Mem { reg, addr, .. }     => vec![reg.get(), addr.get()],
            Instr::Branch { cond, target }   => vec![cond.get(), target.get()],
            Instr::Cmp { op1, op2 }          => vec![op1.get(), op2.get()],
            Instr::Mov { reg, .. }           => vec![reg.get()],
            Instr::Nop                       => vec![],
        }
    }

    /// Encodes this instruction into its 8-bit word.
    pub fn encode(&self) -> u8 {
        crate::asm::encoding::encode(self)
    }

    /// Decodes an 8-bit word into an instruction.
    ///
    /// Note that `0x00` decodes as `ADD 0 0 0`, since `NOP` shares its encoding.
    pub fn decode(word: u8) -> Self {
        crate::asm::encoding::decode(word)
    }
}
impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.mnemonic().fmt(f)?;
        for operand in self.operands() {
            f.write_char(' ')?;
            operand.fmt(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::parse::lex::Mnemonic;

    use super::{AluOp, Field, Instr, MemOp, MovOp, Opcode, OperandCount, Shape};

    #[test]
    fn test_opcode_codes() {
        for (i, op) in Opcode::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(op.code()), i);
            assert_eq!(Opcode::from_code(op.code()), op);
            // upper bits ignored
            assert_eq!(Opcode::from_code(op.code() | 0xF0), op);
        }
        assert_eq!(Opcode::Mov1.code(), 0b1110);
        assert_eq!(Opcode::Cmp.code(), 0b1100);
        assert_eq!(Opcode::B.code(), 0b1101);
    }

    #[test]
    fn test_sub_ops() {
        for &op in AluOp::ALL {
            assert_eq!(op.opcode().shape(), Shape::Alu);
        }
        for &op in MemOp::ALL {
            assert_eq!(op.opcode().shape(), Shape::Mem);
        }
        for &op in MovOp::ALL {
            assert_eq!(op.opcode().shape(), Shape::Mov);
        }
        assert_eq!(AluOp::ALL.len() + MemOp::ALL.len() + MovOp::ALL.len() + 2, Opcode::ALL.len());
    }

    #[test]
    fn test_field_truncation() {
        assert_eq!(Field::<1>::MASK, 0b1);
        assert_eq!(Field::<2>::MASK, 0b11);
        assert_eq!(Field::<3>::MASK, 0b111);

        assert_eq!(Field::<1>::new(2).get(), 0);
        assert_eq!(Field::<1>::new(3).get(), 1);
        assert_eq!(Field::<2>::new(5).get(), 1);
        assert_eq!(Field::<3>::new(6).get(), 6);
        assert_eq!(Field::<3>::new(15).get(), 7);
        assert_eq!(Field::<2>::new(-1).get(), 3);
        assert_eq!(Field::<2>::new(-4).get(), 0);
        assert_eq!(Field::<3>::new(i64::MAX).get(), 7);
        assert_eq!(Field::<2>::from(0xFF).get(), 3);
    }

    #[test]
    fn test_from_operands() {
        assert_eq!(
            Instr::from_operands(Mnemonic::ADDI, &[0, 0, 3]),
            Ok(Instr::Alu { op: AluOp::Addi, rd: Field::new(0), ra: Field::new(0), rb: Field::new(3) })
        );
        assert_eq!(
            Instr::from_operands(Mnemonic::STOR, &[2, 2]),
            Ok(Instr::Mem { op: MemOp::Stor, reg: Field::new(2), addr: Field::new(2) })
        );
        assert_eq!(
            Instr::from_operands(Mnemonic::B, &[2, 6]),
            Ok(Instr::Branch { cond: Field::new(2), target: Field::new(2) })
        );
        assert_eq!(
            Instr::from_operands(Mnemonic::CMP, &[3, 0]),
            Ok(Instr::Cmp { op1: Field::new(3), op2: Field::new(0) })
        );
        assert_eq!(
            Instr::from_operands(Mnemonic::MOV2, &[9]),
            Ok(Instr::Mov { op: MovOp::Mov2, reg: Field::new(1) })
        );
        assert_eq!(Instr::from_operands(Mnemonic::NOP, &[]), Ok(Instr::Nop));

        assert_eq!(
            Instr::from_operands(Mnemonic::ADD, &[1]),
            Err(OperandCount { expected: 3, found: 1 })
        );
        assert_eq!(
            Instr::from_operands(Mnemonic::NOP, &[0]),
            Err(OperandCount { expected: 0, found: 1 })
        );
        assert_eq!(
            Instr::from_operands(Mnemonic::MOV1, &[1, 2]),
            Err(OperandCount { expected: 1, found: 2 })
        );
    }

    #[test]
    fn test_mnemonic_and_display() {
        for &m in Mnemonic::ALL {
            let operands = vec![1; m.shape().operand_count()];
            let instr = Instr::from_operands(m, &operands).unwrap();
            assert_eq!(instr.mnemonic(), m);
            assert_eq!(instr.opcode(), m.opcode());
        }

        assert_eq!(Instr::from_operands(Mnemonic::LSL, &[0, 1, 3]).unwrap().to_string(), "LSL 0 1 3");
        assert_eq!(Instr::from_operands(Mnemonic::MOV1, &[6]).unwrap().to_string(), "MOV1 6");
        assert_eq!(Instr::from_operands(Mnemonic::CMP, &[7, 4]).unwrap().to_string(), "CMP 3 0");
        assert_eq!(Instr::Nop.to_string(), "NOP");
    }
}
