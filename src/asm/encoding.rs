//! Packing instructions into cpu8 instruction words.
//!
//! Every instruction word is 8 bits wide. The upper 4 bits always hold the [`Opcode`],
//! and the lower 4 bits are laid out according to the opcode's [`Shape`]:
//!
//! ```text
//!          7   6   5   4   3   2   1   0
//!        +---------------+---+---+-------+
//! ALU    |    opcode     |rd |ra |  rb   |
//!        +---------------+-------+-------+
//! Mem    |    opcode     |  reg  | addr  |
//! Branch |    opcode     | cond  |target |
//! Cmp    |    opcode     |  op1  |  op2  |
//!        +---------------+-----------+---+
//! Mov    |    opcode     |    reg    | 0 |
//!        +---------------+-----------+---+
//! ```
//!
//! `NOP` is the all-zero word.
//!
//! Each field is masked to its width before it is placed,
//! so every packing function here is total.
//!
//! [`Shape`]: crate::ast::Shape

use crate::ast::{AluOp, Field, Instr, MemOp, MovOp, Opcode};

/// Position and width of a field within an instruction word.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct FieldLayout {
    /// The bit index of the field's least significant bit.
    pub shift: u32,
    /// The number of bits in the field.
    pub width: u32,
}
impl FieldLayout {
    /// The mask of the field, right-aligned.
    pub const fn mask(self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }

    /// Masks `value` to the field's width and moves it into position.
    pub const fn place(self, value: u8) -> u8 {
        (value & self.mask()) << self.shift
    }

    /// Reads this field out of a word.
    pub const fn extract(self, word: u8) -> u8 {
        (word >> self.shift) & self.mask()
    }
}

/// The field layouts of every shape.
pub mod layout {
    use super::FieldLayout;

    /// The opcode, shared by every shape.
    pub const OPCODE: FieldLayout = FieldLayout { shift: 4, width: 4 };

    /// ALU destination register.
    pub const ALU_RD: FieldLayout = FieldLayout { shift: 3, width: 1 };
    /// ALU first source register.
    pub const ALU_RA: FieldLayout = FieldLayout { shift: 2, width: 1 };
    /// ALU second source (register or immediate).
    pub const ALU_RB: FieldLayout = FieldLayout { shift: 0, width: 2 };

    /// Load/store register.
    pub const MEM_REG: FieldLayout = FieldLayout { shift: 2, width: 2 };
    /// Load/store address.
    pub const MEM_ADDR: FieldLayout = FieldLayout { shift: 0, width: 2 };

    /// Branch condition.
    pub const BRANCH_COND: FieldLayout = FieldLayout { shift: 2, width: 2 };
    /// Branch target selector.
    pub const BRANCH_TARGET: FieldLayout = FieldLayout { shift: 0, width: 2 };

    /// First compare operand.
    pub const CMP_OP1: FieldLayout = FieldLayout { shift: 2, width: 2 };
    /// Second compare operand.
    pub const CMP_OP2: FieldLayout = FieldLayout { shift: 0, width: 2 };

    /// Move register. Bit 0 is left zero.
    pub const MOV_REG: FieldLayout = FieldLayout { shift: 1, width: 3 };
}

/// The word `NOP` encodes to.
pub const NOP_WORD: u8 = 0x00;

fn pack_opcode(op: Opcode) -> u8 {
    layout::OPCODE.place(op.code())
}

/// Packs an ALU instruction: `opcode | rd | ra | rb`.
pub fn pack_alu(op: AluOp, rd: Field<1>, ra: Field<1>, rb: Field<2>) -> u8 {
    pack_opcode(op.opcode())
        | layout::ALU_RD.place(rd.get())
        | layout::ALU_RA.place(ra.get())
        | layout::ALU_RB.place(rb.get())
}

/// Packs a load or store: `opcode | reg | addr`.
///
/// `LDUR` and `STOR` share this layout and only differ by opcode.
pub fn pack_mem(op: MemOp, reg: Field<2>, addr: Field<2>) -> u8 {
    pack_opcode(op.opcode())
        | layout::MEM_REG.place(reg.get())
        | layout::MEM_ADDR.place(addr.get())
}

/// Packs a branch: `B | cond | target`.
pub fn pack_branch(cond: Field<2>, target: Field<2>) -> u8 {
    pack_opcode(Opcode::B)
        | layout::BRANCH_COND.place(cond.get())
        | layout::BRANCH_TARGET.place(target.get())
}

/// Packs a compare: `CMP | op1 | op2`.
pub fn pack_cmp(op1: Field<2>, op2: Field<2>) -> u8 {
    pack_opcode(Opcode::Cmp)
        | layout::CMP_OP1.place(op1.get())
        | layout::CMP_OP2.place(op2.get())
}

/// Packs a move: `opcode | reg | 0`.
pub fn pack_mov(op: MovOp, reg: Field<3>) -> u8 {
    pack_opcode(op.opcode())
        | layout::MOV_REG.place(reg.get())
}

/// Encodes an instruction into its word.
///
/// ```
/// use cpu8_ensemble::asm::encoding::encode;
/// use cpu8_ensemble::ast::{Field, Instr, MovOp};
///
/// let mov = Instr::Mov { op: MovOp::Mov1, reg: Field::new(6) };
/// assert_eq!(encode(&mov), 0xEC);
/// assert_eq!(encode(&Instr::Nop), 0x00);
/// ```
pub fn encode(instr: &Instr) -> u8 {
    match *instr {
        Instr::Alu { op, rd, ra, rb }  => pack_alu(op, rd, ra, rb),
        Instr::Mem { op, reg, addr }   => pack_mem(op, reg, addr),
        Instr::Branch { cond, target } => pack_branch(cond, target),
        Instr::Cmp { op1, op2 }        => pack_cmp(op1, op2),
        Instr::Mov { op, reg }         => pack_mov(op, reg),
        Instr::Nop                     => NOP_WORD,
    }
}

/// Decodes a word into an instruction by slicing out the fields of its opcode's shape.
///
/// Every word decodes to some instruction. The one ambiguity is `0x00`,
/// which is both `NOP` and `ADD 0 0 0`; it decodes as the latter.
/// Bit 0 of a move is ignored.
pub fn decode(word: u8) -> Instr {
    let alu = |op| Instr::Alu {
        op,
        rd: layout::ALU_RD.extract(word).into(),
        ra: layout::ALU_RA.extract(word).into(),
        rb: layout::ALU_RB.extract(word).into(),
    };
    let mem = |op| Instr::Mem {
        op,
        reg: layout::MEM_REG.extract(word).into(),
        addr: layout::MEM_ADDR.extract(word).into(),
    };
    let mov = |op| Instr::Mov {
        op,
        reg: layout::MOV_REG.extract(word).into(),
    };

    match Opcode::from_code(layout::OPCODE.extract(word)) {
        Opcode::Add  => alu(AluOp::Add),
        Opcode::Addi => alu(AluOp::Addi),
        Opcode::Sub  => alu(AluOp::Sub),
        Opcode::Subi => alu(AluOp::Subi),
        Opcode::And  => alu(AluOp::And),
        Opcode::Or   => alu(AluOp::Or),
        Opcode::Xor  => alu(AluOp::Xor),
        Opcode::Not  => alu(AluOp::Not),
        Opcode::Lsl  => alu(AluOp::Lsl),
        Opcode::Lsr  => alu(AluOp::Lsr),
        Opcode::Ldur => mem(MemOp::Ldur),
        Opcode::Stor => mem(MemOp::Stor),
        Opcode::Cmp  => Instr::Cmp {
            op1: layout::CMP_OP1.extract(word).into(),
            op2: layout::CMP_OP2.extract(word).into(),
        },
        Opcode::B    => Instr::Branch {
            cond: layout::BRANCH_COND.extract(word).into(),
            target: layout::BRANCH_TARGET.extract(word).into(),
        },
        Opcode::Mov1 => mov(MovOp::Mov1),
        Opcode::Mov2 => mov(MovOp::Mov2),
    }
}
