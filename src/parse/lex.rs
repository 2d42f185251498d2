//! Tokenizing cpu8 assembly.
//!
//! This module holds the mnemonic table ([`Mnemonic`]) and the tokens
//! that make up the operands of an instruction ([`Token`]).
//! Both are used by the parser to convert a source line into an [`Instr`].
//!
//! [`Instr`]: crate::ast::Instr

use std::num::IntErrorKind;

use logos::{Lexer, Logos};

use crate::ast::{Opcode, Shape};

/// A unit of information in the operand list of a cpu8 source line.
#[derive(Debug, Logos, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\x0B\f]+", error = LexErr)]
pub enum Token {
    // Like the mnemonic, these regexes deliberately span over invalid tokens
    // (e.g., `12ab` matches as an integer). The validator rejects them,
    // so the whole unit is reported rather than a fragment of it.

    /// A decimal integer (e.g., `3`, `-1`, `+7`)
    #[regex(r"\d\w*", lex_int)]
    #[regex(r"[+-]\w*", lex_int)]
    Int(i64),

    /// A name (e.g., `R1`, `loop`).
    ///
    /// Names are never valid operands, but are lexed so they can be reported.
    #[regex(r"[A-Za-z_]\w*", |lx| lx.slice().to_string())]
    Name(String),
}

macro_rules! mnemonic_enum {
    ($($instr:ident),+) => {
        /// A mnemonic in the cpu8 mnemonic table.
        ///
        /// The table consists of the 16 opcodes and the `NOP` pseudo-instruction.
        /// Mnemonics are case-insensitive.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum Mnemonic {
            $(
                #[allow(missing_docs)]
                $instr
            ),+
        }

        impl Mnemonic {
            /// Every entry of the mnemonic table.
            pub const ALL: &'static [Mnemonic] = &[$(Self::$instr),+];

            /// Looks up a mnemonic in the table, ignoring case.
            pub fn lookup(s: &str) -> Option<Self> {
                match &*s.to_ascii_uppercase() {
                    $(stringify!($instr) => Some(Self::$instr)),*,
                    _ => None
                }
            }

            /// The canonical (uppercase) name of this mnemonic.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$instr => stringify!($instr)),*
                }
            }
        }

        impl std::fmt::Display for Mnemonic {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}
mnemonic_enum! {
    ADD, ADDI, SUB, SUBI, AND, OR, XOR, NOT, LSL, LSR,
    LDUR, STOR, CMP, B, MOV1, MOV2, NOP
}

impl Mnemonic {
    /// The opcode this mnemonic assembles to.
    ///
    /// `NOP` is the only mnemonic without an opcode; it always encodes to the zero word.
    pub fn opcode(self) -> Option<Opcode> {
        let op = match self {
            Mnemonic::ADD  => Opcode::Add,
            Mnemonic::ADDI => Opcode::Addi,
            Mnemonic::SUB  => Opcode::Sub,
            Mnemonic::SUBI => Opcode::Subi,
            Mnemonic::AND  => Opcode::And,
            Mnemonic::OR   => Opcode::Or,
            Mnemonic::XOR  => Opcode::Xor,
            Mnemonic::NOT  => Opcode::Not,
            Mnemonic::LSL  => Opcode::Lsl,
            Mnemonic::LSR  => Opcode::Lsr,
            Mnemonic::LDUR => Opcode::Ldur,
            Mnemonic::STOR => Opcode::Stor,
            Mnemonic::CMP  => Opcode::Cmp,
            Mnemonic::B    => Opcode::B,
            Mnemonic::MOV1 => Opcode::Mov1,
            Mnemonic::MOV2 => Opcode::Mov2,
            Mnemonic::NOP  => return None,
        };
        Some(op)
    }

    /// The operand layout of this mnemonic.
    pub fn shape(self) -> Shape {
        self.opcode().map_or(Shape::Nop, Opcode::shape)
    }
}

/// Any errors raised in attempting to tokenize an operand list.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default, thiserror::Error)]
pub enum LexErr {
    /// Integer literal does not fit within the range of an i64
    #[error("integer literal does not fit 64-bit signed integer")]
    DoesNotFitI64,
    /// Integer literal has invalid digits (i.e., not 0-9)
    #[error("invalid decimal literal")]
    InvalidNumeric,
    /// Integer literal has no digits (it's just a sign)
    #[error("invalid decimal literal")]
    InvalidDecEmpty,
    /// A symbol was used which is not allowed in cpu8 assembly
    #[default]
    #[error("unrecognized symbol")]
    InvalidSymbol
}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<'_, str>> {
        match self {
            LexErr::DoesNotFitI64   => Some(format!("the range for a 64-bit signed integer is [{}, {}]", i64::MIN, i64::MAX).into()),
            LexErr::InvalidNumeric  => Some("a decimal literal only consists of digits 0-9".into()),
            LexErr::InvalidDecEmpty => Some("there should be digits (0-9) here".into()),
            LexErr::InvalidSymbol   => Some("operands are whitespace-separated decimal integers".into()),
        }
    }
}

/// Whether the character separates tokens on a source line.
///
/// This is the ASCII whitespace set, including vertical tab.
/// The [`Token`] lexer skips exactly these characters.
pub fn is_space(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\x0B'
}

fn lex_int(lx: &Lexer<'_, Token>) -> Result<i64, LexErr> {
    let string = lx.slice();
    string.parse::<i64>()
        .map_err(|e| match e.kind() {
            IntErrorKind::Empty        => LexErr::InvalidDecEmpty,
            IntErrorKind::InvalidDigit if matches!(string, "-" | "+") => LexErr::InvalidDecEmpty,
            IntErrorKind::InvalidDigit => LexErr::InvalidNumeric,
            IntErrorKind::PosOverflow  => LexErr::DoesNotFitI64,
            IntErrorKind::NegOverflow  => LexErr::DoesNotFitI64,
            _ => LexErr::InvalidNumeric,
        })
}

#[cfg(test)]
mod tests {
    use logos::Logos;

    use crate::ast::Shape;
    use crate::err::LexErr;
    use crate::parse::lex::{is_space, Mnemonic, Token};

    fn name(s: &str) -> Token {
        Token::Name(s.to_string())
    }

    #[test]
    fn test_int_success() {
        let mut tokens = Token::lexer("0 3 12 255 1000");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(3))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(12))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(255))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(1000))));
        assert_eq!(tokens.next(), None);

        // Signs
        let mut tokens = Token::lexer("-1 +7 -128");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-1))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(7))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-128))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_int_invalid() {
        assert_eq!(Token::lexer("3Q").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("-x7").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("-").next(), Some(Err(LexErr::InvalidDecEmpty)));
        assert_eq!(Token::lexer("+").next(), Some(Err(LexErr::InvalidDecEmpty)));
        assert_eq!(Token::lexer("99999999999999999999").next(), Some(Err(LexErr::DoesNotFitI64)));
        assert_eq!(Token::lexer("-99999999999999999999").next(), Some(Err(LexErr::DoesNotFitI64)));
    }

    #[test]
    fn test_names_and_symbols() {
        let mut tokens = Token::lexer("R1 loop _");
        assert_eq!(tokens.next(), Some(Ok(name("R1"))));
        assert_eq!(tokens.next(), Some(Ok(name("loop"))));
        assert_eq!(tokens.next(), Some(Ok(name("_"))));
        assert_eq!(tokens.next(), None);

        for s in [",", "#", ";", "$", "(", "."] {
            assert_eq!(
                Token::lexer(s).next(),
                Some(Err(LexErr::InvalidSymbol)),
                "Expected {s:?} to be an invalid symbol"
            );
        }
    }

    #[test]
    fn test_whitespace() {
        for c in (0..128u8).map(char::from).filter(|&c| is_space(c)) {
            let src = format!("{c}1{c}{c}2{c}");
            let tokens: Vec<_> = Token::lexer(&src).collect();
            assert_eq!(tokens, [Ok(Token::Int(1)), Ok(Token::Int(2))], "{c:?} should separate tokens");
        }
        for c in ['\u{85}', '\u{A0}', '\u{2003}', '\u{3000}'] {
            assert!(!is_space(c));
            assert_eq!(Token::lexer(&c.to_string()).next(), Some(Err(LexErr::InvalidSymbol)));
        }
    }

    #[test]
    fn test_mnemonic_table() {
        assert_eq!(Mnemonic::ALL.len(), 17);
        for &m in Mnemonic::ALL {
            assert_eq!(Mnemonic::lookup(m.name()), Some(m));
        }

        // Case insensitivity
        for s in ["MOV1", "Mov1", "mOV1", "mov1"] {
            assert_eq!(Mnemonic::lookup(s), Some(Mnemonic::MOV1));
        }

        assert_eq!(Mnemonic::lookup("FOO"), None);
        assert_eq!(Mnemonic::lookup(""), None);
        assert_eq!(Mnemonic::lookup("ADD1"), None);

        // Only ASCII letters fold
        assert_eq!(Mnemonic::lookup("addı"), None);
        assert_eq!(Mnemonic::lookup("ſtor"), None);
        assert_eq!(Mnemonic::lookup("ＡＤＤ"), None);
    }

    #[test]
    fn test_mnemonic_shapes() {
        let alu = [
            Mnemonic::ADD, Mnemonic::ADDI, Mnemonic::SUB, Mnemonic::SUBI, Mnemonic::AND,
            Mnemonic::OR, Mnemonic::XOR, Mnemonic::NOT, Mnemonic::LSL, Mnemonic::LSR
        ];
        for m in alu {
            assert_eq!(m.shape(), Shape::Alu, "{m}");
        }
        assert_eq!(Mnemonic::LDUR.shape(), Shape::Mem);
        assert_eq!(Mnemonic::STOR.shape(), Shape::Mem);
        assert_eq!(Mnemonic::B.shape(), Shape::Branch);
        assert_eq!(Mnemonic::CMP.shape(), Shape::Cmp);
        assert_eq!(Mnemonic::MOV1.shape(), Shape::Mov);
        assert_eq!(Mnemonic::MOV2.shape(), Shape::Mov);
        assert_eq!(Mnemonic::NOP.shape(), Shape::Nop);
        assert_eq!(Mnemonic::NOP.opcode(), None);
    }
}
