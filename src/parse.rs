//! Parsing cpu8 source lines into instructions.
//!
//! A source line consists of a mnemonic followed by whitespace-separated decimal operands:
//! ```text
//! ADDI 0 0 3
//! MOV1 6
//! NOP
//! ```
//!
//! The mnemonic is the first whitespace-delimited token of the line and is case-insensitive.
//! Whitespace and case folding are ASCII only (see [`lex::is_space`]).
//! The number of operands is fixed by the mnemonic (see [`Shape::operand_count`]).
//!
//! The main function of this module is [`parse_line`], which converts one line into an [`Instr`].
//!
//! [`Shape::operand_count`]: crate::ast::Shape::operand_count

pub mod lex;

use logos::Logos;

use crate::asm::{AsmErr, AsmErrKind, OperandErr};
use crate::ast::Instr;
use crate::err::ErrSpan;
use lex::{is_space, Mnemonic, Token};

/// Parses a single source line into an instruction.
///
/// # Example
/// ```
/// use cpu8_ensemble::parse::parse_line;
///
/// let instr = parse_line("addi 0 0 3").unwrap();
/// assert_eq!(instr.to_string(), "ADDI 0 0 3");
/// assert_eq!(instr.encode(), 0x13);
///
/// assert!(parse_line("FOO 1 2").is_err());
/// assert!(parse_line("ADDI 0 0").is_err());
/// ```
pub fn parse_line(line: &str) -> Result<Instr, AsmErr> {
    let rest = line.trim_start_matches(is_space);
    let start = line.len() - rest.len();
    let mn_len = rest.find(is_space).unwrap_or(rest.len());
    let token = &rest[..mn_len];
    let mn_end = start + mn_len;

    let Some(mnemonic) = Mnemonic::lookup(token) else {
        let kind = AsmErrKind::UnknownInstruction { mnemonic: token.to_string() };
        return Err(AsmErr::new(kind, start..mn_end, line));
    };
    let malformed = |reason: OperandErr, span: ErrSpan| {
        AsmErr::new(AsmErrKind::MalformedOperands { mnemonic, reason }, span, line)
    };

    let mut operands = vec![];
    let mut lexer = Token::lexer(&line[mn_end..]);
    while let Some(token) = lexer.next() {
        let span = lexer.span();
        let span = (span.start + mn_end)..(span.end + mn_end);

        match token {
            Ok(Token::Int(n))     => operands.push(n),
            Ok(Token::Name(name)) => return Err(malformed(OperandErr::NotInteger { token: name }, span)),
            Err(e)                => return Err(malformed(OperandErr::Lex(e), span)),
        }
    }

    Instr::from_operands(mnemonic, &operands)
        .map_err(|count| {
            let reason = OperandErr::Count { expected: count.expected, found: count.found };
            malformed(reason, start..line.trim_end_matches(is_space).len())
        })
}

#[cfg(test)]
mod tests {
    use crate::asm::{AsmErrKind, OperandErr};
    use crate::err::LexErr;
    use crate::parse::lex::Mnemonic;

    use super::parse_line;

    fn assert_parse(line: &str, expected: &str) {
        match parse_line(line) {
            Ok(instr) => assert_eq!(instr.to_string(), expected, "line {line:?}"),
            Err(e) => panic!("failed to parse {line:?}: {e}"),
        }
    }
    fn assert_unknown(line: &str, mnemonic: &str) {
        let err = parse_line(line).unwrap_err();
        assert_eq!(err.kind, AsmErrKind::UnknownInstruction { mnemonic: mnemonic.to_string() });
        assert_eq!(err.line, line);
    }
    fn assert_malformed(line: &str, mnemonic: Mnemonic, reason: OperandErr) {
        let err = parse_line(line).unwrap_err();
        assert_eq!(err.kind, AsmErrKind::MalformedOperands { mnemonic, reason });
        assert_eq!(err.line, line);
    }

    #[test]
    fn test_basic() {
        assert_parse("ADD 1 1 2", "ADD 1 1 2");
        assert_parse("ADDI 0 0 3", "ADDI 0 0 3");
        assert_parse("LDUR 3 1", "LDUR 3 1");
        assert_parse("STOR 2 2", "STOR 2 2");
        assert_parse("B 2 2", "B 2 2");
        assert_parse("CMP 3 0", "CMP 3 0");
        assert_parse("MOV1 6", "MOV1 6");
        assert_parse("MOV2 2", "MOV2 2");
        assert_parse("NOP", "NOP");
    }

    #[test]
    fn test_whitespace_and_case() {
        assert_parse("   add\t1  1 2  ", "ADD 1 1 2");
        assert_parse("Mov1 6\r", "MOV1 6");
        assert_parse("nop", "NOP");
        assert_parse("\tNoP   ", "NOP");
        assert_parse("ADD 1\x0B1 1", "ADD 1 1 1");
        assert_parse("\x0BMOV1\x0B6\x0C", "MOV1 6");
    }

    #[test]
    fn test_non_ascii_is_not_special() {
        assert_unknown("MOV1\u{A0}6", "MOV1\u{A0}6");
        assert_unknown("\u{3000}ADD 1 1 1", "\u{3000}ADD");
        assert_unknown("addı 0 0 3", "addı");
        assert_unknown("ſtor 1 1", "ſtor");
        assert_malformed("ADD 1 1\u{A0}1", Mnemonic::ADD, OperandErr::Lex(LexErr::InvalidSymbol));
    }

    #[test]
    fn test_truncating_operands() {
        assert_parse("ADD 1 1 5", "ADD 1 1 1");
        assert_parse("MOV1 14", "MOV1 6");
        assert_parse("STOR -1 4", "STOR 3 0");
        assert_parse("B +6 7", "B 2 3");
    }

    #[test]
    fn test_unknown() {
        assert_unknown("FOO 1 2", "FOO");
        assert_unknown("  foo", "foo");
        assert_unknown("ADD, 1 1 1", "ADD,");
        assert_unknown("", "");
        assert_unknown("12 1 1", "12");

        let err = parse_line("  FOO 1 2").unwrap_err();
        assert_eq!(err.span, 2..5);
    }

    #[test]
    fn test_operand_count() {
        assert_malformed("ADD 1 1", Mnemonic::ADD, OperandErr::Count { expected: 3, found: 2 });
        assert_malformed("ADD 1 1 1 1", Mnemonic::ADD, OperandErr::Count { expected: 3, found: 4 });
        assert_malformed("LDUR", Mnemonic::LDUR, OperandErr::Count { expected: 2, found: 0 });
        assert_malformed("B 1", Mnemonic::B, OperandErr::Count { expected: 2, found: 1 });
        assert_malformed("CMP 1 2 3", Mnemonic::CMP, OperandErr::Count { expected: 2, found: 3 });
        assert_malformed("MOV2", Mnemonic::MOV2, OperandErr::Count { expected: 1, found: 0 });
        assert_malformed("NOP 0", Mnemonic::NOP, OperandErr::Count { expected: 0, found: 1 });
    }

    #[test]
    fn test_operand_tokens() {
        assert_malformed("ADD 1 R1 2", Mnemonic::ADD, OperandErr::NotInteger { token: "R1".to_string() });
        assert_malformed("MOV1 3x", Mnemonic::MOV1, OperandErr::Lex(LexErr::InvalidNumeric));
        assert_malformed("MOV1 -", Mnemonic::MOV1, OperandErr::Lex(LexErr::InvalidDecEmpty));
        assert_malformed("CMP 1, 2", Mnemonic::CMP, OperandErr::Lex(LexErr::InvalidSymbol));

        let err = parse_line("ADD 1 R1 2").unwrap_err();
        assert_eq!(err.span, 6..8);
        assert_eq!(&err.line[err.span.clone()], "R1");
    }

    #[test]
    fn test_idempotent() {
        for line in ["ADDI 0 0 3", "MOV1 6", "FOO 1 2", "ADD 1"] {
            assert_eq!(parse_line(line), parse_line(line));
        }
    }
}
