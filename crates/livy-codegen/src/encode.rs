//! Bytecode encoding.
//!
//! Wire layout, big-endian throughout: a 2-byte format tag (`C\0`
//! plain, `C\xFF` compressed), a header of three `u32` section sizes and
//! a 12-byte NUL-padded encoding name, three `0xFF` separator bytes,
//! then the function pool, the string pool, and the instruction stream.
//! Every instruction occupies exactly 8 bytes: one opcode byte and 7
//! operand bytes, zero-padded on the right.

use std::fmt;

use livy_common::diag::Diagnostic;

use crate::instr::Instruction;
use crate::rle;

/// Encoding of the string pool, recorded in the header.
const STRING_ENCODING: &str = "utf-8";

/// An error raised while packing operands into their fixed widths.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A numeric operand outside its encodable range.
    NumberOverflow { value: String },
}

impl EncodeError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EncodeError::NumberOverflow { value } => Diagnostic::new(
                "number_overflow",
                format!("the number {value} cannot be encoded in the bytecode format"),
            ),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::NumberOverflow { value } => {
                write!(f, "number {value} out of encodable range")
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Encode an instruction stream into a complete bytecode file image.
pub fn to_bytecode(instructions: &[Instruction], compress: bool) -> Result<Vec<u8>, EncodeError> {
    let mut func_pool: Vec<Vec<u8>> = Vec::new();
    let mut string_pool: Vec<Vec<u8>> = Vec::new();
    let stream = encode_instructions(instructions, &mut func_pool, &mut string_pool)?;
    let funcs = encode_pool(&func_pool);
    let strings = encode_pool(&string_pool);

    let mut body = generate_header(funcs.len(), strings.len(), stream.len());
    body.extend([0xFF, 0xFF, 0xFF]);
    body.extend(funcs);
    body.extend(strings);
    body.extend(stream);

    if compress {
        let (compressed, used) = rle::compress(&body);
        if used {
            let mut out = vec![0x43, 0xFF];
            out.extend(compressed);
            return Ok(out);
        }
    }
    let mut out = vec![0x43, 0x00];
    out.extend(body);
    Ok(out)
}

/// The `F:`/`S:`/`C:`/`E:` header with section byte sizes.
fn generate_header(func_pool_size: usize, string_pool_size: usize, stream_size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    out.extend(b"F:");
    out.extend((func_pool_size as u32).to_be_bytes());
    out.extend(b"S:");
    out.extend((string_pool_size as u32).to_be_bytes());
    out.extend(b"C:");
    out.extend((stream_size as u32).to_be_bytes());
    out.extend(b"E:");
    let mut encoding = STRING_ENCODING.as_bytes().to_vec();
    encoding.resize(12, 0x00);
    out.extend(encoding);
    out
}

/// Concatenate a pool into `(u32 length, payload)` records.
fn encode_pool(pool: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for item in pool {
        out.extend((item.len() as u32).to_be_bytes());
        out.extend(item);
    }
    out
}

/// Encode instructions into 8-byte slots, filling the pools as
/// `LoadFunc` and `LoadString` operands are encountered.
pub fn encode_instructions(
    instructions: &[Instruction],
    func_pool: &mut Vec<Vec<u8>>,
    string_pool: &mut Vec<Vec<u8>>,
) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(instructions.len() * 8);
    for instruction in instructions {
        let operands = encode_operands(instruction, func_pool, string_pool)?;
        debug_assert!(operands.len() <= 7, "operands must fit the slot");
        out.push(instruction.opcode());
        out.extend(&operands);
        out.extend(std::iter::repeat(0x00).take(7 - operands.len()));
    }
    Ok(out)
}

fn encode_operands(
    instruction: &Instruction,
    func_pool: &mut Vec<Vec<u8>>,
    string_pool: &mut Vec<Vec<u8>>,
) -> Result<Vec<u8>, EncodeError> {
    match instruction {
        Instruction::LoadUnit | Instruction::Apply | Instruction::BuildPair => Ok(Vec::new()),
        Instruction::LoadBool(value) => Ok(vec![if *value { 0xFF } else { 0x00 }]),
        Instruction::LoadInt(value) => encode_signed(*value, 7),
        Instruction::LoadFloat(value) => {
            let (mantissa, exponent) = float_parts(*value)?;
            let mut out = encode_signed(mantissa, 5)?;
            out.extend(exponent.to_be_bytes());
            Ok(out)
        }
        Instruction::LoadString(text) => {
            string_pool.push(text.as_bytes().to_vec());
            Ok(encode_unsigned(string_pool.len() as u64 - 1, 7))
        }
        Instruction::LoadFunc(body) => {
            let body_code = encode_instructions(body, func_pool, string_pool)?;
            func_pool.push(body_code);
            Ok(encode_unsigned(func_pool.len() as u64 - 1, 7))
        }
        Instruction::LoadName { depth, index } => {
            let mut out = encode_unsigned(*depth as u64, 3);
            out.extend(encode_unsigned(*index as u64, 4));
            Ok(out)
        }
        Instruction::StoreName(index) => Ok(encode_unsigned(*index as u64, 4)),
        Instruction::Native(op) => Ok(vec![*op]),
        Instruction::Branch(count) | Instruction::Jump(count) | Instruction::BuildList(count) => {
            Ok(encode_unsigned(*count, 7))
        }
    }
}

/// Big-endian unsigned integer in exactly `width` bytes.
fn encode_unsigned(value: u64, width: usize) -> Vec<u8> {
    value.to_be_bytes()[8 - width..].to_vec()
}

/// Big-endian two's complement in exactly `width` bytes, or overflow.
fn encode_signed(value: i64, width: usize) -> Result<Vec<u8>, EncodeError> {
    let bits = width as u32 * 8;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    if value < min || value > max {
        return Err(EncodeError::NumberOverflow {
            value: value.to_string(),
        });
    }
    Ok(value.to_be_bytes()[8 - width..].to_vec())
}

/// Decompose a float into a decimal mantissa and a base-10 scale (the
/// number of fractional digits), taken from its shortest decimal
/// rendering.
fn float_parts(value: f64) -> Result<(i64, i16), EncodeError> {
    if !value.is_finite() {
        return Err(EncodeError::NumberOverflow {
            value: value.to_string(),
        });
    }
    let text = format!("{value}");
    let (digits, scale) = match text.find('.') {
        Some(dot) => (text.replace('.', ""), (text.len() - dot - 1) as i16),
        None => (text, 0),
    };
    let mantissa: i64 = digits.parse().map_err(|_| EncodeError::NumberOverflow {
        value: value.to_string(),
    })?;
    // The mantissa must fit the 5-byte slot.
    encode_signed(mantissa, 5)?;
    Ok((mantissa, scale))
}
