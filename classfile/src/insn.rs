//! The instruction model.
//!
//! Instructions are grouped by operand shape rather than one variant per
//! opcode: the opcode byte is carried in the variant. Branch targets are
//! *relative* offsets once an instruction has been decoded from or laid out
//! into a code array; during composition they hold symbolic label values
//! (see [`crate::composer`]).

use anyhow::{anyhow, bail, Result};
use crate::constants::opcode;

/// The mnemonics of all opcodes up to and including `jsr_w`, indexed by
/// opcode byte.
pub const MNEMONICS: [&str; 202] = [
	"nop", "aconst_null", "iconst_m1", "iconst_0", "iconst_1", "iconst_2", "iconst_3", "iconst_4",
	"iconst_5", "lconst_0", "lconst_1", "fconst_0", "fconst_1", "fconst_2", "dconst_0", "dconst_1",
	"bipush", "sipush", "ldc", "ldc_w", "ldc2_w", "iload", "lload", "fload",
	"dload", "aload", "iload_0", "iload_1", "iload_2", "iload_3", "lload_0", "lload_1",
	"lload_2", "lload_3", "fload_0", "fload_1", "fload_2", "fload_3", "dload_0", "dload_1",
	"dload_2", "dload_3", "aload_0", "aload_1", "aload_2", "aload_3", "iaload", "laload",
	"faload", "daload", "aaload", "baload", "caload", "saload", "istore", "lstore",
	"fstore", "dstore", "astore", "istore_0", "istore_1", "istore_2", "istore_3", "lstore_0",
	"lstore_1", "lstore_2", "lstore_3", "fstore_0", "fstore_1", "fstore_2", "fstore_3", "dstore_0",
	"dstore_1", "dstore_2", "dstore_3", "astore_0", "astore_1", "astore_2", "astore_3", "iastore",
	"lastore", "fastore", "dastore", "aastore", "bastore", "castore", "sastore", "pop",
	"pop2", "dup", "dup_x1", "dup_x2", "dup2", "dup2_x1", "dup2_x2", "swap",
	"iadd", "ladd", "fadd", "dadd", "isub", "lsub", "fsub", "dsub",
	"imul", "lmul", "fmul", "dmul", "idiv", "ldiv", "fdiv", "ddiv",
	"irem", "lrem", "frem", "drem", "ineg", "lneg", "fneg", "dneg",
	"ishl", "lshl", "ishr", "lshr", "iushr", "lushr", "iand", "land",
	"ior", "lor", "ixor", "lxor", "iinc", "i2l", "i2f", "i2d",
	"l2i", "l2f", "l2d", "f2i", "f2l", "f2d", "d2i", "d2l",
	"d2f", "i2b", "i2c", "i2s", "lcmp", "fcmpl", "fcmpg", "dcmpl",
	"dcmpg", "ifeq", "ifne", "iflt", "ifge", "ifgt", "ifle", "if_icmpeq",
	"if_icmpne", "if_icmplt", "if_icmpge", "if_icmpgt", "if_icmple", "if_acmpeq", "if_acmpne", "goto",
	"jsr", "ret", "tableswitch", "lookupswitch", "ireturn", "lreturn", "freturn", "dreturn",
	"areturn", "return", "getstatic", "putstatic", "getfield", "putfield", "invokevirtual", "invokespecial",
	"invokestatic", "invokeinterface", "invokedynamic", "new", "newarray", "anewarray", "arraylength", "athrow",
	"checkcast", "instanceof", "monitorenter", "monitorexit", "wide", "multianewarray", "ifnull", "ifnonnull",
	"goto_w", "jsr_w",
];

/// Looks an opcode up by its mnemonic.
pub fn opcode_by_mnemonic(mnemonic: &str) -> Option<u8> {
	MNEMONICS.iter()
		.position(|&name| name == mnemonic)
		.map(|opcode| opcode as u8)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
	/// An instruction without pool or variable operands. `bipush`, `sipush`
	/// and `newarray` carry their immediate in `constant`.
	Simple { opcode: u8, constant: i32 },
	/// A local variable instruction. The `_0`..`_3` forms keep their own
	/// opcode with the implied index filled in. `iinc` carries its increment
	/// in `constant`.
	Variable { opcode: u8, wide: bool, index: u16, constant: i32 },
	/// An instruction with a constant pool operand. `invokeinterface` keeps
	/// its count in `constant` (already shifted left by 8), `multianewarray`
	/// its dimension count.
	Constant { opcode: u8, index: u16, constant: i32 },
	Branch { opcode: u8, offset: i32 },
	TableSwitch { default: i32, low: i32, high: i32, jumps: Vec<i32> },
	LookupSwitch { default: i32, cases: Vec<i32>, jumps: Vec<i32> },
}

fn is_variable_opcode(opcode: u8) -> bool {
	(opcode::ILOAD..=opcode::ALOAD_3).contains(&opcode)
		|| (opcode::ISTORE..=opcode::ASTORE_3).contains(&opcode)
		|| opcode == opcode::IINC
		|| opcode == opcode::RET
}

/// Whether the opcode is a `*load`/`*store`/`ret`/`iinc` form that encodes
/// an explicit variable index, as opposed to the `_0`..`_3` forms.
pub fn has_variable_operand(opcode: u8) -> bool {
	(opcode::ILOAD..=opcode::ALOAD).contains(&opcode)
		|| (opcode::ISTORE..=opcode::ASTORE).contains(&opcode)
		|| opcode == opcode::IINC
		|| opcode == opcode::RET
}

fn is_constant_opcode(opcode: u8) -> bool {
	(opcode::LDC..=opcode::LDC2_W).contains(&opcode)
		|| (opcode::GETSTATIC..=opcode::INVOKEDYNAMIC).contains(&opcode)
		|| opcode == opcode::NEW
		|| opcode == opcode::ANEWARRAY
		|| opcode == opcode::CHECKCAST
		|| opcode == opcode::INSTANCEOF
		|| opcode == opcode::MULTIANEWARRAY
}

fn is_branch_opcode(opcode: u8) -> bool {
	(opcode::IFEQ..=opcode::JSR).contains(&opcode)
		|| opcode == opcode::IFNULL
		|| opcode == opcode::IFNONNULL
		|| opcode == opcode::GOTO_W
		|| opcode == opcode::JSR_W
}

/// The implied index of an `iload_0`-style opcode.
fn implied_variable_index(opcode: u8) -> Option<u16> {
	if (opcode::ILOAD_0..=opcode::ALOAD_3).contains(&opcode) {
		Some(((opcode - opcode::ILOAD_0) % 4) as u16)
	} else if (opcode::ISTORE_0..=opcode::ASTORE_3).contains(&opcode) {
		Some(((opcode - opcode::ISTORE_0) % 4) as u16)
	} else {
		None
	}
}

impl Instruction {
	/// Yields an instruction of the right shape for the opcode, with operands
	/// zeroed; the factory used by the parser after mnemonic lookup.
	pub fn create(opcode: u8, wide: bool) -> Result<Instruction> {
		if opcode as usize >= MNEMONICS.len() || opcode == opcode::WIDE {
			bail!("unknown opcode {opcode:#x}");
		}

		Ok(if opcode == opcode::TABLESWITCH {
			Instruction::TableSwitch { default: 0, low: 0, high: 0, jumps: Vec::new() }
		} else if opcode == opcode::LOOKUPSWITCH {
			Instruction::LookupSwitch { default: 0, cases: Vec::new(), jumps: Vec::new() }
		} else if is_variable_opcode(opcode) {
			let index = implied_variable_index(opcode).unwrap_or(0);
			Instruction::Variable { opcode, wide, index, constant: 0 }
		} else if is_constant_opcode(opcode) {
			Instruction::Constant { opcode, index: 0, constant: 0 }
		} else if is_branch_opcode(opcode) {
			Instruction::Branch { opcode, offset: 0 }
		} else {
			Instruction::Simple { opcode, constant: 0 }
		})
	}

	pub fn opcode(&self) -> u8 {
		match self {
			&Instruction::Simple { opcode, .. } => opcode,
			&Instruction::Variable { opcode, .. } => opcode,
			&Instruction::Constant { opcode, .. } => opcode,
			&Instruction::Branch { opcode, .. } => opcode,
			Instruction::TableSwitch { .. } => opcode::TABLESWITCH,
			Instruction::LookupSwitch { .. } => opcode::LOOKUPSWITCH,
		}
	}

	pub fn mnemonic(&self) -> &'static str {
		MNEMONICS[self.opcode() as usize]
	}

	/// Decodes the instruction starting at `offset` in `code`. Branch and
	/// switch targets come out as relative offsets.
	pub fn read_from(code: &[u8], offset: usize) -> Result<Instruction> {
		let opcode = *code.get(offset)
			.ok_or_else(|| anyhow!("instruction offset {offset} out of bounds"))?;

		if opcode == opcode::WIDE {
			let opcode = *code.get(offset + 1)
				.ok_or_else(|| anyhow!("truncated wide instruction at {offset}"))?;
			if !has_variable_operand(opcode) {
				bail!("invalid wide prefix on opcode {opcode:#x} at offset {offset}");
			}
			let index = read_u16(code, offset + 2)?;
			let constant = if opcode == opcode::IINC {
				read_u16(code, offset + 4)? as i16 as i32
			} else {
				0
			};
			return Ok(Instruction::Variable { opcode, wide: true, index, constant });
		}

		if opcode == opcode::TABLESWITCH {
			let aligned = aligned_after_opcode(offset);
			let default = read_i32(code, aligned)?;
			let low = read_i32(code, aligned + 4)?;
			let high = read_i32(code, aligned + 8)?;
			if high < low {
				bail!("tableswitch at {offset} has high case {high} below low case {low}");
			}
			let count = (high - low + 1) as usize;
			let mut jumps = Vec::with_capacity(count);
			for entry in 0..count {
				jumps.push(read_i32(code, aligned + 12 + 4 * entry)?);
			}
			return Ok(Instruction::TableSwitch { default, low, high, jumps });
		}

		if opcode == opcode::LOOKUPSWITCH {
			let aligned = aligned_after_opcode(offset);
			let default = read_i32(code, aligned)?;
			let count = read_i32(code, aligned + 4)?;
			if count < 0 {
				bail!("lookupswitch at {offset} has negative pair count {count}");
			}
			let mut cases = Vec::with_capacity(count as usize);
			let mut jumps = Vec::with_capacity(count as usize);
			for entry in 0..count as usize {
				cases.push(read_i32(code, aligned + 8 + 8 * entry)?);
				jumps.push(read_i32(code, aligned + 12 + 8 * entry)?);
			}
			return Ok(Instruction::LookupSwitch { default, cases, jumps });
		}

		if is_branch_opcode(opcode) {
			let offset_value = if opcode == opcode::GOTO_W || opcode == opcode::JSR_W {
				read_i32(code, offset + 1)?
			} else {
				read_u16(code, offset + 1)? as i16 as i32
			};
			return Ok(Instruction::Branch { opcode, offset: offset_value });
		}

		if is_variable_opcode(opcode) {
			let (index, constant) = if let Some(implied) = implied_variable_index(opcode) {
				(implied, 0)
			} else if opcode == opcode::IINC {
				(read_u8(code, offset + 1)? as u16, read_u8(code, offset + 2)? as i8 as i32)
			} else {
				(read_u8(code, offset + 1)? as u16, 0)
			};
			return Ok(Instruction::Variable { opcode, wide: false, index, constant });
		}

		if is_constant_opcode(opcode) {
			let index = if opcode == opcode::LDC {
				read_u8(code, offset + 1)? as u16
			} else {
				read_u16(code, offset + 1)?
			};
			let constant = match opcode {
				// The count byte, kept shifted so the low byte stays zero.
				opcode::INVOKEINTERFACE => (read_u8(code, offset + 3)? as i32) << 8,
				opcode::INVOKEDYNAMIC => {
					read_u16(code, offset + 3)?;
					0
				},
				opcode::MULTIANEWARRAY => read_u8(code, offset + 3)? as i32,
				_ => 0,
			};
			return Ok(Instruction::Constant { opcode, index, constant });
		}

		let constant = match opcode {
			opcode::BIPUSH => read_u8(code, offset + 1)? as i8 as i32,
			opcode::SIPUSH => read_u16(code, offset + 1)? as i16 as i32,
			opcode::NEWARRAY => read_u8(code, offset + 1)? as i32,
			_ => 0,
		};

		if opcode as usize >= MNEMONICS.len() {
			bail!("unknown opcode {opcode:#x} at offset {offset}");
		}

		Ok(Instruction::Simple { opcode, constant })
	}

	/// The encoded length of the instruction when it starts at `offset`
	/// (switch padding depends on the start).
	pub fn length(&self, offset: usize) -> usize {
		match self {
			Instruction::Simple { opcode, .. } => match *opcode {
				opcode::BIPUSH | opcode::NEWARRAY => 2,
				opcode::SIPUSH => 3,
				_ => 1,
			},
			Instruction::Variable { opcode, wide, .. } => {
				if implied_variable_index(*opcode).is_some() {
					1
				} else if *opcode == opcode::IINC {
					if *wide { 6 } else { 3 }
				} else if *wide {
					4
				} else {
					2
				}
			},
			Instruction::Constant { opcode, .. } => match *opcode {
				opcode::LDC => 2,
				opcode::INVOKEINTERFACE | opcode::INVOKEDYNAMIC => 5,
				opcode::MULTIANEWARRAY => 4,
				_ => 3,
			},
			Instruction::Branch { opcode, .. } => match *opcode {
				opcode::GOTO_W | opcode::JSR_W => 5,
				_ => 3,
			},
			Instruction::TableSwitch { jumps, .. } =>
				aligned_after_opcode(offset) - offset + 12 + 4 * jumps.len(),
			Instruction::LookupSwitch { cases, .. } =>
				aligned_after_opcode(offset) - offset + 8 + 8 * cases.len(),
		}
	}

	/// Encodes the instruction at `offset` into `out`. Callers are expected
	/// to have sized operands already (see [`crate::composer`]); values that
	/// do not fit their encoding are an error here, not silently truncated.
	pub fn write_to(&self, out: &mut Vec<u8>, offset: usize) -> Result<()> {
		match self {
			Instruction::Simple { opcode, constant } => {
				out.push(*opcode);
				match *opcode {
					opcode::BIPUSH => out.push(i8::try_from(*constant)
						.map_err(|_| anyhow!("bipush constant {constant} out of range"))? as u8),
					opcode::SIPUSH => out.extend((i16::try_from(*constant)
						.map_err(|_| anyhow!("sipush constant {constant} out of range"))? as u16).to_be_bytes()),
					opcode::NEWARRAY => out.push(u8::try_from(*constant)
						.map_err(|_| anyhow!("newarray type {constant} out of range"))?),
					_ => {},
				}
			},
			Instruction::Variable { opcode, wide, index, constant } => {
				if implied_variable_index(*opcode).is_some() {
					out.push(*opcode);
				} else if *wide {
					out.push(opcode::WIDE);
					out.push(*opcode);
					out.extend(index.to_be_bytes());
					if *opcode == opcode::IINC {
						out.extend((i16::try_from(*constant)
							.map_err(|_| anyhow!("iinc constant {constant} out of range"))? as u16).to_be_bytes());
					}
				} else {
					out.push(*opcode);
					out.push(u8::try_from(*index)
						.map_err(|_| anyhow!("variable index {index} needs the wide form"))?);
					if *opcode == opcode::IINC {
						out.push(i8::try_from(*constant)
							.map_err(|_| anyhow!("iinc constant {constant} needs the wide form"))? as u8);
					}
				}
			},
			Instruction::Constant { opcode, index, constant } => {
				out.push(*opcode);
				match *opcode {
					opcode::LDC => out.push(u8::try_from(*index)
						.map_err(|_| anyhow!("ldc pool index {index} needs ldc_w"))?),
					opcode::INVOKEINTERFACE => {
						out.extend(index.to_be_bytes());
						out.extend((*constant as u16).to_be_bytes());
					},
					opcode::INVOKEDYNAMIC => {
						out.extend(index.to_be_bytes());
						out.extend([0, 0]);
					},
					opcode::MULTIANEWARRAY => {
						out.extend(index.to_be_bytes());
						out.push(u8::try_from(*constant)
							.map_err(|_| anyhow!("multianewarray dimension count {constant} out of range"))?);
					},
					_ => out.extend(index.to_be_bytes()),
				}
			},
			Instruction::Branch { opcode, offset: branch_offset } => {
				out.push(*opcode);
				if *opcode == opcode::GOTO_W || *opcode == opcode::JSR_W {
					out.extend(branch_offset.to_be_bytes());
				} else {
					out.extend((i16::try_from(*branch_offset)
						.map_err(|_| anyhow!("branch offset {branch_offset} out of 16 bit range"))? as u16).to_be_bytes());
				}
			},
			Instruction::TableSwitch { default, low, high, jumps } => {
				out.push(opcode::TABLESWITCH);
				for _ in offset + 1..aligned_after_opcode(offset) {
					out.push(0);
				}
				out.extend(default.to_be_bytes());
				out.extend(low.to_be_bytes());
				out.extend(high.to_be_bytes());
				for jump in jumps {
					out.extend(jump.to_be_bytes());
				}
			},
			Instruction::LookupSwitch { default, cases, jumps } => {
				out.push(opcode::LOOKUPSWITCH);
				for _ in offset + 1..aligned_after_opcode(offset) {
					out.push(0);
				}
				out.extend(default.to_be_bytes());
				out.extend((cases.len() as i32).to_be_bytes());
				for (case, jump) in cases.iter().zip(jumps) {
					out.extend(case.to_be_bytes());
					out.extend(jump.to_be_bytes());
				}
			},
		}

		Ok(())
	}
}

/// The first 4-byte aligned offset after the opcode byte at `offset`.
fn aligned_after_opcode(offset: usize) -> usize {
	(offset + 4) & !3
}

fn read_u8(code: &[u8], offset: usize) -> Result<u8> {
	code.get(offset)
		.copied()
		.ok_or_else(|| anyhow!("truncated instruction, offset {offset} out of bounds"))
}

fn read_u16(code: &[u8], offset: usize) -> Result<u16> {
	Ok(u16::from_be_bytes([read_u8(code, offset)?, read_u8(code, offset + 1)?]))
}

fn read_i32(code: &[u8], offset: usize) -> Result<i32> {
	Ok(i32::from_be_bytes([
		read_u8(code, offset)?,
		read_u8(code, offset + 1)?,
		read_u8(code, offset + 2)?,
		read_u8(code, offset + 3)?,
	]))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::constants::opcode;
	use super::*;

	#[test]
	fn mnemonic_lookup() {
		assert_eq!(opcode_by_mnemonic("nop"), Some(opcode::NOP));
		assert_eq!(opcode_by_mnemonic("iload_2"), Some(0x1C));
		assert_eq!(opcode_by_mnemonic("invokedynamic"), Some(opcode::INVOKEDYNAMIC));
		assert_eq!(opcode_by_mnemonic("jsr_w"), Some(opcode::JSR_W));
		assert_eq!(opcode_by_mnemonic("apples"), None);
	}

	#[test]
	fn simple_round_trip() -> Result<()> {
		let code = [opcode::BIPUSH, 0xFE, opcode::RETURN];
		let insn = Instruction::read_from(&code, 0)?;
		assert_eq!(insn, Instruction::Simple { opcode: opcode::BIPUSH, constant: -2 });
		assert_eq!(insn.length(0), 2);

		let mut out = Vec::new();
		insn.write_to(&mut out, 0)?;
		assert_eq!(out, &code[..2]);

		Ok(())
	}

	#[test]
	fn wide_variable() -> Result<()> {
		let insn = Instruction::Variable { opcode: opcode::IINC, wide: true, index: 300, constant: -200 };
		assert_eq!(insn.length(0), 6);

		let mut out = Vec::new();
		insn.write_to(&mut out, 0)?;
		assert_eq!(Instruction::read_from(&out, 0)?, insn);

		Ok(())
	}

	#[test]
	fn implied_index_forms() -> Result<()> {
		let insn = Instruction::read_from(&[0x1C], 0)?;
		assert_eq!(insn, Instruction::Variable { opcode: 0x1C, wide: false, index: 2, constant: 0 });
		assert_eq!(insn.length(0), 1);
		assert_eq!(insn.mnemonic(), "iload_2");
		Ok(())
	}

	#[test]
	fn tableswitch_padding() -> Result<()> {
		let insn = Instruction::TableSwitch { default: 20, low: 1, high: 2, jumps: vec![12, 16] };

		// At offset 0, the opcode byte is followed by 3 padding bytes.
		assert_eq!(insn.length(0), 1 + 3 + 12 + 8);
		assert_eq!(insn.length(3), 1 + 0 + 12 + 8);

		let mut out = vec![0; 3];
		insn.write_to(&mut out, 3)?;
		assert_eq!(Instruction::read_from(&out, 3)?, insn);

		Ok(())
	}

	#[test]
	fn branch_encodings() -> Result<()> {
		let narrow = Instruction::Branch { opcode: opcode::IFEQ, offset: -4 };
		let mut out = Vec::new();
		narrow.write_to(&mut out, 0)?;
		assert_eq!(out, vec![opcode::IFEQ, 0xFF, 0xFC]);

		let wide = Instruction::Branch { opcode: opcode::GOTO_W, offset: 100_000 };
		assert_eq!(wide.length(0), 5);

		let overflow = Instruction::Branch { opcode: opcode::GOTO, offset: 100_000 };
		assert!(overflow.write_to(&mut Vec::new(), 0).is_err());

		Ok(())
	}
}
