//! The code attribute composer.
//!
//! Callers append labels and instructions in source order; branch targets,
//! exception table bounds, line numbers and local variable ranges all refer
//! to *symbolic* labels (small integers handed out by the caller). The
//! composer lays the instructions out on [`end_code_fragment`], binding
//! every label to a physical bytecode offset, widening `goto`/`jsr` and
//! variable instructions whose operands do not fit the narrow encoding,
//! and rewriting every table that referenced a label.
//!
//! [`end_code_fragment`]: CodeComposer::end_code_fragment

use std::collections::HashMap;
use anyhow::{anyhow, bail, Context, Result};
use crate::constants::opcode;
use crate::descriptors;
use crate::insn::Instruction;
use crate::pool::ConstantPool;
use crate::tree::annotation::{TargetInfo, TypeAnnotation};
use crate::tree::attribute::{Attribute, CodeAttribute, ExceptionInfo, LineNumber};

#[derive(Debug)]
enum Entry {
	Label(u16),
	Instruction(Instruction),
}

#[derive(Debug)]
pub struct CodeComposer {
	max_labels: u16,
	entries: Vec<Entry>,
	exceptions: Vec<ExceptionInfo>,
	line_numbers: Vec<LineNumber>,
}

impl CodeComposer {
	pub fn begin_code_fragment(max_labels: u16) -> CodeComposer {
		CodeComposer {
			max_labels,
			entries: Vec::new(),
			exceptions: Vec::new(),
			line_numbers: Vec::new(),
		}
	}

	/// Binds the symbolic `label` to the current position of the instruction
	/// stream.
	pub fn append_label(&mut self, label: u16) -> Result<()> {
		if label > self.max_labels {
			bail!("label {label} exceeds the maximum of {}", self.max_labels);
		}

		self.entries.push(Entry::Label(label));
		Ok(())
	}

	pub fn append_instruction(&mut self, instruction: Instruction) {
		self.entries.push(Entry::Instruction(instruction));
	}

	/// Adds an exception handler whose pcs are symbolic labels.
	pub fn append_exception(&mut self, exception: ExceptionInfo) {
		self.exceptions.push(exception);
	}

	/// Adds a line number whose start pc is a symbolic label.
	pub fn insert_line_number(&mut self, line_number: LineNumber) {
		self.line_numbers.push(line_number);
	}

	/// Lays out the composed instructions into `code`.
	///
	/// Fills in the bytecode array and the exception table, attaches a
	/// `LineNumberTable` if lines were recorded, rewrites symbolic offsets
	/// inside any local variable tables and type annotations already present
	/// on `code`, and computes `max_stack`/`max_locals` (`min_locals` is the
	/// slot count of the method parameters including the receiver).
	pub fn end_code_fragment(self, code: &mut CodeAttribute, pool: &ConstantPool, min_locals: u16) -> Result<()> {
		let CodeComposer { entries, exceptions, line_numbers, .. } = self;

		// Normalize instructions whose operands require a wider encoding
		// than the mnemonic they were written with.
		let mut entries = entries;
		for entry in &mut entries {
			match entry {
				Entry::Instruction(Instruction::Variable { opcode, wide, index, constant }) => {
					if *index > 0xFF || (*opcode == opcode::IINC && i8::try_from(*constant).is_err()) {
						*wide = true;
					}
				},
				Entry::Instruction(Instruction::Constant { opcode, index, .. }) => {
					if *opcode == opcode::LDC && *index > 0xFF {
						*opcode = opcode::LDC_W;
					}
				},
				_ => {},
			}
		}

		let labels = layout(&mut entries)?;

		// Emit, resolving symbolic targets to relative offsets.
		let mut bytes = Vec::new();
		for entry in &entries {
			if let Entry::Instruction(instruction) = entry {
				let start = bytes.len();
				let mut resolved = instruction.clone();
				match &mut resolved {
					Instruction::Branch { offset, .. } => {
						*offset = resolve(&labels, *offset as u16)? as i32 - start as i32;
					},
					Instruction::TableSwitch { default, jumps, .. } => {
						*default = resolve(&labels, *default as u16)? as i32 - start as i32;
						for jump in jumps {
							*jump = resolve(&labels, *jump as u16)? as i32 - start as i32;
						}
					},
					Instruction::LookupSwitch { default, jumps, .. } => {
						*default = resolve(&labels, *default as u16)? as i32 - start as i32;
						for jump in jumps {
							*jump = resolve(&labels, *jump as u16)? as i32 - start as i32;
						}
					},
					_ => {},
				}
				resolved.write_to(&mut bytes, start)?;
			}
		}

		code.code = bytes;

		code.exception_table = exceptions.into_iter()
			.map(|exception| Ok(ExceptionInfo {
				start_pc: resolve(&labels, exception.start_pc)?,
				end_pc: resolve(&labels, exception.end_pc)?,
				handler_pc: resolve(&labels, exception.handler_pc)?,
				catch_type: exception.catch_type,
			}))
			.collect::<Result<_>>()?;

		if !line_numbers.is_empty() {
			let line_numbers = line_numbers.into_iter()
				.map(|line| Ok(LineNumber {
					start_pc: resolve(&labels, line.start_pc)?,
					line: line.line,
				}))
				.collect::<Result<_>>()?;
			code.attributes.push(Attribute::LineNumberTable(line_numbers));
		}

		remap_nested_attributes(&mut code.attributes, &labels)?;

		code.max_locals = max_locals(&code.code, min_locals)?;
		code.max_stack = max_stack(&code.code, &code.exception_table, pool)?;

		Ok(())
	}
}

/// Assigns a physical offset to every entry, widening branches until the
/// layout is stable, and returns the label binding.
fn layout(entries: &mut [Entry]) -> Result<HashMap<u16, u16>> {
	for _ in 0..100 {
		let mut labels = HashMap::new();
		let mut starts = Vec::with_capacity(entries.len());
		let mut offset = 0usize;

		for entry in entries.iter() {
			starts.push(offset);
			match entry {
				Entry::Label(label) => {
					if labels.insert(*label, offset).is_some() {
						bail!("label {label} is defined more than once");
					}
				},
				Entry::Instruction(instruction) => {
					offset += instruction.length(offset);
				},
			}
		}

		if offset > 0xFFFF {
			bail!("code size {offset} exceeds the 65535 byte limit");
		}

		// Widen any goto/jsr whose target no longer fits 16 bits. A widening
		// only grows the code, so this converges.
		let mut widened = false;
		for (entry, start) in entries.iter_mut().zip(&starts) {
			if let Entry::Instruction(Instruction::Branch { opcode: op, offset: target }) = entry {
				let target_offset = *labels.get(&(*target as u16))
					.ok_or_else(|| anyhow!("branch references undefined label {target}"))?;
				let delta = target_offset as i64 - *start as i64;
				if i16::try_from(delta).is_err() && (*op == opcode::GOTO || *op == opcode::JSR) {
					*op = if *op == opcode::GOTO { opcode::GOTO_W } else { opcode::JSR_W };
					widened = true;
				}
			}
		}

		if !widened {
			return Ok(labels.into_iter()
				.map(|(label, offset)| (label, offset as u16))
				.collect());
		}
	}

	bail!("code layout did not converge");
}

fn resolve(labels: &HashMap<u16, u16>, label: u16) -> Result<u16> {
	labels.get(&label)
		.copied()
		.ok_or_else(|| anyhow!("undefined label {label}"))
}

/// Rewrites the symbolic offsets the instructions parser left in local
/// variable tables and type annotations to physical ones.
fn remap_nested_attributes(attributes: &mut [Attribute], labels: &HashMap<u16, u16>) -> Result<()> {
	for attribute in attributes {
		match attribute {
			Attribute::LocalVariableTable(table) => {
				for local in table {
					let start = resolve(labels, local.start_pc)?;
					let end = resolve(labels, local.start_pc.wrapping_add(local.length))?;
					local.start_pc = start;
					local.length = end - start;
				}
			},
			Attribute::LocalVariableTypeTable(table) => {
				for local in table {
					let start = resolve(labels, local.start_pc)?;
					let end = resolve(labels, local.start_pc.wrapping_add(local.length))?;
					local.start_pc = start;
					local.length = end - start;
				}
			},
			Attribute::RuntimeVisibleTypeAnnotations(annotations)
			| Attribute::RuntimeInvisibleTypeAnnotations(annotations) => {
				for annotation in annotations {
					remap_type_annotation(annotation, labels)?;
				}
			},
			_ => {},
		}
	}

	Ok(())
}

fn remap_type_annotation(annotation: &mut TypeAnnotation, labels: &HashMap<u16, u16>) -> Result<()> {
	match &mut annotation.target_info {
		TargetInfo::Offset { offset, .. } => *offset = resolve(labels, *offset)?,
		TargetInfo::TypeArgument { offset, .. } => *offset = resolve(labels, *offset)?,
		TargetInfo::LocalVariable { table, .. } => {
			for target in table {
				let start = resolve(labels, target.start_pc)?;
				let end = resolve(labels, target.start_pc.wrapping_add(target.length))?;
				target.start_pc = start;
				target.length = end - start;
			}
		},
		_ => {},
	}

	Ok(())
}

fn max_locals(code: &[u8], min_locals: u16) -> Result<u16> {
	let mut max = min_locals as u32;

	let mut offset = 0;
	while offset < code.len() {
		let instruction = Instruction::read_from(code, offset)?;
		if let Instruction::Variable { opcode: op, index, .. } = &instruction {
			let width = match *op {
				opcode::LLOAD | opcode::DLOAD | opcode::LSTORE | opcode::DSTORE => 2,
				x if (opcode::LLOAD_0..opcode::LLOAD_0 + 4).contains(&x) => 2,
				x if (opcode::DLOAD_0..opcode::DLOAD_0 + 4).contains(&x) => 2,
				x if (opcode::LSTORE_0..opcode::LSTORE_0 + 4).contains(&x) => 2,
				x if (opcode::DSTORE_0..opcode::DSTORE_0 + 4).contains(&x) => 2,
				_ => 1,
			};
			max = max.max(*index as u32 + width);
		}
		offset += instruction.length(offset);
	}

	u16::try_from(max).map_err(|_| anyhow!("max locals {max} out of range"))
}

/// Computes the maximum operand stack depth by walking all paths through
/// the bytecode. Depths are measured at instruction boundaries, which is
/// where the limit applies.
fn max_stack(code: &[u8], exceptions: &[ExceptionInfo], pool: &ConstantPool) -> Result<u16> {
	if code.is_empty() {
		return Ok(0);
	}

	let mut depths: HashMap<usize, i32> = HashMap::new();
	let mut work: Vec<(usize, i32)> = vec![(0, 0)];
	for exception in exceptions {
		// A handler starts with the thrown reference on the stack.
		work.push((exception.handler_pc as usize, 1));
	}

	let mut max = 0;
	while let Some((offset, depth)) = work.pop() {
		if let Some(&known) = depths.get(&offset) {
			if known >= depth {
				continue;
			}
		}
		depths.insert(offset, depth);
		max = max.max(depth);

		if offset >= code.len() {
			bail!("execution runs off the end of the code at offset {offset}");
		}

		let instruction = Instruction::read_from(code, offset)?;
		let depth = depth + stack_delta(&instruction, pool)
			.with_context(|| anyhow!("at bytecode offset {offset}"))?;
		if depth < 0 {
			bail!("operand stack underflow at bytecode offset {offset}");
		}
		max = max.max(depth);

		let next = offset + instruction.length(offset);
		match &instruction {
			Instruction::Branch { opcode: op, offset: relative } => {
				work.push(((offset as i64 + *relative as i64) as usize, depth));
				if !matches!(*op, opcode::GOTO | opcode::GOTO_W) {
					work.push((next, depth));
				}
			},
			Instruction::TableSwitch { default, jumps, .. } => {
				work.push(((offset as i64 + *default as i64) as usize, depth));
				for jump in jumps {
					work.push(((offset as i64 + *jump as i64) as usize, depth));
				}
			},
			Instruction::LookupSwitch { default, jumps, .. } => {
				work.push(((offset as i64 + *default as i64) as usize, depth));
				for jump in jumps {
					work.push(((offset as i64 + *jump as i64) as usize, depth));
				}
			},
			instruction if is_terminal(instruction.opcode()) => {},
			_ => work.push((next, depth)),
		}
	}

	u16::try_from(max).map_err(|_| anyhow!("max stack {max} out of range"))
}

fn is_terminal(op: u8) -> bool {
	matches!(op, opcode::IRETURN..=opcode::RETURN | opcode::ATHROW | opcode::RET)
}

/// The net operand stack effect of one instruction.
fn stack_delta(instruction: &Instruction, pool: &ConstantPool) -> Result<i32> {
	let op = instruction.opcode();

	Ok(match instruction {
		Instruction::Simple { .. } => match op {
			opcode::NOP => 0,
			opcode::ACONST_NULL..=opcode::ICONST_5 => 1,
			// lconst/dconst push a category 2 value, fconst a category 1.
			0x09 | 0x0A | 0x0E | 0x0F => 2,
			0x0B..=0x0D => 1,
			opcode::BIPUSH | opcode::SIPUSH => 1,
			// Array loads pop index and arrayref.
			0x2F | 0x31 => 0,
			opcode::IALOAD..=opcode::SALOAD => -1,
			// Array stores.
			0x50 | 0x52 => -4,
			opcode::IASTORE..=opcode::SASTORE => -3,
			opcode::POP => -1,
			opcode::POP2 => -2,
			opcode::DUP | opcode::DUP_X1 | opcode::DUP_X2 => 1,
			opcode::DUP2 | opcode::DUP2_X1 | opcode::DUP2_X2 => 2,
			opcode::SWAP => 0,
			// Binary arithmetic; the long/double variants consume two slots
			// per operand.
			0x61 | 0x63 | 0x65 | 0x67 | 0x69 | 0x6B | 0x6D | 0x6F | 0x71 | 0x73 => -2,
			0x60 | 0x62 | 0x64 | 0x66 | 0x68 | 0x6A | 0x6C | 0x6E | 0x70 | 0x72 => -1,
			// Negations.
			0x74..=0x77 => 0,
			// Shifts: the shift amount is always an int.
			0x78 | 0x7A | 0x7C => -1,
			0x79 | 0x7B | 0x7D => -1,
			// and/or/xor.
			0x7E | 0x80 | 0x82 => -1,
			0x7F | 0x81 | 0x83 => -2,
			// Conversions.
			opcode::I2L => 1,
			0x86 => 0,
			0x87 => 1,
			0x88 => -1,
			0x89 => -1,
			0x8A => 0,
			0x8B => 0,
			0x8C => 1,
			0x8D => 1,
			0x8E => -1,
			0x8F => 0,
			0x90 => -1,
			0x91..=opcode::I2S => 0,
			opcode::LCMP => -3,
			0x95 | 0x96 => -1,
			0x97 | opcode::DCMPG => -3,
			opcode::IRETURN | opcode::FRETURN | opcode::ARETURN => -1,
			opcode::LRETURN | opcode::DRETURN => -2,
			opcode::RETURN => 0,
			opcode::ARRAYLENGTH => 0,
			opcode::ATHROW => 0,
			opcode::NEWARRAY => 0,
			opcode::MONITORENTER | opcode::MONITOREXIT => -1,
			x => bail!("no stack effect known for opcode {x:#x}"),
		},
		Instruction::Variable { .. } => match op {
			opcode::ILOAD | opcode::FLOAD | opcode::ALOAD => 1,
			opcode::LLOAD | opcode::DLOAD => 2,
			opcode::ISTORE | opcode::FSTORE | opcode::ASTORE => -1,
			opcode::LSTORE | opcode::DSTORE => -2,
			opcode::IINC | opcode::RET => 0,
			x if (opcode::ILOAD_0..=opcode::ALOAD_3).contains(&x) => {
				if (opcode::LLOAD_0..opcode::LLOAD_0 + 4).contains(&x) || (opcode::DLOAD_0..opcode::DLOAD_0 + 4).contains(&x) { 2 } else { 1 }
			},
			x if (opcode::ISTORE_0..=opcode::ASTORE_3).contains(&x) => {
				if (opcode::LSTORE_0..opcode::LSTORE_0 + 4).contains(&x) || (opcode::DSTORE_0..opcode::DSTORE_0 + 4).contains(&x) { -2 } else { -1 }
			},
			x => bail!("no stack effect known for variable opcode {x:#x}"),
		},
		Instruction::Constant { index, constant, .. } => match op {
			opcode::LDC | opcode::LDC_W => 1,
			opcode::LDC2_W => 2,
			opcode::NEW => 1,
			opcode::ANEWARRAY | opcode::CHECKCAST | opcode::INSTANCEOF => 0,
			opcode::MULTIANEWARRAY => 1 - constant,
			opcode::GETSTATIC => descriptors::field_type_size(pool.ref_type(*index)?) as i32,
			opcode::PUTSTATIC => -(descriptors::field_type_size(pool.ref_type(*index)?) as i32),
			opcode::GETFIELD => descriptors::field_type_size(pool.ref_type(*index)?) as i32 - 1,
			opcode::PUTFIELD => -(descriptors::field_type_size(pool.ref_type(*index)?) as i32) - 1,
			opcode::INVOKESTATIC | opcode::INVOKEDYNAMIC => {
				let descriptor = pool.ref_descriptor(*index)?;
				descriptors::method_return_size(descriptor)? as i32 - descriptors::method_parameter_size(descriptor)? as i32
			},
			opcode::INVOKEVIRTUAL | opcode::INVOKESPECIAL | opcode::INVOKEINTERFACE => {
				let descriptor = pool.ref_descriptor(*index)?;
				descriptors::method_return_size(descriptor)? as i32 - descriptors::method_parameter_size(descriptor)? as i32 - 1
			},
			x => bail!("no stack effect known for constant opcode {x:#x}"),
		},
		Instruction::Branch { .. } => match op {
			opcode::GOTO | opcode::GOTO_W => 0,
			opcode::JSR | opcode::JSR_W => 1,
			opcode::IFEQ..=opcode::IFLE | opcode::IFNULL | opcode::IFNONNULL => -1,
			opcode::IF_ICMPEQ..=opcode::IF_ACMPNE => -2,
			x => bail!("no stack effect known for branch opcode {x:#x}"),
		},
		Instruction::TableSwitch { .. } | Instruction::LookupSwitch { .. } => -1,
	})
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::constants::opcode;
	use super::*;

	fn compose(build: impl FnOnce(&mut CodeComposer) -> Result<()>) -> Result<CodeAttribute> {
		let mut composer = CodeComposer::begin_code_fragment(65534);
		build(&mut composer)?;

		let mut code = CodeAttribute::default();
		composer.end_code_fragment(&mut code, &ConstantPool::new(), 1)?;
		Ok(code)
	}

	#[test]
	fn forward_and_backward_branches() -> Result<()> {
		// 0: iload_0  1: ifeq +5  4: iconst_1  5: ireturn  6(label): iconst_0  7: ireturn
		let code = compose(|composer| {
			composer.append_instruction(Instruction::create(0x1A, false)?);
			composer.append_instruction(Instruction::Branch { opcode: opcode::IFEQ, offset: 1 });
			composer.append_instruction(Instruction::create(0x04, false)?);
			composer.append_instruction(Instruction::create(opcode::IRETURN, false)?);
			composer.append_label(1)?;
			composer.append_instruction(Instruction::create(0x03, false)?);
			composer.append_instruction(Instruction::create(opcode::IRETURN, false)?);
			Ok(())
		})?;

		assert_eq!(code.code, vec![0x1A, opcode::IFEQ, 0x00, 0x05, 0x04, opcode::IRETURN, 0x03, opcode::IRETURN]);
		assert_eq!(code.max_stack, 1);
		assert_eq!(code.max_locals, 1);

		Ok(())
	}

	#[test]
	fn duplicate_label_definition() {
		let result = compose(|composer| {
			composer.append_label(1)?;
			composer.append_instruction(Instruction::create(opcode::RETURN, false)?);
			composer.append_label(1)?;
			Ok(())
		});
		assert!(result.is_err());
	}

	#[test]
	fn undefined_label() {
		let result = compose(|composer| {
			composer.append_instruction(Instruction::Branch { opcode: opcode::GOTO, offset: 7 });
			Ok(())
		});
		assert!(result.is_err());
	}

	#[test]
	fn exception_table_resolution() -> Result<()> {
		let code = compose(|composer| {
			composer.append_label(1)?;
			composer.append_instruction(Instruction::create(opcode::NOP, false)?);
			composer.append_label(2)?;
			composer.append_exception(ExceptionInfo { start_pc: 1, end_pc: 2, handler_pc: 2, catch_type: 0 });
			composer.append_instruction(Instruction::create(opcode::ATHROW, false)?);
			Ok(())
		})?;

		assert_eq!(code.exception_table, vec![ExceptionInfo { start_pc: 0, end_pc: 1, handler_pc: 1, catch_type: 0 }]);
		// The handler entry has the thrown reference on the stack.
		assert_eq!(code.max_stack, 1);

		Ok(())
	}

	#[test]
	fn wide_variable_normalization() -> Result<()> {
		let code = compose(|composer| {
			composer.append_instruction(Instruction::Variable { opcode: opcode::ILOAD, wide: false, index: 300, constant: 0 });
			composer.append_instruction(Instruction::create(opcode::IRETURN, false)?);
			Ok(())
		})?;

		assert_eq!(code.code, vec![opcode::WIDE, opcode::ILOAD, 0x01, 0x2C, opcode::IRETURN]);
		assert_eq!(code.max_locals, 301);

		Ok(())
	}

	#[test]
	fn line_numbers_become_an_attribute() -> Result<()> {
		let code = compose(|composer| {
			composer.append_label(1)?;
			composer.insert_line_number(LineNumber { start_pc: 1, line: 42 });
			composer.append_instruction(Instruction::create(opcode::RETURN, false)?);
			Ok(())
		})?;

		assert_eq!(code.attributes, vec![Attribute::LineNumberTable(vec![LineNumber { start_pc: 0, line: 42 }])]);

		Ok(())
	}

	#[test]
	fn tableswitch_layout() -> Result<()> {
		let code = compose(|composer| {
			composer.append_instruction(Instruction::create(0x03, false)?);
			composer.append_instruction(Instruction::TableSwitch { default: 1, low: 0, high: 1, jumps: vec![1, 2] });
			composer.append_label(1)?;
			composer.append_instruction(Instruction::create(opcode::RETURN, false)?);
			composer.append_label(2)?;
			composer.append_instruction(Instruction::create(opcode::RETURN, false)?);
			Ok(())
		})?;

		// iconst_0 at 0, tableswitch at 1: 2 pad bytes after the opcode,
		// then default, low, high and two jumps, then the two returns.
		assert_eq!(code.code.len(), 26);
		let insn = Instruction::read_from(&code.code, 1)?;
		assert_eq!(insn, Instruction::TableSwitch { default: 23, low: 0, high: 1, jumps: vec![23, 24] });

		Ok(())
	}
}
