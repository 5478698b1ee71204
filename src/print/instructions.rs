//! Printing method bodies: labels, pseudo-instructions and instructions,
//! walking the code array offset by offset.

use classfile::constants::{atype, attribute, opcode};
use classfile::insn::{self, Instruction};
use classfile::tree::attribute::{Attribute, CodeAttribute, LineNumber, LocalVariable, LocalVariableType};
use classfile::tree::class::ProgramClass;
use crate::error::{PrintError, PrintResult};
use crate::print::{self as print, constant, Printer};
use crate::types;

/// Prints the body of a code attribute as ` { … }`. Expects the labels map
/// to be populated for this attribute.
pub fn print_code_body(p: &mut Printer, class: &ProgramClass, code: &CodeAttribute) -> PrintResult<()> {
	let line_numbers = match code.find_attribute(attribute::LINE_NUMBER_TABLE) {
		Some(Attribute::LineNumberTable(lines)) => lines.as_slice(),
		_ => &[],
	};
	let local_variables = match code.find_attribute(attribute::LOCAL_VARIABLE_TABLE) {
		Some(Attribute::LocalVariableTable(locals)) => locals.as_slice(),
		_ => &[],
	};
	let local_variable_types = match code.find_attribute(attribute::LOCAL_VARIABLE_TYPE_TABLE) {
		Some(Attribute::LocalVariableTypeTable(locals)) => locals.as_slice(),
		_ => &[],
	};

	p.print_space()?;
	p.print('{')?;
	if !code.code.is_empty() {
		p.println()?;
		p.indent();
		p.indent();

		// Inclusive, so that ranges ending at the very end of the code still
		// get their end markers.
		let mut offset = 0;
		loop {
			if p.labels.contains_key(&(offset as u16)) {
				p.outdent();
				p.print_indent()?;
				p.print_offset(offset as u16)?;
				p.print(':')?;
				p.println()?;
				p.indent();
			}

			for line in line_numbers.iter().filter(|line| line.start_pc as usize == offset) {
				p.outdent();
				print_line_number(p, line)?;
				p.indent();
			}

			print_local_variable_markers(p, class, local_variables, local_variable_types, offset)?;

			for exception in code.exception_table.iter().filter(|exception| exception.handler_pc as usize == offset) {
				p.outdent();
				p.print_indent()?;
				p.print_word("catch")?;
				p.print_space()?;
				if exception.catch_type == 0 {
					// Catch type zero catches anything: a finally block.
					p.print_word("any")?;
				} else {
					let name = print::lift(class.pool.class_name(exception.catch_type))?.to_owned();
					p.print_type(&types::internal_type_from_class_type(&name))?;
				}
				p.print_space()?;
				p.print_offset(exception.start_pc)?;
				p.print_space()?;
				p.print_offset(exception.end_pc)?;
				p.println()?;
				p.indent();
			}

			if offset >= code.code.len() {
				break;
			}

			let instruction = print::lift(Instruction::read_from(&code.code, offset))?;
			p.print_indent()?;
			print_instruction(p, class, &instruction, offset)?;
			offset += instruction.length(offset);
			p.println()?;
		}

		p.outdent();
		p.outdent();
		p.print_indent()?;
	}

	p.print('}')
}

fn print_line_number(p: &mut Printer, line: &LineNumber) -> PrintResult<()> {
	p.print_indent()?;
	p.print_word("line")?;
	p.print_space()?;
	p.print_number(line.line as f64)?;
	p.println()
}

fn print_local_variable_markers(
	p: &mut Printer,
	class: &ProgramClass,
	local_variables: &[LocalVariable],
	local_variable_types: &[LocalVariableType],
	offset: usize,
) -> PrintResult<()> {
	for local in local_variables.iter().filter(|local| local.start_pc as usize == offset) {
		p.outdent();
		p.print_indent()?;
		p.print_word("startlocalvar")?;
		p.print_space()?;
		p.print_number(local.index as f64)?;
		p.print_space()?;
		p.print_type(print::lift(class.pool.utf8(local.descriptor))?)?;
		p.print_space()?;
		p.print_word(print::lift(class.pool.utf8(local.name))?)?;
		p.println()?;
		p.indent();
	}

	for local in local_variables.iter().filter(|local| local.start_pc as usize + local.length as usize == offset) {
		p.outdent();
		p.print_indent()?;
		p.print_word("endlocalvar")?;
		p.print_space()?;
		p.print_number(local.index as f64)?;
		p.println()?;
		p.indent();
	}

	for local in local_variable_types.iter().filter(|local| local.start_pc as usize == offset) {
		p.outdent();
		p.print_indent()?;
		p.print_word("startlocalvartype")?;
		p.print_space()?;
		p.print_number(local.index as f64)?;
		p.print_space()?;
		let signature = print::lift(class.pool.utf8(local.signature))?.to_owned();
		p.print_string(&signature)?;
		p.print_space()?;
		p.print_word(print::lift(class.pool.utf8(local.name))?)?;
		p.println()?;
		p.indent();
	}

	for local in local_variable_types.iter().filter(|local| local.start_pc as usize + local.length as usize == offset) {
		p.outdent();
		p.print_indent()?;
		p.print_word("endlocalvartype")?;
		p.print_space()?;
		p.print_number(local.index as f64)?;
		p.println()?;
		p.indent();
	}

	Ok(())
}

fn print_instruction(p: &mut Printer, class: &ProgramClass, instruction: &Instruction, offset: usize) -> PrintResult<()> {
	p.print_word(instruction.mnemonic())?;

	match instruction {
		Instruction::Simple { opcode: op, constant } => match *op {
			opcode::BIPUSH | opcode::SIPUSH => {
				p.print_space()?;
				p.print_number(*constant as f64)
			},
			opcode::NEWARRAY => {
				p.print_space()?;
				p.print_type(internal_type_from_array_type(*constant as u8)?)
			},
			_ => Ok(()),
		},
		Instruction::Variable { opcode: op, wide, index, constant } => {
			if *wide {
				p.print_word("_w")?;
			}
			if insn::has_variable_operand(*op) {
				p.print_space()?;
				p.print_number(*index as f64)?;
			}
			if *op == opcode::IINC {
				p.print_space()?;
				p.print_number(*constant as f64)?;
			}
			Ok(())
		},
		Instruction::Constant { opcode: op, index, constant } => {
			p.print_space()?;
			constant::print_constant(p, class, *index, 0, true)?;
			if *op == opcode::MULTIANEWARRAY {
				p.print_space()?;
				p.print_number(*constant as f64)?;
			}
			Ok(())
		},
		Instruction::Branch { offset: relative, .. } => {
			p.print_space()?;
			p.print_offset((offset as i64 + *relative as i64) as u16)
		},
		Instruction::TableSwitch { default, low, jumps, .. } => {
			p.print_space()?;
			p.print('{')?;
			p.println()?;
			p.indent();
			for (position, jump) in jumps.iter().enumerate() {
				p.print_indent()?;
				p.print_word("case")?;
				p.print_space()?;
				p.print_number((*low as i64 + position as i64) as f64)?;
				p.print(':')?;
				p.print_space()?;
				p.print_offset((offset as i64 + *jump as i64) as u16)?;
				p.println()?;
			}
			print_switch_default(p, offset, *default)
		},
		Instruction::LookupSwitch { default, cases, jumps } => {
			p.print_space()?;
			p.print('{')?;
			p.println()?;
			p.indent();
			for (case, jump) in cases.iter().zip(jumps) {
				p.print_indent()?;
				p.print_word("case")?;
				p.print_space()?;
				p.print_number(*case as f64)?;
				p.print(':')?;
				p.print_space()?;
				p.print_offset((offset as i64 + *jump as i64) as u16)?;
				p.println()?;
			}
			print_switch_default(p, offset, *default)
		},
	}
}

fn print_switch_default(p: &mut Printer, offset: usize, default: i32) -> PrintResult<()> {
	p.print_indent()?;
	p.print_word("default")?;
	p.print(':')?;
	p.print_space()?;
	p.print_offset((offset as i64 + default as i64) as u16)?;
	p.println()?;
	p.outdent();
	p.print_indent()?;
	p.print('}')
}

fn internal_type_from_array_type(value: u8) -> PrintResult<&'static str> {
	Ok(match value {
		atype::T_BOOLEAN => "Z",
		atype::T_CHAR => "C",
		atype::T_FLOAT => "F",
		atype::T_DOUBLE => "D",
		atype::T_BYTE => "B",
		atype::T_SHORT => "S",
		atype::T_INT => "I",
		atype::T_LONG => "J",
		_ => return Err(PrintError::new(format!("Unknown array type {value}."))),
	})
}
