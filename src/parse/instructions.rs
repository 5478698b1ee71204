//! Parsing method bodies: mnemonics, operands and pseudo-instructions,
//! feeding the code composer.

use std::collections::HashMap;
use classfile::composer::CodeComposer;
use classfile::constants::{access, atype, opcode};
use classfile::descriptors;
use classfile::insn::{self, Instruction};
use classfile::tree::attribute::{Attribute, CodeAttribute, ExceptionInfo, LineNumber, LocalVariable, LocalVariableType};
use classfile::tree::class::ProgramClass;
use crate::error::ParseResult;
use crate::parse::{attributes, constant, Parser};
use crate::parse::attributes::AttributeTarget;
use crate::types;

/// The composer caps symbolic labels; one short of the 16 bit range, so
/// that the end of the largest possible method is still addressable.
const MAX_LABELS: u16 = 65534;

/// Parses a Code attribute.
///
/// In the `explicit` form (the `Code` keyword inside an attribute block) an
/// optional nested attribute block and the opening `{` are parsed here; in
/// the shorthand form the caller has already consumed the `{`.
pub fn parse_code_attribute(
	p: &mut Parser,
	class: &mut ProgramClass,
	access_flags: u16,
	descriptor: &str,
	explicit: bool,
) -> ParseResult<Attribute> {
	// Label names are scoped to one method body.
	let saved_labels = std::mem::take(&mut p.labels);
	let result = parse_code(p, class, access_flags, descriptor, explicit);
	p.labels = saved_labels;
	result
}

fn parse_code(
	p: &mut Parser,
	class: &mut ProgramClass,
	access_flags: u16,
	descriptor: &str,
	explicit: bool,
) -> ParseResult<Attribute> {
	let mut code = CodeAttribute::default();
	let mut composer = CodeComposer::begin_code_fragment(MAX_LABELS);

	if explicit {
		if p.accept_punct('[')? {
			let mut nested = Vec::new();
			let target = AttributeTarget::Method { access_flags, descriptor };
			attributes::parse_attributes(p, class, target, &mut nested)?;
			code.attributes = nested;
		}

		p.expect_punct('{', "code open")?;
	}

	let mut local_variables: Vec<LocalVariable> = Vec::new();
	let mut local_variable_types: Vec<LocalVariableType> = Vec::new();
	let mut local_variable_by_index: HashMap<u16, usize> = HashMap::new();
	let mut local_variable_type_by_index: HashMap<u16, usize> = HashMap::new();

	while !p.accept_punct('}')? {
		let word = p.expect_word("instruction opcode")?;

		if let Some((op, wide)) = match_mnemonic(&word) {
			let mut instruction = p.lift(Instruction::create(op, wide))?;
			parse_operands(p, class, &mut instruction)?;
			composer.append_instruction(instruction);
			continue;
		}

		match word.as_str() {
			"startlocalvar" => {
				let index = p.expect_number("local variable index")? as u16;
				let start_pc = synthetic_label(p, &mut composer)?;
				let variable_descriptor = p.expect_type("local variable descriptor")?;
				let name = p.expect_word("local variable name")?;

				local_variable_by_index.insert(index, local_variables.len());
				local_variables.push(LocalVariable {
					start_pc,
					length: 0,
					name: p.lift(class.pool.add_utf8(&name))?,
					descriptor: p.lift(class.pool.add_utf8(&variable_descriptor))?,
					index,
				});
			},
			"endlocalvar" => {
				let index = p.expect_number("local variable index")? as u16;
				let Some(&position) = local_variable_by_index.get(&index) else {
					return p.fail(format!("Local var end without associated start ({index})."));
				};
				let end_pc = synthetic_label(p, &mut composer)?;
				let local = &mut local_variables[position];
				local.length = end_pc.wrapping_sub(local.start_pc);
			},
			"startlocalvartype" => {
				let index = p.expect_number("local variable type index")? as u16;
				let start_pc = synthetic_label(p, &mut composer)?;
				let signature = p.expect_string("local variable type signature")?;
				let name = p.expect_word("local variable type name")?;

				local_variable_type_by_index.insert(index, local_variable_types.len());
				local_variable_types.push(LocalVariableType {
					start_pc,
					length: 0,
					name: p.lift(class.pool.add_utf8(&name))?,
					signature: p.lift(class.pool.add_utf8(&signature))?,
					index,
				});
			},
			"endlocalvartype" => {
				let index = p.expect_number("local variable type index")? as u16;
				let Some(&position) = local_variable_type_by_index.get(&index) else {
					return p.fail(format!("Local var type end without associated start ({index})."));
				};
				let end_pc = synthetic_label(p, &mut composer)?;
				let local = &mut local_variable_types[position];
				local.length = end_pc.wrapping_sub(local.start_pc);
			},
			"catch" => {
				let class_type = types::internal_class_type_from_type(&p.expect_type("catch type")?);
				// Catch type zero catches anything: a finally block.
				let catch_type = if class_type == "any" {
					0
				} else {
					p.lift(class.pool.add_class(&class_type))?
				};
				let start_pc = p.expect_offset()?;
				let end_pc = p.expect_offset()?;
				let handler_pc = synthetic_label(p, &mut composer)?;
				composer.append_exception(ExceptionInfo { start_pc, end_pc, handler_pc, catch_type });
			},
			"line" => {
				let start_pc = synthetic_label(p, &mut composer)?;
				let line = p.expect_number("line number")? as u16;
				composer.insert_line_number(LineNumber { start_pc, line });
			},
			_ => {
				// Any other word defines a label at the current offset.
				if !p.accept_punct(':')? {
					return p.fail(format!("Unknown instruction {word}."));
				}
				let fresh = p.fresh_label()?;
				let offset = *p.labels.entry(word).or_insert(fresh);
				p.lift(composer.append_label(offset))?;
			},
		}
	}

	if !local_variables.is_empty() {
		code.attributes.push(Attribute::LocalVariableTable(local_variables));
	}
	if !local_variable_types.is_empty() {
		code.attributes.push(Attribute::LocalVariableTypeTable(local_variable_types));
	}

	let mut min_locals = p.lift(descriptors::method_parameter_size(descriptor))? as u16;
	if access_flags & access::STATIC == 0 {
		min_locals += 1;
	}

	p.lift(composer.end_code_fragment(&mut code, &class.pool, min_locals))?;

	Ok(Attribute::Code(code))
}

/// Resolves a mnemonic to an opcode; the `_w` suffix selects the wide form
/// of variable instructions.
fn match_mnemonic(word: &str) -> Option<(u8, bool)> {
	if let Some(op) = insn::opcode_by_mnemonic(word) {
		return Some((op, false));
	}

	word.strip_suffix("_w")
		.and_then(insn::opcode_by_mnemonic)
		.map(|op| (op, true))
}

/// Marks the current position with a fresh label that source labels cannot
/// collide with, and returns it.
fn synthetic_label(p: &mut Parser, composer: &mut CodeComposer) -> ParseResult<u16> {
	let offset = p.synthetic_offset()?;
	p.lift(composer.append_label(offset))?;
	Ok(offset)
}

fn parse_operands(p: &mut Parser, class: &mut ProgramClass, instruction: &mut Instruction) -> ParseResult<()> {
	match instruction {
		Instruction::Simple { opcode: op, constant } => match *op {
			opcode::BIPUSH | opcode::SIPUSH => {
				*constant = p.expect_number("push constant")? as i32;
			},
			opcode::NEWARRAY => {
				let element_type = p.expect_type("newarray type")?;
				*constant = match array_type_from_internal(element_type.as_bytes()[0]) {
					Some(value) => value as i32,
					None => return p.fail(format!("Unknown newarray type {}.", types::external_type(&element_type))),
				};
			},
			_ => {},
		},
		Instruction::Variable { opcode: op, index, constant, .. } => {
			if insn::has_variable_operand(*op) {
				*index = p.expect_number("variable index")? as u16;
			}
			if *op == opcode::IINC {
				*constant = p.expect_number("iinc constant")? as i32;
			}
		},
		Instruction::Constant { opcode: op, index, constant } => match *op {
			opcode::LDC | opcode::LDC_W | opcode::LDC2_W => {
				*index = constant::parse_loadable(p, class)?;
			},
			opcode::GETSTATIC | opcode::PUTSTATIC | opcode::GETFIELD | opcode::PUTFIELD => {
				*index = constant::parse_field_ref(p, class)?;
			},
			opcode::INVOKEVIRTUAL | opcode::INVOKESPECIAL | opcode::INVOKESTATIC => {
				*index = constant::parse_method_ref(p, class)?;
			},
			opcode::INVOKEINTERFACE => {
				*index = constant::parse_interface_method_ref(p, class)?;
				let parameter_size = p.lift(class.pool.ref_type(*index)
					.and_then(descriptors::method_parameter_size))?;
				*constant = (parameter_size as i32 + 1) << 8;
			},
			opcode::INVOKEDYNAMIC => {
				*index = constant::parse_invoke_dynamic(p, class)?;
			},
			opcode::NEW | opcode::ANEWARRAY | opcode::CHECKCAST | opcode::INSTANCEOF => {
				*index = constant::parse_class(p, class)?;
			},
			opcode::MULTIANEWARRAY => {
				*index = constant::parse_class(p, class)?;
				*constant = p.expect_number("array dimensions")? as i32;
			},
			_ => {},
		},
		Instruction::Branch { offset, .. } => {
			*offset = p.expect_offset()? as i32;
		},
		Instruction::TableSwitch { default, low, high, jumps } => {
			let mut bounds: Option<(i32, i32)> = None;

			p.expect_punct('{', "tableswitch open")?;
			while !p.accept_punct('}')? {
				let keyword = p.expect_keyword(&["case", "default"])?;
				if keyword == "case" {
					let number = p.expect_number("case number")? as i32;
					bounds = match bounds {
						None => Some((number, number)),
						Some((first, last)) if number - last == 1 => Some((first, number)),
						Some(..) => return p.fail("Tableswitch cases should be incremental."),
					};

					p.expect_punct(':', "table switch case colon")?;
					jumps.push(p.expect_offset()? as i32);
				} else {
					p.expect_punct(':', "table switch default colon")?;
					*default = p.expect_offset()? as i32;
				}
			}

			match bounds {
				Some((first, last)) => {
					*low = first;
					*high = last;
				},
				None => return p.fail("Tableswitch must have at least one case."),
			}
		},
		Instruction::LookupSwitch { default, cases, jumps } => {
			let mut previous = i64::MIN;

			p.expect_punct('{', "lookupswitch open")?;
			while !p.accept_punct('}')? {
				let keyword = p.expect_keyword(&["case", "default"])?;
				if keyword == "case" {
					let number = p.expect_number("case number")? as i32;
					if number as i64 <= previous {
						return p.fail("Lookupswitch cases should be strictly increasing.");
					}
					previous = number as i64;

					p.expect_punct(':', "lookup switch case colon")?;
					cases.push(number);
					jumps.push(p.expect_offset()? as i32);
				} else {
					p.expect_punct(':', "lookup switch default colon")?;
					*default = p.expect_offset()? as i32;
				}
			}
		},
	}

	Ok(())
}

fn array_type_from_internal(internal: u8) -> Option<u8> {
	Some(match internal {
		b'Z' => atype::T_BOOLEAN,
		b'C' => atype::T_CHAR,
		b'F' => atype::T_FLOAT,
		b'D' => atype::T_DOUBLE,
		b'B' => atype::T_BYTE,
		b'S' => atype::T_SHORT,
		b'I' => atype::T_INT,
		b'J' => atype::T_LONG,
		_ => return None,
	})
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use classfile::constants::opcode;
	use classfile::insn::Instruction;
	use classfile::tree::attribute::{Attribute, CodeAttribute};
	use classfile::tree::class::ProgramClass;
	use crate::parse::Parser;
	use crate::parse::class::parse_class;

	fn parse(source: &str) -> ProgramClass {
		let mut class = ProgramClass::default();
		parse_class(&mut Parser::new(source), &mut class).unwrap();
		class
	}

	fn code_of(class: &ProgramClass, method: usize) -> &CodeAttribute {
		let Some(Attribute::Code(code)) = class.methods[method].find_attribute("Code") else {
			panic!("expected a code attribute");
		};
		code
	}

	#[test]
	fn branches_resolve_through_labels() {
		let class = parse(
			"class C { static int check(int) { \
				iload_0 \
				ifeq skip \
				iconst_1 \
				ireturn \
				skip: \
				iconst_0 \
				ireturn \
			} }",
		);
		let code = code_of(&class, 0);
		assert_eq!(code.code, vec![0x1A, opcode::IFEQ, 0x00, 0x05, 0x04, opcode::IRETURN, 0x03, opcode::IRETURN]);
		assert_eq!(code.max_stack, 1);
		assert_eq!(code.max_locals, 1);
	}

	#[test]
	fn catch_any_is_a_finally_block() {
		let class = parse(
			"class C { void run() { \
				try: \
				nop \
				done: \
				return \
				catch any try done \
				athrow \
			} }",
		);
		let code = code_of(&class, 0);
		assert_eq!(code.exception_table.len(), 1);
		assert_eq!(code.exception_table[0].catch_type, 0);
		assert_eq!(code.exception_table[0].start_pc, 0);
		assert_eq!(code.exception_table[0].end_pc, 1);
		assert_eq!(code.exception_table[0].handler_pc, 2);
	}

	#[test]
	fn local_variable_ranges() {
		let class = parse(
			"class C { static void run() { \
				startlocalvar 0 int counter \
				iconst_0 \
				istore_0 \
				endlocalvar 0 \
				return \
			} }",
		);
		let code = code_of(&class, 0);
		let Some(Attribute::LocalVariableTable(locals)) = code.find_attribute("LocalVariableTable") else {
			panic!("expected a local variable table");
		};
		assert_eq!(locals[0].start_pc, 0);
		assert_eq!(locals[0].length, 2);
		assert_eq!(class.pool.utf8(locals[0].name).unwrap(), "counter");
	}

	#[test]
	fn end_without_start_fails() {
		let mut class = ProgramClass::default();
		let error = parse_class(
			&mut Parser::new("class C { void run() { endlocalvar 3 return } }"),
			&mut class,
		).unwrap_err();
		assert_eq!(error.to_string(), "Line 1: Local var end without associated start (3).");
	}

	#[test]
	fn lookupswitch_cases_must_increase() {
		let mut class = ProgramClass::default();
		let error = parse_class(
			&mut Parser::new("class C { int pick(int) {\niload_0\nlookupswitch {\ncase 3: a\ncase 1: b\ndefault: c\n}\n} }"),
			&mut class,
		).unwrap_err();
		assert_eq!(error.to_string(), "Line 5: Lookupswitch cases should be strictly increasing.");
	}

	#[test]
	fn tableswitch_cases_must_be_contiguous() {
		let mut class = ProgramClass::default();
		let error = parse_class(
			&mut Parser::new("class C { int pick(int) { iload_0 tableswitch { case 1: a case 3: b default: c } } }"),
			&mut class,
		).unwrap_err();
		assert!(error.to_string().contains("incremental"));
	}

	#[test]
	fn unknown_mnemonics_are_rejected() {
		let mut class = ProgramClass::default();
		let error = parse_class(
			&mut Parser::new("class C { void run() {\nnop\napples\nreturn\n} }"),
			&mut class,
		).unwrap_err();
		assert_eq!(error.to_string(), "Line 3: Unknown instruction apples.");
	}

	#[test]
	fn wide_suffix_mnemonics() {
		let class = parse("class C { static void run() { iload_w 300 istore_w 300 return } }");
		let code = code_of(&class, 0);
		assert_eq!(
			Instruction::read_from(&code.code, 0).unwrap(),
			Instruction::Variable { opcode: opcode::ILOAD, wide: true, index: 300, constant: 0 },
		);
	}

	#[test]
	fn invokeinterface_count_operand() {
		let class = parse(
			"class C { void call(java.util.List) { \
				aload_1 \
				iconst_0 \
				invokeinterface java.util.List#java.lang.Object get(int) \
				pop \
				return \
			} }",
		);
		let code = code_of(&class, 0);
		// aload_1 iconst_0, then invokeinterface at 2: index, count 2, zero.
		assert_eq!(code.code[2], opcode::INVOKEINTERFACE);
		assert_eq!(code.code[5], 2);
		assert_eq!(code.code[6], 0);
	}

	#[test]
	fn line_numbers_attach_to_offsets() {
		let class = parse("class C { static void run() { line 10 nop line 11 return } }");
		let code = code_of(&class, 0);
		let Some(Attribute::LineNumberTable(lines)) = code.find_attribute("LineNumberTable") else {
			panic!("expected a line number table");
		};
		assert_eq!(lines.len(), 2);
		assert_eq!((lines[0].start_pc, lines[0].line), (0, 10));
		assert_eq!((lines[1].start_pc, lines[1].line), (1, 11));
	}
}
