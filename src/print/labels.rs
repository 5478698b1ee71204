//! The labels collector: a pre-pass over a code attribute that names every
//! bytecode offset the printer will need to reference.

use std::collections::HashMap;
use classfile::insn::Instruction;
use classfile::tree::annotation::TargetInfo;
use classfile::tree::attribute::{Attribute, CodeAttribute};
use crate::error::PrintResult;
use crate::print;

/// Walks the code attribute once and assigns a synthetic name (`label1`,
/// `label2`, … in first-visit order) to every offset that is referenced by
/// a branch, a switch, the exception table, or a type annotation target.
pub fn collect_labels(code: &CodeAttribute) -> PrintResult<HashMap<u16, String>> {
	let mut labels = HashMap::new();

	let mut offset = 0;
	while offset < code.code.len() {
		let instruction = print::lift(Instruction::read_from(&code.code, offset))?;
		match &instruction {
			Instruction::Branch { offset: relative, .. } => {
				collect(&mut labels, target(offset, *relative));
			},
			Instruction::TableSwitch { default, jumps, .. } => {
				collect(&mut labels, target(offset, *default));
				for jump in jumps {
					collect(&mut labels, target(offset, *jump));
				}
			},
			Instruction::LookupSwitch { default, jumps, .. } => {
				collect(&mut labels, target(offset, *default));
				for jump in jumps {
					collect(&mut labels, target(offset, *jump));
				}
			},
			_ => {},
		}
		offset += instruction.length(offset);
	}

	for exception in &code.exception_table {
		collect(&mut labels, exception.start_pc);
		collect(&mut labels, exception.end_pc);
		// The handler is rendered inline by the catch pseudo-instruction.
	}

	for attribute in &code.attributes {
		if let Attribute::RuntimeVisibleTypeAnnotations(annotations)
		| Attribute::RuntimeInvisibleTypeAnnotations(annotations) = attribute {
			for annotation in annotations {
				match &annotation.target_info {
					TargetInfo::Offset { offset, .. } => collect(&mut labels, *offset),
					TargetInfo::TypeArgument { offset, .. } => collect(&mut labels, *offset),
					TargetInfo::LocalVariable { table, .. } => {
						for element in table {
							collect(&mut labels, element.start_pc);
							collect(&mut labels, element.start_pc.saturating_add(element.length));
						}
					},
					_ => {},
				}
			}
		}
	}

	Ok(labels)
}

fn target(offset: usize, relative: i32) -> u16 {
	(offset as i64 + relative as i64) as u16
}

fn collect(labels: &mut HashMap<u16, String>, offset: u16) {
	if !labels.contains_key(&offset) {
		labels.insert(offset, format!("label{}", labels.len() + 1));
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use classfile::constants::opcode;
	use classfile::tree::attribute::{CodeAttribute, ExceptionInfo};
	use super::collect_labels;

	#[test]
	fn branch_targets_are_named_in_visit_order() {
		// 0: ifeq +6  3: goto +4  6: nop  7: return
		let code = CodeAttribute {
			code: vec![opcode::IFEQ, 0, 6, opcode::GOTO, 0, 4, 0, 0xB1],
			..CodeAttribute::default()
		};

		let labels = collect_labels(&code).unwrap();
		assert_eq!(labels[&6], "label1");
		assert_eq!(labels[&7], "label2");
		assert_eq!(labels.len(), 2);
	}

	#[test]
	fn exception_bounds_are_collected() {
		let code = CodeAttribute {
			code: vec![0, 0, 0xB1],
			exception_table: vec![ExceptionInfo { start_pc: 0, end_pc: 2, handler_pc: 2, catch_type: 0 }],
			..CodeAttribute::default()
		};

		let labels = collect_labels(&code).unwrap();
		assert_eq!(labels[&0], "label1");
		assert_eq!(labels[&2], "label2");
		assert_eq!(labels.len(), 2);
	}
}
