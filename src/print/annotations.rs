//! Printing annotations, type annotations and element values.

use classfile::constants::{element_value, target_type, type_path};
use classfile::tree::annotation::{Annotation, ElementValue, TargetInfo, TypeAnnotation};
use classfile::tree::class::ProgramClass;
use crate::error::{PrintError, PrintResult};
use crate::print::{self as print, constant, Printer};

pub fn print_annotations(p: &mut Printer, class: &ProgramClass, annotations: &[Annotation]) -> PrintResult<()> {
	p.print_space()?;
	p.print('{')?;
	if !annotations.is_empty() {
		p.println()?;
		p.indent();
		for annotation in annotations {
			p.print_indent()?;
			print_annotation(p, class, annotation)?;
			p.println()?;
		}
		p.outdent();
		p.print_indent()?;
	}
	p.print('}')
}

pub fn print_parameter_annotations(p: &mut Printer, class: &ProgramClass, parameters: &[Vec<Annotation>]) -> PrintResult<()> {
	p.print_space()?;
	p.print('{')?;
	if !parameters.is_empty() {
		p.println()?;
		p.indent();
		for annotations in parameters {
			p.print_indent()?;
			p.print('{')?;
			if !annotations.is_empty() {
				p.println()?;
				p.indent();
				for annotation in annotations {
					p.print_indent()?;
					print_annotation(p, class, annotation)?;
					p.println()?;
				}
				p.outdent();
				p.print_indent()?;
			}
			p.print('}')?;
			p.println()?;
		}
		p.outdent();
		p.print_indent()?;
	}
	p.print('}')
}

pub fn print_type_annotations(p: &mut Printer, class: &ProgramClass, annotations: &[TypeAnnotation]) -> PrintResult<()> {
	p.print_space()?;
	p.print('{')?;
	if !annotations.is_empty() {
		p.println()?;
		p.indent();
		for annotation in annotations {
			p.print_indent()?;
			print_type_annotation(p, class, annotation)?;
			p.println()?;
		}
		p.outdent();
		p.print_indent()?;
	}
	p.print('}')
}

fn print_annotation(p: &mut Printer, class: &ProgramClass, annotation: &Annotation) -> PrintResult<()> {
	let annotation_type = print::lift(class.pool.utf8(annotation.type_index))?.to_owned();
	p.print_type(&annotation_type)?;
	p.print_space()?;
	p.print('{')?;
	if !annotation.elements.is_empty() {
		p.println()?;
		p.indent();
		for element in &annotation.elements {
			p.print_indent()?;
			p.print_word(print::lift(class.pool.utf8(element.name))?)?;
			p.print_space()?;
			p.print('=')?;
			p.print_space()?;
			print_element_value(p, class, &element.value)?;
			p.println()?;
		}
		p.outdent();
		p.print_indent()?;
	}
	p.print('}')
}

fn print_type_annotation(p: &mut Printer, class: &ProgramClass, annotation: &TypeAnnotation) -> PrintResult<()> {
	print_annotation(p, class, &annotation.annotation)?;
	p.print_space()?;
	print_target_info(p, &annotation.target_info)?;
	p.print_space()?;
	p.print('{')?;
	if !annotation.type_path.is_empty() {
		p.println()?;
		p.indent();
		for entry in &annotation.type_path {
			p.print_indent()?;
			print_type_path_entry(p, entry.kind, entry.type_argument_index)?;
			p.println()?;
		}
		p.outdent();
		p.print_indent()?;
	}
	p.print('}')
}

fn print_target_info(p: &mut Printer, target_info: &TargetInfo) -> PrintResult<()> {
	p.print_word(target_type_word(target_info.target_type())?)?;

	match target_info {
		TargetInfo::TypeParameter { index, .. } => {
			p.print_space()?;
			p.print_number(*index as f64)
		},
		TargetInfo::SuperType { index } => {
			p.print_space()?;
			p.print_number(*index as f64)
		},
		TargetInfo::TypeParameterBound { type_parameter, bound, .. } => {
			p.print_space()?;
			p.print_number(*type_parameter as f64)?;
			p.print_space()?;
			p.print_number(*bound as f64)
		},
		TargetInfo::Empty { .. } => Ok(()),
		TargetInfo::FormalParameter { index } => {
			p.print_space()?;
			p.print_number(*index as f64)
		},
		TargetInfo::Throws { index } => {
			p.print_space()?;
			p.print_number(*index as f64)
		},
		TargetInfo::LocalVariable { table, .. } => {
			p.print_space()?;
			p.print('{')?;
			if !table.is_empty() {
				p.println()?;
				p.indent();
				for element in table {
					p.print_indent()?;
					p.print_offset(element.start_pc)?;
					p.print_space()?;
					p.print_offset(element.start_pc.saturating_add(element.length))?;
					p.print_space()?;
					p.print_number(element.index as f64)?;
					p.print(';')?;
					p.println()?;
				}
				p.outdent();
				p.print_indent()?;
			}
			p.print('}')
		},
		TargetInfo::Catch { exception_table_index } => {
			p.print_space()?;
			p.print_number(*exception_table_index as f64)
		},
		TargetInfo::Offset { offset, .. } => {
			p.print_space()?;
			p.print_offset(*offset)
		},
		TargetInfo::TypeArgument { offset, index, .. } => {
			p.print_space()?;
			p.print_offset(*offset)?;
			p.print_space()?;
			p.print_number(*index as f64)
		},
	}
}

fn print_type_path_entry(p: &mut Printer, kind: u8, type_argument_index: u8) -> PrintResult<()> {
	let word = match kind {
		type_path::ARRAY => "array",
		type_path::NESTED => "inner_type",
		type_path::TYPE_ARGUMENT_BOUND => "wildcard",
		type_path::TYPE_ARGUMENT => "type_argument",
		_ => return Err(PrintError::new(format!("Unknown type path kind {kind}."))),
	};
	p.print_word(word)?;

	// The type argument index is optional.
	if type_argument_index != 0 {
		p.print_space()?;
		p.print_number(type_argument_index as f64)?;
	}

	p.print(';')
}

pub fn print_element_value(p: &mut Printer, class: &ProgramClass, value: &ElementValue) -> PrintResult<()> {
	match value {
		&ElementValue::Constant { tag, value } => {
			constant::print_constant(p, class, value, tag, false)?;
			p.print(';')
		},
		&ElementValue::EnumConstant { type_name, constant_name } => {
			let enum_type = print::lift(class.pool.utf8(type_name))?.to_owned();
			p.print_type(&enum_type)?;
			p.print('#')?;
			p.print_word(print::lift(class.pool.utf8(constant_name))?)?;
			p.print(';')
		},
		&ElementValue::Class { descriptor } => {
			let class_type = print::lift(class.pool.utf8(descriptor))?.to_owned();
			p.print_type(&class_type)?;
			p.print(';')
		},
		ElementValue::Annotation(annotation) => {
			p.print('@')?;
			print_annotation(p, class, annotation)
		},
		ElementValue::Array(values) => {
			p.print('{')?;
			if !values.is_empty() {
				p.println()?;
				p.indent();
				for value in values {
					p.print_indent()?;
					print_element_value(p, class, value)?;
					p.println()?;
				}
				p.outdent();
				p.print_indent()?;
			}
			p.print('}')
		},
	}
}

fn target_type_word(target: u8) -> PrintResult<&'static str> {
	Ok(match target {
		target_type::PARAMETER_GENERIC_CLASS => "parameter_generic_class",
		target_type::PARAMETER_GENERIC_METHOD => "parameter_generic_method",
		target_type::EXTENDS => "extends",
		target_type::BOUND_GENERIC_CLASS => "bound_generic_class",
		target_type::BOUND_GENERIC_METHOD => "bound_generic_method",
		target_type::FIELD => "field",
		target_type::RETURN => "return",
		target_type::RECEIVER => "receiver",
		target_type::PARAMETER => "parameter",
		target_type::THROWS => "throws",
		target_type::LOCAL_VARIABLE => "local_variable",
		target_type::RESOURCE_VARIABLE => "resource_variable",
		target_type::CATCH => "catch",
		target_type::INSTANCE_OF => "instance_of",
		target_type::NEW => "new",
		target_type::METHOD_REFERENCE_NEW => "method_reference_new",
		target_type::METHOD_REFERENCE => "method_reference",
		target_type::CAST => "cast",
		target_type::ARGUMENT_GENERIC_METHOD_NEW => "argument_generic_method_new",
		target_type::ARGUMENT_GENERIC_METHOD => "argument_generic_method",
		target_type::ARGUMENT_GENERIC_METHOD_REFERENCE_NEW => "argument_generic_method_reference_new",
		target_type::ARGUMENT_GENERIC_METHOD_REFERENCE => "argument_generic_method_reference",
		_ => return Err(PrintError::new(format!("Unknown target info type {target}."))),
	})
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use classfile::constants::element_value;
	use classfile::tree::annotation::{Annotation, ElementPair, ElementValue};
	use classfile::tree::class::ProgramClass;
	use crate::print::Printer;
	use super::print_annotations;

	#[test]
	fn annotation_with_elements() {
		let mut class = ProgramClass::default();
		let type_index = class.pool.add_utf8("LFoo;").unwrap();
		let name = class.pool.add_utf8("x").unwrap();
		let value = class.pool.add_double(3.14).unwrap();
		let annotations = vec![Annotation {
			type_index,
			elements: vec![ElementPair {
				name,
				value: ElementValue::Constant { tag: element_value::DOUBLE, value },
			}],
		}];

		let mut out = Vec::new();
		let mut printer = Printer::new(&mut out);
		print_annotations(&mut printer, &class, &annotations).unwrap();

		assert_eq!(String::from_utf8(out).unwrap(), " {\n    Foo {\n        x = 3.14d;\n    }\n}");
	}
}
