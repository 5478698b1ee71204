//! Printing field and method declarations.

use classfile::constants::{access, attribute};
use classfile::descriptors;
use classfile::tree::attribute::{Attribute, MethodParameter};
use classfile::tree::class::{Member, ProgramClass};
use crate::error::PrintResult;
use crate::print::{self as print, attributes, constant, instructions, labels, Printer};
use crate::types;

pub fn print_members(p: &mut Printer, class: &ProgramClass) -> PrintResult<()> {
	if class.fields.is_empty() && class.methods.is_empty() {
		return p.print(';');
	}

	p.print_space()?;
	p.print('{')?;
	p.println()?;
	p.indent();

	for field in &class.fields {
		p.print_indent()?;
		if print_field_access_flags(p, field.access_flags)? {
			p.print_space()?;
		}

		p.print_type(print::lift(field.descriptor(&class.pool))?)?;
		p.print_space()?;
		p.print_word(print::lift(field.name(&class.pool))?)?;
		print_field_rest(p, class, field)?;
		p.println()?;
	}

	p.println()?;
	for method in &class.methods {
		p.print_indent()?;
		let printed = print_method_access_flags(p, method.access_flags)?;

		let name = print::lift(method.name(&class.pool))?;
		let descriptor = print::lift(method.descriptor(&class.pool))?;
		if name != "<clinit>" || descriptor != "()V" {
			if printed {
				p.print_space()?;
			}

			p.print_method_return_type(descriptor)?;
			p.print_space()?;
			p.print_word(name)?;

			let parameters = match method.find_attribute(attribute::METHOD_PARAMETERS) {
				Some(Attribute::MethodParameters(parameters)) => parameters.as_slice(),
				_ => &[],
			};
			print_method_arguments(p, class, descriptor, parameters)?;
		}

		print_method_rest(p, class, method)?;
		p.println()?;
		p.println()?;
	}

	p.outdent();
	p.print('}')
}

fn print_field_rest(p: &mut Printer, class: &ProgramClass, field: &Member) -> PrintResult<()> {
	if let Some(&Attribute::ConstantValue { value }) = field.find_attribute(attribute::CONSTANT_VALUE) {
		p.print_space()?;
		p.print('=')?;
		p.print_space()?;
		constant::print_constant(p, class, value, 0, true)?;
	}

	attributes::print_member_attributes(p, class, &field.attributes)?;
	p.print(';')
}

fn print_method_rest(p: &mut Printer, class: &ProgramClass, method: &Member) -> PrintResult<()> {
	if let Some(Attribute::Exceptions { exceptions }) = method.find_attribute(attribute::EXCEPTIONS) {
		if !exceptions.is_empty() {
			p.print_space()?;
			p.print_word("throws")?;
			p.print_space()?;
			for (position, &exception) in exceptions.iter().enumerate() {
				let name = print::lift(class.pool.class_name(exception))?.to_owned();
				p.print_word(&types::external_class_name(&name))?;
				if position < exceptions.len() - 1 {
					p.print(',')?;
					p.print_space()?;
				}
			}
		}
	}

	attributes::print_member_attributes(p, class, &method.attributes)?;

	// A code attribute with no printable nested attributes was left out of
	// the attribute block; it is rendered in shorthand, directly as the
	// method body.
	match method.find_attribute(attribute::CODE) {
		Some(Attribute::Code(code)) if !attributes::has_printable_attributes(&code.attributes) => {
			let saved_labels = std::mem::take(&mut p.labels);
			p.labels = labels::collect_labels(code)?;
			let result = instructions::print_code_body(p, class, code);
			p.labels = saved_labels;
			result
		},
		Some(..) => p.print(';'),
		None => p.print(';'),
	}
}

/// Prints the method argument list, attaching the access flags and names of
/// a MethodParameters attribute to the positional slots.
fn print_method_arguments(p: &mut Printer, class: &ProgramClass, descriptor: &str, parameters: &[MethodParameter]) -> PrintResult<()> {
	let argument_types = print::lift(descriptors::parameter_descriptors(descriptor))?;

	p.print('(')?;
	for (position, argument_type) in argument_types.iter().enumerate() {
		if let Some(parameter) = parameters.get(position) {
			if p.print_access_flags(parameter.access_flags)? {
				p.print_space()?;
			}
		}

		p.print_type(argument_type)?;

		if let Some(parameter) = parameters.get(position) {
			// The name is optional.
			if parameter.name != 0 {
				p.print_space()?;
				p.print_word(print::lift(class.pool.utf8(parameter.name))?)?;
			}
		}

		if position < argument_types.len() - 1 {
			p.print(',')?;
			p.print_space()?;
		}
	}
	p.print(')')
}

fn print_field_access_flags(p: &mut Printer, access_flags: u16) -> PrintResult<bool> {
	if access_flags == 0 {
		return Ok(false);
	}

	let mut words = Vec::new();
	if access_flags & access::PUBLIC != 0 {
		words.push("public");
	}
	if access_flags & access::PRIVATE != 0 {
		words.push("private");
	}
	if access_flags & access::PROTECTED != 0 {
		words.push("protected");
	}
	if access_flags & access::STATIC != 0 {
		words.push("static");
	}
	if access_flags & access::FINAL != 0 {
		words.push("final");
	}
	if access_flags & access::VOLATILE != 0 {
		words.push("volatile");
	}
	if access_flags & access::TRANSIENT != 0 {
		words.push("transient");
	}
	if access_flags & access::SYNTHETIC != 0 {
		words.push("synthetic");
	}
	if access_flags & access::ENUM != 0 {
		words.push("enum");
	}

	p.print_word(&words.join(" "))?;
	Ok(true)
}

fn print_method_access_flags(p: &mut Printer, access_flags: u16) -> PrintResult<bool> {
	if access_flags == 0 {
		return Ok(false);
	}

	let mut words = Vec::new();
	if access_flags & access::PUBLIC != 0 {
		words.push("public");
	}
	if access_flags & access::PRIVATE != 0 {
		words.push("private");
	}
	if access_flags & access::PROTECTED != 0 {
		words.push("protected");
	}
	if access_flags & access::STATIC != 0 {
		words.push("static");
	}
	if access_flags & access::FINAL != 0 {
		words.push("final");
	}
	if access_flags & access::SYNCHRONIZED != 0 {
		words.push("synchronized");
	}
	if access_flags & access::BRIDGE != 0 {
		words.push("bridge");
	}
	if access_flags & access::VARARGS != 0 {
		words.push("varargs");
	}
	if access_flags & access::NATIVE != 0 {
		words.push("native");
	}
	if access_flags & access::ABSTRACT != 0 {
		words.push("abstract");
	}
	if access_flags & access::STRICT != 0 {
		words.push("strictfp");
	}
	if access_flags & access::SYNTHETIC != 0 {
		words.push("synthetic");
	}

	p.print_word(&words.join(" "))?;
	Ok(true)
}
