//! Printing attribute blocks, with the validity filter and the Code
//! shorthand decision.

use classfile::constants::access;
use classfile::tree::attribute::{Attribute, CodeAttribute};
use classfile::tree::class::ProgramClass;
use classfile::tree::module::ModuleInfo;
use log::warn;
use crate::error::PrintResult;
use crate::print::{self as print, annotations, constant, instructions, labels, Printer};
use crate::types;

/// Whether the attribute has an explicit keyword form the assembler would
/// parse back. Attributes that are expressed inline by other syntax
/// (ConstantValue, Exceptions, MethodParameters, the line number and local
/// variable tables) and the preverifier-generated stack maps do not.
fn has_keyword_form(attribute: &Attribute) -> bool {
	matches!(attribute,
		Attribute::BootstrapMethods(..)
		| Attribute::SourceFile { .. }
		| Attribute::SourceDir { .. }
		| Attribute::InnerClasses(..)
		| Attribute::EnclosingMethod { .. }
		| Attribute::NestHost { .. }
		| Attribute::NestMembers { .. }
		| Attribute::Deprecated
		| Attribute::Synthetic
		| Attribute::Signature { .. }
		| Attribute::Code(..)
		| Attribute::RuntimeVisibleAnnotations(..)
		| Attribute::RuntimeInvisibleAnnotations(..)
		| Attribute::RuntimeVisibleParameterAnnotations(..)
		| Attribute::RuntimeInvisibleParameterAnnotations(..)
		| Attribute::RuntimeVisibleTypeAnnotations(..)
		| Attribute::RuntimeInvisibleTypeAnnotations(..)
		| Attribute::AnnotationDefault(..)
		| Attribute::Module(..)
		| Attribute::ModuleMainClass { .. }
		| Attribute::ModulePackages { .. })
}

/// The attributes that go into an explicit `[` … `]` block. Unrecognised
/// attributes are dropped here; a Code attribute whose own printable set is
/// empty is left out too, to be rendered in shorthand as the method body.
fn printable_attributes<'a>(attributes: &'a [Attribute]) -> Vec<&'a Attribute> {
	attributes.iter()
		.filter(|attribute| {
			if let Attribute::Unknown { name, .. } = attribute {
				warn!("dropping unrecognised attribute {name}");
				return false;
			}
			if let Attribute::Code(code) = attribute {
				return has_printable_attributes(&code.attributes);
			}
			has_keyword_form(attribute)
		})
		.collect()
}

/// Whether any of a Code attribute's nested attributes needs the explicit
/// `Code` form.
pub fn has_printable_attributes(attributes: &[Attribute]) -> bool {
	attributes.iter()
		.any(|attribute| !matches!(attribute, Attribute::Unknown { .. }) && has_keyword_form(attribute))
}

pub fn print_class_attributes(p: &mut Printer, class: &ProgramClass) -> PrintResult<()> {
	print_attribute_block(p, class, &class.attributes)
}

pub fn print_member_attributes(p: &mut Printer, class: &ProgramClass, attributes: &[Attribute]) -> PrintResult<()> {
	print_attribute_block(p, class, attributes)
}

fn print_attribute_block(p: &mut Printer, class: &ProgramClass, attributes: &[Attribute]) -> PrintResult<()> {
	let printable = printable_attributes(attributes);
	if printable.is_empty() {
		return Ok(());
	}

	p.print_space()?;
	p.print('[')?;
	p.println()?;
	p.indent();
	for attribute in printable {
		p.print_indent()?;
		p.print_word(attribute.name())?;
		print_attribute(p, class, attribute)?;
		p.println()?;
	}

	p.outdent();
	p.print_indent()?;
	p.print(']')
}

fn print_attribute(p: &mut Printer, class: &ProgramClass, attribute: &Attribute) -> PrintResult<()> {
	match attribute {
		Attribute::BootstrapMethods(methods) => {
			p.print_space()?;
			p.print('{')?;
			if !methods.is_empty() {
				p.println()?;
				p.indent();
				for method in methods {
					p.print_indent()?;
					constant::print_constant(p, class, method.method_handle, 0, false)?;
					p.print('{')?;
					if !method.arguments.is_empty() {
						p.println()?;
						p.indent();
						for &argument in &method.arguments {
							p.print_indent()?;
							constant::print_constant(p, class, argument, 0, true)?;
							p.print(';')?;
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
		},
		&Attribute::SourceFile { source_file } => {
			p.print_space()?;
			let string = print::lift(class.pool.utf8(source_file))?.to_owned();
			p.print_string(&string)?;
			p.print(';')
		},
		&Attribute::SourceDir { source_dir } => {
			p.print_space()?;
			let string = print::lift(class.pool.utf8(source_dir))?.to_owned();
			p.print_string(&string)?;
			p.print(';')
		},
		Attribute::InnerClasses(classes) => {
			p.print_space()?;
			p.print('{')?;
			if !classes.is_empty() {
				p.println()?;
				p.indent();
				for inner in classes {
					p.print_indent()?;
					if p.print_class_access_flags(inner.access_flags)? {
						p.print_space()?;
					}
					let name = print::lift(class.pool.class_name(inner.inner_class))?.to_owned();
					p.print_word(&types::external_class_name(&name))?;

					// The inner name is optional.
					if inner.inner_name != 0 {
						p.print_space()?;
						p.print_word("as")?;
						p.print_space()?;
						p.print_word(print::lift(class.pool.utf8(inner.inner_name))?)?;
					}

					// The outer class is optional.
					if inner.outer_class != 0 {
						p.print_space()?;
						p.print_word("in")?;
						p.print_space()?;
						let outer = print::lift(class.pool.class_name(inner.outer_class))?.to_owned();
						p.print_type(&types::internal_type_from_class_type(&outer))?;
					}

					p.print(';')?;
					p.println()?;
				}
				p.outdent();
				p.print_indent()?;
			}
			p.print('}')
		},
		&Attribute::EnclosingMethod { class: enclosing, name_and_type } => {
			p.print_space()?;
			let name = print::lift(class.pool.class_name(enclosing))?.to_owned();
			p.print_type(&types::internal_type_from_class_type(&name))?;

			// The enclosing method itself is optional.
			if name_and_type != 0 {
				let (method_name, descriptor) = print::lift(class.pool.name_and_type(name_and_type))?;
				let (method_name, descriptor) = (method_name.to_owned(), descriptor.to_owned());
				p.print('#')?;
				p.print_method_return_type(&descriptor)?;
				p.print_space()?;
				p.print_word(&method_name)?;
				p.print_method_arguments(&descriptor)?;
			}

			p.print(';')
		},
		&Attribute::NestHost { host_class } => {
			p.print_space()?;
			let name = print::lift(class.pool.class_name(host_class))?.to_owned();
			p.print_type(&types::internal_type_from_class_type(&name))?;
			p.print(';')
		},
		Attribute::NestMembers { classes } => {
			p.print_space()?;
			p.print('{')?;
			if !classes.is_empty() {
				p.println()?;
				p.indent();
				for &member in classes {
					p.print_indent()?;
					let name = print::lift(class.pool.class_name(member))?.to_owned();
					p.print_type(&types::internal_type_from_class_type(&name))?;
					p.print(';')?;
					p.println()?;
				}
				p.outdent();
				p.print_indent()?;
			}
			p.print('}')
		},
		Attribute::Deprecated | Attribute::Synthetic => p.print(';'),
		&Attribute::Signature { signature } => {
			p.print_space()?;
			let string = print::lift(class.pool.utf8(signature))?.to_owned();
			p.print_string(&string)?;
			p.print(';')
		},
		Attribute::Code(code) => print_code_attribute(p, class, code),
		Attribute::RuntimeVisibleAnnotations(list) | Attribute::RuntimeInvisibleAnnotations(list) =>
			annotations::print_annotations(p, class, list),
		Attribute::RuntimeVisibleParameterAnnotations(parameters)
		| Attribute::RuntimeInvisibleParameterAnnotations(parameters) =>
			annotations::print_parameter_annotations(p, class, parameters),
		Attribute::RuntimeVisibleTypeAnnotations(list) | Attribute::RuntimeInvisibleTypeAnnotations(list) =>
			annotations::print_type_annotations(p, class, list),
		Attribute::AnnotationDefault(value) => {
			p.print_space()?;
			annotations::print_element_value(p, class, value)
		},
		Attribute::Module(module) => print_module(p, class, module),
		&Attribute::ModuleMainClass { main_class } => {
			p.print_space()?;
			let name = print::lift(class.pool.class_name(main_class))?.to_owned();
			p.print_type(&types::internal_type_from_class_type(&name))?;
			p.print(';')
		},
		Attribute::ModulePackages { packages } => {
			p.print_space()?;
			p.print('{')?;
			if !packages.is_empty() {
				p.println()?;
				p.indent();
				for &package in packages {
					p.print_indent()?;
					let name = print::lift(class.pool.package_name(package))?.to_owned();
					p.print_word(&types::external_class_name(&name))?;
					p.print(';')?;
					p.println()?;
				}
				p.outdent();
				p.print_indent()?;
			}
			p.print('}')
		},
		attribute => Err(crate::error::PrintError::new(format!("Cannot print attribute {:?}.", attribute.name()))),
	}
}

/// The explicit `Code` form: nested printable attributes in a block, then
/// the instruction body.
fn print_code_attribute(p: &mut Printer, class: &ProgramClass, code: &CodeAttribute) -> PrintResult<()> {
	let saved_labels = std::mem::take(&mut p.labels);
	p.labels = labels::collect_labels(code)?;

	let result = (|| {
		print_attribute_block(p, class, &code.attributes)?;
		instructions::print_code_body(p, class, code)
	})();

	p.labels = saved_labels;
	result
}

fn print_module(p: &mut Printer, class: &ProgramClass, module: &ModuleInfo) -> PrintResult<()> {
	p.print_space()?;
	if print_module_access_flags(p, module.flags)? {
		p.print_space()?;
	}

	// Module names are not encoded in internal form like class names.
	p.print_word(print::lift(class.pool.module_name(module.name))?)?;
	p.print_space()?;

	// The module version is optional.
	if module.version != 0 {
		p.print_word(print::lift(class.pool.utf8(module.version))?)?;
		p.print_space()?;
	}

	p.print('{')?;

	if !module.requires.is_empty() {
		p.println()?;
		p.indent();
		for requires in &module.requires {
			p.print_indent()?;
			p.print_word("requires")?;
			p.print_space()?;
			if p.print_access_flags(requires.flags)? {
				p.print_space()?;
			}
			p.print_word(print::lift(class.pool.module_name(requires.module))?)?;
			if requires.version != 0 {
				p.print_space()?;
				p.print_word(print::lift(class.pool.utf8(requires.version))?)?;
			}
			p.print(';')?;
			p.println()?;
		}
		p.outdent();
		p.print_indent()?;
	}

	if !module.exports.is_empty() {
		p.println()?;
		p.indent();
		for exports in &module.exports {
			p.print_indent()?;
			p.print_word("exports")?;
			p.print_space()?;
			if p.print_access_flags(exports.flags)? {
				p.print_space()?;
			}
			let package = print::lift(class.pool.package_name(exports.package))?.to_owned();
			p.print_word(&types::external_class_name(&package))?;
			print_to_list(p, class, &exports.to, "to")?;
			p.print(';')?;
			p.println()?;
		}
		p.outdent();
		p.print_indent()?;
	}

	if !module.opens.is_empty() {
		p.println()?;
		p.indent();
		for opens in &module.opens {
			p.print_indent()?;
			p.print_word("opens")?;
			p.print_space()?;
			if p.print_access_flags(opens.flags)? {
				p.print_space()?;
			}
			let package = print::lift(class.pool.package_name(opens.package))?.to_owned();
			p.print_word(&types::external_class_name(&package))?;
			print_to_list(p, class, &opens.to, "to")?;
			p.print(';')?;
			p.println()?;
		}
		p.outdent();
		p.print_indent()?;
	}

	if !module.uses.is_empty() {
		p.println()?;
		p.indent();
		for &uses in &module.uses {
			p.print_indent()?;
			p.print_word("uses")?;
			p.print_space()?;
			let name = print::lift(class.pool.class_name(uses))?.to_owned();
			p.print_type(&types::internal_type_from_class_type(&name))?;
			p.print(';')?;
			p.println()?;
		}
		p.outdent();
		p.print_indent()?;
	}

	if !module.provides.is_empty() {
		p.println()?;
		p.indent();
		for provides in &module.provides {
			p.print_indent()?;
			p.print_word("provides")?;
			p.print_space()?;
			let name = print::lift(class.pool.class_name(provides.service))?.to_owned();
			p.print_type(&types::internal_type_from_class_type(&name))?;
			if !provides.with.is_empty() {
				p.print_space()?;
				p.print_word("with")?;
				p.print_space()?;
				for (position, &with) in provides.with.iter().enumerate() {
					let name = print::lift(class.pool.class_name(with))?.to_owned();
					p.print_type(&types::internal_type_from_class_type(&name))?;
					if position < provides.with.len() - 1 {
						p.print(',')?;
						p.print_space()?;
					}
				}
			}
			p.print(';')?;
			p.println()?;
		}
		p.outdent();
		p.print_indent()?;
	}

	p.print('}')
}

fn print_to_list(p: &mut Printer, class: &ProgramClass, modules: &[u16], keyword: &str) -> PrintResult<()> {
	if modules.is_empty() {
		return Ok(());
	}

	p.print_space()?;
	p.print_word(keyword)?;
	p.print_space()?;
	for (position, &module) in modules.iter().enumerate() {
		// Module names are not encoded in internal form.
		p.print_word(print::lift(class.pool.module_name(module))?)?;
		if position < modules.len() - 1 {
			p.print(',')?;
			p.print_space()?;
		}
	}

	Ok(())
}

fn print_module_access_flags(p: &mut Printer, access_flags: u16) -> PrintResult<bool> {
	if access_flags == 0 {
		return Ok(false);
	}

	let mut words = Vec::new();
	if access_flags & access::OPEN != 0 {
		words.push("open");
	}
	if access_flags & access::SYNTHETIC != 0 {
		words.push("synthetic");
	}
	if access_flags & access::MANDATED != 0 {
		words.push("mandated");
	}

	p.print_word(&words.join(" "))?;
	Ok(true)
}
