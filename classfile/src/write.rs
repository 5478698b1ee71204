//! Writing the binary class file format.

use std::collections::HashMap;
use anyhow::{anyhow, Context, Result};
use crate::constants;
use crate::mutf8;
use crate::pool::Constant;
use crate::tree::annotation::{Annotation, ElementValue, TargetInfo, TypeAnnotation};
use crate::tree::attribute::{Attribute, CodeAttribute};
use crate::tree::class::{Member, ProgramClass};
use crate::tree::module::ModuleInfo;

trait ClassWrite {
	fn u8(&mut self, value: u8);
	fn u16(&mut self, value: u16);
	fn u32(&mut self, value: u32);
	fn bytes(&mut self, value: &[u8]);

	fn len_u16(&mut self, length: usize, what: &str) -> Result<()> {
		self.u16(u16::try_from(length).map_err(|_| anyhow!("too many {what}: {length}"))?);
		Ok(())
	}

	fn len_u8(&mut self, length: usize, what: &str) -> Result<()> {
		self.u8(u8::try_from(length).map_err(|_| anyhow!("too many {what}: {length}"))?);
		Ok(())
	}
}

impl ClassWrite for Vec<u8> {
	fn u8(&mut self, value: u8) {
		self.push(value);
	}

	fn u16(&mut self, value: u16) {
		self.extend(value.to_be_bytes());
	}

	fn u32(&mut self, value: u32) {
		self.extend(value.to_be_bytes());
	}

	fn bytes(&mut self, value: &[u8]) {
		self.extend_from_slice(value);
	}
}

/// Writes the class to class file bytes.
///
/// Attribute name strings are interned into the class's pool first, which
/// is why the class is taken mutably.
pub fn write(class: &mut ProgramClass) -> Result<Vec<u8>> {
	let names = intern_attribute_names(class)?;
	let class = &*class;

	let mut out = Vec::new();
	out.u32(constants::MAGIC);
	out.u16(class.version.minor);
	out.u16(class.version.major);

	out.u16(class.pool.count());
	for (_, entry) in class.pool.entries() {
		write_constant(&mut out, entry);
	}

	out.u16(class.access_flags);
	out.u16(class.this_class);
	out.u16(class.super_class);
	out.len_u16(class.interfaces.len(), "interfaces")?;
	for &interface in &class.interfaces {
		out.u16(interface);
	}

	write_members(&mut out, &class.fields, &names).context("failed to write fields")?;
	write_members(&mut out, &class.methods, &names).context("failed to write methods")?;
	write_attributes(&mut out, &class.attributes, &names)?;

	Ok(out)
}

fn write_constant(out: &mut Vec<u8>, entry: &Constant) {
	out.u8(entry.tag());
	match entry {
		Constant::Utf8(string) => {
			let encoded = mutf8::encode(string);
			out.u16(encoded.len() as u16);
			out.bytes(&encoded);
		},
		Constant::Integer(value) => out.u32(*value as u32),
		Constant::Float(bits) => out.u32(*bits),
		Constant::Long(value) => {
			out.u32((*value as u64 >> 32) as u32);
			out.u32(*value as u32);
		},
		Constant::Double(bits) => {
			out.u32((bits >> 32) as u32);
			out.u32(*bits as u32);
		},
		Constant::Class { name } => out.u16(*name),
		Constant::String { string } => out.u16(*string),
		Constant::FieldRef { class, name_and_type }
		| Constant::MethodRef { class, name_and_type }
		| Constant::InterfaceMethodRef { class, name_and_type } => {
			out.u16(*class);
			out.u16(*name_and_type);
		},
		Constant::NameAndType { name, descriptor } => {
			out.u16(*name);
			out.u16(*descriptor);
		},
		Constant::MethodHandle { kind, reference } => {
			out.u8(*kind);
			out.u16(*reference);
		},
		Constant::MethodType { descriptor } => out.u16(*descriptor),
		Constant::Dynamic { bootstrap_method, name_and_type }
		| Constant::InvokeDynamic { bootstrap_method, name_and_type } => {
			out.u16(*bootstrap_method);
			out.u16(*name_and_type);
		},
		Constant::Module { name } => out.u16(*name),
		Constant::Package { name } => out.u16(*name),
	}
}

fn write_members(out: &mut Vec<u8>, members: &[Member], names: &HashMap<String, u16>) -> Result<()> {
	out.len_u16(members.len(), "members")?;
	for member in members {
		out.u16(member.access_flags);
		out.u16(member.name);
		out.u16(member.descriptor);
		write_attributes(out, &member.attributes, names)?;
	}
	Ok(())
}

fn write_attributes(out: &mut Vec<u8>, attributes: &[Attribute], names: &HashMap<String, u16>) -> Result<()> {
	out.len_u16(attributes.len(), "attributes")?;
	for attribute in attributes {
		write_attribute(out, attribute, names)?;
	}
	Ok(())
}

fn write_attribute(out: &mut Vec<u8>, attribute: &Attribute, names: &HashMap<String, u16>) -> Result<()> {
	let name_index = *names.get(attribute.name())
		.ok_or_else(|| anyhow!("attribute name {:?} was not interned", attribute.name()))?;

	let mut body = Vec::new();
	let body_out = &mut body;
	match attribute {
		Attribute::ConstantValue { value } => body_out.u16(*value),
		Attribute::Code(code) => write_code(body_out, code, names)?,
		Attribute::Exceptions { exceptions } => {
			body_out.len_u16(exceptions.len(), "thrown exceptions")?;
			for &exception in exceptions {
				body_out.u16(exception);
			}
		},
		Attribute::InnerClasses(classes) => {
			body_out.len_u16(classes.len(), "inner classes")?;
			for inner in classes {
				body_out.u16(inner.inner_class);
				body_out.u16(inner.outer_class);
				body_out.u16(inner.inner_name);
				body_out.u16(inner.access_flags);
			}
		},
		Attribute::EnclosingMethod { class, name_and_type } => {
			body_out.u16(*class);
			body_out.u16(*name_and_type);
		},
		Attribute::Synthetic | Attribute::Deprecated => {},
		Attribute::Signature { signature } => body_out.u16(*signature),
		Attribute::SourceFile { source_file } => body_out.u16(*source_file),
		Attribute::SourceDir { source_dir } => body_out.u16(*source_dir),
		Attribute::LineNumberTable(lines) => {
			body_out.len_u16(lines.len(), "line numbers")?;
			for line in lines {
				body_out.u16(line.start_pc);
				body_out.u16(line.line);
			}
		},
		Attribute::LocalVariableTable(locals) => {
			body_out.len_u16(locals.len(), "local variables")?;
			for local in locals {
				body_out.u16(local.start_pc);
				body_out.u16(local.length);
				body_out.u16(local.name);
				body_out.u16(local.descriptor);
				body_out.u16(local.index);
			}
		},
		Attribute::LocalVariableTypeTable(locals) => {
			body_out.len_u16(locals.len(), "local variable types")?;
			for local in locals {
				body_out.u16(local.start_pc);
				body_out.u16(local.length);
				body_out.u16(local.name);
				body_out.u16(local.signature);
				body_out.u16(local.index);
			}
		},
		Attribute::StackMap(data) | Attribute::StackMapTable(data) => body_out.bytes(data),
		Attribute::RuntimeVisibleAnnotations(annotations)
		| Attribute::RuntimeInvisibleAnnotations(annotations) => write_annotations(body_out, annotations)?,
		Attribute::RuntimeVisibleParameterAnnotations(parameters)
		| Attribute::RuntimeInvisibleParameterAnnotations(parameters) => {
			body_out.len_u8(parameters.len(), "annotated parameters")?;
			for annotations in parameters {
				write_annotations(body_out, annotations)?;
			}
		},
		Attribute::RuntimeVisibleTypeAnnotations(annotations)
		| Attribute::RuntimeInvisibleTypeAnnotations(annotations) => {
			body_out.len_u16(annotations.len(), "type annotations")?;
			for annotation in annotations {
				write_type_annotation(body_out, annotation)?;
			}
		},
		Attribute::AnnotationDefault(value) => write_element_value(body_out, value)?,
		Attribute::BootstrapMethods(methods) => {
			body_out.len_u16(methods.len(), "bootstrap methods")?;
			for method in methods {
				body_out.u16(method.method_handle);
				body_out.len_u16(method.arguments.len(), "bootstrap method arguments")?;
				for &argument in &method.arguments {
					body_out.u16(argument);
				}
			}
		},
		Attribute::MethodParameters(parameters) => {
			body_out.len_u8(parameters.len(), "method parameters")?;
			for parameter in parameters {
				body_out.u16(parameter.name);
				body_out.u16(parameter.access_flags);
			}
		},
		Attribute::Module(module) => write_module(body_out, module)?,
		Attribute::ModuleMainClass { main_class } => body_out.u16(*main_class),
		Attribute::ModulePackages { packages } => {
			body_out.len_u16(packages.len(), "module packages")?;
			for &package in packages {
				body_out.u16(package);
			}
		},
		Attribute::NestHost { host_class } => body_out.u16(*host_class),
		Attribute::NestMembers { classes } => {
			body_out.len_u16(classes.len(), "nest members")?;
			for &class in classes {
				body_out.u16(class);
			}
		},
		Attribute::Unknown { data, .. } => body_out.bytes(data),
	}

	out.u16(name_index);
	out.u32(u32::try_from(body.len())
		.map_err(|_| anyhow!("attribute {:?} is too large", attribute.name()))?);
	out.bytes(&body);
	Ok(())
}

fn write_code(out: &mut Vec<u8>, code: &CodeAttribute, names: &HashMap<String, u16>) -> Result<()> {
	out.u16(code.max_stack);
	out.u16(code.max_locals);
	out.u32(u32::try_from(code.code.len()).map_err(|_| anyhow!("code too long"))?);
	out.bytes(&code.code);

	out.len_u16(code.exception_table.len(), "exception handlers")?;
	for exception in &code.exception_table {
		out.u16(exception.start_pc);
		out.u16(exception.end_pc);
		out.u16(exception.handler_pc);
		out.u16(exception.catch_type);
	}

	write_attributes(out, &code.attributes, names)
}

fn write_annotations(out: &mut Vec<u8>, annotations: &[Annotation]) -> Result<()> {
	out.len_u16(annotations.len(), "annotations")?;
	for annotation in annotations {
		write_annotation(out, annotation)?;
	}
	Ok(())
}

fn write_annotation(out: &mut Vec<u8>, annotation: &Annotation) -> Result<()> {
	out.u16(annotation.type_index);
	out.len_u16(annotation.elements.len(), "annotation elements")?;
	for element in &annotation.elements {
		out.u16(element.name);
		write_element_value(out, &element.value)?;
	}
	Ok(())
}

fn write_element_value(out: &mut Vec<u8>, value: &ElementValue) -> Result<()> {
	match value {
		ElementValue::Constant { tag, value } => {
			out.u8(*tag);
			out.u16(*value);
		},
		ElementValue::EnumConstant { type_name, constant_name } => {
			out.u8(constants::element_value::ENUM);
			out.u16(*type_name);
			out.u16(*constant_name);
		},
		ElementValue::Class { descriptor } => {
			out.u8(constants::element_value::CLASS);
			out.u16(*descriptor);
		},
		ElementValue::Annotation(annotation) => {
			out.u8(constants::element_value::ANNOTATION);
			write_annotation(out, annotation)?;
		},
		ElementValue::Array(values) => {
			out.u8(constants::element_value::ARRAY);
			out.len_u16(values.len(), "element values")?;
			for value in values {
				write_element_value(out, value)?;
			}
		},
	}
	Ok(())
}

fn write_type_annotation(out: &mut Vec<u8>, annotation: &TypeAnnotation) -> Result<()> {
	out.u8(annotation.target_info.target_type());
	match &annotation.target_info {
		TargetInfo::TypeParameter { index, .. } => out.u8(*index),
		TargetInfo::SuperType { index } => out.u16(*index),
		TargetInfo::TypeParameterBound { type_parameter, bound, .. } => {
			out.u8(*type_parameter);
			out.u8(*bound);
		},
		TargetInfo::Empty { .. } => {},
		TargetInfo::FormalParameter { index } => out.u8(*index),
		TargetInfo::Throws { index } => out.u16(*index),
		TargetInfo::LocalVariable { table, .. } => {
			out.len_u16(table.len(), "local variable targets")?;
			for target in table {
				out.u16(target.start_pc);
				out.u16(target.length);
				out.u16(target.index);
			}
		},
		TargetInfo::Catch { exception_table_index } => out.u16(*exception_table_index),
		TargetInfo::Offset { offset, .. } => out.u16(*offset),
		TargetInfo::TypeArgument { offset, index, .. } => {
			out.u16(*offset);
			out.u8(*index);
		},
	}

	out.len_u8(annotation.type_path.len(), "type path entries")?;
	for entry in &annotation.type_path {
		out.u8(entry.kind);
		out.u8(entry.type_argument_index);
	}

	write_annotation(out, &annotation.annotation)
}

fn write_module(out: &mut Vec<u8>, module: &ModuleInfo) -> Result<()> {
	out.u16(module.name);
	out.u16(module.flags);
	out.u16(module.version);

	out.len_u16(module.requires.len(), "module requires")?;
	for requires in &module.requires {
		out.u16(requires.module);
		out.u16(requires.flags);
		out.u16(requires.version);
	}

	out.len_u16(module.exports.len(), "module exports")?;
	for exports in &module.exports {
		out.u16(exports.package);
		out.u16(exports.flags);
		out.len_u16(exports.to.len(), "module exports targets")?;
		for &to in &exports.to {
			out.u16(to);
		}
	}

	out.len_u16(module.opens.len(), "module opens")?;
	for opens in &module.opens {
		out.u16(opens.package);
		out.u16(opens.flags);
		out.len_u16(opens.to.len(), "module opens targets")?;
		for &to in &opens.to {
			out.u16(to);
		}
	}

	out.len_u16(module.uses.len(), "module uses")?;
	for &uses in &module.uses {
		out.u16(uses);
	}

	out.len_u16(module.provides.len(), "module provides")?;
	for provides in &module.provides {
		out.u16(provides.service);
		out.len_u16(provides.with.len(), "module provides implementations")?;
		for &with in &provides.with {
			out.u16(with);
		}
	}

	Ok(())
}

/// Collects the names of every attribute in the class, including nested
/// ones, and interns them as utf8 pool entries.
fn intern_attribute_names(class: &mut ProgramClass) -> Result<HashMap<String, u16>> {
	fn collect(attributes: &[Attribute], into: &mut Vec<String>) {
		for attribute in attributes {
			into.push(attribute.name().to_owned());
			if let Attribute::Code(code) = attribute {
				collect(&code.attributes, into);
			}
		}
	}

	let mut names = Vec::new();
	collect(&class.attributes, &mut names);
	for member in class.fields.iter().chain(&class.methods) {
		collect(&member.attributes, &mut names);
	}

	let mut indices = HashMap::new();
	for name in names {
		let index = class.pool.add_utf8(&name)?;
		indices.insert(name, index);
	}

	Ok(indices)
}
