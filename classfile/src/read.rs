//! Reading the binary class file format.

use anyhow::{anyhow, bail, Context, Result};
use crate::constants::{self, attribute, pool, target_type, element_value};
use crate::mutf8;
use crate::pool::{Constant, ConstantPool};
use crate::tree::annotation::{Annotation, ElementPair, ElementValue, LocalVariableTarget, TargetInfo, TypeAnnotation, TypePathEntry};
use crate::tree::attribute::{Attribute, BootstrapMethod, CodeAttribute, ExceptionInfo, InnerClass, LineNumber, LocalVariable, LocalVariableType, MethodParameter};
use crate::tree::class::{Member, ProgramClass};
use crate::tree::module::{ModuleExports, ModuleInfo, ModuleOpens, ModuleProvides, ModuleRequires};
use crate::tree::version::Version;

struct Reader<'a> {
	bytes: &'a [u8],
	position: usize,
}

impl<'a> Reader<'a> {
	fn new(bytes: &'a [u8]) -> Reader<'a> {
		Reader { bytes, position: 0 }
	}

	fn take(&mut self, count: usize) -> Result<&'a [u8]> {
		let end = self.position.checked_add(count)
			.filter(|&end| end <= self.bytes.len())
			.ok_or_else(|| anyhow!("unexpected end of class file at offset {}", self.position))?;
		let slice = &self.bytes[self.position..end];
		self.position = end;
		Ok(slice)
	}

	fn u8(&mut self) -> Result<u8> {
		Ok(self.take(1)?[0])
	}

	fn u16(&mut self) -> Result<u16> {
		Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
	}

	fn u32(&mut self) -> Result<u32> {
		Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
	}

	fn is_at_end(&self) -> bool {
		self.position == self.bytes.len()
	}
}

/// Reads a class from its class file bytes.
pub fn read(bytes: &[u8]) -> Result<ProgramClass> {
	let mut reader = Reader::new(bytes);

	let magic = reader.u32()?;
	if magic != constants::MAGIC {
		bail!("wrong magic: got {magic:#x}, expected 0xCAFEBABE");
	}

	let minor = reader.u16()?;
	let major = reader.u16()?;
	if !constants::version::is_supported(major) {
		bail!("unsupported class file version {major}.{minor}");
	}

	let pool = read_pool(&mut reader)?;

	let access_flags = reader.u16()?;
	let this_class = reader.u16()?;
	let super_class = reader.u16()?;

	let interfaces = (0..reader.u16()?)
		.map(|_| reader.u16())
		.collect::<Result<_>>()?;

	let fields = read_members(&mut reader, &pool)?;
	let methods = read_members(&mut reader, &pool)?;
	let attributes = read_attributes(&mut reader, &pool)?;

	if !reader.is_at_end() {
		bail!("trailing data after the class file structure");
	}

	Ok(ProgramClass {
		version: Version::new(major, minor),
		pool,
		access_flags,
		this_class,
		super_class,
		interfaces,
		fields,
		methods,
		attributes,
	})
}

fn read_pool(reader: &mut Reader) -> Result<ConstantPool> {
	let count = reader.u16()? as u32;
	let mut constants = ConstantPool::new();

	let mut index: u32 = 1;
	while index < count {
		let tag = reader.u8()?;
		let constant = match tag {
			pool::UTF8 => {
				let length = reader.u16()? as usize;
				let string = mutf8::decode(reader.take(length)?)
					.with_context(|| anyhow!("in constant pool entry {index}"))?;
				Constant::Utf8(string)
			},
			pool::INTEGER => Constant::Integer(reader.u32()? as i32),
			pool::FLOAT => Constant::Float(reader.u32()?),
			pool::LONG => Constant::Long(((reader.u32()? as u64) << 32 | reader.u32()? as u64) as i64),
			pool::DOUBLE => Constant::Double((reader.u32()? as u64) << 32 | reader.u32()? as u64),
			pool::CLASS => Constant::Class { name: reader.u16()? },
			pool::STRING => Constant::String { string: reader.u16()? },
			pool::FIELD_REF => Constant::FieldRef { class: reader.u16()?, name_and_type: reader.u16()? },
			pool::METHOD_REF => Constant::MethodRef { class: reader.u16()?, name_and_type: reader.u16()? },
			pool::INTERFACE_METHOD_REF => Constant::InterfaceMethodRef { class: reader.u16()?, name_and_type: reader.u16()? },
			pool::NAME_AND_TYPE => Constant::NameAndType { name: reader.u16()?, descriptor: reader.u16()? },
			pool::METHOD_HANDLE => Constant::MethodHandle { kind: reader.u8()?, reference: reader.u16()? },
			pool::METHOD_TYPE => Constant::MethodType { descriptor: reader.u16()? },
			pool::DYNAMIC => Constant::Dynamic { bootstrap_method: reader.u16()?, name_and_type: reader.u16()? },
			pool::INVOKE_DYNAMIC => Constant::InvokeDynamic { bootstrap_method: reader.u16()?, name_and_type: reader.u16()? },
			pool::MODULE => Constant::Module { name: reader.u16()? },
			pool::PACKAGE => Constant::Package { name: reader.u16()? },
			x => bail!("unknown constant pool tag {x} at entry {index}"),
		};

		index += if constant.is_wide() { 2 } else { 1 };
		constants.put_raw(constant)?;
	}

	Ok(constants)
}

fn read_members(reader: &mut Reader, pool: &ConstantPool) -> Result<Vec<Member>> {
	(0..reader.u16()?)
		.map(|_| {
			Ok(Member {
				access_flags: reader.u16()?,
				name: reader.u16()?,
				descriptor: reader.u16()?,
				attributes: read_attributes(reader, pool)?,
			})
		})
		.collect()
}

fn read_attributes(reader: &mut Reader, pool: &ConstantPool) -> Result<Vec<Attribute>> {
	(0..reader.u16()?)
		.map(|_| read_attribute(reader, pool))
		.collect()
}

fn read_attribute(reader: &mut Reader, pool: &ConstantPool) -> Result<Attribute> {
	let name_index = reader.u16()?;
	let name = pool.utf8(name_index)
		.context("bad attribute name index")?;
	let length = reader.u32()? as usize;
	let data = reader.take(length)?;

	let mut reader = Reader::new(data);
	let attribute = match name {
		attribute::CONSTANT_VALUE => Attribute::ConstantValue { value: reader.u16()? },
		attribute::CODE => Attribute::Code(read_code(&mut reader, pool)?),
		attribute::EXCEPTIONS => Attribute::Exceptions {
			exceptions: (0..reader.u16()?).map(|_| reader.u16()).collect::<Result<_>>()?,
		},
		attribute::INNER_CLASSES => Attribute::InnerClasses(
			(0..reader.u16()?)
				.map(|_| {
					Ok(InnerClass {
						inner_class: reader.u16()?,
						outer_class: reader.u16()?,
						inner_name: reader.u16()?,
						access_flags: reader.u16()?,
					})
				})
				.collect::<Result<_>>()?,
		),
		attribute::ENCLOSING_METHOD => Attribute::EnclosingMethod {
			class: reader.u16()?,
			name_and_type: reader.u16()?,
		},
		attribute::SYNTHETIC => Attribute::Synthetic,
		attribute::SIGNATURE => Attribute::Signature { signature: reader.u16()? },
		attribute::SOURCE_FILE => Attribute::SourceFile { source_file: reader.u16()? },
		attribute::SOURCE_DIR => Attribute::SourceDir { source_dir: reader.u16()? },
		attribute::DEPRECATED => Attribute::Deprecated,
		attribute::LINE_NUMBER_TABLE => Attribute::LineNumberTable(
			(0..reader.u16()?)
				.map(|_| Ok(LineNumber { start_pc: reader.u16()?, line: reader.u16()? }))
				.collect::<Result<_>>()?,
		),
		attribute::LOCAL_VARIABLE_TABLE => Attribute::LocalVariableTable(
			(0..reader.u16()?)
				.map(|_| {
					Ok(LocalVariable {
						start_pc: reader.u16()?,
						length: reader.u16()?,
						name: reader.u16()?,
						descriptor: reader.u16()?,
						index: reader.u16()?,
					})
				})
				.collect::<Result<_>>()?,
		),
		attribute::LOCAL_VARIABLE_TYPE_TABLE => Attribute::LocalVariableTypeTable(
			(0..reader.u16()?)
				.map(|_| {
					Ok(LocalVariableType {
						start_pc: reader.u16()?,
						length: reader.u16()?,
						name: reader.u16()?,
						signature: reader.u16()?,
						index: reader.u16()?,
					})
				})
				.collect::<Result<_>>()?,
		),
		attribute::STACK_MAP => Attribute::StackMap(data[..].to_vec()),
		attribute::STACK_MAP_TABLE => Attribute::StackMapTable(data[..].to_vec()),
		attribute::RUNTIME_VISIBLE_ANNOTATIONS => Attribute::RuntimeVisibleAnnotations(read_annotations(&mut reader)?),
		attribute::RUNTIME_INVISIBLE_ANNOTATIONS => Attribute::RuntimeInvisibleAnnotations(read_annotations(&mut reader)?),
		attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS =>
			Attribute::RuntimeVisibleParameterAnnotations(read_parameter_annotations(&mut reader)?),
		attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS =>
			Attribute::RuntimeInvisibleParameterAnnotations(read_parameter_annotations(&mut reader)?),
		attribute::RUNTIME_VISIBLE_TYPE_ANNOTATIONS =>
			Attribute::RuntimeVisibleTypeAnnotations(read_type_annotations(&mut reader)?),
		attribute::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS =>
			Attribute::RuntimeInvisibleTypeAnnotations(read_type_annotations(&mut reader)?),
		attribute::ANNOTATION_DEFAULT => Attribute::AnnotationDefault(read_element_value(&mut reader)?),
		attribute::BOOTSTRAP_METHODS => Attribute::BootstrapMethods(
			(0..reader.u16()?)
				.map(|_| {
					Ok(BootstrapMethod {
						method_handle: reader.u16()?,
						arguments: (0..reader.u16()?).map(|_| reader.u16()).collect::<Result<_>>()?,
					})
				})
				.collect::<Result<_>>()?,
		),
		attribute::METHOD_PARAMETERS => Attribute::MethodParameters(
			(0..reader.u8()?)
				.map(|_| Ok(MethodParameter { name: reader.u16()?, access_flags: reader.u16()? }))
				.collect::<Result<_>>()?,
		),
		attribute::MODULE => Attribute::Module(read_module(&mut reader)?),
		attribute::MODULE_MAIN_CLASS => Attribute::ModuleMainClass { main_class: reader.u16()? },
		attribute::MODULE_PACKAGES => Attribute::ModulePackages {
			packages: (0..reader.u16()?).map(|_| reader.u16()).collect::<Result<_>>()?,
		},
		attribute::NEST_HOST => Attribute::NestHost { host_class: reader.u16()? },
		attribute::NEST_MEMBERS => Attribute::NestMembers {
			classes: (0..reader.u16()?).map(|_| reader.u16()).collect::<Result<_>>()?,
		},
		_ => {
			return Ok(Attribute::Unknown { name: name.to_owned(), data: data.to_vec() });
		},
	};

	if !reader.is_at_end() && !matches!(attribute, Attribute::StackMap(..) | Attribute::StackMapTable(..)) {
		bail!("attribute {name:?} has {} trailing bytes", data.len() - reader.position);
	}

	Ok(attribute)
}

fn read_code(reader: &mut Reader, pool: &ConstantPool) -> Result<CodeAttribute> {
	let max_stack = reader.u16()?;
	let max_locals = reader.u16()?;
	let code_length = reader.u32()? as usize;
	let code = reader.take(code_length)?.to_vec();

	let exception_table = (0..reader.u16()?)
		.map(|_| {
			Ok(ExceptionInfo {
				start_pc: reader.u16()?,
				end_pc: reader.u16()?,
				handler_pc: reader.u16()?,
				catch_type: reader.u16()?,
			})
		})
		.collect::<Result<_>>()?;

	let attributes = read_attributes(reader, pool)?;

	Ok(CodeAttribute { max_stack, max_locals, code, exception_table, attributes })
}

fn read_annotations(reader: &mut Reader) -> Result<Vec<Annotation>> {
	(0..reader.u16()?)
		.map(|_| read_annotation(reader))
		.collect()
}

fn read_parameter_annotations(reader: &mut Reader) -> Result<Vec<Vec<Annotation>>> {
	(0..reader.u8()?)
		.map(|_| read_annotations(reader))
		.collect()
}

fn read_annotation(reader: &mut Reader) -> Result<Annotation> {
	let type_index = reader.u16()?;
	let elements = (0..reader.u16()?)
		.map(|_| {
			Ok(ElementPair {
				name: reader.u16()?,
				value: read_element_value(reader)?,
			})
		})
		.collect::<Result<_>>()?;

	Ok(Annotation { type_index, elements })
}

fn read_element_value(reader: &mut Reader) -> Result<ElementValue> {
	let tag = reader.u8()?;
	Ok(match tag {
		element_value::BYTE | element_value::CHAR | element_value::DOUBLE | element_value::FLOAT
		| element_value::INT | element_value::LONG | element_value::SHORT | element_value::BOOLEAN
		| element_value::STRING => ElementValue::Constant { tag, value: reader.u16()? },
		element_value::ENUM => ElementValue::EnumConstant {
			type_name: reader.u16()?,
			constant_name: reader.u16()?,
		},
		element_value::CLASS => ElementValue::Class { descriptor: reader.u16()? },
		element_value::ANNOTATION => ElementValue::Annotation(read_annotation(reader)?),
		element_value::ARRAY => ElementValue::Array(
			(0..reader.u16()?)
				.map(|_| read_element_value(reader))
				.collect::<Result<_>>()?,
		),
		x => bail!("unknown element value tag {x:#x}"),
	})
}

fn read_type_annotations(reader: &mut Reader) -> Result<Vec<TypeAnnotation>> {
	(0..reader.u16()?)
		.map(|_| {
			let target_info = read_target_info(reader)?;
			let type_path = (0..reader.u8()?)
				.map(|_| {
					Ok(TypePathEntry {
						kind: reader.u8()?,
						type_argument_index: reader.u8()?,
					})
				})
				.collect::<Result<_>>()?;
			let annotation = read_annotation(reader)?;

			Ok(TypeAnnotation { target_info, type_path, annotation })
		})
		.collect()
}

fn read_target_info(reader: &mut Reader) -> Result<TargetInfo> {
	let tag = reader.u8()?;
	Ok(match tag {
		target_type::PARAMETER_GENERIC_CLASS | target_type::PARAMETER_GENERIC_METHOD =>
			TargetInfo::TypeParameter { target_type: tag, index: reader.u8()? },
		target_type::EXTENDS => TargetInfo::SuperType { index: reader.u16()? },
		target_type::BOUND_GENERIC_CLASS | target_type::BOUND_GENERIC_METHOD =>
			TargetInfo::TypeParameterBound { target_type: tag, type_parameter: reader.u8()?, bound: reader.u8()? },
		target_type::FIELD | target_type::RETURN | target_type::RECEIVER =>
			TargetInfo::Empty { target_type: tag },
		target_type::PARAMETER => TargetInfo::FormalParameter { index: reader.u8()? },
		target_type::THROWS => TargetInfo::Throws { index: reader.u16()? },
		target_type::LOCAL_VARIABLE | target_type::RESOURCE_VARIABLE => TargetInfo::LocalVariable {
			target_type: tag,
			table: (0..reader.u16()?)
				.map(|_| {
					Ok(LocalVariableTarget {
						start_pc: reader.u16()?,
						length: reader.u16()?,
						index: reader.u16()?,
					})
				})
				.collect::<Result<_>>()?,
		},
		target_type::CATCH => TargetInfo::Catch { exception_table_index: reader.u16()? },
		target_type::INSTANCE_OF | target_type::NEW
		| target_type::METHOD_REFERENCE_NEW | target_type::METHOD_REFERENCE =>
			TargetInfo::Offset { target_type: tag, offset: reader.u16()? },
		target_type::CAST
		| target_type::ARGUMENT_GENERIC_METHOD_NEW | target_type::ARGUMENT_GENERIC_METHOD
		| target_type::ARGUMENT_GENERIC_METHOD_REFERENCE_NEW | target_type::ARGUMENT_GENERIC_METHOD_REFERENCE =>
			TargetInfo::TypeArgument { target_type: tag, offset: reader.u16()?, index: reader.u8()? },
		x => bail!("unknown type annotation target type {x:#x}"),
	})
}

fn read_module(reader: &mut Reader) -> Result<ModuleInfo> {
	Ok(ModuleInfo {
		name: reader.u16()?,
		flags: reader.u16()?,
		version: reader.u16()?,
		requires: (0..reader.u16()?)
			.map(|_| {
				Ok(ModuleRequires {
					module: reader.u16()?,
					flags: reader.u16()?,
					version: reader.u16()?,
				})
			})
			.collect::<Result<_>>()?,
		exports: (0..reader.u16()?)
			.map(|_| {
				Ok(ModuleExports {
					package: reader.u16()?,
					flags: reader.u16()?,
					to: (0..reader.u16()?).map(|_| reader.u16()).collect::<Result<_>>()?,
				})
			})
			.collect::<Result<_>>()?,
		opens: (0..reader.u16()?)
			.map(|_| {
				Ok(ModuleOpens {
					package: reader.u16()?,
					flags: reader.u16()?,
					to: (0..reader.u16()?).map(|_| reader.u16()).collect::<Result<_>>()?,
				})
			})
			.collect::<Result<_>>()?,
		uses: (0..reader.u16()?).map(|_| reader.u16()).collect::<Result<_>>()?,
		provides: (0..reader.u16()?)
			.map(|_| {
				Ok(ModuleProvides {
					service: reader.u16()?,
					with: (0..reader.u16()?).map(|_| reader.u16()).collect::<Result<_>>()?,
				})
			})
			.collect::<Result<_>>()?,
	})
}
