use anyhow::Result;
use crate::pool::ConstantPool;
use crate::tree::attribute::Attribute;
use crate::tree::version::Version;

/// A class, at the constant pool level.
///
/// Symbolic references (`this_class`, `super_class`, member names and
/// descriptors, everything inside attributes) are pool indices; the pool
/// itself is owned by the class.
#[derive(Debug, Clone, Default)]
pub struct ProgramClass {
	pub version: Version,
	pub pool: ConstantPool,
	pub access_flags: u16,
	pub this_class: u16,
	/// Zero means no superclass, which only `java/lang/Object` and
	/// module-info classes have.
	pub super_class: u16,
	pub interfaces: Vec<u16>,
	pub fields: Vec<Member>,
	pub methods: Vec<Member>,
	pub attributes: Vec<Attribute>,
}

/// A field or method.
#[derive(Debug, Clone, Default)]
pub struct Member {
	pub access_flags: u16,
	pub name: u16,
	pub descriptor: u16,
	pub attributes: Vec<Attribute>,
}

impl ProgramClass {
	/// The name of this class, in internal form.
	pub fn name(&self) -> Result<&str> {
		self.pool.class_name(self.this_class)
	}

	pub fn super_name(&self) -> Result<Option<&str>> {
		if self.super_class == 0 {
			Ok(None)
		} else {
			self.pool.class_name(self.super_class).map(Some)
		}
	}

	pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
		find_attribute(&self.attributes, name)
	}
}

impl Member {
	pub fn name<'a>(&self, pool: &'a ConstantPool) -> Result<&'a str> {
		pool.utf8(self.name)
	}

	pub fn descriptor<'a>(&self, pool: &'a ConstantPool) -> Result<&'a str> {
		pool.utf8(self.descriptor)
	}

	pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
		find_attribute(&self.attributes, name)
	}
}

pub fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
	attributes.iter().find(|attribute| attribute.name() == name)
}
