//! The constant pool.

use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use crate::constants::pool;

/// A single constant pool entry.
///
/// Entries reference each other by index. Floating point values are stored
/// as their bit patterns so that entries can be hashed and compared for the
/// deduplication the pool editor performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
	Utf8(String),
	Integer(i32),
	Float(u32),
	Long(i64),
	Double(u64),
	Class { name: u16 },
	String { string: u16 },
	FieldRef { class: u16, name_and_type: u16 },
	MethodRef { class: u16, name_and_type: u16 },
	InterfaceMethodRef { class: u16, name_and_type: u16 },
	NameAndType { name: u16, descriptor: u16 },
	MethodHandle { kind: u8, reference: u16 },
	MethodType { descriptor: u16 },
	Dynamic { bootstrap_method: u16, name_and_type: u16 },
	InvokeDynamic { bootstrap_method: u16, name_and_type: u16 },
	Module { name: u16 },
	Package { name: u16 },
}

impl Constant {
	pub fn tag(&self) -> u8 {
		match self {
			Constant::Utf8(..) => pool::UTF8,
			Constant::Integer(..) => pool::INTEGER,
			Constant::Float(..) => pool::FLOAT,
			Constant::Long(..) => pool::LONG,
			Constant::Double(..) => pool::DOUBLE,
			Constant::Class { .. } => pool::CLASS,
			Constant::String { .. } => pool::STRING,
			Constant::FieldRef { .. } => pool::FIELD_REF,
			Constant::MethodRef { .. } => pool::METHOD_REF,
			Constant::InterfaceMethodRef { .. } => pool::INTERFACE_METHOD_REF,
			Constant::NameAndType { .. } => pool::NAME_AND_TYPE,
			Constant::MethodHandle { .. } => pool::METHOD_HANDLE,
			Constant::MethodType { .. } => pool::METHOD_TYPE,
			Constant::Dynamic { .. } => pool::DYNAMIC,
			Constant::InvokeDynamic { .. } => pool::INVOKE_DYNAMIC,
			Constant::Module { .. } => pool::MODULE,
			Constant::Package { .. } => pool::PACKAGE,
		}
	}

	/// Long and double entries occupy two pool slots.
	pub fn is_wide(&self) -> bool {
		matches!(self, Constant::Long(..) | Constant::Double(..))
	}
}

/// A 1-based, deduplicating constant pool.
///
/// Slot 0 is reserved and long/double entries take up two slots, as in the
/// class file format. The `add_*` methods return the index of an existing
/// structurally equal entry when there is one, so building a class through
/// them never creates duplicates.
#[derive(Debug, Clone)]
pub struct ConstantPool {
	entries: Vec<Option<Constant>>,
	lookup: IndexMap<Constant, u16>,
}

impl Default for ConstantPool {
	fn default() -> ConstantPool {
		ConstantPool::new()
	}
}

impl ConstantPool {
	pub fn new() -> ConstantPool {
		ConstantPool {
			entries: vec![None],
			lookup: IndexMap::new(),
		}
	}

	/// The `constant_pool_count` of the class file format: one more than the
	/// number of occupied slots.
	pub fn count(&self) -> u16 {
		self.entries.len() as u16
	}

	pub fn entries(&self) -> impl Iterator<Item = (u16, &Constant)> {
		self.entries.iter()
			.enumerate()
			.filter_map(|(index, slot)| slot.as_ref().map(|entry| (index as u16, entry)))
	}

	pub fn get(&self, index: u16) -> Result<&Constant> {
		self.entries.get(index as usize)
			.and_then(|slot| slot.as_ref())
			.ok_or_else(|| anyhow!("invalid constant pool index {index}"))
	}

	pub fn utf8(&self, index: u16) -> Result<&str> {
		match self.get(index)? {
			Constant::Utf8(string) => Ok(string),
			entry => bail!("constant pool entry {index} is not utf8: {entry:?}"),
		}
	}

	/// The name of the class referenced by a `Class` entry, in internal form.
	pub fn class_name(&self, index: u16) -> Result<&str> {
		match self.get(index)? {
			&Constant::Class { name } => self.utf8(name),
			entry => bail!("constant pool entry {index} is not a class: {entry:?}"),
		}
	}

	pub fn module_name(&self, index: u16) -> Result<&str> {
		match self.get(index)? {
			&Constant::Module { name } => self.utf8(name),
			entry => bail!("constant pool entry {index} is not a module: {entry:?}"),
		}
	}

	pub fn package_name(&self, index: u16) -> Result<&str> {
		match self.get(index)? {
			&Constant::Package { name } => self.utf8(name),
			entry => bail!("constant pool entry {index} is not a package: {entry:?}"),
		}
	}

	pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
		match self.get(index)? {
			&Constant::NameAndType { name, descriptor } => Ok((self.utf8(name)?, self.utf8(descriptor)?)),
			entry => bail!("constant pool entry {index} is not a name-and-type: {entry:?}"),
		}
	}

	/// The `(class index, name, descriptor)` of a field, method or interface
	/// method reference.
	pub fn member_ref(&self, index: u16) -> Result<(u16, &str, &str)> {
		match self.get(index)? {
			&Constant::FieldRef { class, name_and_type }
			| &Constant::MethodRef { class, name_and_type }
			| &Constant::InterfaceMethodRef { class, name_and_type } => {
				let (name, descriptor) = self.name_and_type(name_and_type)?;
				Ok((class, name, descriptor))
			},
			entry => bail!("constant pool entry {index} is not a member reference: {entry:?}"),
		}
	}

	/// The descriptor of a member reference, used for `invokeinterface`
	/// operand computation.
	pub fn ref_type(&self, index: u16) -> Result<&str> {
		let (_, _, descriptor) = self.member_ref(index)?;
		Ok(descriptor)
	}

	/// The descriptor behind any reference an instruction can point at:
	/// member references, `Dynamic` and `InvokeDynamic` entries.
	pub fn ref_descriptor(&self, index: u16) -> Result<&str> {
		match self.get(index)? {
			&Constant::Dynamic { name_and_type, .. }
			| &Constant::InvokeDynamic { name_and_type, .. } => Ok(self.name_and_type(name_and_type)?.1),
			_ => self.ref_type(index),
		}
	}

	fn add(&mut self, constant: Constant) -> Result<u16> {
		if let Some(&index) = self.lookup.get(&constant) {
			return Ok(index);
		}

		let index = self.entries.len();
		let slots = if constant.is_wide() { 2 } else { 1 };
		if index + slots > 0x10000 {
			bail!("constant pool overflow, more than 65535 slots needed");
		}

		self.lookup.insert(constant.clone(), index as u16);
		self.entries.push(Some(constant));
		if slots == 2 {
			self.entries.push(None);
		}

		Ok(index as u16)
	}

	/// Used by the binary reader, which must preserve the exact indices of
	/// the file it reads.
	pub(crate) fn put_raw(&mut self, constant: Constant) -> Result<u16> {
		let index = self.entries.len();
		if index + if constant.is_wide() { 2 } else { 1 } > 0x10000 {
			bail!("constant pool overflow, more than 65535 slots needed");
		}

		// First occurrence wins in the dedup index, matching lookups against
		// files that do contain duplicates.
		let wide = constant.is_wide();
		self.lookup.entry(constant.clone()).or_insert(index as u16);
		self.entries.push(Some(constant));
		if wide {
			self.entries.push(None);
		}

		Ok(index as u16)
	}

	pub fn add_utf8(&mut self, string: &str) -> Result<u16> {
		self.add(Constant::Utf8(string.to_owned()))
	}

	pub fn add_integer(&mut self, value: i32) -> Result<u16> {
		self.add(Constant::Integer(value))
	}

	pub fn add_long(&mut self, value: i64) -> Result<u16> {
		self.add(Constant::Long(value))
	}

	pub fn add_float(&mut self, value: f32) -> Result<u16> {
		self.add(Constant::Float(value.to_bits()))
	}

	pub fn add_double(&mut self, value: f64) -> Result<u16> {
		self.add(Constant::Double(value.to_bits()))
	}

	pub fn add_class(&mut self, name: &str) -> Result<u16> {
		let name = self.add_utf8(name)?;
		self.add(Constant::Class { name })
	}

	pub fn add_string(&mut self, string: &str) -> Result<u16> {
		let string = self.add_utf8(string)?;
		self.add(Constant::String { string })
	}

	pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
		let name = self.add_utf8(name)?;
		let descriptor = self.add_utf8(descriptor)?;
		self.add(Constant::NameAndType { name, descriptor })
	}

	pub fn add_field_ref(&mut self, class: u16, name: &str, descriptor: &str) -> Result<u16> {
		let name_and_type = self.add_name_and_type(name, descriptor)?;
		self.add(Constant::FieldRef { class, name_and_type })
	}

	pub fn add_method_ref(&mut self, class: u16, name: &str, descriptor: &str) -> Result<u16> {
		let name_and_type = self.add_name_and_type(name, descriptor)?;
		self.add(Constant::MethodRef { class, name_and_type })
	}

	pub fn add_interface_method_ref(&mut self, class: u16, name: &str, descriptor: &str) -> Result<u16> {
		let name_and_type = self.add_name_and_type(name, descriptor)?;
		self.add(Constant::InterfaceMethodRef { class, name_and_type })
	}

	pub fn add_method_handle(&mut self, kind: u8, reference: u16) -> Result<u16> {
		self.add(Constant::MethodHandle { kind, reference })
	}

	pub fn add_method_type(&mut self, descriptor: &str) -> Result<u16> {
		let descriptor = self.add_utf8(descriptor)?;
		self.add(Constant::MethodType { descriptor })
	}

	pub fn add_dynamic(&mut self, bootstrap_method: u16, name: &str, descriptor: &str) -> Result<u16> {
		let name_and_type = self.add_name_and_type(name, descriptor)?;
		self.add(Constant::Dynamic { bootstrap_method, name_and_type })
	}

	pub fn add_invoke_dynamic(&mut self, bootstrap_method: u16, name: &str, descriptor: &str) -> Result<u16> {
		let name_and_type = self.add_name_and_type(name, descriptor)?;
		self.add(Constant::InvokeDynamic { bootstrap_method, name_and_type })
	}

	pub fn add_module(&mut self, name: &str) -> Result<u16> {
		let name = self.add_utf8(name)?;
		self.add(Constant::Module { name })
	}

	pub fn add_package(&mut self, name: &str) -> Result<u16> {
		let name = self.add_utf8(name)?;
		self.add(Constant::Package { name })
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use super::*;

	#[test]
	fn dedup() -> Result<()> {
		let mut pool = ConstantPool::new();

		let a = pool.add_utf8("java/lang/Object")?;
		let b = pool.add_class("java/lang/Object")?;
		let c = pool.add_class("java/lang/Object")?;
		assert_eq!(b, c);
		assert_eq!(pool.class_name(b)?, "java/lang/Object");
		assert_eq!(pool.utf8(a)?, "java/lang/Object");
		assert_eq!(pool.count(), 3);

		Ok(())
	}

	#[test]
	fn wide_entries_take_two_slots() -> Result<()> {
		let mut pool = ConstantPool::new();

		let a = pool.add_long(42)?;
		let b = pool.add_integer(1)?;
		assert_eq!(a, 1);
		assert_eq!(b, 3);
		assert!(pool.get(2).is_err());

		Ok(())
	}

	#[test]
	fn floats_compare_by_bits() -> Result<()> {
		let mut pool = ConstantPool::new();

		assert_eq!(pool.add_float(1.5)?, pool.add_float(1.5)?);
		assert_eq!(pool.add_double(f64::NAN)?, pool.add_double(f64::NAN)?);
		assert_ne!(pool.add_float(0.0)?, pool.add_float(-0.0)?);

		Ok(())
	}

	#[test]
	fn member_refs() -> Result<()> {
		let mut pool = ConstantPool::new();

		let class = pool.add_class("java/io/PrintStream")?;
		let index = pool.add_method_ref(class, "println", "(Ljava/lang/String;)V")?;
		let (clazz, name, descriptor) = pool.member_ref(index)?;
		assert_eq!(clazz, class);
		assert_eq!(name, "println");
		assert_eq!(descriptor, "(Ljava/lang/String;)V");

		Ok(())
	}
}
