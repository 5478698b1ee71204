//! Numeric constants of the class file format.

pub const MAGIC: u32 = 0xCAFE_BABE;

/// Class file versions this crate reads and writes, as `(major, minor)`.
///
/// Majors 45 through 57 correspond to the Java versions 1.0/1.1 through 13.
pub mod version {
	pub const V1_0: u16 = 45;
	pub const V1_6: u16 = 50;
	pub const V13: u16 = 57;

	pub fn is_supported(major: u16) -> bool {
		(V1_0..=V13).contains(&major)
	}
}

/// Constant pool tags.
pub mod pool {
	pub const UTF8: u8 = 1;
	pub const INTEGER: u8 = 3;
	pub const FLOAT: u8 = 4;
	pub const LONG: u8 = 5;
	pub const DOUBLE: u8 = 6;
	pub const CLASS: u8 = 7;
	pub const STRING: u8 = 8;
	pub const FIELD_REF: u8 = 9;
	pub const METHOD_REF: u8 = 10;
	pub const INTERFACE_METHOD_REF: u8 = 11;
	pub const NAME_AND_TYPE: u8 = 12;
	pub const METHOD_HANDLE: u8 = 15;
	pub const METHOD_TYPE: u8 = 16;
	pub const DYNAMIC: u8 = 17;
	pub const INVOKE_DYNAMIC: u8 = 18;
	pub const MODULE: u8 = 19;
	pub const PACKAGE: u8 = 20;
}

/// Access and property flags of classes, members, parameters and modules.
///
/// Several bits are shared between contexts (`0x0020` is `ACC_SUPER` on a
/// class but `ACC_SYNCHRONIZED` on a method, and so on).
pub mod access {
	pub const PUBLIC: u16 = 0x0001;
	pub const PRIVATE: u16 = 0x0002;
	pub const PROTECTED: u16 = 0x0004;
	pub const STATIC: u16 = 0x0008;
	pub const FINAL: u16 = 0x0010;
	pub const SUPER: u16 = 0x0020;
	pub const SYNCHRONIZED: u16 = 0x0020;
	pub const OPEN: u16 = 0x0020;
	pub const TRANSITIVE: u16 = 0x0020;
	pub const VOLATILE: u16 = 0x0040;
	pub const BRIDGE: u16 = 0x0040;
	pub const STATIC_PHASE: u16 = 0x0040;
	pub const TRANSIENT: u16 = 0x0080;
	pub const VARARGS: u16 = 0x0080;
	pub const NATIVE: u16 = 0x0100;
	pub const INTERFACE: u16 = 0x0200;
	pub const ABSTRACT: u16 = 0x0400;
	pub const STRICT: u16 = 0x0800;
	pub const SYNTHETIC: u16 = 0x1000;
	pub const ANNOTATION: u16 = 0x2000;
	pub const ENUM: u16 = 0x4000;
	pub const MANDATED: u16 = 0x8000;
	pub const MODULE: u16 = 0x8000;
}

/// The `reference_kind` values of a `CONSTANT_MethodHandle_info`.
pub mod method_handle {
	pub const GET_FIELD: u8 = 1;
	pub const GET_STATIC: u8 = 2;
	pub const PUT_FIELD: u8 = 3;
	pub const PUT_STATIC: u8 = 4;
	pub const INVOKE_VIRTUAL: u8 = 5;
	pub const INVOKE_STATIC: u8 = 6;
	pub const INVOKE_SPECIAL: u8 = 7;
	pub const NEW_INVOKE_SPECIAL: u8 = 8;
	pub const INVOKE_INTERFACE: u8 = 9;
}

/// The opcodes that take operands or otherwise need to be named, plus the
/// range bounds used for classification.
pub mod opcode {
	pub const NOP: u8 = 0x00;
	pub const ACONST_NULL: u8 = 0x01;
	pub const ICONST_M1: u8 = 0x02;
	pub const ICONST_0: u8 = 0x03;
	pub const ICONST_5: u8 = 0x08;
	pub const LCONST_0: u8 = 0x09;
	pub const DCONST_1: u8 = 0x0F;
	pub const BIPUSH: u8 = 0x10;
	pub const SIPUSH: u8 = 0x11;
	pub const LDC: u8 = 0x12;
	pub const LDC_W: u8 = 0x13;
	pub const LDC2_W: u8 = 0x14;
	pub const ILOAD: u8 = 0x15;
	pub const LLOAD: u8 = 0x16;
	pub const FLOAD: u8 = 0x17;
	pub const DLOAD: u8 = 0x18;
	pub const ALOAD: u8 = 0x19;
	pub const ILOAD_0: u8 = 0x1A;
	pub const LLOAD_0: u8 = 0x1E;
	pub const DLOAD_0: u8 = 0x26;
	pub const ALOAD_3: u8 = 0x2D;
	pub const IALOAD: u8 = 0x2E;
	pub const SALOAD: u8 = 0x35;
	pub const ISTORE: u8 = 0x36;
	pub const LSTORE: u8 = 0x37;
	pub const FSTORE: u8 = 0x38;
	pub const DSTORE: u8 = 0x39;
	pub const ASTORE: u8 = 0x3A;
	pub const ISTORE_0: u8 = 0x3B;
	pub const LSTORE_0: u8 = 0x3F;
	pub const DSTORE_0: u8 = 0x47;
	pub const ASTORE_3: u8 = 0x4E;
	pub const IASTORE: u8 = 0x4F;
	pub const SASTORE: u8 = 0x56;
	pub const POP: u8 = 0x57;
	pub const POP2: u8 = 0x58;
	pub const DUP: u8 = 0x59;
	pub const DUP_X1: u8 = 0x5A;
	pub const DUP_X2: u8 = 0x5B;
	pub const DUP2: u8 = 0x5C;
	pub const DUP2_X1: u8 = 0x5D;
	pub const DUP2_X2: u8 = 0x5E;
	pub const SWAP: u8 = 0x5F;
	pub const IADD: u8 = 0x60;
	pub const IINC: u8 = 0x84;
	pub const I2L: u8 = 0x85;
	pub const I2S: u8 = 0x93;
	pub const LCMP: u8 = 0x94;
	pub const DCMPG: u8 = 0x98;
	pub const IFEQ: u8 = 0x99;
	pub const IFLE: u8 = 0x9E;
	pub const IF_ICMPEQ: u8 = 0x9F;
	pub const IF_ACMPNE: u8 = 0xA6;
	pub const GOTO: u8 = 0xA7;
	pub const JSR: u8 = 0xA8;
	pub const RET: u8 = 0xA9;
	pub const TABLESWITCH: u8 = 0xAA;
	pub const LOOKUPSWITCH: u8 = 0xAB;
	pub const IRETURN: u8 = 0xAC;
	pub const LRETURN: u8 = 0xAD;
	pub const FRETURN: u8 = 0xAE;
	pub const DRETURN: u8 = 0xAF;
	pub const ARETURN: u8 = 0xB0;
	pub const RETURN: u8 = 0xB1;
	pub const GETSTATIC: u8 = 0xB2;
	pub const PUTSTATIC: u8 = 0xB3;
	pub const GETFIELD: u8 = 0xB4;
	pub const PUTFIELD: u8 = 0xB5;
	pub const INVOKEVIRTUAL: u8 = 0xB6;
	pub const INVOKESPECIAL: u8 = 0xB7;
	pub const INVOKESTATIC: u8 = 0xB8;
	pub const INVOKEINTERFACE: u8 = 0xB9;
	pub const INVOKEDYNAMIC: u8 = 0xBA;
	pub const NEW: u8 = 0xBB;
	pub const NEWARRAY: u8 = 0xBC;
	pub const ANEWARRAY: u8 = 0xBD;
	pub const ARRAYLENGTH: u8 = 0xBE;
	pub const ATHROW: u8 = 0xBF;
	pub const CHECKCAST: u8 = 0xC0;
	pub const INSTANCEOF: u8 = 0xC1;
	pub const MONITORENTER: u8 = 0xC2;
	pub const MONITOREXIT: u8 = 0xC3;
	pub const WIDE: u8 = 0xC4;
	pub const MULTIANEWARRAY: u8 = 0xC5;
	pub const IFNULL: u8 = 0xC6;
	pub const IFNONNULL: u8 = 0xC7;
	pub const GOTO_W: u8 = 0xC8;
	pub const JSR_W: u8 = 0xC9;
}

/// The `atype` operand values of `newarray`.
pub mod atype {
	pub const T_BOOLEAN: u8 = 4;
	pub const T_CHAR: u8 = 5;
	pub const T_FLOAT: u8 = 6;
	pub const T_DOUBLE: u8 = 7;
	pub const T_BYTE: u8 = 8;
	pub const T_SHORT: u8 = 9;
	pub const T_INT: u8 = 10;
	pub const T_LONG: u8 = 11;
}

/// The `target_type` values of a type annotation.
pub mod target_type {
	pub const PARAMETER_GENERIC_CLASS: u8 = 0x00;
	pub const PARAMETER_GENERIC_METHOD: u8 = 0x01;
	pub const EXTENDS: u8 = 0x10;
	pub const BOUND_GENERIC_CLASS: u8 = 0x11;
	pub const BOUND_GENERIC_METHOD: u8 = 0x12;
	pub const FIELD: u8 = 0x13;
	pub const RETURN: u8 = 0x14;
	pub const RECEIVER: u8 = 0x15;
	pub const PARAMETER: u8 = 0x16;
	pub const THROWS: u8 = 0x17;
	pub const LOCAL_VARIABLE: u8 = 0x40;
	pub const RESOURCE_VARIABLE: u8 = 0x41;
	pub const CATCH: u8 = 0x42;
	pub const INSTANCE_OF: u8 = 0x43;
	pub const NEW: u8 = 0x44;
	pub const METHOD_REFERENCE_NEW: u8 = 0x45;
	pub const METHOD_REFERENCE: u8 = 0x46;
	pub const CAST: u8 = 0x47;
	pub const ARGUMENT_GENERIC_METHOD_NEW: u8 = 0x48;
	pub const ARGUMENT_GENERIC_METHOD: u8 = 0x49;
	pub const ARGUMENT_GENERIC_METHOD_REFERENCE_NEW: u8 = 0x4A;
	pub const ARGUMENT_GENERIC_METHOD_REFERENCE: u8 = 0x4B;
}

/// The `type_path_kind` values of a type annotation path entry.
pub mod type_path {
	pub const ARRAY: u8 = 0;
	pub const NESTED: u8 = 1;
	pub const TYPE_ARGUMENT_BOUND: u8 = 2;
	pub const TYPE_ARGUMENT: u8 = 3;
}

/// The element value tags of annotations.
pub mod element_value {
	pub const BYTE: u8 = b'B';
	pub const CHAR: u8 = b'C';
	pub const DOUBLE: u8 = b'D';
	pub const FLOAT: u8 = b'F';
	pub const INT: u8 = b'I';
	pub const LONG: u8 = b'J';
	pub const SHORT: u8 = b'S';
	pub const BOOLEAN: u8 = b'Z';
	pub const STRING: u8 = b's';
	pub const ENUM: u8 = b'e';
	pub const CLASS: u8 = b'c';
	pub const ANNOTATION: u8 = b'@';
	pub const ARRAY: u8 = b'[';
}

/// Attribute names.
pub mod attribute {
	pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";
	pub const SOURCE_FILE: &str = "SourceFile";
	pub const SOURCE_DIR: &str = "SourceDir";
	pub const INNER_CLASSES: &str = "InnerClasses";
	pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
	pub const NEST_HOST: &str = "NestHost";
	pub const NEST_MEMBERS: &str = "NestMembers";
	pub const DEPRECATED: &str = "Deprecated";
	pub const SYNTHETIC: &str = "Synthetic";
	pub const SIGNATURE: &str = "Signature";
	pub const CONSTANT_VALUE: &str = "ConstantValue";
	pub const METHOD_PARAMETERS: &str = "MethodParameters";
	pub const EXCEPTIONS: &str = "Exceptions";
	pub const CODE: &str = "Code";
	pub const STACK_MAP: &str = "StackMap";
	pub const STACK_MAP_TABLE: &str = "StackMapTable";
	pub const LINE_NUMBER_TABLE: &str = "LineNumberTable";
	pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
	pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
	pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
	pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
	pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
	pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";
	pub const RUNTIME_VISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeVisibleTypeAnnotations";
	pub const RUNTIME_INVISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeInvisibleTypeAnnotations";
	pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
	pub const MODULE: &str = "Module";
	pub const MODULE_MAIN_CLASS: &str = "ModuleMainClass";
	pub const MODULE_PACKAGES: &str = "ModulePackages";
}

/// Well known class names, in internal form.
pub mod class_names {
	pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";
	pub const JAVA_LANG_ENUM: &str = "java/lang/Enum";
	pub const JAVA_LANG_ANNOTATION_ANNOTATION: &str = "java/lang/annotation/Annotation";
}
