use std::cmp::Ordering;

/// A class file version.
///
/// Take a look at [the list of class file versions](https://docs.oracle.com/javase/specs/jvms/se13/html/jvms-4.html#jvms-4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
	pub major: u16,
	pub minor: u16,
}

impl Version {
	pub const V1_1: Version = Version::new(45, 3);
	pub const V1_6: Version = Version::new(50, 0);
	pub const V1_8: Version = Version::new(52, 0);
	pub const V13: Version = Version::new(57, 0);

	pub const fn new(major: u16, minor: u16) -> Version {
		Version { major, minor }
	}
}

impl Default for Version {
	fn default() -> Version {
		Version::V1_8
	}
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Version {
	fn cmp(&self, other: &Self) -> Ordering {
		self.major.cmp(&other.major)
			.then_with(|| self.minor.cmp(&other.minor))
	}
}
