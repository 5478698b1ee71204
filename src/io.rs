//! Reading and writing the containers class files travel in: bare files,
//! directories, `.jar` and `.jmod` archives.
//!
//! Every entry is routed by extension: `.class` entries are disassembled to
//! `.jbc`, `.jbc` entries are assembled to `.class`, anything else is
//! copied through unchanged.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use anyhow::{anyhow, bail, Context, Result};
use log::info;
use classfile::tree::version::Version;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};
use crate::Preverifier;

const JMOD_HEADER: [u8; 4] = [b'J', b'M', 1, 0];
const JMOD_CLASS_PREFIX: &str = "classes/";

/// One entry travelling through the pipeline: a name (with `/` separators)
/// and its content.
struct Entry {
	name: String,
	data: Vec<u8>,
}

/// Reads `input`, translates every entry, and writes the result to
/// `output`. The preverifier, if one is given, runs on every assembled
/// class of version 1.6 or newer.
pub fn process(input: &Path, output: &Path, preverifier: Option<&dyn Preverifier>) -> Result<()> {
	info!("Reading input file [{}]...", input.display());
	let entries = read_entries(input)?;

	let translated = entries.into_iter()
		.map(|entry| translate(entry, preverifier))
		.collect::<Result<Vec<_>>>()?;

	info!("Writing output file [{}]...", output.display());
	write_entries(output, translated)
}

fn translate(entry: Entry, preverifier: Option<&dyn Preverifier>) -> Result<Entry> {
	if let Some(base) = entry.name.strip_suffix(".class") {
		let class = classfile::read(&entry.data)
			.with_context(|| anyhow!("failed to read class file {}", entry.name))?;
		let text = crate::disassemble(&class)
			.with_context(|| anyhow!("failed to disassemble {}", entry.name))?;

		Ok(Entry { name: format!("{base}.jbc"), data: text.into_bytes() })
	} else if let Some(base) = entry.name.strip_suffix(".jbc") {
		let source = String::from_utf8(entry.data)
			.with_context(|| anyhow!("{} is not valid utf8", entry.name))?;
		let mut class = crate::assemble(&source)
			.with_context(|| anyhow!("failed to assemble {}", entry.name))?;

		if let Some(preverifier) = preverifier {
			if class.version >= Version::V1_6 {
				preverifier.preverify(&mut class)
					.with_context(|| anyhow!("failed to preverify {}", entry.name))?;
			}
		}

		let data = classfile::write(&mut class)
			.with_context(|| anyhow!("failed to write class file for {}", entry.name))?;
		Ok(Entry { name: format!("{base}.class"), data })
	} else {
		Ok(entry)
	}
}

fn is_archive(path: &Path) -> bool {
	has_extension(path, "jar") || has_extension(path, "jmod")
}

fn is_single_file(path: &Path) -> bool {
	has_extension(path, "class") || has_extension(path, "jbc")
}

fn has_extension(path: &Path, extension: &str) -> bool {
	path.extension().is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn read_entries(input: &Path) -> Result<Vec<Entry>> {
	if is_archive(input) {
		read_archive(input)
	} else if is_single_file(input) {
		let name = input.file_name()
			.ok_or_else(|| anyhow!("input {} has no file name", input.display()))?
			.to_string_lossy()
			.into_owned();
		let data = fs::read(input)
			.with_context(|| anyhow!("failed to read {}", input.display()))?;
		Ok(vec![Entry { name, data }])
	} else {
		read_directory(input)
	}
}

fn read_directory(input: &Path) -> Result<Vec<Entry>> {
	let mut entries = Vec::new();

	for file in WalkDir::new(input).sort_by_file_name() {
		let file = file?;
		if !file.file_type().is_file() {
			continue;
		}

		let name = file.path()
			.strip_prefix(input)?
			.components()
			.map(|component| component.as_os_str().to_string_lossy())
			.collect::<Vec<_>>()
			.join("/");
		let data = fs::read(file.path())
			.with_context(|| anyhow!("failed to read {}", file.path().display()))?;
		entries.push(Entry { name, data });
	}

	Ok(entries)
}

fn read_archive(input: &Path) -> Result<Vec<Entry>> {
	let jmod = has_extension(input, "jmod");
	let file = File::open(input)
		.with_context(|| anyhow!("failed to open {}", input.display()))?;
	let mut archive = ZipArchive::new(file)
		.with_context(|| anyhow!("failed to open archive {}", input.display()))?;

	let mut entries = Vec::new();
	for index in 0..archive.len() {
		let mut entry = archive.by_index(index)?;
		if entry.is_dir() {
			continue;
		}

		let mut name = entry.name().to_owned();
		// Class files inside jmod archives live under a classes/ prefix
		// that the translation works without.
		if jmod && (name.ends_with(".class") || name.ends_with(".jbc")) {
			if let Some(stripped) = name.strip_prefix(JMOD_CLASS_PREFIX) {
				name = stripped.to_owned();
			}
		}

		let mut data = Vec::with_capacity(entry.size() as usize);
		entry.read_to_end(&mut data)?;
		entries.push(Entry { name, data });
	}

	Ok(entries)
}

fn write_entries(output: &Path, entries: Vec<Entry>) -> Result<()> {
	if is_archive(output) {
		write_archive(output, entries)
	} else if is_single_file(output) {
		let [entry] = entries.as_slice() else {
			bail!("cannot write {} entries to the single file {}", entries.len(), output.display());
		};
		fs::write(output, &entry.data)
			.with_context(|| anyhow!("failed to write {}", output.display()))
	} else {
		for entry in entries {
			let path = output.join(&entry.name);
			if let Some(parent) = path.parent() {
				fs::create_dir_all(parent)
					.with_context(|| anyhow!("failed to create {}", parent.display()))?;
			}
			fs::write(&path, &entry.data)
				.with_context(|| anyhow!("failed to write {}", path.display()))?;
		}
		Ok(())
	}
}

fn write_archive(output: &Path, entries: Vec<Entry>) -> Result<()> {
	let jmod = has_extension(output, "jmod");
	let mut file = File::create(output)
		.with_context(|| anyhow!("failed to create {}", output.display()))?;

	// A jmod archive is a zip file behind a four byte header.
	if jmod {
		file.write_all(&JMOD_HEADER)?;
	}

	let mut writer = ZipWriter::new(file);
	for entry in entries {
		let mut name = entry.name;
		if jmod && (name.ends_with(".class") || name.ends_with(".jbc")) {
			name = format!("{JMOD_CLASS_PREFIX}{name}");
		}

		writer.start_file(name, FileOptions::default())?;
		writer.write_all(&entry.data)?;
	}

	let mut file = writer.finish()?;
	file.flush()?;
	Ok(())
}

#[cfg(test)]
mod testing {
	use super::*;

	#[test]
	fn routing_by_extension() {
		assert!(is_archive(Path::new("lib.jar")));
		assert!(is_archive(Path::new("java.base.jmod")));
		assert!(is_single_file(Path::new("Hello.class")));
		assert!(is_single_file(Path::new("Hello.jbc")));
		assert!(!is_archive(Path::new("classes")));
		assert!(!is_single_file(Path::new("classes")));
	}
}
