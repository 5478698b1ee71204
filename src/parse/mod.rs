//! Assembling: jbc source text to a class model.
//!
//! The [`Parser`] wraps the token source with assertive consumption (the
//! `expect_*`/`accept_*` families) and carries the two pieces of
//! per-invocation state the grammar needs: the imports table and the label
//! map of the method body being parsed. The actual grammar lives in the
//! submodules, one per construct family, mirroring the structure of the
//! output model.

use std::collections::HashMap;
use indexmap::IndexMap;
use classfile::constants::access;
use crate::error::{ParseError, ParseResult};
use crate::token::{Token, TokenSource};
use crate::types;

mod constant;
mod class;
mod members;
mod attributes;
mod annotations;
mod instructions;

pub use class::parse_class;

pub struct Parser {
	tokens: TokenSource,
	/// Simple name to fully qualified dotted name, from `import`
	/// declarations.
	pub imports: HashMap<String, String>,
	/// Label name to symbolic offset for the method body currently being
	/// parsed. A fresh offset (`len + 1`) is allocated on first mention.
	pub labels: IndexMap<String, u16>,
}

impl Parser {
	pub fn new(source: &str) -> Parser {
		Parser {
			tokens: TokenSource::new(source),
			imports: HashMap::new(),
			labels: IndexMap::new(),
		}
	}

	pub fn line(&self) -> usize {
		self.tokens.line()
	}

	pub fn fail<T>(&self, message: impl Into<String>) -> ParseResult<T> {
		Err(ParseError::new(self.line(), message))
	}

	/// Adapts errors from the class model layer (pool overflow, malformed
	/// descriptors) to parse errors at the current line.
	pub fn lift<T>(&self, result: anyhow::Result<T>) -> ParseResult<T> {
		result.map_err(|error| ParseError::new(self.line(), format!("{error:#}.")))
	}

	fn next(&mut self) -> ParseResult<Token> {
		self.tokens.next()
	}

	fn push_back(&mut self) {
		self.tokens.push_back()
	}

	fn expectation_error<T>(&self, expected: &str, got: &Token) -> ParseResult<T> {
		self.fail(format!("Expected {expected} but got {}.", got.describe()))
	}

	pub fn expect_word(&mut self, what: &str) -> ParseResult<String> {
		match self.next()? {
			Token::Word(word) => Ok(word),
			token => self.expectation_error(what, &token),
		}
	}

	pub fn expect_number(&mut self, what: &str) -> ParseResult<f64> {
		match self.next()? {
			Token::Number(number) => Ok(number),
			token => self.expectation_error(what, &token),
		}
	}

	pub fn expect_string(&mut self, what: &str) -> ParseResult<String> {
		match self.next()? {
			Token::Str(string) => Ok(string),
			token => self.expectation_error(what, &token),
		}
	}

	pub fn expect_char(&mut self, what: &str) -> ParseResult<char> {
		match self.next()? {
			Token::Char(c) => Ok(c),
			token => self.expectation_error(what, &token),
		}
	}

	pub fn expect_punct(&mut self, punct: char, what: &str) -> ParseResult<()> {
		match self.next()? {
			Token::Punct(c) if c == punct => Ok(()),
			token => self.expectation_error(&format!("{what} '{punct}'"), &token),
		}
	}

	/// Consumes the next token if it is the given punctuation character.
	pub fn accept_punct(&mut self, punct: char) -> ParseResult<bool> {
		if self.next()? == Token::Punct(punct) {
			Ok(true)
		} else {
			self.push_back();
			Ok(false)
		}
	}

	/// Consumes the next token if it is a word.
	pub fn accept_word(&mut self) -> ParseResult<Option<String>> {
		match self.next()? {
			Token::Word(word) => Ok(Some(word)),
			_ => {
				self.push_back();
				Ok(None)
			},
		}
	}

	/// Consumes the next token if it is a number.
	pub fn accept_number(&mut self) -> ParseResult<Option<f64>> {
		match self.next()? {
			Token::Number(number) => Ok(Some(number)),
			_ => {
				self.push_back();
				Ok(None)
			},
		}
	}

	pub fn peek_is_string(&mut self) -> ParseResult<bool> {
		let is = matches!(self.next()?, Token::Str(..));
		self.push_back();
		Ok(is)
	}

	pub fn peek_is_char(&mut self) -> ParseResult<bool> {
		let is = matches!(self.next()?, Token::Char(..));
		self.push_back();
		Ok(is)
	}

	fn keyword_error<T>(&self, keywords: &[&str], got: &str) -> ParseResult<T> {
		let mut message = String::from("Expected one of: ");
		for keyword in keywords {
			message.push('\'');
			message.push_str(keyword);
			message.push_str("', ");
		}
		message.push_str(&format!("but got: '{got}'."));
		self.fail(message)
	}

	/// Consumes a word that must be one of the given keywords.
	pub fn expect_keyword(&mut self, keywords: &[&str]) -> ParseResult<String> {
		let mut what = String::from("one of: ");
		for keyword in keywords {
			what.push('\'');
			what.push_str(keyword);
			what.push_str("', ");
		}

		let word = self.expect_word(what.trim_end())?;
		if keywords.contains(&word.as_str()) {
			Ok(word)
		} else {
			self.keyword_error(keywords, &word)
		}
	}

	/// If the next token is a word, it must be one of the given keywords and
	/// is returned; any other token kind is left in place.
	pub fn accept_keyword(&mut self, keywords: &[&str]) -> ParseResult<Option<String>> {
		match self.accept_word()? {
			Some(word) => {
				if keywords.contains(&word.as_str()) {
					Ok(Some(word))
				} else {
					self.keyword_error(keywords, &word)
				}
			},
			None => Ok(None),
		}
	}

	/// Parses an external type, expanding imported simple names and
	/// consuming `[]` pairs; yields the internal descriptor form.
	pub fn expect_type(&mut self, what: &str) -> ParseResult<String> {
		let word = self.expect_word(what)?;
		let mut external = match self.imports.get(&word) {
			Some(imported) => imported.clone(),
			None => word,
		};

		while self.accept_punct('[')? {
			self.expect_punct(']', "array type end")?;
			external.push_str("[]");
		}

		Ok(types::internal_type(&external))
	}

	/// Parses `( type, type, … )` and yields the internal argument list
	/// `(T1T2…)`.
	pub fn expect_method_arguments(&mut self, what: &str) -> ParseResult<String> {
		let mut arguments = String::from("(");
		self.expect_punct('(', "method arguments open")?;
		if self.accept_punct(')')? {
			arguments.push(')');
			return Ok(arguments);
		}

		loop {
			arguments.push_str(&self.expect_type(what)?);
			if self.accept_punct(')')? {
				arguments.push(')');
				return Ok(arguments);
			}

			self.expect_punct(',', "method arguments separator")?;
		}
	}

	/// Parses a method name: a plain word, or `<init>`/`<clinit>`.
	pub fn expect_method_name(&mut self, what: &str) -> ParseResult<String> {
		if self.accept_punct('<')? {
			let name = self.expect_keyword(&["init", "clinit"])?;
			self.expect_punct('>', "special method suffix")?;
			return Ok(format!("<{name}>"));
		}

		self.expect_word(what)
	}

	/// Parses zero or more access flag keywords, stopping at the first
	/// token that is not one. No compatibility checking between flags is
	/// performed.
	pub fn expect_access_flags(&mut self) -> ParseResult<u16> {
		let mut access_flags = 0;
		while let Some(word) = self.accept_word()? {
			match word.as_str() {
				"public" => access_flags |= access::PUBLIC,
				"private" => access_flags |= access::PRIVATE,
				"protected" => access_flags |= access::PROTECTED,
				"static" => access_flags |= access::STATIC,
				"final" => access_flags |= access::FINAL,
				"super" => access_flags |= access::SUPER,
				"synchronized" => access_flags |= access::SYNCHRONIZED,
				"volatile" => access_flags |= access::VOLATILE,
				"transient" => access_flags |= access::TRANSIENT,
				"bridge" => access_flags |= access::BRIDGE,
				"varargs" => access_flags |= access::VARARGS,
				"native" => access_flags |= access::NATIVE,
				"interface" => access_flags |= access::INTERFACE,
				"abstract" => access_flags |= access::ABSTRACT,
				"strictfp" => access_flags |= access::STRICT,
				"synthetic" => access_flags |= access::SYNTHETIC,
				"annotation" => access_flags |= access::ANNOTATION,
				"enum" => access_flags |= access::ENUM,
				"mandated" => access_flags |= access::MANDATED,
				"module" => access_flags |= access::MODULE,
				"open" => access_flags |= access::OPEN,
				"transitive" => access_flags |= access::TRANSITIVE,
				"static_phase" => access_flags |= access::STATIC_PHASE,
				_ => {
					self.push_back();
					return Ok(access_flags);
				},
			}
		}

		Ok(access_flags)
	}

	/// Parses class access flags, ending in one of the class kind keywords
	/// that carry implied flags: `class` (`ACC_SUPER`), `enum`
	/// (`ACC_SUPER | ACC_ENUM`), `interface` (`ACC_ABSTRACT`), `module`, or
	/// `@interface` (`ACC_ABSTRACT | ACC_ANNOTATION`).
	pub fn expect_class_access_flags(&mut self) -> ParseResult<u16> {
		let mut access_flags = 0;
		while let Some(word) = self.accept_word()? {
			match word.as_str() {
				"public" => access_flags |= access::PUBLIC,
				"private" => access_flags |= access::PRIVATE,
				"protected" => access_flags |= access::PROTECTED,
				"static" => access_flags |= access::STATIC,
				"final" => access_flags |= access::FINAL,
				"super" => access_flags |= access::SUPER,
				"synchronized" => access_flags |= access::SYNCHRONIZED,
				"volatile" => access_flags |= access::VOLATILE,
				"transient" => access_flags |= access::TRANSIENT,
				"bridge" => access_flags |= access::BRIDGE,
				"varargs" => access_flags |= access::VARARGS,
				"native" => access_flags |= access::NATIVE,
				"abstract" => access_flags |= access::ABSTRACT,
				"strictfp" => access_flags |= access::STRICT,
				"synthetic" => access_flags |= access::SYNTHETIC,
				"mandated" => access_flags |= access::MANDATED,
				"open" => access_flags |= access::OPEN,
				"transitive" => access_flags |= access::TRANSITIVE,
				"static_phase" => access_flags |= access::STATIC_PHASE,
				"module" => return Ok(access_flags | access::MODULE),
				"enum" => return Ok(access_flags | access::SUPER | access::ENUM),
				"interface" => return Ok(access_flags | access::INTERFACE | access::ABSTRACT),
				"class" => return Ok(access_flags | access::SUPER),
				_ => return self.keyword_error(&["enum", "interface", "module", "class"], &word),
			}
		}

		// The only class kind left starts with punctuation: @interface.
		self.expect_punct('@', "annotation class")?;
		self.expect_keyword(&["interface"])?;
		Ok(access_flags | access::INTERFACE | access::ABSTRACT | access::ANNOTATION)
	}

	fn fresh_label(&self) -> ParseResult<u16> {
		if self.labels.len() >= 65534 {
			return self.fail("Too many labels in one method body.");
		}

		Ok(self.labels.len() as u16 + 1)
	}

	/// Parses a label name as a symbolic offset, allocating a fresh one on
	/// first sight.
	pub fn expect_offset(&mut self) -> ParseResult<u16> {
		let label = self.expect_word("label")?;
		let fresh = self.fresh_label()?;
		Ok(*self.labels.entry(label).or_insert(fresh))
	}

	/// Allocates a label that cannot collide with source labels, for
	/// pseudo-instructions that implicitly mark the current position.
	pub fn synthetic_offset(&mut self) -> ParseResult<u16> {
		let fresh = self.fresh_label()?;
		self.labels.insert(format!("${fresh}"), fresh);
		Ok(fresh)
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use classfile::constants::access;
	use super::Parser;

	#[test]
	fn expectation_failures_carry_line_and_kinds() {
		let mut parser = Parser::new("one\n2");
		parser.expect_word("first").unwrap();
		let error = parser.expect_word("second word").unwrap_err();
		assert_eq!(error.to_string(), "Line 2: Expected second word but got number.");
	}

	#[test]
	fn keyword_failure_lists_choices() {
		let mut parser = Parser::new("banana");
		let error = parser.expect_keyword(&["case", "default"]).unwrap_err();
		assert_eq!(error.to_string(), "Line 1: Expected one of: 'case', 'default', but got: 'banana'.");
	}

	#[test]
	fn types_expand_imports_and_arrays() {
		let mut parser = Parser::new("String[] int[][] java.util.List");
		parser.imports.insert("String".to_owned(), "java.lang.String".to_owned());

		assert_eq!(parser.expect_type("t").unwrap(), "[Ljava/lang/String;");
		assert_eq!(parser.expect_type("t").unwrap(), "[[I");
		assert_eq!(parser.expect_type("t").unwrap(), "Ljava/util/List;");
	}

	#[test]
	fn method_arguments() {
		let mut parser = Parser::new("() (int, double)");
		assert_eq!(parser.expect_method_arguments("args").unwrap(), "()");
		assert_eq!(parser.expect_method_arguments("args").unwrap(), "(ID)");
	}

	#[test]
	fn special_method_names() {
		let mut parser = Parser::new("<init> <clinit> main");
		assert_eq!(parser.expect_method_name("name").unwrap(), "<init>");
		assert_eq!(parser.expect_method_name("name").unwrap(), "<clinit>");
		assert_eq!(parser.expect_method_name("name").unwrap(), "main");
	}

	#[test]
	fn access_flags_stop_at_unknown_words() {
		let mut parser = Parser::new("public static final int");
		assert_eq!(parser.expect_access_flags().unwrap(), access::PUBLIC | access::STATIC | access::FINAL);
		assert_eq!(parser.expect_word("rest").unwrap(), "int");
	}

	#[test]
	fn class_kind_sugar() {
		assert_eq!(
			Parser::new("public enum").expect_class_access_flags().unwrap(),
			access::PUBLIC | access::SUPER | access::ENUM,
		);
		assert_eq!(
			Parser::new("interface").expect_class_access_flags().unwrap(),
			access::INTERFACE | access::ABSTRACT,
		);
		assert_eq!(
			Parser::new("@interface").expect_class_access_flags().unwrap(),
			access::INTERFACE | access::ABSTRACT | access::ANNOTATION,
		);
		assert_eq!(
			Parser::new("final class").expect_class_access_flags().unwrap(),
			access::FINAL | access::SUPER,
		);
	}

	#[test]
	fn offsets_allocate_fresh_labels_once() {
		let mut parser = Parser::new("skip other skip");
		assert_eq!(parser.expect_offset().unwrap(), 1);
		assert_eq!(parser.expect_offset().unwrap(), 2);
		assert_eq!(parser.expect_offset().unwrap(), 1);
	}
}
