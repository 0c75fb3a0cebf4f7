//! Tokens and the tokenizer interface.
//!
//! The ranking engine never parses a grammar: it only needs an ordered list
//! of tokens and a way to tell identifiers from other syntax. Hosts plug
//! their own `Tokenizer`; `CodeTokenizer` is a small lexer for C-like
//! languages that is good enough for Java, C, C#, JavaScript or Rust code.

use std::iter::Peekable;
use std::str::Chars;

use serde::{Deserialize, Serialize};

use crate::error::{NamerError, NamerResult};

/// Lexical class of a token.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
	Identifier,
	Keyword,
	Literal,
	Operator,
	Other,
}

/// Atomic lexical unit. Two tokens are the same word for the model when
/// their `text` is equal.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
	pub text: String,
	pub kind: TokenKind,
}

impl Token {
	pub fn new(text: impl Into<String>, kind: TokenKind) -> Self {
		Self { text: text.into(), kind }
	}
}

/// Turns source text into an ordered token sequence.
///
/// Implementations must be shareable between worker threads.
pub trait Tokenizer: Send + Sync {
	/// Tokenizes a piece of source text.
	///
	/// # Errors
	/// Returns `NamerError::Tokenize` when the text cannot be lexed.
	fn tokenize(&self, text: &str) -> NamerResult<Vec<Token>>;

	/// Returns `true` if the token is an identifier.
	fn is_identifier(&self, token: &Token) -> bool {
		token.kind == TokenKind::Identifier
	}

	/// Tokenizes and keeps only the token texts.
	fn token_texts(&self, text: &str) -> NamerResult<Vec<String>> {
		Ok(self.tokenize(text)?.into_iter().map(|t| t.text).collect())
	}
}

/// Lexer for C-like source code.
///
/// - Identifiers and keywords are kept verbatim (names are what we rank)
/// - String and char literals are kept verbatim, quotes included
/// - Numbers are kept verbatim
/// - Line (`//`) and block (`/* */`) comments are dropped
/// - Whitespace is dropped
///
/// Unterminated string literals or block comments are tokenization errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodeTokenizer;

impl Tokenizer for CodeTokenizer {
	fn tokenize(&self, text: &str) -> NamerResult<Vec<Token>> {
		let mut tokens = Vec::new();
		let mut chars = text.chars().peekable();

		while let Some(&ch) = chars.peek() {
			match ch {
				c if c.is_whitespace() => {
					chars.next();
				}

				'/' if Self::starts_comment(&chars) => Self::skip_comment(&mut chars)?,

				'"' | '\'' | '`' => tokens.push(Token::new(Self::consume_literal(&mut chars)?, TokenKind::Literal)),

				'0'..='9' => {
					let mut number = String::new();
					while let Some(&c) = chars.peek() {
						if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
							number.push(c);
							chars.next();
						} else {
							break;
						}
					}
					tokens.push(Token::new(number, TokenKind::Literal));
				}

				c if c.is_alphabetic() || c == '_' || c == '$' || (c == '%' && Self::starts_wrapped(&chars)) => {
					let word = Self::consume_word(&mut chars);
					let kind = if is_keyword(&word) { TokenKind::Keyword } else { TokenKind::Identifier };
					tokens.push(Token::new(word, kind));
				}

				_ => {
					let op = consume_operator(&mut chars);
					let kind = if op.chars().all(|c| matches!(c, '(' | ')' | '{' | '}' | '[' | ']' | ';' | ',')) {
						TokenKind::Other
					} else {
						TokenKind::Operator
					};
					tokens.push(Token::new(op, kind));
				}
			}
		}

		Ok(tokens)
	}
}

impl CodeTokenizer {
	fn starts_comment(chars: &Peekable<Chars>) -> bool {
		let mut ahead = chars.clone();
		ahead.next();
		matches!(ahead.peek(), Some('/') | Some('*'))
	}

	fn starts_wrapped(chars: &Peekable<Chars>) -> bool {
		let mut ahead = chars.clone();
		ahead.next();
		ahead.peek().is_some_and(|c| c.is_alphanumeric() || *c == '_')
	}

	fn skip_comment(chars: &mut Peekable<Chars>) -> NamerResult<()> {
		chars.next();
		match chars.next() {
			Some('/') => {
				for c in chars.by_ref() {
					if c == '\n' {
						break;
					}
				}
				Ok(())
			}
			_ => {
				let mut previous = '\0';
				for c in chars.by_ref() {
					if previous == '*' && c == '/' {
						return Ok(());
					}
					previous = c;
				}
				Err(NamerError::tokenize("unterminated block comment"))
			}
		}
	}

	fn consume_literal(chars: &mut Peekable<Chars>) -> NamerResult<String> {
		let mut literal = String::new();
		let Some(quote) = chars.next() else {
			return Ok(literal);
		};
		literal.push(quote);
		while let Some(c) = chars.next() {
			literal.push(c);
			if c == '\\' {
				if let Some(escaped) = chars.next() {
					literal.push(escaped);
				}
				continue;
			}
			if c == quote {
				return Ok(literal);
			}
		}
		Err(NamerError::tokenize(format!("unterminated literal starting with {quote}")))
	}

	/// Identifiers may be wrapped in `%` (e.g. `var%%WC%%`), so `%` is kept
	/// inside words.
	fn consume_word(chars: &mut Peekable<Chars>) -> String {
		let mut word = String::new();
		while let Some(&c) = chars.peek() {
			if c.is_alphanumeric() || c == '_' || c == '$' || c == '%' {
				word.push(c);
				chars.next();
			} else {
				break;
			}
		}
		word
	}
}

/// Greedily consume a multi-char operator from the char stream.
fn consume_operator(chars: &mut Peekable<Chars>) -> String {
	let mut op = String::new();
	let Some(first) = chars.next() else {
		return op;
	};
	op.push(first);

	let Some(&next) = chars.peek() else { return op };
	let two = format!("{op}{next}");
	if !matches!(two.as_str(), "==" | "!=" | ">=" | "<=" | "&&" | "||"
		| "->" | "=>" | "::" | "+=" | "-=" | "*=" | "/=" | "++" | "--" | "<<" | ">>") {
		return op;
	}
	chars.next();
	op = two;

	let Some(&third) = chars.peek() else { return op };
	let three = format!("{op}{third}");
	if matches!(three.as_str(), "===" | "!==" | ">>>" | "<<=" | ">>=") {
		chars.next();
		op = three;
	}
	op
}

/// Keywords of the C family (Java, C, C++, C#, JavaScript, Rust).
fn is_keyword(word: &str) -> bool {
	matches!(word,
		"if" | "else" | "for" | "while" | "do" | "loop" | "break" | "continue"
		| "return" | "switch" | "case" | "default" | "match"
		| "try" | "catch" | "finally" | "throw" | "throws"
		| "fn" | "function" | "let" | "var" | "val" | "const" | "static"
		| "class" | "struct" | "enum" | "trait" | "interface" | "impl"
		| "extends" | "implements" | "abstract" | "final" | "override" | "virtual"
		| "pub" | "private" | "protected" | "public"
		| "use" | "mod" | "import" | "package" | "namespace"
		| "mut" | "ref" | "unsafe" | "extern" | "async" | "await"
		| "true" | "false" | "null" | "this" | "self" | "new" | "super"
		| "void" | "int" | "long" | "short" | "byte" | "char" | "float"
		| "double" | "boolean" | "bool" | "instanceof" | "typeof"
		| "synchronized" | "volatile" | "transient" | "native" | "sizeof"
	)
}
