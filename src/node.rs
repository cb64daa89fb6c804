//! Relational node declarations.
//!
//! A relational belief network declares its nodes with a compact syntax:
//!
//! ```text
//! [#|+]name(p1,p2,...)[|MODE:a1,a2,...|a1,a2,...]
//! ```
//!
//! - a leading `#` marks an auxiliary node (its CPT is meaningless),
//! - a leading `+` marks a precondition (auxiliary, boolean, required to be true),
//! - `name(p1,...)` is a relational node, a bare `name` is a constant node,
//! - `|MODE:a1,...` declares additional parameters combined with `MODE` (e.g. `OR`),
//! - `|a1,...` declares additional parameters handled by a combination function.
//!
//! Declarations are split into tokens first and then parsed left to right.
//!
//! ```
//! use mpe_rs::node::{CombinationMode, NodeSpec};
//!
//! let node: NodeSpec = "#cause(x)|OR:y".parse().unwrap();
//! assert!(node.is_auxiliary());
//! assert_eq!(node.function_name(), "cause");
//! assert_eq!(node.params(), &["x"]);
//! assert_eq!(node.combination_mode(), Some(&CombinationMode::Or));
//! assert!(node.requires_noisy_or());
//! ```

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::iter::Peekable;
use std::str::FromStr;

use crate::error::{Error, Result};

/// How the contributions of auxiliary parents are combined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CombinationMode {
    Or,
    Other(String),
}

impl CombinationMode {
    pub fn as_str(&self) -> &str {
        match self {
            CombinationMode::Or => "OR",
            CombinationMode::Other(mode) => mode,
        }
    }
}

impl From<&str> for CombinationMode {
    fn from(mode: &str) -> Self {
        match mode {
            "OR" => CombinationMode::Or,
            other => CombinationMode::Other(other.to_string()),
        }
    }
}

impl Display for CombinationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Auxiliary,
    Precondition,
    Pipe,
    Colon,
    Comma,
    LParen,
    RParen,
    Word(&'a str),
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Auxiliary => write!(f, "'#'"),
            Token::Precondition => write!(f, "'+'"),
            Token::Pipe => write!(f, "'|'"),
            Token::Colon => write!(f, "':'"),
            Token::Comma => write!(f, "','"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Word(w) => write!(f, "'{}'", w),
        }
    }
}

/// Splits a declaration into tokens. Role markers are only recognized as
/// the first character; words are trimmed of surrounding whitespace.
fn tokenize<'a>(text: &'a str) -> Vec<Token<'a>> {
    let mut tokens = Vec::new();
    let mut word_start = None;

    let flush = |tokens: &mut Vec<Token<'a>>, start: Option<usize>, end: usize| {
        if let Some(start) = start {
            let word = text[start..end].trim();
            if !word.is_empty() {
                tokens.push(Token::Word(word));
            }
        }
    };

    for (i, c) in text.char_indices() {
        let token = match c {
            '#' if i == 0 => Token::Auxiliary,
            '+' if i == 0 => Token::Precondition,
            '|' => Token::Pipe,
            ':' => Token::Colon,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ => {
                word_start.get_or_insert(i);
                continue;
            }
        };
        flush(&mut tokens, word_start.take(), i);
        tokens.push(token);
    }
    flush(&mut tokens, word_start, text.len());
    tokens
}

struct Parser<'a, I: Iterator<Item = Token<'a>>> {
    declaration: &'a str,
    tokens: Peekable<I>,
}

impl<'a, I: Iterator<Item = Token<'a>>> Parser<'a, I> {
    fn error(&self, reason: impl Into<String>) -> Error {
        Error::MalformedDeclaration {
            declaration: self.declaration.to_string(),
            reason: reason.into(),
        }
    }

    fn eat(&mut self, token: Token<'a>) -> bool {
        if self.tokens.peek() == Some(&token) {
            self.tokens.next();
            true
        } else {
            false
        }
    }

    fn word(&mut self, what: &str) -> Result<&'a str> {
        match self.tokens.next() {
            Some(Token::Word(w)) => Ok(w),
            Some(t) => Err(self.error(format!("expected {}, found {}", what, t))),
            None => Err(self.error(format!("expected {}, found end of declaration", what))),
        }
    }

    /// `word (',' word)*`
    fn list(&mut self, what: &str) -> Result<Vec<String>> {
        let mut items = vec![self.word(what)?.to_string()];
        while self.eat(Token::Comma) {
            items.push(self.word(what)?.to_string());
        }
        Ok(items)
    }

    fn end(&mut self) -> Result<()> {
        match self.tokens.next() {
            None => Ok(()),
            Some(t) => Err(self.error(format!("unexpected {}", t))),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// A parsed node declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    name: String,
    function_name: String,
    params: Vec<String>,
    additional_params: Option<Vec<String>>,
    combination_mode: Option<CombinationMode>,
    is_constant: bool,
    is_auxiliary: bool,
    is_precondition: bool,
    uses_combination_function: bool,
}

impl NodeSpec {
    /// Parses a node declaration.
    ///
    /// A bare name such as `f-g` is a constant node; its characters are not checked.
    /// Text with parentheses must be a full relational declaration: the name
    /// before `(` must consist of letters, digits and `_` (so `f-g(x)` and
    /// `++f(x)` are rejected rather than read as constants), and anything
    /// left over after the declaration is an error as well. Failures are
    /// [`Error::MalformedDeclaration`] carrying the declaration text.
    pub fn parse(declaration: &str) -> Result<Self> {
        let tokens = tokenize(declaration);
        let mut p = Parser {
            declaration,
            tokens: tokens.into_iter().peekable(),
        };

        let mut is_auxiliary = false;
        let mut is_precondition = false;
        if p.eat(Token::Auxiliary) {
            is_auxiliary = true;
        } else if p.eat(Token::Precondition) {
            is_precondition = true;
            is_auxiliary = true;
        }

        let function_name = p.word("node name")?.to_string();
        let mut params = Vec::new();
        let is_constant = !p.eat(Token::LParen);
        if !is_constant {
            if !is_identifier(&function_name) {
                return Err(p.error(format!("invalid function name '{}'", function_name)));
            }
            params = p.list("parameter")?;
            if !p.eat(Token::RParen) {
                return Err(p.error("expected ')' after parameters"));
            }
        }

        let mut additional_params = None;
        let mut combination_mode = None;
        let mut uses_combination_function = false;
        if p.eat(Token::Pipe) {
            let first = p.word("mode or additional parameter")?;
            if p.eat(Token::Colon) {
                if !first.chars().all(|c| c.is_ascii_uppercase()) {
                    return Err(p.error(format!("combination mode '{}' must be upper case", first)));
                }
                combination_mode = Some(CombinationMode::from(first));
                additional_params = Some(p.list("additional parameter")?);
            } else {
                let mut list = vec![first.to_string()];
                while p.eat(Token::Comma) {
                    list.push(p.word("additional parameter")?.to_string());
                }
                additional_params = Some(list);
                uses_combination_function = true;
            }
        }
        p.end()?;

        Ok(NodeSpec {
            name: declaration.to_string(),
            function_name,
            params,
            additional_params,
            combination_mode,
            is_constant,
            is_auxiliary,
            is_precondition,
            uses_combination_function,
        })
    }
}

impl FromStr for NodeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NodeSpec::parse(s)
    }
}

// Getters
impl NodeSpec {
    /// The raw declaration, including markers and suffixes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn additional_params(&self) -> Option<&[String]> {
        self.additional_params.as_deref()
    }

    pub fn combination_mode(&self) -> Option<&CombinationMode> {
        self.combination_mode.as_ref()
    }

    pub fn is_constant(&self) -> bool {
        self.is_constant
    }

    pub fn is_auxiliary(&self) -> bool {
        self.is_auxiliary
    }

    pub fn is_precondition(&self) -> bool {
        self.is_precondition
    }

    pub fn uses_combination_function(&self) -> bool {
        self.uses_combination_function
    }

    /// Whether the node relates two or more objects.
    pub fn is_relation(&self) -> bool {
        self.params.len() > 1
    }

    /// Whether auxiliary parents have to be combined via noisy-or.
    pub fn requires_noisy_or(&self) -> bool {
        self.additional_params.as_ref().is_some_and(|p| !p.is_empty())
            && self.combination_mode == Some(CombinationMode::Or)
    }

    /// Whether the node's distribution is given directly by a CPT.
    pub fn has_cpt(&self) -> bool {
        !self.requires_noisy_or()
    }

    /// `name(p1,...)` without markers or suffixes.
    pub fn clean_name(&self) -> String {
        format_name(&self.function_name, &self.params)
    }
}

impl NodeSpec {
    /// Name of the ground variable obtained by applying the actual parameters.
    pub fn variable_name<S: AsRef<str>>(&self, actual_params: &[S]) -> Result<String> {
        if actual_params.len() != self.params.len() {
            return Err(Error::ArityMismatch {
                node: self.name.clone(),
                expected: self.params.len(),
                actual: actual_params.len(),
            });
        }
        Ok(format_name(&self.function_name, actual_params))
    }

    /// Textual literal for the node taking the value at `setting`.
    ///
    /// Parameters bound in `substitution` are replaced by their constants, the
    /// others stay as they are. A boolean node taking the value `false` yields
    /// a negated literal. A non-boolean node gets its value as an extra last argument.
    pub fn to_literal(
        &self,
        domain: &Domain,
        setting: usize,
        substitution: Option<&HashMap<String, String>>,
    ) -> Result<String> {
        let value = domain.value(setting).ok_or_else(|| Error::ValueOutOfDomain {
            node: self.name.clone(),
            index: setting,
            size: domain.len(),
        })?;

        let (negated, value_arg) = if domain.is_boolean() {
            (value.eq_ignore_ascii_case("false"), None)
        } else {
            (false, Some(upper_first(value)))
        };

        let mut args: Vec<&str> = self
            .params
            .iter()
            .map(|p| match substitution.and_then(|s| s.get(p)) {
                Some(constant) => constant.as_str(),
                None => p.as_str(),
            })
            .collect();
        args.extend(value_arg.as_deref());

        let literal = format_name(&lower_first(&self.function_name), &args);
        Ok(if negated { format!("!{}", literal) } else { literal })
    }
}

impl Display for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Formats `name(arg1,arg2,...)`.
pub fn format_name<S: AsRef<str>>(name: &str, args: &[S]) -> String {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    format!("{}({})", name, args.join(","))
}

/// Extracts the function name from a variable name, e.g. `smokes` from `smokes(Anna)`.
pub fn extract_function_name(var_name: &str) -> &str {
    match var_name.find('(') {
        Some(pos) => &var_name[..pos],
        None => var_name,
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Declared type of a node: `ReturnType name(ArgType1,...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub function_name: String,
    pub return_type: String,
    pub arg_types: Vec<String>,
}

impl Signature {
    pub fn new(function_name: impl Into<String>, return_type: impl Into<String>, arg_types: Vec<String>) -> Self {
        Self {
            function_name: function_name.into(),
            return_type: return_type.into(),
            arg_types,
        }
    }

    pub fn is_boolean(&self) -> bool {
        self.return_type == "Boolean"
    }

    /// Renames a type wherever it occurs.
    pub fn replace_type(&mut self, old: &str, new: &str) {
        if self.return_type == old {
            self.return_type = new.to_string();
        }
        for t in self.arg_types.iter_mut().filter(|t| *t == old) {
            *t = new.to_string();
        }
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.return_type, format_name(&self.function_name, &self.arg_types))
    }
}

/// The values a node ranges over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    values: Vec<String>,
    signature: Option<Signature>,
}

impl Domain {
    pub fn new<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            signature: None,
        }
    }

    /// The domain `{True, False}`.
    pub fn boolean() -> Self {
        Self::new(["True", "False"])
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A declared signature decides; otherwise the domain is boolean if it
    /// consists of exactly the values `true` and `false` (in any case).
    pub fn is_boolean(&self) -> bool {
        match &self.signature {
            Some(sig) => sig.is_boolean(),
            None => {
                self.values.len() == 2
                    && self.values.iter().any(|v| v.eq_ignore_ascii_case("true"))
                    && self.values.iter().any(|v| v.eq_ignore_ascii_case("false"))
            }
        }
    }
}
