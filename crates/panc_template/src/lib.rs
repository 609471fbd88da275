//! The pan template language: lexing, parsing, configuration trees and
//! evaluation.
//!
//! A template file starts with a header naming the template and its kind,
//! followed by statements that include other templates, assign values to tree
//! paths, and bind paths to types:
//!
//! ```text
//! object template site/node01;
//! include 'site/base';
//! '/system/hostname' = 'node01';
//! '/system/kernel' = value('site/defaults:/kernel');
//! bind '/system/ncpu' = long(1..256);
//! ```
//!
//! [`compile`] turns a file into an immutable [`CompiledTemplate`].
//! [`build_object`] evaluates an object template into a [`ProtectedTree`]
//! plus the [`ObjectContext`] recording bindings and every source consulted.
//! Template and cross-object lookups go through the [`TemplateLoader`] trait,
//! so this crate knows nothing about caches or scheduling.

#![warn(missing_docs)]

pub mod ast;
pub mod element;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod types;

pub use ast::{CompiledTemplate, Expr, Statement, TemplateKind};
pub use element::{Element, ProtectedTree};
pub use error::{EvaluationError, SyntaxError};
pub use eval::{build_object, EvalOptions, ObjectContext, TemplateLoader};
pub use parser::{compile, compile_file, parse_header, TemplateHeader};
pub use types::{validate_bindings, BaseType, Binding, FullType, LinkResolver, TypeRange};
