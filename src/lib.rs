pub mod ast;
pub mod ast_printer;
pub mod class;
pub mod environment;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use log::info;

use crate::ast::Stmt;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;

/// Scan, parse and resolve `source` without running it. Resolution
/// distances are recorded into `interpreter`.
pub fn compile(interpreter: &mut Interpreter, source: &str) -> Result<Vec<Stmt>> {
    let tokens = scanner::scan(source)?;
    let statements: Vec<Stmt> = Parser::new(&tokens).parse()?;

    Resolver::new(interpreter).resolve(&statements)?;

    Ok(statements)
}

/// Run one program (or one REPL line) to completion on `interpreter`.
/// Globals defined by earlier runs stay visible.
pub fn run(interpreter: &mut Interpreter, source: &str) -> Result<()> {
    let statements: Vec<Stmt> = compile(interpreter, source)?;

    info!("Running {} statement(s)", statements.len());

    interpreter.interpret(&statements)
}
