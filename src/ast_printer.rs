use crate::ast::{Expr, LiteralValue, Stmt};
use crate::value::format_number;

/// Renders AST nodes in a parenthesised prefix form, e.g. `(+ 1 (* 2 3))`.
/// Used by the `parse` CLI command and by parser tests.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Null => "null".into(),

                LiteralValue::Str(s) => format!("\"{}\"", s),

                LiteralValue::Number(n) => format_number(*n),
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(.= {} {} {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::Lambda(decl) => format!(
                "(lambda ({}) {})",
                Self::names(&decl.params),
                Self::print_block(&decl.body)
            ),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => Self::print_block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => {
                format!("(while {} {})", Self::print(condition), Self::print_stmt(body))
            }

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            Stmt::Function(decl) => format!(
                "(func {} ({}) {})",
                decl.name.lexeme,
                Self::names(&decl.params),
                Self::print_block(&decl.body)
            ),

            Stmt::Class(decl) => {
                let mut s = format!("(class {}", decl.name.lexeme);
                if let Some(superclass) = &decl.superclass {
                    s.push_str(&format!(" < {}", Self::print(superclass)));
                }
                for field in &decl.fields {
                    match &field.initializer {
                        Some(init) => {
                            s.push_str(&format!(" (field {} {})", field.name.lexeme, Self::print(init)))
                        }
                        None => s.push_str(&format!(" (field {})", field.name.lexeme)),
                    }
                }
                for method in &decl.methods {
                    s.push_str(&format!(
                        " (method {} ({}) {})",
                        method.name.lexeme,
                        Self::names(&method.params),
                        Self::print_block(&method.body)
                    ));
                }
                s.push(')');
                s
            }
        }
    }

    fn print_block(statements: &[Stmt]) -> String {
        let mut s = String::from("{");
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push_str(" }");
        s
    }

    fn names(tokens: &[crate::token::Token]) -> String {
        tokens
            .iter()
            .map(|t| t.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
