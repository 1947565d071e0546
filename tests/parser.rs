#[cfg(test)]
mod parser_tests {
    use blu::ast::{Expr, Stmt};
    use blu::ast_printer::AstPrinter;
    use blu::error::{BluError, Result};
    use blu::parser::Parser;
    use blu::scanner::scan;

    fn parse(source: &str) -> Result<Vec<Stmt>> {
        let tokens = scan(source)?;
        Parser::new(&tokens).parse()
    }

    fn render(source: &str) -> Vec<String> {
        parse(source)
            .unwrap_or_else(|e| panic!("parse failed for {:?}: {}", source, e))
            .iter()
            .map(AstPrinter::print_stmt)
            .collect()
    }

    fn assert_renders(source: &str, expected: &[&str]) {
        assert_eq!(render(source), expected);
    }

    fn parse_error(source: &str) -> String {
        match parse(source) {
            Ok(stmts) => panic!("expected a parse error, got {:?}", stmts),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn test_parser_01_empty_input() {
        assert!(parse("").expect("parse failed").is_empty());
        assert!(parse("// only a comment").expect("parse failed").is_empty());
    }

    #[test]
    fn test_parser_02_precedence_and_associativity() {
        assert_renders("print 1 + 2 * 3;", &["(print (+ 1 (* 2 3)))"]);
        assert_renders("print 1 - 2 - 3;", &["(print (- (- 1 2) 3))"]);
        assert_renders("print (1 + 2) * 3;", &["(print (* (group (+ 1 2)) 3))"]);
        assert_renders("print -!x;", &["(print (- (! x)))"]);
        assert_renders(
            "print 1 < 2 == 3 >= 4;",
            &["(print (== (< 1 2) (>= 3 4)))"],
        );
    }

    #[test]
    fn test_parser_03_logical_operators() {
        assert_renders(
            "a or b and c or d;",
            &["(; (or (or a (and b c)) d))"],
        );
    }

    #[test]
    fn test_parser_04_assignment_is_right_associative() {
        assert_renders("a = b = 3;", &["(; (= a (= b 3)))"]);
        assert_renders("obj.field = 1;", &["(; (.= obj field 1))"]);
        assert_renders("a.b.c = d;", &["(; (.= (. a b) c d))"]);
    }

    #[test]
    fn test_parser_05_invalid_assignment_target() {
        assert_eq!(
            parse_error("1 + 2 = 3;"),
            "[line 1] Error at '=': Invalid assignment target."
        );
    }

    #[test]
    fn test_parser_06_literals() {
        assert_renders(
            "print \"hi\"; print 2.5; print true; print false; print null;",
            &[
                "(print \"hi\")",
                "(print 2.5)",
                "(print true)",
                "(print false)",
                "(print null)",
            ],
        );
    }

    #[test]
    fn test_parser_07_var_and_block() {
        assert_renders(
            "var a = 1; var b; { var a = 2; print a; }",
            &["(var a 1)", "(var b)", "{ (var a 2) (print a) }"],
        );
    }

    #[test]
    fn test_parser_08_if_and_while_with_and_without_parens() {
        assert_renders(
            "if (x) print 1; else print 2;",
            &["(if (group x) (print 1) (print 2))"],
        );
        assert_renders("if x { print 1; }", &["(if x { (print 1) })"]);
        assert_renders("while i < 3 i = i + 1;", &["(while (< i 3) (; (= i (+ i 1))))"]);
    }

    #[test]
    fn test_parser_09_for_is_desugared_into_while() {
        assert_renders(
            "for (var i = 0; i < 3; i = i + 1) print i;",
            &["{ (var i 0) (while (< i 3) { (print i) (; (= i (+ i 1))) }) }"],
        );
        assert_renders(
            "for var i = 0; i < 3; i = i + 1 { print i; }",
            &["{ (var i 0) (while (< i 3) { { (print i) } (; (= i (+ i 1))) }) }"],
        );
        assert_renders("for (;;) print 1;", &["(while true (print 1))"]);
    }

    #[test]
    fn test_parser_10_functions_and_calls() {
        assert_renders(
            "func add(a, b) { return a + b; } print add(1, 2)(3);",
            &[
                "(func add (a b) { (return (+ a b)) })",
                "(print (call (call add 1 2) 3))",
            ],
        );
        assert_renders("func f() { return; }", &["(func f () { (return) })"]);
    }

    #[test]
    fn test_parser_11_lambda_expression() {
        assert_renders(
            "var sq = func (x) { return x * x; };",
            &["(var sq (lambda (x) { (return (* x x)) }))"],
        );
        assert_renders("func () { print 1; };", &["(; (lambda () { (print 1) }))"]);
    }

    #[test]
    fn test_parser_12_class_with_fields_methods_and_super() {
        assert_renders(
            "class B < A { var x = 1; var y; init(v) { this.y = v; } m() { return super.m(); } }",
            &["(class B < A (field x 1) (field y) \
               (method init (v) { (; (.= this y v)) }) \
               (method m () { (return (call (super m))) }))"],
        );
    }

    #[test]
    fn test_parser_13_errors_report_location() {
        assert_eq!(
            parse_error("print 1"),
            "[line 1] Error at end: Expect ';' after value."
        );
        assert_eq!(
            parse_error("var = 1;"),
            "[line 1] Error at '=': Expect variable name."
        );
        assert_eq!(
            parse_error("print (1;"),
            "[line 1] Error at ';': Expect ')' after expression."
        );
        assert_eq!(
            parse_error("\n\n+;"),
            "[line 3] Error at '+': Expect expression."
        );
        assert_eq!(
            parse_error("super;"),
            "[line 1] Error at ';': Expect '.' after 'super'."
        );
    }

    #[test]
    fn test_parser_14_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let err = parse(&source).unwrap_err();

        assert!(matches!(err, BluError::Parse { .. }));
        assert_eq!(err.message(), "Can't have more than 255 arguments.");
    }

    #[test]
    fn test_parser_15_resolvable_nodes_get_distinct_ids() {
        let stmts = parse("a; a;").expect("parse failed");

        let ids: Vec<_> = stmts
            .iter()
            .filter_map(|s| match s {
                Stmt::Expression(Expr::Variable { id, .. }) => Some(*id),
                _ => None,
            })
            .collect();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }
}
