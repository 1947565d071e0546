#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use blu::ast::Stmt;
    use blu::error::BluError;
    use blu::interpreter::{Interpreter, MAX_CALL_DEPTH};
    use blu::parser::Parser;
    use blu::scanner::scan;
    use blu::value::Value;

    /// `Write` sink shared between the interpreter and the test.
    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.borrow())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    fn interpreter() -> (Interpreter, Capture) {
        let capture = Capture::default();
        let interpreter = Interpreter::with_output(Box::new(capture.clone()));
        (interpreter, capture)
    }

    /// Run a program that must succeed and return its printed lines.
    fn run_ok(source: &str) -> Vec<String> {
        let (mut interpreter, capture) = interpreter();

        if let Err(e) = blu::run(&mut interpreter, source) {
            panic!("program failed: {}\n{}", e, source);
        }

        capture.lines()
    }

    /// Run a program that must fail; return what it printed and the error.
    fn run_err(source: &str) -> (Vec<String>, BluError) {
        let (mut interpreter, capture) = interpreter();

        match blu::run(&mut interpreter, source) {
            Ok(()) => panic!("program should have failed:\n{}", source),
            Err(e) => (capture.lines(), e),
        }
    }

    // ───────────────────────── expressions ─────────────────────────

    #[test]
    fn test_interpreter_01_arithmetic_and_number_formatting() {
        assert_eq!(
            run_ok("print 1 + 2 * 3; print 7 / 2; print -(4 - 6); print 10 / 4 * 2; print 0.1 + 0.2;"),
            vec!["7", "3.5", "2", "5", "0.30000000000000004"]
        );
    }

    #[test]
    fn test_interpreter_02_division_by_zero_is_ieee() {
        assert_eq!(
            run_ok("print 1 / 0; print -1 / 0; print 0 / 0 == 0 / 0;"),
            vec!["inf", "-inf", "false"]
        );
    }

    #[test]
    fn test_interpreter_03_string_concatenation() {
        assert_eq!(
            run_ok("print \"foo\" + \"bar\"; print \"n=\" + 3; print \"b=\" + true; print \"z=\" + null;"),
            vec!["foobar", "n=3", "b=true", "z=null"]
        );
    }

    #[test]
    fn test_interpreter_04_operand_type_errors() {
        let (_, err) = run_err("print 1 + true;");
        assert_eq!(
            err.to_string(),
            "[line 1] Runtime error: Operands must be two numbers or two strings."
        );

        let (_, err) = run_err("print 3 + \"x\";");
        assert_eq!(err.message(), "Operands must be two numbers or two strings.");

        let (_, err) = run_err("print \"a\" < \"b\";");
        assert_eq!(err.message(), "Operands must be numbers.");

        let (_, err) = run_err("print -\"a\";");
        assert_eq!(err.message(), "Operand must be a number.");
    }

    #[test]
    fn test_interpreter_05_truthiness_and_equality() {
        assert_eq!(
            run_ok(
                "print !null; print !0; print !\"\"; print null == null; \
                 print 1 == \"1\"; print \"a\" == \"a\"; print true != false;"
            ),
            vec!["true", "false", "false", "true", "false", "true", "true"]
        );
    }

    #[test]
    fn test_interpreter_06_logical_operators_return_operands() {
        assert_eq!(
            run_ok("print null or \"x\"; print 0 or 1; print false and 1; print 1 and 2;"),
            vec!["x", "0", "false", "2"]
        );
    }

    #[test]
    fn test_interpreter_07_short_circuit_skips_right_operand() {
        assert_eq!(
            run_ok("var hit = false; func touch() { hit = true; return true; } false and touch(); true or touch(); print hit;"),
            vec!["false"]
        );
    }

    // ───────────────────────── variables & scope ─────────────────────────

    #[test]
    fn test_interpreter_08_shadowing_restored_on_block_exit() {
        assert_eq!(
            run_ok("var x = 1; { var x = 2; print x; } print x;"),
            vec!["2", "1"]
        );
    }

    #[test]
    fn test_interpreter_09_undefined_variable() {
        let (_, err) = run_err("print nope;");
        assert_eq!(err.to_string(), "[line 1] Runtime error: Undefined variable 'nope'.");

        let (_, err) = run_err("nope = 1;");
        assert_eq!(err.message(), "Cannot assign to undefined variable 'nope'.");
    }

    #[test]
    fn test_interpreter_10_global_redefinition_is_runtime_error() {
        let (out, err) = run_err("var a = 1; print a; var a = 2;");

        assert_eq!(out, vec!["1"]);
        assert_eq!(err.message(), "Variable 'a' already defined.");
    }

    #[test]
    fn test_interpreter_11_redeclaration_in_block_is_static_error() {
        let (out, err) = run_err("print 1; { var a = 1; var a = 2; }");

        assert!(out.is_empty(), "nothing runs when resolution fails");
        assert!(err.is_static());
    }

    #[test]
    fn test_interpreter_12_closure_binding_is_lexical() {
        assert_eq!(
            run_ok(
                "var a = \"global\"; \
                 { func show() { print a; } show(); var a = \"block\"; show(); }"
            ),
            vec!["global", "global"]
        );
    }

    // ───────────────────────── control flow ─────────────────────────

    #[test]
    fn test_interpreter_13_if_else_and_loops() {
        assert_eq!(
            run_ok(
                "if (1 > 2) print \"no\"; else print \"yes\"; \
                 var i = 0; while i < 3 { print i; i = i + 1; } \
                 for (var j = 0; j < 2; j = j + 1) print j; \
                 for var k = 5; k > 3; k = k - 1 { print k; }"
            ),
            vec!["yes", "0", "1", "2", "0", "1", "5", "4"]
        );
    }

    #[test]
    fn test_interpreter_14_return_unwinds_out_of_loops() {
        assert_eq!(
            run_ok(
                "func first(n) { for (var i = 0; ; i = i + 1) { if i == n return i; } } \
                 print first(3); \
                 func none() { while true { return; } } print none();"
            ),
            vec!["3", "null"]
        );
    }

    #[test]
    fn test_interpreter_15_runtime_error_aborts_remaining_statements() {
        let (out, err) = run_err("print 1;\nprint nope;\nprint 3;");

        assert_eq!(out, vec!["1"]);
        assert_eq!(err.to_string(), "[line 2] Runtime error: Undefined variable 'nope'.");
    }

    // ───────────────────────── functions ─────────────────────────

    #[test]
    fn test_interpreter_16_closure_counter_shares_state() {
        assert_eq!(
            run_ok(
                "func make() { var i = 0; func inc() { i = i + 1; return i; } return inc; } \
                 var c = make(); print c(); print c(); \
                 var d = make(); print d();"
            ),
            vec!["1", "2", "1"]
        );
    }

    #[test]
    fn test_interpreter_17_recursion() {
        assert_eq!(
            run_ok("func fib(n) { if n < 2 return n; return fib(n - 1) + fib(n - 2); } print fib(15);"),
            vec!["610"]
        );
    }

    #[test]
    fn test_interpreter_18_lambdas() {
        assert_eq!(
            run_ok(
                "func apply(f, x) { return f(x); } \
                 print apply(func (n) { return n * 2; }, 21); \
                 var add = func (a, b) { return a + b; }; print add(1, 2); print add;"
            ),
            vec!["42", "3", "<lambda fn>"]
        );
    }

    #[test]
    fn test_interpreter_19_arity_mismatch() {
        let (out, err) = run_err("func f(a, b) { return a; }\nprint \"before\";\nf(1);");

        assert_eq!(out, vec!["before"]);
        assert_eq!(
            err.to_string(),
            "[line 3] Runtime error: Expected 2 arguments but got 1."
        );
    }

    #[test]
    fn test_interpreter_20_calling_non_callable() {
        let (_, err) = run_err("\"str\"();");

        assert_eq!(err.message(), "Can only call functions and classes.");
    }

    #[test]
    fn test_interpreter_21_callable_display_and_identity() {
        assert_eq!(
            run_ok("func f() {} class C {} print f; print C; print time; print f == f; print C() == C();"),
            vec!["<fn f>", "C", "<native fn>", "true", "false"]
        );
    }

    #[test]
    fn test_interpreter_22_native_time_is_monotonic() {
        assert_eq!(
            run_ok("var a = time(); var b = time(); print b >= a; print a >= 0;"),
            vec!["true", "true"]
        );
    }

    // ───────────────────────── classes ─────────────────────────

    #[test]
    fn test_interpreter_23_fields_methods_and_init() {
        assert_eq!(
            run_ok(
                "class Point { var x = 0; var y; \
                   init(x, y) { this.x = x; this.y = y; } \
                   sum() { return this.x + this.y; } } \
                 var p = Point(2, 3); print p.sum(); print p; \
                 p.z = 9; print p.z; \
                 var m = p.sum; p.x = 10; print m();"
            ),
            vec!["5", "<Point instance>", "9", "13"]
        );
    }

    #[test]
    fn test_interpreter_24_field_defaults_are_fresh_per_instance() {
        assert_eq!(
            run_ok(
                "var n = 0; func next() { n = n + 1; return n; } \
                 class Box { var id = next(); var empty; } \
                 var a = Box(); var b = Box(); print a.id; print b.id; print a.empty;"
            ),
            vec!["1", "2", "null"]
        );
    }

    #[test]
    fn test_interpreter_25_initializer_returns_instance() {
        assert_eq!(
            run_ok(
                "class A { init() { this.v = 1; return; } } \
                 var a = A(); var again = a.init(); print again == a; print again.v;"
            ),
            vec!["true", "1"]
        );
    }

    #[test]
    fn test_interpreter_26_class_arity_follows_init() {
        let (_, err) = run_err("class A { init(x) {} } A();");
        assert_eq!(err.message(), "Expected 1 arguments but got 0.");

        let (_, err) = run_err("class B {} B(1);");
        assert_eq!(err.message(), "Expected 0 arguments but got 1.");
    }

    #[test]
    fn test_interpreter_27_property_errors() {
        let (_, err) = run_err("class A {} print A().missing;");
        assert_eq!(err.message(), "Undefined property 'missing'.");

        let (_, err) = run_err("var s = \"x\"; print s.len;");
        assert_eq!(err.message(), "Only instances have properties.");

        let (_, err) = run_err("var s = 1; s.f = 2;");
        assert_eq!(err.message(), "Only instances have fields.");
    }

    #[test]
    fn test_interpreter_28_inheritance_order_and_dynamic_dispatch() {
        let source = "\
            class A {\n\
              var a = \"a-field\";\n\
              init(x) { print \"A.init \" + x; this.x = x; }\n\
              describe() { return this.name(); }\n\
              name() { return \"A\"; }\n\
              onlyA() { return \"onlyA\"; }\n\
            }\n\
            class B < A {\n\
              var b = \"b-field\";\n\
              name() { return \"B\"; }\n\
            }\n\
            var obj = B(\"y\");\n\
            print obj.a; print obj.b; print obj.x;\n\
            print obj.describe(); print obj.onlyA();\n";

        assert_eq!(
            run_ok(source),
            vec!["A.init y", "a-field", "b-field", "y", "B", "onlyA"]
        );
    }

    #[test]
    fn test_interpreter_29_initializers_run_root_to_leaf() {
        assert_eq!(
            run_ok(
                "class A { var order = \"A\"; init() { print \"A.init\"; } } \
                 class B < A { var order = this.order + \"B\"; init() { print \"B.init \" + this.order; } } \
                 B();"
            ),
            vec!["A.init", "B.init AB"]
        );
    }

    #[test]
    fn test_interpreter_30_super_calls() {
        assert_eq!(
            run_ok(
                "class A { greet() { return \"A says \" + this.who; } } \
                 class B < A { var who = \"b\"; greet() { return \"B, then \" + super.greet(); } } \
                 class C < B { var who = \"c\"; } \
                 print C().greet();"
            ),
            vec!["B, then A says c"]
        );
    }

    #[test]
    fn test_interpreter_31_superclass_must_be_class() {
        let (_, err) = run_err("var NotAClass = 1; class B < NotAClass {}");

        assert_eq!(err.message(), "Superclass must be a class.");
    }

    #[test]
    fn test_interpreter_32_method_closures_see_class_scope() {
        assert_eq!(
            run_ok(
                "func makeClass() { var greeting = \"hi\"; \
                   class G { say() { return greeting; } } return G; } \
                 var G = makeClass(); print G().say();"
            ),
            vec!["hi"]
        );
    }

    // ───────────────────────── interactive sessions ─────────────────────────

    #[test]
    fn test_interpreter_33_state_persists_across_runs() {
        let (mut interpreter, capture) = interpreter();

        blu::run(&mut interpreter, "var count = 1; func bump() { count = count + 1; }")
            .expect("first run failed");
        assert!(blu::run(&mut interpreter, "print missing;").is_err());
        blu::run(&mut interpreter, "bump(); print count;").expect("third run failed");

        assert_eq!(capture.lines(), vec!["2"]);
    }

    #[test]
    fn test_interpreter_34_error_inside_call_restores_environment() {
        let (mut interpreter, capture) = interpreter();

        blu::run(&mut interpreter, "var x = \"outer\"; func boom() { var x = \"inner\"; return nope; }")
            .expect("first run failed");
        assert!(blu::run(&mut interpreter, "boom();").is_err());
        blu::run(&mut interpreter, "print x;").expect("third run failed");

        assert_eq!(capture.lines(), vec!["outer"]);
    }

    // ───────────────────────── evaluation order ─────────────────────────

    #[test]
    fn test_interpreter_35_binary_operands_evaluate_left_to_right() {
        assert_eq!(
            run_ok(
                "func l() { print \"L\"; return 1; } \
                 func r() { print \"R\"; return 2; } \
                 print l() + r(); print l() < r(); print l() == r();"
            ),
            vec!["L", "R", "3", "L", "R", "true", "L", "R", "false"]
        );
    }

    #[test]
    fn test_interpreter_36_call_arguments_evaluate_left_to_right() {
        assert_eq!(
            run_ok(
                "func tag(s) { print s; return s; } func pair(a, b) { return a + b; } \
                 print pair(tag(\"a\"), tag(\"b\"));"
            ),
            vec!["a", "b", "ab"]
        );
    }

    // ───────────────────────── printed literals ─────────────────────────

    /// Scan and parse `source` as one expression statement and evaluate it.
    fn evaluate_source(interpreter: &mut Interpreter, source: &str) -> Value {
        let tokens = scan(&format!("{};", source))
            .unwrap_or_else(|e| panic!("scan failed for {:?}: {}", source, e));
        let statements = Parser::new(&tokens)
            .parse()
            .unwrap_or_else(|e| panic!("parse failed for {:?}: {}", source, e));

        match statements.as_slice() {
            [Stmt::Expression(expr)] => interpreter
                .evaluate(expr)
                .unwrap_or_else(|e| panic!("evaluation failed for {:?}: {}", source, e)),
            other => panic!("expected one expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_interpreter_37_printed_literals_read_back_equal() {
        let cases: &[(&str, bool)] = &[
            ("0.1 + 0.2", false),
            ("123456789012345678901234567890", false),
            ("0.000001", false),
            ("42", false),
            ("\"hello, world\"", true),
            ("true", false),
            ("false", false),
            ("null", false),
        ];

        for (source, is_string) in cases {
            let (mut interpreter, capture) = interpreter();

            blu::run(&mut interpreter, &format!("print {};", source))
                .unwrap_or_else(|e| panic!("print failed for {:?}: {}", source, e));

            let printed: String = capture.lines().concat();
            let reread: String = if *is_string {
                format!("\"{}\"", printed)
            } else {
                printed.clone()
            };

            let original: Value = evaluate_source(&mut interpreter, source);
            let round_tripped: Value = evaluate_source(&mut interpreter, &reread);

            assert_eq!(
                original, round_tripped,
                "{:?} printed as {:?} did not read back equal",
                source, printed
            );
        }
    }

    // ───────────────────────── call depth ─────────────────────────

    /// Run `f` on a thread with a generous stack, as the CLI does.
    fn on_large_stack<T, F>(f: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(f)
            .expect("failed to spawn test thread")
            .join()
            .expect("test thread panicked")
    }

    const COUNT_DOWN: &str = "func f(n) { if (n == 0) return 0; return f(n - 1) + 1; }";

    #[test]
    fn test_interpreter_38_deep_recursion_within_limit() {
        let depth: usize = MAX_CALL_DEPTH - 1;

        let out = on_large_stack(move || run_ok(&format!("{} print f({});", COUNT_DOWN, depth)));

        assert_eq!(out, vec![depth.to_string()]);
    }

    #[test]
    fn test_interpreter_39_runaway_recursion_is_runtime_error() {
        let (message, is_static, after) = on_large_stack(|| {
            let (mut interpreter, capture) = interpreter();

            let err = blu::run(&mut interpreter, &format!("{}\nprint f(5000);", COUNT_DOWN))
                .expect_err("recursion past the limit should fail");

            // The depth counter unwinds with the error.
            blu::run(&mut interpreter, "print f(10);").expect("interpreter unusable after overflow");

            (err.to_string(), err.is_static(), capture.lines())
        });

        assert_eq!(message, "[line 1] Runtime error: Stack overflow.");
        assert!(!is_static);
        assert_eq!(after, vec!["10"]);
    }
}
