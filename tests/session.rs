#[cfg(test)]
mod session_tests {
    use rox::lox::{Lox, RunStatus};

    fn output(lox: &Lox<Vec<u8>>) -> String {
        String::from_utf8(lox.output().clone()).unwrap()
    }

    #[test]
    fn test_repl_prints_bare_expressions() {
        let mut lox = Lox::new(Vec::new());

        assert!(lox.run_line("var a = 1;").errors.is_empty());
        assert!(lox.run_line("a + 1").errors.is_empty());
        assert!(lox.run_line("\"s\" + a").errors.is_empty());

        assert_eq!(output(&lox), "2\ns1\n");
    }

    #[test]
    fn test_empty_repl_line_is_harmless() {
        let mut lox = Lox::new(Vec::new());
        let report = lox.run_line("");

        assert_eq!(report.status(), RunStatus::Ok);
        assert_eq!(output(&lox), "");
    }

    #[test]
    fn test_definitions_persist_across_lines() {
        let mut lox = Lox::new(Vec::new());

        lox.run_line("fun add(a, b) { var sum = a + b; return sum; }");
        lox.run_line("class Greeter { hi(name) { return \"hi \" + name; } }");
        lox.run_line("{ var two = 2; print add(two, 1); }");
        lox.run_line("Greeter().hi(\"there\")");

        assert_eq!(output(&lox), "3\nhi there\n");
    }

    #[test]
    fn test_static_error_does_not_poison_later_lines() {
        let mut lox = Lox::new(Vec::new());

        let bad = lox.run_line("print (;");
        assert_eq!(bad.status(), RunStatus::StaticError);
        assert_eq!(bad.exit_code(), 65);

        let good = lox.run_line("print 1;");
        assert_eq!(good.status(), RunStatus::Ok);
        assert_eq!(output(&lox), "1\n");
    }

    #[test]
    fn test_runtime_error_keeps_session_usable() {
        let mut lox = Lox::new(Vec::new());

        lox.run_line("var total = 1;");
        let failed = lox.run_line("{ var inner = 2; total = total + inner; print nil - 1; }");
        assert_eq!(failed.status(), RunStatus::RuntimeError);

        lox.run_line("total");
        assert_eq!(output(&lox), "3\n");
    }

    #[test]
    fn test_resolution_error_runs_nothing() {
        let mut lox = Lox::new(Vec::new());
        let report = lox.run("print \"first\";\nreturn 1;");

        assert_eq!(report.status(), RunStatus::StaticError);
        assert_eq!(
            report.errors[0].to_string(),
            "[line 2] Error at 'return': Can't return from top-level code."
        );
        assert_eq!(output(&lox), "");
    }

    #[test]
    fn test_lex_and_parse_errors_are_reported_together() {
        let mut lox = Lox::new(Vec::new());
        let report = lox.run("var a = @;\nprint ;");

        let errors: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: @",
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at ';': Expect expression.",
            ]
        );
        assert_eq!(report.exit_code(), 65);
    }

    #[test]
    fn test_warnings_do_not_stop_execution() {
        let mut lox = Lox::new(Vec::new());
        let report = lox.run("fun f() { var unused = 1; } f(); print \"ran\";");

        assert_eq!(report.status(), RunStatus::Ok);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0].to_string(),
            "[line 1] Warning at 'unused': Local variable 'unused' is never used."
        );
        assert_eq!(output(&lox), "ran\n");
    }

    #[test]
    fn test_released_scopes_are_recycled() {
        let mut lox = Lox::new(Vec::new());
        let baseline = lox.interpreter().environments().live_count();

        lox.run("for (var i = 0; i < 100; i = i + 1) { var t = i; print t; }");
        assert_eq!(lox.interpreter().environments().live_count(), baseline);

        lox.run("fun f(n) { var m = n; return m; } for (var i = 0; i < 50; i = i + 1) f(i);");
        assert_eq!(lox.interpreter().environments().live_count(), baseline);
    }

    #[test]
    fn test_method_calls_do_not_grow_the_arena() {
        let mut lox = Lox::new(Vec::new());
        let baseline = lox.interpreter().environments().live_count();

        let report = lox.run(
            "class A { init() { this.n = 0; } m() { this.n = this.n + 1; return this.n; } size { return this.n; } }\n\
             var a = A();\n\
             for (var i = 0; i < 1000; i = i + 1) { a.m(); a.size; }\n\
             print a.n;",
        );

        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(output(&lox), "1000\n");
        assert_eq!(lox.interpreter().environments().live_count(), baseline);
    }

    #[test]
    fn test_closure_over_this_keeps_its_scopes() {
        let mut lox = Lox::new(Vec::new());
        lox.run("class C { init() { this.v = \"seen\"; } f() { fun g() { return this.v; } return g; } }");
        let baseline = lox.interpreter().environments().live_count();

        lox.run("var h = C().f();");
        assert_eq!(lox.interpreter().environments().live_count(), baseline + 2);

        lox.run("print h();");
        assert_eq!(output(&lox), "seen\n");
    }

    #[test]
    fn test_captured_scopes_survive() {
        let mut lox = Lox::new(Vec::new());
        let baseline = lox.interpreter().environments().live_count();

        lox.run("var get; { var x = \"kept\"; fun g() { return x; } get = g; }");
        assert_eq!(lox.interpreter().environments().live_count(), baseline + 1);

        lox.run("print get();");
        assert!(output(&lox).ends_with("kept\n"));
    }
}
