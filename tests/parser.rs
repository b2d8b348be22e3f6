#[cfg(test)]
mod parser_tests {
    use rox::ast::{Expr, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::Diagnostics;
    use rox::parser::Parser;
    use rox::scanner::scan;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<String>) {
        let (tokens, lex_errors) = scan(source);
        assert!(lex_errors.is_empty(), "unexpected lex errors: {:?}", lex_errors);

        let mut diagnostics = Diagnostics::new();
        let statements = Parser::new(tokens).parse(&mut diagnostics);
        let errors = diagnostics.errors().iter().map(|e| e.to_string()).collect();

        (statements, errors)
    }

    fn printed(source: &str) -> Vec<String> {
        let (statements, errors) = parse(source);
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);

        statements.iter().map(AstPrinter::print_stmt).collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(printed("1 + 2 * 3;"), vec!["(; (+ 1.0 (* 2.0 3.0)))"]);
        assert_eq!(printed("-a - -b;"), vec!["(; (- (- a) (- b)))"]);
        assert_eq!(
            printed("a or b and c == d;"),
            vec!["(; (or a (and b (== c d))))"]
        );
        assert_eq!(printed("(1 + 2) * 3;"), vec!["(; (* (group (+ 1.0 2.0)) 3.0))"]);
    }

    #[test]
    fn test_comma_and_ternary() {
        assert_eq!(printed("a, b, c;"), vec!["(; (, (, a b) c))"]);
        assert_eq!(printed("a ? b : c ? d : e;"), vec!["(; (? a b (? c d e)))"]);
        // call arguments are not comma expressions
        assert_eq!(printed("f(a, b ? c : d);"), vec!["(; (call f a (? b c d)))"]);
    }

    #[test]
    fn test_assignment_targets() {
        assert_eq!(printed("a = b = 1;"), vec!["(; (= a (= b 1.0)))"]);
        assert_eq!(printed("a.b.c = 2;"), vec!["(; (.= (. a b) c 2.0))"]);
    }

    #[test]
    fn test_invalid_assignment_target_is_reported_without_unwinding() {
        let (statements, errors) = parse("1 = 2; print 3;");

        assert_eq!(errors, vec!["[line 1] Error at '=': Invalid assignment target."]);
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_for_desugars_to_while() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );
        assert_eq!(printed("for (;;) break;"), vec!["(while true (break))"]);
    }

    #[test]
    fn test_class_members() {
        assert_eq!(
            printed("class B < A { init(x) { this.x = x; } area { return 1; } class make() { return B(1); } }"),
            vec![
                "(class B < A (fun init (x) (; (.= this x x))) (get area (return 1.0)) (static make () (return (call B 1.0))))"
            ]
        );
    }

    #[test]
    fn test_functions_and_anonymous_functions() {
        assert_eq!(
            printed("fun add(a, b) { return a + b; }"),
            vec!["(fun add (a b) (return (+ a b)))"]
        );
        // `fun (` at statement start is an expression
        assert_eq!(
            printed("fun (x) { print x; }(1);"),
            vec!["(; (call (fun (x) (print x)) 1.0))"]
        );
        assert_eq!(
            printed("var f = fun () { return; };"),
            vec!["(var f (fun () (return)))"]
        );
    }

    #[test]
    fn test_super_and_this() {
        assert_eq!(
            printed("super.m(this);"),
            vec!["(; (call (super m) this))"]
        );
    }

    #[test]
    fn test_error_recovery_reports_each_broken_statement() {
        let (statements, errors) = parse("var = 1;\nprint 2;\nprint (3;\nvar ok = 4;");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect ')' after expression.",
            ]
        );
        assert_eq!(statements.len(), 2);
        assert_eq!(AstPrinter::print_stmt(&statements[1]), "(var ok 4.0)");
    }

    #[test]
    fn test_error_at_end() {
        let (_, errors) = parse("print 1");
        assert_eq!(errors, vec!["[line 1] Error at end: Expect ';' after value."]);
    }

    #[test]
    fn test_too_many_arguments_is_not_fatal() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let (statements, errors) = parse(&source);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("Can't have more than 255 arguments."));
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_repl_bare_expression_becomes_print() {
        let (tokens, _) = scan("1 + 2");
        let mut diagnostics = Diagnostics::new();
        let statements = Parser::new(tokens).parse_repl(&mut diagnostics);

        assert!(!diagnostics.had_error());
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Stmt::Print(_)));
    }

    #[test]
    fn test_repl_statements_discard_expression_attempt() {
        let (tokens, _) = scan("var a = 1;");
        let mut diagnostics = Diagnostics::new();
        let mut parser = Parser::new(tokens).with_first_id(10);
        let statements = parser.parse_repl(&mut diagnostics);

        assert!(!diagnostics.had_error());
        assert!(matches!(statements[0], Stmt::Var { .. }));
        // the failed expression attempt handed out no ids
        assert_eq!(parser.next_id(), 10);
    }

    #[test]
    fn test_expression_ids_are_unique_and_start_at_first_id() {
        let (tokens, _) = scan("a = b + c;");
        let mut diagnostics = Diagnostics::new();
        let mut parser = Parser::new(tokens).with_first_id(5);
        let statements = parser.parse(&mut diagnostics);

        let Stmt::Expression(Expr::Assign { id, value, .. }) = &statements[0] else {
            panic!("expected an assignment, got {:?}", statements[0]);
        };
        let Expr::Binary { left, right, .. } = value.as_ref() else {
            panic!("expected a binary expression");
        };
        let (Expr::Variable { id: b, .. }, Expr::Variable { id: c, .. }) =
            (left.as_ref(), right.as_ref())
        else {
            panic!("expected variables");
        };

        let mut ids = vec![id.0, b.0, c.0];
        ids.sort_unstable();
        assert_eq!(ids, vec![5, 6, 7]);
        assert_eq!(parser.next_id(), 8);
    }
}
