#[cfg(test)]
mod resolver_tests {
    use rox::ast::Stmt;
    use rox::error::Diagnostics;
    use rox::parser::Parser;
    use rox::resolver::{Locals, Resolver};
    use rox::scanner::scan;

    fn parse(source: &str) -> Vec<Stmt> {
        let (tokens, lex_errors) = scan(source);
        assert!(lex_errors.is_empty());

        let mut diagnostics = Diagnostics::new();
        let statements = Parser::new(tokens).parse(&mut diagnostics);
        assert!(!diagnostics.had_error(), "{:?}", diagnostics.errors());

        statements
    }

    /// Resolve `source`, returning (locals, errors, warnings) as strings.
    fn resolve(source: &str) -> (Locals, Vec<String>, Vec<String>) {
        let statements = parse(source);

        let mut locals = Locals::new();
        let mut diagnostics = Diagnostics::new();
        Resolver::new(&mut locals, &mut diagnostics).resolve(&statements);

        let errors = diagnostics.errors().iter().map(|e| e.to_string()).collect();
        let warnings = diagnostics.warnings().iter().map(|w| w.to_string()).collect();

        (locals, errors, warnings)
    }

    fn errors(source: &str) -> Vec<String> {
        resolve(source).1
    }

    #[test]
    fn test_globals_are_not_recorded() {
        let (locals, errors, warnings) = resolve("var a = 1; print a; a = 2;");

        assert!(locals.is_empty());
        assert!(errors.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_distances() {
        let (locals, errors, _) = resolve("{ var a = 1; { var b = a; print b; } }");

        assert!(errors.is_empty());
        let mut distances: Vec<usize> = locals.values().copied().collect();
        distances.sort_unstable();
        // `a` one scope out, `b` in the same scope
        assert_eq!(distances, vec![0, 1]);
    }

    #[test]
    fn test_resolving_twice_gives_identical_maps() {
        let statements = parse("fun f(x) { fun g() { return x; } return g; } print f(1)();");

        let mut first = Locals::new();
        let mut second = Locals::new();
        Resolver::new(&mut first, &mut Diagnostics::new()).resolve(&statements);
        Resolver::new(&mut second, &mut Diagnostics::new()).resolve(&statements);

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            errors("var a = \"x\"; { var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_duplicate_local() {
        assert_eq!(
            errors("{ var a = 1; var a = 2; print a; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
        // globals may be redeclared
        assert!(errors("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_return_rules() {
        assert_eq!(
            errors("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
        assert_eq!(
            errors("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );
        assert!(errors("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_break_rules() {
        assert_eq!(
            errors("break;"),
            vec!["[line 1] Error at 'break': Can't use 'break' outside of a loop."]
        );
        // a function body is not inside the loop that defines it
        assert_eq!(
            errors("while (true) { fun f() { break; } f(); }"),
            vec!["[line 1] Error at 'break': Can't use 'break' outside of a loop."]
        );
        assert!(errors("while (true) { if (true) break; }").is_empty());
    }

    #[test]
    fn test_this_rules() {
        assert_eq!(
            errors("print this;"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of an instance method."]
        );
        assert_eq!(
            errors("class A { class make() { return this; } }"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of an instance method."]
        );
        assert_eq!(
            errors("class A { class make() { fun inner() { return this; } return inner; } }"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of an instance method."]
        );
        assert!(errors("class A { m() { fun inner() { return this; } return inner; } }").is_empty());
    }

    #[test]
    fn test_super_rules() {
        assert_eq!(
            errors("super.m();"),
            vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
        );
        assert_eq!(
            errors("class A { m() { super.m(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
        assert_eq!(
            errors("class A {} class B < A { class s() { return super.s; } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a static method."]
        );
    }

    #[test]
    fn test_self_inheritance() {
        assert_eq!(
            errors("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_all_errors_are_collected() {
        let found = errors("return;\nbreak;\nprint this;");

        assert_eq!(found.len(), 3);
        assert!(found[0].starts_with("[line 1]"));
        assert!(found[1].starts_with("[line 2]"));
        assert!(found[2].starts_with("[line 3]"));
    }

    #[test]
    fn test_unused_local_warnings() {
        let (_, errors, warnings) = resolve("fun f() {\n var unused = 1;\n var b = 2;\n var a = 3;\n print a;\n}");

        assert!(errors.is_empty());
        assert_eq!(
            warnings,
            vec![
                "[line 2] Warning at 'unused': Local variable 'unused' is never used.",
                "[line 3] Warning at 'b': Local variable 'b' is never used.",
            ]
        );
    }

    #[test]
    fn test_implicit_bindings_never_warn() {
        let (_, errors, warnings) =
            resolve("class A { m() { return 1; } } class B < A { m() { return 2; } }");

        assert!(errors.is_empty());
        assert!(warnings.is_empty());
    }
}
