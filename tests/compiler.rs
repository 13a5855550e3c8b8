use jack_compiler::jack;

fn compile(src: &str) -> String {
    jack::compile(src).unwrap()
}

fn assert_compiles_to(src: &str, expected_lines: &[&str]) {
    let vm_code = compile(src);
    assert_eq!(vm_code.lines().collect::<Vec<_>>(), expected_lines);
}

#[test]
fn test_void_function() {
    assert_compiles_to(
        "class Foo { function void bar() { return; } }",
        &["function Foo.bar 0", "push constant 0", "return"],
    );
}

#[test]
fn test_static_variable() {
    assert_compiles_to(
        "class Foo { static int x; function int get() { return x; } }",
        &["function Foo.get 0", "push static 0", "return"],
    );
}

#[test]
fn test_constructor() {
    assert_compiles_to(
        "class P { field int x, y; constructor P new(int a) { let x = a; let y = 0; return this; } }",
        &[
            "function P.new 0",
            "push constant 2",
            "call Memory.alloc 1",
            "pop pointer 0",
            "push argument 0",
            "pop this 0",
            "push constant 0",
            "pop this 1",
            "push pointer 0",
            "return",
        ],
    );
}

#[test]
fn test_method_with_if_else() {
    assert_compiles_to(
        "class C { method void m() { if (true) { return; } else { return; } } }",
        &[
            "function C.m 0",
            "push argument 0",
            "pop pointer 0",
            "push constant 1",
            "neg",
            "not",
            "if-goto IF_START_1",
            "push constant 0",
            "return",
            "goto IF_END_1",
            "label IF_START_1",
            "push constant 0",
            "return",
            "label IF_END_1",
            "push constant 0",
            "return",
        ],
    );
}

#[test]
fn test_while_loop() {
    assert_compiles_to(
        "class M { function int f() { var int i; let i = 0; while (i < 10) { let i = i + 1; } return i; } }",
        &[
            "function M.f 1",
            "push constant 0",
            "pop local 0",
            "label WHILE_START_1",
            "push local 0",
            "push constant 10",
            "lt",
            "not",
            "if-goto WHILE_END_1",
            "push local 0",
            "push constant 1",
            "add",
            "pop local 0",
            "goto WHILE_START_1",
            "label WHILE_END_1",
            "push local 0",
            "return",
        ],
    );
}

#[test]
fn test_string_argument() {
    assert_compiles_to(
        "class S { function void t() { do Output.printString(\"hi\"); return; } }",
        &[
            "function S.t 0",
            "push constant 2",
            "call String.new 1",
            "push constant 104",
            "call String.appendChar 2",
            "push constant 105",
            "call String.appendChar 2",
            "call Output.printString 1",
            "pop temp 0",
            "push constant 0",
            "return",
        ],
    );
}

#[test]
fn test_labels_are_unique_and_branched_to() {
    let src = r#"
    class Maze {
        field int size;

        method void step(int x) {
            while (x > 0) {
                if (x = 1) {
                    let x = x - 1;
                } else {
                    while (x > 2) {
                        let x = x - 2;
                    }
                }
            }
            if (x < 0) {
                let x = 0;
            }
            return;
        }
    }
    "#;

    let vm_code = compile(src);

    let defined: Vec<&str> = vm_code
        .lines()
        .filter_map(|l| l.strip_prefix("label "))
        .collect();
    let branched: Vec<&str> = vm_code
        .lines()
        .filter_map(|l| l.strip_prefix("goto ").or_else(|| l.strip_prefix("if-goto ")))
        .collect();

    // Two whiles and two ifs claim four indices, eight labels in total
    assert_eq!(defined.len(), 8);
    for label in &defined {
        assert_eq!(defined.iter().filter(|l| l == &label).count(), 1);
        assert!(
            branched.contains(label),
            "label {} is never branched to",
            label
        );
    }
    for target in &branched {
        assert!(defined.contains(target), "branch to undefined label {}", target);
    }
}

#[test]
fn test_full_class() {
    let src = r#"
    // A bounded counter backed by an array of readings.
    class Counter {
        static int total;
        field int value, limit;
        field Array readings;

        constructor Counter new(int max) {
            let value = 0;
            let limit = max;
            let readings = Array.new(max);
            return this;
        }

        method void bump() {
            if (value < limit) {
                let value = value + 1;
                let readings[value] = Counter.stamp();
                let total = total + 1;
            }
            return;
        }

        function int stamp() {
            return total * 2;
        }
    }
    "#;

    let expected = [
        // constructor
        "function Counter.new 0",
        "push constant 3",
        "call Memory.alloc 1",
        "pop pointer 0",
        "push constant 0",
        "pop this 0",
        "push argument 0",
        "pop this 1",
        "push argument 0",
        "call Array.new 1",
        "pop this 2",
        "push pointer 0",
        "return",
        // bump
        "function Counter.bump 0",
        "push argument 0",
        "pop pointer 0",
        "push this 0",
        "push this 1",
        "lt",
        "not",
        "if-goto IF_START_1",
        "push this 0",
        "push constant 1",
        "add",
        "pop this 0",
        "push this 2",
        "push this 0",
        "add",
        "call Counter.stamp 0",
        "pop temp 0",
        "pop pointer 1",
        "push temp 0",
        "pop that 0",
        "push static 0",
        "push constant 1",
        "add",
        "pop static 0",
        "goto IF_END_1",
        "label IF_START_1",
        "label IF_END_1",
        "push constant 0",
        "return",
        // stamp
        "function Counter.stamp 0",
        "push static 0",
        "push constant 2",
        "call Math.multiply 2",
        "return",
    ];

    assert_compiles_to(src, &expected);
}

#[test]
fn test_compile_error_carries_span() {
    let src = "class Foo {\n  function void bar() {\n    let ;\n  }\n}";
    let err = jack::compile(src).unwrap_err();
    assert_eq!(err.msg, "unexpected token `;', expected an identifier");
    // The span points at the `;` on line 3
    assert_eq!(err.span.start, src.find("let ;").unwrap() + 4);
}
