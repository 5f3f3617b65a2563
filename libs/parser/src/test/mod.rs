use super::*;
use anyhow::Result;
use pretty_assertions::assert_eq;

macro_rules! parser {
    ($input:expr) => {
        Parser::new(Tokenizer::from($input))
    };
}

fn scalar(name: &str, line: usize, column: usize) -> Identifier {
    Identifier::scalar(name, Span::new(line, column, name.len()))
}

#[test]
fn test_minimal_program() -> Result<()> {
    let program = parser!("BEGIN WRITE 5; END").parse_all()?;

    assert_eq!(
        Program {
            declarations: vec![],
            statements: vec![Statement::Write(Expression::Value(Value::Number(5)))],
        },
        program
    );

    Ok(())
}

#[test]
fn test_write_expression() -> Result<()> {
    let program = parser!("BEGIN WRITE 2 + 3; WRITE n % -4; END").parse_all()?;

    assert_eq!(
        vec![
            Statement::Write(Expression::Binary {
                op: Operator::Add,
                left: Value::Number(2),
                right: Value::Number(3),
            }),
            Statement::Write(Expression::Binary {
                op: Operator::Modulo,
                left: Value::Identifier(scalar("n", 1, 26)),
                right: Value::Number(-4),
            }),
        ],
        program.statements
    );
    assert_eq!("WRITE 2 + 3", program.statements[0].to_string());

    Ok(())
}

#[test]
fn test_truncated_write_expression() {
    let result = parser!("BEGIN WRITE 2 +").parse_all();

    assert!(matches!(
        result,
        Err(Error::UnexpectedToken(Token {
            token_type: TokenType::EOF,
            ..
        }))
    ));
}

#[test]
fn test_declarations() -> Result<()> {
    let program = parser!("DECLARE a, t(-3:10), b BEGIN READ a; END").parse_all()?;

    assert_eq!(
        vec![
            Declaration::Number {
                name: "a".into(),
                span: Span::new(1, 9, 1)
            },
            Declaration::Array {
                name: "t".into(),
                begin: -3,
                end: 10,
                span: Span::new(1, 12, 1)
            },
            Declaration::Number {
                name: "b".into(),
                span: Span::new(1, 22, 1)
            },
        ],
        program.declarations
    );

    Ok(())
}

#[test]
fn test_identifier_forms() -> Result<()> {
    let program = parser!("BEGIN t(i) := t(-2) + n; END").parse_all()?;

    let Statement::Assign { target, expression } = &program.statements[0] else {
        panic!("expected an assignment");
    };

    assert_eq!(
        &Identifier {
            name: "t".into(),
            kind: IdentifierKind::IndexedByVariable(Box::new(scalar("i", 1, 9))),
            span: Span::new(1, 7, 4),
        },
        target
    );

    assert_eq!(
        &Expression::Binary {
            op: Operator::Add,
            left: Value::Identifier(Identifier {
                name: "t".into(),
                kind: IdentifierKind::IndexedByNumber(-2),
                span: Span::new(1, 15, 5),
            }),
            right: Value::Identifier(scalar("n", 1, 23)),
        },
        expression
    );

    Ok(())
}

#[test]
fn test_negative_literals() -> Result<()> {
    let program = parser!("BEGIN x := -5 - -9223372036854775808; END").parse_all()?;

    assert_eq!(
        Statement::Assign {
            target: scalar("x", 1, 7),
            expression: Expression::Binary {
                op: Operator::Subtract,
                left: Value::Number(-5),
                right: Value::Number(i64::MIN),
            },
        },
        program.statements[0]
    );

    Ok(())
}

#[test]
fn test_literal_out_of_range() {
    let err = parser!("BEGIN WRITE 9223372036854775808; END").parse_all();

    assert!(matches!(err, Err(Error::InvalidSyntax(_, _))));
}

#[test]
fn test_control_flow() -> Result<()> {
    let source = r#"
    BEGIN
        IF a = b THEN WRITE a; ELSE WRITE b; ENDIF
        WHILE a < 10 DO a := a + 1; ENDWHILE
        FOR i FROM 10 DOWNTO 1 DO WRITE i; ENDFOR
        DO a := a - 1; WHILE a > 0 ENDDO
    END
    "#;
    let program = parser!(source).parse_all()?;

    let headers = program
        .statements
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>();

    assert_eq!(
        vec![
            "IF a = b",
            "WHILE a < 10",
            "FOR i FROM 10 DOWNTO 1",
            "DO WHILE a > 0",
        ],
        headers
    );

    let Statement::If { else_branch, .. } = &program.statements[0] else {
        panic!("expected an if statement");
    };
    assert!(else_branch.is_some());

    Ok(())
}

#[test]
fn test_nested_while_inside_do_while() -> Result<()> {
    let source = r#"
    BEGIN
        DO
            WHILE a >= 1 DO a := a - 1; ENDWHILE
            b := b + 1;
        WHILE b != 3 ENDDO
    END
    "#;
    let program = parser!(source).parse_all()?;

    let Statement::DoWhile { body, condition } = &program.statements[0] else {
        panic!("expected a do-while loop");
    };

    assert_eq!(2, body.len());
    assert!(matches!(body[0], Statement::While { .. }));
    assert_eq!(Relation::NotEqual, condition.relation);

    Ok(())
}

#[test]
fn test_empty_body_is_rejected() {
    let err = parser!("BEGIN IF a = 1 THEN ENDIF END").parse_all();

    assert!(matches!(err, Err(Error::InvalidSyntax(_, _))));
}

#[test]
fn test_missing_semicolon() {
    let err = parser!("BEGIN READ a END").parse_all();

    let Err(Error::UnexpectedToken(token)) = err else {
        panic!("expected an unexpected token error");
    };
    assert_eq!(Span::new(1, 14, 3), Span::from(&token));
}

#[test]
fn test_trailing_tokens() {
    let err = parser!("BEGIN READ a; END WRITE").parse_all();

    assert!(matches!(err, Err(Error::UnexpectedToken(_))));
}

#[test]
fn test_operator_semantics() {
    assert_eq!(Some(-4), Operator::Divide.apply(-7, 2));
    assert_eq!(Some(3), Operator::Divide.apply(7, 2));
    assert_eq!(Some(-4), Operator::Divide.apply(7, -2));
    assert_eq!(Some(0), Operator::Divide.apply(7, 0));
    assert_eq!(Some(1), Operator::Modulo.apply(-7, 2));
    assert_eq!(Some(-1), Operator::Modulo.apply(7, -2));
    assert_eq!(Some(0), Operator::Modulo.apply(7, 0));
    assert_eq!(None, Operator::Multiply.apply(i64::MAX, 2));
    assert_eq!(None, Operator::Divide.apply(i64::MIN, -1));
}

#[test]
fn test_relation_mirroring() {
    for relation in [
        Relation::Equal,
        Relation::NotEqual,
        Relation::Less,
        Relation::Greater,
        Relation::LessOrEqual,
        Relation::GreaterOrEqual,
    ] {
        for (a, b) in [(1, 2), (2, 1), (3, 3)] {
            assert_eq!(relation.evaluate(a, b), relation.mirrored().evaluate(b, a));
        }
    }
}

#[derive(Default)]
struct Trace(Vec<String>);

impl Visitor for Trace {
    type Error = ();

    fn pre_visit_statement(&mut self, statement: &Statement) -> Result<bool, ()> {
        self.0.push(format!("stmt {statement}"));
        Ok(!matches!(statement, Statement::Write(_)))
    }

    fn visit_number(&mut self, value: i64) -> Result<(), ()> {
        self.0.push(format!("num {value}"));
        Ok(())
    }

    fn visit_identifier(&mut self, id: &Identifier) -> Result<(), ()> {
        self.0.push(format!("id {id}"));
        Ok(())
    }
}

#[test]
fn test_visitor_order() -> Result<()> {
    let source = "BEGIN FOR i FROM 1 TO n DO t(i) := 3; ENDFOR DO WRITE 1; WHILE k > 0 ENDDO END";
    let program = parser!(source).parse_all()?;

    let mut trace = Trace::default();
    let _ = program.accept(&mut trace);

    assert_eq!(
        vec![
            "stmt FOR i FROM 1 TO n",
            "num 1",
            "id n",
            "stmt t(i) := 3",
            "id t(i)",
            "id i",
            "num 3",
            "stmt DO WHILE k > 0",
            "stmt WRITE 1",
            "id k",
            "num 0",
        ],
        trace.0
    );

    Ok(())
}
