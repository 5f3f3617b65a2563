use crate::analyzer::{Analysis, Analyzer, Error};
use parser::{Parser, tree_node::Span};
use pretty_assertions::assert_eq;
use tokenizer::Tokenizer;

fn analyze(source: &str) -> anyhow::Result<Result<Analysis, Error>> {
    let program = Parser::new(Tokenizer::from(source)).parse_all()?;
    Ok(Analyzer::analyze(&program))
}

macro_rules! rejects {
    ($source:expr, $pattern:pat) => {{
        let result = analyze($source)?;
        assert!(
            matches!(result, Err($pattern)),
            "unexpected result: {result:?}"
        );
    }};
}

#[test]
fn test_collects_constants_and_input() -> anyhow::Result<()> {
    let analysis = analyze("DECLARE a BEGIN READ a; a := a * 3; WRITE 3; WRITE -1; END")??;

    assert_eq!(
        Analysis {
            constants: vec![3, -1],
            reads_input: true,
        },
        analysis
    );

    let analysis = analyze("BEGIN WRITE 0; END")??;
    assert!(!analysis.reads_input);

    Ok(())
}

#[test]
fn test_duplicate_declaration() -> anyhow::Result<()> {
    let result = analyze("DECLARE a, a BEGIN READ a; END")?;

    assert_eq!(
        Err(Error::DuplicateDeclaration("a".into(), Span::new(1, 12, 1))),
        result
    );

    Ok(())
}

#[test]
fn test_invalid_range() -> anyhow::Result<()> {
    rejects!("DECLARE t(5:2) BEGIN WRITE 1; END", Error::InvalidRange(..));
    Ok(())
}

#[test]
fn test_single_element_array() -> anyhow::Result<()> {
    analyze("DECLARE t(5:5) BEGIN t(5) := 1; WRITE t(5); END")??;
    Ok(())
}

#[test]
fn test_undeclared_variable() -> anyhow::Result<()> {
    let result = analyze("BEGIN WRITE x; END")?;
    assert_eq!(
        Err(Error::UndeclaredVariable("x".into(), Span::new(1, 13, 1))),
        result
    );
    Ok(())
}

#[test]
fn test_kind_mismatch() -> anyhow::Result<()> {
    rejects!(
        "DECLARE t(0:3) BEGIN t := 1; END",
        Error::ArrayUsedAsNumber(..)
    );
    rejects!(
        "DECLARE n BEGIN n(1) := 1; END",
        Error::NumberUsedAsArray(..)
    );
    rejects!(
        "DECLARE t(0:3), i BEGIN i := 0; t(t) := i; END",
        Error::ArrayUsedAsNumber(..)
    );
    Ok(())
}

#[test]
fn test_literal_index_out_of_bounds() -> anyhow::Result<()> {
    let result = analyze("DECLARE t(-2:2) BEGIN t(3) := 1; END")?;

    assert!(matches!(
        result,
        Err(Error::IndexOutOfBounds(ref name, 3, _)) if name == "t"
    ));
    Ok(())
}

#[test]
fn test_use_before_assignment() -> anyhow::Result<()> {
    rejects!(
        "DECLARE a, b BEGIN a := b; END",
        Error::UseBeforeAssignment(..)
    );
    // the target only counts as assigned once the statement is complete
    rejects!(
        "DECLARE a BEGIN a := a + 1; END",
        Error::UseBeforeAssignment(..)
    );
    rejects!(
        "DECLARE t(0:3), i BEGIN t(i) := 1; END",
        Error::UseBeforeAssignment(..)
    );
    rejects!(
        "DECLARE t(0:3), i BEGIN t(0) := 1; WRITE t(i); END",
        Error::UseBeforeAssignment(..)
    );
    Ok(())
}

#[test]
fn test_iterator_rules() -> anyhow::Result<()> {
    rejects!(
        "DECLARE i BEGIN FOR i FROM 1 TO 2 DO WRITE i; ENDFOR END",
        Error::IteratorShadowing(..)
    );
    rejects!(
        "BEGIN FOR i FROM 1 TO 2 DO i := 3; ENDFOR END",
        Error::IteratorIsAssignTarget(..)
    );
    rejects!(
        "BEGIN FOR i FROM 1 TO 2 DO READ i; ENDFOR END",
        Error::IteratorIsReadOnly(..)
    );
    rejects!(
        "BEGIN FOR i FROM 1 TO 2 DO WRITE i; ENDFOR WRITE i; END",
        Error::UndeclaredVariable(..)
    );
    rejects!(
        "BEGIN FOR i FROM 1 TO i DO WRITE i; ENDFOR END",
        Error::UndeclaredVariable(..)
    );
    Ok(())
}

#[test]
fn test_iterator_name_is_reusable() -> anyhow::Result<()> {
    analyze(
        "BEGIN
            FOR i FROM 1 TO 2 DO WRITE i; ENDFOR
            FOR i FROM 2 DOWNTO 1 DO
                FOR j FROM i TO 2 DO WRITE j; ENDFOR
            ENDFOR
        END",
    )??;
    Ok(())
}

#[test]
fn test_titles() {
    let span = Span::default();
    assert_eq!(
        "type mismatch",
        Error::NumberUsedAsArray("n".into(), span).title()
    );
    assert_eq!(
        "read-only iterator",
        Error::IteratorIsReadOnly("i".into(), span).title()
    );
    assert_eq!(
        "Variable 'a' is used before being assigned.",
        Error::UseBeforeAssignment("a".into(), span).to_string()
    );
}
