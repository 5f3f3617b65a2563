use super::run;
use pretty_assertions::assert_eq;

#[test]
fn test_relations() -> anyhow::Result<()> {
    let source = "
        DECLARE a, b
        BEGIN
            READ a;
            READ b;
            IF a = b THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF a != b THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF a < b THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF a > b THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF a <= b THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF a >= b THEN WRITE 1; ELSE WRITE 0; ENDIF
        END
    ";

    for (a, b) in [(3, 3), (2, 5), (5, 2), (-4, 0), (0, -4), (-1, -1)] {
        let expected = vec![
            (a == b) as i64,
            (a != b) as i64,
            (a < b) as i64,
            (a > b) as i64,
            (a <= b) as i64,
            (a >= b) as i64,
        ];
        assert_eq!(expected, run(source, &[a, b])?, "a = {a}, b = {b}");
    }

    Ok(())
}

#[test]
fn test_relations_against_zero() -> anyhow::Result<()> {
    let source = "
        DECLARE a
        BEGIN
            READ a;
            IF a = 0 THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF a != 0 THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF a < 0 THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF a > 0 THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF a <= 0 THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF a >= 0 THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF 0 < a THEN WRITE 1; ELSE WRITE 0; ENDIF
            IF 0 >= a THEN WRITE 1; ELSE WRITE 0; ENDIF
        END
    ";

    for a in [-6, -1, 0, 1, 6] {
        let expected = vec![
            (a == 0) as i64,
            (a != 0) as i64,
            (a < 0) as i64,
            (a > 0) as i64,
            (a <= 0) as i64,
            (a >= 0) as i64,
            (0 < a) as i64,
            (0 >= a) as i64,
        ];
        assert_eq!(expected, run(source, &[a])?, "a = {a}");
    }

    Ok(())
}

#[test]
fn test_literal_conditions() -> anyhow::Result<()> {
    let source = "
        BEGIN
            IF 1 < 2 THEN WRITE 1; ENDIF
            IF 2 < 1 THEN WRITE 2; ENDIF
            IF 3 != 3 THEN WRITE 3; ELSE WRITE 4; ENDIF
        END
    ";

    assert_eq!(vec![1, 4], run(source, &[])?);
    Ok(())
}

#[test]
fn test_while_loop() -> anyhow::Result<()> {
    let source = "
        DECLARE n
        BEGIN
            READ n;
            WHILE n > 0 DO
                WRITE n;
                n := n - 1;
            ENDWHILE
        END
    ";

    assert_eq!(vec![3, 2, 1], run(source, &[3])?);
    assert_eq!(Vec::<i64>::new(), run(source, &[-2])?);
    Ok(())
}

#[test]
fn test_do_while_runs_once() -> anyhow::Result<()> {
    let source = "
        DECLARE n
        BEGIN
            READ n;
            DO
                WRITE n;
                n := n + 1;
            WHILE n < 3 ENDDO
        END
    ";

    assert_eq!(vec![0, 1, 2], run(source, &[0])?);
    assert_eq!(vec![10], run(source, &[10])?);
    Ok(())
}

#[test]
fn test_for_loops() -> anyhow::Result<()> {
    let source = "
        DECLARE n
        BEGIN
            READ n;
            FOR i FROM 1 TO n DO
                WRITE i;
            ENDFOR
            FOR i FROM n DOWNTO 1 DO
                WRITE i;
            ENDFOR
        END
    ";

    assert_eq!(vec![1, 2, 3, 3, 2, 1], run(source, &[3])?);
    assert_eq!(Vec::<i64>::new(), run(source, &[0])?);
    Ok(())
}

#[test]
fn test_for_bounds_are_evaluated_once() -> anyhow::Result<()> {
    let source = "
        DECLARE n
        BEGIN
            n := 3;
            FOR i FROM 1 TO n DO
                n := n + 1;
                WRITE i;
            ENDFOR
            WRITE n;
        END
    ";

    assert_eq!(vec![1, 2, 3, 6], run(source, &[])?);
    Ok(())
}

#[test]
fn test_nested_loops() -> anyhow::Result<()> {
    let source = "
        DECLARE s, r, t(1:3)
        BEGIN
            s := 0;
            FOR i FROM 1 TO 3 DO
                FOR j FROM i DOWNTO 1 DO
                    s := s + j;
                ENDFOR
                t(i) := s;
            ENDFOR
            WHILE s > 0 DO
                s := s - 4;
                r := s % 2;
                IF r = 0 THEN
                    WRITE s;
                ENDIF
            ENDWHILE
            FOR i FROM 1 TO 3 DO
                WRITE t(i);
            ENDFOR
        END
    ";

    assert_eq!(vec![6, 2, -2, 1, 4, 10], run(source, &[])?);
    Ok(())
}

#[test]
fn test_nested_while_inside_do_while() -> anyhow::Result<()> {
    let source = "
        DECLARE a, b
        BEGIN
            a := 2;
            DO
                b := a;
                WHILE b > 0 DO
                    b := b - 1;
                ENDWHILE
                WRITE a;
                a := a - 1;
            WHILE a > 0 ENDDO
        END
    ";

    assert_eq!(vec![2, 1], run(source, &[])?);
    Ok(())
}
