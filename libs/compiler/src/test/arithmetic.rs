use super::run;
use crate::{
    arithmetic::materialization_steps,
    instruction::Instruction,
    machine::Machine,
    registers::ONE,
};
use pretty_assertions::assert_eq;

const SAMPLES: [i64; 13] = [-17, -7, -5, -2, -1, 0, 1, 2, 3, 5, 7, 16, 100];

fn floor_div(a: i64, b: i64) -> i64 {
    if b == 0 {
        return 0;
    }
    (a as f64 / b as f64).floor() as i64
}

fn floor_mod(a: i64, b: i64) -> i64 {
    if b == 0 {
        return 0;
    }
    a - b * floor_div(a, b)
}

#[test]
fn test_materialization_round_trip() -> anyhow::Result<()> {
    for n in [0, 1, -1, 2, -2, 255, -256, 12345, -99999, i64::MAX, i64::MIN] {
        let mut program = vec![
            Instruction::Sub(0),
            Instruction::Inc,
            Instruction::Store(ONE),
            Instruction::Sub(0),
        ];
        program.extend(materialization_steps(n));
        program.push(Instruction::Put);
        program.push(Instruction::Halt);

        assert_eq!(vec![n], Machine::default().run(&program)?, "materializing {n}");
    }

    Ok(())
}

#[test]
fn test_materialization_is_short() {
    assert!(materialization_steps(i64::MAX).len() <= 128);
    assert!(materialization_steps(i64::MIN).len() <= 64);
    assert_eq!(
        vec![Instruction::Inc, Instruction::Shift(ONE), Instruction::Shift(ONE)],
        materialization_steps(4)
    );
}

#[test]
fn test_runtime_operations() -> anyhow::Result<()> {
    let source = "
        DECLARE a, b
        BEGIN
            READ a;
            READ b;
            WRITE a * b;
            WRITE a / b;
            WRITE a % b;
        END
    ";

    for a in SAMPLES {
        for b in SAMPLES {
            let expected = vec![a * b, floor_div(a, b), floor_mod(a, b)];
            assert_eq!(expected, run(source, &[a, b])?, "a = {a}, b = {b}");
        }
    }

    Ok(())
}

#[test]
fn test_division_identity() -> anyhow::Result<()> {
    let source = "
        DECLARE a, b, q, r
        BEGIN
            READ a;
            READ b;
            q := a / b;
            r := a % b;
            q := q * b;
            WRITE q + r;
        END
    ";

    for (a, b) in [(1000, 7), (-1000, 7), (1000, -7), (-1000, -7), (123456, 1024)] {
        assert_eq!(vec![a], run(source, &[a, b])?, "a = {a}, b = {b}");
    }

    Ok(())
}

#[test]
fn test_strength_reduced_operations() -> anyhow::Result<()> {
    let source = "
        DECLARE a
        BEGIN
            READ a;
            WRITE a * 2;
            WRITE -2 * a;
            WRITE a * -1;
            WRITE 0 * a;
            WRITE a / 2;
            WRITE a / -2;
            WRITE a / -1;
            WRITE a / 0;
            WRITE 0 / a;
            WRITE a % 2;
            WRITE a % -2;
            WRITE a % 1;
            WRITE a % 0;
        END
    ";

    for a in SAMPLES {
        let expected = vec![
            a * 2,
            -2 * a,
            -a,
            0,
            floor_div(a, 2),
            floor_div(a, -2),
            -a,
            0,
            0,
            floor_mod(a, 2),
            floor_mod(a, -2),
            0,
            0,
        ];
        assert_eq!(expected, run(source, &[a])?, "a = {a}");
    }

    Ok(())
}

#[test]
fn test_literal_operands_in_general_routines() -> anyhow::Result<()> {
    let source = "
        DECLARE a
        BEGIN
            READ a;
            WRITE a * 10;
            WRITE 10 / a;
            WRITE a % 3;
            WRITE -3 % a;
        END
    ";

    for a in [-4, -1, 1, 4, 9] {
        let expected = vec![a * 10, floor_div(10, a), floor_mod(a, 3), floor_mod(-3, a)];
        assert_eq!(expected, run(source, &[a])?, "a = {a}");
    }

    Ok(())
}

#[test]
fn test_products_near_the_limits() -> anyhow::Result<()> {
    let source = "
        DECLARE a, b
        BEGIN
            READ a;
            READ b;
            WRITE a * b;
            WRITE b * a;
        END
    ";

    for (a, b) in [
        (1 << 62, 1),
        (-(1 << 62), 2),
        (1 << 31, 1 << 31),
        (i64::MAX, 1),
        (-3, 3074457345618258602),
    ] {
        let product = a * b;
        assert_eq!(vec![product, product], run(source, &[a, b])?, "a = {a}, b = {b}");
    }

    Ok(())
}
