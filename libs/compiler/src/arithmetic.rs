//! Arithmetic the machine has no instruction for, built from add, subtract and shifts.
//!
//! The binary routines expect the left operand in the accumulator and the right one in
//! [`RHS`]. They leave the result in the accumulator and clobber every cell from [`LHS`]
//! to [`T3`].

use crate::{
    emitter::Emitter,
    instruction::Instruction,
    labels::{self, Label},
    registers::{LHS, NEG_ONE, ONE, RHS, T1, T2, T3, TMP},
};

/// The `INC`/`DEC`/`SHIFT 1` steps that rebuild `n` from zero, most significant first.
pub fn materialization_steps(n: i64) -> Vec<Instruction> {
    let mut steps = Vec::new();
    let mut num = n;

    while num != 0 {
        if num % 2 == 0 {
            num /= 2;
            steps.push(Instruction::Shift(ONE));
        } else if num > 0 {
            num -= 1;
            steps.push(Instruction::Inc);
        } else {
            num += 1;
            steps.push(Instruction::Dec);
        }
    }

    steps.reverse();
    steps
}

impl Emitter {
    /// Builds `n` in the accumulator. `SUB 0` is skipped when it is known to hold zero.
    pub fn materialize(&mut self, n: i64, acc_is_zero: bool) {
        if !acc_is_zero {
            self.zero();
        }
        for step in materialization_steps(n) {
            self.push(step);
        }
    }

    /// `p0 := -p0`
    pub fn negate(&mut self) {
        self.store(TMP);
        self.sub(TMP);
        self.sub(TMP);
    }

    /// Exchanges two cells through [`TMP`]. Skips the first load if `a` is already in the
    /// accumulator.
    pub fn swap(&mut self, a: u64, b: u64, a_loaded: bool) {
        if !a_loaded {
            self.load(a);
        }
        self.store(TMP);
        self.load(b);
        self.store(a);
        self.load(TMP);
        self.store(b);
    }

    /// `p0 := p0 mod 2`, always 0 or 1.
    pub fn parity(&mut self) {
        self.store(TMP);
        self.shift(NEG_ONE);
        self.shift(ONE);
        self.sub(TMP);
        self.negate();
    }

    /// Negates both cells when `counter` is negative, so the product keeps its sign.
    fn make_counter_positive(&mut self, counter: u64, other: u64) -> Result<(), labels::Error> {
        let done = self.label()?;

        self.load(counter);
        self.jpos(done)?;
        self.jzero(done)?;
        self.negate();
        self.store(counter);
        self.load(other);
        self.negate();
        self.store(other);
        self.place(done)
    }

    /// `p0 := p0 * p(RHS)` by binary long multiplication, iterating over the operand of
    /// smaller magnitude.
    pub fn multiply(&mut self) -> Result<(), labels::Error> {
        let (n, x, y) = (LHS, RHS, T1);

        self.scoped(|e| {
            let abs_x = e.label()?;
            let no_swap = e.label()?;
            let head = e.label()?;
            let even = e.label()?;
            let end = e.label()?;

            e.store(n);
            e.make_counter_positive(n, x)?;
            e.zero();
            e.store(y);

            // iterate over the smaller of n and |x|
            e.load(x);
            e.jpos(abs_x)?;
            e.negate();
            e.place(abs_x)?;
            e.sub(n);
            e.jpos(no_swap)?;
            e.swap(n, x, false);
            e.make_counter_positive(n, x)?;
            e.place(no_swap)?;

            e.load(n);
            e.place(head)?;
            e.jzero(end)?;
            e.shift(NEG_ONE);
            e.shift(ONE);
            e.sub(n);
            e.jzero(even)?;
            e.load(y);
            e.add(x);
            e.store(y);
            e.place(even)?;
            e.load(n);
            e.shift(NEG_ONE);
            e.store(n);
            // x is not doubled past the last bit, so it stays within the product
            e.jzero(end)?;
            e.load(x);
            e.shift(ONE);
            e.store(x);
            e.load(n);
            e.jump(head)?;

            e.place(end)?;
            e.load(y);
            Ok(())
        })
    }

    /// `p0 := floor(p0 / p(RHS))`, zero when dividing by zero.
    pub fn divide(&mut self) -> Result<(), labels::Error> {
        let (n, y, c, sign) = (LHS, T1, T2, T3);

        self.scoped(|e| {
            let ret = e.label()?;
            let minus_one = e.label()?;
            let one = e.label()?;
            let same_sign = e.label()?;
            let exact = e.label()?;

            e.store(n);
            e.zero();
            e.store(y);
            e.inc();
            e.store(c);
            e.dec();
            e.store(sign);

            e.normalize_operands(ret, minus_one, one)?;
            e.long_division(Some(y))?;

            // round toward negative infinity when the signs differ
            e.load(sign);
            e.jzero(same_sign)?;
            e.load(n);
            e.jzero(exact)?;
            e.load(y);
            e.negate();
            e.dec();
            e.jump(ret)?;
            e.place(exact)?;
            e.load(y);
            e.negate();
            e.jump(ret)?;

            e.place(minus_one)?;
            e.load(n);
            e.negate();
            e.jump(ret)?;

            e.place(one)?;
            e.load(n);
            e.jump(ret)?;

            e.place(same_sign)?;
            e.load(y);
            e.place(ret)
        })
    }

    /// `p0 := p0 mod p(RHS)`, taking the sign of the divisor. Zero when the divisor is zero.
    pub fn modulo(&mut self) -> Result<(), labels::Error> {
        let (n, m, m_original, c, sign) = (LHS, RHS, T1, T2, T3);

        self.scoped(|e| {
            let ret = e.label()?;
            let same_sign = e.label()?;
            let negative_divisor = e.label()?;
            let positive = e.label()?;

            e.store(n);
            e.zero();
            e.inc();
            e.store(c);
            e.dec();
            e.store(sign);
            e.load(m);
            e.store(m_original);

            // m = 1 and m = -1 leave no remainder
            e.normalize_operands(ret, ret, ret)?;
            e.long_division(None)?;

            e.load(n);
            e.jzero(ret)?;
            e.load(sign);
            e.jzero(same_sign)?;
            e.load(m_original);
            e.jneg(negative_divisor)?;
            e.sub(n);
            e.jump(ret)?;
            e.place(negative_divisor)?;
            e.add(n);
            e.jump(ret)?;

            e.place(same_sign)?;
            e.load(m_original);
            e.jpos(positive)?;
            e.load(n);
            e.negate();
            e.jump(ret)?;
            e.place(positive)?;
            e.load(n);

            e.place(ret)
        })
    }

    /// Shared prologue of division and modulo. Jumps to `zero` with a zero accumulator
    /// when `m = 0` or `n = 0`, to `minus_one`/`one` when `m` is `-1`/`1`. Otherwise makes
    /// both operands positive and leaves the sign cell non-zero iff their signs differed.
    fn normalize_operands(
        &mut self,
        zero: Label,
        minus_one: Label,
        one: Label,
    ) -> Result<(), labels::Error> {
        let (n, m, sign) = (LHS, RHS, T3);
        let m_positive = self.label()?;
        let n_positive = self.label()?;

        self.load(m);
        self.jzero(zero)?;
        self.inc();
        self.jzero(minus_one)?;
        self.dec();
        self.dec();
        self.jzero(one)?;
        self.inc();

        self.jpos(m_positive)?;
        self.negate();
        self.store(m);
        self.load(sign);
        self.inc();
        self.store(sign);
        self.place(m_positive)?;

        self.load(n);
        self.jzero(zero)?;
        self.jpos(n_positive)?;
        self.negate();
        self.store(n);
        self.load(sign);
        self.dec();
        self.store(sign);
        self.place(n_positive)
    }

    /// Shift-subtract division of positive `n` by positive `m`, with the power-of-two
    /// counter starting at 1. Leaves the remainder in `n` and adds the quotient into
    /// `quotient` when one is given.
    fn long_division(&mut self, quotient: Option<u64>) -> Result<(), labels::Error> {
        let (n, m, c) = (LHS, RHS, T2);
        let grow = self.label()?;
        let shrink = self.label()?;
        let skip = self.label()?;
        let done = self.label()?;

        self.place(grow)?;
        self.load(n);
        self.sub(m);
        let shrink_start = self.label()?;
        self.jneg(shrink_start)?;
        self.load(m);
        self.shift(ONE);
        self.store(m);
        self.load(c);
        self.shift(ONE);
        self.store(c);
        self.jump(grow)?;

        self.place(shrink_start)?;
        self.load(c);
        self.place(shrink)?;
        self.jzero(done)?;
        self.load(n);
        self.sub(m);
        self.jneg(skip)?;
        self.store(n);
        if let Some(quotient) = quotient {
            self.load(quotient);
            self.add(c);
            self.store(quotient);
        }
        self.place(skip)?;
        self.load(m);
        self.shift(NEG_ONE);
        self.store(m);
        self.load(c);
        self.shift(NEG_ONE);
        self.store(c);
        self.jump(shrink)?;

        self.place(done)
    }
}
