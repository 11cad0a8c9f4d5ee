// Reverse-Polish evaluation over fractions
// ----------------------------------------
// Lets regression formulas read left to right instead of as nested calls:
//   rpn![&n, &sum_xy, "*", &sum_x, &sum_y, "*", "-"]   ==   n*Σxy - Σx*Σy
//
// Tokens are fractions, operator symbols (+ - * / dup) or nested groups which are
// evaluated on their own stack and contribute exactly one value.

use std::fmt;
use std::str::FromStr;

use super::error::MathError;
use super::fraction::Fraction;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Dup,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Dup => "dup",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Op {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Op::Add),
            "-" => Ok(Op::Sub),
            "*" => Ok(Op::Mul),
            "/" => Ok(Op::Div),
            "dup" => Ok(Op::Dup),
            other => Err(MathError::UnknownOperand(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Value(Fraction),
    Op(Op),
    /// Unresolved textual operator; checked at evaluation time.
    Symbol(String),
    Group(Vec<Token>),
}

impl Token {
    pub fn group<I: IntoIterator<Item = Token>>(items: I) -> Token {
        Token::Group(items.into_iter().collect())
    }
}

impl From<Fraction> for Token {
    fn from(v: Fraction) -> Self { Token::Value(v) }
}

impl From<&Fraction> for Token {
    fn from(v: &Fraction) -> Self { Token::Value(v.clone()) }
}

impl From<Op> for Token {
    fn from(op: Op) -> Self { Token::Op(op) }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self { Token::Symbol(s.to_string()) }
}

impl From<Vec<Token>> for Token {
    fn from(items: Vec<Token>) -> Self { Token::Group(items) }
}

/// Evaluate a postfix program. Exactly one value must be left on the stack.
pub fn evaluate(tokens: &[Token]) -> Result<Fraction, MathError> {
    let mut stack: Vec<Fraction> = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Token::Value(v) => stack.push(v.clone()),
            Token::Op(op) => apply(&mut stack, *op)?,
            Token::Symbol(s) => apply(&mut stack, s.parse()?)?,
            Token::Group(inner) => stack.push(evaluate(inner)?),
        }
    }

    if stack.len() == 1 {
        if let Some(result) = stack.pop() {
            return Ok(result);
        }
    }
    Err(MathError::ExpectedSingleResult { remaining: stack.len() })
}

fn apply(stack: &mut Vec<Fraction>, op: Op) -> Result<(), MathError> {
    let underflow = || MathError::StackUnderflow { op: op.symbol().to_string() };

    let result = match op {
        Op::Dup => stack.last().cloned().ok_or_else(underflow)?,
        Op::Add | Op::Sub | Op::Mul | Op::Div => {
            let rhs = stack.pop().ok_or_else(underflow)?;
            let lhs = stack.pop().ok_or_else(underflow)?;
            match op {
                Op::Add => &lhs + &rhs,
                Op::Sub => &lhs - &rhs,
                Op::Mul => &lhs * &rhs,
                _ => lhs.checked_div(&rhs)?,
            }
        }
    };
    stack.push(result);
    Ok(())
}

/// `rpn![a, b, "+", c, "*"]`. Each item is anything convertible into a [`Token`].
#[macro_export]
macro_rules! rpn {
    ($($token:expr),* $(,)?) => {
        $crate::math::rpn::evaluate(&[$($crate::math::rpn::Token::from($token)),*])
    };
}
