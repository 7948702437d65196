// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Expression trees for dynamics equations.

Right-hand sides of time derivatives, aliases, state assignments and
on-condition triggers are all stored as [`Expr`] values. The lowering pass
only ever queries expressions symbolically (referenced variables, polynomial
degree); it never evaluates them.
*/

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A symbolic expression over named variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric literal
    Const(f64),
    /// Named variable (state variable, parameter, alias or analog port)
    Var(String),
    /// Unary negation
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    /// Exponentiation
    Pow(Box<Expr>, Box<Expr>),
    /// Function application, e.g. `exp(v / v_thresh)`
    Call(String, Vec<Expr>),
}

impl Expr {
    /// Numeric literal shorthand.
    pub fn num(value: f64) -> Self {
        Expr::Const(value)
    }

    /// Variable shorthand.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn add(self, rhs: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    pub fn sub(self, rhs: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }

    pub fn mul(self, rhs: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }

    pub fn div(self, rhs: Expr) -> Self {
        Expr::Div(Box::new(self), Box::new(rhs))
    }

    pub fn neg(self) -> Self {
        Expr::Neg(Box::new(self))
    }

    /// All variable names referenced anywhere in the expression.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(name) => {
                out.insert(name.as_str());
            }
            Expr::Neg(inner) => inner.collect_variables(out),
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Pow(l, r) => {
                l.collect_variables(out);
                r.collect_variables(out);
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }

    /// Polynomial degree of the expression in the given variable set, or
    /// `None` when the expression is not polynomial in those variables
    /// (a set variable under a function call, a non-literal exponent, or a
    /// set variable in a denominator).
    pub fn degree_in(&self, vars: &BTreeSet<&str>) -> Option<u32> {
        match self {
            Expr::Const(_) => Some(0),
            Expr::Var(name) => Some(if vars.contains(name.as_str()) { 1 } else { 0 }),
            Expr::Neg(inner) => inner.degree_in(vars),
            Expr::Add(l, r) | Expr::Sub(l, r) => {
                Some(l.degree_in(vars)?.max(r.degree_in(vars)?))
            }
            Expr::Mul(l, r) => Some(l.degree_in(vars)? + r.degree_in(vars)?),
            Expr::Div(l, r) => {
                // Division is polynomial only when the denominator does not
                // involve the variable set at all.
                if r.degree_in(vars)? == 0 {
                    l.degree_in(vars)
                } else {
                    None
                }
            }
            Expr::Pow(base, exp) => {
                if exp.degree_in(vars)? != 0 {
                    return None;
                }
                match exp.as_ref() {
                    Expr::Const(n) if n.fract() == 0.0 && *n >= 0.0 => {
                        // checked_mul: an exponent large enough to overflow a
                        // u32 degree is treated as non-polynomial, which is
                        // all the linearity check needs.
                        base.degree_in(vars)?.checked_mul(*n as u32)
                    }
                    // Non-literal exponent: only polynomial if the base is
                    // free of the variable set.
                    _ if base.degree_in(vars)? == 0 => Some(0),
                    _ => None,
                }
            }
            Expr::Call(_, args) => {
                for arg in args {
                    if arg.degree_in(vars)? != 0 {
                        return None;
                    }
                }
                Some(0)
            }
        }
    }

    /// Whether the expression is at most first-order in the given variables.
    pub fn is_linear_in(&self, vars: &BTreeSet<&str>) -> bool {
        matches!(self.degree_in(vars), Some(d) if d <= 1)
    }

    /// Replace every occurrence of variable `name` with `replacement`.
    pub fn substitute(&self, name: &str, replacement: &Expr) -> Expr {
        let subst = |e: &Expr| Box::new(e.substitute(name, replacement));
        match self {
            Expr::Const(v) => Expr::Const(*v),
            Expr::Var(v) if v == name => replacement.clone(),
            Expr::Var(v) => Expr::Var(v.clone()),
            Expr::Neg(inner) => Expr::Neg(subst(inner)),
            Expr::Add(l, r) => Expr::Add(subst(l), subst(r)),
            Expr::Sub(l, r) => Expr::Sub(subst(l), subst(r)),
            Expr::Mul(l, r) => Expr::Mul(subst(l), subst(r)),
            Expr::Div(l, r) => Expr::Div(subst(l), subst(r)),
            Expr::Pow(l, r) => Expr::Pow(subst(l), subst(r)),
            Expr::Call(func, args) => Expr::Call(
                func.clone(),
                args.iter().map(|a| a.substitute(name, replacement)).collect(),
            ),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(v) => write!(f, "{}", v),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Neg(inner) => write!(f, "-({})", inner),
            Expr::Add(l, r) => write!(f, "({} + {})", l, r),
            Expr::Sub(l, r) => write!(f, "({} - {})", l, r),
            Expr::Mul(l, r) => write!(f, "({} * {})", l, r),
            Expr::Div(l, r) => write!(f, "({} / {})", l, r),
            Expr::Pow(l, r) => write!(f, "({} ^ {})", l, r),
            Expr::Call(func, args) => {
                write!(f, "{}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
