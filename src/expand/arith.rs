//! Arithmetic evaluation
//!
//! Evaluates a parsed `ArithExpr` against the shell state. Identifiers
//! resolve through the variable scopes at evaluation time; undefined names
//! are 0; a variable whose value is itself an expression is evaluated
//! recursively (depth-limited). `$…` atoms are expanded first and the
//! result parsed as a value. Assignments write back through the scopes.

use crate::ast::types::{ArithAssignOp, ArithBinaryOp, ArithExpr, ArithUnaryOp};
use crate::exec::error::ExecError;
use crate::expand::Expander;
use crate::parser::arith::parse_arith;

const MAX_VALUE_RECURSION: u32 = 64;

pub fn eval_arith(ex: &mut Expander, expr: &ArithExpr) -> Result<i64, ExecError> {
    eval(ex, expr, 0)
}

fn eval(ex: &mut Expander, expr: &ArithExpr, depth: u32) -> Result<i64, ExecError> {
    if depth > MAX_VALUE_RECURSION {
        return Err(err("expression recursion level exceeded"));
    }

    match expr {
        ArithExpr::Number(n) => Ok(*n),
        ArithExpr::Group(inner) => eval(ex, inner, depth),
        ArithExpr::Var { name, index } => {
            let text = read_var(ex, name, index.as_deref(), depth)?;
            value_of_string(ex, &text, depth)
        }
        ArithExpr::Expansion(raw) => {
            let word = crate::parser::word::parse_word(raw)
                .map_err(|e| err(format!("bad expression: {}", e.message)))?;
            let text = ex.expand_single(&word)?;
            value_of_string(ex, &text, depth)
        }
        ArithExpr::Unary {
            op,
            operand,
            postfix,
        } => match op {
            ArithUnaryOp::Neg => Ok(eval(ex, operand, depth + 1)?.wrapping_neg()),
            ArithUnaryOp::Pos => eval(ex, operand, depth + 1),
            ArithUnaryOp::Not => Ok((eval(ex, operand, depth + 1)? == 0) as i64),
            ArithUnaryOp::BitNot => Ok(!eval(ex, operand, depth + 1)?),
            ArithUnaryOp::Inc | ArithUnaryOp::Dec => {
                let (name, index) = match operand.as_ref() {
                    ArithExpr::Var { name, index } => (name.clone(), index.clone()),
                    _ => return Err(err("++/-- requires a variable")),
                };
                let old_text = read_var(ex, &name, index.as_deref(), depth)?;
                let old = value_of_string(ex, &old_text, depth)?;
                let new = if *op == ArithUnaryOp::Inc {
                    old.wrapping_add(1)
                } else {
                    old.wrapping_sub(1)
                };
                write_var(ex, &name, index.as_deref(), new, depth)?;
                Ok(if *postfix { old } else { new })
            }
        },
        ArithExpr::Binary { op, lhs, rhs } => {
            match op {
                // Short-circuit forms evaluate the right side lazily.
                ArithBinaryOp::LogAnd => {
                    if eval(ex, lhs, depth + 1)? == 0 {
                        return Ok(0);
                    }
                    return Ok((eval(ex, rhs, depth + 1)? != 0) as i64);
                }
                ArithBinaryOp::LogOr => {
                    if eval(ex, lhs, depth + 1)? != 0 {
                        return Ok(1);
                    }
                    return Ok((eval(ex, rhs, depth + 1)? != 0) as i64);
                }
                ArithBinaryOp::Comma => {
                    eval(ex, lhs, depth + 1)?;
                    return eval(ex, rhs, depth + 1);
                }
                _ => {}
            }

            let a = eval(ex, lhs, depth + 1)?;
            let b = eval(ex, rhs, depth + 1)?;
            binary(*op, a, b)
        }
        ArithExpr::Ternary {
            cond,
            then,
            otherwise,
        } => {
            if eval(ex, cond, depth + 1)? != 0 {
                eval(ex, then, depth + 1)
            } else {
                eval(ex, otherwise, depth + 1)
            }
        }
        ArithExpr::Assign {
            op,
            name,
            index,
            value,
        } => {
            let rhs = eval(ex, value, depth + 1)?;
            let result = match op {
                ArithAssignOp::Assign => rhs,
                _ => {
                    let old_text = read_var(ex, name, index.as_deref(), depth)?;
                    let old = value_of_string(ex, &old_text, depth)?;
                    compound_assign(*op, old, rhs)?
                }
            };
            write_var(ex, name, index.as_deref(), result, depth)?;
            Ok(result)
        }
    }
}

fn binary(op: ArithBinaryOp, a: i64, b: i64) -> Result<i64, ExecError> {
    Ok(match op {
        ArithBinaryOp::Add => a.wrapping_add(b),
        ArithBinaryOp::Sub => a.wrapping_sub(b),
        ArithBinaryOp::Mul => a.wrapping_mul(b),
        ArithBinaryOp::Div => {
            if b == 0 {
                return Err(err("division by 0"));
            }
            a.wrapping_div(b)
        }
        ArithBinaryOp::Mod => {
            if b == 0 {
                return Err(err("division by 0"));
            }
            a.wrapping_rem(b)
        }
        ArithBinaryOp::Pow => {
            if b < 0 {
                return Err(err("exponent less than 0"));
            }
            let mut result: i64 = 1;
            for _ in 0..b {
                result = result.wrapping_mul(a);
            }
            result
        }
        ArithBinaryOp::Shl => a.wrapping_shl(b as u32),
        ArithBinaryOp::Shr => a.wrapping_shr(b as u32),
        ArithBinaryOp::Lt => (a < b) as i64,
        ArithBinaryOp::Le => (a <= b) as i64,
        ArithBinaryOp::Gt => (a > b) as i64,
        ArithBinaryOp::Ge => (a >= b) as i64,
        ArithBinaryOp::Eq => (a == b) as i64,
        ArithBinaryOp::Ne => (a != b) as i64,
        ArithBinaryOp::BitAnd => a & b,
        ArithBinaryOp::BitXor => a ^ b,
        ArithBinaryOp::BitOr => a | b,
        ArithBinaryOp::LogAnd | ArithBinaryOp::LogOr | ArithBinaryOp::Comma => unreachable!(),
    })
}

fn compound_assign(op: ArithAssignOp, old: i64, rhs: i64) -> Result<i64, ExecError> {
    let bin = match op {
        ArithAssignOp::Assign => unreachable!(),
        ArithAssignOp::Add => ArithBinaryOp::Add,
        ArithAssignOp::Sub => ArithBinaryOp::Sub,
        ArithAssignOp::Mul => ArithBinaryOp::Mul,
        ArithAssignOp::Div => ArithBinaryOp::Div,
        ArithAssignOp::Mod => ArithBinaryOp::Mod,
        ArithAssignOp::Shl => ArithBinaryOp::Shl,
        ArithAssignOp::Shr => ArithBinaryOp::Shr,
        ArithAssignOp::And => ArithBinaryOp::BitAnd,
        ArithAssignOp::Xor => ArithBinaryOp::BitXor,
        ArithAssignOp::Or => ArithBinaryOp::BitOr,
    };
    binary(bin, old, rhs)
}

/// Current text of a variable or array element; unset reads as "".
fn read_var(
    ex: &mut Expander,
    name: &str,
    index: Option<&ArithExpr>,
    depth: u32,
) -> Result<String, ExecError> {
    match index {
        Some(index_expr) => {
            let idx = eval(ex, index_expr, depth + 1)?;
            Ok(ex
                .state
                .vars
                .get(name)
                .and_then(|v| v.value.as_ref())
                .and_then(|v| v.get_index(idx))
                .unwrap_or_default())
        }
        None => {
            // Specials like $? are valid identifiers in (( )) only via $,
            // but positional-free names go through the scopes.
            Ok(ex.state.param_string(name).unwrap_or_default())
        }
    }
}

fn write_var(
    ex: &mut Expander,
    name: &str,
    index: Option<&ArithExpr>,
    value: i64,
    depth: u32,
) -> Result<(), ExecError> {
    let result = match index {
        Some(index_expr) => {
            let idx = eval(ex, index_expr, depth + 1)?;
            ex.state.vars.set_index(name, idx, value.to_string())
        }
        None => ex.state.vars.set_scalar(name, value.to_string()),
    };
    result.map_err(|e| ExecError::Expansion(e.to_string()))
}

/// Interpret a string as an arithmetic value: empty is 0, otherwise parse
/// and evaluate (covers base prefixes and nested expressions).
fn value_of_string(ex: &mut Expander, text: &str, depth: u32) -> Result<i64, ExecError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n);
    }
    let expr =
        parse_arith(trimmed).map_err(|e| err(format!("{}: {}", trimmed, e)))?;
    eval(ex, &expr, depth + 1)
}

fn err(message: impl Into<String>) -> ExecError {
    ExecError::Expansion(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ShellState;

    fn eval_text(state: &mut ShellState, text: &str) -> Result<i64, ExecError> {
        let expr = parse_arith(text).unwrap();
        let mut ex = Expander::new(state);
        eval_arith(&mut ex, &expr)
    }

    #[test]
    fn basic_arithmetic() {
        let mut state = ShellState::new();
        assert_eq!(eval_text(&mut state, "1 + 2 * 3").unwrap(), 7);
        assert_eq!(eval_text(&mut state, "(1 + 2) * 3").unwrap(), 9);
        assert_eq!(eval_text(&mut state, "7 % 3").unwrap(), 1);
        assert_eq!(eval_text(&mut state, "2 ** 10").unwrap(), 1024);
    }

    #[test]
    fn shifts() {
        let mut state = ShellState::new();
        state.vars.set_scalar("x", "5").unwrap();
        assert_eq!(eval_text(&mut state, "x<<2").unwrap(), 20);
        assert_eq!(eval_text(&mut state, "x>>1").unwrap(), 2);
    }

    #[test]
    fn undefined_identifiers_are_zero() {
        let mut state = ShellState::new();
        assert_eq!(eval_text(&mut state, "missing + 1").unwrap(), 1);
    }

    #[test]
    fn string_values_are_reparsed() {
        let mut state = ShellState::new();
        state.vars.set_scalar("x", "0x10").unwrap();
        assert_eq!(eval_text(&mut state, "x + 1").unwrap(), 17);
        state.vars.set_scalar("y", "x + 2").unwrap();
        assert_eq!(eval_text(&mut state, "y").unwrap(), 18);
    }

    #[test]
    fn assignments_write_back() {
        let mut state = ShellState::new();
        assert_eq!(eval_text(&mut state, "a = 5").unwrap(), 5);
        assert_eq!(state.vars.get_string("a").as_deref(), Some("5"));
        assert_eq!(eval_text(&mut state, "a += 3").unwrap(), 8);
        assert_eq!(state.vars.get_string("a").as_deref(), Some("8"));
    }

    #[test]
    fn increments() {
        let mut state = ShellState::new();
        state.vars.set_scalar("i", "5").unwrap();
        assert_eq!(eval_text(&mut state, "i++").unwrap(), 5);
        assert_eq!(state.vars.get_string("i").as_deref(), Some("6"));
        assert_eq!(eval_text(&mut state, "++i").unwrap(), 7);
    }

    #[test]
    fn logical_short_circuit() {
        let mut state = ShellState::new();
        assert_eq!(eval_text(&mut state, "0 && (x = 9)").unwrap(), 0);
        assert!(state.vars.get_string("x").is_none());
        assert_eq!(eval_text(&mut state, "1 || (y = 9)").unwrap(), 1);
        assert!(state.vars.get_string("y").is_none());
    }

    #[test]
    fn ternary_and_comma() {
        let mut state = ShellState::new();
        assert_eq!(eval_text(&mut state, "1 ? 10 : 20").unwrap(), 10);
        assert_eq!(eval_text(&mut state, "0 ? 10 : 20").unwrap(), 20);
        assert_eq!(eval_text(&mut state, "a = 1, a + 1").unwrap(), 2);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let mut state = ShellState::new();
        assert!(eval_text(&mut state, "1 / 0").is_err());
        assert!(eval_text(&mut state, "1 % 0").is_err());
    }

    #[test]
    fn array_elements() {
        let mut state = ShellState::new();
        state.vars.set_index("arr", 0, "3".into()).unwrap();
        state.vars.set_index("arr", 1, "4".into()).unwrap();
        assert_eq!(eval_text(&mut state, "arr[0] + arr[1]").unwrap(), 7);
        assert_eq!(eval_text(&mut state, "arr[2] = 9").unwrap(), 9);
        assert_eq!(
            state.vars.get("arr").unwrap().value.as_ref().unwrap().get_index(2),
            Some("9".to_string())
        );
    }

    #[test]
    fn dollar_expansion_atom() {
        let mut state = ShellState::new();
        state.vars.set_scalar("n", "6").unwrap();
        assert_eq!(eval_text(&mut state, "$n * 7").unwrap(), 42);
    }

    #[test]
    fn self_referential_value_errors_out() {
        let mut state = ShellState::new();
        state.vars.set_scalar("a", "b").unwrap();
        state.vars.set_scalar("b", "a").unwrap();
        assert!(eval_text(&mut state, "a").is_err());
    }
}
