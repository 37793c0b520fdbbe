//! 编译期求值。
//!
//! 自底向上遍历表达式树，不修改 AST。IR 生成对每个表达式先尝试求值，
//! 得到常量就直接用立即数，失败（`NotConstexpr`）再走运行时代码路径。

use super::error::CompileError;
use super::symbol::{ScopeCursor, SymbolKind, SymbolTable};
use crate::ast::*;

#[derive(Debug)]
pub enum EvalError {
  NotConstexpr,
  CompileError(CompileError),
}

impl From<CompileError> for EvalError {
  fn from(error: CompileError) -> Self {
    EvalError::CompileError(error)
  }
}

impl EvalError {
  pub fn to_compile_error(self, what: &str) -> CompileError {
    match self {
      EvalError::NotConstexpr => CompileError::NotConstexpr(what.into()),
      EvalError::CompileError(error) => error,
    }
  }
}

pub type EvalResult = Result<i32, EvalError>;

pub struct EvalContext<'a> {
  pub table: &'a SymbolTable,
  pub cursor: &'a ScopeCursor,
}

pub trait Eval {
  fn eval(&self, ctx: &EvalContext) -> EvalResult;
}

impl Eval for LOrExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      LOrExp::And(exp) => exp.eval(ctx),
      LOrExp::Or(lhs, rhs) => Ok((lhs.eval(ctx)? != 0 || rhs.eval(ctx)? != 0) as i32),
    }
  }
}

impl Eval for LAndExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      LAndExp::BOr(exp) => exp.eval(ctx),
      LAndExp::And(lhs, rhs) => Ok((lhs.eval(ctx)? != 0 && rhs.eval(ctx)? != 0) as i32),
    }
  }
}

impl Eval for BOrExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      BOrExp::BXor(exp) => exp.eval(ctx),
      BOrExp::Or(lhs, rhs) => Ok(lhs.eval(ctx)? | rhs.eval(ctx)?),
    }
  }
}

impl Eval for BXorExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      BXorExp::BAnd(exp) => exp.eval(ctx),
      BXorExp::Xor(lhs, rhs) => Ok(lhs.eval(ctx)? ^ rhs.eval(ctx)?),
    }
  }
}

impl Eval for BAndExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      BAndExp::Eq(exp) => exp.eval(ctx),
      BAndExp::And(lhs, rhs) => Ok(lhs.eval(ctx)? & rhs.eval(ctx)?),
    }
  }
}

impl Eval for EqExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      EqExp::Rel(exp) => exp.eval(ctx),
      EqExp::Eq(lhs, op, rhs) => {
        let (l, r) = (lhs.eval(ctx)?, rhs.eval(ctx)?);
        Ok(match op {
          EqOp::Equal => (l == r) as i32,
          EqOp::NotEqual => (l != r) as i32,
        })
      }
    }
  }
}

impl Eval for RelExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      RelExp::Add(exp) => exp.eval(ctx),
      RelExp::Rel(lhs, op, rhs) => {
        let (l, r) = (lhs.eval(ctx)?, rhs.eval(ctx)?);
        Ok(match op {
          RelOp::Less => (l < r) as i32,
          RelOp::LessEqual => (l <= r) as i32,
          RelOp::Greater => (l > r) as i32,
          RelOp::GreaterEqual => (l >= r) as i32,
        })
      }
    }
  }
}

impl Eval for AddExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      AddExp::Mul(exp) => exp.eval(ctx),
      AddExp::Add(lhs, op, rhs) => {
        let (l, r) = (lhs.eval(ctx)?, rhs.eval(ctx)?);
        Ok(match op {
          AddOp::Plus => l.wrapping_add(r),
          AddOp::Minus => l.wrapping_sub(r),
        })
      }
    }
  }
}

impl Eval for MulExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      MulExp::Unary(exp) => exp.eval(ctx),
      MulExp::Mul(lhs, op, rhs) => {
        let (l, r) = (lhs.eval(ctx)?, rhs.eval(ctx)?);
        Ok(match op {
          MulOp::Multiply => l.wrapping_mul(r),
          MulOp::Divide => {
            if r == 0 {
              Err(CompileError::DivisionByZero)?
            }
            l.wrapping_div(r)
          }
          MulOp::Modulo => {
            if r == 0 {
              Err(CompileError::DivisionByZero)?
            }
            l.wrapping_rem(r)
          }
        })
      }
    }
  }
}

impl Eval for UnaryExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      UnaryExp::Primary(exp) => exp.eval(ctx),
      UnaryExp::Call(..) => Err(EvalError::NotConstexpr),
      UnaryExp::Op(op, exp) => {
        let value = exp.eval(ctx)?;
        Ok(match op {
          UnaryOp::Positive => value,
          UnaryOp::Negative => value.wrapping_neg(),
          UnaryOp::Not => (value == 0) as i32,
          UnaryOp::BitNot => !value,
        })
      }
    }
  }
}

impl Eval for PrimaryExp {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    match self {
      PrimaryExp::Num(num) => Ok(*num),
      PrimaryExp::LVal(lval) => lval.eval(ctx),
      PrimaryExp::Paren(exp) => exp.eval(ctx),
    }
  }
}

impl Eval for LVal {
  fn eval(&self, ctx: &EvalContext) -> EvalResult {
    let sym = ctx.table.lookup(&self.ident, ctx.cursor)?;
    if sym.kind != SymbolKind::Const {
      return Err(EvalError::NotConstexpr);
    }
    if !sym.is_array() {
      return Ok(sym.init);
    }
    // 常量数组：下标全为常量时按行主序取展平后的初始化值
    if sym.is_decayed() || self.indices.len() != sym.dims.len() {
      return Err(EvalError::NotConstexpr);
    }
    let mut linear = 0usize;
    for (dim, exp) in sym.dims.iter().zip(&self.indices) {
      let index = exp.eval(ctx)?;
      if index < 0 || index >= *dim {
        return Err(EvalError::NotConstexpr);
      }
      linear = linear * *dim as usize + index as usize;
    }
    Ok(sym.init_array.get(linear).copied().unwrap_or(0))
  }
}

/// 将嵌套初始化器展平为行主序的常量序列，不足处补零。
///
/// 花括号组对齐子数组边界：`{{1}, {2, 3}}` 填入 `int[2][3]` 时，内层组
/// 各占满一整行，得到 `[1, 0, 0, 2, 3, 0]`。
pub fn flatten_init(
  dims: &[i32],
  init: &InitVal,
  ctx: &EvalContext,
) -> Result<Vec<i32>, EvalError> {
  let total: usize = dims.iter().map(|&d| d as usize).product();
  let mut flat = match init {
    InitVal::Exp(exp) => vec![exp.eval(ctx)?],
    InitVal::List(items) => fill_group(items, dims, ctx)?,
  };
  if flat.len() > total {
    Err(CompileError::TypeMismatch(
      "initializer",
      format!("{} elements", flat.len()),
    ))?;
  }
  flat.resize(total, 0);
  Ok(flat)
}

fn fill_group(
  items: &[InitVal],
  dims: &[i32],
  ctx: &EvalContext,
) -> Result<Vec<i32>, EvalError> {
  let mut out = Vec::new();
  for item in items {
    match item {
      InitVal::Exp(exp) => out.push(exp.eval(ctx)?),
      InitVal::List(inner) => {
        // 子列表对准当前位置能整除的最大子数组，填不满的部分补零
        let mut from = 1;
        while from < dims.len()
          && out.len() % dims[from..].iter().map(|&d| d as usize).product::<usize>() != 0
        {
          from += 1;
        }
        let sub = &dims[from..];
        let sub_total: usize = sub.iter().map(|&d| d as usize).product();
        let mut words = fill_group(inner, sub, ctx)?;
        if words.len() > sub_total {
          Err(CompileError::TypeMismatch(
            "initializer",
            format!("{} elements", words.len()),
          ))?;
        }
        words.resize(sub_total, 0);
        out.extend(words);
      }
    }
  }
  Ok(out)
}
