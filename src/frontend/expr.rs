//! 表达式的 IR 生成。
//!
//! 每个表达式先走编译期求值，成功就返回立即数文本；否则递归生成运行时
//! 指令，返回承载结果的临时值名。`&&`/`||` 以分支实现短路语义。

use super::consteval::{Eval, EvalContext, EvalError};
use super::error::CompileError;
use super::ir::IrBuilder;
use super::symbol::{SymbolEntry, SymbolKind};
use crate::ast::*;
use crate::Result;

pub fn generate<E>(exp: &E, b: &mut IrBuilder) -> Result<String>
where
  E: Eval + GenerateValue,
{
  let ctx = EvalContext {
    table: b.table,
    cursor: &b.cursor,
  };
  match exp.eval(&ctx) {
    Ok(value) => Ok(value.to_string()),
    Err(EvalError::NotConstexpr) => exp.generate_value(b),
    Err(EvalError::CompileError(error)) => Err(error)?,
  }
}

pub trait GenerateValue {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String>;
}

fn binary(b: &mut IrBuilder, op: &str, lhs: String, rhs: String) -> Result<String> {
  let result = b.fresh_ident();
  b.push(format!("{} = {} {}, {}", result, op, lhs, rhs));
  Ok(result)
}

enum ShortCircuitOp {
  Or,
  And,
}

/// `a || b` 先置结果单元为 1，仅当 a 为假时才计算 b；`&&` 对偶。
fn short_circuit<L, R>(
  b: &mut IrBuilder,
  lhs: &L,
  op: ShortCircuitOp,
  rhs: &R,
) -> Result<String>
where
  L: Eval + GenerateValue,
  R: Eval + GenerateValue,
{
  let dead = b.is_dead();
  let cell = b.fresh_ident();
  b.push(format!("{} = alloc i32", cell));
  let (default, enter_rhs) = match op {
    ShortCircuitOp::Or => (1, "eq"),
    ShortCircuitOp::And => (0, "ne"),
  };
  b.push(format!("store {}, {}", default, cell));

  let lhs = generate(lhs, b)?;
  let cond = b.fresh_ident();
  b.push(format!("{} = {} {}, 0", cond, enter_rhs, lhs));
  let entry = b.seal(dead);
  let rhs_label = b.current_label();

  let rhs = generate(rhs, b)?;
  let normalized = b.fresh_ident();
  b.push(format!("{} = ne {}, 0", normalized, rhs));
  b.push(format!("store {}, {}", normalized, cell));
  let rhs_tail = b.seal(dead);
  let end_label = b.current_label();

  b.append_to(entry, format!("br {}, {}, {}", cond, rhs_label, end_label));
  b.append_to(rhs_tail, format!("jump {}", end_label));

  let result = b.fresh_ident();
  b.push(format!("{} = load {}", result, cell));
  Ok(result)
}

impl GenerateValue for LOrExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      LOrExp::And(exp) => exp.generate_value(b),
      LOrExp::Or(lhs, rhs) => short_circuit(b, lhs.as_ref(), ShortCircuitOp::Or, rhs.as_ref()),
    }
  }
}

impl GenerateValue for LAndExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      LAndExp::BOr(exp) => exp.generate_value(b),
      LAndExp::And(lhs, rhs) => {
        short_circuit(b, lhs.as_ref(), ShortCircuitOp::And, rhs.as_ref())
      }
    }
  }
}

impl GenerateValue for BOrExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      BOrExp::BXor(exp) => exp.generate_value(b),
      BOrExp::Or(lhs, rhs) => {
        let (l, r) = (generate(lhs.as_ref(), b)?, generate(rhs.as_ref(), b)?);
        binary(b, "or", l, r)
      }
    }
  }
}

impl GenerateValue for BXorExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      BXorExp::BAnd(exp) => exp.generate_value(b),
      BXorExp::Xor(lhs, rhs) => {
        let (l, r) = (generate(lhs.as_ref(), b)?, generate(rhs.as_ref(), b)?);
        binary(b, "xor", l, r)
      }
    }
  }
}

impl GenerateValue for BAndExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      BAndExp::Eq(exp) => exp.generate_value(b),
      BAndExp::And(lhs, rhs) => {
        let (l, r) = (generate(lhs.as_ref(), b)?, generate(rhs.as_ref(), b)?);
        binary(b, "and", l, r)
      }
    }
  }
}

impl GenerateValue for EqExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      EqExp::Rel(exp) => exp.generate_value(b),
      EqExp::Eq(lhs, op, rhs) => {
        let (l, r) = (generate(lhs.as_ref(), b)?, generate(rhs.as_ref(), b)?);
        let op = match op {
          EqOp::Equal => "eq",
          EqOp::NotEqual => "ne",
        };
        binary(b, op, l, r)
      }
    }
  }
}

impl GenerateValue for RelExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      RelExp::Add(exp) => exp.generate_value(b),
      RelExp::Rel(lhs, op, rhs) => {
        let (l, r) = (generate(lhs.as_ref(), b)?, generate(rhs.as_ref(), b)?);
        let op = match op {
          RelOp::Less => "lt",
          RelOp::LessEqual => "le",
          RelOp::Greater => "gt",
          RelOp::GreaterEqual => "ge",
        };
        binary(b, op, l, r)
      }
    }
  }
}

impl GenerateValue for AddExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      AddExp::Mul(exp) => exp.generate_value(b),
      AddExp::Add(lhs, op, rhs) => {
        let (l, r) = (generate(lhs.as_ref(), b)?, generate(rhs.as_ref(), b)?);
        let op = match op {
          AddOp::Plus => "add",
          AddOp::Minus => "sub",
        };
        binary(b, op, l, r)
      }
    }
  }
}

impl GenerateValue for MulExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      MulExp::Unary(exp) => exp.generate_value(b),
      MulExp::Mul(lhs, op, rhs) => {
        let (l, r) = (generate(lhs.as_ref(), b)?, generate(rhs.as_ref(), b)?);
        let op = match op {
          MulOp::Multiply => "mul",
          MulOp::Divide => "div",
          MulOp::Modulo => "mod",
        };
        binary(b, op, l, r)
      }
    }
  }
}

impl GenerateValue for UnaryExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      UnaryExp::Primary(exp) => exp.generate_value(b),
      UnaryExp::Call(name, args) => {
        let is_void = b.table.func_ret_void(name)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
          values.push(generate(arg, b)?);
        }
        let args = values.join(", ");
        if is_void {
          b.push(format!("call @{}({})", name, args));
          Ok("0".to_string())
        } else {
          let result = b.fresh_ident();
          b.push(format!("{} = call @{}({})", result, name, args));
          Ok(result)
        }
      }
      UnaryExp::Op(op, exp) => {
        let value = generate(exp.as_ref(), b)?;
        match op {
          UnaryOp::Positive => Ok(value),
          UnaryOp::Negative => binary(b, "sub", "0".into(), value),
          UnaryOp::Not => binary(b, "eq", value, "0".into()),
          UnaryOp::BitNot => binary(b, "xor", value, "-1".into()),
        }
      }
    }
  }
}

impl GenerateValue for PrimaryExp {
  fn generate_value(&self, b: &mut IrBuilder) -> Result<String> {
    match self {
      PrimaryExp::Num(num) => Ok(num.to_string()),
      PrimaryExp::LVal(lval) => lval_value(lval, b),
      PrimaryExp::Paren(exp) => generate(exp.as_ref(), b),
    }
  }
}

/// 逐维生成地址计算链。退化形参先 load 出指针，首个下标用 `getptr`。
fn index_chain(sym: &SymbolEntry, indices: &[String], b: &mut IrBuilder) -> String {
  let mut ptr;
  if sym.is_decayed() {
    ptr = b.fresh_ident();
    b.push(format!("{} = load {}", ptr, sym.ir_name()));
    for (i, index) in indices.iter().enumerate() {
      let next = b.fresh_ident();
      let op = if i == 0 { "getptr" } else { "getelemptr" };
      b.push(format!("{} = {} {}, {}", next, op, ptr, index));
      ptr = next;
    }
  } else {
    ptr = sym.ir_name();
    for index in indices {
      let next = b.fresh_ident();
      b.push(format!("{} = getelemptr {}, {}", next, ptr, index));
      ptr = next;
    }
  }
  ptr
}

/// 左值作右值使用。部分索引的数组退化为指向余下维度的指针。
pub fn lval_value(lval: &LVal, b: &mut IrBuilder) -> Result<String> {
  let sym = b.table.lookup(&lval.ident, &b.cursor)?;
  if !sym.is_array() {
    if sym.kind == SymbolKind::Const {
      return Ok(sym.init.to_string());
    }
    let result = b.fresh_ident();
    b.push(format!("{} = load {}", result, sym.ir_name()));
    return Ok(result);
  }

  let mut indices = Vec::with_capacity(lval.indices.len());
  for index in &lval.indices {
    indices.push(generate(index, b)?);
  }
  let ptr = index_chain(sym, &indices, b);

  if lval.indices.len() == sym.dims.len() {
    let result = b.fresh_ident();
    b.push(format!("{} = load {}", result, ptr));
    Ok(result)
  } else if sym.is_decayed() && lval.indices.is_empty() {
    Ok(ptr)
  } else {
    let result = b.fresh_ident();
    b.push(format!("{} = getelemptr {}, 0", result, ptr));
    Ok(result)
  }
}

/// 左值作赋值目标。必须是标量或完全索引的数组元素。
pub fn lval_addr(lval: &LVal, b: &mut IrBuilder) -> Result<String> {
  let sym = b.table.lookup(&lval.ident, &b.cursor)?;
  if sym.kind == SymbolKind::Const {
    Err(CompileError::AssignToConst(lval.ident.clone()))?;
  }
  if !sym.is_array() {
    return Ok(sym.ir_name());
  }
  if lval.indices.len() != sym.dims.len() {
    Err(CompileError::TypeMismatch("scalar lvalue", lval.ident.clone()))?;
  }
  let mut indices = Vec::with_capacity(lval.indices.len());
  for index in &lval.indices {
    indices.push(generate(index, b)?);
  }
  Ok(index_chain(sym, &indices, b))
}
