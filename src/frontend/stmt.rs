//! 语句的 IR 生成。控制流语句在这里被线性化为基本块。

use super::decl;
use super::error::CompileError;
use super::expr;
use super::ir::IrBuilder;
use crate::ast::*;
use crate::Result;

pub fn generate_block(block: &Block, b: &mut IrBuilder) -> Result<()> {
  b.cursor.enter_block();
  for item in block {
    match item {
      BlockItem::Decl(decl) => decl::generate_local(decl, b)?,
      BlockItem::Stmt(stmt) => generate(stmt, b)?,
    }
  }
  b.cursor.leave_block();
  Ok(())
}

pub fn generate(stmt: &Stmt, b: &mut IrBuilder) -> Result<()> {
  match stmt {
    Stmt::Assign(lval, exp) => {
      let value = expr::generate(exp.as_ref(), b)?;
      let addr = expr::lval_addr(lval, b)?;
      b.push(format!("store {}, {}", value, addr));
    }
    Stmt::Exp(Some(exp)) => {
      expr::generate(exp.as_ref(), b)?;
    }
    Stmt::Exp(None) => {}
    Stmt::Block(block) => generate_block(block, b)?,
    Stmt::If(cond, then, None) => {
      // 入口块封死时整条语句落在不可达区，各分支块随之封死
      let dead = b.is_dead();
      let cond = expr::generate(cond.as_ref(), b)?;
      let entry = b.seal(dead);
      let then_label = b.current_label();
      generate(then, b)?;
      let then_tail = b.seal(dead);
      let end_label = b.current_label();
      b.append_to(entry, format!("br {}, {}, {}", cond, then_label, end_label));
      b.append_to(then_tail, format!("jump {}", end_label));
    }
    Stmt::If(cond, then, Some(other)) => {
      let dead = b.is_dead();
      let cond = expr::generate(cond.as_ref(), b)?;
      let entry = b.seal(dead);
      let then_label = b.current_label();
      generate(then, b)?;
      let then_tail = b.seal(dead);
      let else_label = b.current_label();
      generate(other, b)?;
      let else_tail = b.seal(dead);
      let end_label = b.current_label();
      b.append_to(entry, format!("br {}, {}, {}", cond, then_label, else_label));
      b.append_to(then_tail, format!("jump {}", end_label));
      b.append_to(else_tail, format!("jump {}", end_label));
    }
    Stmt::While(cond, body) => {
      let dead = b.is_dead();
      let entry = b.seal(dead);
      let test_label = b.current_label();
      b.append_to(entry, format!("jump {}", test_label));
      let cond = expr::generate(cond.as_ref(), b)?;
      let test_tail = b.seal(dead);
      let body_label = b.current_label();
      // end 块标号先行预留，break 与条件为假都跳到这里
      let end_label = b.fresh_label();
      b.push_loop(test_label.clone(), end_label.clone());
      generate(body, b)?;
      b.pop_loop();
      let body_tail = b.seal_as(end_label.clone(), dead);
      b.append_to(
        test_tail,
        format!("br {}, {}, {}", cond, body_label, end_label),
      );
      b.append_to(body_tail, format!("jump {}", test_label));
    }
    Stmt::Break => {
      let (_, break_label) = b
        .loop_target()
        .ok_or(CompileError::MisplacedJump("break"))?
        .clone();
      b.push(format!("jump {}", break_label));
      b.seal(true);
    }
    Stmt::Continue => {
      let (continue_label, _) = b
        .loop_target()
        .ok_or(CompileError::MisplacedJump("continue"))?
        .clone();
      b.push(format!("jump {}", continue_label));
      b.seal(true);
    }
    Stmt::Return(exp) => {
      match exp {
        Some(exp) => {
          let value = expr::generate(exp.as_ref(), b)?;
          b.push(format!("ret {}", value));
        }
        None => b.push(if b.ret_int() { "ret 0" } else { "ret" }.to_string()),
      }
      b.seal(true);
    }
  }
  Ok(())
}
