//! 全局量与声明的 IR 生成，以及函数的整体生成入口。

use super::error::CompileError;
use super::expr;
use super::ir::IrBuilder;
use super::stmt;
use super::symbol::{SymbolEntry, SymbolKind};
use crate::ast::*;
use crate::Result;

pub fn generate_program(ast: &CompUnit, b: &mut IrBuilder) -> Result<()> {
  generate_globals(b);
  for item in ast {
    if let GlobalItem::Func(func) = item {
      generate_func(func, b)?;
    }
  }
  Ok(())
}

/// 全局数据按符号表顺序生成。常量标量处处折叠成立即数，不占数据段。
fn generate_globals(b: &mut IrBuilder) {
  let mut lines = Vec::new();
  for sym in b.table.entries().iter().filter(|s| s.is_global()) {
    if !sym.is_array() {
      match sym.kind {
        SymbolKind::Const => {}
        SymbolKind::Var => {
          let init = if sym.init == 0 {
            "zeroinit".to_string()
          } else {
            sym.init.to_string()
          };
          lines.push(format!("global {} = alloc i32, {}", sym.ir_name(), init));
        }
      }
    } else {
      let init = if sym.init_array.iter().all(|&v| v == 0) {
        "zeroinit".to_string()
      } else {
        aggregate(&sym.dims, &sym.init_array)
      };
      lines.push(format!(
        "global {} = alloc {}, {}",
        sym.ir_name(),
        sym.ir_type(),
        init
      ));
    }
  }
  for line in lines {
    b.add_global(line);
  }
}

/// 将展平的初始化值重新嵌套为聚合字面量文本。
fn aggregate(dims: &[i32], flat: &[i32]) -> String {
  if dims.len() <= 1 {
    let items: Vec<_> = flat.iter().map(i32::to_string).collect();
    format!("{{{}}}", items.join(", "))
  } else {
    let chunk = flat.len() / dims[0] as usize;
    let items: Vec<_> = flat
      .chunks(chunk)
      .map(|part| aggregate(&dims[1..], part))
      .collect();
    format!("{{{}}}", items.join(", "))
  }
}

fn generate_func(func: &FuncDef, b: &mut IrBuilder) -> Result<()> {
  b.cursor.enter_function(&func.ident);
  b.cursor.enter_block();

  let mut params = Vec::with_capacity(func.params.len());
  for param in &func.params {
    let sym = b.table.lookup_param(&param.ident, &b.cursor)?;
    params.push(format!("{}: {}", sym.ir_param_name(), sym.ir_type()));
  }
  b.start_func(&func.ident, params.join(", "), func.func_type == TypeSpec::Int);

  // 函数序言：形参落栈，使其和局部变量走同一条取址路径
  for param in &func.params {
    let sym = b.table.lookup_param(&param.ident, &b.cursor)?;
    b.push(format!("{} = alloc {}", sym.ir_name(), sym.ir_type()));
    b.push(format!("store {}, {}", sym.ir_param_name(), sym.ir_name()));
  }

  b.cursor.anti_leave_block();
  stmt::generate_block(&func.body, b)?;
  b.end_func();
  b.cursor.leave_function();
  Ok(())
}

pub fn generate_local(decl: &Decl, b: &mut IrBuilder) -> Result<()> {
  for def in &decl.defs {
    let sym = b.table.lookup(&def.ident, &b.cursor)?;
    if !sym.is_array() {
      match sym.kind {
        // 常量标量只活在符号表里
        SymbolKind::Const => {}
        SymbolKind::Var => {
          b.push(format!("{} = alloc i32", sym.ir_name()));
          match &def.init {
            None => {}
            Some(InitVal::Exp(exp)) => {
              let value = expr::generate(exp.as_ref(), b)?;
              b.push(format!("store {}, {}", value, sym.ir_name()));
            }
            Some(InitVal::List(_)) => {
              Err(CompileError::TypeMismatch("expression", def.ident.clone()))?;
            }
          }
        }
      }
    } else {
      // 局部数组：常量数组也要落栈，以支持运行期下标访问
      b.push(format!("{} = alloc {}", sym.ir_name(), sym.ir_type()));
      if !sym.init_array.is_empty() {
        store_elements(sym, b)?;
      }
    }
  }
  Ok(())
}

/// 按行主序逐元素初始化局部数组。
fn store_elements(sym: &SymbolEntry, b: &mut IrBuilder) -> Result<()> {
  for (linear, value) in sym.init_array.iter().enumerate() {
    let mut indices = Vec::with_capacity(sym.dims.len());
    let mut rest = linear as i32;
    for dim in sym.dims.iter().rev() {
      indices.push(rest % dim);
      rest /= dim;
    }
    indices.reverse();
    let mut ptr = sym.ir_name();
    for index in indices {
      let next = b.fresh_ident();
      b.push(format!("{} = getelemptr {}, {}", next, ptr, index));
      ptr = next;
    }
    b.push(format!("store {}, {}", value, ptr));
  }
  Ok(())
}
