//! 符号表。
//!
//! 整张表在生成 IR 之前一次性建好：遍历 AST，为每个声明记录其所在函数与
//! 作用域路径。查询时从后向前扫描，取作用域路径为当前路径前缀的最近一项，
//! 即可得到正确的遮蔽语义。

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::consteval::{Eval, EvalContext};
use super::error::CompileError;
use crate::ast::*;

/// SysY 运行时库函数：名字、是否 void、IR 声明。
pub static LIBRARY_FUNCS: Lazy<Vec<(&'static str, bool, &'static str)>> = Lazy::new(|| {
  vec![
    ("getint", false, "decl @getint(): i32"),
    ("getch", false, "decl @getch(): i32"),
    ("getarray", false, "decl @getarray(*i32): i32"),
    ("putint", true, "decl @putint(i32)"),
    ("putch", true, "decl @putch(i32)"),
    ("putarray", true, "decl @putarray(i32, *i32)"),
    ("starttime", true, "decl @starttime()"),
    ("stoptime", true, "decl @stoptime()"),
  ]
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SymbolKind {
  Const,
  Var,
}

/// 一条符号表项。`func_name` 为空表示全局符号，此时 `scope_path` 也为空。
#[derive(Debug)]
pub struct SymbolEntry {
  pub ident: String,
  pub kind: SymbolKind,
  pub func_name: String,
  pub scope_path: Vec<i32>,
  /// 各维长度。数组形参首项为 -1，表示省略的最外层维度。
  pub dims: Vec<i32>,
  /// 常量标量的值；全局变量标量的初始值。
  pub init: i32,
  /// 展平后的数组初始化值。空表示没有初始化器。
  pub init_array: Vec<i32>,
  pub is_param: bool,
}

impl SymbolEntry {
  pub fn is_global(&self) -> bool {
    self.func_name.is_empty()
  }

  pub fn is_array(&self) -> bool {
    !self.dims.is_empty()
  }

  /// 是否为退化成指针的数组形参。
  pub fn is_decayed(&self) -> bool {
    self.dims.first() == Some(&-1)
  }

  /// IR 中的变量名：`@` + 标识符（`_` 翻倍转义）+ 作用域路径后缀。
  pub fn ir_name(&self) -> String {
    let mut name = String::from("@");
    name.push_str(&self.ident.replace('_', "__"));
    for n in &self.scope_path {
      name.push('_');
      name.push_str(&n.to_string());
    }
    name
  }

  /// 形参本身的 IR 名。函数序言将其存入以 [`ir_name`] 命名的栈槽。
  ///
  /// [`ir_name`]: SymbolEntry::ir_name
  pub fn ir_param_name(&self) -> String {
    format!("{}_isparam", self.ir_name())
  }

  /// alloc 此符号所需的 IR 类型文本。
  pub fn ir_type(&self) -> String {
    fn nested(dims: &[i32]) -> String {
      match dims.split_first() {
        None => "i32".into(),
        Some((d, rest)) => format!("[{}, {}]", nested(rest), d),
      }
    }
    if self.is_decayed() {
      format!("*{}", nested(&self.dims[1..]))
    } else {
      nested(&self.dims)
    }
  }
}

/// 作用域游标。`path` 是从函数体到当前块的各层块序号；
/// `next_child` 是当前块中下一个子块将要获得的序号。
#[derive(Debug, Default)]
pub struct ScopeCursor {
  pub func_name: String,
  path: Vec<i32>,
  next_child: i32,
}

impl ScopeCursor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn path(&self) -> &[i32] {
    &self.path
  }

  /// 进入函数。兄弟块计数不跨函数延续，每个函数体都从 0 号块开始。
  pub fn enter_function(&mut self, name: &str) {
    self.func_name = name.to_string();
    self.path.clear();
    self.next_child = 0;
  }

  pub fn leave_function(&mut self) {
    self.func_name.clear();
  }

  pub fn enter_block(&mut self) {
    self.path.push(self.next_child);
    self.next_child = 0;
  }

  pub fn leave_block(&mut self) {
    self.next_child = self.path.pop().unwrap() + 1;
  }

  /// 退出块但不消耗块序号：函数体与其形参共用同一层作用域。
  pub fn anti_leave_block(&mut self) {
    self.next_child = self.path.pop().unwrap();
  }
}

pub struct SymbolTable {
  entries: Vec<SymbolEntry>,
  func_ret_void: HashMap<String, bool>,
}

impl SymbolTable {
  pub fn build_from(ast: &CompUnit) -> crate::Result<SymbolTable> {
    let builder = TableBuilder {
      table: SymbolTable {
        entries: Vec::new(),
        func_ret_void: HashMap::new(),
      },
      cursor: ScopeCursor::new(),
    };
    builder.build(ast)
  }

  pub fn entries(&self) -> &[SymbolEntry] {
    &self.entries
  }

  /// 按遮蔽语义解析一次名字引用。
  pub fn lookup(
    &self,
    ident: &str,
    cursor: &ScopeCursor,
  ) -> Result<&SymbolEntry, CompileError> {
    for sym in self.entries.iter().rev() {
      if sym.ident != ident {
        continue;
      }
      if !sym.func_name.is_empty() && sym.func_name != cursor.func_name {
        continue;
      }
      if !cursor.path().starts_with(&sym.scope_path) {
        continue;
      }
      return Ok(sym);
    }
    Err(CompileError::UndeclaredSymbol(ident.into()))
  }

  /// 解析函数序言里的形参符号。形参可能被函数体里的同名声明遮蔽，
  /// 因此不能走 [`lookup`] 的常规路径。
  ///
  /// [`lookup`]: SymbolTable::lookup
  pub fn lookup_param(
    &self,
    ident: &str,
    cursor: &ScopeCursor,
  ) -> Result<&SymbolEntry, CompileError> {
    self
      .entries
      .iter()
      .find(|sym| {
        sym.is_param
          && sym.ident == ident
          && sym.func_name == cursor.func_name
          && sym.scope_path == cursor.path()
      })
      .ok_or_else(|| CompileError::UndeclaredSymbol(ident.into()))
  }

  /// 调用点据此决定生成 `call` 还是 `%t = call`。
  pub fn func_ret_void(&self, name: &str) -> Result<bool, CompileError> {
    self
      .func_ret_void
      .get(name)
      .copied()
      .ok_or_else(|| CompileError::UndeclaredSymbol(name.into()))
  }
}

struct TableBuilder {
  table: SymbolTable,
  cursor: ScopeCursor,
}

impl TableBuilder {
  fn build(mut self, ast: &CompUnit) -> crate::Result<SymbolTable> {
    for (name, is_void, _) in LIBRARY_FUNCS.iter() {
      self.table.func_ret_void.insert(name.to_string(), *is_void);
    }
    for item in ast {
      match item {
        GlobalItem::Decl(decl) => self.visit_decl(decl)?,
        GlobalItem::Func(func) => self.visit_func(func)?,
      }
    }
    Ok(self.table)
  }

  fn visit_func(&mut self, func: &FuncDef) -> crate::Result<()> {
    let is_void = func.func_type == TypeSpec::Void;
    if self
      .table
      .func_ret_void
      .insert(func.ident.clone(), is_void)
      .is_some()
    {
      Err(CompileError::Redefinition(func.ident.clone()))?;
    }
    self.cursor.enter_function(&func.ident);
    self.cursor.enter_block();
    for param in &func.params {
      let dims = match &param.dims {
        None => Vec::new(),
        Some(exps) => {
          let mut dims = vec![-1];
          for exp in exps {
            dims.push(self.eval_dim(&param.ident, exp)?);
          }
          dims
        }
      };
      self.declare(SymbolEntry {
        ident: param.ident.clone(),
        kind: SymbolKind::Var,
        func_name: self.cursor.func_name.clone(),
        scope_path: self.cursor.path().to_vec(),
        dims,
        init: 0,
        init_array: Vec::new(),
        is_param: true,
      })?;
    }
    self.cursor.anti_leave_block();
    self.visit_block(&func.body)?;
    self.cursor.leave_function();
    Ok(())
  }

  fn visit_block(&mut self, block: &Block) -> crate::Result<()> {
    self.cursor.enter_block();
    for item in block {
      match item {
        BlockItem::Decl(decl) => self.visit_decl(decl)?,
        BlockItem::Stmt(stmt) => self.visit_stmt(stmt)?,
      }
    }
    self.cursor.leave_block();
    Ok(())
  }

  // 只有块语句会引入新作用域，其余语句按原样下钻。
  fn visit_stmt(&mut self, stmt: &Stmt) -> crate::Result<()> {
    match stmt {
      Stmt::Block(block) => self.visit_block(block)?,
      Stmt::If(_, then, other) => {
        self.visit_stmt(then)?;
        if let Some(other) = other {
          self.visit_stmt(other)?;
        }
      }
      Stmt::While(_, body) => self.visit_stmt(body)?,
      _ => {}
    }
    Ok(())
  }

  fn visit_decl(&mut self, decl: &Decl) -> crate::Result<()> {
    for def in &decl.defs {
      let mut dims = Vec::with_capacity(def.dims.len());
      for exp in &def.dims {
        dims.push(self.eval_dim(&def.ident, exp)?);
      }
      let ctx = EvalContext {
        table: &self.table,
        cursor: &self.cursor,
      };
      let is_global = self.cursor.path().is_empty();

      let (kind, init, init_array) = if decl.is_const {
        let init = def
          .init
          .as_ref()
          .ok_or_else(|| CompileError::NotConstexpr(def.ident.clone()))?;
        if dims.is_empty() {
          let value = match init {
            InitVal::Exp(exp) => exp
              .eval(&ctx)
              .map_err(|e| e.to_compile_error(&def.ident))?,
            InitVal::List(_) => {
              Err(CompileError::TypeMismatch("expression", def.ident.clone()))?
            }
          };
          (SymbolKind::Const, value, Vec::new())
        } else {
          let flat = super::consteval::flatten_init(&dims, init, &ctx)
            .map_err(|e| e.to_compile_error(&def.ident))?;
          (SymbolKind::Const, 0, flat)
        }
      } else if dims.is_empty() {
        // 全局变量的初始值必须是常量；局部变量的初始值推迟到 IR 生成时求值
        let value = match (&def.init, is_global) {
          (Some(InitVal::Exp(exp)), true) => exp
            .eval(&ctx)
            .map_err(|e| e.to_compile_error(&def.ident))?,
          (Some(InitVal::List(_)), true) => {
            Err(CompileError::TypeMismatch("expression", def.ident.clone()))?
          }
          _ => 0,
        };
        (SymbolKind::Var, value, Vec::new())
      } else {
        // 数组变量的初始化器总是常量，建表时一并展平
        let flat = match &def.init {
          None => Vec::new(),
          Some(init) => super::consteval::flatten_init(&dims, init, &ctx)
            .map_err(|e| e.to_compile_error(&def.ident))?,
        };
        (SymbolKind::Var, 0, flat)
      };

      self.declare(SymbolEntry {
        ident: def.ident.clone(),
        kind,
        func_name: self.cursor.func_name.clone(),
        scope_path: self.cursor.path().to_vec(),
        dims,
        init,
        init_array,
        is_param: false,
      })?;
    }
    Ok(())
  }

  fn declare(&mut self, entry: SymbolEntry) -> Result<(), CompileError> {
    let duplicated = self.table.entries.iter().any(|sym| {
      sym.ident == entry.ident
        && sym.func_name == entry.func_name
        && sym.scope_path == entry.scope_path
    });
    if duplicated {
      return Err(CompileError::Redefinition(entry.ident));
    }
    self.table.entries.push(entry);
    Ok(())
  }

  fn eval_dim(&self, ident: &str, exp: &Exp) -> Result<i32, CompileError> {
    let ctx = EvalContext {
      table: &self.table,
      cursor: &self.cursor,
    };
    let dim = exp.eval(&ctx).map_err(|e| e.to_compile_error(ident))?;
    if dim <= 0 {
      return Err(CompileError::IllegalArrayBound(ident.into(), dim));
    }
    Ok(dim)
  }
}

#[cfg(test)]
mod tests {
  use super::super::parser;
  use super::*;

  fn build(source: &str) -> SymbolTable {
    let ast = parser::CompUnitParser::new().parse(source).unwrap();
    SymbolTable::build_from(&ast).unwrap()
  }

  fn entry<'a>(table: &'a SymbolTable, ident: &str, path: &[i32]) -> &'a SymbolEntry {
    table
      .entries()
      .iter()
      .find(|sym| sym.ident == ident && sym.scope_path == path)
      .unwrap()
  }

  const SOURCE: &str = r#"
    const int N = 4;
    int f(int a, int n[]) {
      int x = N;
      { const int x = 2; }
      return x;
    }
  "#;

  #[test]
  fn entries_carry_scope_paths() {
    let table = build(SOURCE);
    assert_eq!(entry(&table, "N", &[]).init, 4);
    assert!(entry(&table, "a", &[0]).is_param);
    assert_eq!(entry(&table, "n", &[0]).dims, vec![-1]);
    let inner = entry(&table, "x", &[0, 0]);
    assert_eq!(inner.kind, SymbolKind::Const);
    assert_eq!(inner.init, 2);
  }

  #[test]
  fn lookup_prefers_innermost_prefix() {
    let table = build(SOURCE);
    let mut cursor = ScopeCursor::new();
    cursor.func_name = "f".into();
    cursor.enter_block();
    cursor.enter_block();
    assert_eq!(table.lookup("x", &cursor).unwrap().scope_path, vec![0, 0]);
    cursor.leave_block();
    assert_eq!(table.lookup("x", &cursor).unwrap().scope_path, vec![0]);
    assert!(table.lookup("N", &cursor).unwrap().is_global());
    assert!(table.lookup("y", &cursor).is_err());
  }

  #[test]
  fn underscores_are_escaped_in_ir_names() {
    let table = build("int main() { int my_var = 0; return my_var; }");
    let sym = entry(&table, "my_var", &[0]);
    assert_eq!(sym.ir_name(), "@my__var_0");
  }

  #[test]
  fn param_names_and_types() {
    let table = build("int f(int m[][3]) { return m[0][0]; }");
    let sym = entry(&table, "m", &[0]);
    assert_eq!(sym.dims, vec![-1, 3]);
    assert!(sym.is_decayed());
    assert_eq!(sym.ir_type(), "*[i32, 3]");
    assert_eq!(sym.ir_param_name(), "@m_0_isparam");
  }

  #[test]
  fn array_initializers_flatten_row_major() {
    let table = build(
      r#"
      const int a[2][3] = {{1}, {2, 3}};
      int main() { return a[1][1]; }
      "#,
    );
    assert_eq!(entry(&table, "a", &[]).init_array, vec![1, 0, 0, 2, 3, 0]);
  }

  #[test]
  fn sibling_counters_reset_between_functions() {
    let table = build(
      r#"
      int f() { int x = 1; return x; }
      int main() { int x = 2; return x; }
      "#,
    );
    let xs: Vec<_> = table.entries().iter().filter(|s| s.ident == "x").collect();
    assert_eq!(xs.len(), 2);
    assert_eq!(xs[0].func_name, "f");
    assert_eq!(xs[1].func_name, "main");
    for sym in xs {
      assert_eq!(sym.scope_path, vec![0]);
      assert_eq!(sym.ir_name(), "@x_0");
    }
  }

  #[test]
  fn function_return_kinds_are_recorded() {
    let table = build("void g() { return; } int main() { g(); return 0; }");
    assert!(table.func_ret_void("g").unwrap());
    assert!(!table.func_ret_void("main").unwrap());
    assert!(table.func_ret_void("putint").unwrap());
    assert!(table.func_ret_void("nope").is_err());
  }

  #[test]
  fn bad_declarations_are_rejected() {
    let ast = parser::CompUnitParser::new()
      .parse("int main() { int a[0]; return 0; }")
      .unwrap();
    assert!(SymbolTable::build_from(&ast).is_err());

    let ast = parser::CompUnitParser::new()
      .parse("const int b = 1 / 0; int main() { return b; }")
      .unwrap();
    assert!(SymbolTable::build_from(&ast).is_err());

    let ast = parser::CompUnitParser::new()
      .parse("int main() { int x; int x; return 0; }")
      .unwrap();
    assert!(SymbolTable::build_from(&ast).is_err());
  }
}
