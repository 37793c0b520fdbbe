//! 文本 Koopa IR 构造器。
//!
//! 控制流语句在生成时把线性语句序列切分成基本块：`seal` 封存当前块并打开
//! 新块，封口处的终结指令（`br`/`jump`）常常要等目标标号确定后才能补上，
//! 由 `append_to` 回填。封死（dead）的块在输出时被丢弃，由此自然消去
//! `return`/`break`/`continue` 之后的不可达代码。

use std::fmt;

use super::symbol::{ScopeCursor, SymbolTable, LIBRARY_FUNCS};

/// 已封存块的编号，用于终结指令回填。
pub type BlockId = usize;

struct Block {
  label: String,
  dead: bool,
  stmts: Vec<String>,
}

impl Block {
  fn new(label: String, dead: bool) -> Self {
    Block {
      label,
      dead,
      stmts: Vec::new(),
    }
  }

  fn is_terminated(&self) -> bool {
    match self.stmts.last() {
      Some(stmt) => {
        stmt.starts_with("ret") || stmt.starts_with("jump") || stmt.starts_with("br ")
      }
      None => false,
    }
  }
}

struct IrFunction {
  name: String,
  params: String,
  ret: &'static str,
  blocks: Vec<Block>,
}

impl fmt::Display for IrFunction {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    writeln!(f, "fun @{}({}){} {{", self.name, self.params, self.ret)?;
    for block in self.blocks.iter().filter(|b| !b.dead && !b.stmts.is_empty()) {
      writeln!(f, "{}:", block.label)?;
      for stmt in &block.stmts {
        writeln!(f, "  {}", stmt)?;
      }
    }
    writeln!(f, "}}")
  }
}

pub struct IrBuilder<'a> {
  pub table: &'a SymbolTable,
  pub cursor: ScopeCursor,
  temp_counter: i32,
  current: Option<Block>,
  blocks: Vec<Block>,
  func_name: String,
  func_params: String,
  func_ret: &'static str,
  ret_int: bool,
  /// 当前各层循环的 (continue 目标, break 目标)。
  loop_targets: Vec<(String, String)>,
  globals: Vec<String>,
  funcs: Vec<IrFunction>,
}

impl<'a> IrBuilder<'a> {
  pub fn new(table: &'a SymbolTable) -> Self {
    IrBuilder {
      table,
      cursor: ScopeCursor::new(),
      temp_counter: 0,
      current: None,
      blocks: Vec::new(),
      func_name: String::new(),
      func_params: String::new(),
      func_ret: "",
      ret_int: false,
      loop_targets: Vec::new(),
      globals: Vec::new(),
      funcs: Vec::new(),
    }
  }

  /// 分配一个新的临时值名。
  pub fn fresh_ident(&mut self) -> String {
    let id = self.temp_counter;
    self.temp_counter += 1;
    format!("%{}", id)
  }

  /// 分配一个新的块标号。块必须有符号名，纯数字名会被 koopa 的文本
  /// 解析器当作匿名块丢弃；与临时值共用计数器，保证函数内不重名。
  pub fn fresh_label(&mut self) -> String {
    let id = self.temp_counter;
    self.temp_counter += 1;
    format!("%b{}", id)
  }

  pub fn ret_int(&self) -> bool {
    self.ret_int
  }

  pub fn add_global(&mut self, line: String) {
    self.globals.push(line);
  }

  pub fn start_func(&mut self, name: &str, params: String, ret_int: bool) {
    self.temp_counter = 0;
    self.func_name = name.to_string();
    self.func_params = params;
    self.func_ret = if ret_int { ": i32" } else { "" };
    self.ret_int = ret_int;
    let label = self.fresh_label();
    self.current = Some(Block::new(label, false));
  }

  pub fn push(&mut self, stmt: String) {
    self.current.as_mut().expect("no open block").stmts.push(stmt);
  }

  pub fn current_label(&self) -> String {
    self.current.as_ref().expect("no open block").label.clone()
  }

  /// 当前块是否封死。控制流语句据此把不可达性传播给后继块。
  pub fn is_dead(&self) -> bool {
    self.current.as_ref().expect("no open block").dead
  }

  /// 封存当前块，打开一个新标号的块。
  pub fn seal(&mut self, next_dead: bool) -> BlockId {
    let label = self.fresh_label();
    self.seal_as(label, next_dead)
  }

  /// 封存当前块，打开以给定标号命名的块。while 用它接上预留的 end 标号。
  pub fn seal_as(&mut self, label: String, next_dead: bool) -> BlockId {
    let closed = self.current.take().expect("no open block");
    self.blocks.push(closed);
    self.current = Some(Block::new(label, next_dead));
    self.blocks.len() - 1
  }

  /// 向已封存的块回填终结指令。
  pub fn append_to(&mut self, id: BlockId, stmt: String) {
    self.blocks[id].stmts.push(stmt);
  }

  pub fn push_loop(&mut self, continue_label: String, break_label: String) {
    self.loop_targets.push((continue_label, break_label));
  }

  pub fn pop_loop(&mut self) {
    self.loop_targets.pop();
  }

  pub fn loop_target(&self) -> Option<&(String, String)> {
    self.loop_targets.last()
  }

  /// 结束当前函数。活跃且未终结的尾块补默认返回值。
  pub fn end_func(&mut self) {
    let mut last = self.current.take().expect("no open block");
    if !last.dead && !last.is_terminated() {
      last
        .stmts
        .push(if self.ret_int { "ret 0" } else { "ret" }.to_string());
    }
    self.blocks.push(last);
    self.funcs.push(IrFunction {
      name: std::mem::take(&mut self.func_name),
      params: std::mem::take(&mut self.func_params),
      ret: self.func_ret,
      blocks: std::mem::take(&mut self.blocks),
    });
  }
}

impl fmt::Display for IrBuilder<'_> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for (_, _, decl) in LIBRARY_FUNCS.iter() {
      writeln!(f, "{}", decl)?;
    }
    writeln!(f)?;
    for global in &self.globals {
      writeln!(f, "{}", global)?;
    }
    if !self.globals.is_empty() {
      writeln!(f)?;
    }
    for func in &self.funcs {
      writeln!(f, "{}", func)?;
    }
    Ok(())
  }
}
