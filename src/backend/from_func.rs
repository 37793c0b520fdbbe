//! 函数级代码生成：两遍扫描。
//!
//! 第一遍只统计栈帧需求：每条指令占一个 4 字节结果槽，alloc 另在数组区
//! 占其指向类型的大小。第二遍按布局逐指令选择汇编。值不驻留寄存器，
//! 指令结果算完立即落回自己的槽，使用前再取出。

use std::collections::HashMap;

use koopa::ir::{BasicBlock, Function, FunctionData, Program, Type, TypeKind, Value, ValueKind};

use super::error::MissingNameError;
use super::from_value;
use super::riscv::inst::Inst;
use super::riscv::reg::{Reg, ARG_REGS};
use super::riscv::{Directive, Riscv};
use crate::Result;

/// 类型占用的 4 字节字数。
pub fn type_words(ty: &Type) -> i32 {
  match ty.kind() {
    TypeKind::Array(base, len) => type_words(base) * *len as i32,
    _ => 1,
  }
}

/// 栈帧布局。低地址起依次是指令结果槽、alloc 数组区，`ra` 保存在帧顶。
#[derive(Debug, PartialEq)]
pub struct FrameLayout {
  pub slots: i32,
  pub array_words: i32,
  pub size: i32,
}

impl FrameLayout {
  pub fn compute(func_data: &FunctionData) -> FrameLayout {
    let mut slots = 0;
    let mut array_words = 0;
    for (_, node) in func_data.layout().bbs().iter() {
      for &inst in node.insts().keys() {
        slots += 1;
        let data = func_data.dfg().value(inst);
        if let ValueKind::Alloc(_) = data.kind() {
          if let TypeKind::Pointer(base) = data.ty().kind() {
            array_words += type_words(base);
          }
        }
      }
    }
    // 指令槽 + 数组区 + ra + 对齐余量，凑成 16 字节的倍数
    let size = ((slots + array_words + 2) * 4 + 15) & !15;
    FrameLayout {
      slots,
      array_words,
      size,
    }
  }

  pub fn slot_offset(&self, slot: i32) -> i32 {
    slot * 4
  }

  pub fn array_offset(&self, allocated: i32) -> i32 {
    (self.slots + allocated) * 4
  }

  pub fn ra_offset(&self) -> i32 {
    self.size - 4
  }

  /// 第 `index` 个实参的位置（index >= 8，相对本函数帧底即调用者栈顶）。
  pub fn arg_offset(&self, index: usize) -> i32 {
    self.size + (index as i32 - 8) * 4
  }
}

/// 一次值引用的落点。
pub enum Resolved {
  Imm(i32),
  ArgReg(Reg),
  ArgStack(usize),
  Slot(i32),
  Global(String),
}

pub struct GenerateContext<'a> {
  pub program: &'a Program,
  pub func_data: &'a FunctionData,
  pub frame: FrameLayout,
  pub labels: HashMap<BasicBlock, String>,
  pub func_names: &'a HashMap<Function, String>,
  global_names: &'a HashMap<Value, String>,
  slots: HashMap<Value, i32>,
  next_slot: i32,
  allocated_words: i32,
  pub insts: Vec<Inst>,
}

impl<'a> GenerateContext<'a> {
  pub fn push_inst(&mut self, inst: Inst) {
    self.insts.push(inst);
  }

  /// 为当前指令按出现顺序分配结果槽。
  pub fn assign_slot(&mut self, value: Value) -> i32 {
    let slot = self.next_slot;
    self.next_slot += 1;
    self.slots.insert(value, slot);
    slot
  }

  /// 在数组区划出 `words` 个字，返回区内起始偏移。
  pub fn alloc_words(&mut self, words: i32) -> i32 {
    let offset = self.frame.array_offset(self.allocated_words);
    self.allocated_words += words;
    offset
  }

  pub fn get_label(&self, bb: BasicBlock) -> Result<String> {
    self
      .labels
      .get(&bb)
      .cloned()
      .ok_or_else(|| MissingNameError("basic block".into()).into())
  }

  pub fn value_ty(&self, value: Value) -> Type {
    match self.func_data.dfg().values().get(&value) {
      Some(data) => data.ty().clone(),
      None => self.program.borrow_value(value).ty().clone(),
    }
  }

  fn resolve(&self, value: Value) -> Result<Resolved> {
    let data = match self.func_data.dfg().values().get(&value) {
      Some(data) => data,
      None => {
        let name = self
          .global_names
          .get(&value)
          .cloned()
          .ok_or_else(|| MissingNameError("global value".into()))?;
        return Ok(Resolved::Global(name));
      }
    };
    match data.kind() {
      ValueKind::Integer(i) => Ok(Resolved::Imm(i.value())),
      ValueKind::FuncArgRef(arg) => {
        if arg.index() < 8 {
          Ok(Resolved::ArgReg(ARG_REGS[arg.index()]))
        } else {
          Ok(Resolved::ArgStack(arg.index()))
        }
      }
      _ => {
        let slot = self
          .slots
          .get(&value)
          .copied()
          .ok_or_else(|| MissingNameError("instruction slot".into()))?;
        Ok(Resolved::Slot(slot))
      }
    }
  }

  /// 把值读进寄存器。立即数 0 与寄存器实参直接改用来源寄存器。
  pub fn load_value_to_reg(&mut self, value: Value, reg: &mut Reg) -> Result<()> {
    match self.resolve(value)? {
      Resolved::Imm(0) => *reg = Reg::Zero,
      Resolved::Imm(i) => self.push_inst(Inst::Li(*reg, i)),
      Resolved::ArgReg(arg) => *reg = arg,
      Resolved::ArgStack(index) => {
        self.push_inst(Inst::Lw(*reg, self.frame.arg_offset(index), Reg::Sp));
      }
      Resolved::Slot(slot) => {
        self.push_inst(Inst::Lw(*reg, self.frame.slot_offset(slot), Reg::Sp));
      }
      Resolved::Global(name) => {
        self.push_inst(Inst::La(*reg, name));
        self.push_inst(Inst::Lw(*reg, 0, *reg));
      }
    }
    Ok(())
  }

  /// 把指针值读进寄存器：全局量取符号地址，局部指针从槽里取出。
  pub fn load_addr_to_reg(&mut self, value: Value, reg: Reg) -> Result<()> {
    match self.resolve(value)? {
      Resolved::Global(name) => self.push_inst(Inst::La(reg, name)),
      Resolved::Slot(slot) => {
        self.push_inst(Inst::Lw(reg, self.frame.slot_offset(slot), Reg::Sp));
      }
      _ => Err(MissingNameError("pointer operand".into()))?,
    }
    Ok(())
  }

  pub fn save_to_slot(&mut self, slot: i32, reg: Reg) {
    self.push_inst(Inst::Sw(reg, self.frame.slot_offset(slot), Reg::Sp));
  }
}

pub fn generate(
  program: &Program,
  func: Function,
  func_index: usize,
  func_names: &HashMap<Function, String>,
  global_names: &HashMap<Value, String>,
) -> Result<Riscv> {
  let func_data = program.func(func);
  let func_name = &func_data.name()[1..];
  let frame = FrameLayout::compute(func_data);

  let mut context = GenerateContext {
    program,
    func_data,
    frame,
    labels: HashMap::new(),
    func_names,
    global_names,
    slots: HashMap::new(),
    next_slot: 0,
    allocated_words: 0,
    insts: Vec::new(),
  };

  for (&bb, _) in func_data.layout().bbs() {
    let bb_name = func_data
      .dfg()
      .bb(bb)
      .name()
      .clone()
      .ok_or_else(|| MissingNameError("basic block".into()))?;
    context
      .labels
      .insert(bb, format!("BLOCK_{}_{}", func_index, &bb_name[1..]));
  }

  let mut asm = Riscv::new();
  asm.add_directive(Directive::Text);
  asm.add_directive(Directive::Globl(func_name.to_string()));
  asm.add_label(func_name.to_string());

  // PROLOGUE
  asm.add_inst(Inst::Addi(Reg::Sp, Reg::Sp, -context.frame.size));
  asm.add_inst(Inst::Sw(Reg::Ra, context.frame.ra_offset(), Reg::Sp));

  for (&bb, node) in func_data.layout().bbs() {
    let label = context.get_label(bb)?;
    asm.add_label(label);
    for &inst in node.insts().keys() {
      from_value::generate(inst, &mut context)?;
    }
    for inst in context.insts.drain(..) {
      asm.add_inst(inst);
    }
  }
  asm.add_empty();
  Ok(asm)
}
