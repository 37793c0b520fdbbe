pub mod inst;
pub mod reg;

use std::fmt;

use self::inst::Inst;

/// 汇编器指示。`Zero`/`Word` 描述数据段里全局量的初始内容。
#[derive(Debug, Clone)]
pub enum Directive {
  Text,
  Data,
  Globl(String),
  Zero(i32),
  Word(Vec<i32>),
}

impl fmt::Display for Directive {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Directive::Text => write!(f, "  .text"),
      Directive::Data => write!(f, "  .data"),
      Directive::Globl(symbol) => write!(f, "  .globl {}", symbol),
      Directive::Zero(bytes) => write!(f, "  .zero {}", bytes),
      Directive::Word(words) => {
        write!(f, "  .word ")?;
        for (i, word) in words.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", word)?;
        }
        Ok(())
      }
    }
  }
}

#[derive(Debug, Clone)]
pub enum Item {
  Label(String),
  Inst(Inst),
  Directive(Directive),
  Empty,
}

/// 一段汇编，元素保持生成顺序，最后统一打印。
pub struct Riscv(Vec<Item>);

impl Riscv {
  pub fn new() -> Self {
    Self(Vec::new())
  }

  pub fn add_label(&mut self, label: String) {
    self.0.push(Item::Label(label));
  }

  pub fn add_inst(&mut self, inst: Inst) {
    self.0.push(Item::Inst(inst));
  }

  pub fn add_directive(&mut self, directive: Directive) {
    self.0.push(Item::Directive(directive));
  }

  pub fn add_empty(&mut self) {
    self.0.push(Item::Empty);
  }

  pub fn extend(&mut self, other: Riscv) {
    self.0.extend(other.0);
  }
}

impl fmt::Display for Item {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Item::Label(label) => write!(f, "{}:", label),
      Item::Inst(inst) => write!(f, "{}", inst),
      Item::Directive(directive) => write!(f, "{}", directive),
      Item::Empty => Ok(()),
    }
  }
}

impl fmt::Display for Riscv {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for item in &self.0 {
      writeln!(f, "{}", item)?;
    }
    Ok(())
  }
}
