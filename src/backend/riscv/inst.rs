// 指令表只覆盖指令选择实际会产出的子集。
// 访存偏移与立即数超出 12 位范围时，借 t6 展开为多条指令。

use std::fmt;

use super::reg::Reg;

#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
  /// `bnez rs, label`：`rs` 非零则跳转。
  Bnez(Reg, String),
  /// `j label`：无条件跳转。
  J(String),
  /// `call label`：保存返回地址并跳转。
  Call(String),
  /// `ret`：跳转回 `ra`。
  Ret,
  /// `lw rd, imm12(rs)`
  Lw(Reg, i32, Reg),
  /// `sw rs2, imm12(rs1)`
  Sw(Reg, i32, Reg),
  Add(Reg, Reg, Reg),
  Addi(Reg, Reg, i32),
  Sub(Reg, Reg, Reg),
  /// `slt rd, rs1, rs2`：rs1 < rs2 置 1。
  Slt(Reg, Reg, Reg),
  /// `seqz rd, rs`：rs == 0 置 1。
  Seqz(Reg, Reg),
  /// `snez rd, rs`：rs != 0 置 1。
  Snez(Reg, Reg),
  Xor(Reg, Reg, Reg),
  Xori(Reg, Reg, i32),
  Or(Reg, Reg, Reg),
  And(Reg, Reg, Reg),
  Sll(Reg, Reg, Reg),
  Srl(Reg, Reg, Reg),
  Sra(Reg, Reg, Reg),
  Mul(Reg, Reg, Reg),
  Div(Reg, Reg, Reg),
  Rem(Reg, Reg, Reg),
  /// `li rd, imm`
  Li(Reg, i32),
  /// `la rd, label`：加载符号地址。
  La(Reg, String),
  /// `mv rd, rs`
  Mv(Reg, Reg),
}

fn fmt_reg2(name: &str, reg1: Reg, reg2: Reg) -> String {
  format!("  {} {}, {}", name, reg1, reg2)
}

fn fmt_reg3(name: &str, reg1: Reg, reg2: Reg, reg3: Reg) -> String {
  format!("  {} {}, {}, {}", name, reg1, reg2, reg3)
}

fn fmt_reg2_offset(name: &str, reg1: Reg, reg2: Reg, offset: i32) -> String {
  if offset < -2048 || offset > 2047 {
    format!(
      "  li t6, {}\n  add t6, t6, {}\n  {} {}, 0(t6)",
      offset, reg2, name, reg1
    )
  } else {
    format!("  {} {}, {}({})", name, reg1, offset, reg2)
  }
}

fn fmt_reg2_imm(name: &str, reg1: Reg, reg2: Reg, imm: i32) -> String {
  if imm < -2048 || imm > 2047 {
    let len = name.len();
    format!(
      "  li t6, {}\n  {} {}, {}, t6",
      imm,
      &name[..len - 1],
      reg1,
      reg2
    )
  } else {
    format!("  {} {}, {}, {}", name, reg1, reg2, imm)
  }
}

fn fmt_reg_label(name: &str, reg: Reg, label: &String) -> String {
  format!("  {} {}, {}", name, reg, label)
}

fn fmt_label(name: &str, label: &String) -> String {
  format!("  {} {}", name, label)
}

fn fmt_reg_imm(name: &str, reg: Reg, imm: i32) -> String {
  format!("  {} {}, {}", name, reg, imm)
}

impl fmt::Display for Inst {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let inst = match self {
      Inst::Bnez(rs, label) => fmt_reg_label("bnez", *rs, label),
      Inst::J(label) => fmt_label("j", label),
      Inst::Call(label) => fmt_label("call", label),
      Inst::Ret => "  ret".into(),
      Inst::Lw(rd, offset, rs) => fmt_reg2_offset("lw", *rd, *rs, *offset),
      Inst::Sw(rs2, offset, rs1) => fmt_reg2_offset("sw", *rs2, *rs1, *offset),
      Inst::Add(rd, rs1, rs2) => fmt_reg3("add", *rd, *rs1, *rs2),
      Inst::Addi(rd, rs, imm) => fmt_reg2_imm("addi", *rd, *rs, *imm),
      Inst::Sub(rd, rs1, rs2) => fmt_reg3("sub", *rd, *rs1, *rs2),
      Inst::Slt(rd, rs1, rs2) => fmt_reg3("slt", *rd, *rs1, *rs2),
      Inst::Seqz(rd, rs) => fmt_reg2("seqz", *rd, *rs),
      Inst::Snez(rd, rs) => fmt_reg2("snez", *rd, *rs),
      Inst::Xor(rd, rs1, rs2) => fmt_reg3("xor", *rd, *rs1, *rs2),
      Inst::Xori(rd, rs, imm) => fmt_reg2_imm("xori", *rd, *rs, *imm),
      Inst::Or(rd, rs1, rs2) => fmt_reg3("or", *rd, *rs1, *rs2),
      Inst::And(rd, rs1, rs2) => fmt_reg3("and", *rd, *rs1, *rs2),
      Inst::Sll(rd, rs1, rs2) => fmt_reg3("sll", *rd, *rs1, *rs2),
      Inst::Srl(rd, rs1, rs2) => fmt_reg3("srl", *rd, *rs1, *rs2),
      Inst::Sra(rd, rs1, rs2) => fmt_reg3("sra", *rd, *rs1, *rs2),
      Inst::Mul(rd, rs1, rs2) => fmt_reg3("mul", *rd, *rs1, *rs2),
      Inst::Div(rd, rs1, rs2) => fmt_reg3("div", *rd, *rs1, *rs2),
      Inst::Rem(rd, rs1, rs2) => fmt_reg3("rem", *rd, *rs1, *rs2),
      Inst::Li(rd, imm) => fmt_reg_imm("li", *rd, *imm),
      Inst::La(rd, label) => fmt_reg_label("la", *rd, label),
      Inst::Mv(rd, rs) => fmt_reg2("mv", *rd, *rs),
    };
    write!(f, "{}", inst)
  }
}
