//! 指令级代码生成。
//!
//! 约定：操作数进 t0/t1，结果出 t2；地址类操作数（alloc、getelemptr 的
//! 结果、全局量）的槽里存的是指针，访问时二次间接。

use koopa::ir::{BinaryOp, TypeKind, Value, ValueKind};

use super::error::{MissingNameError, UnimplementedError};
use super::from_func::{type_words, GenerateContext};
use super::riscv::inst::Inst;
use super::riscv::reg::{Reg, ARG_REGS};
use crate::Result;

pub fn generate(v: Value, context: &mut GenerateContext) -> Result<()> {
  v.generate(context)
}

trait GenerateAsmDetail {
  fn generate(self, context: &mut GenerateContext) -> Result<()>;
}

impl GenerateAsmDetail for Value {
  fn generate(self, context: &mut GenerateContext) -> Result<()> {
    let slot = context.assign_slot(self);
    let data = context.func_data.dfg().value(self);
    let kind = data.kind().clone();
    let ty = data.ty().clone();
    match kind {
      ValueKind::Alloc(_) => {
        let words = match ty.kind() {
          TypeKind::Pointer(base) => type_words(base),
          _ => Err(MissingNameError("alloc pointee".into()))?,
        };
        let offset = context.alloc_words(words);
        context.push_inst(Inst::Addi(Reg::T0, Reg::Sp, offset));
        context.save_to_slot(slot, Reg::T0);
      }
      ValueKind::Load(load) => {
        context.load_addr_to_reg(load.src(), Reg::T0)?;
        context.push_inst(Inst::Lw(Reg::T0, 0, Reg::T0));
        context.save_to_slot(slot, Reg::T0);
      }
      ValueKind::Store(store) => {
        let mut rs = Reg::T0;
        context.load_value_to_reg(store.value(), &mut rs)?;
        context.load_addr_to_reg(store.dest(), Reg::T1)?;
        context.push_inst(Inst::Sw(rs, 0, Reg::T1));
      }
      ValueKind::GetElemPtr(gep) => {
        let src_ty = context.value_ty(gep.src());
        let stride = match src_ty.kind() {
          TypeKind::Pointer(base) => match base.kind() {
            TypeKind::Array(elem, _) => elem.size() as i32,
            _ => Err(MissingNameError("getelemptr base".into()))?,
          },
          _ => Err(MissingNameError("getelemptr base".into()))?,
        };
        generate_offset(context, slot, gep.src(), gep.index(), stride)?;
      }
      ValueKind::GetPtr(gp) => {
        let src_ty = context.value_ty(gp.src());
        let stride = match src_ty.kind() {
          TypeKind::Pointer(base) => base.size() as i32,
          _ => Err(MissingNameError("getptr base".into()))?,
        };
        generate_offset(context, slot, gp.src(), gp.index(), stride)?;
      }
      ValueKind::Binary(binary) => {
        let mut rs1 = Reg::T0;
        context.load_value_to_reg(binary.lhs(), &mut rs1)?;
        let mut rs2 = Reg::T1;
        context.load_value_to_reg(binary.rhs(), &mut rs2)?;
        let rd = Reg::T2;
        match binary.op() {
          BinaryOp::Eq => {
            context.push_inst(Inst::Sub(rd, rs1, rs2));
            context.push_inst(Inst::Seqz(rd, rd));
          }
          BinaryOp::NotEq => {
            context.push_inst(Inst::Sub(rd, rs1, rs2));
            context.push_inst(Inst::Snez(rd, rd));
          }
          BinaryOp::Lt => {
            context.push_inst(Inst::Slt(rd, rs1, rs2));
          }
          BinaryOp::Gt => {
            context.push_inst(Inst::Slt(rd, rs2, rs1));
          }
          BinaryOp::Le => {
            context.push_inst(Inst::Slt(rd, rs2, rs1));
            context.push_inst(Inst::Xori(rd, rd, 1));
          }
          BinaryOp::Ge => {
            context.push_inst(Inst::Slt(rd, rs1, rs2));
            context.push_inst(Inst::Xori(rd, rd, 1));
          }
          BinaryOp::Add => {
            context.push_inst(Inst::Add(rd, rs1, rs2));
          }
          BinaryOp::Sub => {
            context.push_inst(Inst::Sub(rd, rs1, rs2));
          }
          BinaryOp::Mul => {
            context.push_inst(Inst::Mul(rd, rs1, rs2));
          }
          BinaryOp::Div => {
            context.push_inst(Inst::Div(rd, rs1, rs2));
          }
          BinaryOp::Mod => {
            context.push_inst(Inst::Rem(rd, rs1, rs2));
          }
          BinaryOp::And => {
            context.push_inst(Inst::And(rd, rs1, rs2));
          }
          BinaryOp::Or => {
            context.push_inst(Inst::Or(rd, rs1, rs2));
          }
          BinaryOp::Xor => {
            context.push_inst(Inst::Xor(rd, rs1, rs2));
          }
          BinaryOp::Shl => {
            context.push_inst(Inst::Sll(rd, rs1, rs2));
          }
          BinaryOp::Shr => {
            context.push_inst(Inst::Srl(rd, rs1, rs2));
          }
          BinaryOp::Sar => {
            context.push_inst(Inst::Sra(rd, rs1, rs2));
          }
        }
        context.save_to_slot(slot, rd);
      }
      ValueKind::Branch(branch) => {
        let mut cond = Reg::T0;
        context.load_value_to_reg(branch.cond(), &mut cond)?;
        let true_label = context.get_label(branch.true_bb())?;
        context.push_inst(Inst::Bnez(cond, true_label));
        let false_label = context.get_label(branch.false_bb())?;
        context.push_inst(Inst::J(false_label));
      }
      ValueKind::Jump(jump) => {
        let label = context.get_label(jump.target())?;
        context.push_inst(Inst::J(label));
      }
      ValueKind::Call(call) => {
        let args = call.args();
        for (i, &arg) in args.iter().enumerate().take(8) {
          let mut reg = ARG_REGS[i];
          context.load_value_to_reg(arg, &mut reg)?;
          if reg != ARG_REGS[i] {
            context.push_inst(Inst::Mv(ARG_REGS[i], reg));
          }
        }
        // 多余实参存到调用者栈顶之下，调用前临时下移栈指针
        let extra = args.len().saturating_sub(8) as i32;
        if extra > 0 {
          let adjust = extra * 4;
          for (i, &arg) in args.iter().enumerate().skip(8) {
            let mut reg = Reg::T0;
            context.load_value_to_reg(arg, &mut reg)?;
            context.push_inst(Inst::Sw(reg, -adjust + (i as i32 - 8) * 4, Reg::Sp));
          }
          context.push_inst(Inst::Addi(Reg::Sp, Reg::Sp, -adjust));
          let callee = context
            .func_names
            .get(&call.callee())
            .cloned()
            .ok_or_else(|| MissingNameError("function".into()))?;
          context.push_inst(Inst::Call(callee));
          context.push_inst(Inst::Addi(Reg::Sp, Reg::Sp, adjust));
        } else {
          let callee = context
            .func_names
            .get(&call.callee())
            .cloned()
            .ok_or_else(|| MissingNameError("function".into()))?;
          context.push_inst(Inst::Call(callee));
        }
        if !ty.is_unit() {
          context.save_to_slot(slot, Reg::A0);
        }
      }
      ValueKind::Return(ret) => {
        if let Some(value) = ret.value() {
          let mut rs = Reg::A0;
          context.load_value_to_reg(value, &mut rs)?;
          if rs != Reg::A0 {
            context.push_inst(Inst::Mv(Reg::A0, rs));
          }
        }
        // EPILOGUE
        context.push_inst(Inst::Lw(Reg::Ra, context.frame.ra_offset(), Reg::Sp));
        context.push_inst(Inst::Addi(Reg::Sp, Reg::Sp, context.frame.size));
        context.push_inst(Inst::Ret);
      }
      x => Err(UnimplementedError(Box::from(x)))?,
    }
    Ok(())
  }
}

/// getptr / getelemptr 公共部分：base + index * stride。
fn generate_offset(
  context: &mut GenerateContext,
  slot: i32,
  src: Value,
  index: Value,
  stride: i32,
) -> Result<()> {
  context.load_addr_to_reg(src, Reg::T0)?;
  let mut idx = Reg::T1;
  context.load_value_to_reg(index, &mut idx)?;
  context.push_inst(Inst::Li(Reg::T2, stride));
  context.push_inst(Inst::Mul(Reg::T2, idx, Reg::T2));
  context.push_inst(Inst::Add(Reg::T0, Reg::T0, Reg::T2));
  context.save_to_slot(slot, Reg::T0);
  Ok(())
}
