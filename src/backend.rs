//! RISC-V 后端。输入经 koopa 解析过的 IR 程序，输出 RV32IM 汇编。

mod error;
mod from_func;
mod from_value;
mod riscv;

use std::collections::HashMap;

use koopa::ir::{Function, Program, Type, TypeKind, Value, ValueKind};

use self::error::MissingNameError;
use self::riscv::{Directive, Riscv};
use crate::Result;

fn flatten_initializer(ir: &Program, value: Value) -> Result<Vec<i32>> {
  let mut words = Vec::new();
  match ir.borrow_value(value).kind() {
    ValueKind::Integer(i) => words.push(i.value()),
    ValueKind::ZeroInit(_) => {
      let words_len = match ir.borrow_value(value).ty().kind() {
        TypeKind::Array(..) | TypeKind::Int32 => ir.borrow_value(value).ty().size() / 4,
        _ => 0,
      };
      words.resize(words_len, 0);
    }
    ValueKind::Aggregate(agg) => {
      for &elem in agg.elems() {
        words.extend(flatten_initializer(ir, elem)?);
      }
    }
    _ => Err(MissingNameError("global initializer".into()))?,
  }
  Ok(words)
}

pub fn generate_riscv(ir: &Program) -> Result<Riscv> {
  Type::set_ptr_size(4);

  let mut result = Riscv::new();
  let mut global_names: HashMap<Value, String> = HashMap::new();

  // 全局数据段，按 IR 声明顺序
  for &value in ir.inst_layout() {
    let data = ir.borrow_value(value);
    if let ValueKind::GlobalAlloc(alloc) = data.kind() {
      let name = data
        .name()
        .clone()
        .ok_or_else(|| MissingNameError("global alloc".into()))?;
      let name = name[1..].to_string();
      result.add_directive(Directive::Data);
      result.add_directive(Directive::Globl(name.clone()));
      result.add_label(name.clone());
      let init = alloc.init();
      if matches!(ir.borrow_value(init).kind(), ValueKind::ZeroInit(_)) {
        match data.ty().kind() {
          TypeKind::Pointer(base) => {
            result.add_directive(Directive::Zero(base.size() as i32));
          }
          _ => Err(MissingNameError("global alloc type".into()))?,
        }
      } else {
        result.add_directive(Directive::Word(flatten_initializer(ir, init)?));
      }
      result.add_empty();
      drop(data);
      global_names.insert(value, name);
    }
  }

  let mut func_names: HashMap<Function, String> = HashMap::new();
  for (&func, data) in ir.funcs() {
    func_names.insert(func, data.name()[1..].to_string());
  }

  for (index, &func) in ir.func_layout().iter().enumerate() {
    // 只有声明没有函数体的库函数不参与生成
    if ir.func(func).layout().bbs().iter().next().is_none() {
      continue;
    }
    let asm = from_func::generate(ir, func, index, &func_names, &global_names)?;
    result.extend(asm);
  }

  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::from_func::FrameLayout;

  fn parse(ir: &str) -> koopa::ir::Program {
    koopa::front::Driver::from(ir).generate_program().unwrap()
  }

  fn compile_asm(source: &str) -> String {
    let ir = crate::frontend::generate_ir(source).unwrap();
    let program = parse(&ir);
    super::generate_riscv(&program).unwrap().to_string()
  }

  #[test]
  fn frame_counts_slots_and_array_words() {
    let program = parse(
      r#"
      fun @main(): i32 {
      %0:
        @a = alloc [i32, 10]
        %1 = getelemptr @a, 2
        store 7, %1
        %2 = load %1
        ret %2
      }
      "#,
    );
    let func = program.func_layout()[0];
    let frame = FrameLayout::compute(program.func(func));
    assert_eq!(
      frame,
      FrameLayout {
        slots: 5,
        array_words: 10,
        size: 80,
      }
    );
    assert_eq!(frame.ra_offset(), 76);
    assert_eq!(frame.slot_offset(3), 12);
    assert_eq!(frame.array_offset(0), 20);
    assert_eq!(frame.arg_offset(8), 80);
  }

  #[test]
  fn returns_load_result_into_a0() {
    let asm = compile_asm("int main() { return 11; }");
    assert!(asm.contains("  .globl main"));
    assert!(asm.contains("main:"));
    assert!(asm.contains("  li a0, 11"));
    assert!(asm.contains("  ret"));
  }

  #[test]
  fn globals_go_to_data_section() {
    let asm = compile_asm(
      r#"
      int g = 42;
      int z[4];
      int main() { return g; }
      "#,
    );
    assert!(asm.contains("  .data"));
    assert!(asm.contains("  .globl g"));
    assert!(asm.contains("g:\n  .word 42"));
    assert!(asm.contains("z:\n  .zero 16"));
    assert!(asm.contains("  la t0, g"));
  }

  #[test]
  fn nested_array_access_scales_by_row_stride() {
    let asm = compile_asm(
      r#"
      int main() {
        int a[2][3];
        a[1][2] = 5;
        return a[1][2];
      }
      "#,
    );
    // 外层维度步长 12 字节，两处访问各出现一次
    assert_eq!(asm.matches("  li t2, 12").count(), 2);
    assert_eq!(asm.matches("  li t2, 4").count(), 2);
  }

  #[test]
  fn extra_call_args_spill_below_caller_frame() {
    let asm = compile_asm(
      r#"
      int f(int a, int b, int c, int d, int e, int g, int h, int i, int j) {
        return j;
      }
      int main() { return f(1, 2, 3, 4, 5, 6, 7, 8, 9); }
      "#,
    );
    assert!(asm.contains("  call f"));
    assert!(asm.contains("-4(sp)"));
    assert!(asm.contains("  addi sp, sp, -4"));
    assert!(asm.contains("  addi sp, sp, 4"));
  }

  #[test]
  fn branch_labels_are_function_scoped() {
    let asm = compile_asm(
      r#"
      int main() {
        int i = 0;
        while (i < 3) i = i + 1;
        return i;
      }
      "#,
    );
    assert!(asm.contains("BLOCK_0_"));
    assert!(asm.contains("  bnez "));
    assert!(asm.contains("  j BLOCK_0_"));
  }

  #[test]
  fn library_declarations_emit_no_code() {
    let asm = compile_asm("int main() { putint(0); return 0; }");
    assert!(asm.contains("  call putint"));
    assert!(!asm.contains("putint:"));
  }
}
