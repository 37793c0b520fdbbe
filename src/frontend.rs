use lalrpop_util::lalrpop_mod;

use self::error::CompileError;

mod consteval;
mod decl;
mod error;
mod expr;
mod ir;
mod stmt;
mod symbol;

lalrpop_mod!(parser, "/frontend/sysy.rs");

/// 按给定进制解析整型字面量。接受到 `u32::MAX` 为止，按补码落入 i32；
/// 超出 32 位表示范围返回 `None`。
pub(crate) fn parse_int(digits: &str, radix: u32) -> Option<i32> {
  u32::from_str_radix(digits, radix).ok().map(|v| v as i32)
}

/// SysY 源码编译为文本 Koopa IR。
pub fn generate_ir(input: &str) -> crate::Result<String> {
  let ast = parser::CompUnitParser::new()
    .parse(input)
    .map_err(|e| CompileError::ParseError(e.to_string()))?;

  let table = symbol::SymbolTable::build_from(&ast)?;
  let mut builder = ir::IrBuilder::new(&table);
  decl::generate_program(&ast, &mut builder)?;
  Ok(builder.to_string())
}

#[cfg(test)]
mod tests {
  use koopa::ir::{FunctionData, ValueKind};

  fn compile(source: &str) -> String {
    super::generate_ir(source).unwrap()
  }

  fn reparse(ir: &str) -> koopa::ir::Program {
    koopa::front::Driver::from(ir).generate_program().unwrap()
  }

  fn is_terminator(func: &FunctionData, value: koopa::ir::Value) -> bool {
    matches!(
      func.dfg().value(value).kind(),
      ValueKind::Branch(_) | ValueKind::Jump(_) | ValueKind::Return(_)
    )
  }

  #[test]
  fn constant_expressions_fold_to_immediates() {
    let ir = compile(
      r#"
      int main() {
        const int x = 3;
        return x * 3 + 2;
      }
      "#,
    );
    assert!(ir.contains("ret 11"));
    assert!(!ir.contains("= mul"));
    assert!(!ir.contains("= add"));
  }

  #[test]
  fn shadowed_names_get_distinct_slots() {
    let ir = compile(
      r#"
      int main() {
        int x = 1;
        {
          int x = 2;
          x = 3;
        }
        x = 4;
        return x;
      }
      "#,
    );
    assert!(ir.contains("store 3, @x_0_0"));
    assert!(ir.contains("store 4, @x_0"));
  }

  #[test]
  fn code_after_return_is_dropped() {
    let ir = compile(
      r#"
      int main() {
        int x = 0;
        return 1;
        x = 5;
        return x;
      }
      "#,
    );
    assert!(!ir.contains("store 5"));
    reparse(&ir);
  }

  #[test]
  fn branches_after_return_are_dropped() {
    let ir = compile(
      r#"
      int main() {
        return 1;
        if (1) { putint(2); }
        while (1) { putint(3); }
        return 3;
      }
      "#,
    );
    assert!(!ir.contains("call @putint"));
    assert!(!ir.contains("ret 3"));
    reparse(&ir);
  }

  #[test]
  fn reparsed_blocks_keep_their_labels() {
    let ir = compile(
      r#"
      int main() {
        int i = 0;
        while (i < 3) i = i + 1;
        return i;
      }
      "#,
    );
    let program = reparse(&ir);
    for (_, func) in program.funcs() {
      for (&bb, _) in func.layout().bbs() {
        assert!(func.dfg().bb(bb).name().is_some());
      }
    }
  }

  #[test]
  fn every_reachable_block_has_one_terminator() {
    let ir = compile(
      r#"
      int main() {
        int i = 0, s = 0;
        while (i < 10) {
          if (i == 5) {
            i = i + 1;
            continue;
          }
          if (s > 100) break;
          s = s + i;
          i = i + 1;
        }
        if (s < 0) return 0; else return s;
      }
      "#,
    );
    let program = reparse(&ir);
    for (_, func) in program.funcs() {
      for (_, node) in func.layout().bbs() {
        let insts: Vec<_> = node.insts().keys().copied().collect();
        let (last, rest) = insts.split_last().unwrap();
        assert!(is_terminator(func, *last));
        for inst in rest {
          assert!(!is_terminator(func, *inst));
        }
      }
    }
  }

  #[test]
  fn logical_and_short_circuits() {
    let ir = compile(
      r#"
      int f() { return 0; }
      int main() { return f() && f(); }
      "#,
    );
    let first = ir.find("call @f").unwrap();
    let branch = ir.find("br ").unwrap();
    let second = ir.rfind("call @f").unwrap();
    assert!(first < branch && branch < second);
    reparse(&ir);
  }

  #[test]
  fn constant_zero_elides_right_operand() {
    let ir = compile(
      r#"
      int f() { return 1; }
      int main() { return 0 && f(); }
      "#,
    );
    assert!(ir.contains("ret 0"));
    assert!(!ir.contains("call @f"));
  }

  #[test]
  fn local_arrays_alloc_and_index() {
    let ir = compile(
      r#"
      int main() {
        int a[2][3];
        a[1][2] = 5;
        return a[1][2];
      }
      "#,
    );
    assert!(ir.contains("alloc [[i32, 3], 2]"));
    assert!(ir.contains("getelemptr"));
    reparse(&ir);
  }

  #[test]
  fn global_array_initializer_is_padded() {
    let ir = compile(
      r#"
      const int N = 3;
      int g[N] = {1, 2};
      int main() { return g[1]; }
      "#,
    );
    assert!(ir.contains("global @g = alloc [i32, 3], {1, 2, 0}"));
    reparse(&ir);
  }

  #[test]
  fn array_params_decay_to_pointers() {
    let ir = compile(
      r#"
      int sum(int a[], int n) {
        int s = 0, i = 0;
        while (i < n) {
          s = s + a[i];
          i = i + 1;
        }
        return s;
      }
      int main() {
        int a[4] = {1, 2, 3, 4};
        return sum(a, 4);
      }
      "#,
    );
    assert!(ir.contains("fun @sum(@a_0_isparam: *i32, @n_0_isparam: i32): i32"));
    assert!(ir.contains("= getptr"));
    assert!(ir.contains("getelemptr @a_0, 0"));
    reparse(&ir);
  }

  #[test]
  fn const_array_elements_fold_when_indices_are_const() {
    let ir = compile(
      r#"
      int main() {
        const int a[2][2] = {{1, 2}, {3, 4}};
        return a[1][0];
      }
      "#,
    );
    assert!(ir.contains("ret 3"));
    reparse(&ir);
  }

  #[test]
  fn nested_braces_align_to_row_boundaries() {
    let ir = compile(
      r#"
      const int a[2][3] = {{1}, {2, 3}};
      int main() { return a[1][1]; }
      "#,
    );
    assert!(ir.contains("ret 3"));
    reparse(&ir);
  }

  #[test]
  fn void_functions_get_plain_calls_and_default_ret() {
    let ir = compile(
      r#"
      void p(int x) { putint(x); }
      int main() {
        p(3);
        return 0;
      }
      "#,
    );
    assert!(ir.contains("call @putint("));
    assert!(ir.contains("call @p("));
    assert!(!ir.contains("= call @p"));
    reparse(&ir);
  }

  #[test]
  fn library_functions_are_declared() {
    let ir = compile("int main() { return getint(); }");
    assert!(ir.contains("decl @getint(): i32"));
    assert!(ir.contains("= call @getint()"));
    reparse(&ir);
  }

  #[test]
  fn undeclared_symbol_is_rejected() {
    assert!(super::generate_ir("int main() { return y; }").is_err());
  }

  #[test]
  fn break_outside_loop_is_rejected() {
    assert!(super::generate_ir("int main() { break; return 0; }").is_err());
  }

  #[test]
  fn oversized_integer_literal_is_rejected() {
    assert!(super::generate_ir("int main() { return 4294967296; }").is_err());
    assert!(
      super::generate_ir("int main() { return 1234567890123456789012345; }").is_err()
    );
    assert!(super::generate_ir("int main() { return 0xffffffff; }").is_ok());
  }
}
