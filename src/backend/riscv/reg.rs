// RV32I 整数寄存器，按 ABI 名排列。

use std::fmt;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reg {
  /// 恒零。
  Zero,
  /// 返回地址。
  Ra,
  /// 栈指针。
  Sp,
  /// 全局指针。
  Gp,
  /// 线程指针。
  Tp,
  /// 临时寄存器。调用者保存。
  T0,
  T1,
  T2,
  /// 帧指针。被调用者保存。
  Fp,
  /// 保存寄存器。被调用者保存。
  S1,
  /// 参数/返回值。调用者保存。
  A0,
  A1,
  /// 参数寄存器。调用者保存。
  A2,
  A3,
  A4,
  A5,
  A6,
  A7,
  /// 保存寄存器。被调用者保存。
  S2,
  S3,
  S4,
  S5,
  S6,
  S7,
  S8,
  S9,
  S10,
  S11,
  /// 临时寄存器。调用者保存。t6 保留给长立即数展开。
  T3,
  T4,
  T5,
  T6,
}

/// 前 8 个参数所用的寄存器。
pub const ARG_REGS: [Reg; 8] = [
  Reg::A0,
  Reg::A1,
  Reg::A2,
  Reg::A3,
  Reg::A4,
  Reg::A5,
  Reg::A6,
  Reg::A7,
];

impl fmt::Display for Reg {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let name = match self {
      Reg::Zero => "zero",
      Reg::Ra => "ra",
      Reg::Sp => "sp",
      Reg::Gp => "gp",
      Reg::Tp => "tp",
      Reg::T0 => "t0",
      Reg::T1 => "t1",
      Reg::T2 => "t2",
      Reg::Fp => "fp",
      Reg::S1 => "s1",
      Reg::A0 => "a0",
      Reg::A1 => "a1",
      Reg::A2 => "a2",
      Reg::A3 => "a3",
      Reg::A4 => "a4",
      Reg::A5 => "a5",
      Reg::A6 => "a6",
      Reg::A7 => "a7",
      Reg::S2 => "s2",
      Reg::S3 => "s3",
      Reg::S4 => "s4",
      Reg::S5 => "s5",
      Reg::S6 => "s6",
      Reg::S7 => "s7",
      Reg::S8 => "s8",
      Reg::S9 => "s9",
      Reg::S10 => "s10",
      Reg::S11 => "s11",
      Reg::T3 => "t3",
      Reg::T4 => "t4",
      Reg::T5 => "t5",
      Reg::T6 => "t6",
    };
    write!(f, "{}", name)
  }
}
