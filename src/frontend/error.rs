use std::error::Error;
use std::fmt;

/// 前端致命错误。流水线不做恢复：任何错误向上传播到 main 后以非零码退出。
#[derive(Debug)]
pub enum CompileError {
  ParseError(String),
  UndeclaredSymbol(String),
  Redefinition(String),
  NotConstexpr(String),
  DivisionByZero,
  IllegalArrayBound(String, i32),
  AssignToConst(String),
  TypeMismatch(&'static str, String),
  MisplacedJump(&'static str),
}

impl Error for CompileError {}

impl fmt::Display for CompileError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      CompileError::ParseError(msg) => write!(f, "parse error: {}", msg),
      CompileError::UndeclaredSymbol(name) => write!(f, "undeclared symbol: {}", name),
      CompileError::Redefinition(name) => write!(f, "redefinition of {}", name),
      CompileError::NotConstexpr(what) => write!(f, "{} must be a constant expression", what),
      CompileError::DivisionByZero => write!(f, "division by zero in constant expression"),
      CompileError::IllegalArrayBound(name, n) => {
        write!(f, "illegal array bound {} for {}", n, name)
      }
      CompileError::AssignToConst(name) => write!(f, "cannot assign to constant: {}", name),
      CompileError::TypeMismatch(expected, found) => {
        write!(f, "expected {}, found {}", expected, found)
      }
      CompileError::MisplacedJump(kw) => write!(f, "{} outside of loop", kw),
    }
  }
}
