use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub struct UnimplementedError(pub Box<dyn fmt::Debug>);

impl Error for UnimplementedError {}

impl fmt::Display for UnimplementedError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:#?} unimplemented", self.0)
  }
}

/// IR 中缺少预期的名字或映射，多半是输入程序不符合生成约定。
#[derive(Debug)]
pub struct MissingNameError(pub String);

impl Error for MissingNameError {}

impl fmt::Display for MissingNameError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "missing name for {}", self.0)
  }
}
