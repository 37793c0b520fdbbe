//! SysY 抽象语法树。由 LALRPOP 生成的语法分析器构造。

pub type CompUnit = Vec<GlobalItem>;

#[derive(Debug)]
pub enum GlobalItem {
  Decl(Decl),
  Func(FuncDef),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeSpec {
  Int,
  Void,
}

#[derive(Debug)]
pub struct FuncDef {
  pub func_type: TypeSpec,
  pub ident: String,
  pub params: Vec<FuncParam>,
  pub body: Block,
}

/// 函数形参。`dims` 为 `None` 表示整型形参；`Some(v)` 表示数组形参，
/// 其最外层维度省略，`v` 为其余各维长度表达式。
#[derive(Debug)]
pub struct FuncParam {
  pub ident: String,
  pub dims: Option<Vec<Exp>>,
}

pub type Block = Vec<BlockItem>;

#[derive(Debug)]
pub enum BlockItem {
  Decl(Decl),
  Stmt(Stmt),
}

#[derive(Debug)]
pub struct Decl {
  pub is_const: bool,
  pub defs: Vec<DataDef>,
}

#[derive(Debug)]
pub struct DataDef {
  pub ident: String,
  pub dims: Vec<Exp>,
  pub init: Option<InitVal>,
}

#[derive(Debug)]
pub enum InitVal {
  Exp(Box<Exp>),
  List(Vec<InitVal>),
}

#[derive(Debug)]
pub enum Stmt {
  Assign(LVal, Box<Exp>),
  Exp(Option<Box<Exp>>),
  Block(Block),
  If(Box<Exp>, Box<Stmt>, Option<Box<Stmt>>),
  While(Box<Exp>, Box<Stmt>),
  Break,
  Continue,
  Return(Option<Box<Exp>>),
}

#[derive(Debug)]
pub struct LVal {
  pub ident: String,
  pub indices: Vec<Exp>,
}

pub type Exp = LOrExp;

#[derive(Debug)]
pub enum LOrExp {
  And(Box<LAndExp>),
  Or(Box<LOrExp>, Box<LAndExp>),
}

#[derive(Debug)]
pub enum LAndExp {
  BOr(Box<BOrExp>),
  And(Box<LAndExp>, Box<BOrExp>),
}

#[derive(Debug)]
pub enum BOrExp {
  BXor(Box<BXorExp>),
  Or(Box<BOrExp>, Box<BXorExp>),
}

#[derive(Debug)]
pub enum BXorExp {
  BAnd(Box<BAndExp>),
  Xor(Box<BXorExp>, Box<BAndExp>),
}

#[derive(Debug)]
pub enum BAndExp {
  Eq(Box<EqExp>),
  And(Box<BAndExp>, Box<EqExp>),
}

#[derive(Debug)]
pub enum EqExp {
  Rel(Box<RelExp>),
  Eq(Box<EqExp>, EqOp, Box<RelExp>),
}

#[derive(Debug, Clone, Copy)]
pub enum EqOp {
  Equal,
  NotEqual,
}

#[derive(Debug)]
pub enum RelExp {
  Add(Box<AddExp>),
  Rel(Box<RelExp>, RelOp, Box<AddExp>),
}

#[derive(Debug, Clone, Copy)]
pub enum RelOp {
  Less,
  LessEqual,
  Greater,
  GreaterEqual,
}

#[derive(Debug)]
pub enum AddExp {
  Mul(Box<MulExp>),
  Add(Box<AddExp>, AddOp, Box<MulExp>),
}

#[derive(Debug, Clone, Copy)]
pub enum AddOp {
  Plus,
  Minus,
}

#[derive(Debug)]
pub enum MulExp {
  Unary(Box<UnaryExp>),
  Mul(Box<MulExp>, MulOp, Box<UnaryExp>),
}

#[derive(Debug, Clone, Copy)]
pub enum MulOp {
  Multiply,
  Divide,
  Modulo,
}

#[derive(Debug)]
pub enum UnaryExp {
  Primary(PrimaryExp),
  Call(String, Vec<Exp>),
  Op(UnaryOp, Box<UnaryExp>),
}

#[derive(Debug, Clone, Copy)]
pub enum UnaryOp {
  Positive,
  Negative,
  Not,
  BitNot,
}

#[derive(Debug)]
pub enum PrimaryExp {
  Num(i32),
  LVal(LVal),
  Paren(Box<Exp>),
}
