use std::env::args;
use std::fs::{read_to_string, File};
use std::io::{stdout, Write};

use crate::argparse::Mode;

mod argparse;
mod ast;
mod backend;
mod frontend;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn main() {
  if let Err(e) = run() {
    eprintln!("{}", e);
    std::process::exit(1);
  }
}

fn run() -> Result<()> {
  let args = argparse::parse(args())?;

  let input = read_to_string(&args.input)?;
  let ir = frontend::generate_ir(&input)?;

  let mut output: Box<dyn Write> = match &args.output {
    Some(path) => Box::new(File::create(path)?),
    None => Box::new(stdout()),
  };

  match args.mode {
    Mode::Koopa => {
      write!(output, "{}", ir)?;
    }
    Mode::Riscv | Mode::Perf => {
      let driver = koopa::front::Driver::from(ir.as_str());
      let program = driver
        .generate_program()
        .map_err(|e| format!("invalid koopa program: {:?}", e))?;
      let riscv = backend::generate_riscv(&program)?;
      write!(output, "{}", riscv)?;
    }
  }
  Ok(())
}
