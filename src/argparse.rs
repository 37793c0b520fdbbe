use std::env::Args;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
  Koopa,
  Riscv,
  Perf,
}

#[derive(Debug)]
pub struct ParsedArgs {
  pub mode: Mode,
  pub input: String,
  pub output: Option<String>,
}

pub fn parse(mut args: Args) -> crate::Result<ParsedArgs> {
  let _name = args.next().unwrap();

  let mut mode: Option<Mode> = None;
  let mut input: Option<String> = None;
  let mut output: Option<String> = None;

  let mut pending_output = false;
  let mut set_mode = |m: Mode| -> crate::Result<()> {
    if let Some(mode) = mode {
      Err(format!("duplicate mode: {:#?} and {:#?}", mode, m).into())
    } else {
      mode = Some(m);
      Ok(())
    }
  };

  for i in args {
    if pending_output {
      output = Some(i);
      pending_output = false;
    } else if i.starts_with("-") {
      match i.as_str() {
        "-koopa" => set_mode(Mode::Koopa)?,
        "-riscv" => set_mode(Mode::Riscv)?,
        "-perf" => set_mode(Mode::Perf)?,
        "-o" => pending_output = true,
        _ => return Err(format!("unknown option: {}", i).into()),
      }
    } else if input.is_none() {
      input = Some(i);
    } else {
      return Err(format!("unexpected argument: {}", i).into());
    }
  }
  let mode = mode.ok_or("missing mode")?;
  let input = input.ok_or("missing input")?;
  Ok(ParsedArgs { mode, input, output })
}
