use std::collections::{HashMap, HashSet};

use log::{debug, trace, warn};

use crate::bytecode::{ArithmeticOp, Command, Segment, VmModule};
use crate::translator::reader::{check_name, read_commands};
use crate::translator::translate_error::{CommandError, TranslateError};

/// Stack base the bootstrap code installs in `SP`.
pub const STACK_BASE: u16 = 256;

const POINTER_BASE: u16 = 3;
const TEMP_BASE: u16 = 5;
const LARGEST_CONSTANT: u16 = 32767;

/// Caller name for the call the bootstrap code makes.
const BOOTSTRAP_SCOPE: &str = "Bootstrap";

/// Saved-frame registers, in push order.
const FRAME_REGISTERS: [&str; 4] = ["LCL", "ARG", "THIS", "THAT"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorOptions {
    /// Emit `SP=256` and a call to `entry` ahead of all translated code.
    pub bootstrap: bool,
    pub entry: String,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            bootstrap: false,
            entry: "Sys.init".to_string(),
        }
    }
}

/// Lowers bytecode to assembly text, one command at a time.
///
/// One translator handles every unit of a run so that return-label and
/// comparison-label numbering stays unique across the combined output.
/// `static` addresses are keyed by the name of the unit being translated.
///
/// Labels written in the bytecode become `<function>$<label>`. Labels the
/// translator makes up are `<caller>:ret.<callee>.<n>` for return
/// addresses, `CMP:<part>.<n>` for comparisons and `<scope>:halt` for halt
/// loops. Bytecode names may not contain `:`, so the two never meet.
pub struct Translator {
    out: String,
    options: TranslatorOptions,

    file_name: String,
    function_name: String,

    /// Occurrences of each (caller, callee) pair, for return labels.
    return_counts: HashMap<(String, String), usize>,
    compare_count: usize,

    functions: HashSet<String>,
    last_function: Option<String>,
}

impl Translator {
    pub fn new(options: TranslatorOptions) -> Self {
        let mut translator = Translator {
            out: String::new(),
            options,
            file_name: String::new(),
            function_name: String::new(),
            return_counts: HashMap::new(),
            compare_count: 0,
            functions: HashSet::new(),
            last_function: None,
        };
        if translator.options.bootstrap {
            translator.write_bootstrap();
        }
        translator
    }

    /// Translates one unit of bytecode text.
    pub fn translate_text(&mut self, file: &str, text: &str) -> Result<(), TranslateError> {
        let commands = read_commands(file, text)?;
        self.start_unit(file);
        for (line, command) in &commands {
            self.translate_located(file, *line, command)?;
        }
        Ok(())
    }

    /// Translates a compiled module; errors are located by command number.
    pub fn translate_module(&mut self, module: &VmModule) -> Result<(), TranslateError> {
        self.start_unit(&module.name);
        for (i, command) in module.commands.iter().enumerate() {
            self.translate_located(&module.name, i + 1, command)?;
        }
        Ok(())
    }

    fn start_unit(&mut self, file: &str) {
        debug!("translating {}", file);
        self.file_name = file.to_string();
        self.function_name.clear();
    }

    fn translate_located(
        &mut self,
        file: &str,
        line: usize,
        command: &Command,
    ) -> Result<(), TranslateError> {
        self.translate_command(command)
            .map_err(|source| TranslateError {
                file: file.to_string(),
                line,
                source,
            })
    }

    pub fn translate_command(&mut self, command: &Command) -> Result<(), CommandError> {
        trace!("{}: {}", self.file_name, command);
        self.emit(&format!("// {}", command));

        match command {
            Command::Arithmetic(op) => self.write_arithmetic(*op),
            Command::Push(segment, index) => self.write_push(*segment, *index)?,
            Command::Pop(segment, index) => self.write_pop(*segment, *index)?,
            Command::Label(label) => {
                check_name(label)?;
                let label = self.scoped(label);
                self.emit(&format!("({})", label));
            }
            Command::Goto(label) => {
                check_name(label)?;
                let label = self.scoped(label);
                self.emit_all(&[&format!("@{}", label), "0;JMP"]);
            }
            Command::IfGoto(label) => {
                check_name(label)?;
                let label = self.scoped(label);
                self.pop_d();
                self.emit_all(&[&format!("@{}", label), "D;JNE"]);
            }
            Command::Function { name, n_locals } => {
                check_name(name)?;
                self.write_function(name, *n_locals)
            }
            Command::Call { name, n_args } => {
                check_name(name)?;
                self.write_call(name, *n_args)
            }
            Command::Return => self.write_return(),
        }
        Ok(())
    }

    /// Completes the output.
    ///
    /// With bootstrap on and no unit defining the entry function, an entry
    /// shim is appended that calls the last defined function and then halts.
    pub fn finish(mut self) -> String {
        let entry = self.options.entry.clone();
        if self.options.bootstrap && !self.functions.contains(&entry) {
            self.function_name = entry.clone();
            self.emit(&format!("({})", entry));
            match self.last_function.clone() {
                Some(last) => {
                    warn!("no function named {}; calling {} instead", entry, last);
                    self.write_call(&last, 0);
                }
                None => warn!("no function named {} and no functions to call", entry),
            }
            self.write_halt(&format!("{}:shim", entry));
        }
        self.out
    }

    // ──────────────────────────── Emission ──────────────────────────────

    fn emit(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn emit_all(&mut self, lines: &[&str]) {
        for line in lines {
            self.emit(line);
        }
    }

    /// `*SP = D; SP++`
    fn push_d(&mut self) {
        self.emit_all(&["@SP", "A=M", "M=D", "@SP", "M=M+1"]);
    }

    /// `SP--; D = *SP`
    fn pop_d(&mut self) {
        self.emit_all(&["@SP", "AM=M-1", "D=M"]);
    }

    fn scoped(&self, label: &str) -> String {
        let scope = if self.function_name.is_empty() {
            &self.file_name
        } else {
            &self.function_name
        };
        format!("{}${}", scope, label)
    }

    fn write_halt(&mut self, scope: &str) {
        let halt = format!("{}:halt", scope);
        self.emit_all(&[&format!("({})", halt), &format!("@{}", halt), "0;JMP"]);
    }

    fn write_bootstrap(&mut self) {
        self.emit("// bootstrap");
        self.emit_all(&[&format!("@{}", STACK_BASE), "D=A", "@SP", "M=D"]);
        let entry = self.options.entry.clone();
        self.write_call(&entry, 0);
        self.write_halt(BOOTSTRAP_SCOPE);
    }

    // ─────────────────────────── Arithmetic ─────────────────────────────

    fn write_arithmetic(&mut self, op: ArithmeticOp) {
        match op {
            ArithmeticOp::Add => self.write_binary("M=D+M"),
            ArithmeticOp::Sub => self.write_binary("M=M-D"),
            ArithmeticOp::And => self.write_binary("M=D&M"),
            ArithmeticOp::Or => self.write_binary("M=D|M"),
            ArithmeticOp::Neg => self.emit_all(&["@SP", "A=M-1", "M=-M"]),
            ArithmeticOp::Not => self.emit_all(&["@SP", "A=M-1", "M=!M"]),
            ArithmeticOp::Eq => self.write_equal(),
            ArithmeticOp::Gt => self.write_ordering("JGT", true),
            ArithmeticOp::Lt => self.write_ordering("JLT", false),
        }
    }

    /// `y = pop; x = top; top = x op y`
    fn write_binary(&mut self, compute: &str) {
        self.pop_d();
        self.emit_all(&["A=A-1", compute]);
    }

    fn next_compare(&mut self) -> usize {
        let n = self.compare_count;
        self.compare_count += 1;
        n
    }

    /// `x - y` wraps to zero exactly when `x == y`, so no sign handling.
    fn write_equal(&mut self) {
        let n = self.next_compare();
        self.pop_d();
        self.emit_all(&[
            "A=A-1",
            "D=M-D",
            &format!("@CMP:TRUE.{}", n),
            "D;JEQ",
            "D=0",
            &format!("@CMP:END.{}", n),
            "0;JMP",
            &format!("(CMP:TRUE.{})", n),
            "D=-1",
            &format!("(CMP:END.{})", n),
            "@SP",
            "A=M-1",
            "M=D",
        ]);
    }

    /// `gt` / `lt`.
    ///
    /// Operands of different sign are decided by their signs alone, so
    /// `x - y` is only computed when it cannot overflow.
    fn write_ordering(&mut self, jump: &str, greater: bool) {
        let n = self.next_compare();
        let (when_x_nonneg, when_x_neg) = if greater {
            ("D=-1", "D=0")
        } else {
            ("D=0", "D=-1")
        };
        let x_neg = format!("CMP:XNEG.{}", n);
        let same = format!("CMP:SAME.{}", n);
        let is_true = format!("CMP:TRUE.{}", n);
        let end = format!("CMP:END.{}", n);

        // R13 = y, D = x
        self.pop_d();
        self.emit_all(&["@R13", "M=D", "@SP", "A=M-1", "D=M"]);

        self.emit_all(&[&format!("@{}", x_neg), "D;JLT"]);
        // x >= 0
        self.emit_all(&["@R13", "D=M", &format!("@{}", same), "D;JGE"]);
        self.emit_all(&[when_x_nonneg, &format!("@{}", end), "0;JMP"]);
        // x < 0
        self.emit_all(&[&format!("({})", x_neg), "@R13", "D=M", &format!("@{}", same), "D;JLT"]);
        self.emit_all(&[when_x_neg, &format!("@{}", end), "0;JMP"]);

        self.emit_all(&[
            &format!("({})", same),
            "@SP",
            "A=M-1",
            "D=M",
            "@R13",
            "D=D-M",
            &format!("@{}", is_true),
            &format!("D;{}", jump),
            "D=0",
            &format!("@{}", end),
            "0;JMP",
            &format!("({})", is_true),
            "D=-1",
            &format!("({})", end),
            "@SP",
            "A=M-1",
            "M=D",
        ]);
    }

    // ───────────────────────────── Memory ───────────────────────────────

    /// Leaves the address of `segment[index]` in `A`. Clobbers `D` only for
    /// the pointer-based segments.
    fn load_address(&mut self, segment: Segment, index: u16) -> Result<(), CommandError> {
        let base = match segment {
            Segment::Local => "LCL",
            Segment::Argument => "ARG",
            Segment::This => "THIS",
            Segment::That => "THAT",
            Segment::Pointer => {
                check_index(segment, index, 1)?;
                self.emit(&format!("@{}", POINTER_BASE + index));
                return Ok(());
            }
            Segment::Temp => {
                check_index(segment, index, 7)?;
                self.emit(&format!("@{}", TEMP_BASE + index));
                return Ok(());
            }
            Segment::Static => {
                self.emit(&format!("@{}.{}", self.file_name, index));
                return Ok(());
            }
            Segment::Constant => return Err(CommandError::PopConstant),
        };
        check_index(segment, index, LARGEST_CONSTANT)?;
        self.emit_all(&[&format!("@{}", index), "D=A", &format!("@{}", base), "A=D+M"]);
        Ok(())
    }

    fn write_push(&mut self, segment: Segment, index: u16) -> Result<(), CommandError> {
        if segment == Segment::Constant {
            check_index(segment, index, LARGEST_CONSTANT)?;
            self.emit_all(&[&format!("@{}", index), "D=A"]);
        } else {
            self.load_address(segment, index)?;
            self.emit("D=M");
        }
        self.push_d();
        Ok(())
    }

    fn write_pop(&mut self, segment: Segment, index: u16) -> Result<(), CommandError> {
        match segment {
            Segment::Constant => return Err(CommandError::PopConstant),
            Segment::Pointer | Segment::Temp | Segment::Static => {
                self.pop_d();
                self.load_address(segment, index)?;
                self.emit("M=D");
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                // The address needs D, so it is parked in R13 first.
                self.load_address(segment, index)?;
                self.emit_all(&["D=A", "@R13", "M=D"]);
                self.pop_d();
                self.emit_all(&["@R13", "A=M", "M=D"]);
            }
        }
        Ok(())
    }

    // ─────────────────────────── Functions ──────────────────────────────

    fn write_function(&mut self, name: &str, n_locals: u16) {
        self.function_name = name.to_string();
        self.functions.insert(name.to_string());
        self.last_function = Some(name.to_string());

        self.emit(&format!("({})", name));
        for _ in 0..n_locals {
            self.emit_all(&["@SP", "A=M", "M=0", "@SP", "M=M+1"]);
        }
    }

    fn write_call(&mut self, callee: &str, n_args: u16) {
        let caller = if self.function_name.is_empty() {
            BOOTSTRAP_SCOPE.to_string()
        } else {
            self.function_name.clone()
        };
        let count = self
            .return_counts
            .entry((caller.clone(), callee.to_string()))
            .or_insert(0);
        let return_label = format!("{}:ret.{}.{}", caller, callee, count);
        *count += 1;

        self.emit_all(&[&format!("@{}", return_label), "D=A"]);
        self.push_d();
        for register in FRAME_REGISTERS {
            self.emit_all(&[&format!("@{}", register), "D=M"]);
            self.push_d();
        }

        // ARG = SP - n_args - 5
        self.emit_all(&[
            "@SP",
            "D=M",
            &format!("@{}", u32::from(n_args) + 5),
            "D=D-A",
            "@ARG",
            "M=D",
        ]);
        // LCL = SP
        self.emit_all(&["@SP", "D=M", "@LCL", "M=D"]);

        self.emit_all(&[&format!("@{}", callee), "0;JMP"]);
        self.emit(&format!("({})", return_label));
    }

    fn write_return(&mut self) {
        // R13 = FRAME = LCL, R14 = return address = *(FRAME - 5)
        self.emit_all(&["@LCL", "D=M", "@R13", "M=D"]);
        self.emit_all(&["@5", "A=D-A", "D=M", "@R14", "M=D"]);

        // *ARG = pop, SP = ARG + 1
        self.pop_d();
        self.emit_all(&["@ARG", "A=M", "M=D"]);
        self.emit_all(&["@ARG", "D=M+1", "@SP", "M=D"]);

        // THAT, THIS, ARG, LCL = *(FRAME - 1), ..., *(FRAME - 4)
        for register in FRAME_REGISTERS.iter().rev() {
            self.emit_all(&["@R13", "AM=M-1", "D=M", &format!("@{}", register), "M=D"]);
        }

        self.emit_all(&["@R14", "A=M", "0;JMP"]);
    }
}

fn check_index(segment: Segment, index: u16, largest: u16) -> Result<(), CommandError> {
    if index > largest {
        Err(CommandError::IndexOutOfRange { segment, index })
    } else {
        Ok(())
    }
}

/// Translates a set of bytecode text units into one assembly program.
pub fn translate_units(
    units: &[(String, String)],
    options: TranslatorOptions,
) -> Result<String, TranslateError> {
    let mut translator = Translator::new(options);
    for (name, text) in units {
        translator.translate_text(name, text)?;
    }
    Ok(translator.finish())
}
