//! End to end: source -> bytecode -> assembly -> machine words, executed on
//! a small model of the target CPU.

use hackc::assembler::assemble;
use hackc::bytecode::{VmModule, compile_source};
use hackc::translator::{Translator, TranslatorOptions};

const RAM_WORDS: usize = 0x8000;
const JMP_ALWAYS: u16 = 0b1110101010000111;

struct Cpu {
    rom: Vec<u16>,
    ram: Vec<i16>,
    a: i16,
    d: i16,
    pc: usize,
}

impl Cpu {
    fn new(rom: Vec<u16>) -> Self {
        Cpu {
            rom,
            ram: vec![0; RAM_WORDS],
            a: 0,
            d: 0,
            pc: 0,
        }
    }

    fn addr(value: i16) -> usize {
        (value as u16 as usize) & (RAM_WORDS - 1)
    }

    /// `(L) @L 0;JMP`
    fn halted(&self) -> bool {
        self.rom.get(self.pc) == Some(&(self.pc as u16))
            && self.rom.get(self.pc + 1) == Some(&JMP_ALWAYS)
    }

    fn step(&mut self) {
        let ins = self.rom[self.pc];
        if ins & 0x8000 == 0 {
            self.a = ins as i16;
            self.pc += 1;
            return;
        }

        let bit = |n: u16| (ins >> n) & 1 == 1;
        let mut x = self.d;
        let mut y = if bit(12) { self.ram[Cpu::addr(self.a)] } else { self.a };
        if bit(11) {
            x = 0;
        }
        if bit(10) {
            x = !x;
        }
        if bit(9) {
            y = 0;
        }
        if bit(8) {
            y = !y;
        }
        let mut out = if bit(7) { x.wrapping_add(y) } else { x & y };
        if bit(6) {
            out = !out;
        }

        let old_a = self.a;
        if bit(3) {
            self.ram[Cpu::addr(old_a)] = out;
        }
        if bit(5) {
            self.a = out;
        }
        if bit(4) {
            self.d = out;
        }

        let jump = (bit(2) && out < 0) || (bit(1) && out == 0) || (bit(0) && out > 0);
        self.pc = if jump { Cpu::addr(old_a) } else { self.pc + 1 };
    }

    fn run(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            if self.halted() {
                return;
            }
            self.step();
        }
        panic!("program did not halt within {} steps", max_steps);
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Translates text units with bootstrap on, assembles, and runs to the
/// first halt loop.
fn run_units(units: &[(&str, &str)], modules: &[VmModule], entry: &str) -> Cpu {
    init_logging();
    let mut translator = Translator::new(TranslatorOptions {
        bootstrap: true,
        entry: entry.to_string(),
    });
    for module in modules {
        translator.translate_module(module).unwrap();
    }
    for (name, text) in units {
        translator.translate_text(name, text).unwrap();
    }
    let words = assemble(&translator.finish()).unwrap();
    let mut cpu = Cpu::new(words);
    cpu.run(2_000_000);
    cpu
}

fn compile(name: &str, source: &str) -> VmModule {
    compile_source(name, source).unwrap()
}

const SYS_CALLS_MAIN: &str = "\
function Sys.init 0
call Main.main 0
pop temp 0
label HALT
goto HALT
";

const MATH: &str = "
class Math {
    function int multiply(int x, int y) {
        var int sum;
        let sum = 0;
        while (y > 0) {
            let sum = sum + x;
            let y = y - 1;
        }
        return sum;
    }
}";

// ───────────────────────────── Comparisons ──────────────────────────────

fn push_value(v: i16) -> String {
    match v {
        i16::MIN => "push constant 32767\nneg\npush constant 1\nsub\n".to_string(),
        v if v < 0 => format!("push constant {}\nneg\n", -v),
        v => format!("push constant {}\n", v),
    }
}

#[test]
fn test_comparisons_push_one_boolean() {
    let pairs: [(i16, i16); 8] = [
        (0, 0),
        (5, 5),
        (-1, 1),
        (1, -1),
        (-3, -7),
        (i16::MAX, i16::MIN),
        (i16::MIN, i16::MAX),
        (-32767, 2),
    ];
    for (x, y) in pairs {
        for (op, expected) in [("eq", x == y), ("gt", x > y), ("lt", x < y)] {
            let program = format!(
                "function Sys.init 0\n{}{}{}\nlabel HALT\ngoto HALT\n",
                push_value(x),
                push_value(y),
                op
            );
            let cpu = run_units(&[("Sys", program.as_str())], &[], "Sys.init");
            // bootstrap frame ends at 261, plus the one result
            assert_eq!(cpu.ram[0], 262, "{} {} {}", x, op, y);
            assert_eq!(
                cpu.ram[261],
                if expected { -1 } else { 0 },
                "{} {} {}",
                x,
                op,
                y
            );
        }
    }
}

#[test]
fn test_arithmetic_and_logic() {
    let program = "\
function Sys.init 0
push constant 9
push constant 4
sub
pop static 0
push constant 12
push constant 10
and
pop static 1
push constant 12
push constant 3
or
pop static 2
push constant 5
not
pop static 3
push constant 5
neg
pop static 4
label HALT
goto HALT
";
    let cpu = run_units(&[("Sys", program)], &[], "Sys.init");
    assert_eq!(&cpu.ram[16..21], &[5, 8, 15, !5, -5]);
}

// ─────────────────────────── Call and return ────────────────────────────

#[test]
fn test_call_return_restores_frame() {
    let program = "\
function Sys.init 1
push constant 3000
pop pointer 0
push constant 4000
pop pointer 1
push constant 11
push constant 22
call Sys.noop 2
pop static 0
push constant 7
push constant 8
call Sys.add 2
pop static 1
label HALT
goto HALT

function Sys.noop 0
return

function Sys.add 0
push argument 0
push argument 1
add
return
";
    let cpu = run_units(&[("Sys", program)], &[], "Sys.init");
    assert_eq!(cpu.ram[17], 15);
    // SP back at Sys.init's local base + 1 local, all pushes popped
    assert_eq!(cpu.ram[0], 262);
    assert_eq!(cpu.ram[1], 261);
    assert_eq!(cpu.ram[2], 256);
    assert_eq!(cpu.ram[3], 3000);
    assert_eq!(cpu.ram[4], 4000);
}

#[test]
fn test_labels_and_locals() {
    // sum of 1..=10 with a local counter and accumulator
    let program = "\
function Sys.init 2
push constant 10
pop local 0
label LOOP
push local 0
push local 1
add
pop local 1
push local 0
push constant 1
sub
pop local 0
push local 0
if-goto LOOP
push local 1
pop static 0
label HALT
goto HALT
";
    let cpu = run_units(&[("Sys", program)], &[], "Sys.init");
    assert_eq!(cpu.ram[16], 55);
}

// ─────────────────────────── Compiled classes ───────────────────────────

#[test]
fn test_compiled_multiply() {
    let main = compile(
        "Main",
        "class Main {
            static int result;
            function void main() {
                let result = 6 * 7;
                return;
            }
        }",
    );
    let math = compile("Math", MATH);
    let cpu = run_units(&[("Sys", SYS_CALLS_MAIN)], &[main, math], "Sys.init");
    assert_eq!(cpu.ram[16], 42);
}

#[test]
fn test_compiled_recursion() {
    let main = compile(
        "Main",
        "class Main {
            static int result;
            function void main() {
                let result = Main.fib(10);
                return;
            }
            function int fib(int n) {
                if (n < 2) {
                    return n;
                }
                return Main.fib(n - 1) + Main.fib(n - 2);
            }
        }",
    );
    let cpu = run_units(&[("Sys", SYS_CALLS_MAIN)], &[main], "Sys.init");
    assert_eq!(cpu.ram[16], 55);
}

#[test]
fn test_compiled_objects_and_arrays() {
    let main = compile(
        "Main",
        "class Main {
            static int result;
            function void main() {
                var Point p;
                var Array a;
                let p = Point.new(3, 4);
                let a = Memory.alloc(3);
                let a[0] = p.sum();
                let a[1] = 10;
                let a[2] = a[0] * a[1];
                let result = a[2] - 1;
                return;
            }
        }",
    );
    let point = compile(
        "Point",
        "class Point {
            field int x, y;
            constructor Point new(int ax, int ay) {
                let x = ax;
                let y = ay;
                return this;
            }
            method int sum() {
                return x + y;
            }
        }",
    );
    let memory = compile(
        "Memory",
        "class Memory {
            static int free;
            function int alloc(int size) {
                var int block;
                if (free = 0) {
                    let free = 2048;
                }
                let block = free;
                let free = free + size;
                return block;
            }
        }",
    );
    let math = compile("Math", MATH);
    let cpu = run_units(
        &[("Sys", SYS_CALLS_MAIN)],
        &[main, math, memory, point],
        "Sys.init",
    );
    assert_eq!(cpu.ram[16], 69);
    // Point at 2048, the array right after it
    assert_eq!(&cpu.ram[2048..2053], &[3, 4, 7, 10, 70]);
}

#[test]
fn test_binary_image_translates_like_text() {
    let module = compile(
        "Main",
        "class Main {
            static int result;
            function void main() {
                let result = ~(3 > 2) | 8;
                return;
            }
        }",
    );
    let restored = VmModule::from_bytes(&module.to_bytes().unwrap()).unwrap();
    let text = module.to_text();

    let from_image = run_units(&[("Sys", SYS_CALLS_MAIN)], &[restored], "Sys.init");
    let from_text = run_units(
        &[("Main", text.as_str()), ("Sys", SYS_CALLS_MAIN)],
        &[],
        "Sys.init",
    );
    assert_eq!(from_image.ram[16], 8);
    assert_eq!(from_text.ram[16], 8);
}

#[test]
fn test_missing_entry_runs_last_function() {
    let main = compile(
        "Main",
        "class Main {
            static int result;
            function void main() {
                let result = 123;
                return;
            }
        }",
    );
    let cpu = run_units(&[], &[main], "Sys.init");
    assert_eq!(cpu.ram[16], 123);
}

#[test]
fn test_bootstrap_into_main() {
    let main = compile("Main", "class Main { function void main() { return; } }");
    let mut translator = Translator::new(TranslatorOptions {
        bootstrap: true,
        entry: "Main.main".to_string(),
    });
    translator.translate_module(&main).unwrap();
    let asm = translator.finish();

    let init = asm.find("@256\nD=A\n@SP\nM=D").unwrap();
    let call = asm.find("@Main.main\n0;JMP").unwrap();
    let entry = asm.find("(Main.main)").unwrap();
    assert!(init < call && call < entry);

    // Main.main returns into the bootstrap halt loop
    let mut cpu = Cpu::new(assemble(&asm).unwrap());
    cpu.run(10_000);
    assert_eq!(cpu.ram[0], 257);
}
