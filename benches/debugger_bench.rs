use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io;
use std::rc::Rc;
use stepwise::debugger::{realign, Instrumentation, PositionOracle, StepTracer};
use stepwise::runtime::output::SharedBuffer;
use stepwise::runtime::{compile_program, Engine};
use stepwise::ui::{Input, Prompt, Renderer, StepView};

const PROGRAM: &str = "\
fn fib(n) {
  if n < 2 {
    return n;
  }
  return fib(n - 1) + fib(n - 2);
}

total = 0;
i = 0;
while i < 10 {
  total = total + fib(i);
  i = i + 1;
}
print(total);
";

struct Discard;

impl Renderer for Discard {
    fn render(&mut self, view: &StepView) -> io::Result<()> {
        black_box(view);
        Ok(())
    }

    fn show_value(&mut self, _repr: &str) -> io::Result<()> {
        Ok(())
    }

    fn show_error(&mut self, _message: &str) -> io::Result<()> {
        Ok(())
    }
}

struct Resume;

impl Prompt for Resume {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Input> {
        Ok(Input::Closed)
    }
}

fn bench_compile_and_realign(c: &mut Criterion) {
    c.bench_function("compile_and_realign", |b| {
        b.iter(|| {
            let mut unit = compile_program(black_box(PROGRAM), "bench.sw").unwrap();
            let oracle = PositionOracle::new();
            black_box(realign(&oracle, &mut unit));
        })
    });
}

fn bench_plain_run(c: &mut Criterion) {
    let unit = Rc::new(compile_program(PROGRAM, "bench.sw").unwrap());

    c.bench_function("run_without_debugger", |b| {
        b.iter(|| {
            let mut engine = Engine::with_output(Box::new(SharedBuffer::new()));
            black_box(engine.run_module(Rc::clone(&unit)).unwrap());
        })
    });
}

fn bench_stepped_run(c: &mut Criterion) {
    let unit = Rc::new(compile_program(PROGRAM, "bench.sw").unwrap());

    c.bench_function("run_stepping_every_instruction", |b| {
        b.iter(|| {
            let oracle = Rc::new(PositionOracle::new());
            let tracer = Rc::new(StepTracer::new(
                Rc::clone(&oracle),
                Box::new(Discard),
                Box::new(Resume),
            ));
            let mut engine = Engine::with_output(Box::new(SharedBuffer::new()));
            let guard = Instrumentation::install(engine.hooks(), oracle, tracer.clone());
            engine.run_module(Rc::clone(&unit)).unwrap();
            guard.restore();
            black_box(tracer.activations());
        })
    });
}

criterion_group!(benches, bench_compile_and_realign, bench_plain_run, bench_stepped_run);
criterion_main!(benches);
