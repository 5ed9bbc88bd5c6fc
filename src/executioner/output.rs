use std::io::Write;

/// Progress sink for a scheduled run.
pub trait Output {
    fn writeln(&mut self, line: &str);
    fn start(&mut self, total: usize);
    fn advance(&mut self, step: usize);
    fn finish(&mut self);
}

#[derive(Debug, Default)]
pub struct NullOutput;

impl Output for NullOutput {
    fn writeln(&mut self, _line: &str) {}
    fn start(&mut self, _total: usize) {}
    fn advance(&mut self, _step: usize) {}
    fn finish(&mut self) {}
}

const BAR_WIDTH: usize = 28;

/// Text progress bar redrawn in place with carriage returns.
pub struct ConsoleOutput<W: Write> {
    out: W,
    total: usize,
    current: usize,
}

impl<W: Write> ConsoleOutput<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            total: 0,
            current: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self) {
        let filled = if self.total == 0 {
            BAR_WIDTH
        } else {
            BAR_WIDTH * self.current / self.total
        };
        let percent = if self.total == 0 {
            100
        } else {
            100 * self.current / self.total
        };
        let bar = format!(
            "{}{}",
            "=".repeat(filled),
            "-".repeat(BAR_WIDTH.saturating_sub(filled))
        );
        // Terminal write failures are not worth aborting a run over.
        let _ = write!(
            self.out,
            "\r {}/{} [{bar}] {percent:>3}%",
            self.current, self.total
        );
        let _ = self.out.flush();
    }
}

impl<W: Write> Output for ConsoleOutput<W> {
    fn writeln(&mut self, line: &str) {
        let _ = writeln!(self.out, "{line}");
    }

    fn start(&mut self, total: usize) {
        self.total = total;
        self.current = 0;
        self.render();
    }

    fn advance(&mut self, step: usize) {
        self.current = (self.current + step).min(self.total);
        self.render();
    }

    fn finish(&mut self) {
        self.current = self.total;
        self.render();
        let _ = writeln!(self.out);
    }
}
