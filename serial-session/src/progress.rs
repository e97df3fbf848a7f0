use core::fmt::Write;

/// Number of cells in the bar.
const WIDTH: usize = 40;

/// A textual progress bar redrawn in place on a terminal line.
pub struct ProgressBar {
    total: u32,
    percent: Option<u32>,
}

impl ProgressBar {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            percent: None,
        }
    }

    /// Redraw the bar for `done` completed steps.
    ///
    /// # Note
    /// Nothing is written unless the percentage changed since the last redraw.
    pub fn update(&mut self, out: &mut impl Write, done: u32) -> core::fmt::Result {
        let percent = if self.total == 0 {
            100
        } else {
            (done.min(self.total) as u64 * 100 / self.total as u64) as u32
        };
        if self.percent == Some(percent) {
            return Ok(());
        }
        self.percent = Some(percent);

        let filled = percent as usize * WIDTH / 100;
        out.write_str("\r[")?;
        for cell in 0..WIDTH {
            out.write_char(if cell < filled { '#' } else { '-' })?;
        }
        write!(out, "] {percent:3}%")
    }
}
