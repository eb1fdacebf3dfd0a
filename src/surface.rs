//! Presentation backends
//!
//! A [`Surface`] receives one composed [`Screen`] per frame. The terminal
//! backend draws it with crossterm; the memory backend keeps it around for
//! headless runs and tests.

use crate::config::Color;
use crate::model::CursorIcon;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, stdout, BufWriter, Stdout, Write};

/// What is visible for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub lines: Vec<String>,
    pub foreground: Color,
    pub background: Color,
    /// Extra line drawn below the content
    pub status: Option<String>,
}

impl Screen {
    /// Non-blank content with surrounding whitespace removed
    pub fn visible_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub trait Surface {
    /// Size in character cells
    fn size(&self) -> io::Result<(u16, u16)>;

    fn present(&mut self, screen: &Screen) -> io::Result<()>;

    fn set_cursor(&mut self, icon: CursorIcon) -> io::Result<()>;
}

/// Full-screen terminal output with mouse reporting
pub struct TerminalSurface {
    buffer: BufWriter<Stdout>,
    cursor: CursorIcon,
}

impl TerminalSurface {
    pub fn new() -> io::Result<Self> {
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture, Hide)?;
        terminal::enable_raw_mode()?;
        execute!(stdout, Clear(ClearType::All))?;

        Ok(TerminalSurface {
            buffer: BufWriter::new(stdout),
            cursor: CursorIcon::Default,
        })
    }

    /// Pointer shape names understood by OSC 22
    fn pointer_name(icon: CursorIcon) -> &'static str {
        match icon {
            CursorIcon::Default => "default",
            CursorIcon::Pointer => "pointer",
        }
    }
}

impl Surface for TerminalSurface {
    fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }

    /// Writes each line at an explicit position so long lines cannot shift
    /// the ones below
    fn present(&mut self, screen: &Screen) -> io::Result<()> {
        queue!(
            self.buffer,
            SetForegroundColor(screen.foreground.into()),
            SetBackgroundColor(screen.background.into())
        )?;
        for (row, line) in screen.lines.iter().enumerate() {
            queue!(
                self.buffer,
                MoveTo(0, row as u16),
                Print(line),
                Clear(ClearType::UntilNewLine)
            )?;
        }
        let next_row = screen.lines.len() as u16;
        queue!(self.buffer, MoveTo(0, next_row), Clear(ClearType::FromCursorDown))?;

        if let Some(status) = &screen.status {
            queue!(self.buffer, ResetColor, MoveTo(0, next_row), Print(status))?;
        }
        queue!(self.buffer, ResetColor)?;
        self.buffer.flush()
    }

    fn set_cursor(&mut self, icon: CursorIcon) -> io::Result<()> {
        if icon == self.cursor {
            return Ok(());
        }
        self.cursor = icon;
        write!(self.buffer, "\x1b]22;{}\x1b\\", Self::pointer_name(icon))?;
        self.buffer.flush()
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = write!(self.buffer, "\x1b]22;{}\x1b\\", Self::pointer_name(CursorIcon::Default));
        let _ = self.buffer.flush();
        let _ = terminal::disable_raw_mode();
        let _ = execute!(stdout(), DisableMouseCapture, Show, LeaveAlternateScreen);
    }
}

/// Keeps the latest screen in memory
#[derive(Debug, Clone)]
pub struct MemorySurface {
    size: (u16, u16),
    last: Option<Screen>,
    presented: u64,
    cursor: CursorIcon,
}

impl MemorySurface {
    pub fn new(cols: u16, rows: u16) -> Self {
        MemorySurface {
            size: (cols, rows),
            last: None,
            presented: 0,
            cursor: CursorIcon::Default,
        }
    }

    pub fn set_size(&mut self, cols: u16, rows: u16) {
        self.size = (cols, rows);
    }

    pub fn last(&self) -> Option<&Screen> {
        self.last.as_ref()
    }

    /// Number of frames presented so far
    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor
    }
}

impl Surface for MemorySurface {
    fn size(&self) -> io::Result<(u16, u16)> {
        Ok(self.size)
    }

    fn present(&mut self, screen: &Screen) -> io::Result<()> {
        self.last = Some(screen.clone());
        self.presented += 1;
        Ok(())
    }

    fn set_cursor(&mut self, icon: CursorIcon) -> io::Result<()> {
        self.cursor = icon;
        Ok(())
    }
}
