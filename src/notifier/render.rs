//! Framed terminal notices
//!
//! A [`Notice`] is a list of centred lines made of colored segments, drawn
//! inside a rounded box. [`NoticeOutput`] decides where it goes.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use termcolor::{Color, ColorChoice, ColorSpec, NoColor, StandardStream, WriteColor};
use tracing::warn;
use unicode_width::UnicodeWidthStr;

use crate::version::types::UpdateInfo;

/// Horizontal padding inside the frame
const PADDING_X: usize = 3;
/// Indentation of the frame itself
const MARGIN_X: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    text: String,
    color: Option<Color>,
    dimmed: bool,
}

impl Segment {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            dimmed: false,
        }
    }

    fn colored(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
            dimmed: false,
        }
    }

    fn dimmed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            dimmed: true,
        }
    }

    fn is_styled(&self) -> bool {
        self.color.is_some() || self.dimmed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    lines: Vec<Vec<Segment>>,
    border: Color,
}

impl Notice {
    /// "Update available" notice for `update`
    pub fn update_available(update: &UpdateInfo, install_hint: &str) -> Self {
        Self {
            lines: vec![
                vec![
                    Segment::plain("Update available "),
                    Segment::dimmed(update.current.as_str()),
                    Segment::plain(" → "),
                    Segment::colored(update.latest.as_str(), Color::Green),
                ],
                vec![
                    Segment::plain("Run "),
                    Segment::colored(install_hint, Color::Cyan),
                    Segment::plain(" to update"),
                ],
            ],
            border: Color::Yellow,
        }
    }

    /// Caller-provided message, one frame line per text line
    pub fn message(message: &str) -> Self {
        Self {
            lines: message
                .lines()
                .map(|line| vec![Segment::plain(line)])
                .collect(),
            border: Color::Yellow,
        }
    }

    /// Diagnostic shown when the state store is not accessible
    pub fn store_unavailable(package_name: &str, config_dir: &Path) -> Self {
        Self {
            lines: vec![
                vec![Segment::colored(
                    format!(" {} update check failed ", package_name),
                    Color::Yellow,
                )],
                vec![
                    Segment::plain(" Try running with "),
                    Segment::colored("sudo", Color::Cyan),
                    Segment::plain(" or get access "),
                ],
                vec![Segment::plain(" to the local update config store via ")],
                vec![Segment::colored(
                    format!(
                        " sudo chown -R $USER:$(id -gn $USER) {} ",
                        config_dir.display()
                    ),
                    Color::Cyan,
                )],
            ],
            border: Color::White,
        }
    }

    /// Text content without frame or colors
    #[cfg(test)]
    fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().map(|s| s.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Terminal columns taken by `line`
    fn line_width(line: &[Segment]) -> usize {
        line.iter().map(|s| s.text.as_str().width()).sum()
    }

    /// Draw the framed notice, surrounded by blank lines
    pub fn write_to<W: WriteColor>(&self, out: &mut W) -> io::Result<()> {
        let content_width = self
            .lines
            .iter()
            .map(|line| Self::line_width(line))
            .max()
            .unwrap_or(0);
        let inner_width = content_width + 2 * PADDING_X;
        let margin = " ".repeat(MARGIN_X);

        let mut border = ColorSpec::new();
        border.set_fg(Some(self.border));

        writeln!(out)?;
        writeln!(out)?;

        write!(out, "{}", margin)?;
        out.set_color(&border)?;
        write!(out, "╭{}╮", "─".repeat(inner_width))?;
        out.reset()?;
        writeln!(out)?;

        self.write_blank_row(out, &margin, &border, inner_width)?;

        for line in &self.lines {
            let free = content_width - Self::line_width(line);
            let left = free / 2;

            write!(out, "{}", margin)?;
            out.set_color(&border)?;
            write!(out, "│")?;
            out.reset()?;
            write!(out, "{}", " ".repeat(PADDING_X + left))?;

            for segment in line {
                if segment.is_styled() {
                    let mut spec = ColorSpec::new();
                    spec.set_fg(segment.color).set_dimmed(segment.dimmed);
                    out.set_color(&spec)?;
                    write!(out, "{}", segment.text)?;
                    out.reset()?;
                } else {
                    write!(out, "{}", segment.text)?;
                }
            }

            write!(out, "{}", " ".repeat(PADDING_X + free - left))?;
            out.set_color(&border)?;
            write!(out, "│")?;
            out.reset()?;
            writeln!(out)?;
        }

        self.write_blank_row(out, &margin, &border, inner_width)?;

        write!(out, "{}", margin)?;
        out.set_color(&border)?;
        write!(out, "╰{}╯", "─".repeat(inner_width))?;
        out.reset()?;
        writeln!(out)?;
        writeln!(out)?;

        out.flush()
    }

    fn write_blank_row<W: WriteColor>(
        &self,
        out: &mut W,
        margin: &str,
        border: &ColorSpec,
        inner_width: usize,
    ) -> io::Result<()> {
        write!(out, "{}", margin)?;
        out.set_color(border)?;
        write!(out, "│{}│", " ".repeat(inner_width))?;
        out.reset()?;
        writeln!(out)
    }
}

/// In-memory sink collecting rendered notices without colors
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }

    fn append(&self, bytes: &[u8]) {
        if let Ok(mut buffer) = self.0.lock() {
            buffer.extend_from_slice(bytes);
        }
    }
}

/// Where notices are written
#[derive(Debug, Clone)]
pub enum NoticeOutput {
    Stderr(ColorChoice),
    Buffer(SharedBuffer),
}

impl NoticeOutput {
    /// stderr, colored unless `NO_COLOR` is set
    pub fn stderr() -> Self {
        Self::Stderr(resolve_color_choice(std::env::var_os("NO_COLOR").is_some()))
    }

    /// Write `notice` after flushing the host's stdout. Errors are logged only.
    pub fn emit(&self, notice: &Notice) {
        let _ = io::stdout().flush();

        let result = match self {
            NoticeOutput::Stderr(choice) => {
                let mut stream = StandardStream::stderr(*choice);
                notice.write_to(&mut stream)
            }
            NoticeOutput::Buffer(buffer) => {
                let mut plain = NoColor::new(Vec::new());
                let written = notice.write_to(&mut plain);
                buffer.append(&plain.into_inner());
                written
            }
        };

        if let Err(e) = result {
            warn!("Failed to write notice: {}", e);
        }
    }
}

fn resolve_color_choice(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}
