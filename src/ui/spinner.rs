use serde::Deserialize;

const LINE: &[&str] = &["|", "/", "-", "\\"];
const DOTS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const ARROWS: &[&str] = &["←", "↖", "↑", "↗", "→", "↘", "↓", "↙"];

/// Named frame set, selectable from `jobwatch.toml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinnerKind {
    Line,
    #[default]
    Dots,
    Arrows,
}

impl SpinnerKind {
    pub fn frames(self) -> &'static [&'static str] {
        match self {
            SpinnerKind::Line => LINE,
            SpinnerKind::Dots => DOTS,
            SpinnerKind::Arrows => ARROWS,
        }
    }
}

/// Endless cyclic frame source: a fixed array plus a wrapping cursor.
#[derive(Debug, Clone)]
pub struct Spinner {
    frames: &'static [&'static str],
    cursor: usize,
    last: Option<&'static str>,
}

impl Spinner {
    pub fn new(kind: SpinnerKind) -> Self {
        Self {
            frames: kind.frames(),
            cursor: 0,
            last: None,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Frame shown at position `index` of the infinite sequence.
    pub fn frame_at(&self, index: usize) -> &'static str {
        self.frames[index % self.frames.len()]
    }

    /// Returns the current frame and advances the cursor.
    pub fn next_frame(&mut self) -> &'static str {
        let frame = self.frames[self.cursor];
        self.cursor = (self.cursor + 1) % self.frames.len();
        self.last = Some(frame);
        frame
    }

    /// Most recently emitted frame, or the first one before any was emitted.
    pub fn last_frame(&self) -> &'static str {
        self.last.unwrap_or(self.frames[0])
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.last = None;
    }
}
