pub const DEFAULT_FRAMES_PER_CHAR: u32 = 2;

/// Typewriter dialogue box. Reveals one character every `frames_per_char` ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueBox {
    lines: Vec<String>,
    current_line: usize,
    revealed_chars: usize,
    frames_per_char: u32,
    accumulated_frames: u32,
    is_open: bool,
    finished: bool,
    speaker: Option<String>,
    portrait: Option<String>,
}

/// Borrowed snapshot handed to a renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialogueView<'a> {
    pub text: &'a str,
    pub speaker: Option<&'a str>,
    pub portrait: Option<&'a str>,
    pub line_index: usize,
    pub line_count: usize,
    pub finished: bool,
}

impl Default for DialogueBox {
    fn default() -> Self {
        Self::new(DEFAULT_FRAMES_PER_CHAR)
    }
}

impl DialogueBox {
    pub fn new(frames_per_char: u32) -> Self {
        Self {
            lines: vec![String::new()],
            current_line: 0,
            revealed_chars: 0,
            frames_per_char: frames_per_char.max(1),
            accumulated_frames: 0,
            is_open: false,
            finished: false,
            speaker: None,
            portrait: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// `true` once the current line is fully revealed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_line(&self) -> usize {
        self.current_line
    }

    pub fn revealed_chars(&self) -> usize {
        self.revealed_chars
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn open(&mut self, lines: Vec<String>, speaker: Option<String>, portrait: Option<String>) {
        self.lines = if lines.is_empty() {
            vec![String::new()]
        } else {
            lines
        };
        self.current_line = 0;
        self.revealed_chars = 0;
        self.accumulated_frames = 0;
        self.finished = false;
        self.is_open = true;
        self.speaker = speaker;
        self.portrait = portrait;
    }

    pub fn close(&mut self) {
        self.is_open = false;
        self.speaker = None;
        self.portrait = None;
    }

    pub fn tick(&mut self) {
        if !self.is_open || self.finished {
            return;
        }
        self.accumulated_frames += 1;
        if self.accumulated_frames < self.frames_per_char {
            return;
        }
        self.accumulated_frames = 0;
        let line_len = self.current_line_len();
        self.revealed_chars = (self.revealed_chars + 1).min(line_len);
        if self.revealed_chars >= line_len {
            self.finished = true;
        }
    }

    /// Moves to the next line, or closes the box after the last one.
    pub fn advance_line(&mut self) {
        if self.current_line + 1 < self.lines.len() {
            self.current_line += 1;
            self.revealed_chars = 0;
            self.accumulated_frames = 0;
            self.finished = false;
        } else {
            self.is_open = false;
        }
    }

    pub fn reveal_all(&mut self) {
        self.revealed_chars = self.current_line_len();
        self.finished = true;
    }

    pub fn is_last_line(&self) -> bool {
        self.current_line + 1 == self.lines.len()
    }

    pub fn visible_text(&self) -> &str {
        let line = self
            .lines
            .get(self.current_line)
            .map(String::as_str)
            .unwrap_or("");
        match line.char_indices().nth(self.revealed_chars) {
            Some((byte_index, _)) => &line[..byte_index],
            None => line,
        }
    }

    pub fn view(&self) -> Option<DialogueView<'_>> {
        self.is_open.then(|| DialogueView {
            text: self.visible_text(),
            speaker: self.speaker.as_deref(),
            portrait: self.portrait.as_deref(),
            line_index: self.current_line,
            line_count: self.lines.len(),
            finished: self.finished,
        })
    }

    fn current_line_len(&self) -> usize {
        self.lines
            .get(self.current_line)
            .map_or(0, |line| line.chars().count())
    }
}
