//! Character-level input over a sequence of named text buffers.
//!
//! The reader presents one buffer at a time as a stream of characters with
//! line/column tracking. Line endings are folded: `\r\n` and a lone `\r`
//! both read as a single `\n`. An embedded NUL in the input is rewritten to
//! a space; the NUL sentinel is reserved for end-of-buffer.

use std::fs;
use std::io;
use std::path::Path;

use crate::position::Position;

/// End-of-buffer sentinel returned by [`SourceReader::advance`].
pub const NUL: char = '\0';

/// Resolves a source name to its text. The default implementation opens a
/// file of that name; embedders can substitute their own resolution.
pub trait SourceLoader {
    fn load(&self, name: &str) -> io::Result<String>;
}

/// Loads sources from the filesystem.
#[derive(Debug, Default)]
pub struct FileLoader;

impl SourceLoader for FileLoader {
    fn load(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(Path::new(name))
    }
}

/// A named buffer: either text supplied up front or a name the loader
/// resolves when the reader reaches it.
#[derive(Debug, Clone)]
pub struct SourceText {
    name: String,
    text: Option<String>,
}

impl SourceText {
    /// A source whose text the loader will resolve by name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "source name must be non-empty");
        SourceText { name, text: None }
    }

    /// A source with its text supplied directly.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "source name must be non-empty");
        SourceText {
            name,
            text: Some(text.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Snapshot of the cursor, for the single-slot save/restore used by
/// preprocessor skipping.
#[derive(Debug, Clone, Copy)]
struct ReaderState {
    current: char,
    position: Position,
    last_position: Position,
    data_index: usize,
    at_end_of_line: bool,
}

/// Streams characters out of the current buffer.
pub struct SourceReader {
    sources: Vec<SourceText>,
    loader: Box<dyn SourceLoader>,
    next_index: usize,
    loaded: bool,
    chars: Vec<char>,
    current: char,
    position: Position,
    last_position: Position,
    data_index: usize,
    at_end_of_line: bool,
    saved: Option<ReaderState>,
    load_errors: Vec<(String, io::Error)>,
}

impl SourceReader {
    pub fn new(sources: Vec<SourceText>) -> Self {
        SourceReader::with_loader(sources, Box::new(FileLoader))
    }

    pub fn with_loader(sources: Vec<SourceText>, loader: Box<dyn SourceLoader>) -> Self {
        SourceReader {
            sources,
            loader,
            next_index: 0,
            loaded: false,
            chars: Vec::new(),
            current: NUL,
            position: Position::start(),
            last_position: Position::start(),
            data_index: 0,
            at_end_of_line: false,
            saved: None,
            load_errors: Vec::new(),
        }
    }

    /// Name of the buffer currently loaded.
    pub fn current_name(&self) -> &str {
        assert!(self.loaded, "no source is loaded");
        self.sources[self.next_index - 1].name()
    }

    pub fn has_source(&self) -> bool {
        self.loaded
    }

    /// I/O failures accumulated while advancing past unloadable buffers.
    /// Taking them clears the list.
    pub fn take_load_errors(&mut self) -> Vec<(String, io::Error)> {
        std::mem::take(&mut self.load_errors)
    }

    /// Character most recently returned by [`advance`](Self::advance).
    pub fn current(&self) -> char {
        self.current
    }

    /// Position of the current character.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Position of the character before the current one; the inclusive end
    /// of a token whose final character has just been stepped past.
    pub fn last_position(&self) -> Position {
        self.last_position
    }

    /// Move to the next buffer, loading its text if necessary. Returns
    /// false when every buffer has been consumed. A buffer that fails to
    /// load is skipped; the error is held for
    /// [`take_load_errors`](Self::take_load_errors).
    pub fn next_source(&mut self) -> bool {
        self.loaded = false;
        while self.next_index < self.sources.len() {
            let entry = &mut self.sources[self.next_index];
            self.next_index += 1;
            let text = match entry.text.take() {
                Some(text) => text,
                None => {
                    let name = entry.name.clone();
                    match self.loader.load(&name) {
                        Ok(text) => text,
                        Err(err) => {
                            self.load_errors.push((name, err));
                            continue;
                        }
                    }
                }
            };
            self.chars = text.chars().collect();
            self.current = NUL;
            self.position = Position::start();
            self.last_position = Position::start();
            self.data_index = 0;
            self.at_end_of_line = false;
            self.saved = None;
            self.loaded = true;
            return true;
        }
        false
    }

    /// True if a buffer is loaded, loading the next one if not.
    pub fn ensure_valid_source(&mut self) -> bool {
        self.loaded || self.next_source()
    }

    /// Return the next character, or [`NUL`] at end-of-buffer.
    ///
    /// A newline is reported at the line it terminates; the line counter
    /// advances on the read after it.
    pub fn advance(&mut self) -> char {
        assert!(self.loaded, "advance called before a source was loaded");
        if self.at_end_of_line {
            self.position.line += 1;
            self.position.column = 0;
            self.at_end_of_line = false;
        }
        self.last_position = self.position;
        if self.data_index >= self.chars.len() {
            self.current = NUL;
            return NUL;
        }
        let mut c = self.chars[self.data_index];
        self.data_index += 1;
        if c == '\r' {
            if self.chars.get(self.data_index) == Some(&'\n') {
                self.data_index += 1;
            }
            c = '\n';
        } else if c == NUL {
            c = ' ';
        }
        self.position.column += 1;
        if c == '\n' {
            self.at_end_of_line = true;
        }
        self.current = c;
        c
    }

    /// Consume whitespace, optionally stopping at newlines. Returns the
    /// first non-consumed character.
    pub fn skip_whitespace(&mut self, skip_newlines: bool) -> char {
        loop {
            let c = self.current;
            if c == '\n' {
                if !skip_newlines {
                    return c;
                }
            } else if c == NUL || !c.is_whitespace() {
                return c;
            }
            self.advance();
        }
    }

    /// Snapshot the cursor. Single slot: saving with a snapshot already
    /// held is a programming error.
    pub fn save_state(&mut self) {
        assert!(self.saved.is_none(), "overlapping reader save");
        self.saved = Some(ReaderState {
            current: self.current,
            position: self.position,
            last_position: self.last_position,
            data_index: self.data_index,
            at_end_of_line: self.at_end_of_line,
        });
    }

    /// Roll the cursor back to the held snapshot.
    pub fn restore_state(&mut self) {
        let state = self.saved.take().expect("restore without a saved state");
        self.current = state.current;
        self.position = state.position;
        self.last_position = state.last_position;
        self.data_index = state.data_index;
        self.at_end_of_line = state.at_end_of_line;
    }

    /// Drop the held snapshot without rolling back.
    pub fn forget_state(&mut self) {
        assert!(self.saved.is_some(), "forget without a saved state");
        self.saved = None;
    }
}
