//! Tabular Decoder
//!
//! Turns a delimited text stream (first row = headers) into `RawRow`s,
//! one at a time, in file order. Quoted fields may contain the delimiter,
//! escaped quotes (`""`) and line breaks.
//!
//! A malformed stream yields exactly one `Err` and then the iterator is
//! exhausted. Rows yielded before the error are complete and valid.

use std::io::BufRead;

use super::error::DecodeError;
use crate::models::RawRow;

pub const DEFAULT_DELIMITER: char = ',';

const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    /// Saw `"` inside a quoted field: either an escape or the closing quote
    QuoteInQuoted,
}

pub struct TabularDecoder<R> {
    reader: R,
    delimiter: char,
    headers: Vec<String>,
    /// Physical lines consumed so far
    line: usize,
    done: bool,
}

impl<R: BufRead> TabularDecoder<R> {
    pub fn new(reader: R) -> Result<Self, DecodeError> {
        Self::with_delimiter(reader, DEFAULT_DELIMITER)
    }

    /// Reads the header row eagerly. An empty stream decodes to zero rows.
    pub fn with_delimiter(reader: R, delimiter: char) -> Result<Self, DecodeError> {
        let mut decoder = Self {
            reader,
            delimiter,
            headers: Vec::new(),
            line: 0,
            done: false,
        };

        match decoder.read_record()? {
            Some((_, fields)) => {
                decoder.headers = fields
                    .into_iter()
                    .enumerate()
                    .map(|(i, h)| {
                        let h = if i == 0 { h.trim_start_matches(UTF8_BOM).to_string() } else { h };
                        h.trim().to_string()
                    })
                    .collect();
            }
            None => decoder.done = true,
        }

        Ok(decoder)
    }

    fn read_line(&mut self, buf: &mut String) -> Result<bool, DecodeError> {
        let mut bytes = Vec::new();
        let n = self.reader.read_until(b'\n', &mut bytes)?;
        if n == 0 {
            return Ok(false);
        }
        self.line += 1;
        let text = String::from_utf8(bytes).map_err(|_| DecodeError::Encoding { line: self.line })?;
        buf.push_str(&text);
        Ok(true)
    }

    /// Next logical record with the line it started on. Blank and whitespace-only
    /// lines are skipped.
    fn read_record(&mut self) -> Result<Option<(usize, Vec<String>)>, DecodeError> {
        let mut fields: Vec<String> = Vec::new();
        let mut field = String::new();
        let mut state = FieldState::Start;
        let mut start_line = self.line + 1;
        let mut buf = String::new();

        loop {
            buf.clear();
            if !self.read_line(&mut buf)? {
                // EOF
                return match state {
                    FieldState::Quoted => Err(DecodeError::UnterminatedQuote { line: start_line }),
                    FieldState::Start if fields.is_empty() => Ok(None),
                    FieldState::Unquoted if fields.is_empty() && field.trim().is_empty() => Ok(None),
                    _ => {
                        fields.push(field);
                        Ok(Some((start_line, fields)))
                    }
                };
            }

            let mut chars = buf.chars().peekable();
            while let Some(ch) = chars.next() {
                match state {
                    FieldState::Start => {
                        if ch == '"' {
                            state = FieldState::Quoted;
                        } else if ch == self.delimiter {
                            fields.push(String::new());
                        } else if ch == '\n' {
                            if fields.is_empty() {
                                // Blank line
                                start_line = self.line + 1;
                                continue;
                            }
                            fields.push(std::mem::take(&mut field));
                            return Ok(Some((start_line, fields)));
                        } else if ch != '\r' {
                            field.push(ch);
                            state = FieldState::Unquoted;
                        }
                    }
                    FieldState::Unquoted => {
                        if ch == self.delimiter {
                            fields.push(std::mem::take(&mut field));
                            state = FieldState::Start;
                        } else if ch == '\n' {
                            if fields.is_empty() && field.trim().is_empty() {
                                // Whitespace-only line
                                field.clear();
                                state = FieldState::Start;
                                start_line = self.line + 1;
                                continue;
                            }
                            fields.push(std::mem::take(&mut field));
                            return Ok(Some((start_line, fields)));
                        } else if ch == '"' {
                            if field.trim().is_empty() {
                                // `a, "b"`: padding before an opening quote
                                field.clear();
                                state = FieldState::Quoted;
                            } else {
                                return Err(DecodeError::StrayQuote { line: self.line });
                            }
                        } else if ch != '\r' {
                            field.push(ch);
                        }
                    }
                    FieldState::Quoted => {
                        if ch == '"' {
                            state = FieldState::QuoteInQuoted;
                        } else {
                            field.push(ch);
                        }
                    }
                    FieldState::QuoteInQuoted => {
                        if ch == '"' {
                            field.push('"');
                            state = FieldState::Quoted;
                        } else if ch == self.delimiter {
                            fields.push(std::mem::take(&mut field));
                            state = FieldState::Start;
                        } else if ch == '\n' {
                            fields.push(std::mem::take(&mut field));
                            return Ok(Some((start_line, fields)));
                        } else if ch == '\r' && matches!(chars.peek(), Some('\n') | None) {
                            // CRLF after the closing quote
                        } else {
                            return Err(DecodeError::StrayQuote { line: self.line });
                        }
                    }
                }
            }
        }
    }

    fn next_row(&mut self) -> Result<Option<RawRow>, DecodeError> {
        let Some((line, fields)) = self.read_record()? else {
            return Ok(None);
        };

        if fields.len() != self.headers.len() {
            return Err(DecodeError::ColumnCount {
                line,
                expected: self.headers.len(),
                found: fields.len(),
            });
        }

        Ok(Some(self.headers.iter().cloned().zip(fields).collect()))
    }
}

impl<R: BufRead> Iterator for TabularDecoder<R> {
    type Item = Result<RawRow, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode a whole in-memory file. Fails on the first malformed record.
pub fn decode_all(data: &[u8], delimiter: char) -> Result<Vec<RawRow>, DecodeError> {
    TabularDecoder::with_delimiter(data, delimiter)?.collect()
}
