//! Minimal S-expression reader for KiCad library files.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SExpError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected ')' at offset {0}")]
    UnbalancedClose(usize),
    #[error("trailing input at offset {0}")]
    TrailingInput(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            SExp::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            SExp::Atom(_) => None,
        }
    }

    /// First atom of a list, e.g. `symbol` for `(symbol "R" ...)`.
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }

    /// Direct children that are lists headed by `key`.
    pub fn children<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SExp> + 'a {
        self.as_list()
            .unwrap_or_default()
            .iter()
            .filter(move |child| child.head() == Some(key))
    }

    /// Atom at `index` within a list.
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.as_list()?.get(index)?.as_atom()
    }
}

/// Parse exactly one expression, ignoring surrounding whitespace.
pub fn parse(input: &str) -> Result<SExp, SExpError> {
    let mut reader = Reader {
        src: input.as_bytes(),
        text: input,
        pos: 0,
    };
    let expr = reader.expr()?;
    reader.skip_ws();
    if reader.pos < reader.src.len() {
        return Err(SExpError::TrailingInput(reader.pos));
    }
    Ok(expr)
}

struct Reader<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl Reader<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<SExp, SExpError> {
        self.skip_ws();
        match self.src.get(self.pos) {
            None => Err(SExpError::UnexpectedEof),
            Some(b'(') => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_ws();
                    match self.src.get(self.pos) {
                        None => return Err(SExpError::UnexpectedEof),
                        Some(b')') => {
                            self.pos += 1;
                            return Ok(SExp::List(items));
                        }
                        Some(_) => items.push(self.expr()?),
                    }
                }
            }
            Some(b')') => Err(SExpError::UnbalancedClose(self.pos)),
            Some(b'"') => self.quoted(),
            Some(_) => Ok(self.bare()),
        }
    }

    fn quoted(&mut self) -> Result<SExp, SExpError> {
        self.pos += 1;
        let mut out = String::new();
        let mut start = self.pos;
        while let Some(&b) = self.src.get(self.pos) {
            match b {
                b'"' => {
                    out.push_str(&self.text[start..self.pos]);
                    self.pos += 1;
                    return Ok(SExp::Atom(out));
                }
                b'\\' => {
                    out.push_str(&self.text[start..self.pos]);
                    let escaped = *self.src.get(self.pos + 1).ok_or(SExpError::UnexpectedEof)?;
                    if escaped.is_ascii() {
                        out.push(match escaped {
                            b'n' => '\n',
                            b't' => '\t',
                            other => other as char,
                        });
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                    }
                    start = self.pos;
                }
                _ => self.pos += 1,
            }
        }
        Err(SExpError::UnexpectedEof)
    }

    fn bare(&mut self) -> SExp {
        let start = self.pos;
        while let Some(&b) = self.src.get(self.pos) {
            if b.is_ascii_whitespace() || b == b'(' || b == b')' {
                break;
            }
            self.pos += 1;
        }
        SExp::Atom(self.text[start..self.pos].to_string())
    }
}
