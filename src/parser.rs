use crate::ast::{Row, Table};

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} (line {line}, column {column})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("expected one of {expected:?}, found {found:?}")]
    ExpectedChars { expected: Vec<char>, found: char },
    #[error("unexpected end of input inside a quoted field")]
    UnexpectedEof,
}

/// Reads comma separated text into a [`Table`]. The first non-blank line is
/// the header. Quoted fields may contain separators, newlines and `""`.
#[derive(Debug, Clone)]
pub struct Parser {
    source: Vec<char>,

    start: usize,
    current: usize,

    line: usize,
    column: usize,
}

impl Parser {
    pub fn new(source: Vec<char>) -> Self {
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn parse_table(&mut self) -> Result<Table> {
        if self.peek() == Some('\u{feff}') {
            self.advance();
            self.clear();
        }

        let mut records: Vec<Row> = Vec::new();
        while self.peek().is_some() {
            if self.skip_line_break() {
                continue;
            }
            records.push(self.parse_record()?);
        }

        let mut records = records.into_iter();
        let header = records.next().map(|row| row.cells).unwrap_or_default();

        Ok(Table {
            header,
            rows: records.collect(),
        })
    }

    fn parse_record(&mut self) -> Result<Row> {
        let mut cells = Vec::new();

        loop {
            cells.push(self.parse_field()?);

            match self.peek() {
                Some(',') => {
                    self.advance();
                    self.clear();
                }
                Some('\n' | '\r') => {
                    self.skip_line_break();
                    break;
                }
                None => break,
                Some(c) => {
                    return Err(self.make_error(ParseErrorKind::ExpectedChars {
                        expected: vec![',', '\n'],
                        found: c,
                    }))
                }
            }
        }

        Ok(Row::new(cells))
    }

    fn parse_field(&mut self) -> Result<String> {
        if self.peek() == Some('"') {
            return self.parse_quoted();
        }

        while let Some(c) = self.peek() {
            if matches!(c, ',' | '\n' | '\r') {
                break;
            }
            self.advance();
        }

        Ok(self.collect().unwrap_or_default())
    }

    fn parse_quoted(&mut self) -> Result<String> {
        self.expect_char('"')?;
        self.clear();

        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') if self.peek() == Some('"') => {
                    self.advance();
                    value.push('"');
                }
                Some('"') => break,
                Some(c) => value.push(c),
                None => return Err(self.make_error(ParseErrorKind::UnexpectedEof)),
            }
        }

        self.clear();
        Ok(value)
    }

    #[must_use]
    fn make_error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.line, self.column)
    }

    fn expect_char(&mut self, c: char) -> Result<()> {
        match self.peek() {
            Some(found) if found == c => {
                self.advance();
                Ok(())
            }
            Some(found) => Err(self.make_error(ParseErrorKind::ExpectedChars {
                expected: vec![c],
                found,
            })),
            None => Err(self.make_error(ParseErrorKind::UnexpectedEof)),
        }
    }

    /// Consumes one `\n`, `\r` or `\r\n`. Returns whether anything was consumed.
    fn skip_line_break(&mut self) -> bool {
        let consumed = match self.peek() {
            Some('\r') => {
                self.advance();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                true
            }
            Some('\n') => {
                self.advance();
                true
            }
            _ => false,
        };

        self.clear();
        consumed
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.source.get(self.current);
        self.current += 1;

        if let Some(c) = c {
            if *c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }

        c.cloned()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).cloned()
    }

    fn collect(&mut self) -> Option<String> {
        let result = self
            .source
            .get(self.start..self.current)?
            .iter()
            .cloned()
            .collect::<String>()
            .into();

        self.clear();

        result
    }

    fn clear(&mut self) {
        self.start = self.current;
    }
}

pub fn parse_str(source: &str) -> Result<Table> {
    Parser::new(source.chars().collect()).parse_table()
}

/// Writes a table back out as comma separated text, one line per row,
/// quoting only the cells that need it.
pub fn render(table: &Table) -> String {
    let mut out = String::new();

    push_line(&mut out, &table.header);
    for row in &table.rows {
        push_line(&mut out, &row.cells);
    }

    out
}

fn push_line(out: &mut String, cells: &[String]) {
    let line = cells
        .iter()
        .map(|cell| quote(cell))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}

fn quote(cell: &str) -> String {
    let needs_quotes = cell.contains([',', '"', '\n', '\r'])
        || cell.starts_with(char::is_whitespace)
        || cell.ends_with(char::is_whitespace);

    if needs_quotes {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
