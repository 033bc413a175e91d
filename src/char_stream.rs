use std::io::{self, BufRead};

/// Line-buffered character source with an unbounded pushback stack.
///
/// Characters are served from the current line buffer; the next line is read
/// from the underlying source only once the buffer is exhausted. Every refill
/// bumps the 1-based line counter, so `position` always refers to the line the
/// buffer currently holds.
///
/// `pushback` accepts `None` as well, which lets the lexer un-read the
/// end-of-stream marker it peeked at.
pub struct CharStream<R> {
    reader: R,
    buffer: Vec<char>,
    ptr: usize,
    line: usize,
    exhausted: bool,
    pushed: Vec<Option<char>>,
}

impl<R: BufRead> CharStream<R> {
    pub fn new(reader: R) -> Self {
        CharStream {
            reader,
            buffer: Vec::new(),
            ptr: 0,
            line: 0,
            exhausted: false,
            pushed: Vec::new(),
        }
    }

    /// Refills the line buffer if it is used up. Returns `false` at end of input.
    fn fill(&mut self) -> io::Result<bool> {
        if self.ptr < self.buffer.len() {
            return Ok(true);
        }
        if self.exhausted {
            return Ok(false);
        }

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            self.exhausted = true;
            return Ok(false);
        }

        self.buffer = line.chars().collect();
        self.ptr = 0;
        self.line += 1;
        Ok(true)
    }

    /// Returns the next character, or `None` once the source is exhausted.
    pub fn next(&mut self) -> io::Result<Option<char>> {
        if let Some(ch) = self.pushed.pop() {
            return Ok(ch);
        }
        if !self.fill()? {
            return Ok(None);
        }
        let ch = self.buffer[self.ptr];
        self.ptr += 1;
        Ok(Some(ch))
    }

    /// Un-reads one character. Last pushed is first returned.
    pub fn pushback(&mut self, ch: Option<char>) {
        self.pushed.push(ch);
    }

    /// True only when the source is drained and nothing is pushed back.
    pub fn at_end(&self) -> bool {
        self.exhausted && self.pushed.is_empty()
    }

    /// `(line, col)` of the next character to be read, both 1-based.
    ///
    /// A pushed-back end marker takes no column.
    pub fn position(&self) -> (usize, usize) {
        let unread = self.pushed.iter().filter(|ch| ch.is_some()).count();
        let col = self.ptr.saturating_sub(unread) + 1;
        (self.line.max(1), col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(source: &str) -> CharStream<Cursor<&[u8]>> {
        CharStream::new(Cursor::new(source.as_bytes()))
    }

    fn drain(s: &mut CharStream<Cursor<&[u8]>>) -> String {
        let mut out = String::new();
        while let Some(ch) = s.next().unwrap() {
            out.push(ch);
        }
        out
    }

    #[test]
    fn test_reads_across_lines() {
        let mut s = stream("ab\ncd");
        assert_eq!(drain(&mut s), "ab\ncd");
        assert!(s.at_end());
    }

    #[test]
    fn test_pushback_is_a_stack() {
        let mut s = stream("xyz");
        let x = s.next().unwrap();
        let y = s.next().unwrap();
        s.pushback(y);
        s.pushback(x);
        assert_eq!(drain(&mut s), "xyz");
    }

    #[test]
    fn test_pushback_end_marker() {
        let mut s = stream("a");
        assert_eq!(s.next().unwrap(), Some('a'));
        assert_eq!(s.next().unwrap(), None);
        assert!(s.at_end());

        s.pushback(None);
        assert!(!s.at_end());
        assert_eq!(s.next().unwrap(), None);
        assert!(s.at_end());
    }

    #[test]
    fn test_pushback_after_refill() {
        let mut s = stream("a\nb");
        assert_eq!(s.next().unwrap(), Some('a'));
        assert_eq!(s.next().unwrap(), Some('\n'));
        assert_eq!(s.next().unwrap(), Some('b'));
        s.pushback(Some('b'));
        s.pushback(Some('\n'));
        assert_eq!(drain(&mut s), "\nb");
    }

    #[test]
    fn test_position_tracks_lines_and_columns() {
        let mut s = stream("ab\ncd\n");
        assert_eq!(s.position(), (1, 1));
        s.next().unwrap();
        assert_eq!(s.position(), (1, 2));
        s.next().unwrap();
        s.next().unwrap(); // '\n'
        s.next().unwrap(); // 'c', refills line 2
        assert_eq!(s.position(), (2, 2));

        let d = s.next().unwrap();
        s.pushback(d);
        assert_eq!(s.position(), (2, 2));
    }

    #[test]
    fn test_position_ignores_pushed_end_marker() {
        let mut s = stream("ab");
        s.next().unwrap();
        let b = s.next().unwrap();
        let end = s.next().unwrap();
        assert_eq!(end, None);
        s.pushback(end);
        s.pushback(b);
        assert_eq!(s.position(), (1, 2));
        s.next().unwrap();
        assert_eq!(s.position(), (1, 3));
    }

    #[test]
    fn test_empty_source() {
        let mut s = stream("");
        assert!(!s.at_end());
        assert_eq!(s.next().unwrap(), None);
        assert!(s.at_end());
    }
}
