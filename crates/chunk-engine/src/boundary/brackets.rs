use crate::language::Language;

/// Incremental bracket balance over source lines.
///
/// The tracker is `Copy`, so a caller snapshots it by value before advancing
/// over a candidate line and restores by reassigning the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BracketTracker {
    pub paren: i32,
    pub brace: i32,
    pub bracket: i32,
    /// Open template literals (JS/TS backticks)
    pub template: i32,
    in_block_comment: bool,
}

impl BracketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker state after every line of `lines`
    pub fn over(lines: &[&str], language: Language) -> Self {
        let mut tracker = Self::new();
        for line in lines {
            tracker.advance(line, language);
        }
        tracker
    }

    /// Total open depth; negative values mean more closers than openers
    #[must_use]
    pub const fn depth(&self) -> i32 {
        self.paren + self.brace + self.bracket + self.template
    }

    /// No unclosed delimiter or comment remains
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.paren <= 0
            && self.brace <= 0
            && self.bracket <= 0
            && self.template <= 0
            && !self.in_block_comment
    }

    #[must_use]
    pub const fn in_block_comment(&self) -> bool {
        self.in_block_comment
    }

    /// Advance the state over one line
    pub fn advance(&mut self, line: &str, language: Language) {
        let chars: Vec<char> = line.chars().collect();
        let hash_comments = matches!(language, Language::Python | Language::Ruby | Language::Php);
        let slash_comments = !matches!(language, Language::Python | Language::Ruby);
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            if self.in_block_comment {
                if c == '*' && next == Some('/') {
                    self.in_block_comment = false;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            if self.template > 0 {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == '`' {
                    self.template -= 1;
                }
                i += 1;
                continue;
            }

            match c {
                '/' if slash_comments && next == Some('/') => break,
                '/' if slash_comments && next == Some('*') => {
                    self.in_block_comment = true;
                    i += 2;
                    continue;
                }
                '#' if hash_comments => break,
                '`' if matches!(
                    language,
                    Language::JavaScript | Language::TypeScript | Language::Unknown
                ) =>
                {
                    self.template += 1;
                }
                '"' => {
                    i = skip_string(&chars, i, '"');
                    continue;
                }
                '\'' => {
                    if is_char_literal(&chars, i, language) {
                        i = skip_string(&chars, i, '\'');
                        continue;
                    }
                }
                '(' => self.paren += 1,
                ')' => self.paren -= 1,
                '{' => self.brace += 1,
                '}' => self.brace -= 1,
                '[' => self.bracket += 1,
                ']' => self.bracket -= 1,
                _ => {}
            }
            i += 1;
        }
    }
}

/// Index just past the closing quote, or the end of the line
fn skip_string(chars: &[char], open: usize, quote: char) -> usize {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Rust lifetimes (`'a`) share the quote with char literals
fn is_char_literal(chars: &[char], i: usize, language: Language) -> bool {
    if !matches!(language, Language::Rust) {
        return true;
    }
    match chars.get(i + 1) {
        Some('\\') => true,
        Some(_) => chars.get(i + 2) == Some(&'\''),
        None => false,
    }
}
