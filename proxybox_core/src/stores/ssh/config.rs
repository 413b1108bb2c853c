//! Lossless model of an OpenSSH client configuration file.
//!
//! Every line is kept verbatim. Only the lines of a field that is changed
//! through [`SshConfig::apply_fields`] are re-rendered, so comments, blank
//! lines, indentation and the order of untouched fields survive a
//! parse → render cycle unchanged.

/// Ordered `keyword → value` pairs of one host block.
///
/// Keywords compare ASCII case-insensitively, the way `ssh` reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFields {
    entries: Vec<(String, String)>,
}

impl HostFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `key` (`ssh` ignores later duplicates).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Overwrite the first occurrence of `key`, or append it.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some((_, v)) => *v = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Drop every occurrence of `key`. Returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        before != self.entries.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HostFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A line as read, `raw` including its own terminator (none on a final
/// line without one).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    /// Blank line or comment.
    Other(String),
    Field {
        raw: String,
        indent: String,
        key: String,
        value: String,
    },
}

impl Line {
    fn raw(&self) -> &str {
        match self {
            Line::Other(raw) | Line::Field { raw, .. } => raw,
        }
    }

    fn raw_mut(&mut self) -> &mut String {
        match self {
            Line::Other(raw) | Line::Field { raw, .. } => raw,
        }
    }

    fn field(indent: &str, key: &str, value: &str, eol: &str) -> Self {
        Line::Field {
            raw: format!("{indent}{key} {value}{eol}"),
            indent: indent.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// The terminator `raw` ends with: `"\r\n"`, `"\n"` or nothing.
fn line_ending(raw: &str) -> &str {
    if raw.ends_with("\r\n") {
        "\r\n"
    } else if raw.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockKind {
    Host(String),
    Match,
}

#[derive(Debug, Clone)]
struct Block {
    id: usize,
    kind: BlockKind,
    header: String,
    lines: Vec<Line>,
}

impl Block {
    fn fields(&self) -> HostFields {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Field { key, value, .. } => Some((key.clone(), value.clone())),
                Line::Other(_) => None,
            })
            .collect()
    }

    /// Terminator for inserted lines: whatever the block itself uses.
    fn newline(&self, fallback: &'static str) -> &'static str {
        std::iter::once(self.header.as_str())
            .chain(self.lines.iter().map(Line::raw))
            .find_map(|raw| match line_ending(raw) {
                "\r\n" => Some("\r\n"),
                "\n" => Some("\n"),
                _ => None,
            })
            .unwrap_or(fallback)
    }

    fn field_indent(&self) -> String {
        self.lines
            .iter()
            .find_map(|line| match line {
                Line::Field { indent, .. } => Some(indent.clone()),
                Line::Other(_) => None,
            })
            .unwrap_or_else(|| "    ".to_string())
    }

    /// Index right after the last field, so appended fields land before any
    /// trailing blank lines or comments that visually separate blocks.
    fn insertion_point(&self) -> usize {
        self.lines
            .iter()
            .rposition(|line| matches!(line, Line::Field { .. }))
            .map_or(0, |i| i + 1)
    }
}

/// A parsed client config: global lines followed by `Host` / `Match` blocks.
#[derive(Debug, Clone)]
pub struct SshConfig {
    preamble: Vec<Line>,
    blocks: Vec<Block>,
    /// Terminator of the file's first line, used for blocks that have none.
    newline: &'static str,
}

/// Split `Keyword value`, `Keyword=value` or `Keyword = value`.
fn split_keyword(body: &str) -> Option<(&str, &str)> {
    let end = body.find(|c: char| c.is_whitespace() || c == '=')?;
    let (key, rest) = body.split_at(end);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest).trim_start();
    Some((key, rest.trim_end()))
}

fn parse_line(raw: &str) -> Line {
    let body = raw[..raw.len() - line_ending(raw).len()].trim_start();
    if body.is_empty() || body.starts_with('#') {
        return Line::Other(raw.to_string());
    }
    let indent = raw[..raw.len() - body.len()].to_string();
    match split_keyword(body) {
        Some((key, value)) => Line::Field {
            raw: raw.to_string(),
            indent,
            key: key.to_string(),
            value: value.to_string(),
        },
        // A bare keyword with no value.
        None => Line::Field {
            raw: raw.to_string(),
            indent,
            key: body.trim_end().to_string(),
            value: String::new(),
        },
    }
}

impl SshConfig {
    pub fn parse(text: &str) -> Self {
        let crlf = text
            .split_inclusive('\n')
            .next()
            .is_some_and(|first| first.ends_with("\r\n"));
        let newline = if crlf { "\r\n" } else { "\n" };

        let mut preamble = Vec::new();
        let mut blocks: Vec<Block> = Vec::new();

        for raw in text.split_inclusive('\n') {
            let line = parse_line(raw);

            if let Line::Field { key, value, .. } = &line {
                let kind = if key.eq_ignore_ascii_case("Host") {
                    Some(BlockKind::Host(value.clone()))
                } else if key.eq_ignore_ascii_case("Match") {
                    Some(BlockKind::Match)
                } else {
                    None
                };
                if let Some(kind) = kind {
                    blocks.push(Block {
                        id: blocks.len(),
                        kind,
                        header: raw.to_string(),
                        lines: Vec::new(),
                    });
                    continue;
                }
            }

            match blocks.last_mut() {
                Some(block) => block.lines.push(line),
                None => preamble.push(line),
            }
        }

        Self {
            preamble,
            blocks,
            newline,
        }
    }

    pub fn render(&self) -> String {
        let mut text: String = self.preamble.iter().map(Line::raw).collect();
        for block in &self.blocks {
            text.push_str(&block.header);
            text.extend(block.lines.iter().map(Line::raw));
        }
        text
    }

    /// `(id, alias)` for every `Host` block, in file order.
    ///
    /// Ids are stable for the lifetime of this value; removing a block does
    /// not renumber the others.
    pub fn hosts(&self) -> Vec<(usize, String)> {
        self.blocks
            .iter()
            .filter_map(|block| match &block.kind {
                BlockKind::Host(alias) => Some((block.id, alias.clone())),
                BlockKind::Match => None,
            })
            .collect()
    }

    fn host_block(&self, id: usize, alias: &str) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|b| b.id == id && b.kind == BlockKind::Host(alias.to_string()))
    }

    fn host_block_mut(&mut self, id: usize, alias: &str) -> Option<&mut Block> {
        self.blocks
            .iter_mut()
            .find(|b| b.id == id && b.kind == BlockKind::Host(alias.to_string()))
    }

    pub fn fields(&self, id: usize, alias: &str) -> Option<HostFields> {
        self.host_block(id, alias).map(Block::fields)
    }

    /// Make the block's fields equal `desired`, touching as few lines as
    /// possible.
    ///
    /// Existing lines whose value is unchanged are left byte-for-byte alone,
    /// changed values are rewritten in place (keeping indentation, line ending
    /// and the keyword's spelling as written), fields missing from `desired`
    /// are removed and new ones are appended after the block's last field.
    /// Returns `false` if no such block exists.
    pub fn apply_fields(&mut self, id: usize, alias: &str, desired: &HostFields) -> bool {
        let fallback = self.newline;
        let Some(block) = self.host_block_mut(id, alias) else {
            return false;
        };

        let mut matched = vec![false; desired.entries.len()];
        let mut kept = Vec::with_capacity(block.lines.len());

        for line in block.lines.drain(..) {
            let (raw, indent, key, value) = match line {
                Line::Field {
                    raw,
                    indent,
                    key,
                    value,
                } => (raw, indent, key, value),
                other => {
                    kept.push(other);
                    continue;
                }
            };

            let slot = (0..desired.entries.len())
                .find(|&i| !matched[i] && desired.entries[i].0.eq_ignore_ascii_case(&key));
            let Some(i) = slot else {
                // Not wanted any more.
                continue;
            };
            matched[i] = true;

            let new_value = &desired.entries[i].1;
            if *new_value == value {
                kept.push(Line::Field {
                    raw,
                    indent,
                    key,
                    value,
                });
            } else {
                kept.push(Line::field(&indent, &key, new_value, line_ending(&raw)));
            }
        }
        block.lines = kept;

        let newline = block.newline(fallback);
        let indent = block.field_indent();
        let mut added: Vec<Line> = desired
            .entries
            .iter()
            .zip(&matched)
            .filter(|&(_, &done)| !done)
            .map(|((key, value), _)| Line::field(&indent, key, value, newline))
            .collect();
        if added.is_empty() {
            return true;
        }

        let at = block.insertion_point();
        let before = match at {
            0 => &mut block.header,
            _ => block.lines[at - 1].raw_mut(),
        };
        // Appending after an unterminated last line: it takes the newline,
        // and the new last line goes without one.
        if line_ending(before).is_empty() {
            before.push_str(newline);
            if let Some(last) = added.last_mut() {
                let raw = last.raw_mut();
                raw.truncate(raw.len() - newline.len());
            }
        }
        block.lines.splice(at..at, added);
        true
    }

    /// Remove a whole host block. Returns whether it existed.
    pub fn remove_host(&mut self, id: usize, alias: &str) -> bool {
        let before = self.blocks.len();
        self.blocks
            .retain(|b| !(b.id == id && b.kind == BlockKind::Host(alias.to_string())));
        before != self.blocks.len()
    }
}
