//! Strict parser for list-of-strings model output.
//!
//! Accepts a JSON array of strings or the single/double-quoted list literal
//! models tend to produce (`['a', "b",]`). Nothing is evaluated: anything
//! outside that grammar is rejected.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListParseError {
    #[error("expected '[' at start of list")]
    NotAList,
    #[error("unexpected character '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("list element at offset {0} is not a string")]
    NonString(usize),
    #[error("input ended inside the list")]
    Unterminated,
    #[error("trailing text after list at offset {0}")]
    TrailingInput(usize),
}

pub fn parse_string_list(text: &str) -> Result<Vec<String>, ListParseError> {
    let text = text.trim();
    if let Ok(items) = serde_json::from_str::<Vec<String>>(text) {
        return Ok(items);
    }
    Parser::new(text).list()
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    len: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            len: text.len(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map(|(i, _)| *i).unwrap_or(self.len)
    }

    fn list(mut self) -> Result<Vec<String>, ListParseError> {
        self.skip_ws();
        if self.chars.next_if(|(_, c)| *c == '[').is_none() {
            return Err(ListParseError::NotAList);
        }

        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek().copied() {
                None => return Err(ListParseError::Unterminated),
                Some((_, ']')) => {
                    self.chars.next();
                    break;
                }
                Some((_, '\'' | '"')) => items.push(self.string()?),
                Some((offset, _)) => return Err(ListParseError::NonString(offset)),
            }

            self.skip_ws();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, ']')) => break,
                Some((offset, found)) => return Err(ListParseError::Unexpected { found, offset }),
                None => return Err(ListParseError::Unterminated),
            }
        }

        self.skip_ws();
        if self.chars.peek().is_none() {
            Ok(items)
        } else {
            Err(ListParseError::TrailingInput(self.offset()))
        }
    }

    fn string(&mut self) -> Result<String, ListParseError> {
        let Some((_, quote)) = self.chars.next() else {
            return Err(ListParseError::Unterminated);
        };

        let mut out = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                c if c == quote => return Ok(out),
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, e @ ('\\' | '\'' | '"'))) => out.push(e),
                    Some((_, other)) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err(ListParseError::Unterminated),
                },
                '\n' => {
                    return Err(ListParseError::Unexpected {
                        found: '\n',
                        offset: self.offset(),
                    })
                }
                c => out.push(c),
            }
        }
        Err(ListParseError::Unterminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_array() {
        assert_eq!(
            parse_string_list(r#"["rust async runtimes", "tokio vs async-std"]"#).unwrap(),
            vec!["rust async runtimes", "tokio vs async-std"]
        );
    }

    #[test]
    fn test_single_quoted_literal() {
        assert_eq!(
            parse_string_list("['query1', 'query2', 'query3']").unwrap(),
            vec!["query1", "query2", "query3"]
        );
    }

    #[test]
    fn test_mixed_quotes_escapes_and_trailing_comma() {
        let parsed = parse_string_list(r#"  ['it\'s fine', "say \"hi\"", 'a"b',]  "#).unwrap();
        assert_eq!(parsed, vec!["it's fine", r#"say "hi""#, r#"a"b"#]);
    }

    #[test]
    fn test_empty_lists() {
        assert!(parse_string_list("[]").unwrap().is_empty());
        assert!(parse_string_list("[ \n ]").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_prose() {
        assert_eq!(
            parse_string_list("Here are some queries: ['a']"),
            Err(ListParseError::NotAList)
        );
        assert_eq!(parse_string_list(""), Err(ListParseError::NotAList));
    }

    #[test]
    fn test_rejects_non_strings() {
        assert!(matches!(parse_string_list("[1, 2]"), Err(ListParseError::NonString(_))));
        assert!(matches!(parse_string_list("['a', ['b']]"), Err(ListParseError::NonString(_))));
        assert!(matches!(
            parse_string_list("[__import__('os').system('ls')]"),
            Err(ListParseError::NonString(_))
        ));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(parse_string_list("['a', 'b'"), Err(ListParseError::Unterminated));
        assert_eq!(parse_string_list("['unclosed]"), Err(ListParseError::Unterminated));
        assert!(matches!(
            parse_string_list("['a' 'b']"),
            Err(ListParseError::Unexpected { found: '\'', .. })
        ));
        assert!(matches!(
            parse_string_list("['a'] + ['b']"),
            Err(ListParseError::TrailingInput(_))
        ));
    }

    #[test]
    fn test_code_fence_is_not_a_list() {
        assert_eq!(
            parse_string_list("```python\n['a']\n```"),
            Err(ListParseError::NotAList)
        );
    }
}
