//! Foreign-key extraction from `CREATE TABLE` DDL.
//!
//! Two tiers: [`tokenized_foreign_keys`] walks `sqlparser` tokens of one
//! statement, [`regex_foreign_keys`] scans raw text. [`extract_foreign_keys`]
//! runs the tokenizer per statement and drops to regex only for the
//! statements it could not handle.

use std::sync::LazyLock;

use regex::Regex;
use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};
use synthdb_core::ForeignKeyRelation;
use tracing::{debug, warn};

use crate::errors::{PlanError, Result};

/// Foreign keys declared by one `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableKeys {
    pub table: String,
    pub relations: Vec<ForeignKeyRelation>,
}

/// Split SQL text into statements on `;`, ignoring separators inside quotes
/// and `--` comments. Empty statements are dropped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_comment {
            current.push(ch);
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }

        match quote {
            Some(open) => {
                current.push(ch);
                if ch == open {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '-' if chars.peek() == Some(&'-') => {
                    in_comment = true;
                    current.push(ch);
                }
                ';' => {
                    push_statement(&mut statements, &current);
                    current.clear();
                }
                _ => current.push(ch),
            },
        }
    }
    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// Structured tier: tokenize one statement and read its foreign keys.
///
/// Returns `Ok(None)` for statements that are not `CREATE TABLE`.
pub fn tokenized_foreign_keys(statement: &str) -> Result<Option<CreateTableKeys>> {
    let dialect = GenericDialect {};
    let tokens: Vec<Token> = Tokenizer::new(&dialect, statement)
        .tokenize()
        .map_err(|err| PlanError::Tokenize(err.to_string()))?
        .into_iter()
        .filter(|token| !matches!(token, Token::Whitespace(_)))
        .collect();

    let mut cursor = TokenCursor::new(&tokens);
    if !cursor.eat_keyword(Keyword::CREATE) {
        return Ok(None);
    }
    let _ = cursor.eat_keyword(Keyword::TEMPORARY) || cursor.eat_keyword(Keyword::TEMP);
    if !cursor.eat_keyword(Keyword::TABLE) {
        return Ok(None);
    }
    if cursor.eat_keyword(Keyword::IF) {
        cursor.eat_keyword(Keyword::NOT);
        cursor.eat_keyword(Keyword::EXISTS);
    }

    let table = cursor.object_name().ok_or(PlanError::MissingTableName)?;
    cursor.expect(Token::LParen, "table body")?;

    let mut relations = Vec::new();
    for element in cursor.body_elements()? {
        relations.extend(element_relations(&table, element)?);
    }

    Ok(Some(CreateTableKeys { table, relations }))
}

fn element_relations(table: &str, element: &[Token]) -> Result<Vec<ForeignKeyRelation>> {
    let mut cursor = TokenCursor::new(element);
    if cursor.eat_keyword(Keyword::CONSTRAINT) {
        cursor.object_name();
    }

    match cursor.peek_keyword() {
        Some(Keyword::FOREIGN) => {
            cursor.next();
            if !cursor.eat_keyword(Keyword::KEY) {
                return Err(unexpected("FOREIGN KEY", cursor.peek()));
            }
            let sources = cursor.ident_list("FOREIGN KEY columns")?;
            if !cursor.eat_keyword(Keyword::REFERENCES) {
                return Err(unexpected("FOREIGN KEY", cursor.peek()));
            }
            let target = cursor
                .object_name()
                .ok_or_else(|| unexpected("REFERENCES", cursor.peek()))?;
            let targets = if cursor.peek() == Some(&Token::LParen) {
                cursor.ident_list("REFERENCES columns")?
            } else {
                Vec::new()
            };

            Ok(sources
                .into_iter()
                .enumerate()
                .map(|(idx, source)| {
                    ForeignKeyRelation::new(table, source, target.clone(), targets.get(idx).cloned())
                })
                .collect())
        }
        Some(
            Keyword::PRIMARY | Keyword::UNIQUE | Keyword::CHECK | Keyword::INDEX | Keyword::KEY,
        ) => Ok(Vec::new()),
        _ => {
            let Some(column) = cursor.ident() else {
                return Ok(Vec::new());
            };
            if !cursor.skip_to_keyword(Keyword::REFERENCES) {
                return Ok(Vec::new());
            }
            let target = cursor
                .object_name()
                .ok_or_else(|| unexpected("REFERENCES", cursor.peek()))?;
            let target_column = if cursor.peek() == Some(&Token::LParen) {
                cursor.ident_list("REFERENCES columns")?.into_iter().next()
            } else {
                None
            };

            Ok(vec![ForeignKeyRelation::new(table, column, target, target_column)])
        }
    }
}

fn unexpected(context: &'static str, token: Option<&Token>) -> PlanError {
    PlanError::Unexpected {
        context,
        found: token
            .map(ToString::to_string)
            .unwrap_or_else(|| "end of input".to_string()),
    }
}

struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek() {
            Some(Token::Word(word)) if word.quote_style.is_none() => Some(word.keyword),
            _ => None,
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek_keyword() == Some(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_to_keyword(&mut self, keyword: Keyword) -> bool {
        while self.peek().is_some() {
            if self.eat_keyword(keyword) {
                return true;
            }
            self.pos += 1;
        }
        false
    }

    fn expect(&mut self, expected: Token, context: &'static str) -> Result<()> {
        match self.next() {
            Some(token) if *token == expected => Ok(()),
            other => Err(unexpected(context, other)),
        }
    }

    fn ident(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Word(word)) => {
                self.pos += 1;
                Some(word.value.clone())
            }
            _ => None,
        }
    }

    /// Possibly qualified name; only the last segment is kept.
    fn object_name(&mut self) -> Option<String> {
        let mut name = self.ident()?;
        while self.peek() == Some(&Token::Period) {
            self.pos += 1;
            name = self.ident()?;
        }
        Some(name)
    }

    fn ident_list(&mut self, context: &'static str) -> Result<Vec<String>> {
        self.expect(Token::LParen, context)?;
        let mut idents = Vec::new();
        loop {
            match self.next() {
                Some(Token::Word(word)) => idents.push(word.value.clone()),
                Some(Token::Comma) => {}
                Some(Token::RParen) => return Ok(idents),
                other => return Err(unexpected(context, other)),
            }
        }
    }

    /// Comma-separated elements of a parenthesized body, consuming the
    /// closing parenthesis.
    fn body_elements(&mut self) -> Result<Vec<&'a [Token]>> {
        let tokens = self.tokens;
        let mut elements = Vec::new();
        let mut depth = 0usize;
        let mut start = self.pos;

        while let Some(token) = self.next() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen if depth == 0 => {
                    let element = &tokens[start..self.pos - 1];
                    if !element.is_empty() {
                        elements.push(element);
                    }
                    return Ok(elements);
                }
                Token::RParen => depth -= 1,
                Token::Comma if depth == 0 => {
                    elements.push(&tokens[start..self.pos - 1]);
                    start = self.pos;
                }
                _ => {}
            }
        }

        Err(unexpected("table body", None))
    }
}

static CREATE_TABLE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CREATE\s+TABLE").expect("valid regex"));
static BLOCK_TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s+(?:IF\s+NOT\s+EXISTS\s+)?([^\s(]+)\s*\(").expect("valid regex")
});
static TABLE_FOREIGN_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)FOREIGN\s+KEY\s*\(\s*([^)]+)\s*\)\s+REFERENCES\s+([^\s(]+)\s*(?:\(\s*([^)]+)\s*\))?",
    )
    .expect("valid regex")
});
static INLINE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\w+)\s+[^,\n]*REFERENCES\s+([^\s(]+)\s*(?:\(\s*([^)]+)\s*\))?")
        .expect("valid regex")
});

/// Regex tier: scan every `CREATE TABLE` block of `sql` for both constraint shapes.
pub fn regex_foreign_keys(sql: &str) -> Vec<ForeignKeyRelation> {
    let mut relations = Vec::new();

    for block in CREATE_TABLE_SPLIT.split(sql).skip(1) {
        let Some(table) = BLOCK_TABLE_NAME
            .captures(block)
            .and_then(|caps| caps.get(1))
            .map(|m| clean_identifier(m.as_str()))
        else {
            continue;
        };

        for caps in TABLE_FOREIGN_KEY.captures_iter(block) {
            let target = clean_identifier(&caps[2]);
            let target_columns: Vec<String> = caps
                .get(3)
                .map(|m| m.as_str().split(',').map(clean_identifier).collect())
                .unwrap_or_default();
            for (idx, source) in caps[1].split(',').map(clean_identifier).enumerate() {
                relations.push(ForeignKeyRelation::new(
                    table.clone(),
                    source,
                    target.clone(),
                    target_columns.get(idx).cloned(),
                ));
            }
        }

        for caps in INLINE_REFERENCE.captures_iter(block) {
            let source = clean_identifier(&caps[1]);
            if ["FOREIGN", "KEY", "CONSTRAINT", "REFERENCES"]
                .iter()
                .any(|word| source.eq_ignore_ascii_case(word))
            {
                continue;
            }
            let target_column = caps
                .get(3)
                .and_then(|m| m.as_str().split(',').next().map(clean_identifier));
            relations.push(ForeignKeyRelation::new(
                table.clone(),
                source,
                clean_identifier(&caps[2]),
                target_column,
            ));
        }
    }

    relations
}

fn clean_identifier(raw: &str) -> String {
    let unquoted = raw.trim().trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'));
    unquoted
        .rsplit('.')
        .next()
        .unwrap_or(unquoted)
        .trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'))
        .to_string()
}

/// Foreign keys of every `CREATE TABLE` statement in `sql`, deduplicated in
/// discovery order.
pub fn extract_foreign_keys(sql: &str) -> Vec<ForeignKeyRelation> {
    let mut relations: Vec<ForeignKeyRelation> = Vec::new();

    for statement in split_statements(sql) {
        let found = match tokenized_foreign_keys(&statement) {
            Ok(Some(keys)) => keys.relations,
            Ok(None) => continue,
            Err(err) => {
                warn!(error = %err, "structured DDL parse failed, using regex fallback");
                regex_foreign_keys(&statement)
            }
        };

        for relation in found {
            if !relations.contains(&relation) {
                relations.push(relation);
            }
        }
    }

    debug!(relations = relations.len(), "extracted foreign keys");
    relations
}
