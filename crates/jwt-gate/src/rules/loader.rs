//! Directive-file parser for the rule table.
//!
//! ```text
//! # path-only rule: any valid token from an empty key set (always 401)
//! jwt /simple
//!
//! jwt {
//!     path  /api
//!     allow role admin
//!     deny  user banned
//!     keys  /etc/jwt-gate/api.jwks.json
//! }
//! ```
//!
//! A directive and its arguments occupy one line. `#` starts a comment,
//! double quotes group a single argument, and `{` / `}` delimit blocks.
//! Relative `keys` paths are resolved against the rules file's directory.
//! `yesMethod` is accepted inside a block but has no effect.

use crate::auth::jwks::{KeySet, KeySetError};
use crate::rules::error::RuleLoadError;
use crate::rules::model::{AccessRule, Rule, RuleTable};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Word(String),
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    kind: TokenKind,
    line: usize,
}

/// Read the rules file at `path`, loading each block's key file.
///
/// # Errors
///
/// Any I/O, syntax, or key-set error; see [`RuleLoadError`].
pub fn load_rules(path: &Path) -> Result<RuleTable, RuleLoadError> {
    let input = std::fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let table = parse_rules(&input, |key_path| {
        KeySet::load(&resolve_relative(&base_dir, key_path))
    })?;

    for rule in table.iter() {
        if rule.keys().is_empty() {
            tracing::warn!(
                target: "jwt_gate.rules",
                path = %rule.path(),
                "Rule has no keys; every request on this path will be rejected"
            );
        }
    }

    tracing::info!(
        target: "jwt_gate.rules",
        file = %path.display(),
        rule_count = table.len(),
        "Loaded rule table"
    );

    Ok(table)
}

fn resolve_relative(base_dir: &Path, key_path: &Path) -> PathBuf {
    if key_path.is_absolute() {
        key_path.to_path_buf()
    } else {
        base_dir.join(key_path)
    }
}

/// Parse rule directives from `input`, calling `load_keys` for every `keys`
/// directive.
///
/// # Errors
///
/// Any syntax error, or the first error returned by `load_keys`.
pub fn parse_rules<F>(input: &str, mut load_keys: F) -> Result<RuleTable, RuleLoadError>
where
    F: FnMut(&Path) -> Result<KeySet, KeySetError>,
{
    let mut cursor = Cursor::new(tokenize(input)?);
    let mut rules = Vec::new();

    while let Some(token) = cursor.next() {
        match token.kind {
            TokenKind::Word(directive) if directive == "jwt" => {
                rules.push(parse_jwt(&mut cursor, token.line, &mut load_keys)?);
            }
            TokenKind::Word(directive) => {
                return Err(RuleLoadError::UnknownDirective {
                    line: token.line,
                    directive,
                });
            }
            TokenKind::Open | TokenKind::Close => {
                return Err(RuleLoadError::UnbalancedBraces { line: token.line });
            }
        }
    }

    Ok(RuleTable::new(rules))
}

fn parse_jwt<F>(cursor: &mut Cursor, line: usize, load_keys: &mut F) -> Result<Rule, RuleLoadError>
where
    F: FnMut(&Path) -> Result<KeySet, KeySetError>,
{
    let args = cursor.words_on_line(line);
    let opens_block = cursor.next_if_open(line);

    match (args.as_slice(), opens_block) {
        ([], true) => parse_block(cursor, line, load_keys),
        ([], false) => Err(RuleLoadError::MissingPath { line }),
        ([path], false) => Rule::new(path.as_str(), Vec::new(), KeySet::empty()),
        ([_], true) => Err(RuleLoadError::PathWithBlock { line }),
        (args, _) => Err(RuleLoadError::WrongArgumentCount {
            line,
            directive: "jwt".to_string(),
            expected: 1,
            found: args.len(),
        }),
    }
}

fn parse_block<F>(
    cursor: &mut Cursor,
    open_line: usize,
    load_keys: &mut F,
) -> Result<Rule, RuleLoadError>
where
    F: FnMut(&Path) -> Result<KeySet, KeySetError>,
{
    let mut path: Option<String> = None;
    let mut keys: Option<KeySet> = None;
    let mut access_rules = Vec::new();

    loop {
        let Some(token) = cursor.next() else {
            return Err(RuleLoadError::UnbalancedBraces { line: open_line });
        };

        let directive = match token.kind {
            TokenKind::Close => break,
            TokenKind::Open => return Err(RuleLoadError::UnbalancedBraces { line: token.line }),
            TokenKind::Word(directive) => directive,
        };
        let line = token.line;
        let args = cursor.words_on_line(line);

        match directive.as_str() {
            "path" => {
                let value = single_argument(&directive, line, args)?;
                if path.is_some() {
                    return Err(RuleLoadError::DuplicateDirective { line, directive });
                }
                path = Some(value);
            }
            "keys" => {
                let file = single_argument(&directive, line, args)?;
                if keys.is_some() {
                    return Err(RuleLoadError::DuplicateDirective { line, directive });
                }
                keys = Some(load_keys(Path::new(&file))?);
            }
            "allow" | "deny" => {
                let [claim, value]: [String; 2] =
                    args.try_into().map_err(|args: Vec<String>| {
                        RuleLoadError::WrongArgumentCount {
                            line,
                            directive: directive.clone(),
                            expected: 2,
                            found: args.len(),
                        }
                    })?;
                access_rules.push(if directive == "allow" {
                    AccessRule::allow(claim, value)
                } else {
                    AccessRule::deny(claim, value)
                });
            }
            "yesMethod" => {
                if args.is_empty() {
                    return Err(RuleLoadError::WrongArgumentCount {
                        line,
                        directive,
                        expected: 1,
                        found: 0,
                    });
                }
                tracing::warn!(
                    target: "jwt_gate.rules",
                    line,
                    methods = ?args,
                    "yesMethod has no effect and is ignored"
                );
            }
            _ => return Err(RuleLoadError::UnknownDirective { line, directive }),
        }
    }

    let path = path.ok_or(RuleLoadError::MissingPath { line: open_line })?;
    Rule::new(path, access_rules, keys.unwrap_or_default())
}

fn single_argument(
    directive: &str,
    line: usize,
    args: Vec<String>,
) -> Result<String, RuleLoadError> {
    let found = args.len();
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(RuleLoadError::WrongArgumentCount {
            line,
            directive: directive.to_string(),
            expected: 1,
            found,
        }),
    }
}

struct Cursor {
    tokens: std::iter::Peekable<std::vec::IntoIter<Token>>,
}

impl Cursor {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
        }
    }

    fn next(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    /// Consume the plain words that follow on `line`.
    fn words_on_line(&mut self, line: usize) -> Vec<String> {
        let mut words = Vec::new();
        while let Some(Token {
            kind: TokenKind::Word(_),
            line: next_line,
        }) = self.tokens.peek()
        {
            if *next_line != line {
                break;
            }
            if let Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) = self.tokens.next()
            {
                words.push(word);
            }
        }
        words
    }

    /// Consume a `{` if it is the next token on `line`.
    fn next_if_open(&mut self, line: usize) -> bool {
        self.tokens
            .next_if(|token| token.kind == TokenKind::Open && token.line == line)
            .is_some()
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, RuleLoadError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '#' => {
                while chars.next_if(|&next| next != '\n').is_some() {}
            }
            '{' => tokens.push(Token {
                kind: TokenKind::Open,
                line,
            }),
            '}' => tokens.push(Token {
                kind: TokenKind::Close,
                line,
            }),
            '"' => {
                let start_line = line;
                let mut word = String::new();
                loop {
                    match chars.next() {
                        None => {
                            return Err(RuleLoadError::Syntax {
                                line: start_line,
                                message: "unterminated quoted string".to_string(),
                            });
                        }
                        Some('"') => break,
                        Some('\\') if chars.peek() == Some(&'"') => {
                            chars.next();
                            word.push('"');
                        }
                        Some(ch) => {
                            if ch == '\n' {
                                line += 1;
                            }
                            word.push(ch);
                        }
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Word(word),
                    line: start_line,
                });
            }
            c => {
                let mut word = String::from(c);
                while let Some(next) =
                    chars.next_if(|&next| !next.is_whitespace() && next != '{' && next != '}')
                {
                    word.push(next);
                }
                tokens.push(Token {
                    kind: TokenKind::Word(word),
                    line,
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::rules::model::AccessMode;
    use gate_test_utils::{jwks_json, TempFile, TestKeypair};

    fn no_keys(path: &Path) -> Result<KeySet, KeySetError> {
        Err(KeySetError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "unexpected key load"),
        })
    }

    fn parse(input: &str) -> Result<RuleTable, RuleLoadError> {
        parse_rules(input, no_keys)
    }

    fn paths(table: &RuleTable) -> Vec<&str> {
        table.iter().map(Rule::path).collect()
    }

    #[test]
    fn test_simple_rule() {
        let table = parse("jwt /test").unwrap();
        assert_eq!(paths(&table), vec!["/test"]);
        assert!(table.first_match("/test").unwrap().access_rules().is_empty());
    }

    #[test]
    fn test_block_with_path() {
        let table = parse("jwt {\npath /test\n}").unwrap();
        assert_eq!(paths(&table), vec!["/test"]);
    }

    #[test]
    fn test_block_with_allow() {
        let table = parse(
            "jwt {
                path /test
                allow user test
            }",
        )
        .unwrap();

        let rule = table.first_match("/test").unwrap();
        assert_eq!(rule.access_rules(), &[AccessRule::allow("user", "test")]);
    }

    #[test]
    fn test_path_and_block_together_is_rejected() {
        let result = parse(
            "jwt /test {
                allow user test
            }",
        );
        assert!(matches!(result, Err(RuleLoadError::PathWithBlock { line: 1 })));
    }

    #[test]
    fn test_predicates_keep_declaration_order() {
        let table = parse(
            "jwt {
                path /test
                deny role member
                allow user test
            }",
        )
        .unwrap();

        let rules = table.first_match("/test").unwrap().access_rules();
        assert_eq!(
            rules,
            &[AccessRule::deny("role", "member"), AccessRule::allow("user", "test")]
        );
        assert_eq!(rules.first().unwrap().mode, AccessMode::Deny);
    }

    #[test]
    fn test_block_without_path_is_rejected() {
        let result = parse(
            "jwt {
                deny role member
            }",
        );
        assert!(matches!(result, Err(RuleLoadError::MissingPath { line: 1 })));
    }

    #[test]
    fn test_multiple_simple_rules() {
        let table = parse("jwt /path1\njwt /path2").unwrap();
        assert_eq!(paths(&table), vec!["/path1", "/path2"]);
    }

    #[test]
    fn test_duplicate_path_in_block_is_rejected() {
        let result = parse(
            "jwt {
                path /path1
                path /path2
            }",
        );
        assert!(matches!(
            result,
            Err(RuleLoadError::DuplicateDirective { line: 3, ref directive }) if directive == "path"
        ));
    }

    #[test]
    fn test_wrong_argument_counts() {
        let cases = [
            ("jwt /a /b", "jwt"),
            ("jwt {\npath\n}", "path"),
            ("jwt {\npath /a /b\n}", "path"),
            ("jwt {\npath /a\nallow role\n}", "allow"),
            ("jwt {\npath /a\ndeny role a b\n}", "deny"),
            ("jwt {\npath /a\nkeys\n}", "keys"),
        ];

        for (input, expected) in cases {
            let result = parse(input);
            assert!(
                matches!(
                    &result,
                    Err(RuleLoadError::WrongArgumentCount { directive, .. }) if directive == expected
                ),
                "input {input:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn test_yes_method_is_accepted_and_ignored() {
        let table = parse("jwt {\npath /a\nyesMethod GET\nallow role admin\n}").unwrap();
        let rule = table.first_match("/a").unwrap();

        assert_eq!(rule.access_rules(), &[AccessRule::allow("role", "admin")]);
        assert!(parse("jwt {\npath /a\nyesMethod GET POST\n}").is_ok());
    }

    #[test]
    fn test_yes_method_requires_an_argument() {
        assert!(matches!(
            parse("jwt {\npath /a\nyesMethod\n}"),
            Err(RuleLoadError::WrongArgumentCount { line: 3, expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_directives_are_rejected() {
        assert!(matches!(
            parse("jwt {\npath /a\nnoMethod GET\n}"),
            Err(RuleLoadError::UnknownDirective { line: 3, .. })
        ));
        assert!(matches!(
            parse("proxy / localhost"),
            Err(RuleLoadError::UnknownDirective { line: 1, .. })
        ));
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(matches!(
            parse("jwt {\npath /a\n"),
            Err(RuleLoadError::UnbalancedBraces { line: 1 })
        ));
        assert!(matches!(
            parse("jwt /a\n}"),
            Err(RuleLoadError::UnbalancedBraces { line: 2 })
        ));
        assert!(matches!(
            parse("jwt {\npath /a\n{\n}"),
            Err(RuleLoadError::UnbalancedBraces { line: 3 })
        ));
    }

    #[test]
    fn test_jwt_without_path_or_block() {
        assert!(matches!(parse("jwt"), Err(RuleLoadError::MissingPath { line: 1 })));
    }

    #[test]
    fn test_empty_quoted_path_is_rejected() {
        assert!(matches!(parse(r#"jwt """#), Err(RuleLoadError::EmptyPath)));
    }

    #[test]
    fn test_comments_and_quotes() {
        let table = parse(
            r#"# protected area
            jwt {
                path /api   # trailing comment
                allow name "Jane Doe"
                allow note "say \"hi\""
            }"#,
        )
        .unwrap();

        let rules = table.first_match("/api").unwrap().access_rules();
        assert_eq!(
            rules,
            &[
                AccessRule::allow("name", "Jane Doe"),
                AccessRule::allow("note", "say \"hi\"")
            ]
        );
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(matches!(
            parse("jwt {\npath \"/a\n}"),
            Err(RuleLoadError::Syntax { line: 2, .. })
        ));
    }

    #[test]
    fn test_empty_input_yields_empty_table() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# nothing here\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_keys_directive_calls_loader() {
        let keypair = TestKeypair::new(1, "key-1");
        let mut requested = Vec::new();

        let table = parse_rules("jwt {\npath /a\nkeys /etc/a.json\n}", |path| {
            requested.push(path.to_path_buf());
            KeySet::from_json(&jwks_json(&[keypair.jwk()])).map_err(|source| KeySetError::Json {
                path: path.display().to_string(),
                source,
            })
        })
        .unwrap();

        assert_eq!(requested, vec![PathBuf::from("/etc/a.json")]);
        assert!(table.first_match("/a").unwrap().keys().find("key-1").is_some());
    }

    #[test]
    fn test_duplicate_keys_is_rejected() {
        let result = parse_rules("jwt {\npath /a\nkeys /k1\nkeys /k2\n}", |_| Ok(KeySet::empty()));
        assert!(matches!(
            result,
            Err(RuleLoadError::DuplicateDirective { line: 4, ref directive }) if directive == "keys"
        ));
    }

    #[test]
    fn test_key_loader_error_is_fatal() {
        let result = parse("jwt {\npath /a\nkeys /missing.json\n}");
        assert!(matches!(result, Err(RuleLoadError::Keys(KeySetError::Io { .. }))));
    }

    #[test]
    fn test_load_rules_resolves_relative_key_paths() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = TempFile::with_contents("keys.json", &jwks_json(&[keypair.jwk()]));
        let key_name = keys.path().file_name().unwrap().to_str().unwrap().to_string();
        let rules = TempFile::with_contents(
            "rules.conf",
            &format!("jwt {{\n  path /api\n  keys {key_name}\n}}\njwt /open\n"),
        );

        let table = load_rules(rules.path()).unwrap();

        assert_eq!(paths(&table), vec!["/api", "/open"]);
        assert!(table.first_match("/api").unwrap().keys().find("key-1").is_some());
    }

    #[test]
    fn test_load_rules_missing_file() {
        assert!(matches!(
            load_rules(Path::new("/nonexistent/jwt-gate/rules.conf")),
            Err(RuleLoadError::Io { .. })
        ));
    }

    #[test]
    fn test_load_rules_invalid_key_file() {
        let keys = TempFile::with_contents("bad-keys.json", "{ not json");
        let rules = TempFile::with_contents(
            "rules.conf",
            &format!("jwt {{\npath /api\nkeys \"{}\"\n}}", keys.path_str()),
        );

        assert!(matches!(
            load_rules(rules.path()),
            Err(RuleLoadError::Keys(KeySetError::Json { .. }))
        ));
    }
}
