use bramble_grammar::{NodeId, Repository, SpecGrammar, Token, TokenizerConfig};
use proptest::prelude::*;
use serde_json::json;

/// A cut-down JSON grammar, with enough nesting and captures to exercise every kind of rule
fn json_repo() -> Repository {
    let grammar = json!({
        "name": "JSON",
        "scopeName": "source.json",
        "patterns": [{ "include": "#value" }],
        "repository": {
            "value": {
                "patterns": [
                    { "include": "#object" },
                    { "include": "#array" },
                    { "include": "#string" },
                    { "include": "#number" },
                    { "name": "constant.language", "match": "true|false|null" }
                ]
            },
            "object": {
                "name": "meta.object",
                "begin": "\\{",
                "end": "\\}",
                "brackets": true,
                "patterns": [
                    {
                        "name": "meta.key",
                        "match": "(\"[^\"]*\")\\s*(:)",
                        "captures": {
                            "1": { "patterns": [{ "include": "#string" }] },
                            "2": { "name": "punctuation.separator" }
                        }
                    },
                    { "include": "#value" },
                    { "name": "punctuation.comma", "match": "," }
                ]
            },
            "array": {
                "name": "meta.array",
                "begin": "\\[",
                "end": "\\]",
                "brackets": true,
                "patterns": [
                    { "include": "#value" },
                    { "name": "punctuation.comma", "match": "," }
                ]
            },
            "string": {
                "name": "string.quoted",
                "contentName": "string.content",
                "begin": "\"",
                "end": "\"",
                "patterns": [{ "name": "constant.escape", "match": "\\\\." }]
            },
            "number": { "name": "constant.numeric", "match": "-?\\d+(\\.\\d+)?" }
        }
    });
    serde_json::from_value::<SpecGrammar>(grammar)
        .unwrap()
        .into_repository()
        .unwrap()
}

fn assert_covers(tokens: &[Token], len: usize) {
    let mut pos = 0;
    for t in tokens {
        assert_eq!(t.start, pos);
        assert!(t.end >= t.start);
        pos = t.end;
    }
    assert_eq!(pos, len);
}

/// Folds the opens and closes of `tokens` over a stack, checking that every scope is closed by
/// the innermost open scope
fn assert_balanced(tokens: &[Token]) {
    let mut stack = Vec::<NodeId>::new();
    for t in tokens {
        stack.extend(t.opens.iter().copied());
        for &closed in &t.closes {
            assert_eq!(stack.pop(), Some(closed));
        }
    }
    assert!(stack.is_empty());
}

proptest! {
    #[test]
    fn json_fragments_are_covered(text in "[\\[\\]{}\",:0-9a-z \\\\.-]{0,40}") {
        let repo = json_repo();
        let tokens = repo.tokenize(&text).unwrap();
        assert_covers(&tokens.tokens, text.len());
        assert_balanced(&tokens.tokens);
        prop_assert!(tokens.unclosed.is_empty());
    }

    #[test]
    fn arbitrary_text_is_covered(text in "\\PC{0,30}") {
        let repo = json_repo();
        let tokens = repo.tokenize(&text).unwrap();
        assert_covers(&tokens.tokens, text.len());
        assert_balanced(&tokens.tokens);
    }

    #[test]
    fn unmatched_text_is_one_token_per_char(text in "[^x]{0,30}") {
        let grammar = json!({ "patterns": [{ "name": "x", "match": "x" }] });
        let repo = serde_json::from_value::<SpecGrammar>(grammar)
            .unwrap()
            .into_repository()
            .unwrap();

        let tokens = repo.tokenize(&text).unwrap().tokens;
        prop_assert_eq!(tokens.len(), text.chars().count());
        prop_assert!(tokens.iter().all(Token::is_plain));
        assert_covers(&tokens, text.len());

        let config = TokenizerConfig { merge_unmatched: true, ..TokenizerConfig::default() };
        let merged = repo.tokenize_with(&text, &config).unwrap().tokens;
        prop_assert_eq!(merged.len(), if text.is_empty() { 0 } else { 1 });
        assert_covers(&merged, text.len());
    }
}

#[test]
fn json_document() {
    let repo = json_repo();
    let text = r#"{"a": [1, -2.5, "x\"y"], "b": null}"#;
    let tokens = repo.tokenize(text).unwrap().tokens;
    assert_covers(&tokens, text.len());
    assert_balanced(&tokens);

    let key = repo.node_id("object-p0").unwrap();
    let numeric = repo.node_id("number").unwrap();
    let escape = repo.node_id("string-p0").unwrap();
    let count = |id| tokens.iter().filter(|t| t.ty == Some(id) || t.opens.contains(&id)).count();
    assert_eq!(count(key), 2);
    assert_eq!(count(numeric), 2);
    assert_eq!(count(escape), 1);
}
