//! Rendering a tokenized [`Buffer`] in each of the output [`Format`]s.

use std::fmt::Write;

use bramble::Buffer;
use bramble_grammar::{NodeId, Repository};
use serde_json::{json, Value};

use crate::config::Format;

pub fn render(buffer: &Buffer, format: Format) -> String {
    let repo = buffer.lang().repository();
    match format {
        Format::Tokens => render_tokens(buffer, repo),
        Format::Json => {
            let value = json_tokens(buffer, repo);
            // Serializing a `Value` can't fail
            serde_json::to_string_pretty(&value).unwrap_or_default() + "\n"
        }
        Format::Outline => {
            let mut s = String::new();
            // Writing to a `String` can't fail
            let _ = buffer.outline().write_tree(&mut s, repo, buffer.text());
            s
        }
    }
}

/// One line per token: `start..end  type  +opens -closes  "text"`
fn render_tokens(buffer: &Buffer, repo: &Repository) -> String {
    let mut s = String::new();
    for token in buffer.tokens() {
        let ty = token.ty.map_or("-", |id| label(repo, id));
        let _ = write!(s, "{:>5}..{:<5} {:<24}", token.start, token.end, ty);
        for &id in &token.opens {
            let _ = write!(s, " +{}", label(repo, id));
        }
        for &id in &token.closes {
            let _ = write!(s, " -{}", label(repo, id));
        }
        let _ = writeln!(s, " {:?}", buffer.token_text(token));
    }
    for &id in buffer.unclosed() {
        let _ = writeln!(s, "unclosed: {}", label(repo, id));
    }
    s
}

fn json_tokens(buffer: &Buffer, repo: &Repository) -> Value {
    let labels = |ids: &[NodeId]| ids.iter().map(|&id| label(repo, id)).collect::<Vec<_>>();
    let tokens = buffer
        .tokens()
        .iter()
        .map(|token| {
            json!({
                "start": token.start,
                "end": token.end,
                "type": token.ty.map(|id| label(repo, id)),
                "opens": labels(&token.opens),
                "closes": labels(&token.closes),
                "text": buffer.token_text(token),
            })
        })
        .collect::<Vec<_>>();
    json!({
        "lang": buffer.lang().name(),
        "tokens": tokens,
        "unclosed": labels(buffer.unclosed()),
    })
}

/// The name of a node, falling back on its identifier
fn label(repo: &Repository, id: NodeId) -> &str {
    let node = repo.node(id);
    node.metadata().name.as_deref().unwrap_or_else(|| node.ident())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bramble::{Buffer, Lang};

    use super::render;
    use crate::config::Format;

    fn buffer(text: &str) -> Buffer {
        let lang = Lang::from_json(
            r#"{
                "name": "Pairs",
                "patterns": [{
                    "name": "pair",
                    "begin": "\\(",
                    "end": "\\)",
                    "patterns": [{ "name": "digit", "match": "\\d" }]
                }]
            }"#,
        )
        .unwrap();
        Buffer::from_text(text.to_owned(), Arc::new(lang)).unwrap()
    }

    #[test]
    fn json() {
        let out = render(&buffer("(1)"), Format::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["lang"], "Pairs");
        assert_eq!(value["tokens"][0]["opens"][0], "pair");
        assert_eq!(value["tokens"][1]["type"], "digit");
        assert_eq!(value["tokens"][1]["text"], "1");
        assert_eq!(value["tokens"][2]["closes"][0], "pair");
        assert_eq!(value["tokens"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn tokens() {
        let out = render(&buffer("(1)"), Format::Tokens);
        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("+pair \"(\""));
        assert!(lines[1].contains("digit"));
        assert!(lines[2].ends_with("-pair \")\""));
    }

    #[test]
    fn outline() {
        let out = render(&buffer("x(1)"), Format::Outline);
        assert_eq!(out, "pair 1..4 \"(1)\"\n");
    }
}
