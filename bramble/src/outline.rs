//! Folding a flat token stream back into the tree of scopes it describes.

use std::fmt;

use bramble_grammar::{NodeId, Repository, Token};

/// The tree of scopes described by the `opens` and `closes` of a token stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    /// The outermost scopes, in document order
    pub roots: Vec<Scope>,
    /// Closes which didn't match the innermost open scope
    pub mismatched: Vec<Mismatch>,
}

/// A single scope, spanning from the start of the token which opened it to the end of the token
/// which closed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub node: NodeId,
    pub start: usize,
    /// `None` if the scope is never closed
    pub end: Option<usize>,
    pub children: Vec<Scope>,
}

/// A `closes` entry which doesn't match the innermost open scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub node: NodeId,
    /// The end of the token carrying the close
    pub pos: usize,
    /// The innermost scope which was open at the time
    pub expected: Option<NodeId>,
}

impl Outline {
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let mut outline = Outline::default();
        // Scopes which have been opened but not closed, outermost first
        let mut stack = Vec::<Scope>::new();
        for token in tokens {
            for &node in &token.opens {
                stack.push(Scope {
                    node,
                    start: token.start,
                    end: None,
                    children: Vec::new(),
                });
            }
            for &node in &token.closes {
                let expected = stack.last().map(|scope| scope.node);
                if expected != Some(node) {
                    outline.mismatched.push(Mismatch {
                        node,
                        pos: token.end,
                        expected,
                    });
                    continue;
                }
                if let Some(mut scope) = stack.pop() {
                    scope.end = Some(token.end);
                    attach(scope, &mut stack, &mut outline.roots);
                }
            }
        }
        // Attach the unclosed scopes, innermost first
        while let Some(scope) = stack.pop() {
            attach(scope, &mut stack, &mut outline.roots);
        }
        outline
    }

    /// `true` if every scope is closed by the innermost open scope
    pub fn is_balanced(&self) -> bool {
        fn all_closed(scopes: &[Scope]) -> bool {
            scopes
                .iter()
                .all(|s| s.end.is_some() && all_closed(&s.children))
        }
        self.mismatched.is_empty() && all_closed(&self.roots)
    }

    /// Write this `Outline` as an indented tree, one scope per line
    pub fn write_tree(&self, w: &mut impl fmt::Write, repo: &Repository, text: &str) -> fmt::Result {
        for scope in &self.roots {
            scope.write_tree(w, repo, text, 0)?;
        }
        for mismatch in &self.mismatched {
            writeln!(
                w,
                "!! unexpected close of {} at {}",
                repo.node(mismatch.node).ident(),
                mismatch.pos
            )?;
        }
        Ok(())
    }
}

impl Scope {
    fn write_tree(
        &self,
        w: &mut impl fmt::Write,
        repo: &Repository,
        text: &str,
        indent: usize,
    ) -> fmt::Result {
        let node = repo.node(self.node);
        let label = node.metadata().name.as_deref().unwrap_or_else(|| node.ident());
        let end = self.end.unwrap_or_else(|| text.len());
        let preview = text.get(self.start..end).unwrap_or("");
        let mut preview = preview.lines().next().unwrap_or("").to_owned();
        if preview.chars().count() > 30 {
            preview = preview.chars().take(29).chain(std::iter::once('…')).collect();
        }
        write!(w, "{:indent$}{} {}..{}", "", label, self.start, end, indent = indent * 2)?;
        if self.end.is_none() {
            w.write_str(" (unclosed)")?;
        }
        writeln!(w, " {:?}", preview)?;
        for child in &self.children {
            child.write_tree(w, repo, text, indent + 1)?;
        }
        Ok(())
    }
}

fn attach(scope: Scope, stack: &mut [Scope], roots: &mut Vec<Scope>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(scope),
        None => roots.push(scope),
    }
}

#[cfg(test)]
mod tests {
    use bramble_grammar::{NodeId, Token};

    use super::{Mismatch, Outline, Scope};

    fn tok(start: usize, end: usize, opens: &[usize], closes: &[usize]) -> Token {
        let mut token = Token::new(None, start, end);
        token.opens = opens.iter().copied().map(NodeId::new).collect();
        token.closes = closes.iter().copied().map(NodeId::new).collect();
        token
    }

    fn scope(node: usize, start: usize, end: Option<usize>, children: Vec<Scope>) -> Scope {
        Scope {
            node: NodeId::new(node),
            start,
            end,
            children,
        }
    }

    #[test]
    fn nested() {
        // `(x[y])`
        let tokens = [
            tok(0, 1, &[1], &[]),
            tok(1, 2, &[], &[]),
            tok(2, 3, &[2], &[]),
            tok(3, 4, &[3], &[3]),
            tok(4, 5, &[], &[2]),
            tok(5, 6, &[], &[1]),
        ];
        let outline = Outline::from_tokens(&tokens);
        assert_eq!(
            outline.roots,
            vec![scope(
                1,
                0,
                Some(6),
                vec![scope(2, 2, Some(5), vec![scope(3, 3, Some(4), vec![])])]
            )]
        );
        assert!(outline.is_balanced());
    }

    #[test]
    fn unclosed_and_mismatched() {
        let tokens = [
            tok(0, 1, &[1], &[]),
            tok(1, 2, &[2], &[]),
            tok(2, 3, &[], &[1]),
        ];
        let outline = Outline::from_tokens(&tokens);
        assert_eq!(
            outline.roots,
            vec![scope(1, 0, None, vec![scope(2, 1, None, vec![])])]
        );
        assert_eq!(
            outline.mismatched,
            vec![Mismatch {
                node: NodeId::new(1),
                pos: 3,
                expected: Some(NodeId::new(2)),
            }]
        );
        assert!(!outline.is_balanced());
    }
}
