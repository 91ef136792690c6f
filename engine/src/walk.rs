//! The parse state machine.
//!
//! A context-sensitive recursive-descent walker over the token stream and
//! the command tree at once. At the current node each iteration matches the
//! next token against, in order: the literal-rest separator, a flag visible
//! in the scope stack (innermost first), the node's positional schedule, a
//! child command name, a branch child (by decoding its key), and finally the
//! node's default child. Anything else is a user error.
//!
//! The walker only records what it saw — path elements, per-element
//! residual tokens, and raw decoded values. Defaults, resolvers, hooks, and
//! constraint validation run afterwards in the context's apply phase, so
//! trace mode can hand back a partial path with the error attached.

use std::collections::HashMap;

use tracing::debug;

use arg_grammar_core::{Passthrough, Sep, Value};

use crate::context::{Context, PathElement, TracedElement};
use crate::decode::{DecodeContext, decode_literal};
use crate::error::ParseError;
use crate::node::{FlagRef, Grammar, NodeId, NodeKind};
use crate::scan::{Scanner, Token, TokenKind};

impl Grammar {
    /// Parses an argument vector, applying defaults, resolvers, hooks, and
    /// constraints. Fails fast on the first user error.
    pub fn parse<I, S>(&self, args: I) -> Result<Context<'_>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ctx = self.trace(args);
        if let Some(error) = ctx.error.take() {
            return Err(error);
        }
        ctx.apply()?;
        Ok(ctx)
    }

    /// Walks the token stream without failing: on a user error the partial
    /// path is kept and the error is recorded in the context. Used by help
    /// and completion machinery that needs the deepest reachable node.
    pub fn trace<I, S>(&self, args: I) -> Context<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut walker = Walker {
            grammar: self,
            scanner: Scanner::new(args),
            frames: vec![Frame {
                node: self.root,
                next_positional: 0,
            }],
            path: Vec::new(),
            parsed: HashMap::new(),
        };
        walker.push_element(PathElement::App { node: self.root });
        let error = walker.walk().err();
        Context::from_trace(self, walker.path, walker.parsed, error)
    }
}

struct Frame {
    node: NodeId,
    next_positional: usize,
}

struct Walker<'g> {
    grammar: &'g Grammar,
    scanner: Scanner,
    frames: Vec<Frame>,
    path: Vec<TracedElement>,
    parsed: HashMap<String, Value>,
}

impl Walker<'_> {
    fn walk(&mut self) -> Result<(), ParseError> {
        loop {
            let Some(token) = self.scanner.peek() else { break };
            if token.is_rest_separator() && !self.scanner.is_literal() {
                self.scanner.pop();
                self.scanner.enter_literal();
                continue;
            }
            if token.is_flag_like() && !self.passthrough_capturing() {
                self.handle_flag()?;
            } else {
                self.handle_plain()?;
            }
        }

        // Default-command selection once input is exhausted.
        loop {
            let node = self.grammar.node(self.current());
            let Some((child, _)) = node.default_child else { break };
            debug!(command = %self.grammar.node(child).name, "selected default command");
            self.enter_child(child);
        }
        Ok(())
    }

    fn current(&self) -> NodeId {
        self.frames.last().expect("frames never empty").node
    }

    fn stack(&self) -> Vec<NodeId> {
        self.frames.iter().map(|f| f.node).collect()
    }

    fn push_element(&mut self, element: PathElement) {
        let remainder = self.scanner.remainder();
        self.path.push(TracedElement { element, remainder });
    }

    fn enter_child(&mut self, child: NodeId) {
        self.frames.push(Frame {
            node: child,
            next_positional: 0,
        });
        self.push_element(PathElement::Command { node: child });
    }

    /// Passthrough mode of the pending positional, if any.
    fn pending_passthrough(&self) -> Passthrough {
        let frame = self.frames.last().expect("frames never empty");
        self.grammar
            .node(frame.node)
            .passthrough_at(frame.next_positional)
    }

    /// Whether an all-mode passthrough positional has already captured a
    /// token. From that point on flag parsing stops entirely and every
    /// remaining token is captured verbatim.
    fn passthrough_capturing(&self) -> bool {
        let frame = self.frames.last().expect("frames never empty");
        let node = self.grammar.node(frame.node);
        match node.positionals.get(frame.next_positional) {
            Some(pos) if pos.spec.passthrough == Passthrough::All => {
                self.parsed.contains_key(&pos.path)
            }
            _ => false,
        }
    }

    fn handle_flag(&mut self) -> Result<(), ParseError> {
        let token = self.scanner.pop().expect("caller peeked");
        if let Some(body) = token.text.strip_prefix("--") {
            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (body, None),
            };
            if let Some(fref) = self.grammar.lookup_long(&self.stack(), name) {
                if let Some(value) = inline {
                    self.scanner.push(Token::value(value));
                }
                return self.decode_flag(fref);
            }
            let display = format!("--{name}");
            self.unmatched_flag(token, display)
        } else {
            let body = token.text.strip_prefix('-').expect("flag-like token");
            let first = body.chars().next().expect("flag-like token is non-empty");
            if let Some(fref) = self.grammar.lookup_short(&self.stack(), first) {
                let rest = &body[first.len_utf8()..];
                if !rest.is_empty() {
                    let flag = &self.grammar.node(fref.node).flags[fref.index];
                    if flag.spec.ty.is_bool() {
                        // Bundled boolean shorts: -abc expands to -a -bc.
                        self.scanner.push(Token::untyped(format!("-{rest}")));
                    } else {
                        // The remainder is this flag's value: -ohello.
                        self.scanner.push(Token::value(rest));
                    }
                }
                return self.decode_flag(fref);
            }
            let display = format!("-{first}");
            self.unmatched_flag(token, display)
        }
    }

    /// An unresolvable flag token: captured by a passthrough-all positional,
    /// retried inside the default child, or reported.
    fn unmatched_flag(&mut self, token: Token, display: String) -> Result<(), ParseError> {
        if self.pending_passthrough() == Passthrough::All {
            self.scanner.push(token);
            self.bind_positional()?;
            return Ok(());
        }
        if let Some((child, _)) = self.grammar.node(self.current()).default_child {
            self.scanner.push(token);
            self.enter_child(child);
            return Ok(());
        }
        Err(ParseError::UnknownFlag(display))
    }

    fn decode_flag(&mut self, fref: FlagRef) -> Result<(), ParseError> {
        let grammar = self.grammar;
        let flag = &grammar.node(fref.node).flags[fref.index];
        let existing = flag
            .spec
            .cumulative
            .then(|| self.parsed.remove(&flag.path))
            .flatten();
        let mut dctx = DecodeContext {
            scanner: &mut self.scanner,
            sep: flag.spec.sep,
            mapsep: flag.spec.mapsep,
            existing,
            allow_hyphen: grammar.allow_hyphen_values,
        };
        let value = flag.decoder.decode(&mut dctx).map_err(|err| ParseError::Decode {
            context: format!("--{}", flag.spec.name),
            message: err.0,
        })?;
        // Negation names invert the decoded boolean: --no-flag is false,
        // --no-flag=false is true.
        let value = if fref.negated {
            match value {
                Value::Bool(b) => Value::Bool(!b),
                other => other,
            }
        } else {
            value
        };
        debug!(flag = %flag.spec.name, negated = fref.negated, "matched flag");
        self.parsed.insert(flag.path.clone(), value);
        self.push_element(PathElement::Flag {
            node: fref.node,
            index: fref.index,
        });
        Ok(())
    }

    fn handle_plain(&mut self) -> Result<(), ParseError> {
        if self.bind_positional()? {
            return Ok(());
        }
        let token = self.scanner.peek().expect("caller peeked").clone();
        if token.kind == TokenKind::Untyped {
            if let Some(child) = self.match_command(&token.text) {
                self.scanner.pop();
                debug!(command = %self.grammar.node(child).name, "entered command");
                self.enter_child(child);
                return Ok(());
            }
        }
        if self.try_branches()? {
            return Ok(());
        }
        if let Some((child, _)) = self.grammar.node(self.current()).default_child {
            self.enter_child(child);
            return Ok(());
        }
        Err(ParseError::UnexpectedArgument(token.text))
    }

    /// Binds the next token to the pending positional, if the schedule has
    /// one. Cumulative positionals keep the slot and accumulate.
    fn bind_positional(&mut self) -> Result<bool, ParseError> {
        let grammar = self.grammar;
        let (node_id, index) = {
            let frame = self.frames.last().expect("frames never empty");
            (frame.node, frame.next_positional)
        };
        let Some(pos) = grammar.node(node_id).positionals.get(index) else {
            return Ok(false);
        };
        let token = self.scanner.pop().expect("caller peeked");
        // Re-queue as an explicit value so the decoder accepts it verbatim,
        // hyphen-prefixed passthrough captures included.
        self.scanner.push(Token::value(token.text));
        let existing = pos
            .spec
            .cumulative
            .then(|| self.parsed.remove(&pos.path))
            .flatten();
        let mut dctx = DecodeContext {
            scanner: &mut self.scanner,
            // Positionals consume whole tokens; separator splitting is a
            // flag-value discipline.
            sep: Sep::Disabled,
            mapsep: pos.spec.mapsep,
            existing,
            allow_hyphen: true,
        };
        let value = pos.decoder.decode(&mut dctx).map_err(|err| ParseError::Decode {
            context: format!("<{}>", pos.spec.name),
            message: err.0,
        })?;
        self.parsed.insert(pos.path.clone(), value);
        if !pos.spec.cumulative {
            self.frames
                .last_mut()
                .expect("frames never empty")
                .next_positional += 1;
        }
        self.push_element(PathElement::Positional {
            node: node_id,
            index,
        });
        Ok(true)
    }

    fn match_command(&self, text: &str) -> Option<NodeId> {
        let node = self.grammar.node(self.current());
        node.children.iter().copied().find(|&child| {
            let child = self.grammar.node(child);
            child.kind == NodeKind::Command
                && (child.name == text || child.aliases.iter().any(|a| a == text))
        })
    }

    /// Tries branch children in declaration order; the first whose key
    /// decodes from the pending token wins.
    fn try_branches(&mut self) -> Result<bool, ParseError> {
        let grammar = self.grammar;
        let current = grammar.node(self.current());
        let text = self.scanner.peek().expect("caller peeked").text.clone();
        for &child_id in &current.children {
            let child = grammar.node(child_id);
            if child.kind != NodeKind::Branch {
                continue;
            }
            let key = &child.positionals[0];
            if let Ok(value) =
                decode_literal(key.decoder.as_ref(), &text, Sep::Disabled, key.spec.mapsep)
            {
                self.scanner.pop();
                self.parsed.insert(key.path.clone(), value);
                self.frames.push(Frame {
                    node: child_id,
                    next_positional: 1,
                });
                self.push_element(PathElement::Branch { node: child_id });
                debug!(branch = %child.name, "entered branch");
                return Ok(true);
            }
        }
        Ok(false)
    }
}
