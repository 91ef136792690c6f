//! Cross-field constraint validation.
//!
//! Runs after values are applied: required positionals must be bound, a
//! node with children must have selected one (unless it is runnable
//! itself), xor groups admit at most one explicitly-set member, and groups
//! are all-or-none, and required flags produce a single "missing flags:"
//! message grouped by their xor/and relationships (xor members joined with
//! "or", and members with "and"). Flags and positionals both participate
//! in group constraints; member names are reported in display form
//! (`--flag`, `<positional>`).

use std::collections::{BTreeMap, HashSet};

use arg_grammar_core::{FieldKind, FieldSpec};

use crate::error::ParseError;
use crate::node::{Grammar, NodeId, NodeKind};

/// Required positionals of every node on the path must have a value, unless
/// an xor sibling of theirs is satisfied (the group stands in for them).
pub(crate) fn check_positionals(
    grammar: &Grammar,
    path_nodes: &[NodeId],
    satisfied: &HashSet<String>,
) -> Result<(), ParseError> {
    let fields = visible_fields(grammar, path_nodes);
    let mut satisfied_tags: HashSet<&str> = HashSet::new();
    for (spec, path) in &fields {
        if satisfied.contains(*path) {
            satisfied_tags.extend(spec.xor.iter().map(String::as_str));
        }
    }

    let mut missing = Vec::new();
    for &node_id in path_nodes {
        for pos in &grammar.node(node_id).positionals {
            if pos.spec.required
                && !satisfied.contains(&pos.path)
                && !pos
                    .spec
                    .xor
                    .iter()
                    .any(|tag| satisfied_tags.contains(tag.as_str()))
            {
                missing.push(pos.spec.display());
            }
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ParseError::MissingPositionals(missing.join(" ")))
    }
}

/// A node with children is not a valid stopping point unless it carries an
/// action of its own.
pub(crate) fn check_selection(
    grammar: &Grammar,
    deepest: NodeId,
) -> Result<(), ParseError> {
    let node = grammar.node(deepest);
    if node.children.is_empty() || grammar.actions.contains_key(&deepest) {
        return Ok(());
    }
    let expected: Vec<String> = node
        .children
        .iter()
        .map(|&child| {
            let child = grammar.node(child);
            match child.kind {
                NodeKind::Branch => format!("\"<{}>\"", child.name),
                _ => format!("\"{}\"", child.name),
            }
        })
        .collect();
    Err(ParseError::ExpectedChild(expected.join(" or ")))
}

/// Enforces xor ("at most one set") and and ("all or none") groups over the
/// fields visible along the path, counting only explicitly-set fields
/// (parse-time or resolver-provided; defaults never trigger group logic).
pub(crate) fn check_groups(
    grammar: &Grammar,
    path_nodes: &[NodeId],
    explicit: &HashSet<String>,
) -> Result<(), ParseError> {
    let fields = visible_fields(grammar, path_nodes);

    let mut xor_groups: BTreeMap<&str, Vec<(&FieldSpec, bool)>> = BTreeMap::new();
    let mut and_groups: BTreeMap<&str, Vec<(&FieldSpec, bool)>> = BTreeMap::new();
    for (spec, path) in &fields {
        let set = explicit.contains(*path);
        for tag in &spec.xor {
            xor_groups.entry(tag).or_default().push((spec, set));
        }
        for tag in &spec.and {
            and_groups.entry(tag).or_default().push((spec, set));
        }
    }

    for members in xor_groups.values() {
        let mut set_members = members.iter().filter(|(_, set)| *set);
        if let (Some((first, _)), Some((second, _))) = (set_members.next(), set_members.next()) {
            return Err(ParseError::XorConflict {
                first: first.display(),
                second: second.display(),
            });
        }
    }

    for members in and_groups.values() {
        let any_set = members.iter().any(|(_, set)| *set);
        let all_set = members.iter().all(|(_, set)| *set);
        if any_set && !all_set {
            let present = members.iter().find(|(_, set)| *set).expect("any_set");
            let missing = members.iter().find(|(_, set)| !*set).expect("!all_set");
            return Err(ParseError::AndMissing {
                present: present.0.display(),
                missing: missing.0.display(),
            });
        }
    }

    Ok(())
}

/// Builds the grouped "missing flags:" error when required flags are left
/// without any value (parse, resolver, or default). Positionals take part
/// in the group entries; on their own they are `check_positionals`' job.
pub(crate) fn check_required(
    grammar: &Grammar,
    path_nodes: &[NodeId],
    satisfied: &HashSet<String>,
) -> Result<(), ParseError> {
    let fields = visible_fields(grammar, path_nodes);

    let mut entries: Vec<String> = Vec::new();
    let mut grouped: HashSet<&str> = HashSet::new();

    // Group entries: a required, unsatisfied member pulls in its whole
    // group, joined with "or" (xor) or "and" (and).
    let mut xor_groups: BTreeMap<&str, Vec<(&FieldSpec, &str)>> = BTreeMap::new();
    let mut and_groups: BTreeMap<&str, Vec<(&FieldSpec, &str)>> = BTreeMap::new();
    for entry in &fields {
        for tag in &entry.0.xor {
            xor_groups.entry(tag).or_default().push(*entry);
        }
        for tag in &entry.0.and {
            and_groups.entry(tag).or_default().push(*entry);
        }
    }

    for (groups, joiner) in [(&xor_groups, " or "), (&and_groups, " and ")] {
        for members in groups.values() {
            let any_satisfied = members.iter().any(|(_, path)| satisfied.contains(*path));
            let unmet: Vec<&FieldSpec> = members
                .iter()
                .filter(|(spec, path)| spec.required && !satisfied.contains(*path))
                .map(|(spec, _)| *spec)
                .collect();
            if any_satisfied || unmet.is_empty() {
                continue;
            }
            let mut names: Vec<String> = unmet.iter().map(|spec| spec.display()).collect();
            names.sort();
            names.dedup();
            for (spec, _) in members {
                grouped.insert(spec.name.as_str());
            }
            entries.push(names.join(joiner));
        }
    }

    for (spec, path) in &fields {
        if spec.kind == FieldKind::Flag
            && spec.required
            && !satisfied.contains(*path)
            && spec.xor.is_empty()
            && spec.and.is_empty()
            && !grouped.contains(spec.name.as_str())
        {
            entries.push(spec.display());
        }
    }

    if entries.is_empty() {
        return Ok(());
    }
    entries.sort();
    entries.dedup();
    Err(ParseError::MissingFlags(entries.join(", ")))
}

/// Flags and positionals of every node on the path, in node order.
fn visible_fields<'g>(
    grammar: &'g Grammar,
    path_nodes: &[NodeId],
) -> Vec<(&'g FieldSpec, &'g str)> {
    path_nodes
        .iter()
        .flat_map(|&id| {
            let node = grammar.node(id);
            node.flags
                .iter()
                .map(|flag| (&flag.spec, flag.path.as_str()))
                .chain(
                    node.positionals
                        .iter()
                        .map(|pos| (&pos.spec, pos.path.as_str())),
                )
        })
        .collect()
}
