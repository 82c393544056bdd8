use crate::compiler::{NsBinding, Test};
use crate::error::{Error, ErrorCode};
use crate::model::{Node, NodeKind};
use crate::namespaces::NamespaceResolver;
use crate::parser::ast::{Axis, KindTest};

/// Nodes on `axis` from `node`; reverse axes nearest first.
pub(super) fn collect(axis: Axis, node: &Node) -> Result<Vec<Node>, Error> {
    Ok(match axis {
        Axis::SelfAxis => vec![node.clone()],
        Axis::Child => node.children(),
        Axis::Attribute => {
            if node.is_element() {
                node.attributes()
            } else {
                Vec::new()
            }
        }
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Ancestor => ancestors(node),
        Axis::AncestorOrSelf => {
            let mut out = vec![node.clone()];
            out.extend(ancestors(node));
            out
        }
        Axis::Descendant => node.descendants(),
        Axis::DescendantOrSelf => {
            let mut out = vec![node.clone()];
            out.extend(node.descendants());
            out
        }
        Axis::FollowingSibling => node.following_siblings(),
        Axis::PrecedingSibling => node.preceding_siblings(),
        Axis::Following => following(node),
        Axis::Preceding => preceding(node),
        Axis::Namespace => {
            return Err(Error::from_code(ErrorCode::XPST0010, "the namespace axis is not supported"));
        }
    })
}

fn ancestors(node: &Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cur = node.parent();
    while let Some(p) = cur {
        cur = p.parent();
        out.push(p);
    }
    out
}

fn following(node: &Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cur = node.clone();
    if node.kind() == NodeKind::Attribute {
        let Some(owner) = node.parent() else {
            return out;
        };
        out.extend(owner.descendants());
        cur = owner;
    }
    loop {
        for sibling in cur.following_siblings() {
            out.push(sibling.clone());
            out.extend(sibling.descendants());
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => break,
        }
    }
    out
}

fn preceding(node: &Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cur = match node.kind() {
        NodeKind::Attribute => match node.parent() {
            Some(owner) => owner,
            None => return out,
        },
        _ => node.clone(),
    };
    loop {
        for sibling in cur.preceding_siblings() {
            let mut inner = sibling.descendants();
            inner.reverse();
            out.extend(inner);
            out.push(sibling);
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => break,
        }
    }
    out
}

fn principal_kind(axis: Axis) -> NodeKind {
    match axis {
        Axis::Attribute => NodeKind::Attribute,
        _ => NodeKind::Element,
    }
}

fn resolve<'n>(binding: &'n NsBinding, ns: &'n NamespaceResolver) -> Result<Option<&'n str>, Error> {
    match binding {
        NsBinding::Default => Ok(None),
        NsBinding::Uri(uri) => Ok(Some(uri.as_str())),
        NsBinding::Unresolved(prefix) => ns.lookup(prefix).map(Some).ok_or_else(|| {
            Error::from_code(ErrorCode::XPST0081, format!("unknown namespace prefix {prefix:?}"))
        }),
    }
}

/// Fail early when a name test's prefix is unknown to the live resolver.
pub(super) fn check_prefix(test: &Test, ns: &NamespaceResolver) -> Result<(), Error> {
    match test {
        Test::PrincipalInNamespace(binding) | Test::Name { ns: binding, .. } => resolve(binding, ns).map(|_| ()),
        _ => Ok(()),
    }
}

pub(super) fn matches(test: &Test, axis: Axis, node: &Node, ns: &NamespaceResolver) -> Result<bool, Error> {
    Ok(match test {
        Test::Kind(KindTest::AnyNode) => true,
        Test::Kind(KindTest::Text) => node.kind() == NodeKind::Text,
        Test::Kind(KindTest::Comment) => node.kind() == NodeKind::Comment,
        Test::ProcessingInstruction(target) => {
            node.kind() == NodeKind::ProcessingInstruction
                && target.as_deref().is_none_or(|t| node.local_name() == t)
        }
        Test::Principal => node.kind() == principal_kind(axis),
        Test::PrincipalInNamespace(binding) => {
            node.kind() == principal_kind(axis) && node.namespace_uri() == resolve(binding, ns)?
        }
        Test::Name { ns: binding, local } => {
            if node.kind() != principal_kind(axis) || node.local_name() != local {
                return Ok(false);
            }
            match binding {
                // Unprefixed element names also match the resolver's
                // default namespace when one is registered.
                NsBinding::Default => match node.namespace_uri() {
                    None => true,
                    Some(uri) => node.is_element() && ns.lookup("") == Some(uri),
                },
                other => node.namespace_uri() == resolve(other, ns)?,
            }
        }
    })
}
