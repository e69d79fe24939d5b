//! Substitution: inlining variable references and pattern calls.
//!
//! This is the first pass over parser output. It eliminates every `Var` and
//! `Call` node under lexical scoping rules: a pattern body is evaluated in
//! the environment the pattern *captured* when it was defined, extended with
//! its parameters; arguments are evaluated in the caller's environment. The
//! caller's other bindings never leak into the body.
//!
//! Missing names are a hard error, not a default, and a call with the wrong
//! number of arguments always fails rather than truncating or padding.

use crate::ast::{walk, Call, Env, Node, Pattern};
use crate::diagnostics::SkeinError;

/// Bakes `env` into every pattern definition in `node`, so the pattern
/// closes over the names visible where it was defined.
///
/// Called by the loader when a pattern is named, before any call-site
/// substitution happens. Captured environments are never mutated afterward.
pub fn enclose(node: &Node, env: &Env) -> Node {
    match node {
        Node::Pattern(pattern) => {
            Node::Pattern(Pattern { env: Some(env.clone()), ..pattern.clone() })
        }
        _ => infallible(walk::map_children(node, &mut |child| Ok(enclose(child, env)))),
    }
}

fn infallible(result: Result<Node, std::convert::Infallible>) -> Node {
    match result {
        Ok(node) => node,
        Err(never) => match never {},
    }
}

/// Substitutes all variables and calls in `node` with their equivalent
/// expressions under `env`.
///
/// A variable lookup returns the bound node as-is, without recursing into
/// it: patterns fetched by name come out with their bodies unsubstituted and
/// their captured environment still attached.
pub fn substitute(node: &Node, env: &Env) -> Result<Node, SkeinError> {
    match node {
        Node::Var(var) => {
            env.get(&var.name).cloned().ok_or_else(|| SkeinError::unbound(&var.name, var.span))
        }
        Node::Call(call) => match do_call(call, env)? {
            Some(result) => Ok(result),
            None => Err(SkeinError::type_error(
                format!("call to `{}` produced no value in pattern position", call.target.pretty()),
                call.span,
            )),
        },
        _ => walk::map_children(node, &mut |child| substitute(child, env)),
    }
}

/// Evaluates a call and returns its result.
///
/// Pattern targets are arity-checked and have their body substituted under
/// the captured environment extended with the parameter bindings. Native
/// targets are invoked directly with the substituted arguments and may
/// return nothing; statement-position callers (the loader) accept that,
/// [`substitute`] does not.
pub fn do_call(call: &Call, env: &Env) -> Result<Option<Node>, SkeinError> {
    let target = match call.target.as_ref() {
        Node::Var(var) => {
            env.get(&var.name).cloned().ok_or_else(|| SkeinError::unbound(&var.name, var.span))?
        }
        other => other.clone(),
    };
    let args: Vec<Node> =
        call.args.iter().map(|arg| substitute(arg, env)).collect::<Result<_, _>>()?;

    match target {
        Node::Pattern(pattern) => {
            if pattern.params.len() != args.len() {
                return Err(SkeinError::arity(pattern.params.len(), args.len(), call.span));
            }
            let mut call_env = pattern.env.clone().unwrap_or_default();
            for (param, arg) in pattern.params.iter().zip(args) {
                call_env.insert(param.clone(), arg);
            }
            let body = Node::Pattern(Pattern { params: Vec::new(), ..pattern });
            substitute(&body, &call_env).map(Some)
        }
        Node::Native(native) => native.invoke(&args),
        other => Err(SkeinError::type_error(
            format!("cannot call a {}", other.kind_name()),
            call.span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Call, FixedRepeat, Pattern, Row, VarRef};
    use crate::stitch::Stitch;

    fn knit_row() -> Node {
        Node::Row(Row::new(vec![Node::stitch(Stitch::Knit)]))
    }

    #[test]
    fn variable_lookup_resolves_from_environment() {
        let mut env = Env::new();
        env.insert("main".to_string(), knit_row());
        let resolved = substitute(&Node::Var(VarRef::new("main")), &env).unwrap();
        assert_eq!(resolved, knit_row());
    }

    #[test]
    fn missing_name_is_a_hard_error() {
        let err = substitute(&Node::Var(VarRef::new("nope")), &Env::new()).unwrap_err();
        assert!(matches!(err, SkeinError::UnboundName { .. }));
    }

    #[test]
    fn call_with_wrong_arity_fails() {
        let pattern = Node::Pattern(Pattern::with_params(
            vec![knit_row()],
            vec!["n".to_string()],
        ));
        let mut env = Env::new();
        env.insert("rib".to_string(), pattern);
        let call = Call::new(Node::Var(VarRef::new("rib")), vec![]);
        let err = do_call(&call, &env).unwrap_err();
        assert!(matches!(err, SkeinError::ArityMismatch { expected: 1, given: 0, .. }));
    }

    #[test]
    fn call_substitutes_parameters_into_the_body() {
        // pattern rib(n): row [K] n
        let body = Node::Row(Row::new(vec![Node::FixedRepeat(FixedRepeat {
            stitches: vec![Node::stitch(Stitch::Knit)],
            times: Box::new(Node::Var(VarRef::new("n"))),
            counts: None,
            span: None,
        })]));
        let pattern = Node::Pattern(Pattern::with_params(vec![body], vec!["n".to_string()]));
        let mut env = Env::new();
        env.insert("rib".to_string(), pattern);

        let call = Call::new(Node::Var(VarRef::new("rib")), vec![Node::natural(4)]);
        let result = do_call(&call, &env).unwrap().unwrap();
        let Node::Pattern(pattern) = result else { panic!("expected a pattern") };
        let Node::Row(row) = &pattern.rows[0] else { panic!("expected a row") };
        let Node::FixedRepeat(rep) = &row.stitches[0] else { panic!("expected a repeat") };
        assert_eq!(rep.times_value().unwrap(), 4);
    }

    #[test]
    fn body_sees_captured_scope_not_callers() {
        // The pattern closes over `stripe` = knit row. The caller binds
        // `stripe` to something else; the body must not see it.
        let mut defining_env = Env::new();
        defining_env.insert("stripe".to_string(), knit_row());
        let pattern = enclose(
            &Node::Pattern(Pattern::new(vec![Node::Var(VarRef::new("stripe"))])),
            &defining_env,
        );

        let mut caller_env = Env::new();
        caller_env.insert(
            "stripe".to_string(),
            Node::Row(Row::new(vec![Node::stitch(Stitch::Purl)])),
        );
        caller_env.insert("p".to_string(), pattern);

        let call = Call::new(Node::Var(VarRef::new("p")), vec![]);
        let result = do_call(&call, &caller_env).unwrap().unwrap();
        let Node::Pattern(pattern) = result else { panic!("expected a pattern") };
        assert_eq!(pattern.rows[0], knit_row());
    }

    #[test]
    fn calling_a_non_pattern_is_a_type_error() {
        let mut env = Env::new();
        env.insert("three".to_string(), Node::natural(3));
        let call = Call::new(Node::Var(VarRef::new("three")), vec![]);
        let err = do_call(&call, &env).unwrap_err();
        assert!(matches!(err, SkeinError::Type { .. }));
    }
}
