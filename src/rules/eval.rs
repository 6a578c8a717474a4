use crate::matcher::Environment;
use crate::rules::ast::{ArmPattern, Atom, Rule};

fn resolve<'v>(atom: &'v Atom, env: &'v Environment) -> Option<&'v str> {
    match atom {
        Atom::Hole(name) => env.value(name),
        Atom::Quoted(text) | Atom::Word(text) => Some(text.as_str()),
    }
}

/// Evaluate `rule` against one match environment.
///
/// Comparisons involving an unbound hole are false, whichever the operator.
pub fn evaluate(rule: &Rule, env: &Environment) -> bool {
    match rule {
        Rule::Equals(a, b) => match (resolve(a, env), resolve(b, env)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        Rule::NotEquals(a, b) => match (resolve(a, env), resolve(b, env)) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        },
        Rule::MatchesCase { subject, arms } => {
            let Some(value) = resolve(subject, env) else {
                return false;
            };
            arms.iter()
                .find(|arm| match &arm.pattern {
                    ArmPattern::Wildcard => true,
                    ArmPattern::Atom(atom) => resolve(atom, env) == Some(value),
                })
                .is_some_and(|arm| evaluate(&arm.body, env))
        }
        Rule::And(a, b) => evaluate(a, env) && evaluate(b, env),
        Rule::Or(a, b) => evaluate(a, env) || evaluate(b, env),
        Rule::Not(inner) => !evaluate(inner, env),
        Rule::Bool(value) => *value,
    }
}
