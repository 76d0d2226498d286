use crate::predicate::Predicate;

enum LogicOp {
    And,
    Or,
}

/// Logical conjunction of any number of predicates.
///
/// Nested conjunctions are flattened. Returns `None` when there is
/// nothing to combine.
pub fn and<I>(predicates: I) -> Option<Predicate>
where
    I: IntoIterator<Item = Predicate>,
{
    optimize(LogicOp::And, predicates.into_iter())
}

/// Logical disjunction of any number of predicates.
///
/// Nested disjunctions are flattened. Returns `None` when there is
/// nothing to combine.
pub fn or<I>(predicates: I) -> Option<Predicate>
where
    I: IntoIterator<Item = Predicate>,
{
    optimize(LogicOp::Or, predicates.into_iter())
}

fn optimize(op: LogicOp, clause_iter: impl Iterator<Item = Predicate>) -> Option<Predicate> {
    let mut clauses = Vec::new();
    for clause in clause_iter {
        match (&op, clause) {
            (LogicOp::And, Predicate::All(nested)) => clauses.extend(nested),
            (LogicOp::Or, Predicate::Any(nested)) => clauses.extend(nested),
            (_, clause) => clauses.push(clause),
        }
    }

    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(match op {
            LogicOp::And => Predicate::All(clauses),
            LogicOp::Or => Predicate::Any(clauses),
        }),
    }
}
