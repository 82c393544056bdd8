use crate::parser::ast::BinaryOp;
use crate::value::Value;

/// XPath 1.0 comparison, existential over node-sets.
pub(crate) fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::NodeSet(a), Value::NodeSet(b)) => {
            let right_values: Vec<Value> = b.iter().map(|n| Value::String(n.string_value())).collect();
            a.iter().any(|x| {
                let lv = Value::String(x.string_value());
                right_values.iter().any(|rv| compare_atomic(op, &lv, rv))
            })
        }
        (Value::NodeSet(_), Value::Boolean(_)) | (Value::Boolean(_), Value::NodeSet(_)) => {
            compare_atomic(op, &Value::Boolean(left.boolean_value()), &Value::Boolean(right.boolean_value()))
        }
        (Value::NodeSet(a), other) => {
            a.iter().any(|x| compare_atomic(op, &Value::String(x.string_value()), other))
        }
        (other, Value::NodeSet(b)) => {
            b.iter().any(|y| compare_atomic(op, other, &Value::String(y.string_value())))
        }
        _ => compare_atomic(op, left, right),
    }
}

fn compare_atomic(op: BinaryOp, a: &Value, b: &Value) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match (a, b) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => a.boolean_value() == b.boolean_value(),
                (Value::Number(_), _) | (_, Value::Number(_)) => a.number_value() == b.number_value(),
                _ => a.string_value() == b.string_value(),
            };
            if op == BinaryOp::Eq { equal } else { !equal }
        }
        _ => {
            let (x, y) = (a.number_value(), b.number_value());
            match op {
                BinaryOp::Lt => x < y,
                BinaryOp::Le => x <= y,
                BinaryOp::Gt => x > y,
                BinaryOp::Ge => x >= y,
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_conversions() {
        assert!(compare(BinaryOp::Eq, &Value::from("1.0"), &Value::from(1.0)));
        assert!(!compare(BinaryOp::Eq, &Value::from("1.0"), &Value::from("1")));
        assert!(compare(BinaryOp::Eq, &Value::from("x"), &Value::from(true)));
        assert!(compare(BinaryOp::Lt, &Value::from("2"), &Value::from("10")));
        assert!(!compare(BinaryOp::Lt, &Value::from(f64::NAN), &Value::from(1.0)));
    }
}
